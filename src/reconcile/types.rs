use rust_decimal::Decimal;

/// Per-customer allocation totals
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VerificationResult {
    /// Number of schedules that received any allocation
    pub verified_count: u64,
    pub total_principal: Decimal,
    pub total_interest: Decimal,
}

impl VerificationResult {
    pub fn add_principal(&mut self, amount: Decimal) {
        if amount > Decimal::ZERO {
            self.total_principal += amount;
        }
    }

    pub fn add_interest(&mut self, amount: Decimal) {
        if amount > Decimal::ZERO {
            self.total_interest += amount;
        }
    }

    pub fn merge(&mut self, other: &VerificationResult) {
        self.verified_count += other.verified_count;
        self.total_principal += other.total_principal;
        self.total_interest += other.total_interest;
    }

    pub fn is_empty(&self) -> bool {
        self.verified_count == 0
            && self.total_principal.is_zero()
            && self.total_interest.is_zero()
    }
}

/// One customer batch that failed as a whole. Its unit of work rolled back,
/// so the affected customers stay open for the next run.
#[derive(Debug, Clone)]
pub struct BatchFailure {
    pub batch_index: usize,
    pub customer_count: usize,
    pub error: String,
}

/// Aggregate outcome of a full reconciliation run
#[derive(Debug, Clone, Default)]
pub struct ReconciliationSummary {
    pub total_time_seconds: f64,
    pub total_verified_count: u64,
    pub total_principal: Decimal,
    pub total_interest: Decimal,
    pub failed_batches: Vec<BatchFailure>,
}

impl ReconciliationSummary {
    pub fn absorb(&mut self, result: &VerificationResult) {
        self.total_verified_count += result.verified_count;
        self.total_principal += result.total_principal;
        self.total_interest += result.total_interest;
    }
}
