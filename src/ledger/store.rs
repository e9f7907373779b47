use async_trait::async_trait;

use super::models::{BankReceipt, RentSchedule, UsageStatus};
use crate::error::AppResult;

/// Storage seam for the reconciliation engine. The batch layer only ever
/// talks to these traits, so it can run against Postgres in production and
/// an in-memory ledger in tests.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Distinct payer names that still have at least one receipt in the
    /// given statuses.
    async fn find_candidate_payers(&self, statuses: &[UsageStatus]) -> AppResult<Vec<String>>;

    /// Open a unit of work. All reads and writes for one customer batch
    /// happen inside it and become visible only on commit.
    async fn begin(&self) -> AppResult<Box<dyn LedgerTx>>;
}

/// One transactional unit of work over the ledger tables.
#[async_trait]
pub trait LedgerTx: Send {
    /// Receipts for the given payers in the given statuses, ordered by
    /// payment timestamp ascending with NULL timestamps last.
    async fn find_receipts_by_payers(
        &mut self,
        payers: &[String],
        statuses: &[UsageStatus],
    ) -> AppResult<Vec<BankReceipt>>;

    /// Schedules for the given lessees in the given statuses, ordered by
    /// due date ascending with NULL dates last.
    async fn find_schedules_by_lessees(
        &mut self,
        lessees: &[String],
        statuses: &[UsageStatus],
    ) -> AppResult<Vec<RentSchedule>>;

    /// Write back mutated receipts (amounts, status, update_time) by id.
    /// Returns the number of rows updated.
    async fn update_receipts(&mut self, receipts: &[BankReceipt]) -> AppResult<u64>;

    /// Write back mutated schedules (amounts, status, update_time) by id.
    /// Returns the number of rows updated.
    async fn update_schedules(&mut self, schedules: &[RentSchedule]) -> AppResult<u64>;

    async fn commit(self: Box<Self>) -> AppResult<()>;

    async fn rollback(self: Box<Self>) -> AppResult<()>;
}
