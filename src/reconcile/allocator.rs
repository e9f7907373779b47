use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::ledger::models::{safe_amount, BankReceipt, RentSchedule};
use super::types::VerificationResult;

/// Mutations produced by one customer allocation. Only touched rows are
/// carried; everything else stays as loaded.
#[derive(Debug, Default)]
pub struct AllocationOutcome {
    pub result: VerificationResult,
    pub updated_schedules: Vec<RentSchedule>,
    pub updated_receipts: Vec<BankReceipt>,
}

impl AllocationOutcome {
    fn empty() -> Self {
        Self::default()
    }
}

/// Allocate one customer's pooled receipt funds across their open rent
/// schedules: earliest due date first, interest before principal within a
/// schedule, then consume receipts in payment order.
///
/// Callers pass receipts sorted by payment timestamp and schedules sorted
/// by due date, NULLs last. Pure decimal arithmetic; no I/O beyond logging.
pub fn allocate(
    customer: &str,
    receipts: Vec<BankReceipt>,
    schedules: Vec<RentSchedule>,
) -> AllocationOutcome {
    debug!("Processing customer {}", customer);

    let mut available: Decimal = receipts.iter().map(|r| r.available_amount()).sum();
    available = available.max(Decimal::ZERO);

    if available <= Decimal::ZERO {
        debug!("Customer {}: nothing available to allocate", customer);
        return AllocationOutcome::empty();
    }

    if schedules.is_empty() {
        warn!(
            "Customer {}: {} available but no open rent schedules",
            customer, available
        );
        return AllocationOutcome::empty();
    }

    debug!("Customer {}: {} available for allocation", customer, available);
    let original_available = available;

    let mut result = VerificationResult::default();
    let mut updated_schedules: Vec<RentSchedule> = Vec::new();
    let mut updated_receipts: Vec<BankReceipt> = Vec::new();

    for mut schedule in schedules {
        if available <= Decimal::ZERO {
            break;
        }

        let remaining_interest = schedule.remaining_interest();
        let remaining_principal = schedule.remaining_principal();
        let mut touched = false;

        if remaining_interest > Decimal::ZERO {
            let pay_interest = available.min(remaining_interest);
            if pay_interest > Decimal::ZERO {
                schedule.interest_received =
                    Some(safe_amount(schedule.interest_received) + pay_interest);
                available -= pay_interest;
                result.add_interest(pay_interest);
                touched = true;
                debug!(
                    "Customer {}: schedule {} interest allocation {}",
                    customer, schedule.id, pay_interest
                );
            }
        }

        if available > Decimal::ZERO && remaining_principal > Decimal::ZERO {
            let pay_principal = available.min(remaining_principal);
            if pay_principal > Decimal::ZERO {
                schedule.principal_received =
                    Some(safe_amount(schedule.principal_received) + pay_principal);
                available -= pay_principal;
                result.add_principal(pay_principal);
                touched = true;
                debug!(
                    "Customer {}: schedule {} principal allocation {}",
                    customer, schedule.id, pay_principal
                );
            }
        }

        if touched {
            result.verified_count += 1;
            schedule.recompute_status();
            updated_schedules.push(schedule);
        }
    }

    // Write the consumed total back onto the receipts, oldest first
    let mut consumed = (original_available - available).max(Decimal::ZERO);
    for mut receipt in receipts {
        if consumed <= Decimal::ZERO {
            break;
        }

        let take = consumed.min(receipt.available_amount());
        if take > Decimal::ZERO {
            receipt.used_amount = Some(safe_amount(receipt.used_amount) + take);
            receipt.recompute_status();
            updated_receipts.push(receipt);
            consumed -= take;
        }
    }

    if !result.is_empty() {
        info!(
            "Customer {}: verified {} schedules, principal {}, interest {}",
            customer, result.verified_count, result.total_principal, result.total_interest
        );
    }

    AllocationOutcome {
        result,
        updated_schedules,
        updated_receipts,
    }
}
