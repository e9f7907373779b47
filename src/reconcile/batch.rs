use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::AppResult;
use crate::ledger::models::{BankReceipt, RentSchedule, OPEN_STATUSES};
use crate::ledger::store::{LedgerStore, LedgerTx};
use super::allocator::allocate;
use super::types::VerificationResult;

/// Rows written back per UPDATE statement
const UPDATE_CHUNK_SIZE: usize = 500;

/// Processes one batch of customers inside a single unit of work: two bulk
/// reads, in-memory grouping and allocation, then a chunked flush.
pub struct BatchProcessor {
    store: Arc<dyn LedgerStore>,
}

impl BatchProcessor {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Reconcile the given customers. Everything commits together; any
    /// failure rolls the whole batch back and propagates.
    pub async fn process(&self, customers: &[String]) -> AppResult<VerificationResult> {
        if customers.is_empty() {
            return Ok(VerificationResult::default());
        }

        let mut tx = self.store.begin().await?;
        match run_batch(tx.as_mut(), customers).await {
            Ok(result) => {
                tx.commit().await?;
                Ok(result)
            }
            Err(err) => {
                debug!("Rolling back batch covering customers {:?}", customers);
                if let Err(rollback_err) = tx.rollback().await {
                    warn!("Rollback failed after batch error: {}", rollback_err);
                }
                Err(err)
            }
        }
    }
}

async fn run_batch(
    tx: &mut dyn LedgerTx,
    customers: &[String],
) -> AppResult<VerificationResult> {
    // Two bulk reads cover the whole batch regardless of customer count
    let all_receipts = tx.find_receipts_by_payers(customers, &OPEN_STATUSES).await?;
    let all_schedules = tx
        .find_schedules_by_lessees(customers, &OPEN_STATUSES)
        .await?;

    debug!(
        "Batch of {} customers: {} open receipts, {} open schedules",
        customers.len(),
        all_receipts.len(),
        all_schedules.len()
    );

    let mut receipts_by_customer: HashMap<String, Vec<BankReceipt>> = HashMap::new();
    for receipt in all_receipts {
        receipts_by_customer
            .entry(receipt.payer_name.clone())
            .or_default()
            .push(receipt);
    }

    let mut schedules_by_customer: HashMap<String, Vec<RentSchedule>> = HashMap::new();
    for schedule in all_schedules {
        schedules_by_customer
            .entry(schedule.lessee_name.clone())
            .or_default()
            .push(schedule);
    }

    let mut batch_result = VerificationResult::default();
    let mut schedules_to_update: Vec<RentSchedule> = Vec::new();
    let mut receipts_to_update: Vec<BankReceipt> = Vec::new();

    for customer in customers {
        let mut receipts = receipts_by_customer.remove(customer).unwrap_or_default();
        let mut schedules = schedules_by_customer.remove(customer).unwrap_or_default();

        // The store already orders these; re-sorting keeps allocation
        // correct even for a store that cannot
        receipts.sort_by(|a, b| nulls_last(&a.payment_datetime, &b.payment_datetime));
        schedules.sort_by(|a, b| nulls_last(&a.due_date, &b.due_date));

        let outcome = allocate(customer, receipts, schedules);
        batch_result.merge(&outcome.result);
        schedules_to_update.extend(outcome.updated_schedules);
        receipts_to_update.extend(outcome.updated_receipts);
    }

    flush_updates(tx, &schedules_to_update, &receipts_to_update).await?;
    Ok(batch_result)
}

async fn flush_updates(
    tx: &mut dyn LedgerTx,
    schedules: &[RentSchedule],
    receipts: &[BankReceipt],
) -> AppResult<()> {
    for chunk in schedules.chunks(UPDATE_CHUNK_SIZE) {
        let updated = tx.update_schedules(chunk).await?;
        if updated != chunk.len() as u64 {
            warn!(
                "Schedule flush touched {} of {} rows",
                updated,
                chunk.len()
            );
        }
    }
    for chunk in receipts.chunks(UPDATE_CHUNK_SIZE) {
        let updated = tx.update_receipts(chunk).await?;
        if updated != chunk.len() as u64 {
            warn!("Receipt flush touched {} of {} rows", updated, chunk.len());
        }
    }
    Ok(())
}

/// Ascending with NULLs sorted to the end, matching the store's ordering
fn nulls_last<T: Ord>(a: &Option<T>, b: &Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
