use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::watch;

use super::models::{BankReceipt, RentSchedule, UsageStatus};
use super::store::{LedgerStore, LedgerTx};
use crate::error::{AppError, AppResult};

/// In-memory ledger for tests. Transactions stage writes and only apply
/// them on commit, mirroring the Postgres store's visibility rules. Call
/// counters and failure switches let tests pin down the access pattern.
pub struct MemoryLedger {
    state: Arc<Mutex<LedgerState>>,
    pub read_calls: Arc<AtomicUsize>,
    pub update_calls: Arc<AtomicUsize>,
    /// When set, every update call fails
    pub fail_updates: Arc<AtomicBool>,
    /// When set, reads for a batch containing this payer fail
    fail_reads_for: Arc<Mutex<Option<String>>>,
    /// While true, candidate discovery blocks
    candidate_gate: watch::Sender<bool>,
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self {
            state: Arc::default(),
            read_calls: Arc::default(),
            update_calls: Arc::default(),
            fail_updates: Arc::default(),
            fail_reads_for: Arc::default(),
            candidate_gate: watch::channel(false).0,
        }
    }
}

#[derive(Default)]
struct LedgerState {
    receipts: Vec<BankReceipt>,
    schedules: Vec<RentSchedule>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, receipts: Vec<BankReceipt>, schedules: Vec<RentSchedule>) {
        let mut state = self.state.lock().unwrap();
        state.receipts.extend(receipts);
        state.schedules.extend(schedules);
    }

    pub fn receipts(&self) -> Vec<BankReceipt> {
        self.state.lock().unwrap().receipts.clone()
    }

    pub fn schedules(&self) -> Vec<RentSchedule> {
        self.state.lock().unwrap().schedules.clone()
    }

    pub fn receipt(&self, id: i64) -> Option<BankReceipt> {
        self.receipts().into_iter().find(|r| r.id == id)
    }

    pub fn schedule(&self, id: i64) -> Option<RentSchedule> {
        self.schedules().into_iter().find(|s| s.id == id)
    }

    pub fn fail_reads_for(&self, payer: &str) {
        *self.fail_reads_for.lock().unwrap() = Some(payer.to_string());
    }

    /// Make `find_candidate_payers` block until [`Self::release_candidates`] runs.
    pub fn hold_candidates(&self) {
        self.candidate_gate.send_replace(true);
    }

    pub fn release_candidates(&self) {
        self.candidate_gate.send_replace(false);
    }
}

fn nulls_last<T: Ord>(a: &Option<T>, b: &Option<T>) -> CmpOrdering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => CmpOrdering::Less,
        (None, Some(_)) => CmpOrdering::Greater,
        (None, None) => CmpOrdering::Equal,
    }
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    async fn find_candidate_payers(&self, statuses: &[UsageStatus]) -> AppResult<Vec<String>> {
        let mut gate = self.candidate_gate.subscribe();
        gate.wait_for(|held| !held)
            .await
            .expect("candidate gate sender dropped");

        let state = self.state.lock().unwrap();
        let mut payers: Vec<String> = state
            .receipts
            .iter()
            .filter(|r| statuses.contains(&r.status))
            .map(|r| r.payer_name.clone())
            .collect();
        payers.sort();
        payers.dedup();
        Ok(payers)
    }

    async fn begin(&self) -> AppResult<Box<dyn LedgerTx>> {
        Ok(Box::new(MemoryTx {
            state: Arc::clone(&self.state),
            staged_receipts: Vec::new(),
            staged_schedules: Vec::new(),
            read_calls: Arc::clone(&self.read_calls),
            update_calls: Arc::clone(&self.update_calls),
            fail_updates: Arc::clone(&self.fail_updates),
            fail_reads_for: Arc::clone(&self.fail_reads_for),
        }))
    }
}

pub struct MemoryTx {
    state: Arc<Mutex<LedgerState>>,
    staged_receipts: Vec<BankReceipt>,
    staged_schedules: Vec<RentSchedule>,
    read_calls: Arc<AtomicUsize>,
    update_calls: Arc<AtomicUsize>,
    fail_updates: Arc<AtomicBool>,
    fail_reads_for: Arc<Mutex<Option<String>>>,
}

impl MemoryTx {
    fn check_read_failure(&self, names: &[String]) -> AppResult<()> {
        let poisoned = self.fail_reads_for.lock().unwrap();
        if let Some(payer) = poisoned.as_ref() {
            if names.iter().any(|n| n == payer) {
                return Err(AppError::Internal(format!(
                    "injected read failure for {}",
                    payer
                )));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerTx for MemoryTx {
    async fn find_receipts_by_payers(
        &mut self,
        payers: &[String],
        statuses: &[UsageStatus],
    ) -> AppResult<Vec<BankReceipt>> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        self.check_read_failure(payers)?;

        let state = self.state.lock().unwrap();
        let mut receipts: Vec<BankReceipt> = state
            .receipts
            .iter()
            .filter(|r| payers.contains(&r.payer_name) && statuses.contains(&r.status))
            .cloned()
            .collect();
        receipts.sort_by(|a, b| {
            nulls_last(&a.payment_datetime, &b.payment_datetime).then(a.id.cmp(&b.id))
        });
        Ok(receipts)
    }

    async fn find_schedules_by_lessees(
        &mut self,
        lessees: &[String],
        statuses: &[UsageStatus],
    ) -> AppResult<Vec<RentSchedule>> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        self.check_read_failure(lessees)?;

        let state = self.state.lock().unwrap();
        let mut schedules: Vec<RentSchedule> = state
            .schedules
            .iter()
            .filter(|s| lessees.contains(&s.lessee_name) && statuses.contains(&s.status))
            .cloned()
            .collect();
        schedules.sort_by(|a, b| nulls_last(&a.due_date, &b.due_date).then(a.id.cmp(&b.id)));
        Ok(schedules)
    }

    async fn update_receipts(&mut self, receipts: &[BankReceipt]) -> AppResult<u64> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(AppError::Internal("injected update failure".to_string()));
        }
        self.staged_receipts.extend_from_slice(receipts);
        Ok(receipts.len() as u64)
    }

    async fn update_schedules(&mut self, schedules: &[RentSchedule]) -> AppResult<u64> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(AppError::Internal("injected update failure".to_string()));
        }
        self.staged_schedules.extend_from_slice(schedules);
        Ok(schedules.len() as u64)
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let MemoryTx {
            state,
            staged_receipts,
            staged_schedules,
            ..
        } = *self;

        let mut state = state.lock().unwrap();
        let now = Some(Utc::now());
        for staged in staged_receipts {
            if let Some(row) = state.receipts.iter_mut().find(|r| r.id == staged.id) {
                *row = BankReceipt {
                    update_time: now,
                    ..staged
                };
            }
        }
        for staged in staged_schedules {
            if let Some(row) = state.schedules.iter_mut().find(|s| s.id == staged.id) {
                *row = RentSchedule {
                    update_time: now,
                    ..staged
                };
            }
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        // Staged writes are simply dropped
        Ok(())
    }
}
