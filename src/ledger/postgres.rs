use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};

use super::models::{safe_amount, BankReceipt, RentSchedule, UsageStatus};
use super::store::{LedgerStore, LedgerTx};
use crate::error::AppResult;

const RECEIPT_COLUMNS: &str = "id, payer_name, payer_bank, payer_account, payment_amount, \
     payment_datetime, used_amount, status, create_time, update_time";

const SCHEDULE_COLUMNS: &str = "id, lessee_name, due_date, total_due_amount, principal_due, \
     interest_due, principal_received, interest_received, status, create_time, update_time";

/// Postgres-backed ledger store - the source of truth for receipts and schedules
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn find_candidate_payers(&self, statuses: &[UsageStatus]) -> AppResult<Vec<String>> {
        let codes: Vec<i16> = statuses.iter().map(|s| s.code()).collect();
        let payers = sqlx::query_scalar::<_, String>(
            r#"
            SELECT DISTINCT payer_name
            FROM bank_receipts
            WHERE status = ANY($1)
            ORDER BY payer_name
            "#,
        )
        .bind(&codes)
        .fetch_all(&self.pool)
        .await?;

        Ok(payers)
    }

    async fn begin(&self) -> AppResult<Box<dyn LedgerTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgLedgerTx { tx }))
    }
}

/// One open Postgres transaction over the ledger tables.
pub struct PgLedgerTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LedgerTx for PgLedgerTx {
    // ========== READ OPERATIONS ==========

    async fn find_receipts_by_payers(
        &mut self,
        payers: &[String],
        statuses: &[UsageStatus],
    ) -> AppResult<Vec<BankReceipt>> {
        let codes: Vec<i16> = statuses.iter().map(|s| s.code()).collect();
        let receipts = sqlx::query_as::<_, BankReceipt>(&format!(
            r#"
            SELECT {RECEIPT_COLUMNS}
            FROM bank_receipts
            WHERE payer_name = ANY($1) AND status = ANY($2)
            ORDER BY payment_datetime ASC NULLS LAST, id ASC
            "#,
        ))
        .bind(payers)
        .bind(&codes)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(receipts)
    }

    async fn find_schedules_by_lessees(
        &mut self,
        lessees: &[String],
        statuses: &[UsageStatus],
    ) -> AppResult<Vec<RentSchedule>> {
        let codes: Vec<i16> = statuses.iter().map(|s| s.code()).collect();
        let schedules = sqlx::query_as::<_, RentSchedule>(&format!(
            r#"
            SELECT {SCHEDULE_COLUMNS}
            FROM rent_schedules
            WHERE lessee_name = ANY($1) AND status = ANY($2)
            ORDER BY due_date ASC NULLS LAST, id ASC
            "#,
        ))
        .bind(lessees)
        .bind(&codes)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(schedules)
    }

    // ========== WRITE OPERATIONS ==========

    async fn update_receipts(&mut self, receipts: &[BankReceipt]) -> AppResult<u64> {
        if receipts.is_empty() {
            return Ok(0);
        }

        let ids: Vec<i64> = receipts.iter().map(|r| r.id).collect();
        // Null amounts read as zero everywhere, so writing the normalized
        // value back loses nothing.
        let used: Vec<Decimal> = receipts.iter().map(|r| safe_amount(r.used_amount)).collect();
        let statuses: Vec<i16> = receipts.iter().map(|r| r.status.code()).collect();

        let result = sqlx::query(
            r#"
            UPDATE bank_receipts AS r
            SET used_amount = u.used_amount,
                status = u.status,
                update_time = NOW()
            FROM (
                SELECT * FROM UNNEST($1::BIGINT[], $2::NUMERIC[], $3::SMALLINT[])
            ) AS u(id, used_amount, status)
            WHERE r.id = u.id
            "#,
        )
        .bind(&ids)
        .bind(&used)
        .bind(&statuses)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected())
    }

    async fn update_schedules(&mut self, schedules: &[RentSchedule]) -> AppResult<u64> {
        if schedules.is_empty() {
            return Ok(0);
        }

        let ids: Vec<i64> = schedules.iter().map(|s| s.id).collect();
        let principal: Vec<Decimal> = schedules
            .iter()
            .map(|s| safe_amount(s.principal_received))
            .collect();
        let interest: Vec<Decimal> = schedules
            .iter()
            .map(|s| safe_amount(s.interest_received))
            .collect();
        let statuses: Vec<i16> = schedules.iter().map(|s| s.status.code()).collect();

        let result = sqlx::query(
            r#"
            UPDATE rent_schedules AS s
            SET principal_received = u.principal_received,
                interest_received = u.interest_received,
                status = u.status,
                update_time = NOW()
            FROM (
                SELECT * FROM UNNEST($1::BIGINT[], $2::NUMERIC[], $3::NUMERIC[], $4::SMALLINT[])
            ) AS u(id, principal_received, interest_received, status)
            WHERE s.id = u.id
            "#,
        )
        .bind(&ids)
        .bind(&principal)
        .bind(&interest)
        .bind(&statuses)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
