use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;

/// Usage status shared by receipts and schedules.
/// Stored as SMALLINT: 0 = unused, 1 = partially used, 2 = fully used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[repr(i16)]
pub enum UsageStatus {
    Unused = 0,
    PartiallyUsed = 1,
    FullyUsed = 2,
}

/// Statuses a record can still receive allocations in.
pub const OPEN_STATUSES: [UsageStatus; 2] = [UsageStatus::Unused, UsageStatus::PartiallyUsed];

impl UsageStatus {
    pub fn code(&self) -> i16 {
        *self as i16
    }
}

/// Amount columns can be NULL in historic rows; the whole system reads them as zero.
pub fn safe_amount(value: Option<Decimal>) -> Decimal {
    value.unwrap_or(Decimal::ZERO)
}

/// Outstanding portion of a due amount, clamped at zero so over-received
/// rows never produce a negative remainder.
pub fn remaining_amount(due: Option<Decimal>, received: Option<Decimal>) -> Decimal {
    (safe_amount(due) - safe_amount(received)).max(Decimal::ZERO)
}

/// Bank receipt entity - one incoming payment from a customer
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BankReceipt {
    pub id: i64,
    pub payer_name: String,
    pub payer_bank: Option<String>,
    pub payer_account: Option<String>,

    #[serde(with = "rust_decimal::serde::float_option")]
    pub payment_amount: Option<Decimal>,
    pub payment_datetime: Option<DateTime<Utc>>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub used_amount: Option<Decimal>,

    pub status: UsageStatus,
    pub create_time: Option<DateTime<Utc>>,
    pub update_time: Option<DateTime<Utc>>,
}

impl BankReceipt {
    /// Spendable remainder on this receipt, clamped at zero.
    pub fn available_amount(&self) -> Decimal {
        (safe_amount(self.payment_amount) - safe_amount(self.used_amount)).max(Decimal::ZERO)
    }

    /// Recompute status after `used_amount` changed.
    pub fn recompute_status(&mut self) {
        if safe_amount(self.used_amount) >= safe_amount(self.payment_amount) {
            self.status = UsageStatus::FullyUsed;
        } else {
            self.status = UsageStatus::PartiallyUsed;
        }
    }
}

/// Rent schedule entity - one due period (principal + interest) for a lessee
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RentSchedule {
    pub id: i64,
    pub lessee_name: String,
    pub due_date: Option<NaiveDate>,

    #[serde(with = "rust_decimal::serde::float_option")]
    pub total_due_amount: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub principal_due: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub interest_due: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub principal_received: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub interest_received: Option<Decimal>,

    pub status: UsageStatus,
    pub create_time: Option<DateTime<Utc>>,
    pub update_time: Option<DateTime<Utc>>,
}

impl RentSchedule {
    /// Interest still owed on this period, clamped at zero.
    pub fn remaining_interest(&self) -> Decimal {
        remaining_amount(self.interest_due, self.interest_received)
    }

    /// Principal still owed on this period, clamped at zero.
    pub fn remaining_principal(&self) -> Decimal {
        remaining_amount(self.principal_due, self.principal_received)
    }

    /// Recompute status after a received amount changed.
    pub fn recompute_status(&mut self) {
        let principal_settled =
            safe_amount(self.principal_received) >= safe_amount(self.principal_due);
        let interest_settled =
            safe_amount(self.interest_received) >= safe_amount(self.interest_due);
        self.status = if principal_settled && interest_settled {
            UsageStatus::FullyUsed
        } else {
            UsageStatus::PartiallyUsed
        };
    }
}
