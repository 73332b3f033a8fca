//! Transaction primitives.
//!
//! A `Transaction` is one row of the session ledger: a signed amount, a
//! lifecycle status and a unique display reference.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Money, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Debit,
    Credit,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debit => "Debit",
            Self::Credit => "Credit",
        }
    }

    /// Reference prefix used by the display reference, `TRX` for debits and
    /// `CR` for credits.
    pub fn reference_prefix(self) -> &'static str {
        match self {
            Self::Debit => "TRX",
            Self::Credit => "CR",
        }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "Debit" => Ok(Self::Debit),
            "Credit" => Ok(Self::Credit),
            other => Err(EngineError::Validation(format!(
                "invalid transaction kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionStatus {
    #[default]
    Completed,
    Pending,
    Failed,
    Reversed,
}

impl TransactionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "Completed",
            Self::Pending => "Pending",
            Self::Failed => "Failed",
            Self::Reversed => "Reversed",
        }
    }
}

impl TryFrom<&str> for TransactionStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "Completed" => Ok(Self::Completed),
            "Pending" => Ok(Self::Pending),
            "Failed" => Ok(Self::Failed),
            "Reversed" => Ok(Self::Reversed),
            other => Err(EngineError::Validation(format!(
                "invalid transaction status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    /// Display reference, unique per transaction (`TRX…`/`CR…`).
    pub reference: String,
    pub kind: TransactionKind,
    pub occurred_at: DateTime<Utc>,
    pub description: String,
    /// Signed amount: negative for debits, positive for credits.
    pub amount: Money,
    pub status: TransactionStatus,
    /// Open key/value bag (channel, fee, hold flag, …).
    #[serde(default)]
    pub meta: BTreeMap<String, String>,
}

impl Transaction {
    pub fn new(
        kind: TransactionKind,
        occurred_at: DateTime<Utc>,
        description: String,
        amount: Money,
        status: TransactionStatus,
        meta: BTreeMap<String, String>,
    ) -> ResultEngine<Self> {
        if amount.is_zero() {
            return Err(EngineError::InvalidAmount(
                "amount must be non-zero".to_string(),
            ));
        }
        let id = Uuid::new_v4();
        Ok(Self {
            id,
            reference: derive_reference(kind, id),
            kind,
            occurred_at,
            description,
            amount,
            status,
            meta,
        })
    }

    /// The calendar date the transaction occurred on, `YYYY-MM-DD`.
    pub fn date(&self) -> String {
        self.occurred_at.format("%Y-%m-%d").to_string()
    }

    /// Time of day, `HH:MM`, used on receipts.
    pub fn time(&self) -> String {
        self.occurred_at.format("%H:%M").to_string()
    }
}

/// Derives the display reference from the transaction id.
///
/// 10 digits taken from the id keep the familiar `TRX0123456789` shape while
/// staying unique per transaction, unlike a wall-clock suffix.
fn derive_reference(kind: TransactionKind, id: Uuid) -> String {
    let digits = id.as_u128() % 10_000_000_000;
    format!("{}{:010}", kind.reference_prefix(), digits)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::{TimeZone, Utc};

    use super::*;

    fn transaction(kind: TransactionKind, amount: i64) -> Transaction {
        Transaction::new(
            kind,
            Utc.with_ymd_and_hms(2025, 10, 9, 14, 30, 0).unwrap(),
            "Transfer to GTBank (Acct: ...1234)".to_string(),
            Money::new(amount),
            TransactionStatus::Completed,
            BTreeMap::new(),
        )
        .unwrap()
    }

    #[test]
    fn debit_reference_has_trx_prefix() {
        let tx = transaction(TransactionKind::Debit, -5000);
        assert!(tx.reference.starts_with("TRX"));
        assert_eq!(tx.reference.len(), 13);
    }

    #[test]
    fn credit_reference_has_cr_prefix() {
        let tx = transaction(TransactionKind::Credit, 5000);
        assert!(tx.reference.starts_with("CR"));
        assert_eq!(tx.reference.len(), 12);
    }

    #[test]
    fn references_are_unique() {
        let a = transaction(TransactionKind::Debit, -100);
        let b = transaction(TransactionKind::Debit, -100);
        assert_ne!(a.reference, b.reference);
    }

    #[test]
    fn zero_amount_is_rejected() {
        let err = Transaction::new(
            TransactionKind::Debit,
            Utc::now(),
            "noop".to_string(),
            Money::ZERO,
            TransactionStatus::Completed,
            BTreeMap::new(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            EngineError::InvalidAmount("amount must be non-zero".to_string())
        );
    }

    #[test]
    fn date_and_time_formatting() {
        let tx = transaction(TransactionKind::Debit, -5000);
        assert_eq!(tx.date(), "2025-10-09");
        assert_eq!(tx.time(), "14:30");
    }
}
