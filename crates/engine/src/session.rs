//! A logged-in session: the username plus its demo ledger.
//!
//! The session object is owned by the caller; there is no global current
//! user. The ledger lives behind a mutex so the auto-reversal task can
//! credit it after the session call stack has returned, and a dedicated
//! transfer guard keeps at most one transfer outstanding per session.

use std::{collections::BTreeMap, sync::Arc};

use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard, mpsc};

use crate::{
    EngineError, Money, ResultEngine,
    ledger::{EntryOptions, Ledger, LedgerEvent},
    transactions::{Transaction, TransactionKind, TransactionStatus},
    transfer::MIN_TRANSFER,
};

/// Opening balance of the demo ledger: ₦4,520,000.00.
pub const SEED_BALANCE: Money = Money::new(452_000_000);

/// Loan fee in percent, deducted from the disbursed amount.
const LOAN_FEE_PERCENT: i64 = 3;

#[derive(Debug)]
pub struct Session {
    username: String,
    ledger: Arc<Mutex<Ledger>>,
    transfer_lock: Arc<Mutex<()>>,
}

impl Session {
    /// Opens a session with the demo seed ledger.
    pub(crate) fn seeded(username: &str) -> ResultEngine<Self> {
        let ledger = Ledger::with_history(SEED_BALANCE, seed_transactions()?);
        Ok(Self {
            username: username.to_string(),
            ledger: Arc::new(Mutex::new(ledger)),
            transfer_lock: Arc::new(Mutex::new(())),
        })
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    pub async fn balance(&self) -> Money {
        self.ledger.lock().await.balance()
    }

    /// Snapshot of the transaction history, newest first.
    pub async fn transactions(&self) -> Vec<Transaction> {
        self.ledger.lock().await.transactions().to_vec()
    }

    /// Attaches a display observer to the ledger.
    pub async fn subscribe(&self) -> mpsc::UnboundedReceiver<LedgerEvent> {
        self.ledger.lock().await.subscribe()
    }

    pub async fn debit(
        &self,
        amount: Money,
        description: &str,
        options: EntryOptions,
    ) -> ResultEngine<Transaction> {
        self.ledger.lock().await.debit(amount, description, options)
    }

    pub async fn credit(
        &self,
        amount: Money,
        description: &str,
        options: EntryOptions,
    ) -> ResultEngine<Transaction> {
        self.ledger
            .lock()
            .await
            .credit(amount, description, options)
    }

    /// Clears the transaction history. Irreversible; confirmation is the
    /// caller's concern.
    pub async fn clear_history(&self) {
        self.ledger.lock().await.clear();
    }

    /// Replaces balance and history wholesale, used by account import.
    pub async fn restore(&self, balance: Money, transactions: Vec<Transaction>) {
        self.ledger.lock().await.restore(balance, transactions);
    }

    /// Pays a bill: a plain debit tagged with the bill channel.
    pub async fn pay_bill(
        &self,
        bill_type: &str,
        bill_account: &str,
        amount: Money,
    ) -> ResultEngine<Transaction> {
        if bill_account.trim().is_empty() {
            return Err(EngineError::Validation(
                "provide a bill account".to_string(),
            ));
        }
        if amount < MIN_TRANSFER {
            return Err(EngineError::Validation(format!(
                "bill amount must be at least {MIN_TRANSFER}"
            )));
        }
        let description = format!("Bill Payment - {bill_type} ({bill_account})");
        let options = EntryOptions {
            channel: Some("bill".to_string()),
            ..Default::default()
        };
        self.debit(amount, &description, options).await
    }

    /// Simulates a loan: credits the amount net of a 3% fee.
    pub async fn disburse_loan(&self, amount: Money, term_months: u32) -> ResultEngine<Transaction> {
        if !amount.is_positive() || term_months == 0 {
            return Err(EngineError::Validation(
                "provide a valid loan amount and term".to_string(),
            ));
        }
        // Half-up rounding, as the dashboard does.
        let fee = Money::new((amount.kobo() * LOAN_FEE_PERCENT + 50) / 100);
        let disbursed = amount - fee;
        let description = format!("Loan disbursement (fee {fee})");
        let mut meta = BTreeMap::new();
        meta.insert("fee".to_string(), fee.kobo().to_string());
        meta.insert("term_months".to_string(), term_months.to_string());
        let options = EntryOptions {
            channel: Some("loan".to_string()),
            meta,
            ..Default::default()
        };
        self.credit(disbursed, &description, options).await
    }

    /// Manual balance adjustment: positive amounts credit, negative
    /// amounts debit. Overdrafts are rejected like any other debit.
    pub async fn adjust(&self, amount: Money) -> ResultEngine<Transaction> {
        let description = format!("Manual adjustment by {}", self.username);
        let options = EntryOptions {
            channel: Some("adjust".to_string()),
            ..Default::default()
        };
        if amount.is_negative() {
            self.debit(amount.abs(), &description, options).await
        } else {
            self.credit(amount, &description, options).await
        }
    }

    /// Shared handle to the ledger, used by the transfer simulator and the
    /// auto-reversal task.
    pub(crate) fn ledger_handle(&self) -> Arc<Mutex<Ledger>> {
        Arc::clone(&self.ledger)
    }

    /// Claims the single-outstanding-transfer slot, or fails if a transfer
    /// is already in flight.
    pub(crate) fn try_begin_transfer(&self) -> ResultEngine<OwnedMutexGuard<()>> {
        Arc::clone(&self.transfer_lock)
            .try_lock_owned()
            .map_err(|_| EngineError::TransferInFlight)
    }
}

fn seed_date(year: i32, month: u32, day: u32) -> ResultEngine<DateTime<Utc>> {
    Utc.with_ymd_and_hms(year, month, day, 9, 0, 0)
        .single()
        .ok_or_else(|| EngineError::Validation("invalid seed date".to_string()))
}

/// The demo transactions every fresh session starts with, newest first.
fn seed_transactions() -> ResultEngine<Vec<Transaction>> {
    let rows: [(i32, u32, u32, TransactionKind, &str, i64, TransactionStatus); 5] = [
        (
            2025,
            10,
            9,
            TransactionKind::Debit,
            "Transfer - Jane O. (GTBank)",
            -5_000_000,
            TransactionStatus::Completed,
        ),
        (
            2025,
            10,
            8,
            TransactionKind::Credit,
            "Salary Deposit - ACME LTD",
            35_000_000,
            TransactionStatus::Completed,
        ),
        (
            2025,
            9,
            29,
            TransactionKind::Debit,
            "Transfer to OPay (Ayo M.)",
            -1_250_000,
            TransactionStatus::Completed,
        ),
        (
            2024,
            10,
            30,
            TransactionKind::Credit,
            "Reversal for Failed Transfer",
            1_000_000,
            TransactionStatus::Completed,
        ),
        (
            2024,
            10,
            30,
            TransactionKind::Debit,
            "Interbank Transfer (Failed)",
            -1_000_000,
            TransactionStatus::Reversed,
        ),
    ];

    let mut transactions = Vec::with_capacity(rows.len());
    for (year, month, day, kind, description, amount, status) in rows {
        transactions.push(Transaction::new(
            kind,
            seed_date(year, month, day)?,
            description.to_string(),
            Money::new(amount),
            status,
            BTreeMap::new(),
        )?);
    }
    Ok(transactions)
}
