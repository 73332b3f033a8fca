//! The session ledger: one balance plus a newest-first transaction sequence.
//!
//! The ledger is the only place balances and transactions are mutated. Reads
//! are free; every successful mutation emits a [`LedgerEvent`] on an optional
//! channel so a display layer can refresh without polling.

use std::collections::BTreeMap;

use chrono::Utc;
use tokio::sync::mpsc;

use crate::{
    EngineError, Money, ResultEngine,
    transactions::{Transaction, TransactionKind, TransactionStatus},
};

/// Emitted after every successful ledger mutation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LedgerEvent {
    /// A transaction was recorded (debit, credit or pending placeholder).
    Recorded {
        reference: String,
        balance: Money,
    },
    StatusChanged {
        reference: String,
        status: TransactionStatus,
    },
    Cleared,
    /// Balance and history were replaced wholesale (account import).
    Restored {
        balance: Money,
    },
}

/// Optional knobs for a single ledger entry.
#[derive(Clone, Debug, Default)]
pub struct EntryOptions {
    /// Channel tag recorded in the transaction meta (`transfer`, `bill`, …).
    pub channel: Option<String>,
    /// Per-user spending limit; debits above it are rejected. Ignored by
    /// credits.
    pub limit: Option<Money>,
    /// Extra metadata copied into the transaction.
    pub meta: BTreeMap<String, String>,
}

impl EntryOptions {
    fn into_meta(self) -> BTreeMap<String, String> {
        let mut meta = self.meta;
        if let Some(channel) = self.channel {
            meta.insert("channel".to_string(), channel);
        }
        meta
    }
}

#[derive(Debug)]
pub struct Ledger {
    balance: Money,
    transactions: Vec<Transaction>,
    events: Option<mpsc::UnboundedSender<LedgerEvent>>,
}

impl Ledger {
    pub fn new(balance: Money) -> Self {
        Self {
            balance,
            transactions: Vec::new(),
            events: None,
        }
    }

    /// A ledger pre-populated with existing history, newest first.
    pub fn with_history(balance: Money, transactions: Vec<Transaction>) -> Self {
        Self {
            balance,
            transactions,
            events: None,
        }
    }

    #[must_use]
    pub fn balance(&self) -> Money {
        self.balance
    }

    /// Transactions, newest first.
    #[must_use]
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn find(&self, reference: &str) -> Option<&Transaction> {
        self.transactions
            .iter()
            .find(|tx| tx.reference == reference)
    }

    /// Attaches an observer channel; the previous one (if any) is dropped.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<LedgerEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.events = Some(tx);
        rx
    }

    fn notify(&self, event: LedgerEvent) {
        if let Some(events) = &self.events {
            // The observer may be gone; the ledger does not care.
            let _ = events.send(event);
        }
    }

    /// Deducts `amount` from the balance and records a Completed debit.
    ///
    /// Fails with `InvalidAmount` if `amount` is not positive, with
    /// `LimitExceeded` if `options.limit` is set and `amount` exceeds it,
    /// and with `InsufficientFunds` if `amount` exceeds the balance. On any
    /// failure the ledger is left untouched.
    pub fn debit(
        &mut self,
        amount: Money,
        description: &str,
        options: EntryOptions,
    ) -> ResultEngine<Transaction> {
        if !amount.is_positive() {
            return Err(EngineError::InvalidAmount(
                "amount must be a positive number".to_string(),
            ));
        }
        if let Some(limit) = options.limit
            && limit.is_positive()
            && amount > limit
        {
            return Err(EngineError::LimitExceeded(amount.to_string()));
        }
        if amount > self.balance {
            return Err(EngineError::InsufficientFunds(amount.to_string()));
        }

        let tx = Transaction::new(
            TransactionKind::Debit,
            Utc::now(),
            description.to_string(),
            -amount,
            TransactionStatus::Completed,
            options.into_meta(),
        )?;

        self.transactions.insert(0, tx.clone());
        self.balance -= amount;
        tracing::info!(reference = %tx.reference, amount = %amount, "debit recorded");
        self.notify(LedgerEvent::Recorded {
            reference: tx.reference.clone(),
            balance: self.balance,
        });
        Ok(tx)
    }

    /// Adds `amount` to the balance and records a Completed credit.
    pub fn credit(
        &mut self,
        amount: Money,
        description: &str,
        options: EntryOptions,
    ) -> ResultEngine<Transaction> {
        if !amount.is_positive() {
            return Err(EngineError::InvalidAmount(
                "amount must be a positive number".to_string(),
            ));
        }

        let tx = Transaction::new(
            TransactionKind::Credit,
            Utc::now(),
            description.to_string(),
            amount,
            TransactionStatus::Completed,
            options.into_meta(),
        )?;

        self.transactions.insert(0, tx.clone());
        self.balance += amount;
        tracing::info!(reference = %tx.reference, amount = %amount, "credit recorded");
        self.notify(LedgerEvent::Recorded {
            reference: tx.reference.clone(),
            balance: self.balance,
        });
        Ok(tx)
    }

    /// Records a Pending debit-shaped transaction **without** touching the
    /// balance (the non-holding Pending outcome).
    pub fn record_pending(
        &mut self,
        amount: Money,
        description: &str,
        options: EntryOptions,
    ) -> ResultEngine<Transaction> {
        if !amount.is_positive() {
            return Err(EngineError::InvalidAmount(
                "amount must be a positive number".to_string(),
            ));
        }

        let tx = Transaction::new(
            TransactionKind::Debit,
            Utc::now(),
            description.to_string(),
            -amount,
            TransactionStatus::Pending,
            options.into_meta(),
        )?;

        self.transactions.insert(0, tx.clone());
        tracing::info!(reference = %tx.reference, amount = %amount, "pending debit recorded");
        self.notify(LedgerEvent::Recorded {
            reference: tx.reference.clone(),
            balance: self.balance,
        });
        Ok(tx)
    }

    /// Transitions the status of a recorded transaction.
    pub fn set_status(&mut self, reference: &str, status: TransactionStatus) -> ResultEngine<()> {
        match self
            .transactions
            .iter_mut()
            .find(|tx| tx.reference == reference)
        {
            Some(tx) => {
                tx.status = status;
                self.notify(LedgerEvent::StatusChanged {
                    reference: reference.to_string(),
                    status,
                });
                Ok(())
            }
            None => Err(EngineError::KeyNotFound(reference.to_string())),
        }
    }

    /// Adds one metadata entry to a recorded transaction.
    pub fn annotate(&mut self, reference: &str, key: &str, value: &str) -> ResultEngine<()> {
        match self
            .transactions
            .iter_mut()
            .find(|tx| tx.reference == reference)
        {
            Some(tx) => {
                tx.meta.insert(key.to_string(), value.to_string());
                Ok(())
            }
            None => Err(EngineError::KeyNotFound(reference.to_string())),
        }
    }

    /// Empties the transaction history. The balance is untouched.
    pub fn clear(&mut self) {
        self.transactions.clear();
        self.notify(LedgerEvent::Cleared);
    }

    /// Replaces balance and history wholesale (account import).
    pub fn restore(&mut self, balance: Money, transactions: Vec<Transaction>) {
        self.balance = balance;
        self.transactions = transactions;
        self.notify(LedgerEvent::Restored {
            balance: self.balance,
        });
    }
}
