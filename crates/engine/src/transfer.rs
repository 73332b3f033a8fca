//! The transfer simulator.
//!
//! One attempt runs: in-flight guard, validation, PIN gate, simulated
//! processing latency, then outcome resolution against the configured
//! preset. Validation and PIN failures are terminal and leave the ledger
//! untouched; only the outcome step mutates it.

use std::{collections::BTreeMap, time::Duration};

use tokio::task::JoinHandle;

use crate::{
    Engine, EngineError, Money, ResultEngine,
    ledger::EntryOptions,
    session::Session,
    settings::{OutcomePreset, UserSettings},
    transactions::{Transaction, TransactionStatus},
};

/// Minimum transfer amount: ₦100.
pub const MIN_TRANSFER: Money = Money::new(10_000);

/// Simulated processing latency before an outcome is computed.
pub const DEFAULT_PROCESSING_DELAY: Duration = Duration::from_millis(1400);

/// Delay before the compensating credit of a Reversed outcome.
pub const DEFAULT_REVERSAL_DELAY: Duration = Duration::from_millis(1200);

/// Bounded PIN re-entry.
pub const MAX_PIN_ATTEMPTS: u32 = 3;

/// One transfer submission.
#[derive(Clone, Debug)]
pub struct TransferRequest {
    pub recipient_bank: String,
    /// Exactly 10 digits.
    pub recipient_account: String,
    pub amount: Money,
    pub narration: Option<String>,
    /// Per-transfer preset override; honored only when the user enabled
    /// overrides in their settings.
    pub override_outcome: Option<OutcomePreset>,
}

/// Interactive PIN confirmation, implemented by the UI layer.
///
/// The simulator asks once per attempt; `None` means the user cancelled.
pub trait PinPrompt {
    async fn request_pin(&mut self) -> Option<String>;
}

/// Cancellation handle for a scheduled auto-reversal.
#[derive(Debug)]
pub struct ReversalHandle {
    handle: JoinHandle<ResultEngine<Transaction>>,
}

impl ReversalHandle {
    /// Cancels the reversal if it has not fired yet.
    pub fn abort(&self) {
        self.handle.abort();
    }

    /// Waits for the reversal credit to be recorded and returns it.
    pub async fn join(self) -> ResultEngine<Transaction> {
        self.handle
            .await
            .map_err(|err| EngineError::Validation(format!("reversal task failed: {err}")))?
    }
}

/// How a transfer attempt ended.
#[derive(Debug)]
pub enum TransferOutcome {
    Completed(Transaction),
    Pending(Transaction),
    /// Debited now; the compensating credit is scheduled on the handle.
    Reversing {
        transaction: Transaction,
        reversal: ReversalHandle,
    },
    /// Simulated failure; nothing was recorded.
    Failed {
        reason: String,
    },
}

impl TransferOutcome {
    /// The recorded transaction, when the attempt produced one.
    pub fn transaction(&self) -> Option<&Transaction> {
        match self {
            Self::Completed(tx) | Self::Pending(tx) => Some(tx),
            Self::Reversing { transaction, .. } => Some(transaction),
            Self::Failed { .. } => None,
        }
    }
}

impl Engine {
    /// Runs one transfer attempt for `session`.
    ///
    /// On any success variant the caller hands the transaction to the
    /// receipt renderer; errors are surfaced as user-visible messages.
    pub async fn transfer<P: PinPrompt>(
        &self,
        session: &Session,
        request: TransferRequest,
        pin: &mut P,
    ) -> ResultEngine<TransferOutcome> {
        // At most one outstanding transfer per session; the guard is held
        // until this attempt resolves.
        let _guard = session.try_begin_transfer()?;

        let bank = request.recipient_bank.trim().to_string();
        let account = request.recipient_account.trim().to_string();
        validate_request(&bank, &account, request.amount)?;
        if request.amount > session.balance().await {
            return Err(EngineError::InsufficientFunds(request.amount.to_string()));
        }

        let settings = self.user_settings(session.username()).await?;

        if settings.pin_required(request.amount, &account, &bank) {
            verify_pin(pin, settings.transaction_pin.as_deref()).await?;
        }

        // Simulated network latency; paused-clock tests drive this.
        tokio::time::sleep(self.processing_delay()).await;

        let last4 = &account[account.len() - 4..];
        let narration = request.narration.clone().unwrap_or_default();
        let description = format!("Transfer to {bank} (Acct: ...{last4}) - {narration}");

        let preset = resolve_preset(&settings, &request);
        tracing::info!(
            user = session.username(),
            amount = %request.amount,
            preset = preset.as_str(),
            "resolving transfer outcome"
        );

        let mut meta = BTreeMap::new();
        if !narration.is_empty() {
            meta.insert("narration".to_string(), narration);
        }
        let options = EntryOptions {
            channel: Some("transfer".to_string()),
            limit: settings.spending_limit,
            meta,
        };

        match preset {
            OutcomePreset::Failed => {
                tracing::warn!(user = session.username(), "simulated transfer failure");
                Ok(TransferOutcome::Failed {
                    reason: "Simulated transfer failure".to_string(),
                })
            }
            OutcomePreset::Pending => {
                let ledger = session.ledger_handle();
                let mut ledger = ledger.lock().await;
                if settings.pending_hold {
                    // Debit immediately, then hold the funds as Pending.
                    let tx = ledger.debit(request.amount, &description, options)?;
                    ledger.set_status(&tx.reference, TransactionStatus::Pending)?;
                    ledger.annotate(&tx.reference, "hold", "true")?;
                    let tx = ledger
                        .find(&tx.reference)
                        .cloned()
                        .ok_or_else(|| EngineError::KeyNotFound(tx.reference.clone()))?;
                    Ok(TransferOutcome::Pending(tx))
                } else {
                    let tx = ledger.record_pending(request.amount, &description, options)?;
                    Ok(TransferOutcome::Pending(tx))
                }
            }
            OutcomePreset::Reversed => {
                let tx = {
                    let ledger = session.ledger_handle();
                    let mut ledger = ledger.lock().await;
                    ledger.debit(request.amount, &description, options)?
                };
                let reversal = schedule_reversal(session, &settings, &tx, request.amount);
                Ok(TransferOutcome::Reversing {
                    transaction: tx,
                    reversal,
                })
            }
            OutcomePreset::Completed => {
                let ledger = session.ledger_handle();
                let mut ledger = ledger.lock().await;
                let tx = ledger.debit(request.amount, &description, options)?;
                Ok(TransferOutcome::Completed(tx))
            }
        }
    }
}

fn validate_request(bank: &str, account: &str, amount: Money) -> ResultEngine<()> {
    if bank.is_empty() {
        return Err(EngineError::Validation(
            "select a recipient bank".to_string(),
        ));
    }
    if account.len() != 10 || !account.chars().all(|c| c.is_ascii_digit()) {
        return Err(EngineError::Validation(
            "enter a valid 10-digit account number".to_string(),
        ));
    }
    if amount < MIN_TRANSFER {
        return Err(EngineError::Validation(format!(
            "amount must be at least {MIN_TRANSFER}"
        )));
    }
    Ok(())
}

fn resolve_preset(settings: &UserSettings, request: &TransferRequest) -> OutcomePreset {
    if settings.override_per_transfer
        && let Some(outcome) = request.override_outcome
    {
        return outcome;
    }
    settings.preset_outcome
}

/// Asks for the PIN up to [`MAX_PIN_ATTEMPTS`] times.
///
/// Empty entries consume an attempt; with no PIN configured any non-empty
/// entry confirms. Cancellation or exhausted attempts abort the transfer.
async fn verify_pin<P: PinPrompt>(prompt: &mut P, expected: Option<&str>) -> ResultEngine<()> {
    for _ in 0..MAX_PIN_ATTEMPTS {
        let Some(entry) = prompt.request_pin().await else {
            return Err(EngineError::PinVerificationFailed(
                "cancelled".to_string(),
            ));
        };
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        match expected {
            None => return Ok(()),
            Some(pin) if entry == pin => return Ok(()),
            Some(_) => continue,
        }
    }
    Err(EngineError::PinVerificationFailed(
        "maximum attempts exceeded".to_string(),
    ))
}

/// Spawns the compensating credit as an owned task with an abort handle.
fn schedule_reversal(
    session: &Session,
    settings: &UserSettings,
    original: &Transaction,
    amount: Money,
) -> ReversalHandle {
    let delay = settings
        .auto_reverse_delay_ms
        .map(Duration::from_millis)
        .unwrap_or(DEFAULT_REVERSAL_DELAY);
    let ledger = session.ledger_handle();
    let reference = original.reference.clone();

    let handle = tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let description = format!("Auto-reversal for {reference}");
        let mut meta = BTreeMap::new();
        meta.insert("reversal_of".to_string(), reference.clone());
        let options = EntryOptions {
            channel: Some("reversal".to_string()),
            meta,
            ..Default::default()
        };
        let mut ledger = ledger.lock().await;
        tracing::info!(reference = %reference, "auto-reversing transfer");
        ledger.credit(amount, &description, options)
    });

    ReversalHandle { handle }
}
