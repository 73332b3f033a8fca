//! Per-user settings: PIN policy, simulation presets, receipt fields and
//! trusted recipients.
//!
//! The whole record is stored as one JSON document per username, mirroring
//! the free-form settings map the dashboard keeps. Absent fields fall back
//! to defaults on load, so older records keep deserializing.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{EngineError, Money, ResultEngine};

/// Configured simulation mode for transfer outcomes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomePreset {
    #[default]
    Completed,
    Pending,
    Failed,
    Reversed,
}

impl OutcomePreset {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "Completed",
            Self::Pending => "Pending",
            Self::Failed => "Failed",
            Self::Reversed => "Reversed",
        }
    }
}

impl TryFrom<&str> for OutcomePreset {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "Completed" => Ok(Self::Completed),
            "Pending" => Ok(Self::Pending),
            "Failed" => Ok(Self::Failed),
            "Reversed" => Ok(Self::Reversed),
            other => Err(EngineError::Validation(format!(
                "invalid outcome preset: {other}"
            ))),
        }
    }
}

/// A recipient exempted from the PIN threshold.
///
/// Matching against a transfer request is exact `(account, bank)` equality;
/// the name is display-only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustedRecipient {
    pub name: String,
    pub bank: String,
    pub account: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    /// Transaction PIN; when unset, any PIN entry confirms.
    pub transaction_pin: Option<String>,
    /// Transfers strictly above this amount require the PIN.
    pub pin_threshold: Option<Money>,
    /// Simulation mode applied to transfers.
    pub preset_outcome: OutcomePreset,
    /// Whether a single transfer may override the preset.
    pub override_per_transfer: bool,
    /// Pending outcome: debit and hold, or record without debiting.
    pub pending_hold: bool,
    /// Delay before the automatic reversal credit, in milliseconds.
    pub auto_reverse_delay_ms: Option<u64>,
    pub receipt_account_name: Option<String>,
    pub receipt_account_number: Option<String>,
    /// Per-transaction debit cap.
    pub spending_limit: Option<Money>,
    pub default_bank: Option<String>,
    pub notify_transactions: bool,
    pub trusted_recipients: Vec<TrustedRecipient>,
}

impl UserSettings {
    /// Whether `(account, bank)` names a trusted recipient.
    pub fn is_trusted(&self, account: &str, bank: &str) -> bool {
        self.trusted_recipients
            .iter()
            .any(|r| r.account == account && r.bank == bank)
    }

    /// Whether a transfer of `amount` to the recipient must pass the PIN
    /// gate: a threshold is configured, the amount exceeds it, and the
    /// recipient is not trusted.
    pub fn pin_required(&self, amount: Money, account: &str, bank: &str) -> bool {
        match self.pin_threshold {
            Some(threshold) if threshold.is_positive() => {
                amount > threshold && !self.is_trusted(account, bank)
            }
            _ => false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "user_settings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub username: String,
    /// JSON-encoded [`UserSettings`].
    pub settings: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<&Model> for UserSettings {
    type Error = EngineError;

    fn try_from(model: &Model) -> Result<Self, Self::Error> {
        serde_json::from_str(&model.settings)
            .map_err(|err| EngineError::SettingsCodec(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_with_threshold() -> UserSettings {
        UserSettings {
            pin_threshold: Some(Money::new(10_000_00)),
            trusted_recipients: vec![TrustedRecipient {
                name: "Jane O.".to_string(),
                bank: "GTBank".to_string(),
                account: "0123456789".to_string(),
            }],
            ..Default::default()
        }
    }

    #[test]
    fn pin_required_above_threshold_for_untrusted() {
        let s = settings_with_threshold();
        assert!(s.pin_required(Money::new(20_000_00), "9999999999", "OPay"));
        assert!(!s.pin_required(Money::new(5_000_00), "9999999999", "OPay"));
    }

    #[test]
    fn trusted_recipient_needs_exact_account_and_bank() {
        let s = settings_with_threshold();
        assert!(!s.pin_required(Money::new(20_000_00), "0123456789", "GTBank"));
        // Same account at another bank is not trusted.
        assert!(s.pin_required(Money::new(20_000_00), "0123456789", "OPay"));
    }

    #[test]
    fn no_threshold_means_no_pin() {
        let s = UserSettings::default();
        assert!(!s.pin_required(Money::new(100_000_00), "9999999999", "OPay"));
    }

    #[test]
    fn corrupted_record_is_a_settings_error() {
        let model = Model {
            username: "alice".to_string(),
            settings: "{not json".to_string(),
        };
        let err = UserSettings::try_from(&model).unwrap_err();
        assert!(matches!(err, EngineError::SettingsCodec(_)));
    }

    #[test]
    fn old_records_deserialize_with_defaults() {
        let s: UserSettings = serde_json::from_str(r#"{"transaction_pin":"1234"}"#).unwrap();
        assert_eq!(s.transaction_pin.as_deref(), Some("1234"));
        assert_eq!(s.preset_outcome, OutcomePreset::Completed);
        assert!(s.trusted_recipients.is_empty());
    }
}
