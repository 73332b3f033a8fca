//! Account export and import.
//!
//! One JSON document captures a session's balance and history plus the
//! user's settings, and can later be imported to restore them. Import
//! replaces the ledger wholesale; the credential store is never part of
//! the document.

use serde::{Deserialize, Serialize};

use crate::{
    EngineError, Money, ResultEngine, session::Session, settings::UserSettings,
    transactions::Transaction,
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccountExport {
    pub username: String,
    pub balance: Money,
    /// Newest first, as the ledger keeps them.
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub settings: Option<UserSettings>,
}

impl AccountExport {
    /// Snapshots the session ledger and the given settings.
    pub async fn capture(session: &Session, settings: Option<UserSettings>) -> Self {
        Self {
            username: session.username().to_string(),
            balance: session.balance().await,
            transactions: session.transactions().await,
            settings,
        }
    }

    pub fn to_json(&self) -> ResultEngine<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses an exported document and checks it names an account.
    pub fn from_json(raw: &str) -> ResultEngine<Self> {
        let export: Self = serde_json::from_str(raw)?;
        if export.username.trim().is_empty() {
            return Err(EngineError::Validation(
                "export document names no account".to_string(),
            ));
        }
        Ok(export)
    }

    /// Replaces the session's balance and history with the snapshot.
    ///
    /// Settings are returned to the caller, which decides whether to
    /// persist them for the target user.
    pub async fn apply(self, session: &Session) -> Option<UserSettings> {
        tracing::info!(
            user = session.username(),
            source = %self.username,
            balance = %self.balance,
            "restoring account snapshot"
        );
        session.restore(self.balance, self.transactions).await;
        self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn export_round_trips_through_json() {
        let session = Session::seeded("alice").unwrap();
        let settings = UserSettings {
            transaction_pin: Some("1234".to_string()),
            ..Default::default()
        };

        let export = AccountExport::capture(&session, Some(settings)).await;
        let parsed = AccountExport::from_json(&export.to_json().unwrap()).unwrap();
        assert_eq!(parsed, export);
        assert_eq!(parsed.balance, Money::new(452_000_000));
        assert_eq!(parsed.transactions.len(), 5);
    }

    #[tokio::test]
    async fn apply_replaces_balance_and_history() {
        let source = Session::seeded("alice").unwrap();
        source.clear_history().await;
        let export = AccountExport::capture(&source, None).await;

        let target = Session::seeded("bob").unwrap();
        assert_eq!(target.transactions().await.len(), 5);

        let settings = export.apply(&target).await;
        assert!(settings.is_none());
        assert_eq!(target.balance().await, Money::new(452_000_000));
        assert!(target.transactions().await.is_empty());
    }

    #[test]
    fn malformed_document_is_a_parse_error() {
        let err = AccountExport::from_json("{not json").unwrap_err();
        assert!(matches!(err, EngineError::ImportParse(_)));
    }

    #[test]
    fn missing_username_is_rejected() {
        let raw = r#"{"username":"","balance":0,"transactions":[]}"#;
        let err = AccountExport::from_json(raw).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }
}
