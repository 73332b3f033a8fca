//! Demo-bank engine: credential and settings stores, the session ledger,
//! the transfer simulator and receipt rendering.
//!
//! Credentials and settings are durable (SQLite through sea-orm); the
//! ledger is seeded fresh for every session and lives in memory only.

use std::time::Duration;

use sea_orm::{ActiveValue, prelude::*};

pub use error::EngineError;
pub use export::AccountExport;
pub use ledger::{EntryOptions, Ledger, LedgerEvent};
pub use money::Money;
pub use session::{SEED_BALANCE, Session};
pub use settings::{OutcomePreset, TrustedRecipient, UserSettings};
pub use transactions::{Transaction, TransactionKind, TransactionStatus};
pub use transfer::{
    DEFAULT_PROCESSING_DELAY, DEFAULT_REVERSAL_DELAY, MAX_PIN_ATTEMPTS, MIN_TRANSFER, PinPrompt,
    ReversalHandle, TransferOutcome, TransferRequest,
};

mod error;
mod export;
mod ledger;
mod money;
pub mod receipt;
mod session;
mod settings;
mod transactions;
mod transfer;
mod users;

pub type ResultEngine<T> = Result<T, EngineError>;

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    processing_delay: Duration,
}

impl Engine {
    /// Return a builder for `Engine`.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub(crate) fn processing_delay(&self) -> Duration {
        self.processing_delay
    }

    /// Registers a new account.
    pub async fn create_user(&self, username: &str, password: &str) -> ResultEngine<()> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(EngineError::Validation(
                "username and password are required".to_string(),
            ));
        }
        if self.user_exists(username).await? {
            return Err(EngineError::ExistingKey(username.to_string()));
        }

        users::ActiveModel {
            username: ActiveValue::Set(username.to_string()),
            password: ActiveValue::Set(password.to_string()),
        }
        .insert(&self.database)
        .await?;
        tracing::info!(user = username, "account created");
        Ok(())
    }

    pub async fn user_exists(&self, username: &str) -> ResultEngine<bool> {
        Ok(users::Entity::find_by_id(username)
            .one(&self.database)
            .await?
            .is_some())
    }

    /// Checks the credentials and opens a seeded session.
    ///
    /// Unknown users and wrong passwords get the same error, so login
    /// does not leak which usernames exist.
    pub async fn login(&self, username: &str, password: &str) -> ResultEngine<Session> {
        let user = users::Entity::find_by_id(username.trim())
            .one(&self.database)
            .await?;
        match user {
            Some(user) if user.password == password => {
                tracing::info!(user = %user.username, "login succeeded");
                Session::seeded(&user.username)
            }
            _ => Err(EngineError::Validation("invalid credentials".to_string())),
        }
    }

    pub async fn change_password(
        &self,
        username: &str,
        current: &str,
        new: &str,
    ) -> ResultEngine<()> {
        if new.is_empty() {
            return Err(EngineError::Validation(
                "new password must not be empty".to_string(),
            ));
        }
        let user = users::Entity::find_by_id(username)
            .one(&self.database)
            .await?;
        match user {
            Some(user) if user.password == current => {
                let mut active: users::ActiveModel = user.into();
                active.password = ActiveValue::Set(new.to_string());
                active.update(&self.database).await?;
                tracing::info!(user = username, "password changed");
                Ok(())
            }
            _ => Err(EngineError::Validation("invalid credentials".to_string())),
        }
    }

    /// Removes the account and its settings record.
    pub async fn delete_user(&self, username: &str) -> ResultEngine<()> {
        let user = users::Entity::find_by_id(username)
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(username.to_string()))?;
        if let Some(record) = settings::Entity::find_by_id(username)
            .one(&self.database)
            .await?
        {
            record.delete(&self.database).await?;
        }
        user.delete(&self.database).await?;
        tracing::info!(user = username, "account deleted");
        Ok(())
    }

    /// The stored settings for `username`, or the defaults when none were
    /// saved yet.
    pub async fn user_settings(&self, username: &str) -> ResultEngine<UserSettings> {
        match settings::Entity::find_by_id(username)
            .one(&self.database)
            .await?
        {
            Some(record) => UserSettings::try_from(&record),
            None => Ok(UserSettings::default()),
        }
    }

    /// Persists the whole settings record for `username`.
    pub async fn save_user_settings(
        &self,
        username: &str,
        settings: &UserSettings,
    ) -> ResultEngine<()> {
        if !self.user_exists(username).await? {
            return Err(EngineError::KeyNotFound(username.to_string()));
        }
        let encoded = serde_json::to_string(settings)
            .map_err(|err| EngineError::SettingsCodec(err.to_string()))?;
        match settings::Entity::find_by_id(username)
            .one(&self.database)
            .await?
        {
            Some(record) => {
                let mut active: settings::ActiveModel = record.into();
                active.settings = ActiveValue::Set(encoded);
                active.update(&self.database).await?;
            }
            None => {
                settings::ActiveModel {
                    username: ActiveValue::Set(username.to_string()),
                    settings: ActiveValue::Set(encoded),
                }
                .insert(&self.database)
                .await?;
            }
        }
        tracing::info!(user = username, "settings saved");
        Ok(())
    }

    /// Puts the settings back to their defaults.
    pub async fn reset_user_settings(&self, username: &str) -> ResultEngine<()> {
        self.save_user_settings(username, &UserSettings::default())
            .await
    }

    pub async fn add_trusted_recipient(
        &self,
        username: &str,
        recipient: TrustedRecipient,
    ) -> ResultEngine<()> {
        let mut settings = self.user_settings(username).await?;
        if settings.is_trusted(&recipient.account, &recipient.bank) {
            return Err(EngineError::ExistingKey(recipient.account));
        }
        settings.trusted_recipients.push(recipient);
        self.save_user_settings(username, &settings).await
    }

    pub async fn remove_trusted_recipient(
        &self,
        username: &str,
        account: &str,
        bank: &str,
    ) -> ResultEngine<()> {
        let mut settings = self.user_settings(username).await?;
        let before = settings.trusted_recipients.len();
        settings
            .trusted_recipients
            .retain(|r| !(r.account == account && r.bank == bank));
        if settings.trusted_recipients.len() == before {
            return Err(EngineError::KeyNotFound(account.to_string()));
        }
        self.save_user_settings(username, &settings).await
    }

    /// Exports the session's account (ledger plus stored settings) as JSON.
    pub async fn export_account(&self, session: &Session) -> ResultEngine<String> {
        let settings = self.user_settings(session.username()).await?;
        AccountExport::capture(session, Some(settings))
            .await
            .to_json()
    }

    /// Imports an exported document into the session, persisting any
    /// settings it carries for the session's user.
    pub async fn import_account(&self, session: &Session, raw: &str) -> ResultEngine<()> {
        let export = AccountExport::from_json(raw)?;
        if let Some(settings) = export.apply(session).await {
            self.save_user_settings(session.username(), &settings)
                .await?;
        }
        Ok(())
    }
}

/// The builder for `Engine`.
pub struct EngineBuilder {
    database: DatabaseConnection,
    processing_delay: Duration,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            database: DatabaseConnection::default(),
            processing_delay: DEFAULT_PROCESSING_DELAY,
        }
    }
}

impl EngineBuilder {
    /// Pass the required database.
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Overrides the simulated processing latency. Tests set this to zero
    /// or drive it with a paused clock.
    pub fn processing_delay(mut self, delay: Duration) -> EngineBuilder {
        self.processing_delay = delay;
        self
    }

    /// Construct `Engine`.
    pub fn build(self) -> Engine {
        Engine {
            database: self.database,
            processing_delay: self.processing_delay,
        }
    }
}
