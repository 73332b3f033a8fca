//! The module contains the error the engine can throw.
//!
//! Every failure is recoverable at the caller boundary; the UI layer turns
//! them into transient notifications and the session stays alive.

use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),
    #[error("Amount exceeds the spending limit: {0}")]
    LimitExceeded(String),
    #[error("PIN verification failed: {0}")]
    PinVerificationFailed(String),
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Another transfer is already in flight for this session")]
    TransferInFlight,
    #[error("Malformed account document: {0}")]
    ImportParse(#[from] serde_json::Error),
    #[error("Corrupted settings record: {0}")]
    SettingsCodec(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InsufficientFunds(a), Self::InsufficientFunds(b)) => a == b,
            (Self::LimitExceeded(a), Self::LimitExceeded(b)) => a == b,
            (Self::PinVerificationFailed(a), Self::PinVerificationFailed(b)) => a == b,
            (Self::Validation(a), Self::Validation(b)) => a == b,
            (Self::TransferInFlight, Self::TransferInFlight) => true,
            (Self::ImportParse(a), Self::ImportParse(b)) => a.to_string() == b.to_string(),
            (Self::SettingsCodec(a), Self::SettingsCodec(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
