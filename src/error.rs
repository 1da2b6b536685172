//! Lab Error Types
//!
//! Setup and configuration failures. Transfers themselves never fail:
//! insufficient funds is a silent no-op and deadlock is only observed,
//! never reported through a return value.

use std::io;
use thiserror::Error;

/// Lab error types
#[derive(Error, Debug)]
pub enum LabError {
    // === Configuration Errors ===
    #[error("Failed to read config file {path}: {source}")]
    ConfigRead {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    // === Scenario Errors ===
    #[error("Unknown account: {0}")]
    UnknownAccount(String),

    #[error("Duplicate account name: {0}")]
    DuplicateAccount(String),

    // === Runtime Errors ===
    #[error("Failed to spawn transfer thread: {0}")]
    ThreadSpawn(#[source] io::Error),

    #[error("Transfer task failed: {0}")]
    TaskJoin(String),

    #[error("Balances unavailable, account locks held outside the gate")]
    BalancesBusy,

    #[error("Failed to initialise logging: {0}")]
    LogInit(String),
}

impl LabError {
    /// Stable error code, used in logs and the CLI summary
    pub fn code(&self) -> &'static str {
        match self {
            LabError::ConfigRead { .. } => "CONFIG_READ",
            LabError::ConfigParse { .. } => "CONFIG_PARSE",
            LabError::UnknownAccount(_) => "UNKNOWN_ACCOUNT",
            LabError::DuplicateAccount(_) => "DUPLICATE_ACCOUNT",
            LabError::ThreadSpawn(_) => "THREAD_SPAWN",
            LabError::TaskJoin(_) => "TASK_JOIN",
            LabError::BalancesBusy => "BALANCES_BUSY",
            LabError::LogInit(_) => "LOG_INIT",
        }
    }

    /// Whether the error comes from loading configuration
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            LabError::ConfigRead { .. } | LabError::ConfigParse { .. }
        )
    }
}

impl From<tokio::task::JoinError> for LabError {
    fn from(e: tokio::task::JoinError) -> Self {
        LabError::TaskJoin(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            LabError::UnknownAccount("Bob".into()).code(),
            "UNKNOWN_ACCOUNT"
        );
        assert_eq!(
            LabError::DuplicateAccount("Bob".into()).code(),
            "DUPLICATE_ACCOUNT"
        );
        assert_eq!(LabError::TaskJoin("boom".into()).code(), "TASK_JOIN");
        assert_eq!(LabError::BalancesBusy.code(), "BALANCES_BUSY");
    }

    #[test]
    fn test_config_classification() {
        let err = LabError::ConfigRead {
            path: "config/missing.yaml".into(),
            source: io::Error::new(io::ErrorKind::NotFound, "missing"),
        };
        assert!(err.is_config_error());
        assert!(!LabError::UnknownAccount("x".into()).is_config_error());
    }

    #[test]
    fn test_display() {
        let err = LabError::UnknownAccount("Bob".into());
        assert_eq!(err.to_string(), "Unknown account: Bob");
    }
}
