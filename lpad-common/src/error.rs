// lpad-common/src/error.rs
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::state::LauncherState;

#[derive(Error, Debug, Clone)]
pub enum LpadError {
    #[error("I/O Error: {0}")]
    Io(#[from] Arc<std::io::Error>),

    #[error("HTTP Request Error: {0}")]
    Http(#[from] Arc<reqwest::Error>),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] Arc<serde_json::Error>),

    #[error("Network Error: {0}")]
    Network(String),

    #[error("Permission Error: {0}")]
    Permission(String),

    #[error("Installation Error: {0}")]
    Install(String),

    #[error("Executable not found at {}. It may have been moved or deleted.", .0.display())]
    ExecutableMissing(PathBuf),

    #[error("Launch Error: {0}")]
    Launch(String),

    #[error("Configuration Error: {0}")]
    Configuration(String),

    #[error("Invalid state transition from {from:?} to {to}")]
    InvalidTransition {
        from: Option<LauncherState>,
        to: LauncherState,
    },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Generic Error: {0}")]
    Generic(String),
}

/// Coarse grouping used by the shell to decide how a failure is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Permission,
    Install,
    Launch,
    Configuration,
    Internal,
}

impl LpadError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            LpadError::Http(_) | LpadError::Network(_) | LpadError::Json(_) => {
                ErrorCategory::Network
            }
            LpadError::Permission(_) => ErrorCategory::Permission,
            LpadError::Install(_) | LpadError::Cancelled => ErrorCategory::Install,
            LpadError::ExecutableMissing(_) | LpadError::Launch(_) => ErrorCategory::Launch,
            LpadError::Configuration(_) => ErrorCategory::Configuration,
            LpadError::Io(_) | LpadError::InvalidTransition { .. } | LpadError::Generic(_) => {
                ErrorCategory::Internal
            }
        }
    }
}

impl From<std::io::Error> for LpadError {
    fn from(err: std::io::Error) -> Self {
        LpadError::Io(Arc::new(err))
    }
}

impl From<reqwest::Error> for LpadError {
    fn from(err: reqwest::Error) -> Self {
        LpadError::Http(Arc::new(err))
    }
}

impl From<serde_json::Error> for LpadError {
    fn from(err: serde_json::Error) -> Self {
        LpadError::Json(Arc::new(err))
    }
}

pub type Result<T> = std::result::Result<T, LpadError>;
