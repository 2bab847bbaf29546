//! Domain errors.
//!
//! Every variant maps to a stable wire code so the front end can branch on
//! `error.code` without parsing messages.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0} already exists")]
    Duplicate(String),

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("registration is already {0}")]
    InvalidTransition(String),

    #[error("import failed: {0}")]
    Import(String),

    #[error("store error: {0:#}")]
    Store(#[from] anyhow::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "not_found",
            AppError::Validation(_) => "bad_params",
            AppError::Duplicate(_) => "duplicate",
            AppError::InvalidCredentials => "invalid_credentials",
            AppError::InvalidTransition(_) => "invalid_transition",
            AppError::Import(_) => "import_failed",
            AppError::Store(_) => "store_failed",
            AppError::Serialization(_) => "store_failed",
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        AppError::NotFound(what.into())
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
