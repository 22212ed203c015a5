use std::path::PathBuf;

use thiserror::Error;

/// Failure of a single remote call.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{method} {path} returned {status}: {body}")]
    Status {
        method: &'static str,
        path: String,
        status: u16,
        body: String,
    },
    #[error("invalid API base URL {0:?}")]
    BaseUrl(String),
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Status { status: 401 | 403, .. })
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("authorization was denied: {0}")]
    Denied(String),
    #[error("no authorization response within {0} seconds")]
    Timeout(u64),
    #[error("authorization state mismatch")]
    StateMismatch,
    #[error("redirect listener failed: {0}")]
    Listener(#[from] std::io::Error),
    #[error("token exchange failed: {0}")]
    Exchange(#[from] reqwest::Error),
    #[error("oauth client_id and client_secret must be set in the [oauth] config table")]
    MissingClient,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("unknown action {0:?} in [keys]")]
    UnknownAction(String),
    #[error("invalid key {0:?} in [keys]")]
    InvalidKey(String),
    #[error("unknown tab {0:?}")]
    UnknownTab(String),
    #[error("no API token: pass --token, set TASKLANE_TOKEN, or run `tasklane login`")]
    MissingToken,
}

/// Local validation that blocks a submit before any request is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("Content is required")]
    EmptyContent,
    #[error("Name is required")]
    EmptyName,
    #[error("Comment is empty")]
    EmptyComment,
    #[error("Unrecognised priority {0:?}; use 1-4")]
    Priority(String),
    #[error("Unrecognised date {0:?}")]
    Date(String),
}
