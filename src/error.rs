use thiserror::Error;

/// Failure of a storage backend operation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no remote URI configured")]
    NoRemoteUri,
    #[error("remote client library unavailable (built without the `remote` feature)")]
    ClientUnavailable,
    #[error("remote request failed: {0}")]
    Remote(String),
    #[error("remote returned {status}: {body}")]
    RemoteStatus { status: u16, body: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(feature = "remote")]
impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        StoreError::Remote(err.to_string())
    }
}

/// Rejected input for a new application.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("company must not be empty")]
    EmptyCompany,
    #[error("role must not be empty")]
    EmptyRole,
    #[error("invalid date '{0}' (use YYYY-MM-DD)")]
    InvalidDate(String),
    #[error("unknown work mode '{0}' (on-site, remote, hybrid)")]
    UnknownMode(String),
    #[error("unknown status '{0}' (applied, interview, rejected, hired)")]
    UnknownStatus(String),
}
