use std::time::Duration;

use reqwest::StatusCode;

/// Every way a weekly report run can fail.
///
/// "Nothing to bill" is not an error; see [`crate::service::RunOutcome`].
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("required environment variables are empty: {}", .0.join(", "))]
    MissingConfig(Vec<&'static str>),

    #[error("no destination emails were set")]
    NoRecipients,

    #[error("invalid value for {key}: {message}")]
    InvalidConfig { key: &'static str, message: String },

    #[error("failed to load timezone {0}")]
    Timezone(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("no workspaces were found")]
    NoWorkspaces,

    #[error("request to {endpoint} failed: {source}")]
    Http {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned status {status}: {body}")]
    Status {
        endpoint: String,
        status: StatusCode,
        body: String,
    },

    #[error("failed to decode response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode request for {endpoint}: {source}")]
    Encode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("run deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),

    #[error("failed to build email: {0}")]
    Email(String),

    #[error("failed to deliver email: {0}")]
    Delivery(String),
}

pub type Result<T> = std::result::Result<T, ReportError>;
