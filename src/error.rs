use std::path::PathBuf;

/// Errors surfaced by the session layer and the typed API client.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server rejected the session token on a guarded path. Local
    /// state has already been wiped and a redirect event emitted by the
    /// time the caller sees this.
    #[error("session expired: {detail}")]
    SessionExpired { detail: String },

    /// The account behind the session was deactivated (403 with the
    /// inactive code). The deactivation notice flow has been started.
    #[error("account deactivated")]
    AccountInactive,

    #[error("login rejected: {0}")]
    Credentials(String),

    #[error("state file error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("payload error: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("invalid header value: {0}")]
    Header(#[from] reqwest::header::InvalidHeaderValue),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl Error {
    pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Storage {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
