use thiserror::Error;

/// Failure of a single backend call.
///
/// Callers decide what to do with each kind; nothing below the tool boundary
/// recovers from any of them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// No usable credential; raised before any request is attempted.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The backend answered with a non-success status.
    #[error("backend returned HTTP {status}: {body}")]
    Backend { status: u16, body: String },

    /// The request never produced a usable response. `timed_out` is set only
    /// when the request's own deadline expired.
    #[error("transport error: {cause}")]
    Transport { cause: String, timed_out: bool },
}

impl ClientError {
    pub fn configuration(message: impl Into<String>) -> Self {
        ClientError::Configuration(message.into())
    }

    pub fn transport(message: impl Into<String>) -> Self {
        ClientError::Transport {
            cause: message.into(),
            timed_out: false,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        ClientError::Transport {
            cause: message.into(),
            timed_out: true,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ClientError::Transport { timed_out: true, .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Backend { status, .. } => Some(*status),
            _ => None,
        }
    }
}
