use thiserror::Error;

/// Configuration errors surfaced immediately to the consumer (EINVAL territory).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProfileParseError {
    #[error("invalid bluetooth address")]
    InvalidAddress,
    #[error("unknown profile type")]
    UnknownProfile,
}

/// Errors from talking to the Bluetooth audio daemon.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("connecting to daemon on interface {0}: {1}")]
    Connect(String, std::io::Error),
    #[error("daemon socket i/o: {0}")]
    Io(#[from] std::io::Error),
    #[error("daemon hung up")]
    HangUp,
    #[error("malformed reply from daemon: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("daemon rejected request: {0}")]
    Rejected(String),
    #[error("daemon reply carried no file descriptor")]
    MissingFd,
}

impl DaemonError {
    /// True for the transient-loss taxonomy: local recovery by tearing down
    /// and re-attaching, not a failure surfaced to the stream's caller.
    pub fn is_transient(&self) -> bool {
        matches!(self, DaemonError::HangUp | DaemonError::Io(_))
    }
}
