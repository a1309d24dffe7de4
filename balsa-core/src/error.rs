use thiserror::Error;

use balsa_protocol::DaemonError;

/// Errors surfaced from the callback contract (§4.1). These map to negative
/// errno values at the plugin boundary; the mapping lives in `balsa-pcm`.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("daemon error: {0}")]
    Daemon(#[from] DaemonError),
    #[error("stream is detached")]
    NoDevice,
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    Invalid(&'static str),
}
