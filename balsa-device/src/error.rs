use thiserror::Error;

use balsa_protocol::DaemonError;

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("daemon error: {0}")]
    Daemon(#[from] DaemonError),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no transport currently attached")]
    NotAttached,
}
