//! Wire-level types and the daemon client (C1) shared by the PCM streaming
//! core and the device monitor.
//!
//! The actual framing (length-prefixed JSON over a UNIX socket, FIFO fds
//! passed as SCM_RIGHTS ancillary data) is an implementation detail of
//! [`client::DaemonClient`] — callers only see the request/reply operations
//! described by the daemon client contract.

pub mod address;
pub mod client;
pub mod error;
pub mod event;
pub mod transport;
pub mod wire;

pub use address::Address;
pub use error::{DaemonError, ProfileParseError};
pub use event::{Event, EventMask};
pub use transport::{ProfileType, StreamDirection, Transport, TransportId};
