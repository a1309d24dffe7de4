//! C5: the device monitor client library (§4.2). Where `balsa-core`'s
//! `Stream` drives a full mmap ring buffer through the ALSA-style callback
//! contract, `Monitor` is the simpler surface: it watches the daemon for a
//! matching transport, attaches to its FIFO as it comes and goes, and
//! offers direct blocking `readi`/`writei` against whatever is currently
//! attached. Intended for callers that want PCM frames without hosting a
//! full mmap plugin -- a metering tool, a test harness, a simple recorder.

mod error;
mod monitor;

pub use error::DeviceError;
pub use monitor::Monitor;

pub use balsa_protocol::{Address, ProfileType, StreamDirection};
