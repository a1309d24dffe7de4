//! The PCM streaming core (C4), built on top of the rate synchronizer (C2)
//! and the bit-addressed ring buffer view (C3).
//!
//! A [`Stream`] is one open PCM instance (capture or playback). It owns the
//! daemon control socket, the transport FIFO, and the hardware pointer; the
//! host sound stack drives it through the callback contract in [`Stream`]'s
//! inherent methods and is responsible for the mmap area and the consumer's
//! own `appl_ptr`, surfaced here through [`HostContext`].

pub mod constraints;
pub mod error;
pub mod eventfd;
pub mod host;
pub mod ratesync;
pub mod ring;
pub mod state;
pub mod stream;
pub mod worker;

pub use error::CoreError;
pub use host::HostContext;
pub use ratesync::RateSynchronizer;
pub use ring::{MmapArea, RingBufferView};
pub use state::StreamState;
pub use stream::{Direction, Stream};
