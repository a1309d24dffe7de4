//! The worker's notification channel to the host sound stack: a Linux
//! `eventfd` the host polls alongside its own fds. Ordinary progress writes
//! the period count; a fatal stream loss ORs in a high-bit sentinel so the
//! host can tell "more data is ready" apart from "this stream is dead"
//! without a second round-trip.

use std::os::fd::{AsRawFd, OwnedFd, RawFd};

use nix::sys::eventfd::{EfdFlags, EventFd as NixEventFd};
use nix::unistd;

/// High bits OR'd into the eventfd value on fatal stream loss. Counting
/// writes add at most `u32::MAX` periods before overflowing into this
/// range, which is expected to be eons of continuous playback.
pub const EVENTFD_SENTINEL: u64 = 0xDEAD_0000_0000_0000;
pub const EVENTFD_SENTINEL_MASK: u64 = 0xFFFF_0000_0000_0000;

pub struct EventFd {
    inner: NixEventFd,
}

impl EventFd {
    pub fn new() -> nix::Result<Self> {
        let inner = NixEventFd::from_flags(EfdFlags::EFD_CLOEXEC | EfdFlags::EFD_NONBLOCK)?;
        Ok(EventFd { inner })
    }

    /// Record that `periods` more periods have completed.
    pub fn notify_progress(&self, periods: u64) -> nix::Result<()> {
        write_value(self.inner.as_raw_fd(), periods.max(1))
    }

    /// Mark the stream as fatally lost. The host's poll loop distinguishes
    /// this from ordinary progress by masking with [`EVENTFD_SENTINEL_MASK`]
    /// rather than comparing for equality, since a counting write may have
    /// coalesced with the sentinel write.
    pub fn notify_fatal(&self) -> nix::Result<()> {
        write_value(self.inner.as_raw_fd(), EVENTFD_SENTINEL | 1)
    }

    /// Drain the current counter value, returning `(periods, fatal)`.
    /// Returns `(0, false)` if no notification is pending.
    pub fn consume(&self) -> nix::Result<(u64, bool)> {
        match read_value(self.inner.as_raw_fd()) {
            Ok(value) => {
                let fatal = value & EVENTFD_SENTINEL_MASK == EVENTFD_SENTINEL;
                Ok((value & !EVENTFD_SENTINEL_MASK, fatal))
            }
            Err(nix::errno::Errno::EAGAIN) => Ok((0, false)),
            Err(e) => Err(e),
        }
    }
}

impl AsRawFd for EventFd {
    fn as_raw_fd(&self) -> RawFd {
        self.inner.as_raw_fd()
    }
}

impl From<EventFd> for OwnedFd {
    fn from(value: EventFd) -> Self {
        value.inner.into()
    }
}

fn write_value(fd: RawFd, value: u64) -> nix::Result<()> {
    let buf = value.to_ne_bytes();
    unistd::write(unsafe { std::os::fd::BorrowedFd::borrow_raw(fd) }, &buf)?;
    Ok(())
}

fn read_value(fd: RawFd) -> nix::Result<u64> {
    let mut buf = [0u8; 8];
    unistd::read(fd, &mut buf)?;
    Ok(u64::from_ne_bytes(buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_mask_isolates_high_bits() {
        let value = EVENTFD_SENTINEL | 3;
        assert_eq!(value & EVENTFD_SENTINEL_MASK, EVENTFD_SENTINEL);
        assert_eq!(value & !EVENTFD_SENTINEL_MASK, 3);
    }

    #[test]
    fn progress_and_fatal_round_trip() {
        let efd = EventFd::new().expect("eventfd");
        efd.notify_progress(4).expect("write");
        let (periods, fatal) = efd.consume().expect("read");
        assert_eq!(periods, 4);
        assert!(!fatal);

        efd.notify_fatal().expect("write");
        let (_, fatal) = efd.consume().expect("read");
        assert!(fatal);
    }

    #[test]
    fn consume_with_nothing_pending_is_zero() {
        let efd = EventFd::new().expect("eventfd");
        let (periods, fatal) = efd.consume().expect("read");
        assert_eq!(periods, 0);
        assert!(!fatal);
    }
}
