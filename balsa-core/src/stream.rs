//! The `Stream` type: one open PCM instance and the callback contract the
//! host sound stack drives it through (§4.1).

use std::os::fd::OwnedFd;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use log::{debug, warn};

use crate::constraints::Constraints;
use crate::error::CoreError;
use crate::eventfd::EventFd;
use crate::host::HostContext;
use crate::ratesync::RateSynchronizer;
use crate::ring::RingBufferView;
use crate::state::StreamState;
use crate::worker::{self, WorkerHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Capture,
    Playback,
}

/// How long the worker waits on the resume condvar between re-checks of
/// state while paused or waiting for the transport FIFO. Matches the
/// design note's "condition variable, semaphore, event" substitution for
/// the original real-time-signal wakeup.
pub const RESUME_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Shared, lock-guarded fields the worker thread and the callback contract
/// both touch.
pub(crate) struct Shared {
    pub state: Mutex<StreamState>,
    pub resume: Condvar,
    pub io_ptr: Mutex<u64>,
    pub hw_ptr: Mutex<u64>,
}

impl Shared {
    fn new() -> Self {
        Shared {
            state: Mutex::new(StreamState::Open),
            resume: Condvar::new(),
            io_ptr: Mutex::new(0),
            hw_ptr: Mutex::new(0),
        }
    }

    pub(crate) fn set_state(&self, state: StreamState) {
        *self.state.lock().unwrap() = state;
        self.resume.notify_all();
    }

    pub(crate) fn get_state(&self) -> StreamState {
        *self.state.lock().unwrap()
    }
}

/// One open PCM stream (`balsa-pcm`'s plugin opens one of these per client
/// connection). Generic over the host integration so this crate has no
/// compile-time dependency on any specific sound-stack ABI.
pub struct Stream<H: HostContext + 'static> {
    direction: Direction,
    constraints: Constraints,
    buffer_size: u64,
    period_size: u64,
    hw_boundary: u64,
    shared: Arc<Shared>,
    event_fd: Arc<EventFd>,
    host: Arc<H>,
    fifo: Arc<Mutex<Option<OwnedFd>>>,
    worker: Mutex<Option<WorkerHandle>>,
}

impl<H: HostContext + 'static> Stream<H> {
    pub fn new(direction: Direction, constraints: Constraints, host: H) -> Result<Self, CoreError> {
        let event_fd = EventFd::new().map_err(|e| CoreError::Io(std::io::Error::from(e)))?;
        Ok(Stream {
            direction,
            constraints,
            buffer_size: 0,
            period_size: 0,
            hw_boundary: 0,
            shared: Arc::new(Shared::new()),
            event_fd: Arc::new(event_fd),
            host: Arc::new(host),
            fifo: Arc::new(Mutex::new(None)),
            worker: Mutex::new(None),
        })
    }

    pub fn state(&self) -> StreamState {
        self.shared.get_state()
    }

    /// Attach the transport's FIFO fd. Called once `set_device` has handed
    /// a transport to the stream; until this happens the worker has
    /// nothing to read or write and stays parked.
    pub fn attach_fifo(&self, fd: OwnedFd) {
        *self.fifo.lock().unwrap() = Some(fd);
        self.shared.resume.notify_all();
    }

    pub fn detach_fifo(&self) {
        self.fifo.lock().unwrap().take();
        self.shared.set_state(StreamState::Disconnected);
    }

    // ---- §4.1 callback contract ----

    pub fn hw_params(&mut self, period_size: u64, periods: u32) -> Result<(), CoreError> {
        if self.state() != StreamState::Open && self.state() != StreamState::HwConfigured {
            return Err(CoreError::Invalid("hw_params called outside Open/HwConfigured"));
        }
        let period_bytes = period_size as usize * self.constraints.frame_size();
        self.constraints
            .validate_period_bytes(period_bytes)
            .map_err(CoreError::Invalid)?;
        self.constraints.validate_periods(periods).map_err(CoreError::Invalid)?;

        self.period_size = period_size;
        self.buffer_size = period_size * periods as u64;
        // hw_boundary is the point io_ptr/hw_ptr wrap back to zero; it's a
        // multiple of buffer_size comfortably larger than any realistic
        // session, chosen the way ALSA plugins pick it: the largest
        // multiple of buffer_size that fits in the pointer type headroom
        // we're willing to use before wrapping matters.
        self.hw_boundary = self.buffer_size.saturating_mul(1 << 20);

        self.shared.set_state(StreamState::HwConfigured);
        debug!(
            "hw_params: period_size={} periods={} buffer_size={}",
            period_size, periods, self.buffer_size
        );
        Ok(())
    }

    pub fn hw_free(&mut self) -> Result<(), CoreError> {
        self.stop_worker();
        self.buffer_size = 0;
        self.period_size = 0;
        self.shared.set_state(StreamState::Open);
        Ok(())
    }

    pub fn sw_params(&mut self) -> Result<(), CoreError> {
        // no sw_params-level configuration beyond hw geometry is needed;
        // kept as a distinct call to match the callback contract shape.
        Ok(())
    }

    pub fn prepare(&mut self) -> Result<(), CoreError> {
        if self.state().is_terminal() {
            return Err(CoreError::NoDevice);
        }
        *self.shared.io_ptr.lock().unwrap() = 0;
        *self.shared.hw_ptr.lock().unwrap() = 0;
        self.shared.set_state(StreamState::Prepared);

        if self.worker.lock().unwrap().is_none() {
            let handle = worker::spawn(
                self.direction,
                self.constraints,
                self.buffer_size,
                self.period_size,
                self.hw_boundary,
                Arc::clone(&self.shared),
                Arc::clone(&self.event_fd),
                Arc::clone(&self.host),
                Arc::clone(&self.fifo),
            );
            *self.worker.lock().unwrap() = Some(handle);
        }
        Ok(())
    }

    pub fn start(&mut self) -> Result<(), CoreError> {
        if self.state() != StreamState::Prepared && self.state() != StreamState::Paused {
            return Err(CoreError::Invalid("start called outside Prepared/Paused"));
        }
        self.shared.set_state(StreamState::Running);
        Ok(())
    }

    pub fn stop(&mut self) -> Result<(), CoreError> {
        self.shared.set_state(StreamState::Prepared);
        Ok(())
    }

    pub fn pause(&mut self, enable: bool) -> Result<(), CoreError> {
        if enable {
            self.shared.set_state(StreamState::Paused);
        } else {
            self.shared.set_state(StreamState::Running);
        }
        Ok(())
    }

    pub fn drain(&mut self) -> Result<(), CoreError> {
        if self.direction == Direction::Capture {
            // capture has nothing to flush; treat as an immediate stop.
            return self.stop();
        }
        self.shared.set_state(StreamState::Draining);
        Ok(())
    }

    pub fn pointer(&self) -> u64 {
        *self.shared.hw_ptr.lock().unwrap() % self.buffer_size.max(1)
    }

    pub fn delay(&self) -> i64 {
        let io_ptr = *self.shared.io_ptr.lock().unwrap();
        let hw_ptr = *self.shared.hw_ptr.lock().unwrap();
        io_ptr as i64 - hw_ptr as i64
    }

    pub fn ring(&self) -> RingBufferView {
        self.host.ring()
    }

    pub fn poll_descriptors_count(&self) -> usize {
        1
    }

    pub fn poll_descriptors(&self) -> Vec<std::os::fd::RawFd> {
        use std::os::fd::AsRawFd;
        vec![self.event_fd.as_raw_fd()]
    }

    /// Drain the eventfd and translate it into revents plus a fatal flag.
    /// The host's poll loop calls this after `poll()` reports the eventfd
    /// readable.
    pub fn poll_revents(&self) -> Result<(u64, bool), CoreError> {
        self.event_fd
            .consume()
            .map_err(|e| CoreError::Io(std::io::Error::from(e)))
    }

    pub fn close(&mut self) -> Result<(), CoreError> {
        self.stop_worker();
        self.shared.set_state(StreamState::Closed);
        Ok(())
    }

    pub fn dump(&self) -> String {
        format!(
            "direction={:?} state={:?} buffer_size={} period_size={} io_ptr={} hw_ptr={}",
            self.direction,
            self.state(),
            self.buffer_size,
            self.period_size,
            *self.shared.io_ptr.lock().unwrap(),
            *self.shared.hw_ptr.lock().unwrap(),
        )
    }

    fn stop_worker(&mut self) {
        self.shared.set_state(StreamState::Disconnected);
        if let Some(handle) = self.worker.lock().unwrap().take() {
            if let Err(e) = handle.join() {
                warn!("worker thread did not exit cleanly: {e:?}");
            }
        }
    }
}

impl<H: HostContext + 'static> Drop for Stream<H> {
    fn drop(&mut self) {
        self.stop_worker();
    }
}

/// Rate synchronizer construction is shared between capture and playback
/// worker branches; kept here rather than in `worker.rs` so tests can
/// reach it without pulling in the whole worker loop.
pub(crate) fn rate_synchronizer_for(rate: u32) -> RateSynchronizer {
    RateSynchronizer::new(rate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::test_support::FakeHost;

    fn stream() -> Stream<FakeHost> {
        let constraints = Constraints::for_transport(2, 48_000);
        Stream::new(Direction::Playback, constraints, FakeHost::new(4800, 4)).unwrap()
    }

    #[test]
    fn starts_in_open_state() {
        assert_eq!(stream().state(), StreamState::Open);
    }

    #[test]
    fn hw_params_rejects_undersized_period() {
        let mut s = stream();
        assert!(s.hw_params(1, 4).is_err());
    }

    #[test]
    fn hw_params_then_prepare_reaches_prepared() {
        let mut s = stream();
        s.hw_params(480, 4).unwrap();
        s.prepare().unwrap();
        assert_eq!(s.state(), StreamState::Prepared);
        s.close().unwrap();
    }

    #[test]
    fn pause_toggles_between_running_and_paused() {
        let mut s = stream();
        s.hw_params(480, 4).unwrap();
        s.prepare().unwrap();
        s.start().unwrap();
        s.pause(true).unwrap();
        assert_eq!(s.state(), StreamState::Paused);
        s.pause(false).unwrap();
        assert_eq!(s.state(), StreamState::Running);
        s.close().unwrap();
    }

    #[test]
    fn capture_drain_is_immediate_stop() {
        let constraints = Constraints::for_transport(2, 48_000);
        let mut s = Stream::new(Direction::Capture, constraints, FakeHost::new(4800, 4)).unwrap();
        s.hw_params(480, 4).unwrap();
        s.prepare().unwrap();
        s.start().unwrap();
        s.drain().unwrap();
        assert_eq!(s.state(), StreamState::Prepared);
        s.close().unwrap();
    }
}
