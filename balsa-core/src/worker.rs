//! C4: the worker thread. One per open stream, it is the only thing that
//! ever touches the transport FIFO fd after `attach_fifo`, and the only
//! thing that advances `hw_ptr`. Five steps, repeated every period:
//!
//! 1. wait for the transport FIFO to be attached (or for the stream to be
//!    torn down first);
//! 2. obtain the mmap area from the host;
//! 3. while running, transfer one period's worth of frames between the
//!    ring buffer and the FIFO, pacing playback with the rate
//!    synchronizer and detecting underrun/overrun against the host's
//!    `avail()`;
//! 4. publish `hw_ptr` and wake the host through the eventfd after every
//!    period;
//! 5. on fatal loss of the transport, write the eventfd sentinel and exit.

use std::os::fd::{AsRawFd, BorrowedFd, OwnedFd, RawFd};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use log::{debug, error, warn};
use nix::errno::Errno;
use nix::poll::{PollFd, PollFlags, PollTimeout};
use nix::unistd;

use crate::constraints::Constraints;
use crate::eventfd::EventFd;
use crate::host::HostContext;
use crate::ring::advance_wrapping;
use crate::state::StreamState;
use crate::stream::{Direction, Shared, RESUME_POLL_INTERVAL};

pub struct WorkerHandle {
    thread: JoinHandle<()>,
}

impl WorkerHandle {
    pub fn join(self) -> std::thread::Result<()> {
        self.thread.join()
    }
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn spawn<H: HostContext + 'static>(
    direction: Direction,
    constraints: Constraints,
    buffer_size: u64,
    period_size: u64,
    hw_boundary: u64,
    shared: Arc<Shared>,
    event_fd: Arc<EventFd>,
    host: Arc<H>,
    fifo: Arc<Mutex<Option<OwnedFd>>>,
) -> WorkerHandle {
    let name = match direction {
        Direction::Capture => "balsa/capture",
        Direction::Playback => "balsa/playback",
    };
    let thread = balsa_util::thread::start(name, move || {
        run(direction, constraints, buffer_size, period_size, hw_boundary, shared, event_fd, host, fifo)
    });
    WorkerHandle { thread }
}

#[allow(clippy::too_many_arguments)]
fn run<H: HostContext>(
    direction: Direction,
    constraints: Constraints,
    buffer_size: u64,
    period_size: u64,
    hw_boundary: u64,
    shared: Arc<Shared>,
    event_fd: Arc<EventFd>,
    host: Arc<H>,
    fifo: Arc<Mutex<Option<OwnedFd>>>,
) {
    let frame_size = constraints.frame_size();
    let mut rate = crate::ratesync::RateSynchronizer::new(constraints.rate);
    let mut scratch = vec![0u8; period_size as usize * frame_size];

    loop {
        if shared.get_state().is_terminal() {
            return;
        }

        // Step 1: wait for the transport FIFO.
        let raw_fd = match wait_for_fifo(&shared, &fifo) {
            Some(fd) => fd,
            None => return,
        };

        // Step 2: obtain the mmap area.
        let ring = host.ring();
        rate.reset();

        // Step 3-4: period loop.
        loop {
            let state = shared.get_state();
            if state.is_terminal() {
                return;
            }
            if state == StreamState::Paused || state == StreamState::Prepared {
                std::thread::sleep(RESUME_POLL_INTERVAL);
                continue;
            }
            if !fifo_still_attached(&fifo) {
                break; // go back to step 1
            }

            let hw_ptr = *shared.hw_ptr.lock().unwrap();
            let avail = host.avail(hw_ptr, hw_boundary, buffer_size);

            if state == StreamState::Draining && avail == 0 {
                shared.set_state(StreamState::Prepared);
                break;
            }

            if avail < period_size {
                warn!("{:?}: underrun, avail={} period_size={}", direction, avail, period_size);
                shared.set_state(StreamState::XRun);
                std::thread::sleep(RESUME_POLL_INTERVAL);
                continue;
            }

            let frames = ring.period_frames(hw_ptr % buffer_size.max(1), period_size);
            let bytes = frames as usize * frame_size;

            let transferred = match direction {
                Direction::Playback => {
                    unsafe { ring.read_frames(hw_ptr % buffer_size.max(1), frames, frame_size, &mut scratch[..bytes]) };
                    write_all(raw_fd, &scratch[..bytes])
                }
                Direction::Capture => match read_some(raw_fd, &mut scratch[..bytes]) {
                    Ok(n) => {
                        if n > 0 {
                            unsafe {
                                ring.write_frames(hw_ptr % buffer_size.max(1), (n / frame_size) as u64, frame_size, &scratch[..n])
                            };
                        }
                        Ok(n)
                    }
                    Err(e) => Err(e),
                },
            };

            let transferred = match transferred {
                Ok(n) => n,
                Err(Errno::EPIPE) | Err(Errno::ECONNRESET) => {
                    error!("{:?}: transport lost", direction);
                    *fifo.lock().unwrap() = None;
                    shared.set_state(StreamState::Disconnected);
                    let _ = event_fd.notify_fatal();
                    return;
                }
                Err(Errno::EAGAIN) | Err(Errno::EINTR) => 0,
                Err(e) => {
                    error!("{:?}: i/o error: {}", direction, e);
                    shared.set_state(StreamState::Disconnected);
                    let _ = event_fd.notify_fatal();
                    return;
                }
            };

            if transferred == 0 {
                continue;
            }

            let moved_frames = (transferred / frame_size).max(1) as u64;
            let new_hw_ptr = advance_wrapping(hw_ptr, moved_frames, hw_boundary);
            *shared.hw_ptr.lock().unwrap() = new_hw_ptr;

            if direction == Direction::Playback {
                rate.sync(moved_frames);
            }

            if let Err(e) = event_fd.notify_progress(1) {
                debug!("eventfd notify failed: {}", e);
            }
        }
    }
}

fn wait_for_fifo(shared: &Shared, fifo: &Mutex<Option<OwnedFd>>) -> Option<RawFd> {
    loop {
        if shared.get_state().is_terminal() {
            return None;
        }
        if let Some(fd) = fifo.lock().unwrap().as_ref() {
            return Some(fd.as_raw_fd());
        }
        std::thread::sleep(RESUME_POLL_INTERVAL);
    }
}

fn fifo_still_attached(fifo: &Mutex<Option<OwnedFd>>) -> bool {
    fifo.lock().unwrap().is_some()
}

fn write_all(fd: RawFd, buf: &[u8]) -> Result<usize, Errno> {
    let borrowed = unsafe { BorrowedFd::borrow_raw(fd) };
    wait_writable(fd)?;
    unistd::write(borrowed, buf)
}

fn read_some(fd: RawFd, buf: &mut [u8]) -> Result<usize, Errno> {
    wait_readable(fd)?;
    unistd::read(fd, buf)
}

fn wait_writable(fd: RawFd) -> Result<(), Errno> {
    poll_one(fd, PollFlags::POLLOUT)
}

fn wait_readable(fd: RawFd) -> Result<(), Errno> {
    poll_one(fd, PollFlags::POLLIN)
}

fn poll_one(fd: RawFd, flags: PollFlags) -> Result<(), Errno> {
    let mut fds = [PollFd::new(fd, flags)];
    let timeout_ms = RESUME_POLL_INTERVAL.as_millis() as nix::libc::c_int;
    match nix::poll::poll(&mut fds, timeout_ms) {
        Ok(0) => Err(Errno::EAGAIN),
        Ok(_) => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::Constraints;
    use crate::host::test_support::FakeHost;
    use crate::stream::{Direction, Stream};

    #[test]
    fn playback_moves_frames_once_fifo_attached() {
        let constraints = Constraints::for_transport(2, 48_000);
        let host = FakeHost::new(4800, 4);
        let mut stream = Stream::new(Direction::Playback, constraints, host).unwrap();
        stream.hw_params(480, 4).unwrap();
        stream.prepare().unwrap();
        stream.start().unwrap();

        let (rx, tx) = nix::unistd::pipe().unwrap();
        stream.attach_fifo(tx);

        // give the worker a moment to push at least one period through.
        std::thread::sleep(Duration::from_millis(250));

        let mut buf = [0u8; 1920];
        let n = unistd::read(rx.as_raw_fd(), &mut buf).unwrap_or(0);
        assert!(n > 0, "expected playback worker to have written at least one period");

        stream.close().unwrap();
    }
}
