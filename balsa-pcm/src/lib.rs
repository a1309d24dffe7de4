//! §6 exported symbols: the plugin registration entry point a host sound
//! stack calls to open a PCM instance, `set_remote_device` to point an
//! open instance at a Bluetooth transport, and the device-monitor library
//! symbols re-exported for callers that only want raw frames without
//! hosting a full plugin.
//!
//! The original design kept a single global `the_pcm` pointer -- one PCM
//! instance per process, because the plugin is loaded once per configured
//! ALSA device name. Here that's replaced with an explicit registry keyed
//! by [`StreamHandle`], so nothing here has to reach for a raw static
//! pointer: see `DESIGN.md` for the reasoning.

pub mod config;

use std::collections::HashMap;
use std::os::fd::{AsRawFd, RawFd};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use log::warn;

use balsa_core::constraints::Constraints;
use balsa_core::host::HostContext;
use balsa_core::ring::{MmapArea, RingBufferView};
use balsa_core::{CoreError, Direction, Stream};
use balsa_device::{Address, Monitor, ProfileType, StreamDirection};

/// Opaque handle the host sound stack holds for the lifetime of one open
/// PCM instance. Returned by [`open`], passed back into every other call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamHandle(u64);

/// A `HostContext` backed by a raw mmap region the caller owns -- the
/// actual plugin ABI's buffer, handed to us as a pointer and geometry
/// rather than allocated here.
pub struct PluginHost {
    ring: RingBufferView,
    appl_ptr: AtomicU64,
}

impl PluginHost {
    /// # Safety
    /// `base` must describe a region valid for the declared buffer size
    /// for as long as this `PluginHost` (and the `Stream` built on it) is
    /// alive.
    pub unsafe fn new(base: *mut u8, first_bit: usize, step_bits: usize, buffer_size: u64) -> Self {
        let area = MmapArea::new(base, first_bit, step_bits);
        PluginHost {
            ring: RingBufferView::new(area, buffer_size),
            appl_ptr: AtomicU64::new(0),
        }
    }

    /// Called by the plugin glue whenever the consumer advances its
    /// application pointer.
    pub fn set_appl_ptr(&self, value: u64) {
        self.appl_ptr.store(value, Ordering::SeqCst);
    }
}

impl HostContext for PluginHost {
    fn appl_ptr(&self) -> u64 {
        self.appl_ptr.load(Ordering::SeqCst)
    }

    fn avail(&self, hw_ptr: u64, _hw_boundary: u64, buffer_size: u64) -> u64 {
        self.appl_ptr().wrapping_sub(hw_ptr).min(buffer_size)
    }

    fn ring(&self) -> RingBufferView {
        self.ring
    }
}

struct Entry {
    stream: Arc<Mutex<Stream<PluginHost>>>,
    monitor: Mutex<Option<Monitor>>,
}

fn registry() -> &'static Mutex<HashMap<StreamHandle, Entry>> {
    static REGISTRY: OnceLock<Mutex<HashMap<StreamHandle, Entry>>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

fn next_handle() -> StreamHandle {
    static NEXT: AtomicU64 = AtomicU64::new(1);
    StreamHandle(NEXT.fetch_add(1, Ordering::SeqCst))
}

/// Plugin registration entry point: open a new PCM instance for
/// `direction` with the given hardware geometry, returning the handle the
/// host uses for every subsequent call.
pub fn open(direction: Direction, constraints: Constraints, host: PluginHost) -> Result<StreamHandle, CoreError> {
    let stream = Stream::new(direction, constraints, host)?;
    let handle = next_handle();
    registry().lock().unwrap().insert(
        handle,
        Entry {
            stream: Arc::new(Mutex::new(stream)),
            monitor: Mutex::new(None),
        },
    );
    Ok(handle)
}

/// Run `f` against the stream registered under `handle`. Returns `None` if
/// the handle is unknown (already closed, or never opened).
pub fn with_stream<R>(handle: StreamHandle, f: impl FnOnce(&mut Stream<PluginHost>) -> R) -> Option<R> {
    let registry = registry().lock().unwrap();
    let entry = registry.get(&handle)?;
    let mut stream = entry.stream.lock().unwrap();
    Some(f(&mut stream))
}

/// Point an open instance at a specific remote device and profile. Starts
/// (or re-targets) a [`balsa_device::Monitor`] for this handle and hands
/// its transport fd to the stream's worker as soon as it attaches.
pub fn set_remote_device(
    handle: StreamHandle,
    interface: &str,
    address: Address,
    profile: ProfileType,
    stream_direction: StreamDirection,
) -> Result<(), CoreError> {
    let registry_guard = registry().lock().unwrap();
    let Some(entry) = registry_guard.get(&handle) else {
        return Err(CoreError::NoDevice);
    };
    let stream = Arc::clone(&entry.stream);

    let mut monitor_slot = entry.monitor.lock().unwrap();
    if monitor_slot.is_none() {
        let monitor = Monitor::open(interface).map_err(|e| CoreError::Io(to_io_error(e)))?;
        *monitor_slot = Some(monitor);
    }
    let monitor = monitor_slot.as_ref().unwrap();
    monitor
        .set_device(address, profile, stream_direction)
        .map_err(|e| CoreError::Io(to_io_error(e)))?;

    if let Some(fd) = monitor.take_fd() {
        stream.lock().unwrap().attach_fifo(fd);
    }

    let watch_fd: RawFd = monitor.as_raw_fd();
    let _ = watch_fd; // the host's poll loop watches this through `poll_descriptors`
    Ok(())
}

/// Close and deregister a PCM instance. Further calls with `handle` are
/// no-ops.
pub fn close(handle: StreamHandle) {
    let entry = registry().lock().unwrap().remove(&handle);
    if let Some(entry) = entry {
        if let Ok(mut stream) = entry.stream.lock() {
            if let Err(e) = stream.close() {
                warn!("error closing stream {:?}: {}", handle, e);
            }
        }
        if let Some(mut monitor) = entry.monitor.into_inner().unwrap() {
            monitor.close();
        }
    }
}

fn to_io_error(e: balsa_device::DeviceError) -> std::io::Error {
    std::io::Error::other(e)
}

// Device-monitor library symbols, re-exported so a caller that only wants
// raw frames (no plugin, no registry) can use `balsa-device` directly
// through this crate without an extra `Cargo.toml` entry.
pub use balsa_device::DeviceError;
pub use balsa_device::Monitor as DeviceMonitor;
