use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use log::{debug, info, warn};

use balsa_core::eventfd::EventFd;
use balsa_protocol::client::DaemonClient;
use balsa_protocol::event::EventMask;
use balsa_protocol::transport::{ProfileType, StreamDirection, Transport};
use balsa_protocol::Address;

use crate::error::DeviceError;

struct Target {
    addr: Address,
    profile: ProfileType,
    stream: StreamDirection,
}

struct Shared {
    interface: String,
    target: Mutex<Option<Target>>,
    transport: Mutex<Option<Transport>>,
    snd_fd: Mutex<Option<OwnedFd>>,
    client_event_fd: EventFd,
    shutdown: AtomicBool,
}

/// A device monitor: one daemon subscription, one control connection, and
/// a background thread that keeps `snd_fd` pointed at whatever transport
/// currently matches the configured target.
pub struct Monitor {
    shared: Arc<Shared>,
    control: Mutex<DaemonClient>,
    thread: Option<JoinHandle<()>>,
}

impl Monitor {
    /// Connect to the daemon's `interface` control socket twice -- once for
    /// the event subscription the monitor thread blocks on, once for the
    /// control requests `refresh` issues -- and start watching.
    pub fn open(interface: &str) -> Result<Self, DeviceError> {
        let mut events = DaemonClient::open(interface)?;
        events.subscribe(
            EventMask::TRANSPORT_ADDED | EventMask::TRANSPORT_CHANGED | EventMask::TRANSPORT_REMOVED,
        )?;
        let control = DaemonClient::open(interface)?;

        let shared = Arc::new(Shared {
            interface: interface.to_owned(),
            target: Mutex::new(None),
            transport: Mutex::new(None),
            snd_fd: Mutex::new(None),
            client_event_fd: EventFd::new().map_err(|e| DeviceError::Io(std::io::Error::from(e)))?,
            shutdown: AtomicBool::new(false),
        });

        let thread_shared = Arc::clone(&shared);
        let thread = balsa_util::thread::start("balsa/monitor", move || monitor_loop(thread_shared, events));

        Ok(Monitor {
            shared,
            control: Mutex::new(control),
            thread: Some(thread),
        })
    }

    /// An fd the caller can poll alongside its own: becomes readable
    /// whenever the attached transport changes.
    pub fn as_raw_fd(&self) -> RawFd {
        self.shared.client_event_fd.as_raw_fd()
    }

    /// Point the monitor at a specific remote device and profile. Takes
    /// effect on the next refresh, which runs immediately on this call and
    /// again whenever the daemon reports a transport event.
    pub fn set_device(&self, addr: Address, profile: ProfileType, stream: StreamDirection) -> Result<(), DeviceError> {
        *self.shared.target.lock().unwrap() = Some(Target { addr, profile, stream });
        self.refresh()
    }

    pub fn current_transport(&self) -> Option<Transport> {
        self.shared.transport.lock().unwrap().clone()
    }

    /// Drain the change notification eventfd. Callers that want to drive
    /// their own fd (e.g. handing it straight to a `balsa-core` `Stream`
    /// instead of reading through `readi`) poll [`Monitor::as_raw_fd`] and
    /// call this to acknowledge the wakeup.
    pub fn ack(&self) -> Result<(u64, bool), DeviceError> {
        self.shared
            .client_event_fd
            .consume()
            .map_err(|e| DeviceError::Io(std::io::Error::from(e)))
    }

    /// Take ownership of the currently attached transport fd, if any,
    /// leaving the monitor's own `readi`/`writei` without one until the
    /// next refresh re-attaches. Used when a caller wants to route the raw
    /// fd elsewhere (a `balsa-core` `Stream`'s worker) rather than reading
    /// through this monitor directly.
    pub fn take_fd(&self) -> Option<OwnedFd> {
        self.shared.snd_fd.lock().unwrap().take()
    }

    /// Re-derive the attached transport from the current target and the
    /// daemon's live transport list, attaching/detaching the FIFO as
    /// needed. Mutex-guarded so concurrent calls from the event thread and
    /// an explicit `set_device` don't race on `snd_fd`.
    pub fn refresh(&self) -> Result<(), DeviceError> {
        let target = self.shared.target.lock().unwrap();
        let Some(target) = target.as_ref() else {
            return Ok(());
        };

        let mut control = self.control.lock().unwrap();
        let wanted = control.get_transport(target.addr, target.profile, target.stream)?;
        drop(control);

        let mut current = self.shared.transport.lock().unwrap();
        let changed = current.as_ref().map(|t| t.id) != wanted.as_ref().map(|t| t.id);

        if changed {
            if let Some(old) = current.take() {
                debug!("{}: detaching transport {:?}", self.shared.interface, old.id);
                self.shared.snd_fd.lock().unwrap().take();
            }
            if let Some(new_transport) = &wanted {
                let mut control = self.control.lock().unwrap();
                let fd = control.open_transport(new_transport)?;
                drop(control);
                info!("{}: attached transport {:?}", self.shared.interface, new_transport.id);
                *self.shared.snd_fd.lock().unwrap() = Some(fd);
            }
            *current = wanted;
            let _ = self.shared.client_event_fd.notify_progress(1);
        }
        Ok(())
    }

    /// Blocking read of up to `frames` frames into `buf`, from whatever
    /// transport is currently attached. Returns the number of frames
    /// actually read.
    pub fn readi(&self, buf: &mut [u8], frame_size: usize, frames: usize) -> Result<usize, DeviceError> {
        let guard = self.shared.snd_fd.lock().unwrap();
        let Some(fd) = guard.as_ref() else {
            return Err(DeviceError::NotAttached);
        };
        let want = (frames * frame_size).min(buf.len());
        let n = nix::unistd::read(fd.as_raw_fd(), &mut buf[..want])?;
        Ok(n / frame_size)
    }

    /// Writes are not meaningful for a device monitored purely for
    /// capture; kept in the interface so callers that don't know their
    /// direction ahead of time have something to call. Always a no-op.
    pub fn writei(&self, _buf: &[u8], _frame_size: usize, _frames: usize) -> Result<usize, DeviceError> {
        Ok(0)
    }

    pub fn close(&mut self) {
        self.shared.shutdown.store(true, Ordering::SeqCst);
        self.shared.snd_fd.lock().unwrap().take();
        if let Some(thread) = self.thread.take() {
            if let Err(e) = thread.join() {
                warn!("monitor thread did not exit cleanly: {:?}", e);
            }
        }
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, Ordering::SeqCst);
    }
}

fn monitor_loop(shared: Arc<Shared>, mut events: DaemonClient) {
    while !shared.shutdown.load(Ordering::SeqCst) {
        match events.recv_event() {
            Ok(event) => {
                debug!("{}: {}", shared.interface, event);
                if let Err(e) = refresh_from_thread(&shared, &events) {
                    warn!("{}: refresh after event failed: {}", shared.interface, e);
                }
            }
            Err(e) if e.is_transient() => {
                std::thread::sleep(Duration::from_millis(200));
            }
            Err(e) => {
                warn!("{}: monitor subscription lost: {}", shared.interface, e);
                return;
            }
        }
    }
}

fn refresh_from_thread(shared: &Arc<Shared>, _events: &DaemonClient) -> Result<(), DeviceError> {
    // the event connection only ever blocks in recv_event; actual refresh
    // work goes through the dedicated control connection owned by the
    // `Monitor` the thread was spawned from. Since `Monitor` isn't `Sync`
    // over its `control` field from here, refresh is re-entered through
    // the same algorithm directly on `shared`'s target/transport state by
    // reconnecting a short-lived control client -- mirroring `refresh`'s
    // body without needing a second reference to `Monitor` itself.
    let target = shared.target.lock().unwrap();
    let Some(target) = target.as_ref() else {
        return Ok(());
    };
    let mut control = DaemonClient::open(&shared.interface)?;
    let wanted = control.get_transport(target.addr, target.profile, target.stream)?;

    let mut current = shared.transport.lock().unwrap();
    let changed = current.as_ref().map(|t| t.id) != wanted.as_ref().map(|t| t.id);
    if changed {
        if let Some(old) = current.take() {
            debug!("{}: detaching transport {:?}", shared.interface, old.id);
            shared.snd_fd.lock().unwrap().take();
        }
        if let Some(new_transport) = &wanted {
            let fd = control.open_transport(new_transport)?;
            info!("{}: attached transport {:?}", shared.interface, new_transport.id);
            *shared.snd_fd.lock().unwrap() = Some(fd);
        }
        *current = wanted;
        let _ = shared.client_event_fd.notify_progress(1);
    }
    Ok(())
}
