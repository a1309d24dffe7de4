use std::ffi::CString;
use std::io::ErrorKind;
use std::sync::atomic::AtomicBool;
use std::thread::JoinHandle;

/// Spawn a named thread, matching the host's convention of naming every
/// long-lived worker so it shows up distinctly in `ps`/`top`.
pub fn start<F>(name: &'static str, f: F) -> JoinHandle<()>
where
    F: FnOnce() + Send + 'static,
{
    std::thread::Builder::new()
        .name(name.to_string())
        .spawn(f)
        .expect("spawn thread")
}

pub fn set_name(name: &str) {
    let cstr = CString::new(name)
        .expect("not a cstring in set_thread_name");

    unsafe {
        libc::pthread_setname_np(libc::pthread_self(), cstr.as_ptr());
    }
}

pub fn set_realtime_priority() {
    let rc = unsafe {
        libc::sched_setscheduler(
            0,
            libc::SCHED_FIFO,
            &libc::sched_param {
                sched_priority: 99,
            }
        )
    };

    if rc < 0 {
        static WARNED: AtomicBool = AtomicBool::new(false);
        let warned = WARNED.swap(true, std::sync::atomic::Ordering::Relaxed);

        if !warned {
            let err = std::io::Error::last_os_error();

            log::warn!("failed to set realtime thread priority: {err}");

            if err.kind() == ErrorKind::PermissionDenied {
                let path = std::env::current_exe()
                    .map(|path| path.display().to_string());

                let path = path.as_ref()
                    .map(|path| path.as_str())
                    .unwrap_or("path/to/balsa-pcm");

                log::warn!("fix by running: setcap cap_sys_nice=ep {path}")
            }
        }
    }
}
