use nix::sys::signal::{self, SigSet, Signal};

/// Block `SIGPIPE` on the calling thread so a broken FIFO write surfaces as
/// `EPIPE` from the syscall instead of terminating the process.
pub fn block_sigpipe() {
    let mut set = SigSet::empty();
    set.add(Signal::SIGPIPE);

    signal::pthread_sigmask(signal::SigmaskHow::SIG_BLOCK, Some(&set), None)
        .expect("pthread_sigmask(SIG_BLOCK, SIGPIPE)");
}
