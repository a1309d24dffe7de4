//! Stream lifecycle states (§3 Data Model).

/// A stream's lifecycle. The worker thread and the callback contract both
/// read and drive this; transitions are serialized through the `Stream`'s
/// state mutex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Created, transport not yet attached.
    Open,
    /// `hw_params` accepted; buffer geometry fixed.
    HwConfigured,
    /// `prepare` has run; worker is idle waiting for the first period.
    Prepared,
    /// Worker is actively transferring periods.
    Running,
    /// Transfers suspended; worker parked on the resume condvar.
    Paused,
    /// `drain` requested; worker finishes outstanding frames then stops.
    Draining,
    /// A buffer underrun/overrun was detected and not yet acknowledged.
    XRun,
    /// The daemon hung up or the transport FIFO died; unrecoverable without
    /// a fresh `set_device`.
    Disconnected,
    /// `close` has run; no further operations are valid.
    Closed,
}

impl StreamState {
    pub fn is_active(self) -> bool {
        matches!(self, StreamState::Running | StreamState::Draining)
    }

    pub fn can_transfer(self) -> bool {
        matches!(self, StreamState::Running)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, StreamState::Disconnected | StreamState::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_and_draining_are_active() {
        assert!(StreamState::Running.is_active());
        assert!(StreamState::Draining.is_active());
        assert!(!StreamState::Paused.is_active());
    }

    #[test]
    fn only_running_can_transfer() {
        assert!(StreamState::Running.can_transfer());
        assert!(!StreamState::Draining.can_transfer());
        assert!(!StreamState::Prepared.can_transfer());
    }

    #[test]
    fn disconnected_and_closed_are_terminal() {
        assert!(StreamState::Disconnected.is_terminal());
        assert!(StreamState::Closed.is_terminal());
        assert!(!StreamState::XRun.is_terminal());
    }
}
