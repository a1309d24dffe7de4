use serde::{Deserialize, Serialize};

use crate::transport::TransportId;

bitflags::bitflags! {
    /// Mask over the event types a subscriber can register interest in.
    pub struct EventMask: u32 {
        const TRANSPORT_ADDED   = 0b0000_0001;
        const TRANSPORT_CHANGED = 0b0000_0010;
        const TRANSPORT_REMOVED = 0b0000_0100;
        const UPDATE_BATTERY    = 0b0000_1000;
        const UPDATE_VOLUME     = 0b0001_0000;
    }
}

/// A single event delivered on the subscription socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub transport: TransportId,
    pub kind: EventKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    TransportAdded,
    TransportChanged,
    TransportRemoved,
    UpdateBattery,
    UpdateVolume,
}

impl EventKind {
    pub fn mask(self) -> EventMask {
        match self {
            EventKind::TransportAdded => EventMask::TRANSPORT_ADDED,
            EventKind::TransportChanged => EventMask::TRANSPORT_CHANGED,
            EventKind::TransportRemoved => EventMask::TRANSPORT_REMOVED,
            EventKind::UpdateBattery => EventMask::UPDATE_BATTERY,
            EventKind::UpdateVolume => EventMask::UPDATE_VOLUME,
        }
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} on transport {}", self.kind, self.transport.0)
    }
}
