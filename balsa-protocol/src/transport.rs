use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::error::ProfileParseError;

/// Bluetooth audio profile carried by a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProfileType {
    A2dp,
    Sco,
}

impl FromStr for ProfileType {
    type Err = ProfileParseError;

    /// Case-insensitive: "a2dp" -> A2dp, "sco" -> Sco, anything else is
    /// a configuration error.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "a2dp" => Ok(ProfileType::A2dp),
            "sco" => Ok(ProfileType::Sco),
            _ => Err(ProfileParseError::UnknownProfile),
        }
    }
}

impl fmt::Display for ProfileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileType::A2dp => write!(f, "a2dp"),
            ProfileType::Sco => write!(f, "sco"),
        }
    }
}

/// Direction a transport supports, as advertised by the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamDirection {
    Capture,
    Playback,
    Duplex,
}

impl StreamDirection {
    /// True for the directions a capture-side consumer (device monitor,
    /// capture stream) may bind to.
    pub fn supports_capture(self) -> bool {
        matches!(self, StreamDirection::Capture | StreamDirection::Duplex)
    }

    pub fn supports_playback(self) -> bool {
        matches!(self, StreamDirection::Playback | StreamDirection::Duplex)
    }
}

/// Opaque-from-the-outside identifier for a transport, stable for the
/// lifetime of the underlying Bluetooth link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransportId(pub u64);

/// The daemon's handle for an active Bluetooth audio link: remote address,
/// profile, codec, channels, rate, and the direction it supports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transport {
    pub id: TransportId,
    pub addr: Address,
    pub profile: ProfileType,
    pub codec: String,
    pub channels: u16,
    pub rate: u32,
    pub stream: StreamDirection,
}

impl Transport {
    pub fn frame_size(&self) -> usize {
        2 * usize::from(self.channels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_parse_is_case_insensitive() {
        assert_eq!("A2DP".parse::<ProfileType>().unwrap(), ProfileType::A2dp);
        assert_eq!("sco".parse::<ProfileType>().unwrap(), ProfileType::Sco);
        assert_eq!("SCO".parse::<ProfileType>().unwrap(), ProfileType::Sco);
    }

    #[test]
    fn profile_parse_rejects_unknown() {
        assert!("hfp".parse::<ProfileType>().is_err());
    }

    #[test]
    fn direction_predicates() {
        assert!(StreamDirection::Duplex.supports_capture());
        assert!(StreamDirection::Duplex.supports_playback());
        assert!(StreamDirection::Capture.supports_capture());
        assert!(!StreamDirection::Capture.supports_playback());
        assert!(!StreamDirection::Playback.supports_capture());
    }
}
