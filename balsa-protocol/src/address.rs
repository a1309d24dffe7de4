use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ProfileParseError;

/// A Bluetooth device address, `AA:BB:CC:DD:EE:FF`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address([u8; 6]);

impl FromStr for Address {
    type Err = ProfileParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut octets = [0u8; 6];
        let mut parts = s.split(':');

        for octet in octets.iter_mut() {
            let part = parts.next().ok_or(ProfileParseError::InvalidAddress)?;
            *octet = u8::from_str_radix(part, 16)
                .map_err(|_| ProfileParseError::InvalidAddress)?;
        }

        if parts.next().is_some() {
            return Err(ProfileParseError::InvalidAddress);
        }

        Ok(Address(octets))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_address() {
        let addr: Address = "AA:BB:CC:DD:EE:FF".parse().unwrap();
        assert_eq!(addr.to_string(), "AA:BB:CC:DD:EE:FF");
    }

    #[test]
    fn rejects_short_address() {
        assert!("AA:BB:CC".parse::<Address>().is_err());
    }

    #[test]
    fn rejects_garbage() {
        assert!("not-an-address".parse::<Address>().is_err());
    }

    #[test]
    fn is_case_insensitive_on_input() {
        let lower: Address = "aa:bb:cc:dd:ee:ff".parse().unwrap();
        let upper: Address = "AA:BB:CC:DD:EE:FF".parse().unwrap();
        assert_eq!(lower, upper);
    }
}
