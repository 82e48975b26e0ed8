//! MAC address normalization
//!
//! Catalyst Center archives and the Meraki Dashboard do not agree on a MAC
//! format (`AA:BB:CC:00:00:01`, `aa:bb:cc:00:00:01`, `aabb.cc00.0001`...).
//! Both sides are parsed down to the six raw bytes, so equality is
//! independent of case and separators.

use mac_address::MacAddress;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Mac([u8; 6]);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MacParseError {
    #[error("bad mac length: expected 12 hex digits, found {0}")]
    Length(usize),
    #[error("unexpected character {0:?} in mac")]
    Character(char),
}

impl Mac {
    pub fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    pub fn bytes(&self) -> [u8; 6] {
        self.0
    }
}

impl FromStr for Mac {
    type Err = MacParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut hex = String::with_capacity(12);
        for c in s.trim().chars() {
            match c {
                ':' | '-' | '.' | ' ' => continue,
                c if c.is_ascii_hexdigit() => hex.push(c),
                other => return Err(MacParseError::Character(other)),
            }
        }
        if hex.len() != 12 {
            return Err(MacParseError::Length(hex.len()));
        }

        let mut out = [0u8; 6];
        for (i, byte) in out.iter_mut().enumerate() {
            // only ascii hex digits were kept above
            *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)
                .map_err(|_| MacParseError::Length(hex.len()))?;
        }
        Ok(Self(out))
    }
}

impl fmt::Display for Mac {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        MacAddress::new(self.0).fmt(f)
    }
}

impl Serialize for Mac {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}
