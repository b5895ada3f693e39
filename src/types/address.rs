// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Radio address of a paired heater.

use std::fmt;
use std::str::FromStr;

use crate::error::ValueError;

/// The 32-bit radio address a heater answers to.
///
/// The value `0` means the bridge is not paired with any heater. An address
/// is learned through pairing and then stays fixed for the rest of the run.
///
/// # Examples
///
/// ```
/// use dieselheater_mqtt::types::DeviceAddress;
///
/// let addr: DeviceAddress = "0x1A2B3C4D".parse().unwrap();
/// assert_eq!(addr.value(), 0x1A2B_3C4D);
/// assert_eq!(addr.to_string(), "0x1A2B3C4D");
/// assert!(!DeviceAddress::UNSET.is_set());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DeviceAddress(u32);

impl DeviceAddress {
    /// The "not paired" address.
    pub const UNSET: Self = Self(0);

    /// Wraps a raw address.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Returns the raw address.
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Returns `true` unless this is [`DeviceAddress::UNSET`].
    #[must_use]
    pub const fn is_set(self) -> bool {
        self.0 != 0
    }

    /// Returns the persisted form: lowercase hex without prefix.
    #[must_use]
    pub fn to_hex_token(self) -> String {
        format!("{:08x}", self.0)
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

impl FromStr for DeviceAddress {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        u32::from_str_radix(digits, 16)
            .map(Self)
            .map_err(|_| ValueError::InvalidAddress(s.to_string()))
    }
}

impl From<u32> for DeviceAddress {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_with_and_without_prefix() {
        assert_eq!(
            "1a2b3c4d".parse::<DeviceAddress>().unwrap(),
            DeviceAddress::new(0x1A2B_3C4D)
        );
        assert_eq!(
            "0X00ABCDEF".parse::<DeviceAddress>().unwrap(),
            DeviceAddress::new(0x00AB_CDEF)
        );
        assert_eq!(
            "  0xabcdef\n".parse::<DeviceAddress>().unwrap(),
            DeviceAddress::new(0x00AB_CDEF)
        );
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!("".parse::<DeviceAddress>().is_err());
        assert!("heater".parse::<DeviceAddress>().is_err());
        assert!("1a2b3c4d5".parse::<DeviceAddress>().is_err());
    }

    #[test]
    fn zero_is_unset() {
        assert_eq!(DeviceAddress::default(), DeviceAddress::UNSET);
        assert!(!DeviceAddress::new(0).is_set());
        assert!(DeviceAddress::new(1).is_set());
    }

    #[test]
    fn hex_token_is_zero_padded() {
        assert_eq!(DeviceAddress::new(0x00AB_CDEF).to_hex_token(), "00abcdef");
    }
}
