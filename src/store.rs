// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Persistence of the learned heater address.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::types::DeviceAddress;

/// Stores the paired heater address as a hexadecimal token in a file.
///
/// A missing or unreadable file is the normal state of an unpaired bridge,
/// so [`load`](Self::load) never fails: it falls back to
/// [`DeviceAddress::UNSET`].
#[derive(Debug, Clone)]
pub struct AddressStore {
    path: PathBuf,
}

impl AddressStore {
    /// Creates a store backed by `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the persisted address.
    ///
    /// Returns [`DeviceAddress::UNSET`] if the file does not exist, cannot
    /// be read, or does not hold a hexadecimal token.
    #[must_use]
    pub fn load(&self) -> DeviceAddress {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No stored heater address");
                return DeviceAddress::UNSET;
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to read heater address");
                return DeviceAddress::UNSET;
            }
        };

        match contents.parse::<DeviceAddress>() {
            Ok(address) => {
                tracing::info!(path = %self.path.display(), %address, "Loaded heater address");
                address
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Ignoring stored heater address");
                DeviceAddress::UNSET
            }
        }
    }

    /// Overwrites the persisted address.
    ///
    /// Parent directories are created when missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, address: DeviceAddress) -> io::Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        fs::write(&self.path, format!("{}\n", address.to_hex_token()))?;

        tracing::info!(path = %self.path.display(), %address, "Saved heater address");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = AddressStore::new(dir.path().join("address"));

        store.save(DeviceAddress::new(0x1A2B_3C4D)).unwrap();

        assert_eq!(store.load(), DeviceAddress::new(0x1A2B_3C4D));
    }

    #[test]
    fn missing_file_is_unset() {
        let dir = tempfile::tempdir().unwrap();
        let store = AddressStore::new(dir.path().join("missing"));

        assert_eq!(store.load(), DeviceAddress::UNSET);
    }

    #[test]
    fn garbage_is_unset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("address");
        fs::write(&path, "not an address").unwrap();

        assert_eq!(AddressStore::new(path).load(), DeviceAddress::UNSET);
    }

    #[test]
    fn accepts_prefixed_token() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("address");
        fs::write(&path, "0x00ABCDEF").unwrap();

        assert_eq!(AddressStore::new(path).load(), DeviceAddress::new(0x00AB_CDEF));
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = AddressStore::new(dir.path().join("state/heater/address"));

        store.save(DeviceAddress::new(7)).unwrap();

        assert_eq!(store.load(), DeviceAddress::new(7));
    }

    #[test]
    fn save_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = AddressStore::new(dir.path().join("address"));

        store.save(DeviceAddress::new(1)).unwrap();
        store.save(DeviceAddress::new(2)).unwrap();

        assert_eq!(fs::read_to_string(store.path()).unwrap(), "00000002\n");
    }

    #[test]
    fn save_into_unwritable_location_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "x").unwrap();
        let store = AddressStore::new(blocker.join("address"));

        assert!(store.save(DeviceAddress::new(1)).is_err());
    }
}
