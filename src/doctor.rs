// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::io::ErrorKind;

use crate::snapshot::snapshot_path;
use crate::subscription::Subscription;

/// Condition of a subscription's storage directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Health {
    Healthy,
    /// The storage directory does not exist
    MissingStorage,
    /// Something other than a directory sits at the storage path
    StorageNotDirectory,
    /// The storage directory has no snapshot archive
    MissingSnapshot,
    /// Something other than a file sits at the snapshot path
    SnapshotNotFile,
    /// The storage could not be inspected
    Unreadable(String),
}

impl Health {
    /// Whether fetching the feed again would fix the problem
    pub fn is_repairable(&self) -> bool {
        matches!(self, Health::MissingStorage | Health::MissingSnapshot)
    }
}

/// Inspect a subscription's storage directory and snapshot
pub fn diagnose(subscription: &Subscription) -> Health {
    match std::fs::metadata(&subscription.local_store) {
        Ok(meta) if !meta.is_dir() => return Health::StorageNotDirectory,
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => return Health::MissingStorage,
        Err(e) => return Health::Unreadable(e.to_string()),
    }

    match std::fs::metadata(snapshot_path(subscription)) {
        Ok(meta) if !meta.is_file() => Health::SnapshotNotFile,
        Ok(_) => Health::Healthy,
        Err(e) if e.kind() == ErrorKind::NotFound => Health::MissingSnapshot,
        Err(e) => Health::Unreadable(e.to_string()),
    }
}
