// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::HashSet;
use std::path::Path;

use crate::error::StateError;
use crate::feed::{Item, parse_items};
use crate::item::{PARTIAL_SUFFIX, identity_key, strip_extension};
use crate::snapshot::{self, SNAPSHOT_FILE_NAME};
use crate::subscription::Subscription;

/// Identity keys of the items already present in a storage directory
#[derive(Debug, Clone, Default)]
pub struct LocalItems {
    keys: HashSet<String>,
}

impl LocalItems {
    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub(crate) fn len(&self) -> usize {
        self.keys.len()
    }
}

/// Scan a storage directory for materialized items.
///
/// Every file except the snapshot archive and unfinished downloads counts,
/// keyed by its name without extension.
pub fn scan_local_items(storage_dir: &Path) -> Result<LocalItems, StateError> {
    let read_error = |source: std::io::Error| StateError::ReadDirectoryFailed {
        path: storage_dir.to_path_buf(),
        source,
    };

    let mut keys = HashSet::new();

    for entry in std::fs::read_dir(storage_dir).map_err(read_error)? {
        let entry = entry.map_err(read_error)?;
        let filename = entry.file_name().to_string_lossy().into_owned();

        if is_bookkeeping_file(&filename) {
            continue;
        }

        keys.insert(strip_extension(&filename).to_string());
    }

    Ok(LocalItems { keys })
}

/// Items of `items` whose identity is not in `local`, in their original order
pub fn select_new_items(items: Vec<Item>, local: &LocalItems) -> Vec<Item> {
    items
        .into_iter()
        .filter(|item| !local.contains(&identity_key(item)))
        .collect()
}

/// Result of reconciling a snapshot against a storage directory
#[derive(Debug, Clone)]
pub struct ReconcilePlan {
    /// Snapshot items not present locally, in snapshot order
    pub new_items: Vec<Item>,
    /// Number of items decoded from the snapshot
    pub total_items: usize,
}

/// Reconcile the subscription's snapshot against its storage directory.
///
/// Items are matched by title only; two items sharing a title are
/// indistinguishable.
pub fn plan_new_items(subscription: &Subscription) -> Result<ReconcilePlan, StateError> {
    let local = scan_local_items(&subscription.local_store)?;
    let feed = snapshot::open(subscription)?;
    let items = parse_items(&feed)?;

    let total_items = items.len();
    let new_items = select_new_items(items, &local);
    tracing::debug!(
        "'{}': {} of {total_items} snapshot items are new ({} local files)",
        subscription.name,
        new_items.len(),
        local.len()
    );

    Ok(ReconcilePlan {
        new_items,
        total_items,
    })
}

/// The items of the subscription's snapshot that have not been
/// materialized yet, in snapshot order
pub fn new_items(subscription: &Subscription) -> Result<Vec<Item>, StateError> {
    plan_new_items(subscription).map(|plan| plan.new_items)
}

/// The snapshot, its in-flight temp file, and unfinished downloads
fn is_bookkeeping_file(filename: &str) -> bool {
    filename == SNAPSHOT_FILE_NAME
        || filename.strip_suffix(".tmp") == Some(SNAPSHOT_FILE_NAME)
        || filename.ends_with(PARTIAL_SUFFIX)
}
