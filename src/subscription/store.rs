// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Name that selects every subscription at once; never a valid subscription name
pub const RESERVED_NAME: &str = "all";

const STORE_DIR_NAME: &str = "podstash";
const STORE_FILE_NAME: &str = "subscriptions.json";

/// A named feed subscription with its local storage directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub feed_url: String,
    pub name: String,
    pub local_store: PathBuf,
}

impl Subscription {
    pub fn new(
        name: impl Into<String>,
        feed_url: impl Into<String>,
        local_store: impl Into<PathBuf>,
    ) -> Self {
        Self {
            feed_url: feed_url.into(),
            name: name.into(),
            local_store: local_store.into(),
        }
    }
}

/// Resolve the location of the subscription store file.
///
/// Uses the given per-user configuration directory, or the current working
/// directory when none is known.
pub fn resolve_store_path(config_dir: Option<PathBuf>) -> PathBuf {
    config_dir
        .unwrap_or_else(|| PathBuf::from("."))
        .join(STORE_DIR_NAME)
        .join(STORE_FILE_NAME)
}

/// Store file location for the current user
pub fn default_store_path() -> PathBuf {
    resolve_store_path(dirs::config_dir())
}

/// The persisted set of subscriptions, keyed by name.
///
/// Every successful mutation rewrites the whole file through a temporary
/// file and a rename, so a crash never leaves a truncated store behind.
/// Only one writer may use a store file at a time.
#[derive(Debug)]
pub struct SubscriptionStore {
    path: PathBuf,
    subscriptions: BTreeMap<String, Subscription>,
}

impl SubscriptionStore {
    /// Open the store at `path`, creating an empty one if it does not exist yet
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();

        let subscriptions = match std::fs::read(&path) {
            Ok(content) if content.iter().all(u8::is_ascii_whitespace) => BTreeMap::new(),
            Ok(content) => {
                serde_json::from_slice(&content).map_err(|e| StoreError::ParseFailed {
                    path: path.clone(),
                    source: e,
                })?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let store = Self {
                    path,
                    subscriptions: BTreeMap::new(),
                };
                store.persist(&store.subscriptions)?;
                tracing::debug!("Created subscription store {}", store.path.display());
                return Ok(store);
            }
            Err(e) => return Err(StoreError::ReadFailed { path, source: e }),
        };

        Ok(Self {
            path,
            subscriptions,
        })
    }

    /// Location of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Add a subscription and persist the store.
    ///
    /// Fails without touching the store when the name is reserved or taken.
    pub fn add(&mut self, subscription: Subscription) -> Result<(), StoreError> {
        self.check_available(&subscription.name)?;

        let mut updated = self.subscriptions.clone();
        updated.insert(subscription.name.clone(), subscription);
        self.persist(&updated)?;
        self.subscriptions = updated;

        Ok(())
    }

    /// Check that `name` could be added
    pub fn check_available(&self, name: &str) -> Result<(), StoreError> {
        if name == RESERVED_NAME {
            return Err(StoreError::ReservedName(name.to_string()));
        }
        if self.contains(name) {
            return Err(StoreError::DuplicateName(name.to_string()));
        }
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.subscriptions.contains_key(name)
    }

    /// Look up a subscription by name
    pub fn get(&self, name: &str) -> Result<&Subscription, StoreError> {
        self.subscriptions
            .get(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    /// All subscriptions; callers sort as they see fit
    pub fn list(&self) -> Vec<&Subscription> {
        self.subscriptions.values().collect()
    }

    /// The full name to subscription mapping
    pub fn subscriptions(&self) -> &BTreeMap<String, Subscription> {
        &self.subscriptions
    }

    fn persist(&self, subscriptions: &BTreeMap<String, Subscription>) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(subscriptions)?;
        write_atomically(&self.path, &json).map_err(|e| StoreError::WriteFailed {
            path: self.path.clone(),
            source: e,
        })
    }
}

/// Write `content` next to `path` and move it into place once complete
pub(crate) fn write_atomically(path: &Path, content: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let temp_path = temp_path_for(path);
    let result = (|| {
        let mut file = std::fs::File::create(&temp_path)?;
        file.write_all(content)?;
        file.sync_all()?;
        std::fs::rename(&temp_path, path)
    })();

    if result.is_err() {
        let _ = std::fs::remove_file(&temp_path);
    }
    result
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sub(name: &str) -> Subscription {
        Subscription::new(
            name,
            format!("https://example.com/{name}.xml"),
            format!("/podcasts/{name}"),
        )
    }

    #[test]
    fn resolve_store_path_uses_config_dir() {
        let path = resolve_store_path(Some(PathBuf::from("/home/me/.config")));
        assert_eq!(
            path,
            PathBuf::from("/home/me/.config/podstash/subscriptions.json")
        );
    }

    #[test]
    fn resolve_store_path_falls_back_to_working_dir() {
        let path = resolve_store_path(None);
        assert_eq!(path, PathBuf::from("./podstash/subscriptions.json"));
    }

    #[test]
    fn open_creates_missing_store() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("subscriptions.json");

        let store = SubscriptionStore::open(&path).unwrap();

        assert!(store.list().is_empty());
        assert!(path.exists());
    }

    #[test]
    fn open_accepts_empty_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("subscriptions.json");
        std::fs::write(&path, b"").unwrap();

        let store = SubscriptionStore::open(&path).unwrap();
        assert!(store.list().is_empty());
    }

    #[test]
    fn open_rejects_malformed_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("subscriptions.json");
        std::fs::write(&path, b"[not json").unwrap();

        let result = SubscriptionStore::open(&path);
        assert!(matches!(result, Err(StoreError::ParseFailed { .. })));
    }

    #[test]
    fn open_reports_unreadable_store() {
        let dir = tempdir().unwrap();
        // A directory where the file should be cannot be read as one
        let result = SubscriptionStore::open(dir.path());
        assert!(matches!(result, Err(StoreError::ReadFailed { .. })));
    }

    #[test]
    fn saved_subscriptions_load_back_unchanged() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("subscriptions.json");

        let mut store = SubscriptionStore::open(&path).unwrap();
        for name in ["Foo", "Bar", "Baz Qux"] {
            store.add(sub(name)).unwrap();
        }
        let expected = store.subscriptions().clone();

        let reopened = SubscriptionStore::open(&path).unwrap();
        assert_eq!(reopened.subscriptions(), &expected);
    }

    #[test]
    fn store_file_uses_stable_field_names() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("subscriptions.json");

        let mut store = SubscriptionStore::open(&path).unwrap();
        store.add(sub("Foo")).unwrap();

        let value: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        let entry = &value["Foo"];
        assert_eq!(entry["name"], "Foo");
        assert_eq!(entry["feed_url"], "https://example.com/Foo.xml");
        assert_eq!(entry["local_store"], "/podcasts/Foo");
    }

    #[test]
    fn add_rejects_reserved_name_and_leaves_file_untouched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("subscriptions.json");

        let mut store = SubscriptionStore::open(&path).unwrap();
        store.add(sub("Foo")).unwrap();
        let before = std::fs::read(&path).unwrap();

        let result = store.add(sub(RESERVED_NAME));

        assert!(matches!(result, Err(StoreError::ReservedName(_))));
        assert_eq!(std::fs::read(&path).unwrap(), before);
        assert!(!store.contains(RESERVED_NAME));
    }

    #[test]
    fn add_rejects_duplicate_and_keeps_original() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("subscriptions.json");

        let mut store = SubscriptionStore::open(&path).unwrap();
        store.add(sub("Foo")).unwrap();

        let replacement = Subscription::new("Foo", "https://other.example.com/rss", "/elsewhere");
        let result = store.add(replacement);

        assert!(matches!(result, Err(StoreError::DuplicateName(_))));
        assert_eq!(store.get("Foo").unwrap(), &sub("Foo"));

        let reopened = SubscriptionStore::open(&path).unwrap();
        assert_eq!(reopened.get("Foo").unwrap(), &sub("Foo"));
    }

    #[test]
    fn get_reports_missing_name() {
        let dir = tempdir().unwrap();
        let store = SubscriptionStore::open(dir.path().join("subscriptions.json")).unwrap();

        assert!(matches!(store.get("Nope"), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn atomic_write_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("subscriptions.json");

        let mut store = SubscriptionStore::open(&path).unwrap();
        store.add(sub("Foo")).unwrap();

        assert!(!dir.path().join("subscriptions.json.tmp").exists());
    }
}
