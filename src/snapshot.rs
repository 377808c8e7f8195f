// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The cached copy of each subscription's feed.
//!
//! A snapshot is a zip archive at `<local_store>/feed.zip` holding exactly
//! one entry, named after the subscription, whose content is the feed exactly
//! as it was last received.

use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};

use zip::ZipArchive;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::error::SnapshotError;
use crate::feed::fetch_feed_bytes;
use crate::http::HttpClient;
use crate::progress::{ProgressEvent, SharedProgressReporter};
use crate::subscription::{Subscription, write_atomically};

/// Name of the snapshot archive inside a storage directory
pub const SNAPSHOT_FILE_NAME: &str = "feed.zip";

/// Location of a subscription's snapshot archive
pub fn snapshot_path(subscription: &Subscription) -> PathBuf {
    subscription.local_store.join(SNAPSHOT_FILE_NAME)
}

/// Fetch the subscription's feed and replace its snapshot with it.
///
/// Creates the storage directory if needed. Returns the size of the feed.
pub async fn refresh<C: HttpClient + ?Sized>(
    client: &C,
    subscription: &Subscription,
    reporter: &SharedProgressReporter,
) -> Result<u64, SnapshotError> {
    reporter.report(ProgressEvent::FetchingFeed {
        subscription: subscription.name.clone(),
        url: subscription.feed_url.clone(),
    });

    let feed = fetch_feed_bytes(client, &subscription.feed_url).await?;

    std::fs::create_dir_all(&subscription.local_store).map_err(|e| {
        SnapshotError::CreateDirectoryFailed {
            path: subscription.local_store.clone(),
            source: e,
        }
    })?;

    write_snapshot(&snapshot_path(subscription), &subscription.name, &feed)?;

    let bytes = feed.len() as u64;
    tracing::debug!("Stored {bytes} byte snapshot for '{}'", subscription.name);
    reporter.report(ProgressEvent::SnapshotStored {
        subscription: subscription.name.clone(),
        bytes,
    });

    Ok(bytes)
}

/// Read the feed bytes held by the subscription's snapshot
pub fn open(subscription: &Subscription) -> Result<Vec<u8>, SnapshotError> {
    read_snapshot(&snapshot_path(subscription))
}

/// Write `feed` as the single entry `entry_name` of a new archive at `path`,
/// replacing any previous archive in one step
pub fn write_snapshot(path: &Path, entry_name: &str, feed: &[u8]) -> Result<(), SnapshotError> {
    let archive_error = |source: zip::result::ZipError| SnapshotError::Archive {
        path: path.to_path_buf(),
        source,
    };
    let write_error = |source: std::io::Error| SnapshotError::WriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file(entry_name, SimpleFileOptions::default())
        .map_err(archive_error)?;
    zip.write_all(feed).map_err(write_error)?;
    let archive = zip.finish().map_err(archive_error)?.into_inner();

    write_atomically(path, &archive).map_err(write_error)
}

/// Read the content of the single entry of the archive at `path`
pub fn read_snapshot(path: &Path) -> Result<Vec<u8>, SnapshotError> {
    let file = std::fs::File::open(path).map_err(|e| SnapshotError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut archive = ZipArchive::new(file).map_err(|e| SnapshotError::Archive {
        path: path.to_path_buf(),
        source: e,
    })?;

    if archive.is_empty() {
        return Err(SnapshotError::EmptyArchive(path.to_path_buf()));
    }

    let mut entry = archive.by_index(0).map_err(|e| SnapshotError::Archive {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut feed = Vec::with_capacity(usize::try_from(entry.size()).unwrap_or_default());
    entry
        .read_to_end(&mut feed)
        .map_err(|e| SnapshotError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    Ok(feed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FeedError;
    use crate::http::HttpResponse;
    use crate::progress::NoopReporter;
    use async_trait::async_trait;
    use bytes::Bytes;
    use tempfile::tempdir;

    struct MockHttpClient {
        feed: Option<&'static [u8]>,
    }

    #[async_trait]
    impl HttpClient for MockHttpClient {
        async fn get_bytes(&self, _url: &str) -> Result<Bytes, reqwest::Error> {
            match self.feed {
                Some(feed) => Ok(Bytes::from_static(feed)),
                None => Err(reqwest::Client::new().get("::").build().unwrap_err()),
            }
        }

        async fn get_stream(&self, _url: &str) -> Result<HttpResponse, reqwest::Error> {
            unreachable!("snapshots never stream")
        }
    }

    fn subscription(dir: &Path) -> Subscription {
        Subscription::new("Foo", "https://example.com/feed.xml", dir.join("Foo"))
    }

    #[tokio::test]
    async fn refresh_creates_storage_and_single_entry_archive() {
        let dir = tempdir().unwrap();
        let sub = subscription(dir.path());
        let client = MockHttpClient {
            feed: Some(&b"<rss>first</rss>"[..]),
        };

        let bytes = refresh(&client, &sub, &NoopReporter::shared()).await.unwrap();

        assert_eq!(bytes, 16);
        let file = std::fs::File::open(dir.path().join("Foo").join("feed.zip")).unwrap();
        let mut archive = ZipArchive::new(file).unwrap();
        assert_eq!(archive.len(), 1);
        assert_eq!(archive.by_index(0).unwrap().name(), "Foo");
        assert_eq!(open(&sub).unwrap(), b"<rss>first</rss>");
    }

    #[tokio::test]
    async fn refresh_replaces_previous_snapshot() {
        let dir = tempdir().unwrap();
        let sub = subscription(dir.path());

        let first = MockHttpClient {
            feed: Some(&b"<rss>first</rss>"[..]),
        };
        refresh(&first, &sub, &NoopReporter::shared()).await.unwrap();

        let second = MockHttpClient {
            feed: Some(&b"<rss>second</rss>"[..]),
        };
        refresh(&second, &sub, &NoopReporter::shared()).await.unwrap();

        assert_eq!(open(&sub).unwrap(), b"<rss>second</rss>");
        assert!(!dir.path().join("Foo").join("feed.zip.tmp").exists());
    }

    #[tokio::test]
    async fn refresh_propagates_network_failure() {
        let dir = tempdir().unwrap();
        let sub = subscription(dir.path());
        let client = MockHttpClient { feed: None };

        let result = refresh(&client, &sub, &NoopReporter::shared()).await;

        assert!(matches!(
            result,
            Err(SnapshotError::Feed(FeedError::FetchFailed { .. }))
        ));
        assert!(!snapshot_path(&sub).exists());
    }

    #[test]
    fn open_rejects_empty_archive() {
        let dir = tempdir().unwrap();
        let sub = subscription(dir.path());
        std::fs::create_dir_all(&sub.local_store).unwrap();

        let zip = ZipWriter::new(std::fs::File::create(snapshot_path(&sub)).unwrap());
        zip.finish().unwrap();

        let result = open(&sub);
        assert!(matches!(result, Err(SnapshotError::EmptyArchive(_))));
    }

    #[test]
    fn open_reports_missing_archive() {
        let dir = tempdir().unwrap();
        let result = open(&subscription(dir.path()));
        assert!(matches!(result, Err(SnapshotError::ReadFailed { .. })));
    }

    #[test]
    fn open_rejects_non_archive() {
        let dir = tempdir().unwrap();
        let sub = subscription(dir.path());
        std::fs::create_dir_all(&sub.local_store).unwrap();
        std::fs::write(snapshot_path(&sub), b"<rss>plain</rss>").unwrap();

        let result = open(&sub);
        assert!(matches!(result, Err(SnapshotError::Archive { .. })));
    }

    #[test]
    fn write_then_read_preserves_exact_bytes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("feed.zip");
        let feed: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();

        write_snapshot(&path, "Foo", &feed).unwrap();

        assert_eq!(read_snapshot(&path).unwrap(), feed);
    }
}
