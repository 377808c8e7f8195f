// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::sync::Arc;

/// Events emitted while refreshing subscriptions and materializing items
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// A subscription's feed is being fetched
    FetchingFeed { subscription: String, url: String },

    /// The fetched feed has replaced the subscription's snapshot
    SnapshotStored { subscription: String, bytes: u64 },

    /// The snapshot has been reconciled against the storage directory
    NewItemsFound {
        subscription: String,
        total_items: usize,
        new_items: usize,
    },

    /// An item download is starting
    ItemStarting {
        item_title: String,
        /// Index of this item in the download queue
        item_index: usize,
        /// Total number of items to download
        total_items: usize,
        /// Expected content length in bytes, if known
        content_length: Option<u64>,
    },

    /// Item download progress update
    ItemProgress {
        item_title: String,
        bytes_downloaded: u64,
        total_bytes: Option<u64>,
    },

    /// An item was written to the storage directory
    ItemCompleted {
        item_title: String,
        bytes_downloaded: u64,
    },

    /// An item download failed
    ItemFailed { item_title: String, error: String },
}

/// Trait for reporting progress events.
///
/// Implementations can use this to display progress bars, log messages,
/// or collect statistics.
pub trait ProgressReporter: Send + Sync {
    /// Report a progress event
    fn report(&self, event: ProgressEvent);
}

/// A shared reference to a progress reporter
pub type SharedProgressReporter = Arc<dyn ProgressReporter>;

/// A no-op progress reporter that silently ignores all events.
/// Useful for tests or quiet mode.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn report(&self, _event: ProgressEvent) {}
}

impl NoopReporter {
    /// Create a new NoopReporter wrapped in an Arc
    pub fn shared() -> SharedProgressReporter {
        Arc::new(Self)
    }
}

/// Adapts a plain `(bytes_so_far, bytes_total)` callback to the reporter
/// interface. Every event other than byte progress is dropped.
pub struct ByteProgress<F> {
    callback: F,
}

impl<F> ByteProgress<F>
where
    F: Fn(u64, Option<u64>) + Send + Sync + 'static,
{
    pub fn shared(callback: F) -> SharedProgressReporter {
        Arc::new(Self { callback })
    }
}

impl<F> ProgressReporter for ByteProgress<F>
where
    F: Fn(u64, Option<u64>) + Send + Sync,
{
    fn report(&self, event: ProgressEvent) {
        if let ProgressEvent::ItemProgress {
            bytes_downloaded,
            total_bytes,
            ..
        } = event
        {
            (self.callback)(bytes_downloaded, total_bytes);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn noop_reporter_handles_all_events() {
        let reporter = NoopReporter;

        reporter.report(ProgressEvent::FetchingFeed {
            subscription: "Foo".to_string(),
            url: "https://example.com/feed.xml".to_string(),
        });
        reporter.report(ProgressEvent::SnapshotStored {
            subscription: "Foo".to_string(),
            bytes: 2048,
        });
        reporter.report(ProgressEvent::NewItemsFound {
            subscription: "Foo".to_string(),
            total_items: 10,
            new_items: 5,
        });
        reporter.report(ProgressEvent::ItemStarting {
            item_title: "Episode 1".to_string(),
            item_index: 0,
            total_items: 5,
            content_length: Some(1024),
        });
        reporter.report(ProgressEvent::ItemProgress {
            item_title: "Episode 1".to_string(),
            bytes_downloaded: 512,
            total_bytes: Some(1024),
        });
        reporter.report(ProgressEvent::ItemCompleted {
            item_title: "Episode 1".to_string(),
            bytes_downloaded: 1024,
        });
        reporter.report(ProgressEvent::ItemFailed {
            item_title: "Episode 2".to_string(),
            error: "Connection timeout".to_string(),
        });
    }

    #[test]
    fn byte_progress_forwards_only_byte_counts() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let reporter = ByteProgress::shared(move |so_far, total| {
            sink.lock().unwrap().push((so_far, total));
        });

        reporter.report(ProgressEvent::ItemStarting {
            item_title: "Episode 1".to_string(),
            item_index: 0,
            total_items: 1,
            content_length: Some(10),
        });
        reporter.report(ProgressEvent::ItemProgress {
            item_title: "Episode 1".to_string(),
            bytes_downloaded: 4,
            total_bytes: Some(10),
        });
        reporter.report(ProgressEvent::ItemProgress {
            item_title: "Episode 1".to_string(),
            bytes_downloaded: 10,
            total_bytes: Some(10),
        });

        assert_eq!(*seen.lock().unwrap(), vec![(4, Some(10)), (10, Some(10))]);
    }
}
