// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when reading or writing the subscription store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("The name '{0}' is reserved and cannot be used for a subscription")]
    ReservedName(String),

    #[error("A subscription named '{0}' already exists")]
    DuplicateName(String),

    #[error("No subscription is managed under the name '{0}'")]
    NotFound(String),

    #[error("Failed to read subscription store {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write subscription store {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse subscription store {path}: {source}")]
    ParseFailed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize subscriptions: {0}")]
    SerializeFailed(#[from] serde_json::Error),
}

/// Errors that can occur when fetching or parsing RSS feeds
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Failed to fetch feed from {url}: {source}")]
    FetchFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to parse RSS feed: {0}")]
    ParseFailed(#[from] rss::Error),
}

/// Reasons a single feed item is rejected.
///
/// These never leave the parser: the item is logged and skipped.
#[derive(Error, Debug)]
pub enum ItemError {
    #[error("item has no title")]
    MissingTitle,

    #[error("item '{title}' has no enclosure")]
    MissingEnclosure { title: String },

    #[error("item '{title}' has an invalid enclosure URL: {source}")]
    InvalidUrl {
        title: String,
        #[source]
        source: url::ParseError,
    },

    #[error("item '{title}' has an invalid enclosure length '{value}'")]
    InvalidLength { title: String, value: String },

    #[error("item '{title}' has an invalid publication date '{value}': {source}")]
    InvalidDate {
        title: String,
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("item '{title}' has an invalid duration '{value}'")]
    InvalidDuration { title: String, value: String },
}

/// Errors that can occur when writing or reading a feed snapshot
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Snapshot archive {0} contains no entries")]
    EmptyArchive(PathBuf),

    #[error("Failed to create storage directory {path}: {source}")]
    CreateDirectoryFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write snapshot {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read snapshot {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid snapshot archive {path}: {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),
}

/// Errors that can occur when scanning a storage directory for new items
#[derive(Error, Debug)]
pub enum StateError {
    #[error("Failed to read directory {path}: {source}")]
    ReadDirectoryFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),
}

/// Errors that can occur during item downloads
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("HTTP request failed for {url}: {source}")]
    HttpFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP error {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Failed to create file {path}: {source}")]
    FileCreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write to file {path}: {source}")]
    FileWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Stream error while downloading {url}: {source}")]
    StreamFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Top-level errors for subscription operations
#[derive(Error, Debug)]
pub enum UpdateError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("State error: {0}")]
    State(#[from] StateError),

    #[error("Download error: {0}")]
    Download(#[from] DownloadError),

    #[error("Update task for '{name}' did not complete: {reason}")]
    TaskFailed { name: String, reason: String },
}
