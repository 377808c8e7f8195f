// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::{Path, PathBuf};

use futures::StreamExt;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::error::DownloadError;
use crate::feed::Item;
use crate::http::HttpClient;
use crate::progress::{ProgressEvent, SharedProgressReporter};
use crate::subscription::Subscription;

use super::filename::item_filename;

/// Suffix of files that are still being downloaded
pub const PARTIAL_SUFFIX: &str = ".partial";

/// Position of a download within a batch, for progress reporting
#[derive(Debug, Clone)]
pub struct DownloadContext {
    /// Index of this item in the download queue
    pub item_index: usize,
    /// Total number of items to download
    pub total_items: usize,
}

/// Download an item's payload into `destination_dir`.
///
/// The body is streamed to `<filename>.partial` and moved to its final
/// name only once complete. Returns the number of bytes written.
pub async fn fetch_item<C: HttpClient + ?Sized>(
    client: &C,
    item: &Item,
    destination_dir: &Path,
    context: &DownloadContext,
    reporter: &SharedProgressReporter,
) -> Result<u64, DownloadError> {
    let output_path = destination_dir.join(item_filename(item));
    let partial_path = partial_path_for(&output_path);

    let result = stream_to_file(client, item, &partial_path, context, reporter).await;

    let bytes_downloaded = match result {
        Ok(bytes) => bytes,
        Err(e) => {
            // The partial file may not exist if the request itself failed
            let _ = tokio::fs::remove_file(&partial_path).await;
            return Err(e);
        }
    };

    if let Err(e) = tokio::fs::rename(&partial_path, &output_path).await {
        let _ = tokio::fs::remove_file(&partial_path).await;
        return Err(DownloadError::FileWriteFailed {
            path: output_path,
            source: e,
        });
    }

    tracing::debug!(
        "Stored '{}' as {} ({bytes_downloaded} bytes)",
        item.title,
        output_path.display()
    );

    reporter.report(ProgressEvent::ItemCompleted {
        item_title: item.title.clone(),
        bytes_downloaded,
    });

    Ok(bytes_downloaded)
}

/// Download the given items into the subscription's storage directory,
/// one after another.
///
/// Stops at the first failure. Items downloaded before the failure stay in
/// place and are recognized as present by the next reconciliation.
pub async fn materialize_items<C: HttpClient + ?Sized>(
    client: &C,
    subscription: &Subscription,
    items: Vec<Item>,
    reporter: &SharedProgressReporter,
) -> Result<Vec<Item>, DownloadError> {
    let total_items = items.len();
    let mut materialized = Vec::with_capacity(total_items);

    for (item_index, mut item) in items.into_iter().enumerate() {
        let context = DownloadContext {
            item_index,
            total_items,
        };

        match fetch_item(client, &item, &subscription.local_store, &context, reporter).await {
            Ok(bytes) => {
                item.downloaded_bytes = Some(bytes);
                materialized.push(item);
            }
            Err(e) => {
                reporter.report(ProgressEvent::ItemFailed {
                    item_title: item.title.clone(),
                    error: e.to_string(),
                });
                return Err(e);
            }
        }
    }

    Ok(materialized)
}

async fn stream_to_file<C: HttpClient + ?Sized>(
    client: &C,
    item: &Item,
    path: &Path,
    context: &DownloadContext,
    reporter: &SharedProgressReporter,
) -> Result<u64, DownloadError> {
    let url = item.payload.url.as_str();

    let response = client
        .get_stream(url)
        .await
        .map_err(|e| DownloadError::HttpFailed {
            url: url.to_string(),
            source: e,
        })?;

    if !(200..300).contains(&response.status) {
        return Err(DownloadError::HttpStatus {
            url: url.to_string(),
            status: response.status,
        });
    }

    let total_bytes = response
        .content_length
        .or(Some(item.payload.size_bytes).filter(|&size| size > 0));

    reporter.report(ProgressEvent::ItemStarting {
        item_title: item.title.clone(),
        item_index: context.item_index,
        total_items: context.total_items,
        content_length: total_bytes,
    });

    let mut file = File::create(path)
        .await
        .map_err(|e| DownloadError::FileCreateFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    let mut bytes_downloaded: u64 = 0;
    let mut stream = response.body;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| DownloadError::StreamFailed {
            url: url.to_string(),
            source: e,
        })?;

        file.write_all(&chunk)
            .await
            .map_err(|e| DownloadError::FileWriteFailed {
                path: path.to_path_buf(),
                source: e,
            })?;

        bytes_downloaded += chunk.len() as u64;

        reporter.report(ProgressEvent::ItemProgress {
            item_title: item.title.clone(),
            bytes_downloaded,
            total_bytes,
        });
    }

    file.flush()
        .await
        .map_err(|e| DownloadError::FileWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    Ok(bytes_downloaded)
}

fn partial_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(PARTIAL_SUFFIX);
    path.with_file_name(name)
}
