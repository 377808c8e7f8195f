// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use chrono::{DateTime, FixedOffset};
use url::Url;

use crate::error::{FeedError, ItemError};

/// A single item described by a feed
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub title: String,
    pub published_at: Option<DateTime<FixedOffset>>,
    pub duration_seconds: u64,
    pub payload: Payload,
    /// Bytes written to local storage; only set once the item was materialized
    pub downloaded_bytes: Option<u64>,
}

/// The media file attached to an item
#[derive(Debug, Clone, PartialEq)]
pub struct Payload {
    pub url: Url,
    pub size_bytes: u64,
    pub media_type: String,
}

/// Parse RSS feed XML bytes into its items, in document order.
///
/// Items that cannot be decoded are logged and skipped. Only a document
/// that cannot be read as RSS at all fails the call.
pub fn parse_items(xml_bytes: &[u8]) -> Result<Vec<Item>, FeedError> {
    let channel = rss::Channel::read_from(xml_bytes)?;

    let items = channel
        .items()
        .iter()
        .filter_map(|raw| match parse_item(raw) {
            Ok(item) => Some(item),
            Err(e) => {
                tracing::warn!("Skipping feed item: {e}");
                None
            }
        })
        .collect();

    Ok(items)
}

fn parse_item(raw: &rss::Item) -> Result<Item, ItemError> {
    let title = raw
        .title()
        .map(String::from)
        .ok_or(ItemError::MissingTitle)?;

    let enclosure = raw.enclosure().ok_or_else(|| ItemError::MissingEnclosure {
        title: title.clone(),
    })?;

    let url = Url::parse(enclosure.url().trim()).map_err(|source| ItemError::InvalidUrl {
        title: title.clone(),
        source,
    })?;

    let length = enclosure.length().trim();
    let size_bytes = if length.is_empty() {
        0
    } else {
        length.parse().map_err(|_| ItemError::InvalidLength {
            title: title.clone(),
            value: length.to_string(),
        })?
    };

    let published_at = raw
        .pub_date()
        .map(|value| {
            DateTime::parse_from_rfc2822(value.trim()).map_err(|source| ItemError::InvalidDate {
                title: title.clone(),
                value: value.to_string(),
                source,
            })
        })
        .transpose()?;

    let duration_seconds = match raw.itunes_ext().and_then(|ext| ext.duration()) {
        Some(value) => parse_duration(value).ok_or_else(|| ItemError::InvalidDuration {
            title: title.clone(),
            value: value.to_string(),
        })?,
        None => 0,
    };

    Ok(Item {
        title,
        published_at,
        duration_seconds,
        payload: Payload {
            url,
            size_bytes,
            media_type: enclosure.mime_type().to_string(),
        },
        downloaded_bytes: None,
    })
}

/// Parse a duration given as plain seconds, `MM:SS` or `HH:MM:SS`
fn parse_duration(value: &str) -> Option<u64> {
    let value = value.trim();
    if value.is_empty() {
        return Some(0);
    }

    let parts: Vec<&str> = value.split(':').collect();
    if parts.len() > 3 {
        return None;
    }

    parts.iter().try_fold(0u64, |total, part| {
        let n: u64 = part.trim().parse().ok()?;
        total.checked_mul(60)?.checked_add(n)
    })
}
