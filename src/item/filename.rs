// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::feed::Item;

/// Longest extension accepted from a URL path
const MAX_EXTENSION_LENGTH: usize = 5;

/// Extension used when neither the URL nor the media type names one
pub const FALLBACK_EXTENSION: &str = "bin";

/// Generate the filename an item is stored under: its title plus the
/// extension of its payload.
///
/// The title is used as-is apart from characters that cannot appear in a
/// single path component. There is always an extension, so stripping it
/// yields the title again.
pub fn item_filename(item: &Item) -> String {
    format!(
        "{}.{}",
        filename_safe_title(&item.title),
        payload_extension(item)
    )
}

/// The key an item is matched on against the storage directory: the
/// stem of [`item_filename`], which is what [`strip_extension`] leaves of
/// a stored file.
pub fn identity_key(item: &Item) -> String {
    filename_safe_title(&item.title)
}

/// Remove the final `.ext` from a filename
pub fn strip_extension(filename: &str) -> &str {
    match filename.rfind('.') {
        Some(pos) if pos > 0 => &filename[..pos],
        _ => filename,
    }
}

/// Infer the payload's file extension.
///
/// Attempts to extract it from the URL path, then from the media type,
/// and settles for [`FALLBACK_EXTENSION`].
pub fn payload_extension(item: &Item) -> String {
    let from_path = item
        .payload
        .url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .and_then(|filename| filename.rsplit_once('.'))
        .map(|(_, ext)| ext)
        .filter(|ext| is_plausible_extension(ext));

    if let Some(ext) = from_path {
        return ext.to_lowercase();
    }

    mime_to_extension(&item.payload.media_type)
        .unwrap_or(FALLBACK_EXTENSION)
        .to_string()
}

/// Turn a title into a single path component inside the storage directory.
///
/// Separators become `-`. Titles made only of dots (or nothing) would
/// name the directory itself or its parent, so every dot becomes `-`.
fn filename_safe_title(title: &str) -> String {
    if title.chars().all(|c| c == '.') {
        return "-".repeat(title.len().max(1));
    }

    title
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | '\0') { '-' } else { c })
        .collect()
}

fn is_plausible_extension(ext: &str) -> bool {
    !ext.is_empty()
        && ext.len() <= MAX_EXTENSION_LENGTH
        && ext.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Map MIME types to file extensions
fn mime_to_extension(mime: &str) -> Option<&'static str> {
    match mime.trim().to_lowercase().as_str() {
        "audio/mpeg" | "audio/mp3" => Some("mp3"),
        "audio/mp4" | "audio/m4a" | "audio/x-m4a" => Some("m4a"),
        "audio/aac" => Some("aac"),
        "audio/ogg" => Some("ogg"),
        "audio/opus" => Some("opus"),
        "audio/wav" | "audio/x-wav" => Some("wav"),
        "audio/flac" | "audio/x-flac" => Some("flac"),
        "video/mp4" => Some("mp4"),
        "video/x-m4v" => Some("m4v"),
        "video/webm" => Some("webm"),
        "application/pdf" => Some("pdf"),
        _ => None,
    }
}
