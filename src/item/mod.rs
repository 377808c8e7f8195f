mod download;
mod filename;

pub use download::{DownloadContext, PARTIAL_SUFFIX, fetch_item, materialize_items};
pub use filename::{identity_key, item_filename, payload_extension, strip_extension};
