mod fetch;
mod parse;

pub use fetch::{fetch_feed_bytes, is_url};
pub use parse::{Item, Payload, parse_items};
