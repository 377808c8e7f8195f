pub mod doctor;
pub mod error;
pub mod feed;
pub mod http;
pub mod item;
pub mod progress;
pub mod snapshot;
pub mod state;
pub mod subscription;
pub mod update;

// Re-export main types for convenience
pub use doctor::{Health, diagnose};
pub use error::{
    DownloadError, FeedError, ItemError, SnapshotError, StateError, StoreError, UpdateError,
};
pub use feed::{Item, Payload, fetch_feed_bytes, is_url, parse_items};
pub use http::{HttpClient, HttpResponse, ReqwestClient};
pub use item::{fetch_item, item_filename, materialize_items};
pub use progress::{
    ByteProgress, NoopReporter, ProgressEvent, ProgressReporter, SharedProgressReporter,
};
pub use snapshot::refresh as refresh_snapshot;
pub use state::{new_items as diff_new_items, plan_new_items};
pub use subscription::{
    RESERVED_NAME, Subscription, SubscriptionStore, default_store_path, resolve_store_path,
};
pub use update::{
    SubscriptionCheck, add_subscription, check_subscription, check_subscriptions, materialize,
};
