mod store;

pub(crate) use store::write_atomically;
pub use store::{
    RESERVED_NAME, Subscription, SubscriptionStore, default_store_path, resolve_store_path,
};
