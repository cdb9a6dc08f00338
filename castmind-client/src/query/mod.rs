//! Query cache: structural keys, descriptors and subscriptions.

mod cache;
mod key;

pub use cache::{
    CacheConfig, QueryCache, QueryDescriptor, QueryResult, QuerySnapshot, QueryStatus,
    SubscriberId, Subscription,
};
pub use key::{KeyPart, QueryKey};
