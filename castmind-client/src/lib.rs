//! CastMind client library.
//!
//! Talks to the CastMind REST API (`/api/v1`) and keeps server data in a
//! keyed query cache. Page controllers derive query keys from their local
//! UI state and run mutations that invalidate the cached views they touch.
//!
//! ```ignore
//! use castmind_client::{ClientConfig, ClientContext};
//! use castmind_client::controllers::ExcerptsController;
//!
//! let ctx = ClientContext::new(&ClientConfig::new("http://localhost:8000"))?;
//! let mut excerpts = ExcerptsController::excerpts(ctx.clone(), 20);
//! excerpts.mount();
//! excerpts.mark_read(7).await?;
//! ```

pub mod api_client;
pub mod context;
pub mod controllers;
pub mod health;
pub mod mutation;
pub mod queries;
pub mod query;
pub mod template;
pub mod types;

pub use api_client::{ApiClientError, ClientConfig, RestClient};
pub use context::ClientContext;
pub use mutation::{Mutation, MutationCoordinator, MutationStatus};
pub use query::{
    CacheConfig, KeyPart, QueryCache, QueryDescriptor, QueryKey, QuerySnapshot, QueryStatus,
    SubscriberId, Subscription,
};
