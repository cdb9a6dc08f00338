//! Per-page view state.
//!
//! A controller owns the page's local UI state, derives query keys from it
//! and holds the matching subscriptions. Changing a key component drops the
//! old subscription and takes a new one; the cache does the rest.

pub mod dashboard;
pub mod excerpts;
pub mod feeds;
pub mod system;

pub use dashboard::{DashboardController, StatCard};
pub use excerpts::{ExcerptsController, StatusTab};
pub use feeds::{FeedForm, FeedsController};
pub use system::{SystemController, SystemTab};

/// Lifecycle shared by every page.
pub trait PageController {
    /// Take the page's subscriptions. Idempotent.
    fn mount(&mut self);

    /// Release every subscription the page holds.
    fn unmount(&mut self);

    fn is_mounted(&self) -> bool;

    /// Invalidate everything the page shows. Returns the number of refetches
    /// issued.
    fn refresh(&self) -> usize;
}
