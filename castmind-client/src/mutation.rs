//! Write operations and the cache invalidation that follows them.

use crate::api_client::ApiClientError;
use crate::query::{QueryCache, QueryKey};
use futures_util::future::BoxFuture;
use std::future::Future;
use std::sync::{Arc, Mutex};

/// Lifecycle of a single mutation, for enabling buttons and showing failures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MutationStatus {
    #[default]
    Idle,
    Pending,
    Success,
    Error(String),
}

impl MutationStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, MutationStatus::Pending)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            MutationStatus::Error(msg) => Some(msg),
            _ => None,
        }
    }
}

type Action<I, O> = Arc<dyn Fn(I) -> BoxFuture<'static, Result<O, ApiClientError>> + Send + Sync>;

/// A named write that, on success, invalidates a fixed set of key prefixes.
pub struct Mutation<I, O> {
    name: &'static str,
    action: Action<I, O>,
    invalidates: Vec<QueryKey>,
    status: Arc<Mutex<MutationStatus>>,
}

impl<I, O> Clone for Mutation<I, O> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            action: self.action.clone(),
            invalidates: self.invalidates.clone(),
            status: self.status.clone(),
        }
    }
}

impl<I, O> std::fmt::Debug for Mutation<I, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mutation")
            .field("name", &self.name)
            .field("invalidates", &self.invalidates)
            .field(
                "status",
                &*self.status.lock().unwrap_or_else(|poisoned| poisoned.into_inner()),
            )
            .finish()
    }
}

impl<I: Send + 'static, O: Send + 'static> Mutation<I, O> {
    pub fn new<F, Fut>(name: &'static str, action: F) -> Self
    where
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O, ApiClientError>> + Send + 'static,
    {
        Self {
            name,
            action: Arc::new(move |input| Box::pin(action(input))),
            invalidates: Vec::new(),
            status: Arc::new(Mutex::new(MutationStatus::Idle)),
        }
    }

    pub fn invalidates(mut self, prefix: QueryKey) -> Self {
        self.invalidates.push(prefix);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn invalidated_prefixes(&self) -> &[QueryKey] {
        &self.invalidates
    }

    pub fn status(&self) -> MutationStatus {
        self.status
            .lock()
            .map(|s| s.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn is_pending(&self) -> bool {
        self.status().is_pending()
    }

    /// Back to `Idle`, e.g. when a form is reopened.
    pub fn reset(&self) {
        self.set_status(MutationStatus::Idle);
    }

    fn set_status(&self, status: MutationStatus) {
        match self.status.lock() {
            Ok(mut guard) => *guard = status,
            Err(poisoned) => *poisoned.into_inner() = status,
        }
    }
}

/// Runs mutations against the shared cache.
#[derive(Debug, Clone)]
pub struct MutationCoordinator {
    cache: QueryCache,
}

impl MutationCoordinator {
    pub fn new(cache: QueryCache) -> Self {
        Self { cache }
    }

    /// Perform `mutation`. On success every declared prefix is invalidated and
    /// its active refetches have settled before this returns. On failure the
    /// cache is left alone.
    pub async fn run<I, O>(&self, mutation: &Mutation<I, O>, input: I) -> Result<O, ApiClientError>
    where
        I: Send + 'static,
        O: Send + 'static,
    {
        mutation.set_status(MutationStatus::Pending);
        match (mutation.action)(input).await {
            Ok(output) => {
                tracing::info!(
                    mutation = mutation.name,
                    invalidates = mutation.invalidates.len(),
                    "mutation succeeded"
                );
                let settles = mutation
                    .invalidates
                    .iter()
                    .map(|prefix| self.cache.invalidate_and_settle(prefix));
                futures_util::future::join_all(settles).await;
                mutation.set_status(MutationStatus::Success);
                Ok(output)
            }
            Err(err) => {
                tracing::warn!(mutation = mutation.name, error = %err, "mutation failed");
                mutation.set_status(MutationStatus::Error(err.to_string()));
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryDescriptor;
    use crate::query_key;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_feeds(cache: &QueryCache, calls: Arc<AtomicUsize>) -> crate::query::Subscription<usize> {
        cache.subscribe(&QueryDescriptor::new(query_key!["feeds"], move || {
            let calls = calls.clone();
            async move { Ok(calls.fetch_add(1, Ordering::SeqCst) + 1) }
        }))
    }

    #[test]
    fn debug_shows_name_and_status() {
        let mark_read = Mutation::new("mark_read", |id: i64| async move { Ok(id) })
            .invalidates(query_key!["excerpts"]);
        let rendered = format!("{mark_read:?}");
        assert!(rendered.contains("mark_read"));
        assert!(rendered.contains("Idle"));
    }

    #[tokio::test]
    async fn success_invalidates_declared_prefixes() {
        let cache = QueryCache::default();
        let coordinator = MutationCoordinator::new(cache.clone());
        let calls = Arc::new(AtomicUsize::new(0));
        let mut feeds = counting_feeds(&cache, calls.clone());
        feeds.settled().await;

        let delete = Mutation::new("delete_feed", |id: i64| async move { Ok(id) })
            .invalidates(query_key!["feeds"]);
        let out = coordinator.run(&delete, 3).await.expect("mutation");

        assert_eq!(out, 3);
        assert_eq!(delete.status(), MutationStatus::Success);
        assert_eq!(feeds.snapshot().data.as_deref(), Some(&2));
    }

    #[tokio::test]
    async fn failure_leaves_cache_untouched() {
        let cache = QueryCache::default();
        let coordinator = MutationCoordinator::new(cache.clone());
        let calls = Arc::new(AtomicUsize::new(0));
        let mut feeds = counting_feeds(&cache, calls.clone());
        feeds.settled().await;

        let delete = Mutation::new("delete_feed", |_: i64| async move {
            Err::<(), _>(ApiClientError::Status {
                code: 404,
                body: "not found".into(),
            })
        })
        .invalidates(query_key!["feeds"]);

        let err = coordinator.run(&delete, 99).await.expect_err("should fail");
        assert_eq!(err.status_code(), Some(404));
        assert!(delete.status().error().is_some());
        assert!(!cache.is_fetching(feeds.key()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn status_is_pending_while_running() {
        let cache = QueryCache::default();
        let coordinator = MutationCoordinator::new(cache);
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let rx = Arc::new(Mutex::new(Some(rx)));
        let start = Mutation::new("start_scheduler", move |_: ()| {
            let rx = rx.lock().ok().and_then(|mut r| r.take());
            async move {
                if let Some(rx) = rx {
                    let _ = rx.await;
                }
                Ok(())
            }
        });

        let running = start.clone();
        let task = tokio::spawn(async move { coordinator.run(&running, ()).await });
        tokio::task::yield_now().await;
        assert!(start.is_pending());

        tx.send(()).expect("release");
        task.await.expect("join").expect("mutation");
        assert_eq!(start.status(), MutationStatus::Success);
        start.reset();
        assert_eq!(start.status(), MutationStatus::Idle);
    }
}
