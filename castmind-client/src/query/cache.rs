//! Keyed query cache with request deduplication, stale-while-revalidate,
//! polling and prefix invalidation.
//!
//! The cache owns every entry. Controllers hold [`Subscription`]s and only
//! ever read [`QuerySnapshot`]s. For any key, only the most recently issued
//! request may commit its result; replies from superseded requests are
//! dropped.
//!
//! Fetches, poll timers and GC timers run as tokio tasks, so the cache must be
//! used from inside a tokio runtime. Entry state sits behind a single mutex
//! that is never held across an `.await`.

use super::key::QueryKey;
use crate::api_client::ApiClientError;
use futures_util::future::BoxFuture;
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

pub type QueryResult<T> = Result<T, ApiClientError>;

type ErasedData = Arc<dyn Any + Send + Sync>;
type ErasedFetch = Arc<dyn Fn() -> BoxFuture<'static, QueryResult<ErasedData>> + Send + Sync>;
type Fetcher<T> = Arc<dyn Fn() -> BoxFuture<'static, QueryResult<T>> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct RequestId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    Idle,
    Loading,
    Success,
    Error,
}

/// Cache-wide defaults.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Stale time for descriptors that do not set their own.
    pub default_stale_time: Duration,
    /// How long an entry without subscribers is kept before eviction.
    pub gc_time: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_stale_time: Duration::ZERO,
            gc_time: Duration::from_secs(300),
        }
    }
}

impl CacheConfig {
    pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
        self.default_stale_time = stale_time;
        self
    }

    pub fn with_gc_time(mut self, gc_time: Duration) -> Self {
        self.gc_time = gc_time;
        self
    }
}

/// A logical read: its key, how to fetch it, and its freshness policy.
pub struct QueryDescriptor<T> {
    key: QueryKey,
    fetcher: Fetcher<T>,
    stale_time: Option<Duration>,
    poll_interval: Option<Duration>,
}

impl<T> Clone for QueryDescriptor<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            fetcher: self.fetcher.clone(),
            stale_time: self.stale_time,
            poll_interval: self.poll_interval,
        }
    }
}

impl<T> std::fmt::Debug for QueryDescriptor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryDescriptor")
            .field("key", &self.key)
            .field("stale_time", &self.stale_time)
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

impl<T: Send + Sync + 'static> QueryDescriptor<T> {
    pub fn new<F, Fut>(key: QueryKey, fetcher: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = QueryResult<T>> + Send + 'static,
    {
        Self {
            key,
            fetcher: Arc::new(move || Box::pin(fetcher())),
            stale_time: None,
            poll_interval: None,
        }
    }

    pub fn stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = Some(stale_time);
        self
    }

    pub fn poll_every(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub fn poll_interval(&self) -> Option<Duration> {
        self.poll_interval
    }

    fn erased_fetch(&self) -> ErasedFetch {
        let fetcher = self.fetcher.clone();
        Arc::new(move || {
            let fut = fetcher();
            Box::pin(async move { fut.await.map(|data| Arc::new(data) as ErasedData) })
        })
    }
}

/// Read-only view of an entry at one instant.
#[derive(Debug)]
pub struct QuerySnapshot<T> {
    pub status: QueryStatus,
    pub data: Option<Arc<T>>,
    pub error: Option<Arc<ApiClientError>>,
    pub last_fetched_at: Option<Instant>,
    pub is_fetching: bool,
}

impl<T> Clone for QuerySnapshot<T> {
    fn clone(&self) -> Self {
        Self {
            status: self.status,
            data: self.data.clone(),
            error: self.error.clone(),
            last_fetched_at: self.last_fetched_at,
            is_fetching: self.is_fetching,
        }
    }
}

impl<T> QuerySnapshot<T> {
    fn empty() -> Self {
        Self {
            status: QueryStatus::Idle,
            data: None,
            error: None,
            last_fetched_at: None,
            is_fetching: false,
        }
    }

    /// First load with nothing to show yet.
    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Loading && self.data.is_none()
    }

    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Error
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_deref()
    }
}

struct PollTimer {
    interval: Duration,
    handle: JoinHandle<()>,
}

struct Slot {
    status: QueryStatus,
    data: Option<ErasedData>,
    error: Option<Arc<ApiClientError>>,
    last_fetched_at: Option<Instant>,
    invalidated: bool,
    in_flight: Option<RequestId>,
    fetch: ErasedFetch,
    stale_time: Duration,
    subscribers: HashMap<SubscriberId, Option<Duration>>,
    poll: Option<PollTimer>,
    gc: Option<JoinHandle<()>>,
    version: watch::Sender<u64>,
}

impl Slot {
    fn new(fetch: ErasedFetch, stale_time: Duration) -> Self {
        let (version, _) = watch::channel(0);
        Self {
            status: QueryStatus::Idle,
            data: None,
            error: None,
            last_fetched_at: None,
            invalidated: false,
            in_flight: None,
            fetch,
            stale_time,
            subscribers: HashMap::new(),
            poll: None,
            gc: None,
            version,
        }
    }

    fn needs_refresh(&self, now: Instant) -> bool {
        match self.status {
            QueryStatus::Idle | QueryStatus::Error => true,
            _ if self.invalidated => true,
            _ => self
                .last_fetched_at
                .map(|at| now.saturating_duration_since(at) > self.stale_time)
                .unwrap_or(true),
        }
    }

    fn notify(&self) {
        self.version.send_modify(|v| *v = v.wrapping_add(1));
    }

    fn shortest_poll(&self) -> Option<Duration> {
        self.subscribers.values().flatten().min().copied()
    }
}

impl Drop for Slot {
    fn drop(&mut self) {
        if let Some(poll) = self.poll.take() {
            poll.handle.abort();
        }
        if let Some(gc) = self.gc.take() {
            gc.abort();
        }
    }
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<QueryKey, Slot>,
    next_request_id: u64,
    next_subscriber_id: u64,
}

struct CacheInner {
    config: CacheConfig,
    state: Mutex<CacheState>,
}

/// Shared handle to the query cache. Cloning is cheap; all clones address the
/// same entries.
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<CacheInner>,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("config", &self.inner.config)
            .field("entries", &self.entry_count())
            .finish()
    }
}

impl QueryCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                config,
                state: Mutex::new(CacheState::default()),
            }),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Bind to `descriptor`'s key. Creates and fetches the entry if it is
    /// new, revalidates it in the background if it is stale, and attaches to
    /// an in-flight request instead of issuing a second one.
    pub fn subscribe<T: Send + Sync + 'static>(
        &self,
        descriptor: &QueryDescriptor<T>,
    ) -> Subscription<T> {
        let key = descriptor.key.clone();
        let stale_time = descriptor
            .stale_time
            .unwrap_or(self.inner.config.default_stale_time);
        let mut state = self.inner.lock();
        state.next_subscriber_id += 1;
        let id = SubscriberId(state.next_subscriber_id);

        let (receiver, needs_fetch) = {
            let slot = state
                .entries
                .entry(key.clone())
                .or_insert_with(|| Slot::new(descriptor.erased_fetch(), stale_time));
            slot.fetch = descriptor.erased_fetch();
            slot.stale_time = stale_time;
            if let Some(gc) = slot.gc.take() {
                gc.abort();
            }
            slot.subscribers.insert(id, descriptor.poll_interval);

            // An in-flight request on an invalidated slot was issued after the invalidation.
            let needs_fetch = slot.in_flight.is_none() && slot.needs_refresh(Instant::now());
            if slot.in_flight.is_some() {
                tracing::debug!(key = %key, "attaching to in-flight request");
            } else if !needs_fetch {
                tracing::debug!(key = %key, "serving cached entry");
            }
            (slot.version.subscribe(), needs_fetch)
        };

        if needs_fetch {
            state.issue_fetch(&self.inner, &key);
        }
        state.reschedule_poll(&self.inner, &key);

        Subscription {
            cache: self.clone(),
            key,
            id,
            version: receiver,
            _marker: PhantomData,
        }
    }

    /// Drop one subscriber. At zero subscribers polling stops at once and the
    /// entry becomes eligible for eviction after `gc_time`.
    pub fn unsubscribe(&self, key: &QueryKey, subscriber: SubscriberId) {
        let mut state = self.inner.lock();
        let now_unused = match state.entries.get_mut(key) {
            Some(slot) => {
                slot.subscribers.remove(&subscriber);
                slot.subscribers.is_empty()
            }
            None => return,
        };
        state.reschedule_poll(&self.inner, key);
        if now_unused {
            state.schedule_gc(&self.inner, key);
        }
    }

    /// Mark every entry under `prefix` stale. Subscribed entries refetch
    /// immediately, superseding any request already in flight; unsubscribed
    /// ones refetch on their next subscribe. Returns the number of refetches
    /// issued.
    pub fn invalidate(&self, prefix: &QueryKey) -> usize {
        self.invalidate_inner(prefix).len()
    }

    /// [`invalidate`](Self::invalidate), then wait until every refetch it
    /// issued has settled (committed, failed, or been evicted).
    pub async fn invalidate_and_settle(&self, prefix: &QueryKey) {
        let pending = self.invalidate_inner(prefix);
        let waits = pending.into_iter().map(|(key, receiver)| {
            let cache = self.clone();
            async move { cache.wait_idle(&key, receiver).await }
        });
        futures_util::future::join_all(waits).await;
    }

    fn invalidate_inner(&self, prefix: &QueryKey) -> Vec<(QueryKey, watch::Receiver<u64>)> {
        let mut state = self.inner.lock();
        let matching: Vec<QueryKey> = state
            .entries
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect();

        let mut refetched = Vec::new();
        for key in matching {
            let subscribed = match state.entries.get_mut(&key) {
                Some(slot) => {
                    slot.invalidated = true;
                    if slot.subscribers.is_empty() && slot.in_flight.take().is_some() {
                        // A reply issued before the invalidation must not land.
                        slot.notify();
                    }
                    !slot.subscribers.is_empty()
                }
                None => continue,
            };
            if subscribed {
                state.issue_fetch(&self.inner, &key);
                if let Some(slot) = state.entries.get(&key) {
                    refetched.push((key.clone(), slot.version.subscribe()));
                }
            }
        }
        tracing::debug!(prefix = %prefix, refetched = refetched.len(), "invalidated queries");
        refetched
    }

    async fn wait_idle(&self, key: &QueryKey, mut receiver: watch::Receiver<u64>) {
        while self.is_fetching(key) {
            if receiver.changed().await.is_err() {
                break;
            }
        }
    }

    pub fn snapshot<T: Send + Sync + 'static>(&self, key: &QueryKey) -> QuerySnapshot<T> {
        let state = self.inner.lock();
        match state.entries.get(key) {
            Some(slot) => QuerySnapshot {
                status: slot.status,
                data: slot
                    .data
                    .clone()
                    .and_then(|data| data.downcast::<T>().ok()),
                error: slot.error.clone(),
                last_fetched_at: slot.last_fetched_at,
                is_fetching: slot.in_flight.is_some(),
            },
            None => QuerySnapshot::empty(),
        }
    }

    pub fn is_fetching(&self, key: &QueryKey) -> bool {
        self.inner
            .lock()
            .entries
            .get(key)
            .map(|slot| slot.in_flight.is_some())
            .unwrap_or(false)
    }

    pub fn contains(&self, key: &QueryKey) -> bool {
        self.inner.lock().entries.contains_key(key)
    }

    pub fn entry_count(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn subscriber_count(&self, key: &QueryKey) -> usize {
        self.inner
            .lock()
            .entries
            .get(key)
            .map(|slot| slot.subscribers.len())
            .unwrap_or(0)
    }

    /// Poll interval currently driving `key`, if a timer is running.
    pub fn active_poll_interval(&self, key: &QueryKey) -> Option<Duration> {
        self.inner
            .lock()
            .entries
            .get(key)
            .and_then(|slot| slot.poll.as_ref().map(|p| p.interval))
    }
}

impl CacheInner {
    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn commit(&self, key: &QueryKey, request: RequestId, result: QueryResult<ErasedData>) {
        let mut state = self.lock();
        let Some(slot) = state.entries.get_mut(key) else {
            tracing::debug!(key = %key, request_id = request.0, "entry evicted before reply");
            return;
        };
        if slot.in_flight != Some(request) {
            tracing::debug!(key = %key, request_id = request.0, "discarding superseded reply");
            return;
        }
        slot.in_flight = None;
        match result {
            Ok(data) => {
                slot.data = Some(data);
                slot.error = None;
                slot.status = QueryStatus::Success;
                slot.last_fetched_at = Some(Instant::now());
                slot.invalidated = false;
            }
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "query fetch failed");
                slot.error = Some(Arc::new(err));
                slot.status = QueryStatus::Error;
            }
        }
        slot.notify();
    }

    fn poll_tick(self: &Arc<Self>, key: &QueryKey) {
        let mut state = self.lock();
        let due = state
            .entries
            .get(key)
            .map(|slot| !slot.subscribers.is_empty() && slot.in_flight.is_none())
            .unwrap_or(false);
        if due {
            tracing::trace!(key = %key, "poll tick");
            state.issue_fetch(self, key);
        }
    }

    fn collect(&self, key: &QueryKey) {
        let mut state = self.lock();
        let idle = state
            .entries
            .get_mut(key)
            .map(|slot| {
                slot.gc.take();
                slot.subscribers.is_empty()
            })
            .unwrap_or(false);
        if idle {
            state.entries.remove(key);
            tracing::debug!(key = %key, "evicted idle query");
        }
    }
}

impl CacheState {
    /// Start a fetch for `key`, superseding whatever request was in flight.
    fn issue_fetch(&mut self, inner: &Arc<CacheInner>, key: &QueryKey) {
        self.next_request_id += 1;
        let request = RequestId(self.next_request_id);
        let Some(slot) = self.entries.get_mut(key) else {
            return;
        };
        if let Some(previous) = slot.in_flight.replace(request) {
            tracing::debug!(key = %key, superseded = previous.0, request_id = request.0, "superseding in-flight request");
        }
        slot.status = QueryStatus::Loading;
        slot.notify();

        let fetch = slot.fetch.clone();
        let weak: Weak<CacheInner> = Arc::downgrade(inner);
        let task_key = key.clone();
        let spawned = spawn(async move {
            let result = fetch().await;
            if let Some(inner) = weak.upgrade() {
                inner.commit(&task_key, request, result);
            }
        });
        if spawned.is_none() {
            slot.in_flight = None;
            slot.status = QueryStatus::Error;
            slot.error = Some(Arc::new(ApiClientError::Config(
                "query cache used outside a tokio runtime".to_string(),
            )));
            slot.notify();
        }
    }

    /// Bring the poll timer in line with the shortest interval any current
    /// subscriber asked for; stop it when nobody asks.
    fn reschedule_poll(&mut self, inner: &Arc<CacheInner>, key: &QueryKey) {
        let Some(slot) = self.entries.get_mut(key) else {
            return;
        };
        let wanted = slot.shortest_poll();
        let current = slot.poll.as_ref().map(|p| p.interval);
        if wanted == current {
            return;
        }
        if let Some(old) = slot.poll.take() {
            old.handle.abort();
            tracing::info!(key = %key, "polling stopped");
        }
        let Some(period) = wanted else {
            return;
        };

        let weak = Arc::downgrade(inner);
        let task_key = key.clone();
        let handle = spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                inner.poll_tick(&task_key);
            }
        });
        if let Some(handle) = handle {
            tracing::info!(key = %key, interval_ms = period.as_millis() as u64, "polling started");
            slot.poll = Some(PollTimer {
                interval: period,
                handle,
            });
        }
    }

    fn schedule_gc(&mut self, inner: &Arc<CacheInner>, key: &QueryKey) {
        let gc_time = inner.config.gc_time;
        let Some(slot) = self.entries.get_mut(key) else {
            return;
        };
        if let Some(old) = slot.gc.take() {
            old.abort();
        }
        let weak = Arc::downgrade(inner);
        let task_key = key.clone();
        slot.gc = spawn(async move {
            tokio::time::sleep(gc_time).await;
            if let Some(inner) = weak.upgrade() {
                inner.collect(&task_key);
            }
        });
    }
}

fn spawn<F>(future: F) -> Option<JoinHandle<()>>
where
    F: Future<Output = ()> + Send + 'static,
{
    tokio::runtime::Handle::try_current()
        .ok()
        .map(|handle| handle.spawn(future))
}

/// Live binding to one cache entry. Dropping it unsubscribes.
pub struct Subscription<T> {
    cache: QueryCache,
    key: QueryKey,
    id: SubscriberId,
    version: watch::Receiver<u64>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> std::fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("key", &self.key)
            .field("id", &self.id)
            .finish()
    }
}

impl<T: Send + Sync + 'static> Subscription<T> {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn snapshot(&self) -> QuerySnapshot<T> {
        self.cache.snapshot(&self.key)
    }

    pub fn data(&self) -> Option<Arc<T>> {
        self.snapshot().data
    }

    /// Wait for the next transition of the entry. Returns `false` once the
    /// entry is gone.
    pub async fn changed(&mut self) -> bool {
        self.version.changed().await.is_ok()
    }

    /// True if the entry moved since the last [`mark_seen`](Self::mark_seen)
    /// or [`changed`](Self::changed).
    pub fn has_changed(&self) -> bool {
        self.version.has_changed().unwrap_or(false)
    }

    pub fn mark_seen(&mut self) {
        self.version.borrow_and_update();
    }

    /// Wait until no request is in flight for this key, then snapshot.
    pub async fn settled(&mut self) -> QuerySnapshot<T> {
        while self.cache.is_fetching(&self.key) {
            if !self.changed().await {
                break;
            }
        }
        self.snapshot()
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.cache.unsubscribe(&self.key, self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query_key;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::oneshot;

    fn counting(key: QueryKey, calls: Arc<AtomicUsize>) -> QueryDescriptor<usize> {
        QueryDescriptor::new(key, move || {
            let calls = calls.clone();
            async move { Ok(calls.fetch_add(1, Ordering::SeqCst) + 1) }
        })
    }

    #[tokio::test]
    async fn equal_keys_share_one_entry_and_one_request() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let a = counting(query_key!["articles", 1, "all"], calls.clone());
        let b = counting(QueryKey::new("articles").with(1u32).with("all"), calls.clone());

        let mut first = cache.subscribe(&a);
        let second = cache.subscribe(&b);
        assert_eq!(cache.entry_count(), 1);
        assert_eq!(cache.subscriber_count(a.key()), 2);

        let snapshot = first.settled().await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let other = second.snapshot();
        assert!(Arc::ptr_eq(
            snapshot.data.as_ref().expect("data"),
            other.data.as_ref().expect("data")
        ));
    }

    #[tokio::test]
    async fn same_tick_subscriptions_deduplicate() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let feeds = counting(query_key!["feeds"], calls.clone());

        let mut a = cache.subscribe(&feeds);
        let _b = cache.subscribe(&feeds);
        assert!(cache.is_fetching(feeds.key()));
        a.settled().await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn superseded_reply_is_discarded() {
        let cache = QueryCache::default();
        let (tx1, rx1) = oneshot::channel::<&'static str>();
        let (tx2, rx2) = oneshot::channel::<&'static str>();
        let receivers = Arc::new(Mutex::new(vec![rx2, rx1]));
        let descriptor = QueryDescriptor::new(query_key!["articles", 1, "all"], move || {
            let rx = receivers.lock().ok().and_then(|mut r| r.pop());
            async move {
                match rx {
                    Some(rx) => rx.await.map_err(|_| ApiClientError::Validation("closed".into())),
                    None => Err(ApiClientError::Validation("no more replies".into())),
                }
            }
        });

        let mut sub = cache.subscribe(&descriptor);
        tokio::task::yield_now().await;
        assert_eq!(cache.invalidate(&QueryKey::new("articles")), 1);
        tokio::task::yield_now().await;

        tx2.send("second").expect("send second");
        sub.changed().await;
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        assert_eq!(sub.snapshot().data.as_deref(), Some(&"second"));

        tx1.send("first").expect("send first");
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        let snapshot = sub.snapshot();
        assert_eq!(snapshot.data.as_deref(), Some(&"second"));
        assert_eq!(snapshot.status, QueryStatus::Success);
    }

    #[tokio::test]
    async fn invalidation_while_unsubscribed_drops_inflight_reply() {
        let cache = QueryCache::new(CacheConfig::default().with_stale_time(Duration::from_secs(60)));
        let (tx, rx) = oneshot::channel::<&'static str>();
        let pending = Arc::new(Mutex::new(Some(rx)));
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let descriptor = QueryDescriptor::new(query_key!["excerpts", "all"], move || {
            counter.fetch_add(1, Ordering::SeqCst);
            let rx = pending.lock().ok().and_then(|mut r| r.take());
            async move {
                match rx {
                    Some(rx) => rx.await.map_err(|_| ApiClientError::Validation("closed".into())),
                    None => Ok("post-mutation"),
                }
            }
        });

        let sub = cache.subscribe(&descriptor);
        tokio::task::yield_now().await;
        drop(sub);
        assert!(cache.is_fetching(&query_key!["excerpts", "all"]));

        assert_eq!(cache.invalidate(&query_key!["excerpts"]), 0);
        assert!(!cache.is_fetching(&query_key!["excerpts", "all"]));
        let _ = tx.send("pre-mutation");
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }

        let mut sub = cache.subscribe(&descriptor);
        let snapshot = sub.settled().await;
        assert_eq!(snapshot.data.as_deref(), Some(&"post-mutation"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failure_keeps_previous_data() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let descriptor = QueryDescriptor::new(query_key!["stats"], move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Ok(42u64)
                } else {
                    Err(ApiClientError::Status {
                        code: 500,
                        body: "boom".into(),
                    })
                }
            }
        });

        let mut sub = cache.subscribe(&descriptor);
        assert_eq!(sub.settled().await.data.as_deref(), Some(&42));

        cache.invalidate(&query_key!["stats"]);
        let snapshot = sub.settled().await;
        assert_eq!(snapshot.status, QueryStatus::Error);
        assert_eq!(snapshot.data.as_deref(), Some(&42));
        assert_eq!(snapshot.error.as_ref().and_then(|e| e.status_code()), Some(500));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_entry_refetches_on_resubscribe() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let descriptor = QueryDescriptor::new(query_key!["config"], move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(ApiClientError::Validation("bad".into()))
                } else {
                    Ok("ok")
                }
            }
        });

        let mut sub = cache.subscribe(&descriptor);
        assert!(sub.settled().await.is_error());
        drop(sub);

        let mut retry = cache.subscribe(&descriptor);
        assert_eq!(retry.settled().await.data.as_deref(), Some(&"ok"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unsubscribed_entries_refetch_lazily() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let descriptor = counting(query_key!["feeds"], calls.clone()).stale_time(Duration::from_secs(60));

        let mut sub = cache.subscribe(&descriptor);
        sub.settled().await;
        drop(sub);

        assert_eq!(cache.invalidate(&query_key!["feeds"]), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let mut again = cache.subscribe(&descriptor);
        assert_eq!(again.settled().await.data.as_deref(), Some(&2));
    }

    #[tokio::test]
    async fn fresh_entry_is_served_without_refetch() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let descriptor = counting(query_key!["trends"], calls.clone()).stale_time(Duration::from_secs(60));

        let mut a = cache.subscribe(&descriptor);
        a.settled().await;
        let b = cache.subscribe(&descriptor);
        assert!(!cache.is_fetching(b.key()));
        assert_eq!(b.data().as_deref(), Some(&1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_entry_is_served_then_revalidated() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let descriptor = counting(query_key!["trends"], calls.clone()).stale_time(Duration::from_secs(5));

        let mut a = cache.subscribe(&descriptor);
        a.settled().await;
        tokio::time::advance(Duration::from_secs(6)).await;

        let mut b = cache.subscribe(&descriptor);
        let immediate = b.snapshot();
        assert_eq!(immediate.data.as_deref(), Some(&1));
        assert!(immediate.is_fetching);
        assert_eq!(b.settled().await.data.as_deref(), Some(&2));
    }

    #[tokio::test(start_paused = true)]
    async fn polling_stops_after_last_unsubscribe() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let descriptor =
            counting(query_key!["health"], calls.clone()).poll_every(Duration::from_secs(10));

        let mut sub = cache.subscribe(&descriptor);
        sub.settled().await;
        tokio::time::sleep(Duration::from_secs(25)).await;
        let polled = calls.load(Ordering::SeqCst);
        assert_eq!(polled, 3);

        drop(sub);
        assert_eq!(cache.active_poll_interval(descriptor.key()), None);
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(calls.load(Ordering::SeqCst), polled);
    }

    #[tokio::test(start_paused = true)]
    async fn shortest_poll_interval_wins() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let global =
            counting(query_key!["health"], calls.clone()).poll_every(Duration::from_secs(30));
        let page = counting(query_key!["health"], calls.clone()).poll_every(Duration::from_secs(10));

        let _global = cache.subscribe(&global);
        assert_eq!(cache.active_poll_interval(global.key()), Some(Duration::from_secs(30)));
        let page_sub = cache.subscribe(&page);
        assert_eq!(cache.active_poll_interval(global.key()), Some(Duration::from_secs(10)));
        drop(page_sub);
        assert_eq!(cache.active_poll_interval(global.key()), Some(Duration::from_secs(30)));
    }

    #[tokio::test(start_paused = true)]
    async fn idle_entries_are_evicted_after_gc_time() {
        let cache = QueryCache::new(CacheConfig::default().with_gc_time(Duration::from_secs(5)));
        let calls = Arc::new(AtomicUsize::new(0));
        let descriptor = counting(query_key!["feeds"], calls.clone());

        let mut sub = cache.subscribe(&descriptor);
        sub.settled().await;
        drop(sub);
        assert!(cache.contains(descriptor.key()));

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(!cache.contains(descriptor.key()));
    }

    #[tokio::test(start_paused = true)]
    async fn resubscribing_cancels_eviction() {
        let cache = QueryCache::new(CacheConfig::default().with_gc_time(Duration::from_secs(5)));
        let calls = Arc::new(AtomicUsize::new(0));
        let descriptor = counting(query_key!["feeds"], calls.clone());

        let mut sub = cache.subscribe(&descriptor);
        sub.settled().await;
        drop(sub);
        tokio::time::sleep(Duration::from_secs(3)).await;
        let _again = cache.subscribe(&descriptor);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(cache.contains(descriptor.key()));
    }

    #[tokio::test]
    async fn invalidate_and_settle_waits_for_refetch() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let descriptor = counting(query_key!["excerpts", 1, "all"], calls.clone());

        let mut sub = cache.subscribe(&descriptor);
        sub.settled().await;
        cache.invalidate_and_settle(&QueryKey::new("excerpts")).await;
        let snapshot = sub.snapshot();
        assert!(!snapshot.is_fetching);
        assert_eq!(snapshot.data.as_deref(), Some(&2));
    }

    #[tokio::test]
    async fn subscribers_are_notified_on_transitions() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let descriptor = counting(query_key!["feeds"], calls.clone());

        let mut sub = cache.subscribe(&descriptor);
        assert!(sub.changed().await);
        sub.settled().await;
        sub.mark_seen();
        assert!(!sub.has_changed());
        cache.invalidate(&query_key!["feeds"]);
        assert!(sub.has_changed());
    }
}
