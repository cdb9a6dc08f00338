//! Feed list, the add/edit form, and feed mutations.

use super::PageController;
use crate::api_client::ApiClientError;
use crate::context::ClientContext;
use crate::mutation::{Mutation, MutationStatus};
use crate::queries;
use crate::query::{QueryKey, QuerySnapshot, Subscription};
use crate::types::{ActionAck, Feed, FeedId, FeedStatus, FeedUpdate, NewFeed};
use std::future::Future;

pub const CATEGORIES: [&str; 5] = ["技术", "新闻", "娱乐", "教育", "其他"];
pub const DEFAULT_CATEGORY: &str = "技术";
pub const DEFAULT_INTERVAL_SECS: u64 = 3600;
/// Fetch intervals are whole multiples of this, and at least this long.
pub const INTERVAL_STEP_SECS: u64 = 300;

/// State of the add/edit form. `editing` is the feed being edited, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedForm {
    pub name: String,
    pub url: String,
    pub category: String,
    pub interval: u64,
    pub status: FeedStatus,
    pub editing: Option<FeedId>,
}

impl Default for FeedForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            url: String::new(),
            category: DEFAULT_CATEGORY.to_string(),
            interval: DEFAULT_INTERVAL_SECS,
            status: FeedStatus::Active,
            editing: None,
        }
    }
}

impl FeedForm {
    pub fn edit(feed: &Feed) -> Self {
        let update = FeedUpdate::from_feed(feed);
        Self {
            name: update.name,
            url: update.url,
            category: if update.category.is_empty() {
                DEFAULT_CATEGORY.to_string()
            } else {
                update.category
            },
            interval: update.interval,
            status: update.status,
            editing: Some(feed.id),
        }
    }

    /// Check the form the way the server would. Errors are
    /// `ApiClientError::Validation` with a user-facing message.
    pub fn validate(&self) -> Result<(), ApiClientError> {
        if self.name.trim().is_empty() {
            return Err(ApiClientError::Validation("名称不能为空".to_string()));
        }
        let url = self.url.trim();
        let has_host = url
            .strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"))
            .is_some_and(|rest| !rest.is_empty() && !rest.starts_with('/'));
        if !has_host {
            return Err(ApiClientError::Validation(
                "URL 必须以 http:// 或 https:// 开头".to_string(),
            ));
        }
        if self.interval < INTERVAL_STEP_SECS || self.interval % INTERVAL_STEP_SECS != 0 {
            return Err(ApiClientError::Validation(format!(
                "抓取间隔必须是 {} 秒的整数倍且不小于 {} 秒",
                INTERVAL_STEP_SECS, INTERVAL_STEP_SECS
            )));
        }
        Ok(())
    }

    pub fn to_new_feed(&self) -> NewFeed {
        NewFeed {
            name: self.name.trim().to_string(),
            url: self.url.trim().to_string(),
            category: self.category.clone(),
            interval: self.interval,
        }
    }

    pub fn to_update(&self) -> FeedUpdate {
        FeedUpdate {
            name: self.name.trim().to_string(),
            url: self.url.trim().to_string(),
            category: self.category.clone(),
            interval: self.interval,
            status: self.status,
        }
    }

    pub fn cycle_category(&mut self) {
        let idx = CATEGORIES
            .iter()
            .position(|c| *c == self.category)
            .map(|i| (i + 1) % CATEGORIES.len())
            .unwrap_or(0);
        self.category = CATEGORIES[idx].to_string();
    }

    pub fn step_interval(&mut self, up: bool) {
        self.interval = if up {
            self.interval.saturating_add(INTERVAL_STEP_SECS)
        } else {
            self.interval
                .saturating_sub(INTERVAL_STEP_SECS)
                .max(INTERVAL_STEP_SECS)
        };
    }
}

pub struct FeedsController {
    ctx: ClientContext,
    feeds: Option<Subscription<Vec<Feed>>>,
    cursor: usize,
    form: Option<FeedForm>,
    create: Mutation<NewFeed, Feed>,
    update: Mutation<(FeedId, FeedUpdate), Feed>,
    delete: Mutation<FeedId, ()>,
    fetch: Mutation<FeedId, Feed>,
    fetch_all: Mutation<(), ActionAck>,
}

impl std::fmt::Debug for FeedsController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedsController")
            .field("cursor", &self.cursor)
            .field("form", &self.form)
            .field("mounted", &self.is_mounted())
            .finish()
    }
}

/// Every feed write refreshes the list and the dashboard counters.
fn feed_mutation<I: Send + 'static, O: Send + 'static>(mutation: Mutation<I, O>) -> Mutation<I, O> {
    mutation
        .invalidates(QueryKey::new(queries::FEEDS))
        .invalidates(QueryKey::new(queries::STATS))
}

impl FeedsController {
    pub fn new(ctx: ClientContext) -> Self {
        let api = ctx.api.clone();
        let create = feed_mutation(Mutation::new("create_feed", {
            let api = api.clone();
            move |feed: NewFeed| {
                let api = api.clone();
                async move { api.create_feed(&feed).await }
            }
        }));
        let update = feed_mutation(Mutation::new("update_feed", {
            let api = api.clone();
            move |(id, update): (FeedId, FeedUpdate)| {
                let api = api.clone();
                async move { api.update_feed(id, &update).await }
            }
        }));
        let delete = feed_mutation(Mutation::new("delete_feed", {
            let api = api.clone();
            move |id: FeedId| {
                let api = api.clone();
                async move { api.delete_feed(id).await }
            }
        }));
        let fetch = feed_mutation(Mutation::new("fetch_feed", {
            let api = api.clone();
            move |id: FeedId| {
                let api = api.clone();
                async move { api.fetch_feed(id).await }
            }
        }));
        let fetch_all = feed_mutation(Mutation::new("fetch_all_feeds", move |_: ()| {
            let api = api.clone();
            async move { api.fetch_all_feeds().await }
        }));

        Self {
            ctx,
            feeds: None,
            cursor: 0,
            form: None,
            create,
            update,
            delete,
            fetch,
            fetch_all,
        }
    }

    pub fn snapshot(&self) -> QuerySnapshot<Vec<Feed>> {
        match &self.feeds {
            Some(sub) => sub.snapshot(),
            None => self.ctx.cache.snapshot(&QueryKey::new(queries::FEEDS)),
        }
    }

    pub fn rows(&self) -> Vec<Feed> {
        self.snapshot()
            .data
            .map(|rows| rows.as_ref().clone())
            .unwrap_or_default()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn move_cursor(&mut self, delta: isize) {
        let len = self.rows().len();
        if len == 0 {
            self.cursor = 0;
            return;
        }
        self.cursor = (self.cursor as isize + delta).clamp(0, len as isize - 1) as usize;
    }

    pub fn current(&self) -> Option<Feed> {
        self.rows().into_iter().nth(self.cursor)
    }

    // ------------------------------------------------------------------------
    // Form
    // ------------------------------------------------------------------------

    pub fn form(&self) -> Option<&FeedForm> {
        self.form.as_ref()
    }

    pub fn form_mut(&mut self) -> Option<&mut FeedForm> {
        self.form.as_mut()
    }

    pub fn open_new_form(&mut self) {
        self.create.reset();
        self.form = Some(FeedForm::default());
    }

    pub fn open_edit_form(&mut self, feed: &Feed) {
        self.update.reset();
        self.form = Some(FeedForm::edit(feed));
    }

    pub fn close_form(&mut self) {
        self.form = None;
    }

    /// Status of whichever write the open form would perform.
    pub fn form_status(&self) -> MutationStatus {
        match self.form.as_ref().and_then(|f| f.editing) {
            Some(_) => self.update.status(),
            None => self.create.status(),
        }
    }

    /// Validate and submit the open form. Validation failures never reach the
    /// server. The caller closes the form on success.
    pub fn submit_form(
        &self,
    ) -> Result<impl Future<Output = Result<Feed, ApiClientError>> + Send + 'static, ApiClientError> {
        let form = self
            .form
            .clone()
            .ok_or_else(|| ApiClientError::Validation("no form open".to_string()))?;
        form.validate()?;

        let coordinator = self.ctx.mutations.clone();
        let create = self.create.clone();
        let update = self.update.clone();
        Ok(async move {
            match form.editing {
                Some(id) => coordinator.run(&update, (id, form.to_update())).await,
                None => coordinator.run(&create, form.to_new_feed()).await,
            }
        })
    }

    // ------------------------------------------------------------------------
    // Row actions
    // ------------------------------------------------------------------------

    pub fn create(
        &self,
        feed: NewFeed,
    ) -> impl Future<Output = Result<Feed, ApiClientError>> + Send + 'static {
        let coordinator = self.ctx.mutations.clone();
        let mutation = self.create.clone();
        async move { coordinator.run(&mutation, feed).await }
    }

    pub fn update(
        &self,
        id: FeedId,
        update: FeedUpdate,
    ) -> impl Future<Output = Result<Feed, ApiClientError>> + Send + 'static {
        let coordinator = self.ctx.mutations.clone();
        let mutation = self.update.clone();
        async move { coordinator.run(&mutation, (id, update)).await }
    }

    pub fn delete(&self, id: FeedId) -> impl Future<Output = Result<(), ApiClientError>> + Send + 'static {
        let coordinator = self.ctx.mutations.clone();
        let mutation = self.delete.clone();
        async move { coordinator.run(&mutation, id).await }
    }

    pub fn fetch(&self, id: FeedId) -> impl Future<Output = Result<Feed, ApiClientError>> + Send + 'static {
        let coordinator = self.ctx.mutations.clone();
        let mutation = self.fetch.clone();
        async move { coordinator.run(&mutation, id).await }
    }

    pub fn fetch_all(&self) -> impl Future<Output = Result<ActionAck, ApiClientError>> + Send + 'static {
        let coordinator = self.ctx.mutations.clone();
        let mutation = self.fetch_all.clone();
        async move { coordinator.run(&mutation, ()).await }
    }

    pub fn is_fetching_all(&self) -> bool {
        self.fetch_all.is_pending()
    }

    pub fn is_busy(&self) -> bool {
        [
            self.create.is_pending(),
            self.update.is_pending(),
            self.delete.is_pending(),
            self.fetch.is_pending(),
            self.fetch_all.is_pending(),
        ]
        .contains(&true)
    }
}

impl PageController for FeedsController {
    fn mount(&mut self) {
        if self.feeds.is_none() {
            self.feeds = Some(self.ctx.cache.subscribe(&queries::feeds(&self.ctx.api)));
        }
    }

    fn unmount(&mut self) {
        self.feeds = None;
    }

    fn is_mounted(&self) -> bool {
        self.feeds.is_some()
    }

    fn refresh(&self) -> usize {
        self.ctx.cache.invalidate(&QueryKey::new(queries::FEEDS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn form(name: &str, url: &str, interval: u64) -> FeedForm {
        FeedForm {
            name: name.into(),
            url: url.into(),
            interval,
            ..FeedForm::default()
        }
    }

    #[test]
    fn defaults_match_the_add_form() {
        let f = FeedForm::default();
        assert_eq!(f.category, "技术");
        assert_eq!(f.interval, 3600);
        assert!(f.editing.is_none());
    }

    #[test]
    fn validation_rejects_bad_input() {
        assert!(form("", "https://a.io/rss", 3600).validate().is_err());
        assert!(form("A", "ftp://a.io/rss", 3600).validate().is_err());
        assert!(form("A", "https://", 3600).validate().is_err());
        assert!(form("A", "https://a.io/rss", 200).validate().is_err());
        assert!(form("A", "https://a.io/rss", 3700).validate().is_err());
        assert!(form("A", "http://a.io/rss", 300).validate().is_ok());
    }

    #[test]
    fn validation_error_is_validation_variant() {
        let err = form(" ", "https://a.io", 3600).validate().expect_err("empty name");
        assert!(matches!(err, ApiClientError::Validation(_)));
    }

    #[test]
    fn category_cycles_through_all() {
        let mut f = FeedForm::default();
        let mut seen = vec![f.category.clone()];
        for _ in 0..CATEGORIES.len() - 1 {
            f.cycle_category();
            seen.push(f.category.clone());
        }
        assert_eq!(seen, CATEGORIES.iter().map(|c| c.to_string()).collect::<Vec<_>>());
        f.cycle_category();
        assert_eq!(f.category, DEFAULT_CATEGORY);
    }

    #[test]
    fn interval_never_steps_below_minimum() {
        let mut f = form("A", "https://a.io", 300);
        f.step_interval(false);
        assert_eq!(f.interval, 300);
        f.step_interval(true);
        assert_eq!(f.interval, 600);
    }

    #[test]
    fn edit_form_carries_feed_fields() {
        let feed = Feed {
            id: 4,
            name: "Daily".into(),
            url: "https://d.io/feed".into(),
            category: None,
            status: FeedStatus::Paused,
            last_fetch: None,
            article_count: 0,
            interval: Some(900),
            feed_type: None,
        };
        let f = FeedForm::edit(&feed);
        assert_eq!(f.editing, Some(4));
        assert_eq!(f.category, DEFAULT_CATEGORY);
        assert_eq!(f.to_update().status, FeedStatus::Paused);
        assert_eq!(f.to_update().interval, 900);
    }

    proptest! {
        #[test]
        fn interval_rule(interval in 0u64..20_000) {
            let ok = form("A", "https://a.io", interval).validate().is_ok();
            prop_assert_eq!(ok, interval >= 300 && interval % 300 == 0);
        }
    }
}
