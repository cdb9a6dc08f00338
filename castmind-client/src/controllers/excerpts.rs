//! Paginated article listing with status filter, local search, selection and
//! document templates. Serves both the Excerpts page and the Articles page;
//! they differ only in the key names they cache under.

use super::PageController;
use crate::api_client::{ApiClientError, ArticleListParams, StatusFilter};
use crate::context::ClientContext;
use crate::mutation::Mutation;
use crate::queries::{self, ListScope};
use crate::query::{QueryKey, QuerySnapshot, Subscription};
use crate::template::{self, DocTemplate, DEFAULT_TEMPLATES};
use crate::types::{Article, ArticleId, ArticleStats};
use std::collections::BTreeSet;
use std::future::Future;

/// A status tab with its count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusTab {
    pub filter: StatusFilter,
    pub label: &'static str,
    pub count: u64,
}

pub fn status_label(filter: StatusFilter) -> &'static str {
    match filter {
        StatusFilter::All => "全部",
        StatusFilter::Unread => "未读",
        StatusFilter::Read => "已读",
        StatusFilter::Processed => "已处理",
    }
}

pub fn status_tabs(stats: &ArticleStats) -> [StatusTab; 4] {
    StatusFilter::ALL.map(|filter| StatusTab {
        filter,
        label: status_label(filter),
        count: match filter {
            StatusFilter::All => stats.total,
            StatusFilter::Unread => stats.unread,
            StatusFilter::Read => stats.read(),
            StatusFilter::Processed => stats.processed,
        },
    })
}

/// Case-insensitive substring match over the searchable text fields. An
/// empty query matches everything.
pub fn matches_search(article: &Article, query: &str) -> bool {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    let hit = |field: Option<&str>| field.is_some_and(|f| f.to_lowercase().contains(&needle));
    hit(Some(&article.title))
        || hit(article.content.as_deref())
        || hit(article.feed_name.as_deref())
        || hit(article.summary.as_deref())
        || hit(article.keywords.as_deref())
}

pub fn filter_articles<'a>(articles: &'a [Article], query: &str) -> Vec<&'a Article> {
    articles.iter().filter(|a| matches_search(a, query)).collect()
}

/// A short page is the last page.
pub fn has_next_page(rows_on_page: usize, page_size: u32) -> bool {
    page_size > 0 && rows_on_page == page_size as usize
}

/// "显示第 X 到 Y 条，共 Z 条" for the current page.
pub fn range_label(page: u32, page_size: u32, total: u64) -> String {
    let start = (u64::from(page.max(1)) - 1) * u64::from(page_size) + 1;
    let end = (u64::from(page.max(1)) * u64::from(page_size)).min(total);
    format!("显示第 {} 到 {} 条，共 {} 条", start.min(total), end, total)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct TemplateChoice {
    index: usize,
    custom: Option<String>,
}

pub struct ExcerptsController {
    ctx: ClientContext,
    scope: ListScope,
    params: ArticleListParams,
    search: String,
    selected: BTreeSet<ArticleId>,
    cursor: usize,
    template: TemplateChoice,
    list: Option<Subscription<Vec<Article>>>,
    stats: Option<Subscription<ArticleStats>>,
    mark_read: Mutation<ArticleId, Article>,
    mark_unread: Mutation<ArticleId, Article>,
}

impl std::fmt::Debug for ExcerptsController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExcerptsController")
            .field("scope", &self.scope)
            .field("params", &self.params)
            .field("search", &self.search)
            .field("selected", &self.selected)
            .field("mounted", &self.is_mounted())
            .finish()
    }
}

impl ExcerptsController {
    pub fn new(ctx: ClientContext, scope: ListScope, page_size: u32) -> Self {
        let mark_read = read_state_mutation(&ctx, "mark_read", true);
        let mark_unread = read_state_mutation(&ctx, "mark_unread", false);
        Self {
            ctx,
            scope,
            params: queries::default_params(page_size.max(1)),
            search: String::new(),
            selected: BTreeSet::new(),
            cursor: 0,
            template: TemplateChoice::default(),
            list: None,
            stats: None,
            mark_read,
            mark_unread,
        }
    }

    pub fn excerpts(ctx: ClientContext, page_size: u32) -> Self {
        Self::new(ctx, ListScope::Excerpts, page_size)
    }

    pub fn articles(ctx: ClientContext, page_size: u32) -> Self {
        Self::new(ctx, ListScope::Articles, page_size)
    }

    pub fn scope(&self) -> ListScope {
        self.scope
    }

    pub fn params(&self) -> ArticleListParams {
        self.params
    }

    pub fn page(&self) -> u32 {
        self.params.page
    }

    pub fn page_size(&self) -> u32 {
        self.params.page_size
    }

    pub fn status(&self) -> StatusFilter {
        self.params.status
    }

    /// Key of the listing currently shown.
    pub fn list_key(&self) -> QueryKey {
        queries::list_key(self.scope, &self.params)
    }

    // ------------------------------------------------------------------------
    // Key-changing state
    // ------------------------------------------------------------------------

    /// Go to `page`, clamped to at least 1.
    pub fn set_page(&mut self, page: u32) {
        let page = page.max(1);
        if page == self.params.page {
            return;
        }
        self.params.page = page;
        self.key_changed();
    }

    pub fn next_page(&mut self) -> bool {
        if !self.has_next_page() {
            return false;
        }
        self.set_page(self.params.page.saturating_add(1));
        true
    }

    pub fn prev_page(&mut self) -> bool {
        if self.params.page <= 1 {
            return false;
        }
        self.set_page(self.params.page - 1);
        true
    }

    /// Switch the status filter. Returns to the first page.
    pub fn set_status(&mut self, status: StatusFilter) {
        if status == self.params.status {
            return;
        }
        self.params.status = status;
        self.params.page = 1;
        self.key_changed();
    }

    pub fn cycle_status(&mut self) {
        self.set_status(self.params.status.next());
    }

    fn key_changed(&mut self) {
        self.selected.clear();
        self.cursor = 0;
        if self.is_mounted() {
            // Replacing drops the old subscription after the new one is taken,
            // so a shared entry is never released in between.
            self.list = Some(self.subscribe_list());
        }
    }

    fn subscribe_list(&self) -> Subscription<Vec<Article>> {
        self.ctx
            .cache
            .subscribe(&queries::article_list(&self.ctx.api, self.scope, self.params))
    }

    // ------------------------------------------------------------------------
    // Local state
    // ------------------------------------------------------------------------

    pub fn search(&self) -> &str {
        &self.search
    }

    /// Update the search text. Never touches the cache.
    pub fn set_search(&mut self, query: impl Into<String>) {
        self.search = query.into();
        self.clamp_cursor();
    }

    pub fn list_snapshot(&self) -> QuerySnapshot<Vec<Article>> {
        match &self.list {
            Some(sub) => sub.snapshot(),
            None => self.ctx.cache.snapshot(&self.list_key()),
        }
    }

    pub fn stats_snapshot(&self) -> QuerySnapshot<ArticleStats> {
        match &self.stats {
            Some(sub) => sub.snapshot(),
            None => self.ctx.cache.snapshot(&QueryKey::new(self.scope.stats_name())),
        }
    }

    /// Rows on the current page after the local search filter.
    pub fn visible_rows(&self) -> Vec<Article> {
        self.list_snapshot()
            .data
            .map(|rows| filter_articles(&rows, &self.search).into_iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Rows the server returned for this page, ignoring search.
    pub fn page_len(&self) -> usize {
        self.list_snapshot().data.map(|rows| rows.len()).unwrap_or(0)
    }

    pub fn has_next_page(&self) -> bool {
        has_next_page(self.page_len(), self.params.page_size)
    }

    pub fn has_prev_page(&self) -> bool {
        self.params.page > 1
    }

    pub fn status_tabs(&self) -> [StatusTab; 4] {
        let stats = self.stats_snapshot().data.map(|s| *s).unwrap_or_default();
        status_tabs(&stats)
    }

    pub fn range_label(&self) -> String {
        let total = self.stats_snapshot().data.map(|s| s.total).unwrap_or(0);
        range_label(self.params.page, self.params.page_size, total)
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn move_cursor(&mut self, delta: isize) {
        let len = self.visible_rows().len();
        if len == 0 {
            self.cursor = 0;
            return;
        }
        let next = self.cursor as isize + delta;
        self.cursor = next.clamp(0, len as isize - 1) as usize;
    }

    fn clamp_cursor(&mut self) {
        let len = self.visible_rows().len();
        self.cursor = self.cursor.min(len.saturating_sub(1));
    }

    pub fn current_row(&self) -> Option<Article> {
        self.visible_rows().into_iter().nth(self.cursor)
    }

    pub fn selected(&self) -> &BTreeSet<ArticleId> {
        &self.selected
    }

    pub fn is_selected(&self, id: ArticleId) -> bool {
        self.selected.contains(&id)
    }

    pub fn toggle_selected(&mut self, id: ArticleId) {
        if !self.selected.remove(&id) {
            self.selected.insert(id);
        }
    }

    /// Select every visible row, or clear the selection if every visible row
    /// is already selected.
    pub fn toggle_select_all(&mut self) {
        let visible: BTreeSet<ArticleId> = self.visible_rows().iter().map(|a| a.id).collect();
        if !visible.is_empty() && visible == self.selected {
            self.selected.clear();
        } else {
            self.selected = visible;
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    // ------------------------------------------------------------------------
    // Templates
    // ------------------------------------------------------------------------

    pub fn templates(&self) -> &'static [DocTemplate] {
        &DEFAULT_TEMPLATES
    }

    pub fn active_template(&self) -> &'static DocTemplate {
        &DEFAULT_TEMPLATES[self.template.index % DEFAULT_TEMPLATES.len()]
    }

    pub fn select_template(&mut self, id: &str) -> bool {
        match DEFAULT_TEMPLATES.iter().position(|t| t.id == id) {
            Some(index) => {
                self.template = TemplateChoice {
                    index,
                    custom: None,
                };
                true
            }
            None => false,
        }
    }

    pub fn cycle_template(&mut self) {
        let index = (self.template.index + 1) % DEFAULT_TEMPLATES.len();
        self.template = TemplateChoice {
            index,
            custom: None,
        };
    }

    /// Replace the editable body. An empty body falls back to the active
    /// template.
    pub fn set_custom_template(&mut self, body: impl Into<String>) {
        let body = body.into();
        self.template.custom = if body.trim().is_empty() { None } else { Some(body) };
    }

    pub fn template_body(&self) -> &str {
        self.template
            .custom
            .as_deref()
            .unwrap_or(self.active_template().body)
    }

    pub fn render_current(&self) -> Option<(Article, String)> {
        let article = self.current_row()?;
        let doc = template::render(self.template_body(), &article);
        Some((article, doc))
    }

    // ------------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------------

    pub fn mark_read(
        &self,
        id: ArticleId,
    ) -> impl Future<Output = Result<Article, ApiClientError>> + Send + 'static {
        let coordinator = self.ctx.mutations.clone();
        let mutation = self.mark_read.clone();
        async move { coordinator.run(&mutation, id).await }
    }

    pub fn mark_unread(
        &self,
        id: ArticleId,
    ) -> impl Future<Output = Result<Article, ApiClientError>> + Send + 'static {
        let coordinator = self.ctx.mutations.clone();
        let mutation = self.mark_unread.clone();
        async move { coordinator.run(&mutation, id).await }
    }

    /// Flip the read state of `article` as currently shown.
    pub fn toggle_read(
        &self,
        article: &Article,
    ) -> impl Future<Output = Result<Article, ApiClientError>> + Send + 'static {
        let coordinator = self.ctx.mutations.clone();
        let mutation = if article.read_status {
            self.mark_unread.clone()
        } else {
            self.mark_read.clone()
        };
        let id = article.id;
        async move { coordinator.run(&mutation, id).await }
    }

    /// Mark every selected row read, one request per row. Stops at the first
    /// failure.
    pub fn mark_selected_read(
        &self,
    ) -> impl Future<Output = Result<usize, ApiClientError>> + Send + 'static {
        let coordinator = self.ctx.mutations.clone();
        let mutation = self.mark_read.clone();
        let ids: Vec<ArticleId> = self.selected.iter().copied().collect();
        async move {
            for id in &ids {
                coordinator.run(&mutation, *id).await?;
            }
            Ok(ids.len())
        }
    }

    pub fn is_mutating(&self) -> bool {
        self.mark_read.is_pending() || self.mark_unread.is_pending()
    }

    pub fn list_subscription_mut(&mut self) -> Option<&mut Subscription<Vec<Article>>> {
        self.list.as_mut()
    }
}

fn read_state_mutation(ctx: &ClientContext, name: &'static str, read: bool) -> Mutation<ArticleId, Article> {
    let api = ctx.api.clone();
    let mutation = Mutation::new(name, move |id: ArticleId| {
        let api = api.clone();
        async move {
            if read {
                api.mark_read(id).await
            } else {
                api.mark_unread(id).await
            }
        }
    });
    queries::read_state_prefixes()
        .into_iter()
        .fold(mutation, Mutation::invalidates)
}

impl PageController for ExcerptsController {
    fn mount(&mut self) {
        if self.list.is_none() {
            self.list = Some(self.subscribe_list());
        }
        if self.stats.is_none() {
            self.stats = Some(
                self.ctx
                    .cache
                    .subscribe(&queries::article_stats(&self.ctx.api, self.scope)),
            );
        }
    }

    fn unmount(&mut self) {
        self.list = None;
        self.stats = None;
    }

    fn is_mounted(&self) -> bool {
        self.list.is_some()
    }

    fn refresh(&self) -> usize {
        self.ctx.cache.invalidate(&QueryKey::new(self.scope.list_name()))
            + self.ctx.cache.invalidate(&QueryKey::new(self.scope.stats_name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;

    fn article(id: ArticleId, title: &str) -> Article {
        Article {
            id,
            feed_id: None,
            title: title.into(),
            content: None,
            summary: None,
            feed_name: None,
            url: format!("https://example.com/{id}"),
            published_at: None,
            created_at: Utc::now(),
            updated_at: None,
            read_status: false,
            processed_status: false,
            keywords: None,
            sentiment: None,
            key_points: None,
            business_insights: None,
            technical_points: None,
            action_items: None,
        }
    }

    #[test]
    fn search_is_case_insensitive_across_fields() {
        let mut a = article(1, "Async Rust");
        a.keywords = Some("tokio, Futures".into());
        let mut b = article(2, "Cooking");
        b.feed_name = Some("RUST Weekly".into());
        let c = article(3, "Gardening");
        let rows = vec![a, b, c];

        let hits: Vec<ArticleId> = filter_articles(&rows, "rust").iter().map(|a| a.id).collect();
        assert_eq!(hits, vec![1, 2]);
        let hits: Vec<ArticleId> = filter_articles(&rows, "FUTURES").iter().map(|a| a.id).collect();
        assert_eq!(hits, vec![1]);
        assert_eq!(filter_articles(&rows, "  ").len(), 3);
    }

    #[test]
    fn short_page_is_last_page() {
        assert!(has_next_page(20, 20));
        assert!(!has_next_page(19, 20));
        assert!(!has_next_page(0, 20));
        assert!(!has_next_page(0, 0));
    }

    #[test]
    fn range_label_clamps_to_total() {
        assert_eq!(range_label(1, 20, 45), "显示第 1 到 20 条，共 45 条");
        assert_eq!(range_label(3, 20, 45), "显示第 41 到 45 条，共 45 条");
        assert_eq!(range_label(1, 20, 0), "显示第 0 到 0 条，共 0 条");
    }

    #[test]
    fn status_tabs_derive_read_count() {
        let tabs = status_tabs(&ArticleStats {
            total: 10,
            unread: 4,
            processed: 2,
        });
        let counts: Vec<u64> = tabs.iter().map(|t| t.count).collect();
        assert_eq!(counts, vec![10, 4, 6, 2]);
        assert_eq!(tabs[2].label, "已读");
    }

    proptest! {
        #[test]
        fn empty_query_keeps_every_row(titles in prop::collection::vec("[A-Za-z ]{0,12}", 0..8)) {
            let rows: Vec<Article> = titles.iter().enumerate().map(|(i, t)| article(i as i64, t)).collect();
            prop_assert_eq!(filter_articles(&rows, "").len(), rows.len());
        }

        #[test]
        fn search_result_is_subset_in_order(
            titles in prop::collection::vec("[A-Za-z]{0,8}", 0..8),
            query in "[a-zA-Z]{0,3}",
        ) {
            let rows: Vec<Article> = titles.iter().enumerate().map(|(i, t)| article(i as i64, t)).collect();
            let hits: Vec<i64> = filter_articles(&rows, &query).iter().map(|a| a.id).collect();
            let mut sorted = hits.clone();
            sorted.sort_unstable();
            prop_assert_eq!(&hits, &sorted);
            for id in hits {
                let title = &rows[id as usize].title;
                prop_assert!(title.to_lowercase().contains(&query.to_lowercase()));
            }
        }

        #[test]
        fn next_page_only_for_full_pages(len in 0usize..50, size in 1u32..30) {
            prop_assert_eq!(has_next_page(len, size), len == size as usize);
        }
    }
}
