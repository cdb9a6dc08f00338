//! Query descriptors and key prefixes for every read the console performs.
//!
//! Keys built here are the only ones the controllers use, so mutations can
//! name the prefixes they invalidate without knowing which pages are mounted.

use crate::api_client::{ArticleListParams, RestClient, StatusFilter};
use crate::query::{QueryDescriptor, QueryKey};
use crate::query_key;
use crate::types::{Article, ArticleStats, Feed, Health, SystemConfig, SystemLogs, SystemStats, Trends};
use std::time::Duration;

pub const HEALTH: &str = "health";
pub const STATS: &str = "stats";
pub const TRENDS: &str = "trends";
pub const CONFIG: &str = "config";
pub const LOGS: &str = "logs";
pub const FEEDS: &str = "feeds";
pub const EXCERPTS: &str = "excerpts";
pub const EXCERPT_STATS: &str = "excerpt-stats";
pub const ARTICLES: &str = "articles";
pub const ARTICLE_STATS: &str = "article-stats";

/// Header indicator poll.
pub const GLOBAL_HEALTH_POLL: Duration = Duration::from_secs(30);
/// System page poll.
pub const SYSTEM_HEALTH_POLL: Duration = Duration::from_secs(10);

/// Which listing a paginated article view reads from. Both hit
/// `GET /articles`; they are cached under separate names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListScope {
    Excerpts,
    Articles,
}

impl ListScope {
    pub fn list_name(&self) -> &'static str {
        match self {
            ListScope::Excerpts => EXCERPTS,
            ListScope::Articles => ARTICLES,
        }
    }

    pub fn stats_name(&self) -> &'static str {
        match self {
            ListScope::Excerpts => EXCERPT_STATS,
            ListScope::Articles => ARTICLE_STATS,
        }
    }
}

/// Prefixes touched by a read-state change.
pub fn read_state_prefixes() -> Vec<QueryKey> {
    vec![
        QueryKey::new(EXCERPTS),
        QueryKey::new(ARTICLES),
        QueryKey::new(EXCERPT_STATS),
        QueryKey::new(ARTICLE_STATS),
    ]
}

pub fn list_key(scope: ListScope, params: &ArticleListParams) -> QueryKey {
    query_key![scope.list_name(), params.page, params.status.as_str()]
}

pub fn health(api: &RestClient, poll: Duration) -> QueryDescriptor<Health> {
    let api = api.clone();
    QueryDescriptor::new(QueryKey::new(HEALTH), move || {
        let api = api.clone();
        async move { api.health().await }
    })
    .poll_every(poll)
}

pub fn stats(api: &RestClient) -> QueryDescriptor<SystemStats> {
    let api = api.clone();
    QueryDescriptor::new(QueryKey::new(STATS), move || {
        let api = api.clone();
        async move { api.system_stats().await }
    })
}

pub fn trends(api: &RestClient) -> QueryDescriptor<Trends> {
    let api = api.clone();
    QueryDescriptor::new(QueryKey::new(TRENDS), move || {
        let api = api.clone();
        async move { api.system_trends().await }
    })
}

pub fn config(api: &RestClient) -> QueryDescriptor<SystemConfig> {
    let api = api.clone();
    QueryDescriptor::new(QueryKey::new(CONFIG), move || {
        let api = api.clone();
        async move { api.system_config().await }
    })
}

pub fn logs(api: &RestClient) -> QueryDescriptor<SystemLogs> {
    let api = api.clone();
    QueryDescriptor::new(QueryKey::new(LOGS), move || {
        let api = api.clone();
        async move { api.system_logs().await }
    })
}

pub fn feeds(api: &RestClient) -> QueryDescriptor<Vec<Feed>> {
    let api = api.clone();
    QueryDescriptor::new(QueryKey::new(FEEDS), move || {
        let api = api.clone();
        async move { api.list_feeds().await }
    })
}

pub fn article_list(
    api: &RestClient,
    scope: ListScope,
    params: ArticleListParams,
) -> QueryDescriptor<Vec<Article>> {
    let api = api.clone();
    QueryDescriptor::new(list_key(scope, &params), move || {
        let api = api.clone();
        async move { api.list_articles(&params).await }
    })
}

pub fn article_stats(api: &RestClient, scope: ListScope) -> QueryDescriptor<ArticleStats> {
    let api = api.clone();
    QueryDescriptor::new(QueryKey::new(scope.stats_name()), move || {
        let api = api.clone();
        async move { api.article_stats().await }
    })
}

pub fn default_params(page_size: u32) -> ArticleListParams {
    ArticleListParams {
        page: 1,
        page_size,
        status: StatusFilter::All,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_keys_carry_page_and_status() {
        let params = ArticleListParams {
            page: 2,
            page_size: 20,
            status: StatusFilter::Unread,
        };
        assert_eq!(
            list_key(ListScope::Excerpts, &params),
            query_key!["excerpts", 2, "unread"]
        );
        assert_eq!(
            list_key(ListScope::Articles, &default_params(20)),
            query_key!["articles", 1, "all"]
        );
    }

    #[test]
    fn read_state_prefixes_cover_both_scopes() {
        let prefixes = read_state_prefixes();
        for scope in [ListScope::Excerpts, ListScope::Articles] {
            let key = list_key(scope, &default_params(10));
            assert!(prefixes.iter().any(|p| key.starts_with(p)));
            let stats = QueryKey::new(scope.stats_name());
            assert!(prefixes.iter().any(|p| stats.starts_with(p)));
        }
    }
}
