//! CastMind Test Utilities
//!
//! Shared test infrastructure for the CastMind workspace:
//! - Fixture builders for API records and their JSON bodies
//! - Proptest generators for records and filter state
//! - Mock API server helpers on top of wiremock
//! - Custom assertions for client errors

pub use castmind_client::types::{
    Article, ArticleId, ArticleStats, Feed, FeedId, FeedStatus, Health, SchedulerInfo,
    SystemStats,
};
pub use castmind_client::{ApiClientError, ClientConfig, ClientContext};

use chrono::{DateTime, TimeZone, Utc};

/// Fixed instant used by every fixture so JSON bodies are reproducible.
pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 8, 30, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built records for common testing scenarios.

    use super::*;
    use serde_json::{json, Value};

    /// An unread, unprocessed article with a title, summary and keywords.
    pub fn article(id: ArticleId) -> Article {
        Article {
            id,
            feed_id: Some(1),
            title: format!("Episode {id}"),
            content: Some(format!("Full transcript of episode {id}")),
            summary: Some(format!("Summary of episode {id}")),
            feed_name: Some("Tech Talk".to_string()),
            url: format!("https://podcasts.example.com/episodes/{id}"),
            published_at: Some(fixed_time()),
            created_at: fixed_time(),
            updated_at: None,
            read_status: false,
            processed_status: false,
            keywords: Some("rust, async, podcasts".to_string()),
            sentiment: Some("positive".to_string()),
            key_points: None,
            business_insights: None,
            technical_points: None,
            action_items: None,
        }
    }

    pub fn read_article(id: ArticleId) -> Article {
        Article {
            read_status: true,
            ..article(id)
        }
    }

    /// A page of `len` articles with consecutive ids starting at `first_id`.
    pub fn article_page(first_id: ArticleId, len: usize) -> Vec<Article> {
        (0..len as i64).map(|i| article(first_id + i)).collect()
    }

    pub fn feed(id: FeedId) -> Feed {
        Feed {
            id,
            name: format!("Feed {id}"),
            url: format!("https://feeds.example.com/{id}.xml"),
            category: Some("技术".to_string()),
            status: FeedStatus::Active,
            last_fetch: Some(fixed_time()),
            article_count: 12,
            interval: Some(3600),
            feed_type: Some("rss".to_string()),
        }
    }

    pub fn feeds(len: usize) -> Vec<Feed> {
        (1..=len as i64).map(feed).collect()
    }

    pub fn health(scheduler_running: bool) -> Health {
        Health {
            status: "healthy".to_string(),
            app: Some("CastMind".to_string()),
            version: "1.0.0".to_string(),
            database: "connected".to_string(),
            ai_service: Some("available".to_string()),
            scheduler: Some(SchedulerInfo {
                status: if scheduler_running { "running" } else { "stopped" }.to_string(),
            }),
            timestamp: fixed_time(),
        }
    }

    pub fn article_stats(total: u64, unread: u64) -> ArticleStats {
        ArticleStats {
            total,
            unread,
            processed: 0,
        }
    }

    pub fn to_json<T: serde::Serialize>(value: &T) -> Value {
        serde_json::to_value(value).unwrap_or(Value::Null)
    }

    pub fn article_json(id: ArticleId, read: bool) -> Value {
        let mut article = article(id);
        article.read_status = read;
        to_json(&article)
    }

    pub fn stats_json() -> Value {
        json!({
            "feeds": {"total": 4, "active": 3, "error": 1, "paused": 0},
            "articles": {"total": 120, "unread": 30, "read": 90, "processed": 50},
            "system": {
                "cpu_percent": 12.5,
                "memory_percent": 40.0,
                "disk_usage": 61.0,
                "platform": "Linux",
                "python_version": "3.11.4"
            },
            "tasks": {"total": 10, "running": 1, "success_rate": 95.0}
        })
    }

    pub fn ack_json(message: &str) -> Value {
        json!({
            "status": "success",
            "message": message,
            "timestamp": fixed_time().to_rfc3339(),
        })
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for records and filter state.

    use super::*;
    use castmind_client::api_client::StatusFilter;
    use proptest::prelude::*;

    pub fn arb_timestamp() -> impl Strategy<Value = DateTime<Utc>> {
        // 2020-01-01 .. 2030-01-01
        (1577836800i64..1893456000i64)
            .prop_map(|secs| DateTime::from_timestamp(secs, 0).unwrap_or_else(Utc::now))
    }

    pub fn arb_status_filter() -> impl Strategy<Value = StatusFilter> {
        prop::sample::select(StatusFilter::ALL.to_vec())
    }

    pub fn arb_feed_status() -> impl Strategy<Value = FeedStatus> {
        prop_oneof![
            Just(FeedStatus::Active),
            Just(FeedStatus::Paused),
            Just(FeedStatus::Error),
        ]
    }

    pub fn arb_article() -> impl Strategy<Value = Article> {
        (
            1i64..100_000,
            "[A-Za-z0-9 ]{1,40}",
            proptest::option::of("[A-Za-z ]{0,80}"),
            proptest::option::of("[A-Za-z ]{1,20}"),
            proptest::option::of("[a-z]{1,8}(, [a-z]{1,8}){0,4}"),
            any::<bool>(),
            any::<bool>(),
            arb_timestamp(),
        )
            .prop_map(
                |(id, title, content, feed_name, keywords, read, processed, created_at)| Article {
                    id,
                    feed_id: None,
                    title,
                    content,
                    summary: None,
                    feed_name,
                    url: format!("https://example.com/{id}"),
                    published_at: None,
                    created_at,
                    updated_at: None,
                    read_status: read,
                    processed_status: processed,
                    keywords,
                    sentiment: None,
                    key_points: None,
                    business_insights: None,
                    technical_points: None,
                    action_items: None,
                },
            )
    }

    pub fn arb_feed() -> impl Strategy<Value = Feed> {
        (
            1i64..10_000,
            "[A-Za-z ]{1,30}",
            arb_feed_status(),
            (1u64..48).prop_map(|n| n * 300),
            0u64..10_000,
        )
            .prop_map(|(id, name, status, interval, article_count)| Feed {
                id,
                name,
                url: format!("https://feeds.example.com/{id}.xml"),
                category: Some("技术".to_string()),
                status,
                last_fetch: None,
                article_count,
                interval: Some(interval),
                feed_type: None,
            })
    }

    pub fn arb_article_stats() -> impl Strategy<Value = ArticleStats> {
        (0u64..10_000)
            .prop_flat_map(|total| (Just(total), 0..=total, 0..=total))
            .prop_map(|(total, unread, processed)| ArticleStats {
                total,
                unread,
                processed,
            })
    }
}

// ============================================================================
// MOCK API SERVER
// ============================================================================

pub mod server {
    //! Helpers for standing up a mock CastMind API with wiremock.

    use super::*;
    use serde_json::Value;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub const PREFIX: &str = "/api/v1";

    pub fn api_path(suffix: &str) -> String {
        format!("{PREFIX}{suffix}")
    }

    pub fn client_config(server: &MockServer) -> ClientConfig {
        ClientConfig::new(server.uri()).with_timeout(Duration::from_secs(5))
    }

    pub fn context(server: &MockServer) -> Result<ClientContext, ApiClientError> {
        ClientContext::new(&client_config(server))
    }

    /// Answer `verb suffix` with `body` and status 200.
    pub async fn mount_json(server: &MockServer, verb: &str, suffix: &str, body: Value) {
        Mock::given(method(verb))
            .and(path(api_path(suffix)))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    /// Answer `verb suffix` with an error status.
    pub async fn mount_status(server: &MockServer, verb: &str, suffix: &str, code: u16) {
        Mock::given(method(verb))
            .and(path(api_path(suffix)))
            .respond_with(ResponseTemplate::new(code).set_body_string("error"))
            .mount(server)
            .await;
    }
}

// ============================================================================
// ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions on client results.

    use super::*;

    #[track_caller]
    pub fn assert_status<T: std::fmt::Debug>(result: &Result<T, ApiClientError>, code: u16) {
        match result {
            Err(ApiClientError::Status { code: got, .. }) if *got == code => {}
            other => panic!("Expected HTTP {code}, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_validation<T: std::fmt::Debug>(result: &Result<T, ApiClientError>) {
        match result {
            Err(ApiClientError::Validation(_)) => {}
            other => panic!("Expected Validation error, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_network<T: std::fmt::Debug>(result: &Result<T, ApiClientError>) {
        match result {
            Err(ApiClientError::Network(_)) => {}
            other => panic!("Expected Network error, got: {:?}", other),
        }
    }
}
