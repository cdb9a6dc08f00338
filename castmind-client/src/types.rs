//! Typed records for every `/api/v1` endpoint the console consumes.
//!
//! Responses are parsed into these records at the API client boundary; a body
//! that does not match its record surfaces as `ApiClientError::Validation`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type FeedId = i64;
pub type ArticleId = i64;

// ============================================================================
// SYSTEM
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    #[serde(default)]
    pub app: Option<String>,
    pub version: String,
    pub database: String,
    #[serde(default)]
    pub ai_service: Option<String>,
    #[serde(default)]
    pub scheduler: Option<SchedulerInfo>,
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
}

impl Health {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }

    pub fn scheduler_running(&self) -> bool {
        self.scheduler
            .as_ref()
            .map(|s| s.status == "running")
            .unwrap_or(false)
    }

    pub fn database_connected(&self) -> bool {
        self.database == "connected"
    }

    pub fn ai_available(&self) -> bool {
        self.ai_service.as_deref() == Some("available")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerInfo {
    pub status: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemStats {
    #[serde(default)]
    pub feeds: FeedCounts,
    #[serde(default)]
    pub articles: ArticleCounts,
    #[serde(default)]
    pub system: ResourceUsage,
    #[serde(default)]
    pub tasks: TaskCounts,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedCounts {
    pub total: u64,
    pub active: u64,
    pub error: u64,
    pub paused: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArticleCounts {
    pub total: u64,
    pub unread: u64,
    pub read: u64,
    pub processed: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceUsage {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub disk_usage: f64,
    pub platform: Option<String>,
    pub python_version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskCounts {
    pub total: u64,
    pub running: u64,
    pub success_rate: f64,
}

/// Week-over-week movement shown on the dashboard cards. Every field is
/// optional: the endpoint is allowed to omit whatever it cannot compute.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Trends {
    pub feeds: Option<ChangeTrend>,
    pub articles: Option<WeeklyTrend>,
    pub unread_articles: Option<ChangeTrend>,
    pub tasks: Option<RateTrend>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChangeTrend {
    pub change: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeeklyTrend {
    pub weekly: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateTrend {
    pub success_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    pub app_name: String,
    pub app_version: String,
    pub host: String,
    pub port: u16,
    pub debug: bool,
    pub docs_enabled: bool,
    pub ai_service_enabled: bool,
    pub scheduler_enabled: bool,
    pub fetch_interval_minutes: u64,
    pub cleanup_days: u64,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            app_name: "CastMind".to_string(),
            app_version: "1.0.0".to_string(),
            host: "0.0.0.0".to_string(),
            port: 8000,
            debug: false,
            docs_enabled: false,
            ai_service_enabled: false,
            scheduler_enabled: false,
            fetch_interval_minutes: 10,
            cleanup_days: 30,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemLogs {
    #[serde(default)]
    pub logs: Vec<LogLine>,
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLine {
    pub timestamp: String,
    pub level: String,
    pub message: String,
}

/// Acknowledgement returned by the fire-and-forget system actions
/// (scheduler start/stop, process-all, fetch-all).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionAck {
    pub status: Option<String>,
    pub message: Option<String>,
    pub timestamp: Option<String>,
}

// ============================================================================
// FEEDS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedStatus {
    Active,
    Paused,
    Error,
    #[serde(other)]
    Unknown,
}

impl FeedStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedStatus::Active => "active",
            FeedStatus::Paused => "paused",
            FeedStatus::Error => "error",
            FeedStatus::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for FeedStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feed {
    pub id: FeedId,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub category: Option<String>,
    pub status: FeedStatus,
    #[serde(default, with = "timestamp::option")]
    pub last_fetch: Option<DateTime<Utc>>,
    #[serde(default)]
    pub article_count: u64,
    #[serde(default)]
    pub interval: Option<u64>,
    #[serde(default)]
    pub feed_type: Option<String>,
}

/// Body of `POST /feeds`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFeed {
    pub name: String,
    pub url: String,
    pub category: String,
    pub interval: u64,
}

/// Body of `PUT /feeds/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedUpdate {
    pub name: String,
    pub url: String,
    pub category: String,
    pub interval: u64,
    pub status: FeedStatus,
}

impl FeedUpdate {
    pub fn from_feed(feed: &Feed) -> Self {
        Self {
            name: feed.name.clone(),
            url: feed.url.clone(),
            category: feed.category.clone().unwrap_or_default(),
            interval: feed.interval.unwrap_or(3600),
            status: feed.status,
        }
    }
}

// ============================================================================
// ARTICLES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: ArticleId,
    #[serde(default)]
    pub feed_id: Option<FeedId>,
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub feed_name: Option<String>,
    pub url: String,
    #[serde(default, with = "timestamp::option")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "timestamp::option")]
    pub updated_at: Option<DateTime<Utc>>,
    pub read_status: bool,
    pub processed_status: bool,
    #[serde(default)]
    pub keywords: Option<String>,
    #[serde(default)]
    pub sentiment: Option<String>,
    #[serde(default)]
    pub key_points: Option<String>,
    #[serde(default)]
    pub business_insights: Option<String>,
    #[serde(default)]
    pub technical_points: Option<String>,
    #[serde(default)]
    pub action_items: Option<String>,
}

impl Article {
    /// First three comma-separated keywords, trimmed.
    pub fn keyword_tags(&self) -> Vec<&str> {
        self.keywords
            .as_deref()
            .map(|k| {
                k.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .take(3)
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleStats {
    pub total: u64,
    pub unread: u64,
    pub processed: u64,
}

impl ArticleStats {
    pub fn read(&self) -> u64 {
        self.total.saturating_sub(self.unread)
    }
}

// ============================================================================
// TIMESTAMPS
// ============================================================================

/// The API emits both RFC 3339 timestamps and naive ISO-8601 ones (no
/// offset); naive values are taken as UTC.
pub mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
            .ok()
            .map(|naive| naive.and_utc())
    }

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(dt) => serializer.serialize_str(&dt.to_rfc3339()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                None => Ok(None),
                Some(raw) if raw.trim().is_empty() => Ok(None),
                Some(raw) => super::parse(&raw)
                    .map(Some)
                    .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}"))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn naive_and_offset_timestamps_parse() {
        assert!(timestamp::parse("2024-05-01T10:20:30.123456").is_some());
        assert!(timestamp::parse("2024-05-01T10:20:30Z").is_some());
        assert!(timestamp::parse("2024-05-01 10:20:30").is_some());
        assert!(timestamp::parse("yesterday").is_none());
    }

    #[test]
    fn unknown_feed_status_is_tolerated() {
        let feed: Feed = serde_json::from_value(json!({
            "id": 1,
            "name": "Blog",
            "url": "https://example.com/rss",
            "category": "技术",
            "status": "archived",
            "last_fetch": null,
            "article_count": 3
        }))
        .expect("feed parses");
        assert_eq!(feed.status, FeedStatus::Unknown);
        assert!(feed.last_fetch.is_none());
    }

    #[test]
    fn article_requires_read_status() {
        let result = serde_json::from_value::<Article>(json!({
            "id": 1,
            "title": "t",
            "url": "https://example.com/a",
            "created_at": "2024-05-01T10:20:30",
            "processed_status": false
        }));
        assert!(result.is_err());
    }

    #[test]
    fn keyword_tags_keep_first_three() {
        let article: Article = serde_json::from_value(json!({
            "id": 1,
            "title": "t",
            "url": "https://example.com/a",
            "created_at": "2024-05-01T10:20:30",
            "read_status": false,
            "processed_status": false,
            "keywords": "rust, async ,, tokio, serde"
        }))
        .expect("article parses");
        assert_eq!(article.keyword_tags(), vec!["rust", "async", "tokio"]);
    }

    #[test]
    fn health_without_scheduler_is_not_running() {
        let health: Health = serde_json::from_value(json!({
            "status": "healthy",
            "app": "CastMind",
            "version": "1.0.0",
            "database": "connected",
            "timestamp": "2024-05-01T10:20:30.5"
        }))
        .expect("health parses");
        assert!(health.is_healthy());
        assert!(!health.scheduler_running());
        assert!(!health.ai_available());
    }

    #[test]
    fn read_count_never_underflows() {
        let stats = ArticleStats { total: 2, unread: 5, processed: 0 };
        assert_eq!(stats.read(), 0);
    }
}
