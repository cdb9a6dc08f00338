//! REST client for the CastMind API.
//!
//! Every call is relative to `<api_base_url>/api/v1`. Responses are parsed
//! into the records in [`crate::types`]; the client never retries.

use crate::types::{
    ActionAck, Article, ArticleId, ArticleStats, Feed, FeedId, FeedUpdate, Health, NewFeed,
    SystemConfig, SystemLogs, SystemStats, Trends,
};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

pub const API_PREFIX: &str = "/api/v1";

#[derive(Debug, thiserror::Error)]
pub enum ApiClientError {
    /// No response was received (connect failure, timeout, broken body).
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),
    #[error("HTTP {code}: {body}")]
    Status { code: u16, body: String },
    /// Client-side validation failed, or a response did not match its record.
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Config error: {0}")]
    Config(String),
}

impl ApiClientError {
    /// HTTP status code, if the server answered at all.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiClientError::Status { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, ApiClientError::Network(_))
    }
}

impl From<reqwest::Error> for ApiClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err)
    }
}

impl From<serde_json::Error> for ApiClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Validation(err.to_string())
    }
}

pub type ApiResult<T> = Result<T, ApiClientError>;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub request_timeout: Duration,
    pub api_key: Option<String>,
    pub bearer_token: Option<String>,
}

impl ClientConfig {
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            request_timeout: Duration::from_secs(10),
            api_key: None,
            bearer_token: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Query parameters as `(name, value)` pairs; `None` values are dropped so an
/// unset filter never reaches the wire as a literal string.
pub type Params<'a> = [(&'a str, Option<String>)];

pub fn query_pairs(params: &Params<'_>) -> Vec<(String, String)> {
    params
        .iter()
        .filter_map(|(name, value)| value.as_ref().map(|v| (name.to_string(), v.clone())))
        .collect()
}

/// Status filter of the article listing. `All` sends no parameter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum StatusFilter {
    #[default]
    All,
    Unread,
    Read,
    Processed,
}

impl StatusFilter {
    pub const ALL: [StatusFilter; 4] = [
        StatusFilter::All,
        StatusFilter::Unread,
        StatusFilter::Read,
        StatusFilter::Processed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusFilter::All => "all",
            StatusFilter::Unread => "unread",
            StatusFilter::Read => "read",
            StatusFilter::Processed => "processed",
        }
    }

    pub fn as_param(&self) -> Option<String> {
        match self {
            StatusFilter::All => None,
            other => Some(other.as_str().to_string()),
        }
    }

    pub fn next(&self) -> StatusFilter {
        let idx = Self::ALL.iter().position(|s| s == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArticleListParams {
    pub page: u32,
    pub page_size: u32,
    pub status: StatusFilter,
}

impl ArticleListParams {
    pub fn to_params(&self) -> Vec<(&'static str, Option<String>)> {
        vec![
            ("page", Some(self.page.to_string())),
            ("page_size", Some(self.page_size.to_string())),
            ("status", self.status.as_param()),
        ]
    }
}

#[derive(Clone)]
pub struct RestClient {
    client: reqwest::Client,
    base_url: String,
    auth_header: HeaderMap,
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl RestClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiClientError> {
        if config.api_base_url.trim().is_empty() {
            return Err(ApiClientError::Config("api_base_url must not be empty".to_string()));
        }
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ApiClientError::Config(e.to_string()))?;

        let auth_header = build_auth_headers(config)?;
        Ok(Self {
            client,
            base_url: format!("{}{}", config.api_base_url.trim_end_matches('/'), API_PREFIX),
            auth_header,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ------------------------------------------------------------------------
    // System
    // ------------------------------------------------------------------------

    pub async fn health(&self) -> ApiResult<Health> {
        self.get_json("/system/health", &[]).await
    }

    pub async fn system_stats(&self) -> ApiResult<SystemStats> {
        self.get_json("/system/stats", &[]).await
    }

    pub async fn system_trends(&self) -> ApiResult<Trends> {
        self.get_json("/system/trends", &[]).await
    }

    pub async fn system_config(&self) -> ApiResult<SystemConfig> {
        self.get_json("/system/config", &[]).await
    }

    pub async fn system_logs(&self) -> ApiResult<SystemLogs> {
        self.get_json("/system/logs", &[]).await
    }

    pub async fn start_scheduler(&self) -> ApiResult<ActionAck> {
        self.post_empty("/system/scheduler/start").await
    }

    pub async fn stop_scheduler(&self) -> ApiResult<ActionAck> {
        self.post_empty("/system/scheduler/stop").await
    }

    pub async fn process_all(&self) -> ApiResult<ActionAck> {
        self.post_empty("/system/process/all").await
    }

    // ------------------------------------------------------------------------
    // Feeds
    // ------------------------------------------------------------------------

    pub async fn list_feeds(&self) -> ApiResult<Vec<Feed>> {
        self.get_json("/feeds", &[]).await
    }

    pub async fn create_feed(&self, feed: &NewFeed) -> ApiResult<Feed> {
        self.request(Method::POST, "/feeds", &[], Some(feed)).await
    }

    pub async fn update_feed(&self, id: FeedId, update: &FeedUpdate) -> ApiResult<Feed> {
        let path = format!("/feeds/{}", id);
        self.request(Method::PUT, &path, &[], Some(update)).await
    }

    pub async fn delete_feed(&self, id: FeedId) -> ApiResult<()> {
        let path = format!("/feeds/{}", id);
        self.send(Method::DELETE, &path, &[], None::<&()>).await?;
        Ok(())
    }

    pub async fn fetch_feed(&self, id: FeedId) -> ApiResult<Feed> {
        let path = format!("/feeds/{}/fetch", id);
        self.post_empty(&path).await
    }

    pub async fn fetch_all_feeds(&self) -> ApiResult<ActionAck> {
        self.post_empty("/feeds/fetch-all").await
    }

    // ------------------------------------------------------------------------
    // Articles
    // ------------------------------------------------------------------------

    pub async fn list_articles(&self, params: &ArticleListParams) -> ApiResult<Vec<Article>> {
        self.get_json("/articles", &params.to_params()).await
    }

    pub async fn article_stats(&self) -> ApiResult<ArticleStats> {
        self.get_json("/articles/stats/summary", &[]).await
    }

    pub async fn mark_read(&self, id: ArticleId) -> ApiResult<Article> {
        let path = format!("/articles/{}/mark-read", id);
        self.post_empty(&path).await
    }

    pub async fn mark_unread(&self, id: ArticleId) -> ApiResult<Article> {
        let path = format!("/articles/{}/mark-unread", id);
        self.post_empty(&path).await
    }

    // ------------------------------------------------------------------------
    // Transport
    // ------------------------------------------------------------------------

    /// Issue a request and parse the JSON body into `T`.
    pub async fn request<T, B>(
        &self,
        method: Method,
        path: &str,
        params: &Params<'_>,
        body: Option<&B>,
    ) -> ApiResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let text = self.send(method, path, params, body).await?;
        let parsed = serde_json::from_str::<T>(&text).map_err(|err| {
            ApiClientError::Validation(format!("{}: {}", path, err))
        })?;
        Ok(parsed)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, params: &Params<'_>) -> ApiResult<T> {
        self.request(Method::GET, path, params, None::<&()>).await
    }

    async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.request(Method::POST, path, &[], None::<&()>).await
    }

    async fn send<B>(
        &self,
        method: Method,
        path: &str,
        params: &Params<'_>,
        body: Option<&B>,
    ) -> ApiResult<String>
    where
        B: Serialize + ?Sized,
    {
        let mut request = self
            .client
            .request(method.clone(), self.url(path))
            .headers(self.auth_header.clone());
        let pairs = query_pairs(params);
        if !pairs.is_empty() {
            request = request.query(&pairs);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            tracing::debug!(%method, path, code = status.as_u16(), "API request failed");
            return Err(ApiClientError::Status {
                code: status.as_u16(),
                body: text,
            });
        }
        Ok(text)
    }
}

fn build_auth_headers(config: &ClientConfig) -> Result<HeaderMap, ApiClientError> {
    let mut headers = HeaderMap::new();
    if let Some(api_key) = &config.api_key {
        headers.insert(
            HeaderName::from_static("x-api-key"),
            HeaderValue::from_str(api_key).map_err(|e| ApiClientError::Config(e.to_string()))?,
        );
    }
    if let Some(token) = &config.bearer_token {
        let value = format!("Bearer {}", token);
        headers.insert(
            HeaderName::from_static("authorization"),
            HeaderValue::from_str(&value).map_err(|e| ApiClientError::Config(e.to_string()))?,
        );
    }
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_filter_sends_no_status_param() {
        let params = ArticleListParams {
            page: 1,
            page_size: 20,
            status: StatusFilter::All,
        };
        let pairs = query_pairs(&params.to_params());
        assert_eq!(
            pairs,
            vec![
                ("page".to_string(), "1".to_string()),
                ("page_size".to_string(), "20".to_string()),
            ]
        );
        assert!(pairs.iter().all(|(_, v)| v != "all" && v != "undefined"));
    }

    #[test]
    fn concrete_filter_is_sent() {
        let params = ArticleListParams {
            page: 3,
            page_size: 20,
            status: StatusFilter::Unread,
        };
        let pairs = query_pairs(&params.to_params());
        assert!(pairs.contains(&("status".to_string(), "unread".to_string())));
    }

    #[test]
    fn base_url_gets_api_prefix_once() {
        let client = RestClient::new(&ClientConfig::new("http://localhost:8000/")).expect("client");
        assert_eq!(client.base_url(), "http://localhost:8000/api/v1");
        assert_eq!(client.url("/feeds"), "http://localhost:8000/api/v1/feeds");
    }

    #[test]
    fn empty_base_url_is_rejected() {
        let err = RestClient::new(&ClientConfig::new("  ")).expect_err("must fail");
        assert!(matches!(err, ApiClientError::Config(_)));
    }

    #[test]
    fn status_filter_cycles() {
        let mut filter = StatusFilter::All;
        for _ in 0..4 {
            filter = filter.next();
        }
        assert_eq!(filter, StatusFilter::All);
        assert_eq!(StatusFilter::All.next(), StatusFilter::Unread);
    }

    #[test]
    fn only_status_errors_carry_a_code() {
        let err = ApiClientError::Status {
            code: 404,
            body: "{}".to_string(),
        };
        assert_eq!(err.status_code(), Some(404));
        assert_eq!(ApiClientError::Validation("x".into()).status_code(), None);
    }
}
