//! End-to-end synchronization: controllers, cache and mutations against a
//! mock API.

use castmind_client::api_client::StatusFilter;
use castmind_client::controllers::{
    DashboardController, ExcerptsController, FeedsController, PageController, SystemController,
};
use castmind_client::queries;
use castmind_client::query_key;
use castmind_client::QueryKey;
use castmind_test_utils::fixtures;
use castmind_test_utils::server::{api_path, context, mount_json, mount_status};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_article_stats(server: &MockServer, total: u64, unread: u64) {
    mount_json(
        server,
        "GET",
        "/articles/stats/summary",
        fixtures::to_json(&fixtures::article_stats(total, unread)),
    )
    .await;
}

#[tokio::test]
async fn mark_read_refreshes_the_visible_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(api_path("/articles")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            fixtures::article_json(7, false),
            fixtures::article_json(8, false)
        ])))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(api_path("/articles")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            fixtures::article_json(7, true),
            fixtures::article_json(8, false)
        ])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(api_path("/articles/7/mark-read")))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixtures::article_json(7, true)))
        .expect(1)
        .mount(&server)
        .await;
    mount_article_stats(&server, 2, 2).await;

    let ctx = context(&server).expect("context");
    let mut excerpts = ExcerptsController::excerpts(ctx.clone(), 20);
    excerpts.mount();
    assert_eq!(excerpts.list_key(), query_key!["excerpts", 1, "all"]);

    let before = excerpts
        .list_subscription_mut()
        .expect("mounted")
        .settled()
        .await;
    let row = before.data.as_ref().and_then(|rows| rows.iter().find(|a| a.id == 7).cloned());
    assert_eq!(row.map(|a| a.read_status), Some(false));

    excerpts.mark_read(7).await.expect("mark read");

    let after = excerpts.visible_rows();
    let row = after.iter().find(|a| a.id == 7).expect("row 7");
    assert!(row.read_status);
}

#[tokio::test]
async fn same_tick_subscribers_share_one_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(api_path("/feeds")))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixtures::to_json(&fixtures::feeds(2))))
        .expect(1)
        .mount(&server)
        .await;

    let ctx = context(&server).expect("context");
    let mut a = ctx.cache.subscribe(&queries::feeds(&ctx.api));
    let _b = ctx.cache.subscribe(&queries::feeds(&ctx.api));
    let snapshot = a.settled().await;
    assert_eq!(snapshot.data.map(|f| f.len()), Some(2));
    assert_eq!(ctx.cache.entry_count(), 1);
}

#[tokio::test]
async fn search_never_reaches_the_server() {
    let server = MockServer::start().await;
    mount_json(
        &server,
        "GET",
        "/articles",
        fixtures::to_json(&fixtures::article_page(1, 3)),
    )
    .await;
    mount_article_stats(&server, 3, 3).await;

    let ctx = context(&server).expect("context");
    let mut excerpts = ExcerptsController::excerpts(ctx, 20);
    excerpts.mount();
    excerpts.list_subscription_mut().expect("mounted").settled().await;

    for query in ["e", "ep", "EPISODE 2", "episode 2"] {
        excerpts.set_search(query);
    }
    let rows = excerpts.visible_rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, 2);

    let listings = server
        .received_requests()
        .await
        .map(|requests| {
            requests
                .iter()
                .filter(|r| r.url.path() == api_path("/articles"))
                .count()
        })
        .unwrap_or(0);
    assert_eq!(listings, 1);
}

#[tokio::test]
async fn pagination_follows_page_fill() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(api_path("/articles")))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixtures::to_json(&fixtures::article_page(1, 2))))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(api_path("/articles")))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixtures::to_json(&fixtures::article_page(3, 1))))
        .mount(&server)
        .await;
    mount_article_stats(&server, 3, 1).await;

    let ctx = context(&server).expect("context");
    let mut articles = ExcerptsController::articles(ctx.clone(), 2);
    articles.mount();
    articles.list_subscription_mut().expect("mounted").settled().await;
    assert!(articles.has_next_page());
    assert!(!articles.has_prev_page());

    articles.toggle_select_all();
    assert_eq!(articles.selected().len(), 2);

    assert!(articles.next_page());
    assert_eq!(articles.list_key(), query_key!["articles", 2, "all"]);
    assert!(articles.selected().is_empty());
    articles.list_subscription_mut().expect("mounted").settled().await;
    assert!(!articles.has_next_page());
    assert!(!articles.next_page());

    articles.set_page(0);
    assert_eq!(articles.page(), 1);

    articles.set_page(2);
    articles.set_status(StatusFilter::Unread);
    assert_eq!(articles.page(), 1);
    assert_eq!(articles.list_key(), query_key!["articles", 1, "unread"]);
}

#[tokio::test]
async fn failed_mutation_leaves_cache_alone() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(api_path("/feeds")))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixtures::to_json(&fixtures::feeds(1))))
        .expect(1)
        .mount(&server)
        .await;
    mount_status(&server, "DELETE", "/feeds/1", 500).await;

    let ctx = context(&server).expect("context");
    let mut feeds = FeedsController::new(ctx.clone());
    feeds.mount();
    ctx.cache.subscribe(&queries::feeds(&ctx.api)).settled().await;

    let result = feeds.delete(1).await;
    assert_eq!(result.err().and_then(|e| e.status_code()), Some(500));
    assert!(!ctx.cache.is_fetching(&QueryKey::new(queries::FEEDS)));
    assert_eq!(feeds.rows().len(), 1);
}

#[tokio::test]
async fn invalid_feed_form_is_rejected_locally() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(api_path("/feeds")))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let ctx = context(&server).expect("context");
    let mut feeds = FeedsController::new(ctx);
    feeds.open_new_form();
    if let Some(form) = feeds.form_mut() {
        form.name = "Daily".into();
        form.url = "d.io/rss".into();
    }
    assert!(feeds.submit_form().is_err());
}

#[tokio::test]
async fn creating_a_feed_refreshes_list_and_stats() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(api_path("/feeds")))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixtures::to_json(&fixtures::feeds(1))))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(api_path("/system/stats")))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixtures::stats_json()))
        .expect(2)
        .mount(&server)
        .await;
    mount_json(&server, "GET", "/system/trends", json!({})).await;
    mount_json(&server, "GET", "/system/config", json!({})).await;
    mount_json(&server, "POST", "/feeds", fixtures::to_json(&fixtures::feed(2))).await;

    let ctx = context(&server).expect("context");
    let mut dashboard = DashboardController::new(ctx.clone());
    dashboard.mount();
    let mut feeds = FeedsController::new(ctx.clone());
    feeds.mount();
    let mut stats = ctx.cache.subscribe(&queries::stats(&ctx.api));
    let mut listed = ctx.cache.subscribe(&queries::feeds(&ctx.api));
    stats.settled().await;
    listed.settled().await;

    feeds.open_new_form();
    if let Some(form) = feeds.form_mut() {
        form.name = "Daily".into();
        form.url = "https://d.io/rss".into();
    }
    let created = feeds.submit_form().expect("valid form").await.expect("create");
    assert_eq!(created.id, 2);
    assert_eq!(dashboard.cards()[2].value, 30);
}

#[tokio::test]
async fn scheduler_buttons_follow_health() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(api_path("/system/health")))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixtures::to_json(&fixtures::health(false))))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    mount_json(&server, "GET", "/system/health", fixtures::to_json(&fixtures::health(true))).await;
    mount_json(&server, "GET", "/system/stats", fixtures::stats_json()).await;
    mount_json(&server, "GET", "/system/config", json!({})).await;
    mount_json(&server, "GET", "/system/logs", json!({"logs": [], "total": 0})).await;
    mount_json(&server, "POST", "/system/scheduler/start", fixtures::ack_json("started")).await;

    let ctx = context(&server).expect("context");
    let mut system = SystemController::new(ctx);
    system.mount();
    system.health_subscription_mut().expect("mounted").settled().await;
    assert!(system.can_start());
    assert!(!system.can_stop());

    system.start_scheduler().await.expect("start");
    assert!(system.scheduler_running());
    assert!(!system.can_start());
    assert!(system.can_stop());

    system.unmount();
    assert!(!system.is_mounted());
}
