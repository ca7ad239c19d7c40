mod helpers;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
    response::Response,
};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::{MockServer, ResponseTemplate};

use carwatch::{
    api,
    entities::Listing,
    orchestrator::ListingStore,
    repositories::{MemoryStore, StoreError},
};
use helpers::{
    StubNotifier, block, html, mount_page, page_body, post_link, test_app, test_state,
    test_state_with_store,
};

struct UnavailableStore;

#[async_trait]
impl ListingStore for UnavailableStore {
    async fn save(&self, _listings: &[Listing]) -> Result<Vec<Listing>, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
}

async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn get(app: Router, uri: &str) -> Response {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn post_json(app: Router, uri: &str, body: Value) -> Response {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn test_scrape_reports_new_posts() {
    let site = MockServer::start().await;
    mount_page(&site, 1, html(page_body(&[block(123, "foo-bar")]))).await;
    let store = Arc::new(MemoryStore::new());
    let app = test_app(&site, store.clone(), Arc::new(StubNotifier::default()));

    let response = get(app.clone(), "/api/scrape?page=1").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({"message": "Successfully processed page 1.", "new_posts": 1})
    );

    let response = get(app, "/api/scrape?page=1").await;
    assert_eq!(json_body(response).await["new_posts"], 0);
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_scrape_empty_page() {
    let site = MockServer::start().await;
    mount_page(&site, 1, html(String::new())).await;
    let app = test_app(&site, Arc::new(MemoryStore::new()), Arc::new(StubNotifier::default()));

    let response = get(app, "/api/scrape?page=1").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["new_posts"], 0);
}

#[tokio::test]
async fn test_scrape_fetch_failure_is_500_with_detail() {
    let site = MockServer::start().await;
    mount_page(&site, 1, ResponseTemplate::new(503)).await;
    let store = Arc::new(MemoryStore::new());
    let app = test_app(&site, store.clone(), Arc::new(StubNotifier::default()));

    let response = get(app, "/api/scrape?page=1").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = json_body(response).await;
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.contains("fetch"));
    assert!(detail.contains("503"));
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_scrape_store_failure_is_500_with_detail() {
    let site = MockServer::start().await;
    mount_page(&site, 1, html(page_body(&[block(3, "giulietta")]))).await;
    let notifier = Arc::new(StubNotifier::default());
    let app = api::router(test_state_with_store(
        &site,
        Arc::new(UnavailableStore),
        notifier.clone(),
    ));

    let response = get(app, "/api/scrape?page=1").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = json_body(response).await;
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.contains("failed to save listings"));
    assert!(detail.contains("connection refused"));
    assert!(notifier.attempted().is_empty());
}

#[tokio::test]
async fn test_scrape_succeeds_when_notification_fails() {
    let site = MockServer::start().await;
    mount_page(
        &site,
        1,
        html(page_body(&[block(1, "first"), block(2, "second")])),
    )
    .await;
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(StubNotifier::failing_for(&[post_link(1, "first")]));
    let app = test_app(&site, store.clone(), notifier);

    let response = get(app, "/api/scrape?page=1").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["new_posts"], 2);
    assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn test_scrape_rejects_invalid_page() {
    let site = MockServer::start().await;
    let app = test_app(&site, Arc::new(MemoryStore::new()), Arc::new(StubNotifier::default()));

    for uri in [
        "/api/scrape?page=0",
        "/api/scrape?page=-3",
        "/api/scrape?page=abc",
        "/api/scrape",
    ] {
        let response = get(app.clone(), uri).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        assert!(json_body(response).await["detail"].is_string(), "{uri}");
    }
}

#[tokio::test]
async fn test_background_scrape_returns_202_and_completes() {
    let site = MockServer::start().await;
    mount_page(&site, 4, html(page_body(&[block(9, "later")]))).await;
    let store = Arc::new(MemoryStore::new());
    let state = test_state(&site, store.clone(), Arc::new(StubNotifier::default()));
    let tasks = state.tasks.clone();
    let app = api::router(state);

    let response = get(app, "/api/scrape?page=4&background=true").await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(json_body(response).await["page"], 4);

    tasks.close();
    tasks.wait().await;
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_health() {
    let site = MockServer::start().await;
    let app = test_app(&site, Arc::new(MemoryStore::new()), Arc::new(StubNotifier::default()));

    let response = get(app, "/api/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({"status": "healthy"}));
}

#[tokio::test]
async fn test_debug_reports_store_and_env_presence() {
    let site = MockServer::start().await;
    let app = test_app(&site, Arc::new(MemoryStore::new()), Arc::new(StubNotifier::default()));

    let response = get(app, "/api/debug").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["store_initialized"], true);
    assert_eq!(body["store_connection_ok"], true);
    assert!(body["store_error"].is_null());
    assert!(body["env_vars"]["FIREBASE_PRIVATE_KEY"].is_boolean());
    assert!(body["env_vars"]["SMTP_SERVER"].is_boolean());
    assert!(body["env_vars"]["SCRAPER_FUNCTION_URL"].is_boolean());
}

#[tokio::test]
async fn test_scrape_component_returns_posts() {
    let site = MockServer::start().await;
    mount_page(&site, 2, html(page_body(&[block(5, "giulia")]))).await;
    let store = Arc::new(MemoryStore::new());
    let app = test_app(&site, store.clone(), Arc::new(StubNotifier::default()));

    let response = get(app, "/scrape?page=2").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["posts"].as_array().unwrap().len(), 1);
    assert_eq!(body["posts"][0]["post_link"], post_link(5, "giulia"));
    assert_eq!(body["posts"][0]["power"], "103kW (140KS)");
    // Scraping alone never touches the store.
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_scrape_component_rejects_invalid_page() {
    let site = MockServer::start().await;
    let app = test_app(&site, Arc::new(MemoryStore::new()), Arc::new(StubNotifier::default()));

    let response = get(app, "/scrape?page=0").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await,
        json!({"detail": "page must be at least 1, got 0"})
    );
}

#[tokio::test]
async fn test_malformed_component_bodies_get_json_detail() {
    let site = MockServer::start().await;
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(StubNotifier::default());
    let app = test_app(&site, store.clone(), notifier.clone());

    let response = post_json(app.clone(), "/save", json!({"posts": 5})).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(json_body(response).await["detail"].is_string());

    let response = post_json(app.clone(), "/send_email", json!({"subject": "New Car Listed"})).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(json_body(response).await["detail"].is_string());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/save")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(response).await["detail"].is_string());

    assert!(store.is_empty());
    assert!(notifier.attempted().is_empty());
}

#[tokio::test]
async fn test_save_component_returns_only_new_posts() {
    let site = MockServer::start().await;
    let app = test_app(&site, Arc::new(MemoryStore::new()), Arc::new(StubNotifier::default()));
    let posts = json!({"posts": [
        {"title": "Giulia", "post_link": post_link(1, "giulia")},
        {"title": "No link", "post_link": ""},
        {"title": "Stelvio", "post_link": post_link(2, "stelvio")},
    ]});

    let response = post_json(app.clone(), "/save", posts.clone()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let titles: Vec<&str> = body["new_posts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Giulia", "Stelvio"]);

    let response = post_json(app, "/save", posts).await;
    assert_eq!(json_body(response).await, json!({"new_posts": []}));
}

#[tokio::test]
async fn test_send_email_component() {
    let site = MockServer::start().await;
    let failing = post_link(13, "unlucky");
    let app = test_app(
        &site,
        Arc::new(MemoryStore::new()),
        Arc::new(StubNotifier::failing_for(std::slice::from_ref(&failing))),
    );

    let response = post_json(
        app.clone(),
        "/send_email",
        json!({"subject": "New Car Listed", "car_info": {"title": "Giulia", "post_link": post_link(1, "giulia")}}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({"message": "Email sent successfully"})
    );

    let response = post_json(
        app,
        "/send_email",
        json!({"subject": "New Car Listed", "car_info": {"title": "Mito", "post_link": failing}}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let detail = json_body(response).await["detail"].as_str().unwrap().to_string();
    assert!(detail.starts_with("Failed to send email"));
}

#[tokio::test]
async fn test_openapi_document_lists_routes() {
    let site = MockServer::start().await;
    let app = test_app(&site, Arc::new(MemoryStore::new()), Arc::new(StubNotifier::default()));

    let response = get(app, "/api/openapi.json").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    for route in ["/api/scrape", "/api/health", "/api/debug", "/scrape", "/save", "/send_email"] {
        assert!(body["paths"][route].is_object(), "{route}");
    }
}

#[tokio::test]
async fn test_request_id_is_set_and_propagated() {
    let site = MockServer::start().await;
    let app = test_app(&site, Arc::new(MemoryStore::new()), Arc::new(StubNotifier::default()));

    let response = get(app.clone(), "/api/health").await;
    assert!(response.headers().contains_key("x-request-id"));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/health")
                .header("x-request-id", "abc-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.headers()["x-request-id"], "abc-123");
}
