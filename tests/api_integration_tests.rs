//! Integration Tests for API Endpoints
//!
//! Exercises the full request/response cycle against a server built from
//! configuration, with a fixture file on disk and a mocked remote service.

use std::io::Write;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use spirit_lookup::config::DataSource;
use spirit_lookup::{api::create_router, AppState, Config, RetryPolicy};
use tempfile::NamedTempFile;
use tower::ServiceExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// == Helper Functions ==

fn fixture_file() -> NamedTempFile {
    let records = json!([
        {
            "spiritCode": "ZRH001",
            "hotelName": "Zurich House",
            "region": "DACH",
            "location": {"city": "Zurich", "country": "Switzerland"},
            "contacts": [{"role": "GM", "name": "Anna Keller", "email": "anna@example.com"}]
        },
        {"spiritCode": "LON123", "hotelName": "London Tower", "location": {"city": "London", "country": "UK"}},
        {"spiritCode": "BER007", "hotelName": "Berlin Loft"},
        {"hotelName": "No Code Inn"}
    ]);
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", records).unwrap();
    file
}

fn fixture_config(file: &NamedTempFile, page_size: usize) -> Config {
    Config {
        data_source: DataSource::Fixture,
        fixture_path: file.path().to_path_buf(),
        page_size,
        ..Config::default()
    }
}

fn remote_config(file: &NamedTempFile, server: &MockServer) -> Config {
    Config {
        data_source: DataSource::Remote,
        remote_endpoint: Some(format!("{}/items", server.uri())),
        remote_token: Some("secret".to_string()),
        remote_timeout: Duration::from_secs(2),
        retry: RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(20),
            jitter: 0.0,
        },
        ..fixture_config(file, 50)
    }
}

fn create_app(config: &Config) -> Router {
    create_router(AppState::from_config(config).unwrap())
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn codes(body: &Value) -> Vec<String> {
    body["records"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["spiritCode"].as_str().unwrap().to_string())
        .collect()
}

// == Search Endpoint Tests ==

#[tokio::test]
async fn test_search_single_match() {
    let file = fixture_file();
    let app = create_app(&fixture_config(&file, 50));

    let (status, body) = get_json(&app, "/search?q=ZRH").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(codes(&body), vec!["ZRH001"]);
    assert_eq!(body["has_more"], false);
    assert!(body["next_cursor"].is_null());
    assert!(body["degraded"].is_null());
    assert_eq!(body["records"][0]["city"], "Zurich");
    assert_eq!(body["records"][0]["contacts"][0]["name"], "Anna Keller");
}

#[tokio::test]
async fn test_search_matches_display_name() {
    let file = fixture_file();
    let app = create_app(&fixture_config(&file, 50));

    let (_, body) = get_json(&app, "/search?q=tower").await;
    assert_eq!(codes(&body), vec!["LON123"]);
}

#[tokio::test]
async fn test_search_pagination_covers_all_records() {
    let file = fixture_file();
    let app = create_app(&fixture_config(&file, 2));

    let (status, first) = get_json(&app, "/search").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(codes(&first), vec!["BER007", "LON123"]);
    assert_eq!(first["has_more"], true);

    let cursor = first["next_cursor"].as_str().unwrap();
    let (_, second) = get_json(&app, &format!("/search?cursor={}", cursor)).await;
    assert_eq!(codes(&second), vec!["ZRH001"]);
    assert_eq!(second["has_more"], false);
}

#[tokio::test]
async fn test_search_empty_result_is_not_an_error() {
    let file = fixture_file();
    let app = create_app(&fixture_config(&file, 50));

    let (status, body) = get_json(&app, "/search?q=nowhere").await;
    assert_eq!(status, StatusCode::OK);
    assert!(codes(&body).is_empty());
}

#[tokio::test]
async fn test_search_invalid_cursor() {
    let file = fixture_file();
    let app = create_app(&fixture_config(&file, 50));

    let (status, body) = get_json(&app, "/search?cursor=bogus").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_cursor");
}

#[tokio::test]
async fn test_search_forged_fallback_cursor() {
    let file = fixture_file();
    let app = create_app(&fixture_config(&file, 50));

    let (status, body) = get_json(&app, "/search?cursor=f.auth_failure:abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_cursor");
}

#[tokio::test]
async fn test_search_with_missing_fixture_is_unavailable() {
    let config = Config {
        fixture_path: "/nonexistent/spirit_fixture.json".into(),
        ..Config::default()
    };
    let app = create_app(&config);

    let (status, body) = get_json(&app, "/search?q=zrh").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["kind"], "data_unavailable");
}

// == Record Endpoint Tests ==

#[tokio::test]
async fn test_record_lookup() {
    let file = fixture_file();
    let app = create_app(&fixture_config(&file, 1));

    let (status, body) = get_json(&app, "/records/zrh001").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["spiritCode"], "ZRH001");
    assert_eq!(body["displayName"], "Zurich House");
}

#[tokio::test]
async fn test_record_not_found() {
    let file = fixture_file();
    let app = create_app(&fixture_config(&file, 50));

    let (status, body) = get_json(&app, "/records/XYZ999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");
    assert!(body["error"].as_str().unwrap().contains("XYZ999"));
}

// == Remote Source Tests ==

#[tokio::test]
async fn test_remote_results_are_served_and_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{"fields": {"spiritCode": "MUC042", "hotelName": "Munich Gate"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let file = fixture_file();
    let app = create_app(&remote_config(&file, &server));

    let (status, body) = get_json(&app, "/search?q=muc").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(codes(&body), vec!["MUC042"]);
    assert!(body["degraded"].is_null());

    let (_, again) = get_json(&app, "/search?q=MUC").await;
    assert_eq!(codes(&again), vec!["MUC042"]);

    let (_, stats) = get_json(&app, "/stats").await;
    assert_eq!(stats["hits"], 1);
}

#[tokio::test]
async fn test_rejected_credential_falls_back_to_fixture() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let file = fixture_file();
    let app = create_app(&remote_config(&file, &server));

    let (status, body) = get_json(&app, "/search?q=zrh").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(codes(&body), vec!["ZRH001"]);
    assert_eq!(body["degraded"], "auth_failure");
}

#[tokio::test]
async fn test_server_errors_are_retried_then_fall_back() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let file = fixture_file();
    let app = create_app(&remote_config(&file, &server));

    let (status, body) = get_json(&app, "/search?q=lon").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(codes(&body), vec!["LON123"]);
    assert_eq!(body["degraded"], "transient");
}

#[tokio::test]
async fn test_remote_cursor_to_foreign_host_is_refused() {
    let server = MockServer::start().await;
    let elsewhere = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": []})))
        .mount(&elsewhere)
        .await;

    let file = fixture_file();
    let app = create_app(&remote_config(&file, &server));

    let uri = format!("/search?cursor=p.0:{}/steal", elsewhere.uri());
    let (status, body) = get_json(&app, &uri).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_cursor");
    assert!(elsewhere.received_requests().await.unwrap().is_empty());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_remote_paging_resumes_on_fixture_after_rejection() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/items"))
        .and(query_param("$top", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [
                {"fields": {"spiritCode": "BER007", "hotelName": "Berlin Loft"}},
                {"fields": {"spiritCode": "LON123", "hotelName": "London Tower"}}
            ],
            "@odata.nextLink": format!("{}/items?page=2", server.uri())
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/items"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let file = fixture_file();
    let config = Config {
        page_size: 2,
        ..remote_config(&file, &server)
    };
    let app = create_app(&config);

    let (status, first) = get_json(&app, "/search").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(codes(&first), vec!["BER007", "LON123"]);
    assert!(first["degraded"].is_null());

    let cursor = first["next_cursor"].as_str().unwrap();
    let (status, second) = get_json(&app, &format!("/search?cursor={}", cursor)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(codes(&second), vec!["ZRH001"]);
    assert_eq!(second["degraded"], "auth_failure");
    assert_eq!(second["has_more"], false);
}

// == Stats and Health Tests ==

#[tokio::test]
async fn test_stats_endpoint() {
    let file = fixture_file();
    let app = create_app(&fixture_config(&file, 50));

    get_json(&app, "/search?q=lon").await;
    get_json(&app, "/search?q=lon").await;

    let (status, body) = get_json(&app, "/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hits"], 1);
    assert_eq!(body["total_entries"], 1);
    assert_eq!(body["evictions"], 0);
    assert!(body.get("coalesced").is_some());
    assert!(body.get("hit_rate").is_some());
}

#[tokio::test]
async fn test_health_endpoint() {
    let file = fixture_file();
    let app = create_app(&fixture_config(&file, 50));

    let (status, body) = get_json(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["primary"], "fixture");
    assert!(body.get("timestamp").is_some());
}
