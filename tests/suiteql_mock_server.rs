// Mock SuiteQL server for exercising the NetSuite client end to end:
// OAuth header shape, per-call nonce freshness, pagination, and the
// fatal non-2xx path.
// Run with: cargo test --test suiteql_mock_server

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Json;
use axum::routing::post;
use axum::Router;
use serde_json::{json, Value};
use tokio::sync::RwLock;

use millwright::services::netsuite::{NetSuiteClient, NetSuiteConfig, NetSuiteError};

/// Rows the mock will serve per request, regardless of the requested limit.
/// Kept small so pagination is exercised with a handful of rows.
const MOCK_PAGE_SIZE: usize = 2;

#[derive(Debug, Default)]
struct MockSuiteQlState {
    rows: Vec<Value>,
    fail_with: Option<u16>,
    auth_headers: Vec<String>,
    bodies: Vec<Value>,
}

type SharedState = Arc<RwLock<MockSuiteQlState>>;

async fn suiteql(
    State(state): State<SharedState>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let mut state = state.write().await;

    state.auth_headers.push(
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string(),
    );
    state.bodies.push(body);

    if let Some(code) = state.fail_with {
        let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return Err((status, r#"{"type":"CONCURRENCY_LIMIT_EXCEEDED"}"#.to_string()));
    }

    let offset: usize = params
        .get("offset")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let limit: usize = params
        .get("limit")
        .and_then(|v| v.parse().ok())
        .unwrap_or(MOCK_PAGE_SIZE);

    let page: Vec<Value> = state
        .rows
        .iter()
        .skip(offset)
        .take(limit.min(MOCK_PAGE_SIZE))
        .cloned()
        .collect();
    let has_more = offset + page.len() < state.rows.len();

    Ok(Json(json!({
        "items": page,
        "hasMore": has_more,
        "offset": offset,
        "count": page.len(),
        "totalResults": state.rows.len(),
    })))
}

async fn start_mock_server(state: SharedState) -> String {
    let app = Router::new()
        .route("/services/rest/query/v1/suiteql", post(suiteql))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

    format!("http://{}", addr)
}

fn test_config() -> NetSuiteConfig {
    NetSuiteConfig {
        account_id: "1234567".to_string(),
        consumer_key: "test_consumer_key".to_string(),
        consumer_secret: "test_consumer_secret".to_string(),
        token_id: "test_token_id".to_string(),
        token_secret: "test_token_secret".to_string(),
        realm: None,
    }
}

fn seeded_state(row_count: usize) -> SharedState {
    let rows = (0..row_count)
        .map(|i| {
            json!({
                "id": (7000 + i).to_string(),
                "tranid": format!("SO{}", 1000 + i),
                "foreigntotal": "150.00",
            })
        })
        .collect();

    Arc::new(RwLock::new(MockSuiteQlState {
        rows,
        ..Default::default()
    }))
}

fn extract_nonce(header: &str) -> &str {
    let start = header
        .find("oauth_nonce=\"")
        .map(|i| i + "oauth_nonce=\"".len())
        .expect("header has a nonce");
    &header[start..start + header[start..].find('"').expect("nonce is quoted")]
}

#[tokio::test]
async fn suiteql_all_follows_pagination_to_exhaustion() {
    let state = seeded_state(5);
    let base_url = start_mock_server(state.clone()).await;

    let client = NetSuiteClient::with_base_url(test_config(), base_url).unwrap();
    let rows = client
        .suiteql_all("SELECT id, tranid FROM transaction WHERE type = 'SalesOrd'")
        .await
        .unwrap();

    assert_eq!(rows.len(), 5);
    assert_eq!(rows[0]["tranid"], "SO1000");
    assert_eq!(rows[4]["tranid"], "SO1004");

    // 5 rows at 2 per page takes 3 requests, each carrying the query body.
    let state = state.read().await;
    assert_eq!(state.auth_headers.len(), 3);
    for body in &state.bodies {
        assert!(body["q"].as_str().unwrap().contains("SalesOrd"));
    }
}

#[tokio::test]
async fn every_request_is_signed_with_a_fresh_nonce() {
    let state = seeded_state(5);
    let base_url = start_mock_server(state.clone()).await;

    let client = NetSuiteClient::with_base_url(test_config(), base_url).unwrap();
    client.suiteql_all("SELECT id FROM transaction").await.unwrap();

    let state = state.read().await;
    let nonces: Vec<&str> = state
        .auth_headers
        .iter()
        .map(|h| extract_nonce(h))
        .collect();

    assert_eq!(nonces.len(), 3);
    for (i, a) in nonces.iter().enumerate() {
        for b in &nonces[i + 1..] {
            assert_ne!(a, b, "nonce reused across requests");
        }
    }

    for header in &state.auth_headers {
        assert!(header.starts_with("OAuth realm=\"1234567\""));
        assert!(header.contains("oauth_consumer_key=\"test%5Fconsumer%5Fkey\""));
        assert!(header.contains("oauth_signature_method=\"HMAC-SHA256\""));
        assert!(header.contains("oauth_signature=\""));
        assert!(header.contains("oauth_timestamp=\""));
    }
}

#[tokio::test]
async fn single_page_returns_metadata() {
    let state = seeded_state(2);
    let base_url = start_mock_server(state.clone()).await;

    let client = NetSuiteClient::with_base_url(test_config(), base_url).unwrap();
    let page = client.suiteql("SELECT id FROM transaction", 2, 0).await.unwrap();

    assert_eq!(page.items.len(), 2);
    assert!(!page.has_more);
    assert_eq!(page.total_results, Some(2));
}

#[tokio::test]
async fn non_2xx_is_fatal_with_status_and_body() {
    let state = seeded_state(5);
    state.write().await.fail_with = Some(429);
    let base_url = start_mock_server(state.clone()).await;

    let client = NetSuiteClient::with_base_url(test_config(), base_url).unwrap();
    let err = client
        .suiteql_all("SELECT id FROM transaction")
        .await
        .unwrap_err();

    match err {
        NetSuiteError::RemoteQuery { status, body } => {
            assert_eq!(status.as_u16(), 429);
            assert!(body.contains("CONCURRENCY_LIMIT_EXCEEDED"));
        }
        other => panic!("expected RemoteQuery error, got {:?}", other),
    }

    // The client made exactly one attempt: no automatic retry.
    assert_eq!(state.read().await.auth_headers.len(), 1);
}
