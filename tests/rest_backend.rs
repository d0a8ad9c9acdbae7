use hodlr::Error;
use hodlr::backend::{Backend, Query, RestBackend, Table};
use hodlr::config::BackendConfig;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ANON_KEY: &str = "anon-key";
const USER_ID: &str = "6f1c2b9e-4d7a-4f0e-9a51-2c8d3b7e1f00";

fn backend(server: &MockServer) -> RestBackend {
    let config = BackendConfig {
        url: Some(server.uri()),
        anon_key: Some(ANON_KEY.to_string()),
        offline: false,
    };
    RestBackend::new(&config, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn select_translates_query_to_params() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/posts"))
        .and(query_param("select", "*"))
        .and(query_param("user_id", format!("eq.{}", USER_ID)))
        .and(query_param("order", "created_at.desc"))
        .and(query_param("limit", "20"))
        .and(header("apikey", ANON_KEY))
        .and(header("authorization", format!("Bearer {}", ANON_KEY).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "p1", "user_id": USER_ID, "content": "gm"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let query = Query::new()
        .eq("user_id", USER_ID)
        .order_by("created_at", false)
        .limit(20);
    let rows = backend(&server).select(Table::Posts, &query).await.unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["content"], "gm");
}

#[tokio::test]
async fn sign_in_token_authorizes_later_requests() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .and(body_json(json!({"email": "me@x.io", "password": "hunter22"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "user-token",
            "expires_in": 3600,
            "user": {"id": USER_ID, "email": "me@x.io"}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/favorite_coins"))
        .and(header("authorization", "Bearer user-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend(&server);
    let session = backend.sign_in("me@x.io", "hunter22").await.unwrap();
    assert_eq!(session.user_id.to_string(), USER_ID);
    assert_eq!(session.access_token, "user-token");
    assert!(session.expires_at.is_some());

    let rows = backend
        .select(Table::FavoriteCoins, &Query::new())
        .await
        .unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn rejected_credentials_surface_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid login credentials"
        })))
        .mount(&server)
        .await;

    let err = backend(&server)
        .sign_in("me@x.io", "wrong")
        .await
        .unwrap_err();

    match err {
        Error::Auth(message) => assert_eq!(message, "Invalid login credentials"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn signup_awaiting_confirmation_is_an_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user": {"id": USER_ID, "email": "new@x.io"}
        })))
        .mount(&server)
        .await;

    let err = backend(&server)
        .sign_up("new@x.io", "hunter22")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Auth(_)));
}

#[tokio::test]
async fn insert_returns_stored_row() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/price_alerts"))
        .and(header("prefer", "return=representation"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            {"id": "a1", "coin_id": "bitcoin", "is_active": true}
        ])))
        .mount(&server)
        .await;

    let row = backend(&server)
        .insert(
            Table::PriceAlerts,
            json!({"coin_id": "bitcoin", "is_active": true}),
        )
        .await
        .unwrap();

    assert_eq!(row["id"], "a1");
}

#[tokio::test]
async fn delete_without_filter_never_reaches_server() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = backend(&server)
        .delete(Table::Posts, &Query::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn subscribe_is_unsupported() {
    let server = MockServer::start().await;
    let result = backend(&server).subscribe(Table::Posts, Query::new());
    assert!(matches!(result, Err(Error::Unsupported(_))));
}
