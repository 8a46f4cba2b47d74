use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use greeting::config::GreetingConfig;
use greeting::greeting::handle;
use greeting::store::{MemoryStore, RestStore, Row, Select, StorageClient};
use greeting::{HandlerError, Message, StorageError};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::TcpListener;
use url::Url;

const KEY: &str = "anon-test-key";

/// Minimal stand-in for PostgREST, backed by the in-memory store.
#[derive(Clone)]
struct FakePostgrest {
    store: Arc<MemoryStore>,
}

fn authorized(headers: &HeaderMap) -> bool {
    let apikey = headers.get("apikey").and_then(|v| v.to_str().ok());
    let bearer = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    apikey == Some(KEY) && bearer == Some(KEY)
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"message": "Invalid API key", "hint": "Double check your Supabase `anon` key."})),
    )
        .into_response()
}

fn error_response(err: &StorageError) -> Response {
    let (status, code) = match err {
        StorageError::RelationMissing { .. } => (StatusCode::NOT_FOUND, Some("42P01".to_string())),
        StorageError::Failure { code, .. } => (StatusCode::BAD_REQUEST, code.clone()),
        StorageError::Insert { .. } => (StatusCode::BAD_REQUEST, None),
    };
    (
        status,
        Json(json!({"code": code, "details": null, "hint": null, "message": err.message()})),
    )
        .into_response()
}

async fn select_rows(
    State(fake): State<FakePostgrest>,
    Path(table): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let columns: Vec<&str> = params
        .get("select")
        .map(|s| s.split(',').collect())
        .unwrap_or_default();
    let limit = params
        .get("limit")
        .and_then(|l| l.parse().ok())
        .unwrap_or(u32::MAX);
    let mut query = Select::new(&table, &columns).limit(limit);
    if let Some(column) = params.get("order").and_then(|o| o.strip_suffix(".asc")) {
        query = query.order_by(column);
    }
    match fake.store.select(query).await {
        Ok(rows) => Json(rows).into_response(),
        Err(err) => error_response(&err),
    }
}

async fn insert_rows(
    State(fake): State<FakePostgrest>,
    Path(table): Path<String>,
    headers: HeaderMap,
    Json(rows): Json<Vec<Row>>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let representation =
        headers.get("prefer").and_then(|v| v.to_str().ok()) == Some("return=representation");
    let mut persisted = Vec::new();
    for row in &rows {
        match fake.store.insert(&table, row).await {
            Ok(row) => persisted.push(row),
            Err(err) => return error_response(&err),
        }
    }
    if representation {
        (StatusCode::CREATED, Json(persisted)).into_response()
    } else {
        StatusCode::CREATED.into_response()
    }
}

async fn call_rpc(
    State(fake): State<FakePostgrest>,
    Path(name): Path<String>,
    headers: HeaderMap,
    Json(args): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    if name != "exec_sql" {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({
                "code": "PGRST202",
                "message": format!("Could not find the function public.{name}(sql) in the schema cache"),
            })),
        )
            .into_response();
    }
    let sql = args.get("sql").and_then(Value::as_str).unwrap_or_default();
    match fake.store.exec_sql(sql).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(&err),
    }
}

async fn spawn_fake(store: Arc<MemoryStore>) -> Url {
    let app = Router::new()
        .route("/rest/v1/rpc/{name}", post(call_rpc))
        .route("/rest/v1/{table}", get(select_rows).post(insert_rows))
        .with_state(FakePostgrest { store });

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind fake PostgREST");
    let addr = listener.local_addr().expect("no local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("fake PostgREST crashed");
    });
    Url::parse(&format!("http://{addr}")).expect("invalid fake url")
}

fn rest_store(url: &Url, key: &str, rpc_name: &str) -> RestStore {
    RestStore::new(reqwest::Client::new(), url, key, rpc_name).expect("invalid rest store")
}

#[tokio::test]
async fn rest_handler_creates_table_seeds_and_rereads() {
    let backing = Arc::new(MemoryStore::new());
    let url = spawn_fake(backing.clone()).await;
    let store = rest_store(&url, KEY, "exec_sql");
    let cfg = GreetingConfig::default();

    let first = handle(&store, &cfg).await.unwrap();
    assert_eq!(first, Message::new(1, "Hello User"));
    assert!(backing.has_table("messages"));
    assert_eq!(backing.exec_sql_calls(), 1);

    let second = handle(&store, &cfg).await.unwrap();
    assert_eq!(second, first);
    assert_eq!(backing.insert_calls(), 1);
    assert_eq!(backing.exec_sql_calls(), 1);
}

#[tokio::test]
async fn rest_missing_relation_is_classified() {
    let backing = Arc::new(MemoryStore::new());
    let url = spawn_fake(backing).await;
    let store = rest_store(&url, KEY, "exec_sql");

    let err = store
        .select(Select::new("messages", &["text"]))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        StorageError::RelationMissing {
            relation: "messages".to_string(),
            message: "relation \"messages\" does not exist".to_string(),
        }
    );
}

#[tokio::test]
async fn rest_insert_returns_persisted_representation() {
    let backing = Arc::new(MemoryStore::new().with_messages_table("messages"));
    let url = spawn_fake(backing).await;
    let store = rest_store(&url, KEY, "exec_sql");

    let row = store
        .insert("messages", json!({"text": "hi"}).as_object().unwrap())
        .await
        .unwrap();
    assert_eq!(Value::Object(row), json!({"id": 1, "text": "hi"}));
}

#[tokio::test]
async fn rest_missing_rpc_is_schema_unavailable() {
    let backing = Arc::new(MemoryStore::new());
    let url = spawn_fake(backing.clone()).await;
    let store = rest_store(&url, KEY, "run_sql");

    let err = handle(&store, &GreetingConfig::default())
        .await
        .unwrap_err();
    assert_eq!(err, HandlerError::SchemaUnavailable);
    assert!(!backing.has_table("messages"));
}

#[tokio::test]
async fn rest_read_error_message_is_passed_through() {
    let backing = Arc::new(MemoryStore::new().with_messages_table("messages"));
    backing.deny_selects(StorageError::failure(
        Some("42501"),
        "permission denied for table messages",
    ));
    let url = spawn_fake(backing).await;
    let store = rest_store(&url, KEY, "exec_sql");

    let err = handle(&store, &GreetingConfig::default())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        HandlerError::StorageFailure("permission denied for table messages".to_string())
    );
}

#[tokio::test]
async fn rest_wrong_key_surfaces_store_message() {
    let backing = Arc::new(MemoryStore::new().with_messages_table("messages"));
    let url = spawn_fake(backing.clone()).await;
    let store = rest_store(&url, "wrong-key", "exec_sql");

    let err = handle(&store, &GreetingConfig::default())
        .await
        .unwrap_err();
    assert_eq!(err, HandlerError::StorageFailure("Invalid API key".to_string()));
    assert_eq!(backing.select_calls(), 0);
}
