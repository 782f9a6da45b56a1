use std::net::SocketAddr;

use axum::{Json, Router, routing::post};
use reqwest::header::AUTHORIZATION;
use serde_json::{Map, Value};
use tokio::net::TcpListener;

use sift_config::{ExactBackendConfig, VectorBackendConfig};
use sift_providers::vector::VectorRequest;

async fn spawn_stub(app: Router) -> SocketAddr {
	let listener = TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind stub listener.");
	let addr = listener.local_addr().expect("Failed to read stub address.");

	tokio::spawn(async move {
		let _ = axum::serve(listener, app).await;
	});

	addr
}

async fn echo_exact(Json(body): Json<Value>) -> Json<Value> {
	let query = body.get("query").and_then(Value::as_str).unwrap_or_default().to_string();
	let size = body.get("size").and_then(Value::as_u64).unwrap_or_default();

	Json(serde_json::json!({
		"hits": [
			{ "pattern": query, "canonical_name": "Ivanov Ivan", "entity_id": "42", "score": 0.95 },
			{ "pattern": "size", "canonical_name": "Size Echo", "entity_id": size, "score": 0.1 }
		]
	}))
}

async fn echo_vector(Json(body): Json<Value>) -> Json<Value> {
	let kind = if body.get("embedding").is_some() { "embedding" } else { "text" };

	Json(serde_json::json!({
		"hits": [{ "entity_id": kind, "canonical_name": "Echo", "score": 0.5 }]
	}))
}

#[test]
fn builds_bearer_auth_header() {
	let headers = sift_providers::auth_headers(Some("secret"), &Map::new())
		.expect("Failed to build headers.");
	let value = headers.get(AUTHORIZATION).expect("Missing authorization header.");

	assert_eq!(value, "Bearer secret");
}

#[test]
fn omits_auth_header_without_key() {
	let mut defaults = Map::new();

	defaults.insert("x-tenant".to_string(), Value::String("t1".to_string()));

	let headers =
		sift_providers::auth_headers(None, &defaults).expect("Failed to build headers.");

	assert!(headers.get(AUTHORIZATION).is_none());
	assert_eq!(headers.get("x-tenant").expect("Missing default header."), "t1");
}

#[test]
fn rejects_non_string_default_header() {
	let mut defaults = Map::new();

	defaults.insert("x-retries".to_string(), Value::from(3));

	assert!(sift_providers::auth_headers(None, &defaults).is_err());
}

#[tokio::test]
async fn exact_search_round_trips_over_http() {
	let addr = spawn_stub(Router::new().route("/v1/patterns/search", post(echo_exact))).await;
	let cfg = ExactBackendConfig {
		kind: "http".to_string(),
		api_base: format!("http://{addr}/"),
		..Default::default()
	};
	let client = sift_providers::build_client(cfg.timeout_ms).expect("Failed to build client.");
	let hits = sift_providers::exact::search(&client, &cfg, "ivanov ivan", 7)
		.await
		.expect("Exact search failed.");

	assert_eq!(hits.len(), 2);
	assert_eq!(hits[0].entity_id, "42");
	assert_eq!(hits[0].pattern, "ivanov ivan");
	assert_eq!(hits[1].entity_id, "7");
}

#[tokio::test]
async fn vector_search_sends_embedding_when_present() {
	let addr = spawn_stub(Router::new().route("/v1/vectors/search", post(echo_vector))).await;
	let cfg = VectorBackendConfig {
		enabled: true,
		kind: "http".to_string(),
		api_base: format!("http://{addr}"),
		..Default::default()
	};
	let client = sift_providers::build_client(cfg.timeout_ms).expect("Failed to build client.");
	let by_text =
		sift_providers::vector::search(&client, &cfg, &VectorRequest::Text("x".to_string()), 3)
			.await
			.expect("Vector search failed.");
	let by_embedding =
		sift_providers::vector::search(&client, &cfg, &VectorRequest::Embedding(vec![0.1]), 3)
			.await
			.expect("Vector search failed.");

	assert_eq!(by_text[0].entity_id, "text");
	assert_eq!(by_embedding[0].entity_id, "embedding");
}

#[tokio::test]
async fn unreachable_backend_is_reported_as_unavailable() {
	let listener = TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind listener.");
	let addr = listener.local_addr().expect("Failed to read address.");

	drop(listener);

	let cfg = ExactBackendConfig {
		kind: "http".to_string(),
		api_base: format!("http://{addr}"),
		..Default::default()
	};
	let client = sift_providers::build_client(cfg.timeout_ms).expect("Failed to build client.");
	let err = sift_providers::exact::search(&client, &cfg, "ivanov", 5)
		.await
		.expect_err("Expected connection failure.");

	assert!(err.is_unavailable(), "Unexpected error: {err}");
}
