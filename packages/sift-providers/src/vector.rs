use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

/// The vector backend accepts either raw text (it embeds server-side) or a precomputed
/// embedding.
#[derive(Clone, Debug, PartialEq)]
pub enum VectorRequest {
	Text(String),
	Embedding(Vec<f32>),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VectorHit {
	pub entity_id: String,
	pub canonical_name: String,
	/// Cosine similarity in `[-1, 1]`.
	pub score: f32,
	pub entity_kind: Option<String>,
}

pub async fn search(
	client: &Client,
	cfg: &sift_config::VectorBackendConfig,
	request: &VectorRequest,
	size: u32,
) -> Result<Vec<VectorHit>> {
	let url = crate::endpoint(&cfg.api_base, &cfg.path);
	let body = build_request_body(request, size);
	let res = client
		.post(url)
		.headers(crate::auth_headers(cfg.api_key.as_deref(), &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_vector_response(&json)
}

pub fn build_request_body(request: &VectorRequest, size: u32) -> Value {
	match request {
		VectorRequest::Text(text) => serde_json::json!({ "text": text, "size": size }),
		VectorRequest::Embedding(embedding) =>
			serde_json::json!({ "embedding": embedding, "size": size }),
	}
}

pub fn parse_vector_response(json: &Value) -> Result<Vec<VectorHit>> {
	let items = crate::hits_array(json, "Vector")?;
	let mut out = Vec::with_capacity(items.len());

	for item in &items {
		let entity_id = crate::string_field(item, "entity_id").ok_or_else(|| {
			Error::InvalidResponse { message: "Vector hit missing entity_id.".to_string() }
		})?;
		let score = item
			.get("score")
			.or_else(|| item.get("cosine"))
			.and_then(Value::as_f64)
			.ok_or_else(|| Error::InvalidResponse {
				message: "Vector hit missing score.".to_string(),
			})? as f32;

		out.push(VectorHit {
			canonical_name: crate::string_field(item, "canonical_name").unwrap_or_default(),
			entity_id,
			score,
			entity_kind: crate::string_field(item, "entity_kind"),
		});
	}

	Ok(out)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn request_body_carries_text_or_embedding() {
		let text = build_request_body(&VectorRequest::Text("ivanov".to_string()), 5);
		let embedding = build_request_body(&VectorRequest::Embedding(vec![0.5, 0.25]), 3);

		assert_eq!(text, serde_json::json!({ "text": "ivanov", "size": 5 }));
		assert_eq!(embedding, serde_json::json!({ "embedding": [0.5, 0.25], "size": 3 }));
	}

	#[test]
	fn parses_cosine_alias() {
		let json = serde_json::json!({
			"results": [{ "entity_id": "9", "canonical_name": "Sidorov", "cosine": -0.25 }]
		});
		let hits = parse_vector_response(&json).expect("parse failed");

		assert_eq!(hits[0].score, -0.25);
		assert_eq!(hits[0].entity_id, "9");
	}
}
