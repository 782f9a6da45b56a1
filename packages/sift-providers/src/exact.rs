use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Error, Result};

/// One ranked hit from the pattern index.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExactHit {
	pub pattern: String,
	pub canonical_name: String,
	pub entity_id: String,
	pub score: f32,
	pub entity_kind: Option<String>,
	/// Which name field the pattern was compiled from, when the index reports it.
	pub field: Option<String>,
	pub metadata: Map<String, Value>,
}

pub async fn search(
	client: &Client,
	cfg: &sift_config::ExactBackendConfig,
	query: &str,
	size: u32,
) -> Result<Vec<ExactHit>> {
	let url = crate::endpoint(&cfg.api_base, &cfg.path);
	let body = serde_json::json!({ "query": query, "size": size });
	let res = client
		.post(url)
		.headers(crate::auth_headers(cfg.api_key.as_deref(), &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_exact_response(&json)
}

pub fn parse_exact_response(json: &Value) -> Result<Vec<ExactHit>> {
	let items = crate::hits_array(json, "Exact index")?;
	let mut out = Vec::with_capacity(items.len());

	for item in &items {
		let entity_id = crate::string_field(item, "entity_id").ok_or_else(|| {
			Error::InvalidResponse { message: "Exact hit missing entity_id.".to_string() }
		})?;
		let canonical_name = crate::string_field(item, "canonical_name").ok_or_else(|| {
			Error::InvalidResponse { message: "Exact hit missing canonical_name.".to_string() }
		})?;
		let score = item.get("score").and_then(Value::as_f64).ok_or_else(|| {
			Error::InvalidResponse { message: "Exact hit missing score.".to_string() }
		})? as f32;
		let pattern =
			crate::string_field(item, "pattern").unwrap_or_else(|| canonical_name.clone());
		let metadata = item.get("metadata").and_then(Value::as_object).cloned().unwrap_or_default();

		out.push(ExactHit {
			pattern,
			canonical_name,
			entity_id,
			score,
			entity_kind: crate::string_field(item, "entity_kind"),
			field: crate::string_field(item, "field"),
			metadata,
		});
	}

	Ok(out)
}
