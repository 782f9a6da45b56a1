use std::path::PathBuf;

use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
	pub service: Service,
	pub search: Search,
	pub fuzzy: Fuzzy,
	pub risk: Risk,
	pub backends: Backends,
	pub providers: Providers,
	pub watchlist: Watchlist,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Service {
	/// `EnvFilter` directive used by binaries.
	pub log_level: String,
}
impl Default for Service {
	fn default() -> Self {
		Self { log_level: "info".to_string() }
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Search {
	/// Maximum number of merged candidates returned per query.
	pub top_k: u32,
	/// Candidates scoring below this value are dropped by every tier.
	pub score_threshold: f32,
	pub enable_escalation: bool,
	/// A tier whose best candidate scores below this value escalates to the next tier.
	pub escalation_threshold: f32,
	/// One of `hybrid`, `exact`, `fuzzy`, or `vector`.
	pub mode: String,
	pub per_tier_timeout_ms: u64,
	/// Overall budget for one query across all tiers.
	pub query_deadline_ms: u64,
}
impl Default for Search {
	fn default() -> Self {
		Self {
			top_k: 10,
			score_threshold: 0.3,
			enable_escalation: true,
			escalation_threshold: 0.8,
			mode: "hybrid".to_string(),
			per_tier_timeout_ms: 2_000,
			query_deadline_ms: 5_000,
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Fuzzy {
	pub edit_weight: f32,
	pub token_weight: f32,
	/// Lower bound of the edit-distance cutoff, in characters.
	pub min_edit_cutoff: u32,
	/// The cutoff grows as `query_chars / edit_cutoff_divisor`.
	pub edit_cutoff_divisor: u32,
	/// Upper bound on candidates scored per query, independent of corpus size.
	pub max_pool: u32,
	/// Prefix length used by the cheap pre-filter when the corpus exceeds `max_pool`.
	pub prefix_len: u32,
}
impl Default for Fuzzy {
	fn default() -> Self {
		Self {
			edit_weight: 0.6,
			token_weight: 0.4,
			min_edit_cutoff: 3,
			edit_cutoff_divisor: 5,
			max_pool: 5_000,
			prefix_len: 3,
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Risk {
	pub medium_threshold: f32,
	pub high_threshold: f32,
	/// Any candidate at or above this score earns `high_confidence_bonus`.
	pub high_confidence_score: f32,
	/// Added when two or more independent modes agree on one entity.
	pub corroboration_bonus: f32,
	pub high_confidence_bonus: f32,
	pub weights: RiskWeights,
}
impl Default for Risk {
	fn default() -> Self {
		Self {
			medium_threshold: 0.45,
			high_threshold: 0.75,
			high_confidence_score: 0.9,
			corroboration_bonus: 0.1,
			high_confidence_bonus: 0.1,
			weights: RiskWeights::default(),
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RiskWeights {
	pub smartfilter: f32,
	pub person: f32,
	pub organization: f32,
	pub similarity: f32,
	/// Weight of a fast-path identifier hit.
	pub identifier: f32,
	pub exact: f32,
	pub fuzzy: f32,
	pub vector: f32,
}
impl Default for RiskWeights {
	fn default() -> Self {
		Self {
			smartfilter: 0.15,
			person: 0.1,
			organization: 0.1,
			similarity: 0.25,
			identifier: 0.6,
			exact: 0.5,
			fuzzy: 0.35,
			vector: 0.25,
		}
	}
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Backends {
	pub exact: ExactBackendConfig,
	pub vector: VectorBackendConfig,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ExactBackendConfig {
	/// `http` or `memory`.
	pub kind: String,
	pub api_base: String,
	pub path: String,
	pub api_key: Option<String>,
	pub timeout_ms: u64,
	pub default_headers: Map<String, Value>,
}
impl Default for ExactBackendConfig {
	fn default() -> Self {
		Self {
			kind: "memory".to_string(),
			api_base: String::new(),
			path: "/v1/patterns/search".to_string(),
			api_key: None,
			timeout_ms: 1_500,
			default_headers: Map::new(),
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct VectorBackendConfig {
	pub enabled: bool,
	/// `http`, `qdrant`, or `memory`.
	pub kind: String,
	pub api_base: String,
	pub path: String,
	pub api_key: Option<String>,
	pub timeout_ms: u64,
	pub default_headers: Map<String, Value>,
	pub qdrant_url: String,
	pub collection: String,
}
impl Default for VectorBackendConfig {
	fn default() -> Self {
		Self {
			enabled: false,
			kind: "memory".to_string(),
			api_base: String::new(),
			path: "/v1/vectors/search".to_string(),
			api_key: None,
			timeout_ms: 2_000,
			default_headers: Map::new(),
			qdrant_url: "http://localhost:6334".to_string(),
			collection: "watchlist_names".to_string(),
		}
	}
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Providers {
	pub embedding: Option<EmbeddingProviderConfig>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Watchlist {
	/// JSON or JSON Lines file with watchlist entities. Optional; without it the
	/// identifier cache always misses and the in-memory tiers are empty.
	pub path: Option<PathBuf>,
}
