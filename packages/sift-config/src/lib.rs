mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Backends, Config, EmbeddingProviderConfig, ExactBackendConfig, Fuzzy, Providers, Risk,
	RiskWeights, Search, Service, VectorBackendConfig, Watchlist,
};

use std::{fs, path::Path};

pub const SEARCH_MODES: [&str; 4] = ["hybrid", "exact", "fuzzy", "vector"];

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;
	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	validate_search(&cfg.search)?;
	validate_fuzzy(&cfg.fuzzy)?;
	validate_risk(&cfg.risk)?;

	let exact = &cfg.backends.exact;

	if !matches!(exact.kind.as_str(), "http" | "memory") {
		return Err(Error::Validation {
			message: "backends.exact.kind must be one of http or memory.".to_string(),
		});
	}
	if exact.kind == "http" && exact.api_base.trim().is_empty() {
		return Err(Error::Validation {
			message: "backends.exact.api_base must be non-empty when kind is http.".to_string(),
		});
	}
	if exact.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "backends.exact.timeout_ms must be greater than zero.".to_string(),
		});
	}

	let vector = &cfg.backends.vector;

	if !matches!(vector.kind.as_str(), "http" | "qdrant" | "memory") {
		return Err(Error::Validation {
			message: "backends.vector.kind must be one of http, qdrant, or memory.".to_string(),
		});
	}
	if vector.enabled {
		if vector.kind == "http" && vector.api_base.trim().is_empty() {
			return Err(Error::Validation {
				message: "backends.vector.api_base must be non-empty when kind is http."
					.to_string(),
			});
		}
		if vector.kind == "qdrant" {
			if vector.qdrant_url.trim().is_empty() || vector.collection.trim().is_empty() {
				return Err(Error::Validation {
					message:
						"backends.vector.qdrant_url and backends.vector.collection must be non-empty when kind is qdrant."
							.to_string(),
				});
			}
			if cfg.providers.embedding.is_none() {
				return Err(Error::Validation {
					message: "providers.embedding is required when backends.vector.kind is qdrant."
						.to_string(),
				});
			}
		}
		if vector.timeout_ms == 0 {
			return Err(Error::Validation {
				message: "backends.vector.timeout_ms must be greater than zero.".to_string(),
			});
		}
	}
	if let Some(embedding) = cfg.providers.embedding.as_ref() {
		if embedding.dimensions == 0 {
			return Err(Error::Validation {
				message: "providers.embedding.dimensions must be greater than zero.".to_string(),
			});
		}
		if embedding.api_key.trim().is_empty() {
			return Err(Error::Validation {
				message: "Provider embedding api_key must be non-empty.".to_string(),
			});
		}
	}

	Ok(())
}

pub fn validate_search(search: &Search) -> Result<()> {
	if search.top_k == 0 {
		return Err(Error::Validation {
			message: "search.top_k must be greater than zero.".to_string(),
		});
	}

	for (label, value) in [
		("search.score_threshold", search.score_threshold),
		("search.escalation_threshold", search.escalation_threshold),
	] {
		ensure_unit_interval(label, value)?;
	}

	if !SEARCH_MODES.contains(&search.mode.as_str()) {
		return Err(Error::Validation {
			message: "search.mode must be one of hybrid, exact, fuzzy, or vector.".to_string(),
		});
	}
	if search.per_tier_timeout_ms == 0 {
		return Err(Error::Validation {
			message: "search.per_tier_timeout_ms must be greater than zero.".to_string(),
		});
	}
	if search.query_deadline_ms == 0 {
		return Err(Error::Validation {
			message: "search.query_deadline_ms must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

pub fn validate_fuzzy(fuzzy: &Fuzzy) -> Result<()> {
	for (label, value) in
		[("fuzzy.edit_weight", fuzzy.edit_weight), ("fuzzy.token_weight", fuzzy.token_weight)]
	{
		ensure_unit_interval(label, value)?;
	}

	if fuzzy.edit_weight + fuzzy.token_weight <= 0.0 {
		return Err(Error::Validation {
			message: "fuzzy.edit_weight and fuzzy.token_weight must not both be zero.".to_string(),
		});
	}
	if fuzzy.edit_cutoff_divisor == 0 {
		return Err(Error::Validation {
			message: "fuzzy.edit_cutoff_divisor must be greater than zero.".to_string(),
		});
	}
	if fuzzy.max_pool == 0 {
		return Err(Error::Validation {
			message: "fuzzy.max_pool must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

pub fn validate_risk(risk: &Risk) -> Result<()> {
	let weights = &risk.weights;

	for (label, value) in [
		("risk.medium_threshold", risk.medium_threshold),
		("risk.high_threshold", risk.high_threshold),
		("risk.high_confidence_score", risk.high_confidence_score),
		("risk.corroboration_bonus", risk.corroboration_bonus),
		("risk.high_confidence_bonus", risk.high_confidence_bonus),
		("risk.weights.smartfilter", weights.smartfilter),
		("risk.weights.person", weights.person),
		("risk.weights.organization", weights.organization),
		("risk.weights.similarity", weights.similarity),
		("risk.weights.identifier", weights.identifier),
		("risk.weights.exact", weights.exact),
		("risk.weights.fuzzy", weights.fuzzy),
		("risk.weights.vector", weights.vector),
	] {
		ensure_unit_interval(label, value)?;
	}

	if risk.medium_threshold >= risk.high_threshold {
		return Err(Error::Validation {
			message: "risk.medium_threshold must be less than risk.high_threshold.".to_string(),
		});
	}

	Ok(())
}

fn ensure_unit_interval(label: &str, value: f32) -> Result<()> {
	if !value.is_finite() {
		return Err(Error::Validation { message: format!("{label} must be a finite number.") });
	}
	if !(0.0..=1.0).contains(&value) {
		return Err(Error::Validation {
			message: format!("{label} must be in the range 0.0-1.0."),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	cfg.search.mode = cfg.search.mode.trim().to_ascii_lowercase();
	cfg.backends.exact.kind = cfg.backends.exact.kind.trim().to_ascii_lowercase();
	cfg.backends.vector.kind = cfg.backends.vector.kind.trim().to_ascii_lowercase();

	for key in [&mut cfg.backends.exact.api_key, &mut cfg.backends.vector.api_key] {
		if key.as_deref().map(|key| key.trim().is_empty()).unwrap_or(false) {
			*key = None;
		}
	}

	if cfg.watchlist.path.as_deref().map(|path| path.as_os_str().is_empty()).unwrap_or(false) {
		cfg.watchlist.path = None;
	}
}
