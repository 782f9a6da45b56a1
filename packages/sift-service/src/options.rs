use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result, candidate::SearchMode};

/// `hybrid` runs the escalation ladder, the others pin a single tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeSelection {
	Hybrid,
	Exact,
	Fuzzy,
	Vector,
}
impl ModeSelection {
	pub fn parse(raw: &str) -> Option<Self> {
		match raw.trim().to_ascii_lowercase().as_str() {
			"hybrid" => Some(Self::Hybrid),
			"exact" => Some(Self::Exact),
			"fuzzy" => Some(Self::Fuzzy),
			"vector" => Some(Self::Vector),
			_ => None,
		}
	}

	pub fn forced(self) -> Option<SearchMode> {
		match self {
			Self::Hybrid => None,
			Self::Exact => Some(SearchMode::Exact),
			Self::Fuzzy => Some(SearchMode::Fuzzy),
			Self::Vector => Some(SearchMode::Vector),
		}
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchOptions {
	pub top_k: u32,
	pub score_threshold: f32,
	pub enable_escalation: bool,
	pub escalation_threshold: f32,
	pub search_mode: ModeSelection,
	pub per_tier_timeout_ms: u64,
	pub query_deadline_ms: u64,
}
impl SearchOptions {
	pub fn from_config(cfg: &sift_config::Search) -> Result<Self> {
		sift_config::validate_search(cfg)?;

		let search_mode = ModeSelection::parse(&cfg.mode).ok_or_else(|| Error::InvalidOptions {
			message: format!("Unknown search mode {:?}.", cfg.mode),
		})?;

		Ok(Self {
			top_k: cfg.top_k,
			score_threshold: cfg.score_threshold,
			enable_escalation: cfg.enable_escalation,
			escalation_threshold: cfg.escalation_threshold,
			search_mode,
			per_tier_timeout_ms: cfg.per_tier_timeout_ms,
			query_deadline_ms: cfg.query_deadline_ms,
		})
	}

	/// Re-checks the invariants for options built or edited in code.
	pub fn validate(&self) -> Result<()> {
		if self.top_k == 0 {
			return Err(Error::InvalidOptions {
				message: "top_k must be greater than zero.".to_string(),
			});
		}

		for (label, value) in [
			("score_threshold", self.score_threshold),
			("escalation_threshold", self.escalation_threshold),
		] {
			if !value.is_finite() || !(0.0..=1.0).contains(&value) {
				return Err(Error::InvalidOptions {
					message: format!("{label} must be in the range 0.0-1.0."),
				});
			}
		}

		if self.per_tier_timeout_ms == 0 || self.query_deadline_ms == 0 {
			return Err(Error::InvalidOptions {
				message: "Timeouts must be greater than zero.".to_string(),
			});
		}

		Ok(())
	}

	pub fn per_tier_timeout(&self) -> Duration {
		Duration::from_millis(self.per_tier_timeout_ms)
	}

	pub fn query_deadline(&self) -> Duration {
		Duration::from_millis(self.query_deadline_ms)
	}
}
impl Default for SearchOptions {
	fn default() -> Self {
		let cfg = sift_config::Search::default();

		Self {
			top_k: cfg.top_k,
			score_threshold: cfg.score_threshold,
			enable_escalation: cfg.enable_escalation,
			escalation_threshold: cfg.escalation_threshold,
			search_mode: ModeSelection::Hybrid,
			per_tier_timeout_ms: cfg.per_tier_timeout_ms,
			query_deadline_ms: cfg.query_deadline_ms,
		}
	}
}
