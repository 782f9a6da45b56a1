use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use sift_domain::{EntityKind, WatchlistEntity};

/// Which search path produced a candidate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
	/// Fast-path identifier cache hit.
	Identifier,
	Exact,
	Fuzzy,
	Vector,
}
impl SearchMode {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Identifier => "identifier",
			Self::Exact => "exact",
			Self::Fuzzy => "fuzzy",
			Self::Vector => "vector",
		}
	}
}

/// One watchlist entity matched by at least one tier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
	pub entity_id: String,
	pub entity_kind: EntityKind,
	/// Surface form that produced the best score.
	pub matched_text: String,
	/// Best score across every tier that found this entity, in `[0, 1]`.
	pub score: f32,
	/// Mode behind `score`.
	pub mode: SearchMode,
	pub modes: BTreeSet<SearchMode>,
	/// Best score per mode.
	pub mode_scores: BTreeMap<SearchMode, f32>,
	/// Matched field name to the surface text it matched on.
	pub matched_fields: BTreeMap<String, String>,
	pub metadata: Map<String, Value>,
	/// Token overlap with the query text. Used for tie-breaking.
	pub token_overlap: f32,
}
impl Candidate {
	pub fn new(
		entity_id: impl Into<String>,
		entity_kind: EntityKind,
		matched_text: impl Into<String>,
		score: f32,
		mode: SearchMode,
	) -> Self {
		let score = clamp_score(score);

		Self {
			entity_id: entity_id.into(),
			entity_kind,
			matched_text: matched_text.into(),
			score,
			mode,
			modes: BTreeSet::from([mode]),
			mode_scores: BTreeMap::from([(mode, score)]),
			matched_fields: BTreeMap::new(),
			metadata: Map::new(),
			token_overlap: 0.0,
		}
	}

	pub fn from_entity(
		entity: &WatchlistEntity,
		matched_text: impl Into<String>,
		score: f32,
		mode: SearchMode,
	) -> Self {
		let mut candidate = Self::new(entity.entity_id.clone(), entity.kind, matched_text, score, mode);

		candidate.metadata = entity.candidate_metadata();

		candidate
	}

	pub fn with_field(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
		self.matched_fields.insert(field.into(), value.into());

		self
	}

	pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
		self.metadata = metadata;

		self
	}

	pub fn score_for(&self, mode: SearchMode) -> Option<f32> {
		self.mode_scores.get(&mode).copied()
	}

	/// Folds `other` (same entity) into `self`: max score, union of modes and fields.
	pub fn absorb(&mut self, other: Self) {
		for (mode, score) in other.mode_scores {
			let slot = self.mode_scores.entry(mode).or_insert(score);

			if score > *slot {
				*slot = score;
			}
		}

		self.modes.extend(other.modes);

		let stronger = other.score > self.score;

		for (field, value) in other.matched_fields {
			if stronger {
				self.matched_fields.insert(field, value);
			} else {
				self.matched_fields.entry(field).or_insert(value);
			}
		}
		for (key, value) in other.metadata {
			self.metadata.entry(key).or_insert(value);
		}

		if stronger {
			self.score = other.score;
			self.mode = other.mode;
			self.matched_text = other.matched_text;
		}
	}
}

/// Clamps into `[0, 1]`; NaN becomes zero.
pub fn clamp_score(score: f32) -> f32 {
	if score.is_nan() {
		return 0.0;
	}

	score.clamp(0.0, 1.0)
}

pub fn parse_entity_kind(raw: Option<&str>) -> EntityKind {
	match raw.map(|kind| kind.trim().to_ascii_lowercase()) {
		Some(kind) if matches!(kind.as_str(), "organization" | "organisation" | "org" | "entity") =>
			EntityKind::Organization,
		_ => EntityKind::Person,
	}
}
