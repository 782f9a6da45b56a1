use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{query::Identifier, text};

const MAX_PERMUTATION_TOKENS: usize = 4;
const MIN_PARTIAL_ORG_TOKEN_CHARS: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
	Person,
	Organization,
}

/// One sanctioned entity as delivered by the watchlist source files.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WatchlistEntity {
	pub entity_id: String,
	pub kind: EntityKind,
	pub names: Vec<String>,
	#[serde(default)]
	pub aliases: Vec<String>,
	#[serde(default)]
	pub identifiers: Vec<Identifier>,
	#[serde(default)]
	pub birth_date: Option<String>,
	#[serde(default)]
	pub metadata: Map<String, Value>,
}
impl WatchlistEntity {
	pub fn primary_name(&self) -> &str {
		self.names.first().or_else(|| self.aliases.first()).map(String::as_str).unwrap_or("")
	}

	/// Every surface form with the field it came from.
	pub fn surface_forms(&self) -> impl Iterator<Item = (&'static str, &str)> {
		self.names
			.iter()
			.map(|name| ("name", name.as_str()))
			.chain(self.aliases.iter().map(|alias| ("alias", alias.as_str())))
	}

	/// Metadata enriched with the typed fields, as carried on candidates.
	pub fn candidate_metadata(&self) -> Map<String, Value> {
		let mut out = self.metadata.clone();

		if let Some(dob) = self.birth_date.as_ref() {
			out.insert("birth_date".to_string(), Value::String(dob.clone()));
		}
		if !self.aliases.is_empty() {
			out.insert(
				"aliases".to_string(),
				Value::Array(self.aliases.iter().cloned().map(Value::String).collect()),
			);
		}
		if !self.identifiers.is_empty() {
			out.insert(
				"identifiers".to_string(),
				Value::Array(
					self.identifiers
						.iter()
						.map(|id| serde_json::json!({ "kind": id.kind, "value": id.value }))
						.collect(),
				),
			);
		}

		out
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternTier {
	Full,
	Permutation,
	Partial,
	Initials,
}
impl PatternTier {
	pub fn base_score(self) -> f32 {
		match self {
			Self::Full => 1.0,
			Self::Permutation => 0.95,
			Self::Partial => 0.85,
			Self::Initials => 0.8,
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Full => "full",
			Self::Permutation => "permutation",
			Self::Partial => "partial",
			Self::Initials => "initials",
		}
	}
}

/// A folded name variant precompiled for exact/substring lookup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamePattern {
	pub pattern: String,
	pub tier: PatternTier,
	/// `name` or `alias`.
	pub field: String,
	pub source: String,
}

/// Builds the multi-tier pattern set for one entity. Each folded pattern text appears once,
/// carrying the strongest tier that produced it.
pub fn name_patterns(entity: &WatchlistEntity) -> Vec<NamePattern> {
	let mut by_text: HashMap<String, NamePattern> = HashMap::new();
	let mut order = Vec::new();

	for (field, surface) in entity.surface_forms() {
		for folded in text::fold_variants(surface) {
			let parts = text::tokens(&folded);

			if parts.is_empty() {
				continue;
			}

			let mut push = |pattern: String, tier: PatternTier| {
				if pattern.is_empty() {
					return;
				}

				match by_text.get_mut(&pattern) {
					Some(existing) if existing.tier <= tier => {},
					Some(existing) => {
						existing.tier = tier;
						existing.field = field.to_string();
						existing.source = surface.to_string();
					},
					None => {
						order.push(pattern.clone());
						by_text.insert(
							pattern.clone(),
							NamePattern {
								pattern,
								tier,
								field: field.to_string(),
								source: surface.to_string(),
							},
						);
					},
				}
			};

			push(folded.clone(), PatternTier::Full);

			match entity.kind {
				EntityKind::Person => {
					if parts.len() <= MAX_PERMUTATION_TOKENS {
						for permutation in permutations(&parts) {
							push(permutation.join(" "), PatternTier::Permutation);
						}
					}
					if parts.len() == 3 {
						for (a, b) in [(0, 1), (1, 0), (0, 2), (2, 0)] {
							push(format!("{} {}", parts[a], parts[b]), PatternTier::Partial);
						}
					}
					if parts.len() >= 2 {
						for initials in initials_forms(&parts) {
							push(initials, PatternTier::Initials);
						}
					}
				},
				EntityKind::Organization => {
					if parts.len() > 1 {
						for part in &parts {
							if part.chars().count() >= MIN_PARTIAL_ORG_TOKEN_CHARS {
								push(part.to_string(), PatternTier::Partial);
							}
						}
					}
				},
			}
		}
	}

	order.into_iter().filter_map(|pattern| by_text.remove(&pattern)).collect()
}

fn permutations<'a>(parts: &[&'a str]) -> Vec<Vec<&'a str>> {
	if parts.len() <= 1 {
		return vec![parts.to_vec()];
	}

	let mut out = Vec::new();

	for (idx, head) in parts.iter().enumerate() {
		let mut rest = parts.to_vec();

		rest.remove(idx);

		for mut tail in permutations(&rest) {
			tail.insert(0, *head);
			out.push(tail);
		}
	}

	out
}

/// `surname i p` and `i p surname` style forms, treating the first and last tokens in turn as
/// the surname.
fn initials_forms(parts: &[&str]) -> Vec<String> {
	let initial = |part: &str| part.chars().next().map(String::from).unwrap_or_default();
	let mut out = Vec::new();

	for surname_idx in [0, parts.len() - 1] {
		let surname = parts[surname_idx];
		let initials: Vec<String> = parts
			.iter()
			.enumerate()
			.filter(|(idx, _)| *idx != surname_idx)
			.map(|(_, part)| initial(part))
			.collect();
		let joined = initials.join(" ");

		out.push(format!("{surname} {joined}"));
		out.push(format!("{joined} {surname}"));
	}

	out
}
