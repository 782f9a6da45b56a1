//! In-process approximate matcher over a bounded candidate pool.

use std::{
	collections::{HashMap, HashSet},
	sync::{
		Arc,
		atomic::{AtomicBool, Ordering},
	},
};

use serde::Serialize;

use sift_domain::{WatchlistEntity, text};

use crate::{
	Result,
	candidate::{Candidate, SearchMode, clamp_score},
	options::SearchOptions,
	ranking,
};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FuzzyParams {
	pub edit_weight: f32,
	pub token_weight: f32,
	pub min_edit_cutoff: usize,
	pub edit_cutoff_divisor: usize,
	pub max_pool: usize,
	pub prefix_len: usize,
}
impl FuzzyParams {
	pub fn from_config(cfg: &sift_config::Fuzzy) -> Result<Self> {
		sift_config::validate_fuzzy(cfg)?;

		Ok(Self {
			edit_weight: cfg.edit_weight,
			token_weight: cfg.token_weight,
			min_edit_cutoff: cfg.min_edit_cutoff as usize,
			edit_cutoff_divisor: cfg.edit_cutoff_divisor as usize,
			max_pool: cfg.max_pool as usize,
			prefix_len: cfg.prefix_len as usize,
		})
	}

	/// Largest edit distance a candidate may have: `max(min_edit_cutoff, chars / divisor)`.
	pub fn edit_cutoff(&self, query_chars: usize) -> usize {
		self.min_edit_cutoff.max(query_chars / self.edit_cutoff_divisor.max(1))
	}
}
impl Default for FuzzyParams {
	fn default() -> Self {
		let cfg = sift_config::Fuzzy::default();

		Self {
			edit_weight: cfg.edit_weight,
			token_weight: cfg.token_weight,
			min_edit_cutoff: cfg.min_edit_cutoff as usize,
			edit_cutoff_divisor: cfg.edit_cutoff_divisor as usize,
			max_pool: cfg.max_pool as usize,
			prefix_len: cfg.prefix_len as usize,
		}
	}
}

struct PoolEntry {
	entity: usize,
	field: &'static str,
	surface: String,
	folded: String,
	sorted: String,
	chars: usize,
}

/// Folded surface forms of the watchlist, built once and shared read-only across queries.
pub struct CandidatePool {
	entities: Vec<Arc<WatchlistEntity>>,
	entries: Vec<PoolEntry>,
	prefix_index: HashMap<String, Vec<usize>>,
	prefix_len: usize,
}
impl CandidatePool {
	pub fn new(entities: &[Arc<WatchlistEntity>], prefix_len: usize) -> Self {
		let prefix_len = prefix_len.max(1);
		let mut entries = Vec::new();
		let mut prefix_index: HashMap<String, Vec<usize>> = HashMap::new();

		for (entity_idx, entity) in entities.iter().enumerate() {
			for (field, surface) in entity.surface_forms() {
				let folded = text::fold_text(surface);

				if folded.is_empty() {
					continue;
				}

				let entry_idx = entries.len();
				let prefixes: HashSet<String> =
					text::tokens(&folded).into_iter().map(|token| prefix(token, prefix_len)).collect();

				for key in prefixes {
					prefix_index.entry(key).or_default().push(entry_idx);
				}

				entries.push(PoolEntry {
					entity: entity_idx,
					field,
					surface: surface.to_string(),
					sorted: text::sorted_tokens(&folded),
					chars: folded.chars().count(),
					folded,
				});
			}
		}

		Self { entities: entities.to_vec(), entries, prefix_index, prefix_len }
	}

	/// Number of surface forms, not entities.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Entries worth scoring, at most `max_pool`. Above the cap, entries sharing more token
	/// prefixes with the query win, ties broken by pool order.
	fn shortlist(&self, folded_query: &str, max_pool: usize) -> Vec<usize> {
		if self.entries.len() <= max_pool {
			return (0..self.entries.len()).collect();
		}

		let query_prefixes: HashSet<String> = text::tokens(folded_query)
			.into_iter()
			.map(|token| prefix(token, self.prefix_len))
			.collect();
		let mut shared: HashMap<usize, u32> = HashMap::new();

		for key in &query_prefixes {
			if let Some(indices) = self.prefix_index.get(key) {
				for idx in indices {
					*shared.entry(*idx).or_default() += 1;
				}
			}
		}

		let mut ranked: Vec<(usize, u32)> = shared.into_iter().collect();

		ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
		ranked.truncate(max_pool);

		ranked.into_iter().map(|(idx, _)| idx).collect()
	}
}

/// Scores the pool against `query_text`.
///
/// Edit distance is taken on the folded text and on its sorted-token form, whichever is
/// smaller, so reordered names are not penalized. Entries beyond the edit cutoff are rejected
/// before scoring. Each entity keeps its best surface form.
pub fn search(
	query_text: &str,
	pool: &CandidatePool,
	params: &FuzzyParams,
	options: &SearchOptions,
) -> Vec<Candidate> {
	search_until(query_text, pool, params, options, &AtomicBool::new(false))
}

/// Same as [`search`], but stops and returns nothing once `cancel` is raised.
pub fn search_until(
	query_text: &str,
	pool: &CandidatePool,
	params: &FuzzyParams,
	options: &SearchOptions,
	cancel: &AtomicBool,
) -> Vec<Candidate> {
	let query = text::fold_text(query_text);

	if query.is_empty() || pool.is_empty() {
		return Vec::new();
	}

	let query_sorted = text::sorted_tokens(&query);
	let query_chars = query.chars().count();
	let cutoff = params.edit_cutoff(query_chars);
	let mut best: HashMap<usize, (f32, f32, usize)> = HashMap::new();

	for idx in pool.shortlist(&query, params.max_pool) {
		if cancel.load(Ordering::Relaxed) {
			return Vec::new();
		}

		let entry = &pool.entries[idx];

		if entry.chars.abs_diff(query_chars) > cutoff {
			continue;
		}

		let distance = strsim::levenshtein(&query, &entry.folded)
			.min(strsim::levenshtein(&query_sorted, &entry.sorted));

		if distance > cutoff {
			continue;
		}

		let longest = query_chars.max(entry.chars).max(1);
		let edit_ratio = 1.0 - distance as f32 / longest as f32;
		let overlap = text::token_overlap(&query, &entry.folded);
		let score = clamp_score(params.edit_weight * edit_ratio + params.token_weight * overlap);

		if score < options.score_threshold {
			continue;
		}

		match best.get_mut(&entry.entity) {
			Some(slot) if (score, overlap) > (slot.0, slot.1) => *slot = (score, overlap, idx),
			Some(_) => {},
			None => {
				best.insert(entry.entity, (score, overlap, idx));
			},
		}
	}

	let mut out: Vec<Candidate> = best
		.into_values()
		.map(|(score, overlap, idx)| {
			let entry = &pool.entries[idx];
			let entity = &pool.entities[entry.entity];
			let mut candidate =
				Candidate::from_entity(entity, entry.surface.clone(), score, SearchMode::Fuzzy)
					.with_field(entry.field, entry.surface.clone());

			candidate.token_overlap = overlap;

			candidate
		})
		.collect();

	out.sort_by(ranking::compare);
	out.truncate(options.top_k as usize);

	out
}

fn prefix(token: &str, len: usize) -> String {
	token.chars().take(len).collect()
}

#[cfg(test)]
mod tests {
	use sift_domain::EntityKind;

	use super::*;

	fn person(id: &str, name: &str) -> Arc<WatchlistEntity> {
		Arc::new(WatchlistEntity {
			entity_id: id.to_string(),
			kind: EntityKind::Person,
			names: vec![name.to_string()],
			aliases: Vec::new(),
			identifiers: Vec::new(),
			birth_date: None,
			metadata: Default::default(),
		})
	}

	#[test]
	fn cutoff_grows_with_query_length() {
		let params = FuzzyParams::default();

		assert_eq!(params.edit_cutoff(4), 3);
		assert_eq!(params.edit_cutoff(15), 3);
		assert_eq!(params.edit_cutoff(30), 6);
	}

	#[test]
	fn tolerates_typos_and_word_order() {
		let pool = CandidatePool::new(&[person("7", "Petrov Petr"), person("8", "Smirnova Anna")], 3);
		let options = SearchOptions::default();
		let typo = search("Petrov Pyotr", &pool, &FuzzyParams::default(), &options);
		let reordered = search("Petr Petrov", &pool, &FuzzyParams::default(), &options);

		assert_eq!(typo.len(), 1);
		assert_eq!(typo[0].entity_id, "7");
		assert!(typo[0].score < 1.0);
		assert_eq!(reordered[0].entity_id, "7");
		assert_eq!(reordered[0].score, 1.0);
	}

	#[test]
	fn rejects_beyond_edit_cutoff() {
		let pool = CandidatePool::new(&[person("1", "Alexandrov Alexander")], 3);
		let hits = search("Ivanov", &pool, &FuzzyParams::default(), &SearchOptions::default());

		assert!(hits.is_empty());
	}

	#[test]
	fn shortlist_is_capped_and_prefers_shared_prefixes() {
		let mut entities: Vec<_> =
			(0..50).map(|i| person(&format!("x{i}"), &format!("Zzz{i} Qqq"))).collect();

		entities.push(person("target", "Petrov Petr"));

		let pool = CandidatePool::new(&entities, 3);
		let shortlist = pool.shortlist("petrov petr", 5);

		assert!(shortlist.len() <= 5);
		assert_eq!(pool.entries[shortlist[0]].surface, "Petrov Petr");

		let params = FuzzyParams { max_pool: 5, ..FuzzyParams::default() };
		let hits = search("Petrov Petr", &pool, &params, &SearchOptions::default());

		assert_eq!(hits[0].entity_id, "target");
	}

	#[test]
	fn raised_cancel_flag_stops_the_scan() {
		let pool = CandidatePool::new(&[person("1", "Petrov Petr")], 3);
		let hits = search_until(
			"Petrov Petr",
			&pool,
			&FuzzyParams::default(),
			&SearchOptions::default(),
			&AtomicBool::new(true),
		);

		assert!(hits.is_empty());
	}
}
