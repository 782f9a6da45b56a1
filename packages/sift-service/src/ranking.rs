use std::{cmp::Ordering, collections::BTreeMap};

use sift_domain::text;

use crate::candidate::Candidate;

/// Score descending, then token overlap descending, then entity id ascending.
pub fn compare(a: &Candidate, b: &Candidate) -> Ordering {
	b.score
		.total_cmp(&a.score)
		.then_with(|| b.token_overlap.total_cmp(&a.token_overlap))
		.then_with(|| a.entity_id.cmp(&b.entity_id))
}

/// Collapses candidates that share an entity id.
pub fn merge(candidates: Vec<Candidate>) -> Vec<Candidate> {
	let mut by_entity: BTreeMap<String, Candidate> = BTreeMap::new();

	for candidate in candidates {
		match by_entity.get_mut(&candidate.entity_id) {
			Some(existing) => existing.absorb(candidate),
			None => {
				by_entity.insert(candidate.entity_id.clone(), candidate);
			},
		}
	}

	by_entity.into_values().collect()
}

/// Merges, refreshes tie-break overlap against the folded query, sorts and truncates.
pub fn rank(candidates: Vec<Candidate>, folded_query: &str, top_k: u32) -> Vec<Candidate> {
	let mut merged = merge(candidates);

	for candidate in &mut merged {
		candidate.token_overlap =
			text::token_overlap(folded_query, &text::fold_text(&candidate.matched_text));
	}

	merged.sort_by(compare);
	merged.truncate(top_k as usize);

	merged
}
