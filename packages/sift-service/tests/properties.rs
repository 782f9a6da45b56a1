use std::collections::BTreeSet;

use proptest::prelude::*;

use sift_domain::EntityKind;
use sift_service::{
	Candidate, ModeSelection, QueryEvidence, RiskLevel, RiskPolicy, SearchMode, StepOutcome,
	UpstreamSignals,
	escalation::{self, EscalationPolicy, Tier, TierObservation},
	ranking, risk,
};

fn mode_strategy() -> impl Strategy<Value = SearchMode> {
	prop_oneof![
		Just(SearchMode::Identifier),
		Just(SearchMode::Exact),
		Just(SearchMode::Fuzzy),
		Just(SearchMode::Vector),
	]
}

fn candidate_strategy() -> impl Strategy<Value = Candidate> {
	(0_u8..6, -0.5_f32..1.5, mode_strategy(), "[a-c]{1,3}( [a-c]{1,3})?").prop_map(
		|(id, score, mode, text)| {
			Candidate::new(id.to_string(), EntityKind::Person, text, score, mode)
		},
	)
}

proptest! {
	#[test]
	fn ranking_is_bounded_sorted_and_unique(
		candidates in prop::collection::vec(candidate_strategy(), 0..24),
		top_k in 1_u32..8,
	) {
		let ranked = ranking::rank(candidates.clone(), "a b", top_k);
		let ids: BTreeSet<_> = ranked.iter().map(|c| c.entity_id.clone()).collect();

		prop_assert!(ranked.len() <= top_k as usize);
		prop_assert_eq!(ids.len(), ranked.len());

		for pair in ranked.windows(2) {
			prop_assert!(ranking::compare(&pair[0], &pair[1]).is_le());
		}
		for candidate in &ranked {
			prop_assert!((0.0..=1.0).contains(&candidate.score));

			let best = candidates
				.iter()
				.filter(|c| c.entity_id == candidate.entity_id)
				.map(|c| c.score)
				.fold(0.0_f32, f32::max);

			prop_assert_eq!(candidate.score, best);
		}

		prop_assert_eq!(ranked, ranking::rank(candidates, "a b", top_k));
	}

	#[test]
	fn decision_total_is_bounded_and_level_matches(
		candidates in prop::collection::vec(candidate_strategy(), 0..12),
		smartfilter in 0.0_f32..=1.0,
		person in 0.0_f32..=1.0,
		organization in 0.0_f32..=1.0,
		has_tin in any::<bool>(),
		has_birth_date in any::<bool>(),
	) {
		let policy = RiskPolicy::default();
		let merged = ranking::rank(candidates, "a", 10);
		let decision = risk::decide(
			&merged,
			&UpstreamSignals { smartfilter, person, organization },
			QueryEvidence { has_tin, has_birth_date },
			&policy,
		);
		let breakdown = &decision.breakdown;

		for part in [
			breakdown.smartfilter,
			breakdown.person,
			breakdown.organization,
			breakdown.similarity,
			breakdown.search,
			breakdown.total,
		] {
			prop_assert!((0.0..=1.0).contains(&part));
		}

		prop_assert_eq!(decision.risk_level, policy.level_for(decision.score));

		if decision.risk_level != RiskLevel::High {
			prop_assert!(decision.requires_corroboration.is_empty());
		}
		if has_tin && has_birth_date {
			prop_assert!(decision.requires_corroboration.is_empty());
		}
	}

	#[test]
	fn escalation_visits_tiers_in_order_and_terminates(
		scores in prop::collection::vec(prop::option::of(0.0_f32..=1.0), 4),
		enable_escalation in any::<bool>(),
		vector_enabled in any::<bool>(),
		has_keys in any::<bool>(),
		threshold in 0.0_f32..=1.0,
	) {
		let policy = EscalationPolicy {
			enable_escalation,
			escalation_threshold: threshold,
			search_mode: ModeSelection::Hybrid,
			vector_enabled,
		};
		let mut tier = escalation::initial_tier(has_keys, &policy);
		let mut visited = Vec::new();

		while tier != Tier::Done {
			prop_assert!(visited.len() < 4);

			let best_score = scores[visited.len()];
			let outcome = if tier == Tier::Cache && best_score.is_some() {
				StepOutcome::ShortCircuit
			} else {
				StepOutcome::Completed
			};
			let current = tier;

			visited.push(current);

			tier = escalation::next_tier(current, &TierObservation { best_score, outcome }, &policy);
		}

		for pair in visited.windows(2) {
			prop_assert!(pair[0] < pair[1]);
		}
		if !vector_enabled {
			prop_assert!(!visited.contains(&Tier::Vector));
		}
		if let Some(first_search) = visited.iter().position(|tier| *tier != Tier::Cache) {
			let score = scores[first_search];

			if score.map(|s| s >= threshold).unwrap_or(false) || !enable_escalation {
				prop_assert_eq!(visited.len(), first_search + 1);
			}
		}
	}
}
