//! Escalation ladder as data: a tier enum plus a pure transition function.

use serde::{Deserialize, Serialize};

use crate::{
	candidate::SearchMode,
	options::{ModeSelection, SearchOptions},
	trace::StepOutcome,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
	Cache,
	Exact,
	Fuzzy,
	Vector,
	Done,
}
impl Tier {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Cache => "cache",
			Self::Exact => "exact",
			Self::Fuzzy => "fuzzy",
			Self::Vector => "vector",
			Self::Done => "done",
		}
	}

	pub fn mode(self) -> Option<SearchMode> {
		match self {
			Self::Cache => Some(SearchMode::Identifier),
			Self::Exact => Some(SearchMode::Exact),
			Self::Fuzzy => Some(SearchMode::Fuzzy),
			Self::Vector => Some(SearchMode::Vector),
			Self::Done => None,
		}
	}

	fn following(self) -> Self {
		match self {
			Self::Cache => Self::Exact,
			Self::Exact => Self::Fuzzy,
			Self::Fuzzy => Self::Vector,
			Self::Vector | Self::Done => Self::Done,
		}
	}

	fn from_mode(mode: SearchMode) -> Self {
		match mode {
			SearchMode::Identifier => Self::Cache,
			SearchMode::Exact => Self::Exact,
			SearchMode::Fuzzy => Self::Fuzzy,
			SearchMode::Vector => Self::Vector,
		}
	}
}

/// The subset of options that drives transitions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EscalationPolicy {
	pub enable_escalation: bool,
	pub escalation_threshold: f32,
	pub search_mode: ModeSelection,
	/// Whether the vector tier is part of the hybrid ladder.
	pub vector_enabled: bool,
}
impl EscalationPolicy {
	pub fn new(options: &SearchOptions, vector_enabled: bool) -> Self {
		Self {
			enable_escalation: options.enable_escalation,
			escalation_threshold: options.escalation_threshold,
			search_mode: options.search_mode,
			vector_enabled,
		}
	}
}

/// What the orchestrator saw after running a tier.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TierObservation {
	pub best_score: Option<f32>,
	pub outcome: StepOutcome,
}

pub fn initial_tier(has_lookup_keys: bool, policy: &EscalationPolicy) -> Tier {
	if has_lookup_keys { Tier::Cache } else { first_search_tier(policy) }
}

pub fn next_tier(current: Tier, observed: &TierObservation, policy: &EscalationPolicy) -> Tier {
	match current {
		Tier::Done => Tier::Done,
		Tier::Cache => match observed.outcome {
			StepOutcome::ShortCircuit | StepOutcome::DeadlineExceeded => Tier::Done,
			_ => first_search_tier(policy),
		},
		Tier::Exact | Tier::Fuzzy | Tier::Vector => {
			if observed.outcome == StepOutcome::DeadlineExceeded
				|| policy.search_mode != ModeSelection::Hybrid
				|| !policy.enable_escalation
				|| meets_threshold(observed.best_score, policy)
			{
				return Tier::Done;
			}

			match current.following() {
				Tier::Vector if !policy.vector_enabled => Tier::Done,
				next => next,
			}
		},
	}
}

/// Human-readable reason for the transition, recorded on the step that caused it.
pub fn transition_note(
	current: Tier,
	observed: &TierObservation,
	next: Tier,
	policy: &EscalationPolicy,
) -> String {
	let threshold = policy.escalation_threshold;

	match (current, next) {
		(Tier::Cache, Tier::Done) if observed.outcome == StepOutcome::ShortCircuit =>
			"short_circuit: identifier hit".to_string(),
		(Tier::Cache, _) => "cache miss".to_string(),
		(_, Tier::Done) if observed.outcome == StepOutcome::DeadlineExceeded =>
			"stop: query deadline exceeded".to_string(),
		(_, Tier::Done) if policy.search_mode != ModeSelection::Hybrid =>
			format!("stop: search mode pinned to {}", current.as_str()),
		(_, Tier::Done) if !policy.enable_escalation => "stop: escalation disabled".to_string(),
		(_, Tier::Done) if meets_threshold(observed.best_score, policy) => format!(
			"stop: best score {:.3} meets threshold {threshold:.3}",
			observed.best_score.unwrap_or_default()
		),
		(_, Tier::Done) => "stop: no further tiers".to_string(),
		(_, next) => match observed.best_score {
			Some(best) => format!(
				"escalation triggered: best score {best:.3} below threshold {threshold:.3}, next {}",
				next.as_str()
			),
			None => format!("escalation triggered: no candidates, next {}", next.as_str()),
		},
	}
}

fn first_search_tier(policy: &EscalationPolicy) -> Tier {
	match policy.search_mode.forced() {
		Some(mode) => Tier::from_mode(mode),
		None => Tier::Exact,
	}
}

fn meets_threshold(best: Option<f32>, policy: &EscalationPolicy) -> bool {
	best.map(|score| score >= policy.escalation_threshold).unwrap_or(false)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn hybrid() -> EscalationPolicy {
		EscalationPolicy {
			enable_escalation: true,
			escalation_threshold: 0.8,
			search_mode: ModeSelection::Hybrid,
			vector_enabled: true,
		}
	}

	fn seen(best_score: Option<f32>) -> TierObservation {
		TierObservation { best_score, outcome: StepOutcome::Completed }
	}

	#[test]
	fn walks_the_ladder_while_scores_stay_low() {
		let policy = hybrid();
		let mut tier = initial_tier(false, &policy);
		let mut visited = Vec::new();

		while tier != Tier::Done {
			visited.push(tier);

			tier = next_tier(tier, &seen(Some(0.5)), &policy);
		}

		assert_eq!(visited, vec![Tier::Exact, Tier::Fuzzy, Tier::Vector]);
	}

	#[test]
	fn stops_when_threshold_is_met() {
		assert_eq!(next_tier(Tier::Exact, &seen(Some(0.8)), &hybrid()), Tier::Done);
		assert_eq!(next_tier(Tier::Exact, &seen(Some(0.79)), &hybrid()), Tier::Fuzzy);
	}

	#[test]
	fn cache_hit_short_circuits_and_miss_enters_first_tier() {
		let policy = hybrid();
		let hit = TierObservation { best_score: Some(1.0), outcome: StepOutcome::ShortCircuit };

		assert_eq!(initial_tier(true, &policy), Tier::Cache);
		assert_eq!(next_tier(Tier::Cache, &hit, &policy), Tier::Done);
		assert_eq!(next_tier(Tier::Cache, &seen(None), &policy), Tier::Exact);
	}

	#[test]
	fn disabled_escalation_stops_after_first_tier() {
		let policy = EscalationPolicy { enable_escalation: false, ..hybrid() };

		assert_eq!(next_tier(Tier::Exact, &seen(None), &policy), Tier::Done);
	}

	#[test]
	fn vector_is_skipped_when_disabled() {
		let policy = EscalationPolicy { vector_enabled: false, ..hybrid() };

		assert_eq!(next_tier(Tier::Fuzzy, &seen(None), &policy), Tier::Done);
	}

	#[test]
	fn failures_and_timeouts_still_escalate() {
		let policy = hybrid();

		for outcome in [StepOutcome::Failed, StepOutcome::TimedOut, StepOutcome::Skipped] {
			let observed = TierObservation { best_score: None, outcome };

			assert_eq!(next_tier(Tier::Exact, &observed, &policy), Tier::Fuzzy);
		}
	}

	#[test]
	fn pinned_mode_runs_one_tier() {
		let policy = EscalationPolicy { search_mode: ModeSelection::Fuzzy, ..hybrid() };

		assert_eq!(initial_tier(false, &policy), Tier::Fuzzy);
		assert_eq!(next_tier(Tier::Cache, &seen(None), &policy), Tier::Fuzzy);
		assert_eq!(next_tier(Tier::Fuzzy, &seen(Some(0.1)), &policy), Tier::Done);
	}

	#[test]
	fn deadline_ends_the_ladder() {
		let observed = TierObservation { best_score: None, outcome: StepOutcome::DeadlineExceeded };

		assert_eq!(next_tier(Tier::Exact, &observed, &hybrid()), Tier::Done);
	}
}
