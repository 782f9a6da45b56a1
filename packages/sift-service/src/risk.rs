//! Policy-driven score fusion. Everything here is pure.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{
	Result,
	candidate::{Candidate, SearchMode, clamp_score},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
	Low,
	Medium,
	High,
}
impl RiskLevel {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Low => "low",
			Self::Medium => "medium",
			Self::High => "high",
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Corroboration {
	Tin,
	Dob,
}

/// Upstream confidences, each in `[0, 1]`. Missing signals count as zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamSignals {
	pub smartfilter: f32,
	pub person: f32,
	pub organization: f32,
}

/// Which corroborating identifiers the query carried.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueryEvidence {
	pub has_tin: bool,
	pub has_birth_date: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RiskPolicy {
	pub medium_threshold: f32,
	pub high_threshold: f32,
	pub high_confidence_score: f32,
	pub corroboration_bonus: f32,
	pub high_confidence_bonus: f32,
	pub weights: RiskWeights,
}
impl RiskPolicy {
	pub fn from_config(cfg: &sift_config::Risk) -> Result<Self> {
		sift_config::validate_risk(cfg)?;

		let weights = &cfg.weights;

		Ok(Self {
			medium_threshold: cfg.medium_threshold,
			high_threshold: cfg.high_threshold,
			high_confidence_score: cfg.high_confidence_score,
			corroboration_bonus: cfg.corroboration_bonus,
			high_confidence_bonus: cfg.high_confidence_bonus,
			weights: RiskWeights {
				smartfilter: weights.smartfilter,
				person: weights.person,
				organization: weights.organization,
				similarity: weights.similarity,
				identifier: weights.identifier,
				exact: weights.exact,
				fuzzy: weights.fuzzy,
				vector: weights.vector,
			},
		})
	}

	/// `high` at or above `high_threshold`, `medium` at or above `medium_threshold`.
	pub fn level_for(&self, total: f32) -> RiskLevel {
		if total >= self.high_threshold {
			RiskLevel::High
		} else if total >= self.medium_threshold {
			RiskLevel::Medium
		} else {
			RiskLevel::Low
		}
	}
}
impl Default for RiskPolicy {
	fn default() -> Self {
		let cfg = sift_config::Risk::default();

		Self {
			medium_threshold: cfg.medium_threshold,
			high_threshold: cfg.high_threshold,
			high_confidence_score: cfg.high_confidence_score,
			corroboration_bonus: cfg.corroboration_bonus,
			high_confidence_bonus: cfg.high_confidence_bonus,
			weights: RiskWeights::default(),
		}
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RiskWeights {
	pub smartfilter: f32,
	pub person: f32,
	pub organization: f32,
	pub similarity: f32,
	pub identifier: f32,
	pub exact: f32,
	pub fuzzy: f32,
	pub vector: f32,
}
impl RiskWeights {
	pub fn for_mode(&self, mode: SearchMode) -> f32 {
		match mode {
			SearchMode::Identifier => self.identifier,
			SearchMode::Exact => self.exact,
			SearchMode::Fuzzy => self.fuzzy,
			SearchMode::Vector => self.vector,
		}
	}
}
impl Default for RiskWeights {
	fn default() -> Self {
		let cfg = sift_config::RiskWeights::default();

		Self {
			smartfilter: cfg.smartfilter,
			person: cfg.person,
			organization: cfg.organization,
			similarity: cfg.similarity,
			identifier: cfg.identifier,
			exact: cfg.exact,
			fuzzy: cfg.fuzzy,
			vector: cfg.vector,
		}
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
	pub smartfilter: f32,
	pub person: f32,
	pub organization: f32,
	pub similarity: f32,
	pub search: f32,
	pub total: f32,
	pub risk_level: RiskLevel,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Decision {
	pub risk_level: RiskLevel,
	pub score: f32,
	pub breakdown: ScoreBreakdown,
	pub requires_corroboration: BTreeSet<Corroboration>,
	pub reasons: Vec<String>,
}

/// Fuses candidate scores and upstream signals into a decision.
///
/// The search contribution sums `weight(mode) * best score for mode` over the distinct modes
/// present, plus the corroboration bonus when one entity was found by two or more modes and
/// the high-confidence bonus when any candidate reaches `high_confidence_score`. Every
/// contribution and the total are clamped to `[0, 1]`.
///
/// A `high` result on a query without a validated TIN or date of birth keeps its level and
/// lists the missing evidence in `requires_corroboration`.
pub fn decide(
	candidates: &[Candidate],
	signals: &UpstreamSignals,
	evidence: QueryEvidence,
	policy: &RiskPolicy,
) -> Decision {
	let weights = &policy.weights;
	let mut reasons = Vec::new();
	let smartfilter = clamp_score(weights.smartfilter * clamp_score(signals.smartfilter));
	let person = clamp_score(weights.person * clamp_score(signals.person));
	let organization = clamp_score(weights.organization * clamp_score(signals.organization));
	let top = candidates.iter().max_by(|a, b| a.score.total_cmp(&b.score));
	let similarity = clamp_score(weights.similarity * top.map(|c| c.score).unwrap_or(0.0));

	if let Some(top) = top {
		reasons.push(format!(
			"top candidate {} via {} scored {:.3}",
			top.entity_id,
			top.mode.as_str(),
			top.score
		));
	} else {
		reasons.push("no candidates".to_string());
	}

	let modes: BTreeSet<SearchMode> =
		candidates.iter().flat_map(|candidate| candidate.modes.iter().copied()).collect();
	let mut search = 0.0_f32;

	for mode in modes {
		let best = candidates
			.iter()
			.filter_map(|candidate| candidate.score_for(mode))
			.fold(0.0_f32, f32::max);

		search += weights.for_mode(mode) * best;
	}

	if let Some(agreed) = candidates.iter().find(|candidate| candidate.modes.len() > 1) {
		search += policy.corroboration_bonus;

		reasons.push(format!(
			"{} modes agree on entity {}",
			agreed.modes.len(),
			agreed.entity_id
		));
	}
	if let Some(strong) =
		candidates.iter().find(|candidate| candidate.score >= policy.high_confidence_score)
	{
		search += policy.high_confidence_bonus;

		reasons.push(format!(
			"entity {} reached high confidence score {:.3}",
			strong.entity_id, policy.high_confidence_score
		));
	}

	let search = clamp_score(search);
	let total = clamp_score(smartfilter + person + organization + similarity + search);
	let risk_level = policy.level_for(total);
	let mut requires_corroboration = BTreeSet::new();

	reasons.push(format!("risk level {} at total {total:.3}", risk_level.as_str()));

	if risk_level == RiskLevel::High {
		if !evidence.has_tin {
			requires_corroboration.insert(Corroboration::Tin);
		}
		if !evidence.has_birth_date {
			requires_corroboration.insert(Corroboration::Dob);
		}

		if !requires_corroboration.is_empty() {
			let missing: Vec<&str> = requires_corroboration
				.iter()
				.map(|item| match item {
					Corroboration::Tin => "tin",
					Corroboration::Dob => "dob",
				})
				.collect();

			reasons.push(format!("corroboration required: {}", missing.join(", ")));
		}
	}

	Decision {
		risk_level,
		score: total,
		breakdown: ScoreBreakdown {
			smartfilter,
			person,
			organization,
			similarity,
			search,
			total,
			risk_level,
		},
		requires_corroboration,
		reasons,
	}
}

#[cfg(test)]
mod tests {
	use sift_domain::EntityKind;

	use super::*;

	fn candidate(id: &str, score: f32, mode: SearchMode) -> Candidate {
		Candidate::new(id, EntityKind::Person, "ivanov ivan", score, mode)
	}

	#[test]
	fn exact_hit_is_high_with_default_weights() {
		let decision = decide(
			&[candidate("42", 0.95, SearchMode::Exact)],
			&UpstreamSignals::default(),
			QueryEvidence::default(),
			&RiskPolicy::default(),
		);

		assert_eq!(decision.risk_level, RiskLevel::High);
		assert!((decision.breakdown.search - 0.575).abs() < 1e-6);
		assert!((decision.score - 0.8125).abs() < 1e-6);
	}

	#[test]
	fn lone_fuzzy_match_is_low() {
		let decision = decide(
			&[candidate("7", 0.62, SearchMode::Fuzzy)],
			&UpstreamSignals::default(),
			QueryEvidence::default(),
			&RiskPolicy::default(),
		);

		assert_eq!(decision.risk_level, RiskLevel::Low);
		assert!(decision.requires_corroboration.is_empty());
	}

	#[test]
	fn agreeing_modes_earn_the_corroboration_bonus() {
		let mut merged = candidate("7", 0.62, SearchMode::Fuzzy);

		merged.absorb(candidate("7", 0.6, SearchMode::Vector));

		let decision = decide(
			&[merged],
			&UpstreamSignals::default(),
			QueryEvidence::default(),
			&RiskPolicy::default(),
		);

		// 0.25*0.62 + (0.35*0.62 + 0.25*0.6 + 0.1)
		assert!((decision.score - 0.622).abs() < 1e-5);
		assert_eq!(decision.risk_level, RiskLevel::Medium);
	}

	#[test]
	fn upstream_signals_are_weighted() {
		let decision = decide(
			&[],
			&UpstreamSignals { smartfilter: 1.0, person: 1.0, organization: 0.0 },
			QueryEvidence::default(),
			&RiskPolicy::default(),
		);

		assert!((decision.breakdown.smartfilter - 0.15).abs() < 1e-6);
		assert!((decision.breakdown.person - 0.1).abs() < 1e-6);
		assert_eq!(decision.breakdown.search, 0.0);
		assert_eq!(decision.risk_level, RiskLevel::Low);
	}

	#[test]
	fn corroboration_lists_only_missing_evidence() {
		let candidates = [candidate("42", 1.0, SearchMode::Exact)];
		let policy = RiskPolicy::default();
		let signals = UpstreamSignals::default();
		let none = decide(&candidates, &signals, QueryEvidence::default(), &policy);
		let tin_only = decide(
			&candidates,
			&signals,
			QueryEvidence { has_tin: true, has_birth_date: false },
			&policy,
		);
		let both =
			decide(&candidates, &signals, QueryEvidence { has_tin: true, has_birth_date: true }, &policy);

		assert_eq!(
			none.requires_corroboration,
			BTreeSet::from([Corroboration::Tin, Corroboration::Dob])
		);
		assert_eq!(tin_only.requires_corroboration, BTreeSet::from([Corroboration::Dob]));
		assert!(both.requires_corroboration.is_empty());
		assert_eq!(both.risk_level, RiskLevel::High);
	}

	#[test]
	fn threshold_boundaries_are_inclusive() {
		let policy = RiskPolicy::default();
		let below_medium = f32::from_bits(policy.medium_threshold.to_bits() - 1);

		assert_eq!(policy.level_for(policy.high_threshold), RiskLevel::High);
		assert_eq!(policy.level_for(policy.medium_threshold), RiskLevel::Medium);
		assert_eq!(policy.level_for(below_medium), RiskLevel::Low);
	}
}
