use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::escalation::Tier;

pub const TRACE_VERSION: u32 = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
	Completed,
	/// Identifier hit; every later tier was bypassed.
	ShortCircuit,
	/// Nothing to run: blank query text or no backend configured.
	Skipped,
	Failed,
	TimedOut,
	DeadlineExceeded,
}
impl StepOutcome {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Completed => "completed",
			Self::ShortCircuit => "short_circuit",
			Self::Skipped => "skipped",
			Self::Failed => "failed",
			Self::TimedOut => "timed_out",
			Self::DeadlineExceeded => "deadline_exceeded",
		}
	}
}

/// One tier attempt.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Step {
	pub tier: Tier,
	pub duration_ms: f64,
	pub candidate_count: usize,
	pub best_score: Option<f32>,
	pub outcome: StepOutcome,
	pub notes: Vec<String>,
}

/// Ordered record of every tier attempted for one query.
///
/// Steps can only be appended. The trace is returned even when tiers fail.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchTrace {
	pub trace_id: Uuid,
	pub trace_version: u32,
	/// blake3 digest of the search and risk policy in effect.
	pub policy_hash: String,
	#[serde(with = "time::serde::rfc3339")]
	pub created_at: OffsetDateTime,
	steps: Vec<Step>,
}
impl SearchTrace {
	pub fn new(policy_hash: impl Into<String>) -> Self {
		Self {
			trace_id: Uuid::new_v4(),
			trace_version: TRACE_VERSION,
			policy_hash: policy_hash.into(),
			created_at: OffsetDateTime::now_utc(),
			steps: Vec::new(),
		}
	}

	pub fn push(&mut self, step: Step) {
		self.steps.push(step);
	}

	pub fn steps(&self) -> &[Step] {
		&self.steps
	}

	pub fn tiers(&self) -> Vec<Tier> {
		self.steps.iter().map(|step| step.tier).collect()
	}
}
