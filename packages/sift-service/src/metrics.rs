use std::{
	collections::BTreeMap,
	sync::atomic::{AtomicU64, Ordering},
	time::Duration,
};

use serde::Serialize;

use crate::{cache::CacheStats, escalation::Tier, trace::StepOutcome};

/// Upper bounds of the latency histogram buckets, in milliseconds. One overflow bucket follows.
pub const LATENCY_BUCKETS_MS: [u64; 9] = [5, 10, 25, 50, 100, 250, 500, 1_000, 2_500];

#[derive(Debug, Default)]
struct TierCounters {
	attempts: AtomicU64,
	failures: AtomicU64,
	timeouts: AtomicU64,
	latency_us: AtomicU64,
	buckets: [AtomicU64; LATENCY_BUCKETS_MS.len() + 1],
}
impl TierCounters {
	fn record(&self, outcome: StepOutcome, elapsed: Duration) {
		self.attempts.fetch_add(1, Ordering::Relaxed);

		match outcome {
			StepOutcome::Failed => {
				self.failures.fetch_add(1, Ordering::Relaxed);
			},
			StepOutcome::TimedOut | StepOutcome::DeadlineExceeded => {
				self.timeouts.fetch_add(1, Ordering::Relaxed);
			},
			_ => {},
		}

		let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
		let millis = micros / 1_000;
		let bucket = LATENCY_BUCKETS_MS
			.iter()
			.position(|upper| millis <= *upper)
			.unwrap_or(LATENCY_BUCKETS_MS.len());

		self.latency_us.fetch_add(micros, Ordering::Relaxed);
		self.buckets[bucket].fetch_add(1, Ordering::Relaxed);
	}

	fn snapshot(&self) -> TierSnapshot {
		TierSnapshot {
			attempts: self.attempts.load(Ordering::Relaxed),
			failures: self.failures.load(Ordering::Relaxed),
			timeouts: self.timeouts.load(Ordering::Relaxed),
			latency_ms_total: self.latency_us.load(Ordering::Relaxed) as f64 / 1_000.0,
			latency_buckets: self.buckets.iter().map(|b| b.load(Ordering::Relaxed)).collect(),
		}
	}
}

/// Process-wide observability counters. Atomic increments only.
#[derive(Debug, Default)]
pub struct Metrics {
	exact: TierCounters,
	fuzzy: TierCounters,
	vector: TierCounters,
}
impl Metrics {
	pub fn record(&self, tier: Tier, outcome: StepOutcome, elapsed: Duration) {
		let counters = match tier {
			Tier::Exact => &self.exact,
			Tier::Fuzzy => &self.fuzzy,
			Tier::Vector => &self.vector,
			Tier::Cache | Tier::Done => return,
		};

		counters.record(outcome, elapsed);
	}

	pub fn snapshot(&self, cache: CacheStats) -> MetricsSnapshot {
		MetricsSnapshot {
			cache,
			tiers: BTreeMap::from([
				(Tier::Exact.as_str().to_string(), self.exact.snapshot()),
				(Tier::Fuzzy.as_str().to_string(), self.fuzzy.snapshot()),
				(Tier::Vector.as_str().to_string(), self.vector.snapshot()),
			]),
		}
	}
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MetricsSnapshot {
	pub cache: CacheStats,
	pub tiers: BTreeMap<String, TierSnapshot>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TierSnapshot {
	pub attempts: u64,
	pub failures: u64,
	pub timeouts: u64,
	pub latency_ms_total: f64,
	/// Counts per `LATENCY_BUCKETS_MS` bucket plus the overflow bucket.
	pub latency_buckets: Vec<u64>,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn buckets_latency_and_counts_outcomes() {
		let metrics = Metrics::default();

		metrics.record(Tier::Exact, StepOutcome::Completed, Duration::from_millis(3));
		metrics.record(Tier::Exact, StepOutcome::TimedOut, Duration::from_secs(10));
		metrics.record(Tier::Cache, StepOutcome::ShortCircuit, Duration::from_millis(1));

		let snapshot = metrics.snapshot(CacheStats::default());
		let exact = &snapshot.tiers["exact"];

		assert_eq!(exact.attempts, 2);
		assert_eq!(exact.timeouts, 1);
		assert_eq!(exact.latency_buckets[0], 1);
		assert_eq!(exact.latency_buckets[LATENCY_BUCKETS_MS.len()], 1);
		assert_eq!(snapshot.tiers["fuzzy"].attempts, 0);
	}
}
