use std::{
	future::Future,
	sync::Arc,
	time::{Duration, Instant},
};

use sift_domain::SanitizedQuery;

use crate::{
	ExactBackend, Result, VectorBackend, VectorQuery, backends,
	cache::IdentifierCache,
	candidate::{Candidate, SearchMode},
	escalation::{self, EscalationPolicy, Tier, TierObservation},
	fuzzy::{self, CandidatePool, FuzzyParams},
	metrics::Metrics,
	options::SearchOptions,
	ranking,
	trace::{SearchTrace, Step, StepOutcome},
};

/// Ranked candidates plus the trace that produced them.
#[derive(Clone, Debug)]
pub struct SearchOutcome {
	pub candidates: Vec<Candidate>,
	pub trace: SearchTrace,
}

struct TierRun {
	candidates: Vec<Candidate>,
	outcome: StepOutcome,
	notes: Vec<String>,
}
impl TierRun {
	fn completed(candidates: Vec<Candidate>) -> Self {
		Self { candidates, outcome: StepOutcome::Completed, notes: Vec::new() }
	}

	fn without_candidates(outcome: StepOutcome, note: impl Into<String>) -> Self {
		Self { candidates: Vec::new(), outcome, notes: vec![note.into()] }
	}
}

/// Runs the escalation ladder for one query. Shared read-only state only; safe to call from
/// many tasks at once.
pub struct SearchEngine {
	cache: Arc<IdentifierCache>,
	exact: Arc<dyn ExactBackend>,
	pool: Arc<CandidatePool>,
	fuzzy: FuzzyParams,
	vector: Option<Arc<dyn VectorBackend>>,
	metrics: Arc<Metrics>,
}
impl SearchEngine {
	pub fn new(
		cache: Arc<IdentifierCache>,
		exact: Arc<dyn ExactBackend>,
		pool: Arc<CandidatePool>,
		fuzzy: FuzzyParams,
		vector: Option<Arc<dyn VectorBackend>>,
		metrics: Arc<Metrics>,
	) -> Self {
		Self { cache, exact, pool, fuzzy, vector, metrics }
	}

	pub fn vector_enabled(&self) -> bool {
		self.vector.is_some()
	}

	pub async fn search(
		&self,
		query: &SanitizedQuery,
		embedding: Option<&[f32]>,
		options: &SearchOptions,
		policy_hash: &str,
	) -> SearchOutcome {
		let deadline = Instant::now() + options.query_deadline();
		let policy = EscalationPolicy::new(options, self.vector_enabled());
		let mut trace = SearchTrace::new(policy_hash);
		let mut gathered = Vec::new();
		let mut tier = escalation::initial_tier(!query.lookup_keys.is_empty(), &policy);

		while tier != Tier::Done {
			let started = Instant::now();
			let remaining = deadline.saturating_duration_since(started);
			let mut run = if remaining.is_zero() {
				TierRun::without_candidates(StepOutcome::DeadlineExceeded, "deadline_exceeded")
			} else {
				self.run_tier(tier, query, embedding, options, remaining).await
			};

			run.candidates.retain(|candidate| candidate.score >= options.score_threshold);

			let elapsed = started.elapsed();
			let best_score = run.candidates.iter().map(|candidate| candidate.score).reduce(f32::max);
			let observed = TierObservation { best_score, outcome: run.outcome };
			let next = escalation::next_tier(tier, &observed, &policy);

			run.notes.push(escalation::transition_note(tier, &observed, next, &policy));

			self.metrics.record(tier, run.outcome, elapsed);

			tracing::debug!(
				tier = tier.as_str(),
				outcome = run.outcome.as_str(),
				elapsed_ms = elapsed.as_millis() as u64,
				candidate_count = run.candidates.len(),
				next = next.as_str(),
				"Search tier finished."
			);

			trace.push(Step {
				tier,
				duration_ms: elapsed.as_secs_f64() * 1_000.0,
				candidate_count: run.candidates.len(),
				best_score,
				outcome: run.outcome,
				notes: run.notes,
			});
			gathered.extend(run.candidates);

			tier = next;
		}

		SearchOutcome {
			candidates: ranking::rank(gathered, &query.folded_text, options.top_k),
			trace,
		}
	}

	async fn run_tier(
		&self,
		tier: Tier,
		query: &SanitizedQuery,
		embedding: Option<&[f32]>,
		options: &SearchOptions,
		remaining: Duration,
	) -> TierRun {
		if tier != Tier::Cache && query.folded_text.is_empty() {
			return TierRun::without_candidates(StepOutcome::Skipped, "skipped: empty query text");
		}

		match tier {
			Tier::Cache => self.run_cache(query),
			Tier::Exact => {
				let backend = self.exact.name();
				let mut run = guarded(
					tier,
					options.per_tier_timeout(),
					remaining,
					self.exact.search(&query.folded_text, options),
				)
				.await;

				run.notes.insert(0, format!("backend {backend}"));

				run
			},
			Tier::Fuzzy => {
				let pool = self.pool.clone();
				let params = self.fuzzy.clone();
				let text = query.folded_text.clone();
				let task_options = options.clone();
				let task = backends::run_blocking("Fuzzy matcher", move |cancel| {
					fuzzy::search_until(&text, &pool, &params, &task_options, cancel)
				});
				let mut run = guarded(tier, options.per_tier_timeout(), remaining, task).await;

				run.notes.insert(0, format!("pool {} surface forms", self.pool.len()));

				run
			},
			Tier::Vector => {
				let Some(vector) = self.vector.as_ref() else {
					return TierRun::without_candidates(
						StepOutcome::Skipped,
						"skipped: vector backend disabled",
					);
				};
				let vector_query = VectorQuery {
					text: query.folded_text.clone(),
					embedding: embedding.map(<[f32]>::to_vec),
				};
				let mut run = guarded(
					tier,
					options.per_tier_timeout(),
					remaining,
					vector.search(&vector_query, options),
				)
				.await;

				run.notes.insert(0, format!("backend {}", vector.name()));

				run
			},
			Tier::Done => TierRun::completed(Vec::new()),
		}
	}

	fn run_cache(&self, query: &SanitizedQuery) -> TierRun {
		match self.cache.lookup_any(&query.lookup_keys) {
			Some((key, entity)) => {
				let candidate = Candidate::from_entity(
					&entity,
					entity.primary_name(),
					1.0,
					SearchMode::Identifier,
				)
				.with_field("identifier", key.clone());

				tracing::info!(entity_id = %entity.entity_id, "Identifier cache hit.");

				TierRun {
					candidates: vec![candidate],
					outcome: StepOutcome::ShortCircuit,
					notes: vec![format!("identifier {key} matched entity {}", entity.entity_id)],
				}
			},
			None => TierRun::completed(Vec::new()),
		}
	}
}

/// Bounds a tier by `min(per_tier, remaining)`. Dropping the future on timeout cancels the
/// underlying request. Errors and timeouts become zero-candidate runs.
async fn guarded<F>(tier: Tier, per_tier: Duration, remaining: Duration, fut: F) -> TierRun
where
	F: Future<Output = Result<Vec<Candidate>>>,
{
	let budget = per_tier.min(remaining);

	match tokio::time::timeout(budget, fut).await {
		Ok(Ok(candidates)) => TierRun::completed(candidates),
		Ok(Err(err)) => {
			let label = if err.is_unavailable() { "backend unavailable" } else { "backend error" };

			tracing::warn!(tier = tier.as_str(), error = %err, "Search tier failed; continuing.");

			TierRun::without_candidates(StepOutcome::Failed, format!("{label}: {err}"))
		},
		Err(_) if budget < per_tier => {
			tracing::warn!(
				tier = tier.as_str(),
				budget_ms = budget.as_millis() as u64,
				"Query deadline exceeded during tier."
			);

			TierRun::without_candidates(StepOutcome::DeadlineExceeded, "deadline_exceeded")
		},
		Err(_) => {
			tracing::warn!(
				tier = tier.as_str(),
				timeout_ms = budget.as_millis() as u64,
				"Search tier timed out; continuing."
			);

			TierRun::without_candidates(
				StepOutcome::TimedOut,
				format!("timed_out after {} ms", budget.as_millis()),
			)
		},
	}
}
