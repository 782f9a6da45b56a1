pub mod backends;
pub mod cache;
pub mod candidate;
pub mod escalation;
pub mod fuzzy;
pub mod metrics;
pub mod options;
pub mod ranking;
pub mod risk;
pub mod search;
pub mod trace;
pub mod watchlist;

mod error;

pub use cache::{CacheStats, IdentifierCache};
pub use candidate::{Candidate, SearchMode};
pub use error::{Error, Result};
pub use escalation::Tier;
pub use metrics::MetricsSnapshot;
pub use options::{ModeSelection, SearchOptions};
pub use risk::{
	Corroboration, Decision, QueryEvidence, RiskLevel, RiskPolicy, ScoreBreakdown, UpstreamSignals,
};
pub use trace::{SearchTrace, Step, StepOutcome};

use std::{future::Future, pin::Pin, sync::Arc};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sift_config::Config;
use sift_domain::{Query, QueryIssue, WatchlistEntity};

use crate::{
	backends::{
		HashingEmbedder, HttpEmbeddingProvider, HttpExactBackend, HttpVectorBackend,
		MemoryExactBackend, MemoryVectorBackend, QdrantVectorBackend,
	},
	fuzzy::{CandidatePool, FuzzyParams},
	metrics::Metrics,
	search::SearchEngine,
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Exact/substring pattern tier.
pub trait ExactBackend
where
	Self: Send + Sync,
{
	fn name(&self) -> &'static str;

	fn search<'a>(
		&'a self,
		query: &'a str,
		options: &'a SearchOptions,
	) -> BoxFuture<'a, Result<Vec<Candidate>>>;
}

/// Similarity tier. Scores are cosine similarities clamped to `[0, 1]`.
pub trait VectorBackend
where
	Self: Send + Sync,
{
	fn name(&self) -> &'static str;

	fn search<'a>(
		&'a self,
		query: &'a VectorQuery,
		options: &'a SearchOptions,
	) -> BoxFuture<'a, Result<Vec<Candidate>>>;
}

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn dimensions(&self) -> usize;

	fn embed<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>>>;
}

/// Vector tier input: folded text, plus the caller's embedding when it has one.
#[derive(Clone, Debug, PartialEq)]
pub struct VectorQuery {
	pub text: String,
	pub embedding: Option<Vec<f32>>,
}

/// Backend implementations chosen for a deployment.
#[derive(Clone)]
pub struct Backends {
	pub exact: Arc<dyn ExactBackend>,
	pub vector: Option<Arc<dyn VectorBackend>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScreeningRequest {
	pub query: Query,
	#[serde(default)]
	pub signals: UpstreamSignals,
	/// Precomputed query embedding for the vector tier.
	#[serde(default)]
	pub embedding: Option<Vec<f32>>,
}
impl ScreeningRequest {
	pub fn new(query: Query) -> Self {
		Self { query, signals: UpstreamSignals::default(), embedding: None }
	}
}

#[derive(Clone, Debug, Serialize)]
pub struct ScreeningResponse {
	pub trace_id: Uuid,
	pub candidates: Vec<Candidate>,
	pub trace: SearchTrace,
	pub decision: Decision,
	/// Malformed query parts that were ignored.
	pub issues: Vec<QueryIssue>,
}

pub struct SiftService {
	pub cfg: Config,
	engine: SearchEngine,
	options: SearchOptions,
	policy: RiskPolicy,
	policy_hash: String,
	cache: Arc<IdentifierCache>,
	metrics: Arc<Metrics>,
}
impl SiftService {
	/// Validates `cfg`, loads the watchlist and wires the configured backends.
	///
	/// Only configuration errors fail. An unreadable watchlist degrades to an always-miss
	/// identifier cache and empty in-memory tiers.
	pub fn from_config(cfg: Config) -> Result<Self> {
		sift_config::validate(&cfg)?;

		let entities = load_watchlist(&cfg.watchlist);
		let backends = build_backends(&cfg, &entities)?;

		Self::with_backends(cfg, entities, backends)
	}

	pub fn with_backends(
		cfg: Config,
		entities: Vec<Arc<WatchlistEntity>>,
		backends: Backends,
	) -> Result<Self> {
		let options = SearchOptions::from_config(&cfg.search)?;
		let fuzzy = FuzzyParams::from_config(&cfg.fuzzy)?;
		let policy = RiskPolicy::from_config(&cfg.risk)?;
		let cache = Arc::new(IdentifierCache::build(&entities));
		let pool = Arc::new(CandidatePool::new(&entities, fuzzy.prefix_len));
		let metrics = Arc::new(Metrics::default());
		let policy_hash = policy_hash(&options, &fuzzy, &policy);

		tracing::info!(
			entities = entities.len(),
			identifiers = cache.len(),
			exact_backend = backends.exact.name(),
			vector_backend = backends.vector.as_ref().map(|v| v.name()).unwrap_or("disabled"),
			policy_hash = %policy_hash,
			"Screening service ready."
		);

		let engine = SearchEngine::new(
			cache.clone(),
			backends.exact,
			pool,
			fuzzy,
			backends.vector,
			metrics.clone(),
		);

		Ok(Self { cfg, engine, options, policy, policy_hash, cache, metrics })
	}

	pub async fn screen(&self, query: &Query) -> ScreeningResponse {
		self.run(query, &UpstreamSignals::default(), None, &self.options).await
	}

	pub async fn screen_request(&self, request: &ScreeningRequest) -> ScreeningResponse {
		self.run(&request.query, &request.signals, request.embedding.as_deref(), &self.options)
			.await
	}

	/// Screens with per-call options, validated first.
	pub async fn screen_with_options(
		&self,
		request: &ScreeningRequest,
		options: &SearchOptions,
	) -> Result<ScreeningResponse> {
		options.validate()?;

		Ok(self.run(&request.query, &request.signals, request.embedding.as_deref(), options).await)
	}

	pub fn options(&self) -> &SearchOptions {
		&self.options
	}

	pub fn policy(&self) -> &RiskPolicy {
		&self.policy
	}

	pub fn policy_hash(&self) -> &str {
		&self.policy_hash
	}

	pub fn metrics(&self) -> MetricsSnapshot {
		self.metrics.snapshot(self.cache.stats())
	}

	async fn run(
		&self,
		query: &Query,
		signals: &UpstreamSignals,
		embedding: Option<&[f32]>,
		options: &SearchOptions,
	) -> ScreeningResponse {
		let sanitized = query.sanitized();

		for issue in &sanitized.issues {
			tracing::warn!(issue = ?issue, "Ignoring malformed query part.");
		}

		let outcome = self.engine.search(&sanitized, embedding, options, &self.policy_hash).await;
		let evidence = QueryEvidence {
			has_tin: sanitized.has_recognized_tin(),
			has_birth_date: sanitized.has_birth_date(),
		};
		let decision = risk::decide(&outcome.candidates, signals, evidence, &self.policy);

		tracing::info!(
			trace_id = %outcome.trace.trace_id,
			steps = outcome.trace.steps().len(),
			candidate_count = outcome.candidates.len(),
			risk_level = decision.risk_level.as_str(),
			score = decision.score,
			"Screening finished."
		);

		ScreeningResponse {
			trace_id: outcome.trace.trace_id,
			candidates: outcome.candidates,
			trace: outcome.trace,
			decision,
			issues: sanitized.issues,
		}
	}
}

/// blake3 over the effective policy, so traces from different policies never compare equal.
pub fn policy_hash(options: &SearchOptions, fuzzy: &FuzzyParams, policy: &RiskPolicy) -> String {
	let snapshot = serde_json::json!({
		"search": options,
		"fuzzy": fuzzy,
		"risk": policy,
	});

	blake3::hash(snapshot.to_string().as_bytes()).to_hex().to_string()
}

pub fn build_backends(cfg: &Config, entities: &[Arc<WatchlistEntity>]) -> Result<Backends> {
	let exact: Arc<dyn ExactBackend> = match cfg.backends.exact.kind.as_str() {
		"http" => Arc::new(HttpExactBackend::new(&cfg.backends.exact)?),
		_ => Arc::new(MemoryExactBackend::new(entities)),
	};
	let vector = if cfg.backends.vector.enabled {
		Some(build_vector_backend(cfg, entities)?)
	} else {
		None
	};

	Ok(Backends { exact, vector })
}

fn build_vector_backend(
	cfg: &Config,
	entities: &[Arc<WatchlistEntity>],
) -> Result<Arc<dyn VectorBackend>> {
	let vector_cfg = &cfg.backends.vector;
	let backend: Arc<dyn VectorBackend> = match vector_cfg.kind.as_str() {
		"http" => Arc::new(HttpVectorBackend::new(vector_cfg)?),
		"qdrant" => {
			let embedding = cfg.providers.embedding.as_ref().ok_or_else(|| {
				sift_config::Error::Validation {
					message: "providers.embedding is required when backends.vector.kind is qdrant."
						.to_string(),
				}
			})?;
			let embedder = Arc::new(HttpEmbeddingProvider::new(embedding)?);

			Arc::new(QdrantVectorBackend::new(vector_cfg, embedder)?)
		},
		_ => Arc::new(MemoryVectorBackend::new(entities, HashingEmbedder::default())),
	};

	Ok(backend)
}

fn load_watchlist(cfg: &sift_config::Watchlist) -> Vec<Arc<WatchlistEntity>> {
	let Some(path) = cfg.path.as_deref() else {
		tracing::warn!("No watchlist configured; identifier cache will always miss.");

		return Vec::new();
	};

	match watchlist::load(path) {
		Ok(entities) => entities,
		Err(err) => {
			tracing::warn!(
				error = %err,
				"Watchlist failed to load; identifier cache will always miss."
			);

			Vec::new()
		},
	}
}
