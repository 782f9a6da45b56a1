use std::{
	collections::HashMap,
	sync::{
		Arc,
		atomic::{AtomicBool, Ordering},
	},
};

use reqwest::Client;

use sift_config::ExactBackendConfig;
use sift_domain::{PatternTier, WatchlistEntity, name_patterns, text};
use sift_providers::exact::ExactHit;

use crate::{
	BoxFuture, ExactBackend, Result,
	candidate::{Candidate, SearchMode, parse_entity_kind},
	options::SearchOptions,
};

/// Pattern index reached over HTTP.
pub struct HttpExactBackend {
	client: Client,
	cfg: ExactBackendConfig,
}
impl HttpExactBackend {
	pub fn new(cfg: &ExactBackendConfig) -> Result<Self> {
		Ok(Self { client: sift_providers::build_client(cfg.timeout_ms)?, cfg: cfg.clone() })
	}

	async fn run(&self, query: &str, options: &SearchOptions) -> Result<Vec<Candidate>> {
		let hits =
			sift_providers::exact::search(&self.client, &self.cfg, query, options.top_k).await?;

		Ok(super::finalize(hits.into_iter().map(hit_to_candidate).collect(), options))
	}
}

impl ExactBackend for HttpExactBackend {
	fn name(&self) -> &'static str {
		"http"
	}

	fn search<'a>(
		&'a self,
		query: &'a str,
		options: &'a SearchOptions,
	) -> BoxFuture<'a, Result<Vec<Candidate>>> {
		Box::pin(self.run(query, options))
	}
}

fn hit_to_candidate(hit: ExactHit) -> Candidate {
	let field = hit.field.unwrap_or_else(|| "name".to_string());

	Candidate::new(
		hit.entity_id,
		parse_entity_kind(hit.entity_kind.as_deref()),
		hit.canonical_name.clone(),
		hit.score,
		SearchMode::Exact,
	)
	.with_field(field, hit.canonical_name)
	.with_field("pattern", hit.pattern)
	.with_metadata(hit.metadata)
}

struct PatternRef {
	entity: usize,
	tier: PatternTier,
	field: String,
	source: String,
}

struct PatternIndex {
	entities: Vec<Arc<WatchlistEntity>>,
	patterns: HashMap<String, Vec<PatternRef>>,
	max_pattern_tokens: usize,
}
impl PatternIndex {
	fn lookup(&self, query: &str, options: &SearchOptions, cancel: &AtomicBool) -> Vec<Candidate> {
		let folded = text::fold_text(query);
		let tokens = text::tokens(&folded);
		let total = tokens.len();
		let mut out = Vec::new();

		for start in 0..total {
			if cancel.load(Ordering::Relaxed) {
				return Vec::new();
			}

			let longest = self.max_pattern_tokens.min(total - start);

			for len in 1..=longest {
				let window = tokens[start..start + len].join(" ");
				let Some(refs) = self.patterns.get(&window) else {
					continue;
				};
				let coverage = len as f32 / total as f32;

				for pattern in refs {
					let entity = &self.entities[pattern.entity];
					let score = pattern.tier.base_score() * (0.7 + 0.3 * coverage);

					out.push(
						Candidate::from_entity(
							entity,
							pattern.source.clone(),
							score,
							SearchMode::Exact,
						)
						.with_field(pattern.field.clone(), pattern.source.clone())
						.with_field("pattern", window.clone()),
					);
				}
			}
		}

		super::finalize(out, options)
	}
}

/// Deterministic in-memory pattern index over the loaded watchlist.
///
/// Every contiguous token window of the folded query is looked up against the precompiled
/// pattern set. A hit scores `tier_base * (0.7 + 0.3 * coverage)`, where coverage is the share
/// of query tokens the pattern spans.
pub struct MemoryExactBackend {
	index: Arc<PatternIndex>,
}
impl MemoryExactBackend {
	pub fn new(entities: &[Arc<WatchlistEntity>]) -> Self {
		let mut patterns: HashMap<String, Vec<PatternRef>> = HashMap::new();
		let mut max_pattern_tokens = 0;

		for (idx, entity) in entities.iter().enumerate() {
			for pattern in name_patterns(entity) {
				max_pattern_tokens = max_pattern_tokens.max(text::tokens(&pattern.pattern).len());

				patterns.entry(pattern.pattern).or_default().push(PatternRef {
					entity: idx,
					tier: pattern.tier,
					field: pattern.field,
					source: pattern.source,
				});
			}
		}

		let index = PatternIndex { entities: entities.to_vec(), patterns, max_pattern_tokens };

		Self { index: Arc::new(index) }
	}

	pub fn lookup(&self, query: &str, options: &SearchOptions) -> Vec<Candidate> {
		self.index.lookup(query, options, &AtomicBool::new(false))
	}
}

impl ExactBackend for MemoryExactBackend {
	fn name(&self) -> &'static str {
		"memory"
	}

	fn search<'a>(
		&'a self,
		query: &'a str,
		options: &'a SearchOptions,
	) -> BoxFuture<'a, Result<Vec<Candidate>>> {
		let index = self.index.clone();
		let query = query.to_string();
		let options = options.clone();

		Box::pin(super::run_blocking("Exact pattern lookup", move |cancel| {
			index.lookup(&query, &options, cancel)
		}))
	}
}
