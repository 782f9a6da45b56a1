use std::{
	collections::HashMap,
	sync::{
		Arc,
		atomic::{AtomicBool, Ordering},
	},
};

use qdrant_client::{
	Qdrant,
	qdrant::{Query, QueryPointsBuilder, Value, value::Kind},
};
use reqwest::Client;

use sift_config::VectorBackendConfig;
use sift_domain::WatchlistEntity;
use sift_providers::vector::{VectorHit, VectorRequest};

use crate::{
	BoxFuture, EmbeddingProvider, Error, Result, VectorBackend, VectorQuery,
	backends::embedding::{HashingEmbedder, cosine},
	candidate::{Candidate, SearchMode, parse_entity_kind},
	options::SearchOptions,
};

/// Remote similarity service that accepts raw text or a precomputed embedding.
pub struct HttpVectorBackend {
	client: Client,
	cfg: VectorBackendConfig,
}
impl HttpVectorBackend {
	pub fn new(cfg: &VectorBackendConfig) -> Result<Self> {
		Ok(Self { client: sift_providers::build_client(cfg.timeout_ms)?, cfg: cfg.clone() })
	}

	async fn run(&self, query: &VectorQuery, options: &SearchOptions) -> Result<Vec<Candidate>> {
		let request = match query.embedding.as_ref() {
			Some(embedding) => VectorRequest::Embedding(embedding.clone()),
			None => VectorRequest::Text(query.text.clone()),
		};
		let hits =
			sift_providers::vector::search(&self.client, &self.cfg, &request, options.top_k).await?;

		Ok(super::finalize(hits.into_iter().map(hit_to_candidate).collect(), options))
	}
}

impl VectorBackend for HttpVectorBackend {
	fn name(&self) -> &'static str {
		"http"
	}

	fn search<'a>(
		&'a self,
		query: &'a VectorQuery,
		options: &'a SearchOptions,
	) -> BoxFuture<'a, Result<Vec<Candidate>>> {
		Box::pin(self.run(query, options))
	}
}

fn hit_to_candidate(hit: VectorHit) -> Candidate {
	Candidate::new(
		hit.entity_id,
		parse_entity_kind(hit.entity_kind.as_deref()),
		hit.canonical_name.clone(),
		hit.score,
		SearchMode::Vector,
	)
	.with_field("name", hit.canonical_name)
}

/// Qdrant collection of name embeddings. Points carry `entity_id`, `canonical_name` and
/// `entity_kind` payload fields; the collection uses cosine distance.
pub struct QdrantVectorBackend {
	client: Qdrant,
	collection: String,
	embedder: Arc<dyn EmbeddingProvider>,
}
impl QdrantVectorBackend {
	pub fn new(cfg: &VectorBackendConfig, embedder: Arc<dyn EmbeddingProvider>) -> Result<Self> {
		let client = Qdrant::from_url(&cfg.qdrant_url).build()?;

		Ok(Self { client, collection: cfg.collection.clone(), embedder })
	}

	async fn run(&self, query: &VectorQuery, options: &SearchOptions) -> Result<Vec<Candidate>> {
		let embedding = match query.embedding.as_ref() {
			Some(embedding) => embedding.clone(),
			None => {
				let texts = [query.text.clone()];

				self.embedder.embed(&texts).await?.into_iter().next().ok_or_else(|| {
					Error::Backend { message: "Embedding provider returned no vectors.".to_string() }
				})?
			},
		};
		let request = QueryPointsBuilder::new(self.collection.clone())
			.query(Query::new_nearest(embedding))
			.limit(options.top_k as u64)
			.with_payload(true);
		let response = self.client.query(request).await?;
		let mut out = Vec::with_capacity(response.result.len());

		for point in response.result {
			let Some(entity_id) = payload_string(&point.payload, "entity_id") else {
				tracing::warn!(collection = %self.collection, "Vector point missing entity_id payload.");

				continue;
			};
			let canonical_name = payload_string(&point.payload, "canonical_name").unwrap_or_default();
			let kind = payload_string(&point.payload, "entity_kind");

			out.push(
				Candidate::new(
					entity_id,
					parse_entity_kind(kind.as_deref()),
					canonical_name.clone(),
					point.score,
					SearchMode::Vector,
				)
				.with_field("name", canonical_name),
			);
		}

		Ok(super::finalize(out, options))
	}
}

impl VectorBackend for QdrantVectorBackend {
	fn name(&self) -> &'static str {
		"qdrant"
	}

	fn search<'a>(
		&'a self,
		query: &'a VectorQuery,
		options: &'a SearchOptions,
	) -> BoxFuture<'a, Result<Vec<Candidate>>> {
		Box::pin(self.run(query, options))
	}
}

fn payload_string(payload: &HashMap<String, Value>, key: &str) -> Option<String> {
	match &payload.get(key)?.kind {
		Some(Kind::StringValue(text)) => Some(text.clone()),
		Some(Kind::IntegerValue(value)) => Some(value.to_string()),
		_ => None,
	}
}

struct VectorEntry {
	entity: usize,
	field: &'static str,
	surface: String,
	vector: Vec<f32>,
}

struct VectorIndex {
	entities: Vec<Arc<WatchlistEntity>>,
	entries: Vec<VectorEntry>,
	embedder: HashingEmbedder,
}
impl VectorIndex {
	fn lookup(&self, text: &str, options: &SearchOptions, cancel: &AtomicBool) -> Vec<Candidate> {
		let vector = self.embedder.embed_text(text);
		let mut out = Vec::with_capacity(self.entries.len());

		for entry in &self.entries {
			if cancel.load(Ordering::Relaxed) {
				return Vec::new();
			}

			let entity = &self.entities[entry.entity];

			out.push(
				Candidate::from_entity(
					entity,
					entry.surface.clone(),
					cosine(&vector, &entry.vector),
					SearchMode::Vector,
				)
				.with_field(entry.field, entry.surface.clone()),
			);
		}

		super::finalize(out, options)
	}
}

/// Brute-force cosine search over hashed embeddings of every surface form.
///
/// The query text is always embedded here. Caller embeddings are ignored.
pub struct MemoryVectorBackend {
	index: Arc<VectorIndex>,
}
impl MemoryVectorBackend {
	pub fn new(entities: &[Arc<WatchlistEntity>], embedder: HashingEmbedder) -> Self {
		let mut entries = Vec::new();

		for (idx, entity) in entities.iter().enumerate() {
			for (field, surface) in entity.surface_forms() {
				entries.push(VectorEntry {
					entity: idx,
					field,
					surface: surface.to_string(),
					vector: embedder.embed_text(surface),
				});
			}
		}

		Self { index: Arc::new(VectorIndex { entities: entities.to_vec(), entries, embedder }) }
	}

	pub fn lookup(&self, query: &VectorQuery, options: &SearchOptions) -> Vec<Candidate> {
		self.index.lookup(&query.text, options, &AtomicBool::new(false))
	}
}

impl VectorBackend for MemoryVectorBackend {
	fn name(&self) -> &'static str {
		"memory"
	}

	fn search<'a>(
		&'a self,
		query: &'a VectorQuery,
		options: &'a SearchOptions,
	) -> BoxFuture<'a, Result<Vec<Candidate>>> {
		let index = self.index.clone();
		let text = query.text.clone();
		let options = options.clone();

		Box::pin(super::run_blocking("Vector scan", move |cancel| {
			index.lookup(&text, &options, cancel)
		}))
	}
}
