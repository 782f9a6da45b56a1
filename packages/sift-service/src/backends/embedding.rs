use reqwest::Client;

use sift_config::EmbeddingProviderConfig;
use sift_domain::text;

use crate::{BoxFuture, EmbeddingProvider, Result};

pub struct HttpEmbeddingProvider {
	client: Client,
	cfg: EmbeddingProviderConfig,
}
impl HttpEmbeddingProvider {
	pub fn new(cfg: &EmbeddingProviderConfig) -> Result<Self> {
		Ok(Self { client: sift_providers::build_client(cfg.timeout_ms)?, cfg: cfg.clone() })
	}
}

impl EmbeddingProvider for HttpEmbeddingProvider {
	fn dimensions(&self) -> usize {
		self.cfg.dimensions as usize
	}

	fn embed<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		Box::pin(async move {
			Ok(sift_providers::embedding::embed(&self.client, &self.cfg, texts).await?)
		})
	}
}

/// Deterministic offline embedder: hashed character trigrams of the folded text, L2-normalized.
#[derive(Clone, Copy, Debug)]
pub struct HashingEmbedder {
	dimensions: usize,
}
impl HashingEmbedder {
	pub const DEFAULT_DIMENSIONS: usize = 256;

	pub fn new(dimensions: usize) -> Self {
		Self { dimensions: dimensions.max(1) }
	}

	pub fn embed_text(&self, raw: &str) -> Vec<f32> {
		let folded = text::fold_text(raw);
		let padded: Vec<char> = format!(" {folded} ").chars().collect();
		let mut vector = vec![0.0_f32; self.dimensions];

		if folded.is_empty() {
			return vector;
		}

		for window in padded.windows(3) {
			let trigram: String = window.iter().collect();
			let digest = blake3::hash(trigram.as_bytes());
			let mut prefix = [0_u8; 8];

			prefix.copy_from_slice(&digest.as_bytes()[..8]);

			let slot = (u64::from_le_bytes(prefix) % self.dimensions as u64) as usize;

			vector[slot] += 1.0;
		}

		let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();

		if norm > 0.0 {
			for value in &mut vector {
				*value /= norm;
			}
		}

		vector
	}
}
impl Default for HashingEmbedder {
	fn default() -> Self {
		Self::new(Self::DEFAULT_DIMENSIONS)
	}
}

impl EmbeddingProvider for HashingEmbedder {
	fn dimensions(&self) -> usize {
		self.dimensions
	}

	fn embed<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		let vectors = texts.iter().map(|text| self.embed_text(text)).collect();

		Box::pin(async move { Ok(vectors) })
	}
}

/// Dot product of two L2-normalized vectors. Mismatched lengths score zero.
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
	if a.len() != b.len() {
		return 0.0;
	}

	a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn hashing_embedder_is_deterministic_and_normalized() {
		let embedder = HashingEmbedder::new(64);
		let a = embedder.embed_text("Ivanov Ivan");
		let b = embedder.embed_text("IVANOV  ivan");
		let norm = a.iter().map(|v| v * v).sum::<f32>().sqrt();

		assert_eq!(a, b);
		assert!((norm - 1.0).abs() < 1e-5);
	}

	#[test]
	fn similar_names_are_closer_than_unrelated_ones() {
		let embedder = HashingEmbedder::default();
		let query = embedder.embed_text("Ivanov Ivan");
		let close = embedder.embed_text("Ivanoff Ivan");
		let far = embedder.embed_text("Gazprom Neft");

		assert!(cosine(&query, &close) > cosine(&query, &far));
	}

	#[test]
	fn blank_text_embeds_to_zero() {
		assert!(HashingEmbedder::new(8).embed_text("  ").iter().all(|v| *v == 0.0));
	}
}
