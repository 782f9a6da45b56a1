use std::{
	collections::hash_map::Entry,
	sync::{
		Arc,
		atomic::{AtomicU64, Ordering},
	},
};

use ahash::AHashMap;
use serde::Serialize;

use sift_domain::{IdentifierKind, WatchlistEntity, normalize_identifier};

/// Exact identifier lookup built once at startup. Reads take `&self` and never lock.
#[derive(Debug, Default)]
pub struct IdentifierCache {
	by_identifier: AHashMap<String, Arc<WatchlistEntity>>,
	hits: AtomicU64,
	misses: AtomicU64,
}
impl IdentifierCache {
	/// Indexes every TIN and registration identifier. The first entity to claim a key keeps it.
	pub fn build(entities: &[Arc<WatchlistEntity>]) -> Self {
		let mut by_identifier = AHashMap::new();

		for entity in entities {
			for id in &entity.identifiers {
				if !matches!(
					id.classified_kind(),
					IdentifierKind::Tin | IdentifierKind::Registration
				) {
					continue;
				}

				let key = normalize_identifier(&id.value);

				if key.is_empty() {
					continue;
				}

				match by_identifier.entry(key) {
					Entry::Occupied(slot) => {
						let existing: &Arc<WatchlistEntity> = slot.get();

						if existing.entity_id != entity.entity_id {
							tracing::warn!(
								identifier = %slot.key(),
								kept = %existing.entity_id,
								dropped = %entity.entity_id,
								"Identifier claimed by two watchlist entities."
							);
						}
					},
					Entry::Vacant(slot) => {
						slot.insert(entity.clone());
					},
				}
			}
		}

		Self { by_identifier, ..Self::default() }
	}

	/// An always-miss cache, used when the watchlist cannot be loaded.
	pub fn empty() -> Self {
		Self::default()
	}

	pub fn lookup(&self, identifier: &str) -> Option<Arc<WatchlistEntity>> {
		let key = normalize_identifier(identifier);
		let found = self.by_identifier.get(&key).cloned();

		match found {
			Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
			None => self.misses.fetch_add(1, Ordering::Relaxed),
		};

		found
	}

	/// First hit among `keys`, in order, with the key that matched.
	pub fn lookup_any(&self, keys: &[String]) -> Option<(String, Arc<WatchlistEntity>)> {
		keys.iter().find_map(|key| self.lookup(key).map(|entity| (key.clone(), entity)))
	}

	pub fn len(&self) -> usize {
		self.by_identifier.len()
	}

	pub fn is_empty(&self) -> bool {
		self.by_identifier.is_empty()
	}

	pub fn stats(&self) -> CacheStats {
		CacheStats {
			entries: self.by_identifier.len(),
			hits: self.hits.load(Ordering::Relaxed),
			misses: self.misses.load(Ordering::Relaxed),
		}
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
	pub entries: usize,
	pub hits: u64,
	pub misses: u64,
}
