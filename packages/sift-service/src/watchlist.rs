use std::{collections::HashSet, fs, path::Path, sync::Arc};

use serde::Deserialize;

use sift_domain::WatchlistEntity;

use crate::{Error, Result};

#[derive(Deserialize)]
struct Envelope {
	entities: Vec<WatchlistEntity>,
}

/// Reads a watchlist file: a JSON array, an object with an `entities` array, or JSON Lines.
pub fn load(path: &Path) -> Result<Vec<Arc<WatchlistEntity>>> {
	let raw = fs::read_to_string(path).map_err(|err| Error::Watchlist {
		message: format!("Failed to read {}: {err}", path.display()),
	})?;

	parse(&raw).map_err(|err| Error::Watchlist { message: format!("{}: {err}", path.display()) })
}

pub fn parse(raw: &str) -> Result<Vec<Arc<WatchlistEntity>>> {
	let trimmed = raw.trim_start();
	let entities: Vec<WatchlistEntity> = if trimmed.starts_with('[') {
		serde_json::from_str(trimmed).map_err(|err| Error::Watchlist {
			message: format!("Invalid watchlist array: {err}"),
		})?
	} else if let Some(envelope) = trimmed
		.starts_with('{')
		.then(|| serde_json::from_str::<Envelope>(trimmed).ok())
		.flatten()
	{
		envelope.entities
	} else {
		let mut out = Vec::new();

		for (idx, line) in raw.lines().enumerate() {
			if line.trim().is_empty() {
				continue;
			}

			let entity = serde_json::from_str(line).map_err(|err| Error::Watchlist {
				message: format!("Invalid watchlist line {}: {err}", idx + 1),
			})?;

			out.push(entity);
		}

		out
	};
	let mut seen = HashSet::new();
	let mut out = Vec::with_capacity(entities.len());

	for entity in entities {
		if entity.entity_id.trim().is_empty() {
			tracing::warn!("Skipping watchlist entity without entity_id.");

			continue;
		}
		if !seen.insert(entity.entity_id.clone()) {
			tracing::warn!(entity_id = %entity.entity_id, "Skipping duplicate watchlist entity.");

			continue;
		}

		out.push(Arc::new(entity));
	}

	Ok(out)
}
