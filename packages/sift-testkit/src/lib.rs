mod error;

pub use error::{Error, Result};

use std::{
	env, fs,
	path::{Path, PathBuf},
};

use serde_json::Value;
use uuid::Uuid;

use sift_config::Config;
use sift_domain::{EntityKind, Identifier, Query, Role, WatchlistEntity};

/// Valid 10-digit taxpayer number carried by entity `42`.
pub const IVANOV_TIN: &str = "7707083893";
pub const IVANOV_BIRTH_DATE: &str = "1970-05-17";
/// Registration number carried by entity `100`.
pub const GAZPROM_REGISTRATION: &str = "1027700070518";

/// File removed on drop.
pub struct TempFile {
	path: PathBuf,
}
impl TempFile {
	pub fn write(prefix: &str, extension: &str, contents: &str) -> Result<Self> {
		let path = env::temp_dir().join(format!("{prefix}_{}.{extension}", Uuid::new_v4().simple()));

		fs::write(&path, contents)?;

		Ok(Self { path })
	}

	pub fn path(&self) -> &Path {
		&self.path
	}
}
impl Drop for TempFile {
	fn drop(&mut self) {
		let _ = fs::remove_file(&self.path);
	}
}

/// A small watchlist covering persons with and without identifiers, aliases and organizations.
pub fn sample_entities() -> Vec<WatchlistEntity> {
	vec![
		WatchlistEntity {
			entity_id: "42".to_string(),
			kind: EntityKind::Person,
			names: vec!["Ivanov Ivan Petrovich".to_string()],
			aliases: vec!["Ivan Ivanov".to_string()],
			identifiers: vec![Identifier::new("inn", IVANOV_TIN)],
			birth_date: Some(IVANOV_BIRTH_DATE.to_string()),
			metadata: serde_json::json!({ "list": "domestic" })
				.as_object()
				.cloned()
				.unwrap_or_default(),
		},
		WatchlistEntity {
			entity_id: "7".to_string(),
			kind: EntityKind::Person,
			names: vec!["Petrov Petr".to_string()],
			aliases: Vec::new(),
			identifiers: Vec::new(),
			birth_date: None,
			metadata: Default::default(),
		},
		WatchlistEntity {
			entity_id: "9".to_string(),
			kind: EntityKind::Person,
			names: vec!["Sidorova Anna Sergeevna".to_string()],
			aliases: vec!["Anna Sidorova".to_string()],
			identifiers: Vec::new(),
			birth_date: Some("1985-11-02".to_string()),
			metadata: Default::default(),
		},
		WatchlistEntity {
			entity_id: "100".to_string(),
			kind: EntityKind::Organization,
			names: vec!["Gazprom Neft".to_string()],
			aliases: vec!["Gazpromneft".to_string()],
			identifiers: vec![Identifier::new("ogrn", GAZPROM_REGISTRATION)],
			birth_date: None,
			metadata: Default::default(),
		},
	]
}

pub fn sample_watchlist_json() -> String {
	Value::Array(
		sample_entities()
			.iter()
			.filter_map(|entity| serde_json::to_value(entity).ok())
			.collect(),
	)
	.to_string()
}

pub fn write_sample_watchlist() -> Result<TempFile> {
	TempFile::write("sift_watchlist", "json", &sample_watchlist_json())
}

/// In-memory backends everywhere, vector tier on, watchlist at `watchlist`.
pub fn memory_config(watchlist: Option<&Path>) -> Config {
	let mut cfg = Config::default();

	cfg.backends.exact.kind = "memory".to_string();
	cfg.backends.vector.enabled = true;
	cfg.backends.vector.kind = "memory".to_string();
	cfg.watchlist.path = watchlist.map(Path::to_path_buf);

	cfg
}

/// `Ivanov Ivan` tagged as surname and given name.
pub fn ivanov_query() -> Query {
	Query::new("Ivanov Ivan")
		.with_token("Ivanov", Role::Surname)
		.with_token("Ivan", Role::Given)
}

pub fn person_query(text: &str) -> Query {
	let mut query = Query::new(text);

	for token in text.split_whitespace() {
		query = query.with_token(token, Role::Unknown);
	}

	query
}
