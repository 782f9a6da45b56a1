pub mod entity;
pub mod identifier;
pub mod query;
pub mod text;

pub use entity::{EntityKind, NamePattern, PatternTier, WatchlistEntity, name_patterns};
pub use identifier::{IdentifierKind, normalize_birth_date, normalize_identifier, validate_inn};
pub use query::{Identifier, Query, QueryIssue, Role, SanitizedQuery};
