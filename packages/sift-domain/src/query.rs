use serde::{Deserialize, Serialize};

use crate::{
	identifier::{self, IdentifierKind},
	text,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
	Given,
	Surname,
	Patronymic,
	Initial,
	Organization,
	Identifier,
	Unknown,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identifier {
	pub kind: String,
	pub value: String,
}
impl Identifier {
	pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
		Self { kind: kind.into(), value: value.into() }
	}

	pub fn classified_kind(&self) -> IdentifierKind {
		IdentifierKind::classify(&self.kind)
	}
}

/// Normalized query produced by the upstream tagging pipeline. Read-only to this crate.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
	pub text: String,
	#[serde(default)]
	pub tokens: Vec<(String, Role)>,
	#[serde(default)]
	pub identifiers: Vec<Identifier>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum QueryIssue {
	EmptyText,
	EmptyToken { position: usize },
	UnrecognizedIdentifierKind { kind: String },
	InvalidTin { value: String },
	InvalidBirthDate { value: String },
}

/// Best-effort view of a [`Query`]. Malformed parts are reported in `issues`, never rejected.
#[derive(Clone, Debug, Default)]
pub struct SanitizedQuery {
	/// Folded search text. Falls back to the joined tokens when `Query::text` is blank.
	pub folded_text: String,
	pub tokens: Vec<(String, Role)>,
	/// Normalized identifier values usable as fast-path cache keys, in query order.
	pub lookup_keys: Vec<String>,
	/// Normalized taxpayer numbers that passed checksum validation.
	pub valid_tins: Vec<String>,
	pub birth_date: Option<String>,
	pub issues: Vec<QueryIssue>,
}
impl SanitizedQuery {
	pub fn has_recognized_tin(&self) -> bool {
		!self.valid_tins.is_empty()
	}

	pub fn has_birth_date(&self) -> bool {
		self.birth_date.is_some()
	}
}

impl Query {
	pub fn new(text: impl Into<String>) -> Self {
		Self { text: text.into(), tokens: Vec::new(), identifiers: Vec::new() }
	}

	pub fn with_token(mut self, token: impl Into<String>, role: Role) -> Self {
		self.tokens.push((token.into(), role));

		self
	}

	pub fn with_identifier(mut self, kind: impl Into<String>, value: impl Into<String>) -> Self {
		self.identifiers.push(Identifier::new(kind, value));

		self
	}

	pub fn sanitized(&self) -> SanitizedQuery {
		let mut out = SanitizedQuery::default();

		for (position, (token, role)) in self.tokens.iter().enumerate() {
			let trimmed = token.trim();

			if trimmed.is_empty() {
				out.issues.push(QueryIssue::EmptyToken { position });

				continue;
			}

			out.tokens.push((trimmed.to_string(), *role));
		}

		out.folded_text = text::fold_text(&self.text);

		if out.folded_text.is_empty() {
			let joined =
				out.tokens.iter().map(|(token, _)| token.as_str()).collect::<Vec<_>>().join(" ");

			out.folded_text = text::fold_text(&joined);
		}
		if out.folded_text.is_empty() {
			out.issues.push(QueryIssue::EmptyText);
		}

		for id in &self.identifiers {
			match id.classified_kind() {
				IdentifierKind::Tin => {
					let normalized = identifier::normalize_identifier(&id.value);

					if normalized.is_empty() {
						out.issues.push(QueryIssue::InvalidTin { value: id.value.clone() });

						continue;
					}
					if identifier::validate_inn(&normalized) {
						out.valid_tins.push(normalized.clone());
					} else {
						out.issues.push(QueryIssue::InvalidTin { value: id.value.clone() });
					}

					push_unique(&mut out.lookup_keys, normalized);
				},
				IdentifierKind::Registration => {
					let normalized = identifier::normalize_identifier(&id.value);

					if !normalized.is_empty() {
						push_unique(&mut out.lookup_keys, normalized);
					}
				},
				IdentifierKind::BirthDate => match identifier::normalize_birth_date(&id.value) {
					Some(date) if out.birth_date.is_none() => out.birth_date = Some(date),
					Some(_) => {},
					None => out.issues.push(QueryIssue::InvalidBirthDate { value: id.value.clone() }),
				},
				IdentifierKind::Unrecognized => {
					out.issues.push(QueryIssue::UnrecognizedIdentifierKind { kind: id.kind.clone() });
				},
			}
		}

		out
	}
}

fn push_unique(keys: &mut Vec<String>, key: String) {
	if !keys.contains(&key) {
		keys.push(key);
	}
}
