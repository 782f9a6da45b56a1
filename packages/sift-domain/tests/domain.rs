use sift_domain::{
	EntityKind, IdentifierKind, PatternTier, Query, QueryIssue, Role, WatchlistEntity,
	name_patterns, normalize_identifier,
};

fn person(entity_id: &str, name: &str) -> WatchlistEntity {
	WatchlistEntity {
		entity_id: entity_id.to_string(),
		kind: EntityKind::Person,
		names: vec![name.to_string()],
		aliases: Vec::new(),
		identifiers: Vec::new(),
		birth_date: None,
		metadata: serde_json::Map::new(),
	}
}

#[test]
fn classifies_identifier_kinds() {
	assert_eq!(IdentifierKind::classify("INN"), IdentifierKind::Tin);
	assert_eq!(IdentifierKind::classify("ogrn"), IdentifierKind::Registration);
	assert_eq!(IdentifierKind::classify(" dob "), IdentifierKind::BirthDate);
	assert_eq!(IdentifierKind::classify("passport"), IdentifierKind::Unrecognized);
}

#[test]
fn normalizes_identifier_values() {
	assert_eq!(normalize_identifier(" 7707-083 893 "), "7707083893");
	assert_eq!(normalize_identifier("ab-12"), "AB12");
}

#[test]
fn sanitized_query_reports_malformed_parts_without_failing() {
	let query = Query::new("Ivanov Ivan")
		.with_token("Ivanov", Role::Surname)
		.with_token("  ", Role::Given)
		.with_identifier("passport", "1234")
		.with_identifier("inn", "7707083894");
	let sanitized = query.sanitized();

	assert_eq!(sanitized.folded_text, "ivanov ivan");
	assert_eq!(sanitized.tokens, vec![("Ivanov".to_string(), Role::Surname)]);
	assert!(!sanitized.has_recognized_tin());
	assert_eq!(sanitized.lookup_keys, vec!["7707083894".to_string()]);
	assert!(sanitized.issues.contains(&QueryIssue::EmptyToken { position: 1 }));
	assert!(
		sanitized
			.issues
			.contains(&QueryIssue::UnrecognizedIdentifierKind { kind: "passport".to_string() })
	);
	assert!(
		sanitized.issues.contains(&QueryIssue::InvalidTin { value: "7707083894".to_string() })
	);
}

#[test]
fn sanitized_query_recognizes_tin_and_birth_date() {
	let query = Query::new("ivanov ivan")
		.with_identifier("tin", "500100732259")
		.with_identifier("dob", "31.01.1970");
	let sanitized = query.sanitized();

	assert!(sanitized.has_recognized_tin());
	assert!(sanitized.has_birth_date());
	assert_eq!(sanitized.birth_date.as_deref(), Some("1970-01-31"));
	assert!(sanitized.issues.is_empty());
}

#[test]
fn impossible_birth_date_is_not_evidence() {
	let sanitized = Query::new("Ivanov Ivan").with_identifier("dob", "1970-02-31").sanitized();

	assert!(!sanitized.has_birth_date());
	assert_eq!(
		sanitized.issues,
		vec![QueryIssue::InvalidBirthDate { value: "1970-02-31".to_string() }]
	);
}

#[test]
fn blank_text_falls_back_to_tokens() {
	let query = Query::new("   ").with_token("Gazprom", Role::Organization);
	let sanitized = query.sanitized();

	assert_eq!(sanitized.folded_text, "gazprom");
	assert_eq!(sanitized.tokens, vec![("Gazprom".to_string(), Role::Organization)]);
}

#[test]
fn empty_query_is_flagged() {
	let sanitized = Query::default().sanitized();

	assert!(sanitized.folded_text.is_empty());
	assert_eq!(sanitized.issues, vec![QueryIssue::EmptyText]);
}

#[test]
fn person_patterns_cover_permutations_partials_and_initials() {
	let patterns = name_patterns(&person("42", "Ivanov Ivan Petrovich"));
	let tier_of = |text: &str| {
		patterns.iter().find(|pattern| pattern.pattern == text).map(|pattern| pattern.tier)
	};

	assert_eq!(tier_of("ivanov ivan petrovich"), Some(PatternTier::Full));
	assert_eq!(tier_of("ivan petrovich ivanov"), Some(PatternTier::Permutation));
	assert_eq!(tier_of("ivan ivanov"), Some(PatternTier::Partial));
	assert_eq!(tier_of("ivanov i p"), Some(PatternTier::Initials));
	assert_eq!(tier_of("i p ivanov"), Some(PatternTier::Initials));
	assert_eq!(tier_of("petrovich"), None);
}

#[test]
fn hyphenated_names_are_indexed_joined_and_split() {
	let patterns = name_patterns(&person("5", "Jean-Pierre Dupont"));
	let full: Vec<&str> = patterns
		.iter()
		.filter(|pattern| pattern.tier == PatternTier::Full)
		.map(|pattern| pattern.pattern.as_str())
		.collect();

	assert_eq!(full, vec!["jeanpierre dupont", "jean pierre dupont"]);
	assert!(patterns.iter().all(|pattern| pattern.source == "Jean-Pierre Dupont"));
}

#[test]
fn patterns_are_unique_per_text() {
	let mut entity = person("7", "Ivan Ivanov");

	entity.aliases.push("IVANOV Ivan".to_string());

	let patterns = name_patterns(&entity);
	let full = patterns
		.iter()
		.find(|pattern| pattern.pattern == "ivanov ivan")
		.expect("Alias full form must be present.");

	assert_eq!(full.tier, PatternTier::Full);
	assert_eq!(full.field, "alias");
	assert_eq!(patterns.iter().filter(|pattern| pattern.pattern == "ivanov ivan").count(), 1);
}

#[test]
fn organization_patterns_include_significant_tokens() {
	let entity = WatchlistEntity {
		entity_id: "org-1".to_string(),
		kind: EntityKind::Organization,
		names: vec!["Rosoboron Export".to_string()],
		aliases: Vec::new(),
		identifiers: Vec::new(),
		birth_date: None,
		metadata: serde_json::Map::new(),
	};
	let patterns = name_patterns(&entity);

	assert!(patterns.iter().any(|p| p.pattern == "rosoboron" && p.tier == PatternTier::Partial));
	assert!(patterns.iter().any(|p| p.pattern == "export" && p.tier == PatternTier::Partial));
	assert!(!patterns.iter().any(|p| p.tier == PatternTier::Permutation));
}
