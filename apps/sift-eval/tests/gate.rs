use std::path::Path;

use sift_eval::{CaseFile, evaluate, load_cases};
use sift_service::SiftService;

fn fixture_path() -> &'static Path {
	Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/cases.json"))
}

fn memory_service(watchlist: &Path) -> SiftService {
	SiftService::from_config(sift_testkit::memory_config(Some(watchlist)))
		.expect("Failed to build service.")
}

#[tokio::test]
async fn fixture_cases_pass_against_the_sample_watchlist() {
	let watchlist = sift_testkit::write_sample_watchlist().expect("Failed to write watchlist.");
	let service = memory_service(watchlist.path());
	let case_file = load_cases(fixture_path()).expect("Failed to load cases.");
	let report = evaluate(&service, &case_file, Path::new("memory.toml"), fixture_path()).await;

	for case in &report.cases {
		assert!(case.ok, "Case {} breached: {:?}", case.name, case.breaches);
	}

	assert_eq!(report.name, "watchlist-smoke");
	assert_eq!(report.summary.case_count, 3);
	assert!(report.summary.ok);
	assert_eq!(report.policy_hash, service.policy_hash());
}

#[tokio::test]
async fn breached_expectation_fails_the_gate() {
	let watchlist = sift_testkit::write_sample_watchlist().expect("Failed to write watchlist.");
	let service = memory_service(watchlist.path());
	let case_file: CaseFile = serde_json::from_value(serde_json::json!({
		"cases": [{
			"name": "wrong level",
			"query": { "text": "Ivanov Ivan Petrovich" },
			"expect": { "risk_level": "low" }
		}]
	}))
	.expect("Failed to parse cases.");
	let report = evaluate(&service, &case_file, Path::new("memory.toml"), Path::new("inline")).await;
	let case = &report.cases[0];

	assert!(!report.summary.ok);
	assert_eq!(report.summary.breached_count, 1);
	assert_eq!(case.breaches[0].field, "risk_level");
	assert_eq!(case.breaches[0].expected, serde_json::json!("low"));
	assert_eq!(case.breaches[0].observed, serde_json::json!("high"));
}

#[test]
fn empty_case_file_is_rejected() {
	let file = sift_testkit::TempFile::write("sift_cases", "json", r#"{ "cases": [] }"#)
		.expect("Failed to write cases.");

	assert!(load_cases(file.path()).is_err());
}
