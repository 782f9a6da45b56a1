use std::{
	collections::BTreeSet,
	fs,
	path::{Path, PathBuf},
};

use clap::Parser;
use color_eyre::eyre;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use sift_service::{
	Corroboration, RiskLevel, ScreeningRequest, ScreeningResponse, SiftService, Tier,
	trace::TRACE_VERSION,
};

#[derive(Debug, Parser)]
#[command(
	version = sift_cli::VERSION,
	rename_all = "kebab",
	styles = sift_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	#[arg(long, value_name = "FILE")]
	pub cases: PathBuf,
	/// Writes the JSON report here instead of stdout.
	#[arg(long, short = 'o', value_name = "FILE")]
	pub out: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
pub struct CaseFile {
	#[serde(default)]
	pub name: Option<String>,
	pub cases: Vec<Case>,
}

#[derive(Debug, Deserialize)]
pub struct Case {
	pub name: String,
	#[serde(flatten)]
	pub request: ScreeningRequest,
	#[serde(default)]
	pub expect: Expectation,
}

/// Only the fields present are checked.
#[derive(Debug, Default, Deserialize)]
pub struct Expectation {
	pub tiers: Option<Vec<Tier>>,
	pub top_entity_id: Option<String>,
	pub risk_level: Option<RiskLevel>,
	pub requires_corroboration: Option<BTreeSet<Corroboration>>,
}

#[derive(Debug, Serialize)]
pub struct Observed {
	pub tiers: Vec<Tier>,
	pub top_entity_id: Option<String>,
	pub risk_level: RiskLevel,
	pub score: f32,
	pub requires_corroboration: BTreeSet<Corroboration>,
}
impl Observed {
	pub fn from_response(response: &ScreeningResponse) -> Self {
		Self {
			tiers: response.trace.tiers(),
			top_entity_id: response.candidates.first().map(|c| c.entity_id.clone()),
			risk_level: response.decision.risk_level,
			score: response.decision.score,
			requires_corroboration: response.decision.requires_corroboration.clone(),
		}
	}
}

#[derive(Debug, Serialize)]
pub struct Breach {
	pub field: &'static str,
	pub expected: Value,
	pub observed: Value,
}

#[derive(Debug, Serialize)]
pub struct CaseReport {
	pub name: String,
	pub trace_id: Uuid,
	pub ok: bool,
	pub observed: Observed,
	pub breaches: Vec<Breach>,
}

#[derive(Debug, Serialize)]
pub struct GateSummary {
	pub case_count: usize,
	pub breached_count: usize,
	pub ok: bool,
}

#[derive(Debug, Serialize)]
pub struct GateReport {
	pub name: String,
	pub config_path: String,
	pub cases_path: String,
	pub policy_hash: String,
	pub trace_version: u32,
	pub summary: GateSummary,
	pub cases: Vec<CaseReport>,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let cfg = sift_config::load(&args.config)?;
	let filter =
		EnvFilter::try_new(&cfg.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).init();

	let case_file = load_cases(&args.cases)?;
	let service = SiftService::from_config(cfg)?;
	let report = evaluate(&service, &case_file, &args.config, &args.cases).await;
	let json = serde_json::to_string_pretty(&report)?;

	if let Some(out_path) = &args.out {
		fs::write(out_path, &json)?;
	} else {
		println!("{json}");
	}

	if !report.summary.ok {
		return Err(eyre::eyre!(
			"Regression gate breached: {}/{} cases failed expectations.",
			report.summary.breached_count,
			report.summary.case_count
		));
	}

	Ok(())
}

pub fn load_cases(path: &Path) -> color_eyre::Result<CaseFile> {
	let raw = fs::read_to_string(path)?;
	let case_file: CaseFile = serde_json::from_str(&raw)?;

	if case_file.cases.is_empty() {
		return Err(eyre::eyre!("Case file must include at least one case."));
	}

	Ok(case_file)
}

pub async fn evaluate(
	service: &SiftService,
	case_file: &CaseFile,
	config_path: &Path,
	cases_path: &Path,
) -> GateReport {
	let mut cases = Vec::with_capacity(case_file.cases.len());
	let mut breached_count = 0_usize;

	for case in &case_file.cases {
		let response = service.screen_request(&case.request).await;
		let observed = Observed::from_response(&response);
		let breaches = check(&case.expect, &observed);
		let ok = breaches.is_empty();

		if !ok {
			breached_count += 1;
		}

		tracing::info!(
			case = %case.name,
			trace_id = %response.trace_id,
			ok,
			breaches = breaches.len(),
			"Case evaluated."
		);

		cases.push(CaseReport {
			name: case.name.clone(),
			trace_id: response.trace_id,
			ok,
			observed,
			breaches,
		});
	}

	GateReport {
		name: case_file.name.clone().unwrap_or_else(|| "sift-eval".to_string()),
		config_path: config_path.display().to_string(),
		cases_path: cases_path.display().to_string(),
		policy_hash: service.policy_hash().to_string(),
		trace_version: TRACE_VERSION,
		summary: GateSummary {
			case_count: cases.len(),
			breached_count,
			ok: breached_count == 0,
		},
		cases,
	}
}

pub fn check(expect: &Expectation, observed: &Observed) -> Vec<Breach> {
	let mut breaches = Vec::new();

	compare(&mut breaches, "tiers", expect.tiers.as_ref(), &observed.tiers);

	if let Some(expected) = expect.top_entity_id.as_deref() {
		if observed.top_entity_id.as_deref() != Some(expected) {
			breaches.push(Breach {
				field: "top_entity_id",
				expected: Value::String(expected.to_string()),
				observed: observed.top_entity_id.clone().map(Value::String).unwrap_or(Value::Null),
			});
		}
	}

	compare(&mut breaches, "risk_level", expect.risk_level.as_ref(), &observed.risk_level);
	compare(
		&mut breaches,
		"requires_corroboration",
		expect.requires_corroboration.as_ref(),
		&observed.requires_corroboration,
	);

	breaches
}

fn compare<T>(breaches: &mut Vec<Breach>, field: &'static str, expected: Option<&T>, observed: &T)
where
	T: PartialEq + Serialize,
{
	let Some(expected) = expected else {
		return;
	};

	if expected != observed {
		breaches.push(Breach {
			field,
			expected: serde_json::json!(expected),
			observed: serde_json::json!(observed),
		});
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn observed() -> Observed {
		Observed {
			tiers: vec![Tier::Exact, Tier::Fuzzy],
			top_entity_id: Some("7".to_string()),
			risk_level: RiskLevel::Medium,
			score: 0.5,
			requires_corroboration: BTreeSet::new(),
		}
	}

	#[test]
	fn empty_expectation_never_breaches() {
		assert!(check(&Expectation::default(), &observed()).is_empty());
	}

	#[test]
	fn reports_each_mismatched_field() {
		let expect = Expectation {
			tiers: Some(vec![Tier::Exact]),
			top_entity_id: Some("42".to_string()),
			risk_level: Some(RiskLevel::Medium),
			requires_corroboration: Some(BTreeSet::from([Corroboration::Dob])),
		};
		let breaches = check(&expect, &observed());
		let fields: Vec<&str> = breaches.iter().map(|breach| breach.field).collect();

		assert_eq!(fields, vec!["tiers", "top_entity_id", "requires_corroboration"]);
		assert_eq!(breaches[0].expected, serde_json::json!(["exact"]));
		assert_eq!(breaches[0].observed, serde_json::json!(["exact", "fuzzy"]));
		assert_eq!(breaches[1].observed, serde_json::json!("7"));
	}

	#[test]
	fn missing_top_candidate_is_a_breach() {
		let mut observed = observed();

		observed.top_entity_id = None;

		let expect = Expectation { top_entity_id: Some("7".to_string()), ..Default::default() };
		let breaches = check(&expect, &observed);

		assert_eq!(breaches.len(), 1);
		assert_eq!(breaches[0].observed, Value::Null);
	}

	#[test]
	fn case_file_accepts_inline_requests() {
		let raw = r#"{
			"cases": [{
				"name": "identifier",
				"query": {
					"text": "I. Ivanov",
					"identifiers": [{ "kind": "inn", "value": "7707083893" }]
				},
				"signals": { "smartfilter": 0.4 },
				"expect": { "tiers": ["cache"], "requires_corroboration": ["dob"] }
			}]
		}"#;
		let case_file: CaseFile = serde_json::from_str(raw).expect("Failed to parse case file.");
		let case = &case_file.cases[0];

		assert_eq!(case.request.query.identifiers.len(), 1);
		assert_eq!(case.request.signals.smartfilter, 0.4);
		assert_eq!(case.expect.tiers, Some(vec![Tier::Cache]));
		assert!(case.expect.risk_level.is_none());
	}
}
