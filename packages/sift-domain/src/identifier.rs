use serde::{Deserialize, Serialize};
use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

const ISO_DATE: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");
const DOTTED_DATE: &[BorrowedFormatItem<'static>] = format_description!("[day].[month].[year]");
const SLASHED_DATE: &[BorrowedFormatItem<'static>] = format_description!("[day]/[month]/[year]");

const INN10_WEIGHTS: [u32; 9] = [2, 4, 10, 3, 5, 9, 4, 6, 8];
const INN12_WEIGHTS_11: [u32; 10] = [7, 2, 4, 10, 3, 5, 9, 4, 6, 8];
const INN12_WEIGHTS_12: [u32; 11] = [3, 7, 2, 4, 10, 3, 5, 9, 4, 6, 8];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierKind {
	/// Taxpayer number.
	Tin,
	/// State registration number of a legal entity.
	Registration,
	BirthDate,
	Unrecognized,
}
impl IdentifierKind {
	pub fn classify(kind: &str) -> Self {
		match kind.trim().to_ascii_lowercase().as_str() {
			"inn" | "tin" | "tax_id" | "tax_number" => Self::Tin,
			"ogrn" | "ogrnip" | "registration" | "registration_number" => Self::Registration,
			"dob" | "birth_date" | "date_of_birth" => Self::BirthDate,
			_ => Self::Unrecognized,
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Tin => "tin",
			Self::Registration => "registration",
			Self::BirthDate => "birth_date",
			Self::Unrecognized => "unrecognized",
		}
	}
}

/// Cache key form of an identifier: ASCII alphanumerics only, uppercased.
pub fn normalize_identifier(value: &str) -> String {
	value.chars().filter(char::is_ascii_alphanumeric).map(|ch| ch.to_ascii_uppercase()).collect()
}

/// Checksum validation for 10-digit (organization) and 12-digit (individual) taxpayer numbers.
pub fn validate_inn(value: &str) -> bool {
	let digits: Option<Vec<u32>> = value.chars().map(|ch| ch.to_digit(10)).collect();
	let Some(digits) = digits else { return false };

	match digits.len() {
		10 => inn_check_digit(&digits[..9], &INN10_WEIGHTS) == digits[9],
		12 =>
			inn_check_digit(&digits[..10], &INN12_WEIGHTS_11) == digits[10]
				&& inn_check_digit(&digits[..11], &INN12_WEIGHTS_12) == digits[11],
		_ => false,
	}
}

/// Normalizes `YYYY-MM-DD`, `DD.MM.YYYY`, or `DD/MM/YYYY` into `YYYY-MM-DD`. Dates that do
/// not exist on the calendar are rejected.
pub fn normalize_birth_date(value: &str) -> Option<String> {
	let trimmed = value.trim();
	let date = [ISO_DATE, DOTTED_DATE, SLASHED_DATE]
		.into_iter()
		.find_map(|format| Date::parse(trimmed, format).ok())?;

	date.format(ISO_DATE).ok()
}

fn inn_check_digit(digits: &[u32], weights: &[u32]) -> u32 {
	let sum: u32 = digits.iter().zip(weights).map(|(digit, weight)| digit * weight).sum();

	sum % 11 % 10
}
