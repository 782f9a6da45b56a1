use std::collections::BTreeSet;

use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

const HYPHENS: [char; 3] = ['-', '\u{2010}', '\u{2011}'];

/// Case and diacritic folding shared by the exact and fuzzy tiers.
///
/// Applies NFKD, drops combining marks, lowercases, maps punctuation to spaces (apostrophes and
/// hyphens inside a word are removed so `O'Neil` and `ONeil` fold alike), and collapses
/// whitespace.
pub fn fold_text(text: &str) -> String {
	fold(text, false)
}

/// Every folding a watchlist surface form should be indexed under: [`fold_text`], then the
/// form with hyphens read as word breaks when that differs, so `Jean-Pierre` is found as both
/// `jeanpierre` and `jean pierre`.
pub fn fold_variants(text: &str) -> Vec<String> {
	let joined = fold(text, false);
	let split = fold(text, true);

	if split == joined { vec![joined] } else { vec![joined, split] }
}

fn fold(text: &str, split_hyphens: bool) -> String {
	let mut out = String::with_capacity(text.len());
	let mut pending_space = false;

	for ch in text.nfkd() {
		if is_combining_mark(ch) {
			continue;
		}
		if matches!(ch, '\'' | '\u{2019}' | '`') {
			continue;
		}
		if HYPHENS.contains(&ch) && !split_hyphens {
			continue;
		}
		if ch.is_alphanumeric() {
			if pending_space && !out.is_empty() {
				out.push(' ');
			}

			pending_space = false;

			out.extend(ch.to_lowercase());
		} else {
			pending_space = true;
		}
	}

	out
}

/// Whitespace tokens of already-folded text.
pub fn tokens(folded: &str) -> Vec<&str> {
	folded.split_whitespace().collect()
}

pub fn token_set(folded: &str) -> BTreeSet<&str> {
	folded.split_whitespace().collect()
}

/// Tokens sorted lexically and re-joined, so word order stops mattering.
pub fn sorted_tokens(folded: &str) -> String {
	let mut parts = tokens(folded);

	parts.sort_unstable();
	parts.join(" ")
}

/// Intersection over union of whitespace tokens.
pub fn token_overlap(a: &str, b: &str) -> f32 {
	let left = token_set(a);
	let right = token_set(b);

	if left.is_empty() && right.is_empty() {
		return 0.0;
	}

	let intersection = left.intersection(&right).count();
	let union = left.union(&right).count();

	intersection as f32 / union as f32
}
