//! SQL fingerprinting used by the SQL log panel.

use crate::context::SqlQuery;
use indexmap::IndexMap;
use regex::Regex;
use std::sync::LazyLock;

/// Number of repetitions of one fingerprint after which a query is flagged as N+1.
pub const N_PLUS_ONE_THRESHOLD: usize = 3;

/// Reduce a SQL statement to a fingerprint shared by all its parameterizations.
///
/// Comments are stripped, string and numeric literals become `?`, runs of
/// whitespace collapse to one space and the result is uppercased.
///
/// # Examples
///
/// ```
/// use reinhardt_debug_kit::utils::sql_normalization::fingerprint;
///
/// assert_eq!(
///     fingerprint("SELECT * FROM users WHERE id = 123"),
///     fingerprint("select * from users where id = 456"),
/// );
/// ```
pub fn fingerprint(sql: &str) -> String {
	static COMMENT_RE: LazyLock<Regex> =
		LazyLock::new(|| Regex::new(r"(?m)--.*$|/\*[\s\S]*?\*/").expect("valid regex"));
	static STRING_RE: LazyLock<Regex> =
		LazyLock::new(|| Regex::new(r#"'([^'\\]|\\.)*'"#).expect("valid regex"));
	static NUMERIC_RE: LazyLock<Regex> =
		LazyLock::new(|| Regex::new(r"\b\d+(\.\d+)?\b").expect("valid regex"));
	static WHITESPACE_RE: LazyLock<Regex> =
		LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

	let sql = COMMENT_RE.replace_all(sql, " ");
	let sql = STRING_RE.replace_all(&sql, "?");
	let sql = NUMERIC_RE.replace_all(&sql, "?");
	let sql = WHITESPACE_RE.replace_all(&sql, " ");
	sql.trim().to_uppercase()
}

/// Count how often each fingerprint occurs, in first-seen order.
pub fn fingerprint_counts(queries: &[SqlQuery]) -> IndexMap<String, usize> {
	let mut counts = IndexMap::new();
	for query in queries {
		*counts.entry(fingerprint(&query.sql)).or_insert(0) += 1;
	}
	counts
}

/// Fingerprints repeated more than [`N_PLUS_ONE_THRESHOLD`] times.
pub fn detect_n_plus_one(counts: &IndexMap<String, usize>) -> Vec<String> {
	counts
		.iter()
		.filter(|&(_, &count)| count > N_PLUS_ONE_THRESHOLD)
		.map(|(fp, _)| fp.clone())
		.collect()
}
