//! Name inflection helpers for panel identifiers.

/// Convert a CamelCased word to its underscored form.
///
/// An underscore is inserted before every uppercase letter that follows a word
/// character, then the whole string is lowercased.
///
/// # Examples
///
/// ```
/// use reinhardt_debug_kit::utils::inflector::underscore;
///
/// assert_eq!(underscore("SqlLog"), "sql_log");
/// assert_eq!(underscore("history"), "history");
/// ```
pub fn underscore(word: &str) -> String {
	let mut out = String::with_capacity(word.len() + 4);
	let mut prev: Option<char> = None;
	for c in word.chars() {
		if c.is_uppercase() && prev.is_some_and(|p| p.is_alphanumeric() || p == '_') {
			out.push('_');
		}
		out.extend(c.to_lowercase());
		prev = Some(c);
	}
	out
}

/// Split a dotted `Plugin.Name` identifier into its plugin and bare name.
///
/// # Examples
///
/// ```
/// use reinhardt_debug_kit::utils::inflector::plugin_split;
///
/// assert_eq!(plugin_split("DebugKit.SqlLog"), (Some("DebugKit"), "SqlLog"));
/// assert_eq!(plugin_split("Custom"), (None, "Custom"));
/// ```
pub fn plugin_split(identifier: &str) -> (Option<&str>, &str) {
	match identifier.split_once('.') {
		Some((plugin, name)) if !plugin.is_empty() => (Some(plugin), name),
		Some((_, name)) => (None, name),
		None => (None, identifier),
	}
}
