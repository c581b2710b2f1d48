//! String formatting and extraction utilities.

use regex::Regex;

/// Utility function to truncate an identifier for display purposes.
///
/// Shows only the first 8 characters followed by ".." for longer strings.
pub fn truncate_id(id: &str) -> String {
	match id.char_indices().nth(8) {
		Some((cut, _)) => format!("{}..", &id[..cut]),
		None => id.to_string(),
	}
}

/// Returns the first capture group of `pattern` in `text`, trimmed.
///
/// Tool output is parsed line by line, so callers compile their patterns
/// with `(?m)` when they anchor on line ends.
pub fn capture(pattern: &Regex, text: &str) -> Option<String> {
	pattern
		.captures(text)
		.and_then(|caps| caps.get(1))
		.map(|m| m.as_str().trim().to_string())
		.filter(|s| !s.is_empty())
}
