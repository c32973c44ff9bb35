//! Route pattern compilation and matching.
//!
//! Pattern syntax:
//!
//! - literal text is matched exactly (ASCII case-insensitively unless the
//!   router is configured otherwise)
//! - `@name` captures one path segment (`[^/?]+`)
//! - `@name:regex` captures text matching `regex`; the constraint runs up
//!   to the next `/`, `(` or `)`
//! - `( ... )` marks an optional part, which may nest
//! - a trailing `*` matches the remainder of the path, exposed as the splat
//! - `*` on its own matches every path
//!
//! A compiled pattern also accepts the path with one extra (or one missing)
//! trailing slash.

use percent_encoding::percent_decode_str;
use runway_conf::RoutingSettings;
use runway_http::{Error, Params, Result};

/// Regex group name reserved for the wildcard remainder.
const SPLAT_GROUP: &str = "__splat";

/// Maximum allowed length for a route pattern in bytes.
const MAX_PATTERN_LENGTH: usize = 1024;

/// Maximum allowed size for a compiled pattern regex (in bytes).
const MAX_REGEX_SIZE: usize = 1 << 20;

/// One parsed piece of a route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
	Literal(String),
	Param {
		name: String,
		constraint: Option<String>,
	},
	Optional(Vec<Segment>),
	Wildcard,
}

/// Result of matching a path against a [`PathPattern`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMatch {
	/// Captured parameters in pattern order. Absent optional parameters are
	/// present with no value.
	pub params: Params,
	/// Remainder matched by a trailing wildcard.
	pub splat: Option<String>,
	/// Length of the matched path.
	pub matched_len: usize,
}

/// A compiled route pattern.
#[derive(Debug, Clone)]
pub struct PathPattern {
	pattern: String,
	segments: Vec<Segment>,
	param_names: Vec<String>,
	regex: regex::Regex,
	match_all: bool,
	decode: bool,
}

impl PathPattern {
	/// Compiles a pattern with the given routing settings.
	///
	/// # Examples
	///
	/// ```
	/// use runway_conf::RoutingSettings;
	/// use runway_urls::PathPattern;
	///
	/// let pattern =
	///     PathPattern::compile("/path1/@param:[a-zA-Z0-9]{2,3}", &RoutingSettings::default())
	///         .unwrap();
	///
	/// let matched = pattern.matches("/path1/123").unwrap();
	/// assert_eq!(matched.params.get("param"), Some("123"));
	/// assert!(pattern.matches("/path1/1234").is_none());
	/// ```
	///
	/// # Errors
	///
	/// Returns [`Error::InvalidPattern`] for unbalanced parentheses, a
	/// wildcard that is not last, duplicate parameter names, empty
	/// parameter names or a constraint that is not a valid regex.
	pub fn compile(pattern: &str, settings: &RoutingSettings) -> Result<Self> {
		let pattern = if pattern.is_empty() { "/" } else { pattern };
		if pattern.len() > MAX_PATTERN_LENGTH {
			return Err(invalid(
				pattern,
				format!("longer than {} bytes", MAX_PATTERN_LENGTH),
			));
		}

		let segments = Parser::new(pattern).parse()?;

		let mut param_names = Vec::new();
		collect_param_names(&segments, &mut param_names);
		for (index, name) in param_names.iter().enumerate() {
			if name == SPLAT_GROUP {
				return Err(invalid(pattern, format!("'{}' is a reserved name", name)));
			}
			if param_names[..index].contains(name) {
				return Err(invalid(pattern, format!("duplicate parameter '{}'", name)));
			}
		}

		let mut regex_str = String::from("^");
		build_regex(&segments, &mut regex_str);
		// Trailing slash tolerance: an explicit trailing `/` becomes optional,
		// otherwise one may be appended.
		if regex_str.ends_with('/') {
			regex_str.push('?');
		} else {
			regex_str.push_str("/?");
		}
		regex_str.push('$');

		let regex = regex::RegexBuilder::new(&regex_str)
			.case_insensitive(!settings.case_sensitive)
			.size_limit(MAX_REGEX_SIZE)
			.build()
			.map_err(|e| invalid(pattern, e.to_string()))?;

		Ok(Self {
			pattern: pattern.to_string(),
			match_all: segments == [Segment::Wildcard],
			segments,
			param_names,
			regex,
			decode: settings.decode_params,
		})
	}

	/// The pattern as declared.
	pub fn pattern(&self) -> &str {
		&self.pattern
	}

	pub fn segments(&self) -> &[Segment] {
		&self.segments
	}

	/// Parameter names in pattern order.
	pub fn param_names(&self) -> &[String] {
		&self.param_names
	}

	pub fn has_wildcard(&self) -> bool {
		self.match_all || self.regex.capture_names().flatten().any(|n| n == SPLAT_GROUP)
	}

	/// Matches `path` against the pattern.
	pub fn matches(&self, path: &str) -> Option<PathMatch> {
		if self.match_all {
			let rest = path.trim_start_matches('/');
			return Some(PathMatch {
				params: Params::new(),
				splat: (!rest.is_empty()).then(|| self.decode_value(rest)),
				matched_len: path.len(),
			});
		}

		let caps = self.regex.captures(path)?;
		let mut params = Params::new();
		for name in &self.param_names {
			let value = caps.name(name).map(|m| self.decode_value(m.as_str()));
			params.push(name.clone(), value);
		}
		let splat = caps
			.name(SPLAT_GROUP)
			.map(|m| m.as_str())
			.filter(|s| !s.is_empty())
			.map(|s| self.decode_value(s));

		Some(PathMatch {
			params,
			splat,
			matched_len: caps.get(0).map_or(0, |m| m.end()),
		})
	}

	fn decode_value(&self, raw: &str) -> String {
		if self.decode {
			percent_decode_str(raw).decode_utf8_lossy().into_owned()
		} else {
			raw.to_string()
		}
	}
}

impl std::fmt::Display for PathPattern {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(&self.pattern)
	}
}

fn invalid(pattern: &str, reason: impl Into<String>) -> Error {
	Error::InvalidPattern {
		pattern: pattern.to_string(),
		reason: reason.into(),
	}
}

fn collect_param_names(segments: &[Segment], names: &mut Vec<String>) {
	for segment in segments {
		match segment {
			Segment::Param { name, .. } => names.push(name.clone()),
			Segment::Optional(inner) => collect_param_names(inner, names),
			Segment::Literal(_) | Segment::Wildcard => {}
		}
	}
}

fn build_regex(segments: &[Segment], out: &mut String) {
	for (index, segment) in segments.iter().enumerate() {
		match segment {
			Segment::Literal(text) => {
				// `/*` is handled by the wildcard: the slash belongs to it.
				let text = match segments.get(index + 1) {
					Some(Segment::Wildcard) => text.strip_suffix('/').unwrap_or(text),
					_ => text,
				};
				out.push_str(&regex::escape(text));
			}
			Segment::Param { name, constraint } => {
				out.push_str("(?P<");
				out.push_str(name);
				out.push('>');
				out.push_str(constraint.as_deref().unwrap_or("[^/?]+"));
				out.push(')');
			}
			Segment::Optional(inner) => {
				out.push_str("(?:");
				build_regex(inner, out);
				out.push_str(")?");
			}
			Segment::Wildcard => {
				let after_slash = match index.checked_sub(1).map(|i| &segments[i]) {
					Some(Segment::Literal(text)) => text.ends_with('/'),
					_ => false,
				};
				if after_slash {
					out.push_str("(?:/?|/(?P<");
					out.push_str(SPLAT_GROUP);
					out.push_str(">.*))");
				} else {
					out.push_str("(?P<");
					out.push_str(SPLAT_GROUP);
					out.push_str(">.*)");
				}
			}
		}
	}
}

struct Parser<'a> {
	pattern: &'a str,
	chars: std::iter::Peekable<std::str::CharIndices<'a>>,
}

impl<'a> Parser<'a> {
	fn new(pattern: &'a str) -> Self {
		Self {
			pattern,
			chars: pattern.char_indices().peekable(),
		}
	}

	fn parse(mut self) -> Result<Vec<Segment>> {
		let segments = self.parse_group(0)?;
		if let Some((pos, _)) = self.chars.next() {
			return Err(invalid(
				self.pattern,
				format!("unbalanced ')' at byte {}", pos),
			));
		}
		Ok(segments)
	}

	fn parse_group(&mut self, depth: usize) -> Result<Vec<Segment>> {
		let mut segments = Vec::new();
		let mut literal = String::new();

		while let Some(&(pos, c)) = self.chars.peek() {
			match c {
				'@' => {
					self.chars.next();
					flush_literal(&mut literal, &mut segments);
					segments.push(self.parse_param(pos)?);
				}
				'(' => {
					self.chars.next();
					flush_literal(&mut literal, &mut segments);
					let inner = self.parse_group(depth + 1)?;
					match self.chars.next() {
						Some((_, ')')) => segments.push(Segment::Optional(inner)),
						_ => {
							return Err(invalid(
								self.pattern,
								format!("unclosed '(' at byte {}", pos),
							));
						}
					}
				}
				')' => {
					if depth == 0 {
						return Err(invalid(
							self.pattern,
							format!("unbalanced ')' at byte {}", pos),
						));
					}
					break;
				}
				'*' => {
					self.chars.next();
					if depth > 0 || self.chars.peek().is_some() {
						return Err(invalid(
							self.pattern,
							"wildcard '*' must be the last segment",
						));
					}
					flush_literal(&mut literal, &mut segments);
					segments.push(Segment::Wildcard);
				}
				_ => {
					self.chars.next();
					literal.push(c);
				}
			}
		}

		flush_literal(&mut literal, &mut segments);
		Ok(segments)
	}

	fn parse_param(&mut self, at: usize) -> Result<Segment> {
		let mut name = String::new();
		while let Some(&(_, c)) = self.chars.peek() {
			if c.is_ascii_alphanumeric() || c == '_' {
				name.push(c);
				self.chars.next();
			} else {
				break;
			}
		}
		if name.is_empty() {
			return Err(invalid(
				self.pattern,
				format!("missing parameter name after '@' at byte {}", at),
			));
		}

		let mut constraint = None;
		if let Some(&(_, ':')) = self.chars.peek() {
			self.chars.next();
			let mut regex = String::new();
			while let Some(&(_, c)) = self.chars.peek() {
				if matches!(c, '/' | '(' | ')') {
					break;
				}
				regex.push(c);
				self.chars.next();
			}
			if regex.is_empty() {
				return Err(invalid(
					self.pattern,
					format!("empty constraint for parameter '{}'", name),
				));
			}
			constraint = Some(regex);
		}

		Ok(Segment::Param { name, constraint })
	}
}

fn flush_literal(literal: &mut String, segments: &mut Vec<Segment>) {
	if !literal.is_empty() {
		segments.push(Segment::Literal(std::mem::take(literal)));
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn compile(pattern: &str) -> PathPattern {
		PathPattern::compile(pattern, &RoutingSettings::default()).expect("Valid pattern")
	}

	#[rstest]
	#[case("/users", "/users", true)]
	#[case("/users", "/users/", true)]
	#[case("/users/", "/users", true)]
	#[case("/users", "/USERS", true)]
	#[case("/users", "/users/1", false)]
	#[case("/users", "//users", false)]
	#[case("", "/", true)]
	#[case("/", "", true)]
	fn test_literal_matching(#[case] pattern: &str, #[case] path: &str, #[case] expected: bool) {
		// Arrange
		let pattern = compile(pattern);

		// Act
		let result = pattern.matches(path);

		// Assert
		assert_eq!(result.is_some(), expected, "path {:?}", path);
	}

	#[rstest]
	fn test_named_parameters_are_captured_in_order() {
		let pattern = compile("/users/@id/posts/@post_id");

		let matched = pattern.matches("/users/42/posts/7").unwrap();

		let names: Vec<&str> = matched.params.names().collect();
		assert_eq!(names, vec!["id", "post_id"]);
		assert_eq!(matched.params.get("id"), Some("42"));
		assert_eq!(matched.params.get_index(1), Some("7"));
		assert_eq!(matched.matched_len, "/users/42/posts/7".len());
	}

	#[rstest]
	#[case("/path1/123", Some("123"))]
	#[case("/path1/ab", Some("ab"))]
	#[case("/path1/a", None)]
	#[case("/path1/abcd", None)]
	#[case("/path1/a-b", None)]
	fn test_constrained_parameter(#[case] path: &str, #[case] expected: Option<&str>) {
		let pattern = compile("/path1/@param:[a-zA-Z0-9]{2,3}");

		let captured = pattern
			.matches(path)
			.and_then(|m| m.params.get("param").map(str::to_string));

		assert_eq!(captured.as_deref(), expected);
	}

	#[rstest]
	fn test_parameter_followed_by_literal() {
		let pattern = compile("/files/@name.json");

		let matched = pattern.matches("/files/report.json").unwrap();

		assert_eq!(matched.params.get("name"), Some("report"));
	}

	#[rstest]
	#[case("/blog", None, None)]
	#[case("/blog/2024", Some("2024"), None)]
	#[case("/blog/2024/05", Some("2024"), Some("05"))]
	fn test_nested_optional_groups(
		#[case] path: &str,
		#[case] year: Option<&str>,
		#[case] month: Option<&str>,
	) {
		let pattern = compile("/blog(/@year(/@month))");

		let matched = pattern.matches(path).expect("should match");

		assert_eq!(matched.params.get("year"), year);
		assert_eq!(matched.params.get("month"), month);
		assert!(matched.params.contains("month"));
	}

	#[rstest]
	fn test_missing_required_segment_fails() {
		let pattern = compile("/blog/@year");
		assert!(pattern.matches("/blog").is_none());
		assert!(pattern.matches("/blog/").is_none());
	}

	#[rstest]
	#[case("/static/*", "/static/css/site.css", Some("css/site.css"))]
	#[case("/static/*", "/static/", None)]
	#[case("/static/*", "/static", None)]
	#[case("*", "/anything/at/all", Some("anything/at/all"))]
	#[case("*", "/", None)]
	fn test_wildcard_splat(
		#[case] pattern: &str,
		#[case] path: &str,
		#[case] splat: Option<&str>,
	) {
		let pattern = compile(pattern);

		let matched = pattern.matches(path).expect("should match");

		assert_eq!(matched.splat.as_deref(), splat);
		assert!(pattern.has_wildcard());
	}

	#[rstest]
	fn test_wildcard_does_not_match_other_prefix() {
		let pattern = compile("/static/*");
		assert!(pattern.matches("/statics/x").is_none());
	}

	#[rstest]
	fn test_parameters_are_percent_decoded() {
		let pattern = compile("/search/@term");

		let matched = pattern.matches("/search/hello%20world").unwrap();

		assert_eq!(matched.params.get("term"), Some("hello world"));
	}

	#[rstest]
	fn test_decoding_can_be_disabled() {
		let settings = RoutingSettings {
			decode_params: false,
			..RoutingSettings::default()
		};
		let pattern = PathPattern::compile("/search/@term", &settings).unwrap();

		let matched = pattern.matches("/search/hello%20world").unwrap();

		assert_eq!(matched.params.get("term"), Some("hello%20world"));
	}

	#[rstest]
	fn test_case_sensitive_matching() {
		let settings = RoutingSettings {
			case_sensitive: true,
			..RoutingSettings::default()
		};
		let pattern = PathPattern::compile("/Users", &settings).unwrap();

		assert!(pattern.matches("/Users").is_some());
		assert!(pattern.matches("/users").is_none());
	}

	#[rstest]
	fn test_literal_regex_characters_are_escaped() {
		let pattern = compile("/a.b/c+d");
		assert!(pattern.matches("/a.b/c+d").is_some());
		assert!(pattern.matches("/axb/ccd").is_none());
	}

	#[rstest]
	#[case("/a/@id/@id", "duplicate parameter")]
	#[case("/a/*/b", "wildcard")]
	#[case("/a(/@id", "unclosed")]
	#[case("/a)/b", "unbalanced")]
	#[case("/a/@/b", "missing parameter name")]
	#[case("/a/@id:/b", "empty constraint")]
	#[case("/a/@id:[0-9", "")]
	#[case("/a/@__splat", "reserved")]
	fn test_invalid_patterns(#[case] pattern: &str, #[case] reason_fragment: &str) {
		// Act
		let result = PathPattern::compile(pattern, &RoutingSettings::default());

		// Assert
		match result {
			Err(Error::InvalidPattern { reason, .. }) => {
				assert!(reason.contains(reason_fragment), "reason: {}", reason);
			}
			other => panic!("expected InvalidPattern, got {:?}", other.map(|p| p.pattern)),
		}
	}

	#[rstest]
	fn test_segments_are_exposed() {
		let pattern = compile("/a/@id(/@slug)");

		assert_eq!(
			pattern.segments(),
			&[
				Segment::Literal("/a/".to_string()),
				Segment::Param {
					name: "id".to_string(),
					constraint: None
				},
				Segment::Optional(vec![
					Segment::Literal("/".to_string()),
					Segment::Param {
						name: "slug".to_string(),
						constraint: None
					},
				]),
			]
		);
	}
}
