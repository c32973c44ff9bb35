//! URL generation from named routes.

use crate::pattern::{PathPattern, Segment};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use runway_conf::ParamEncoding;
use runway_http::{Error, Result};
use std::collections::HashMap;

/// Characters escaped when a value is percent-encoded as a path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
	.add(b' ')
	.add(b'"')
	.add(b'#')
	.add(b'%')
	.add(b'/')
	.add(b'<')
	.add(b'>')
	.add(b'?')
	.add(b'`')
	.add(b'{')
	.add(b'}');

/// Parameter name used to fill a trailing wildcard.
pub const SPLAT_PARAM: &str = "splat";

/// Values substituted into a route pattern.
///
/// # Examples
///
/// ```
/// use runway_urls::UrlParams;
///
/// let params = UrlParams::new().with("id", 123).with("name", "abc");
/// assert_eq!(params.get("id"), Some("123"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlParams {
	values: HashMap<String, String>,
}

impl UrlParams {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds a value, rendered with its `Display` form.
	pub fn with(mut self, name: impl Into<String>, value: impl ToString) -> Self {
		self.insert(name, value);
		self
	}

	pub fn insert(&mut self, name: impl Into<String>, value: impl ToString) {
		self.values.insert(name.into(), value.to_string());
	}

	pub fn get(&self, name: &str) -> Option<&str> {
		self.values.get(name).map(String::as_str)
	}

	pub fn is_empty(&self) -> bool {
		self.values.is_empty()
	}
}

impl<K: Into<String>, V: ToString> FromIterator<(K, V)> for UrlParams {
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		let mut params = Self::new();
		for (name, value) in iter {
			params.insert(name, value);
		}
		params
	}
}

impl<K: Into<String>, V: ToString, const N: usize> From<[(K, V); N]> for UrlParams {
	fn from(entries: [(K, V); N]) -> Self {
		entries.into_iter().collect()
	}
}

impl From<HashMap<String, String>> for UrlParams {
	fn from(values: HashMap<String, String>) -> Self {
		Self { values }
	}
}

/// Rebuilds a concrete path from a compiled pattern.
///
/// Literal text is kept as declared. Each parameter is replaced by its
/// value; optional parts are emitted only when every parameter inside them
/// has a value. A trailing wildcard is replaced by the `splat` value, or
/// dropped together with the slash before it.
///
/// # Errors
///
/// [`Error::MissingParameter`] when a required parameter has no value.
pub fn reverse(
	route_name: &str,
	pattern: &PathPattern,
	params: &UrlParams,
	encoding: ParamEncoding,
) -> Result<String> {
	let mut url = String::new();
	write_segments(route_name, pattern.segments(), params, encoding, &mut url)?;
	// A pattern starting with a wildcard or an optional part yields a
	// relative remainder.
	if !url.starts_with('/') {
		url.insert(0, '/');
	}
	Ok(url)
}

fn write_segments(
	route_name: &str,
	segments: &[Segment],
	params: &UrlParams,
	encoding: ParamEncoding,
	url: &mut String,
) -> Result<()> {
	for segment in segments {
		match segment {
			Segment::Literal(text) => url.push_str(text),
			Segment::Param { name, .. } => {
				let value = params.get(name).ok_or_else(|| Error::MissingParameter {
					route: route_name.to_string(),
					param: name.clone(),
				})?;
				url.push_str(&encode(value, encoding));
			}
			Segment::Optional(inner) => {
				if all_supplied(inner, params) {
					write_segments(route_name, inner, params, encoding, url)?;
				}
			}
			Segment::Wildcard => match params.get(SPLAT_PARAM) {
				Some(splat) => {
					let encoded: Vec<String> =
						splat.split('/').map(|part| encode(part, encoding)).collect();
					let joined = encoded.join("/");
					if url.ends_with('/') && joined.starts_with('/') {
						url.push_str(&joined[1..]);
					} else {
						url.push_str(&joined);
					}
				}
				None => {
					if url.len() > 1 && url.ends_with('/') {
						url.pop();
					}
				}
			},
		}
	}
	Ok(())
}

fn all_supplied(segments: &[Segment], params: &UrlParams) -> bool {
	segments.iter().all(|segment| match segment {
		Segment::Param { name, .. } => params.get(name).is_some(),
		Segment::Optional(inner) => all_supplied(inner, params),
		Segment::Literal(_) | Segment::Wildcard => true,
	})
}

fn encode(value: &str, encoding: ParamEncoding) -> String {
	match encoding {
		ParamEncoding::Raw => value.to_string(),
		ParamEncoding::Percent => utf8_percent_encode(value, PATH_SEGMENT).to_string(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use runway_conf::RoutingSettings;
	use rstest::rstest;

	fn url(pattern: &str, params: UrlParams, encoding: ParamEncoding) -> Result<String> {
		let pattern = PathPattern::compile(pattern, &RoutingSettings::default()).unwrap();
		reverse("test", &pattern, &params, encoding)
	}

	#[rstest]
	fn test_constrained_parameter_round_trip() {
		// Arrange
		let params = UrlParams::from([("param", 123)]);

		// Act
		let generated = url("/path1/@param:[a-zA-Z0-9]{2,3}", params, ParamEncoding::Raw);

		// Assert
		assert_eq!(generated.unwrap(), "/path1/123");
	}

	#[rstest]
	#[case(UrlParams::new(), "/blog")]
	#[case(UrlParams::from([("year", "2024")]), "/blog/2024")]
	#[case(UrlParams::from([("year", "2024"), ("month", "05")]), "/blog/2024/05")]
	#[case(UrlParams::from([("month", "05")]), "/blog")]
	fn test_optional_groups(#[case] params: UrlParams, #[case] expected: &str) {
		let generated = url("/blog(/@year(/@month))", params, ParamEncoding::Raw).unwrap();
		assert_eq!(generated, expected);
	}

	#[rstest]
	#[case(UrlParams::new(), "/static")]
	#[case(UrlParams::from([("splat", "css/site.css")]), "/static/css/site.css")]
	fn test_wildcard(#[case] params: UrlParams, #[case] expected: &str) {
		let generated = url("/static/*", params, ParamEncoding::Raw).unwrap();
		assert_eq!(generated, expected);
	}

	#[rstest]
	#[case("*", UrlParams::from([("splat", "a/b")]), "/a/b")]
	#[case("*", UrlParams::new(), "/")]
	#[case("*", UrlParams::from([("splat", "/a")]), "/a")]
	#[case("(/@lang)", UrlParams::new(), "/")]
	fn test_generated_path_is_absolute(
		#[case] pattern: &str,
		#[case] params: UrlParams,
		#[case] expected: &str,
	) {
		// Act
		let generated = url(pattern, params, ParamEncoding::Raw).unwrap();

		// Assert
		assert_eq!(generated, expected);
	}

	#[rstest]
	fn test_missing_parameter() {
		let result = url("/users/@id", UrlParams::new(), ParamEncoding::Raw);

		match result {
			Err(Error::MissingParameter { route, param }) => {
				assert_eq!(route, "test");
				assert_eq!(param, "id");
			}
			other => panic!("expected MissingParameter, got {:?}", other),
		}
	}

	#[rstest]
	#[case(ParamEncoding::Raw, "/search/a b/c")]
	#[case(ParamEncoding::Percent, "/search/a%20b%2Fc")]
	fn test_encoding_policy(#[case] encoding: ParamEncoding, #[case] expected: &str) {
		let generated = url("/search/@q", UrlParams::from([("q", "a b/c")]), encoding).unwrap();
		assert_eq!(generated, expected);
	}

	#[rstest]
	fn test_percent_encoding_keeps_splat_separators() {
		let generated = url(
			"/files/*",
			UrlParams::from([("splat", "my docs/a.txt")]),
			ParamEncoding::Percent,
		)
		.unwrap();
		assert_eq!(generated, "/files/my%20docs/a.txt");
	}

	#[rstest]
	fn test_root_pattern() {
		assert_eq!(url("/", UrlParams::new(), ParamEncoding::Raw).unwrap(), "/");
	}
}
