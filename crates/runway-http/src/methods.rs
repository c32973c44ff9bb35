//! HTTP method helpers used by route declarations.

use crate::{Error, Result};
use http::Method;
use std::fmt;

/// Set of methods a route accepts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MethodFilter {
	/// Accepts every method (`*` or no method prefix in a declaration).
	#[default]
	Any,
	/// Accepts only the listed methods, in declaration order.
	Only(Vec<Method>),
}

impl MethodFilter {
	/// Parses a `|`-separated method list such as `"GET|POST"`.
	///
	/// Tokens are case-insensitive. `*` yields [`MethodFilter::Any`].
	///
	/// # Examples
	///
	/// ```
	/// use runway_http::MethodFilter;
	/// use http::Method;
	///
	/// let filter = MethodFilter::parse("get|Post").unwrap();
	/// assert!(filter.accepts(&Method::POST));
	/// assert!(!filter.accepts(&Method::DELETE));
	/// ```
	pub fn parse(list: &str) -> Result<Self> {
		let mut methods = Vec::new();
		for token in list.split('|').map(str::trim) {
			if token == "*" {
				return Ok(Self::Any);
			}
			methods.push(parse_method(token)?);
		}
		Ok(Self::Only(methods))
	}

	/// Returns true when `method` is allowed by this filter. Comparison
	/// ignores ASCII case, so extension methods built from lower-case bytes
	/// still match.
	pub fn accepts(&self, method: &Method) -> bool {
		match self {
			Self::Any => true,
			Self::Only(methods) => methods
				.iter()
				.any(|m| m.as_str().eq_ignore_ascii_case(method.as_str())),
		}
	}

	/// Methods explicitly listed, empty for [`MethodFilter::Any`].
	pub fn methods(&self) -> &[Method] {
		match self {
			Self::Any => &[],
			Self::Only(methods) => methods,
		}
	}

	pub fn is_any(&self) -> bool {
		matches!(self, Self::Any)
	}
}

impl From<Method> for MethodFilter {
	fn from(method: Method) -> Self {
		Self::Only(vec![method])
	}
}

impl fmt::Display for MethodFilter {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Any => write!(f, "*"),
			Self::Only(methods) => {
				let names: Vec<&str> = methods.iter().map(Method::as_str).collect();
				write!(f, "{}", names.join("|"))
			}
		}
	}
}

/// Parses a single method token, normalising it to upper case.
pub fn parse_method(token: &str) -> Result<Method> {
	if token.is_empty() {
		return Err(Error::InvalidDeclaration("empty HTTP method".to_string()));
	}
	Method::from_bytes(token.to_ascii_uppercase().as_bytes())
		.map_err(|_| Error::InvalidDeclaration(format!("invalid HTTP method '{}'", token)))
}
