//! Typed router and dispatcher settings.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Top-level settings, one table per layer.
///
/// ```toml
/// [routing]
/// case_sensitive = false
/// param_encoding = "raw"
/// decode_params = true
///
/// [dispatch]
/// legacy_output_buffering = false
/// rejection_status = 403
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
	pub routing: RoutingSettings,
	pub dispatch: DispatchSettings,
}

/// Settings consumed while compiling and matching route patterns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingSettings {
	/// Match paths case-sensitively. Methods are always case-insensitive.
	pub case_sensitive: bool,
	/// How `url_for` renders substituted parameter values.
	pub param_encoding: ParamEncoding,
	/// Percent-decode captured parameter values and the wildcard remainder.
	pub decode_params: bool,
}

impl Default for RoutingSettings {
	fn default() -> Self {
		Self {
			case_sensitive: false,
			param_encoding: ParamEncoding::Raw,
			decode_params: true,
		}
	}
}

/// Settings consumed by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchSettings {
	/// Compatibility buffering: capture everything echoed during hooks,
	/// middleware and the handler, and append it to the response body
	/// once, after content set directly on the response.
	pub legacy_output_buffering: bool,
	/// Status used when a middleware stops the dispatch without choosing
	/// a status of its own. Loading rejects values outside `100..=999`.
	pub rejection_status: u16,
}

impl Default for DispatchSettings {
	fn default() -> Self {
		Self {
			legacy_output_buffering: false,
			rejection_status: 403,
		}
	}
}

/// Encoding policy for parameter values substituted by `url_for`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamEncoding {
	/// Insert values verbatim; callers pass pre-sanitized path components.
	#[default]
	Raw,
	/// Percent-encode each value as a single path segment.
	Percent,
}

impl FromStr for ParamEncoding {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"raw" => Ok(Self::Raw),
			"percent" => Ok(Self::Percent),
			other => Err(format!("unknown parameter encoding '{}'", other)),
		}
	}
}
