//! Configuration sources for layered settings.
//!
//! Sources are applied in the order they are added to a
//! [`SettingsBuilder`]; later sources override earlier ones.

use crate::settings::{ParamEncoding, Settings};
use http::StatusCode;
use std::fs;
use std::path::PathBuf;

/// Error type for configuration sources.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("TOML parse error: {0}")]
	TomlParse(#[from] toml::de::Error),

	#[error("TOML encode error: {0}")]
	TomlEncode(#[from] toml::ser::Error),

	#[error("Invalid value for {key}: {reason}")]
	InvalidValue { key: String, reason: String },
}

/// A source of configuration values.
pub trait ConfigSource {
	/// Applies this source on top of `settings`.
	fn apply(&self, settings: &mut Settings) -> Result<(), ConfigError>;

	/// Description used in diagnostics.
	fn description(&self) -> String;
}

/// TOML document held in memory.
pub struct TomlSource {
	content: String,
}

impl TomlSource {
	pub fn new(content: impl Into<String>) -> Self {
		Self {
			content: content.into(),
		}
	}
}

impl ConfigSource for TomlSource {
	fn apply(&self, settings: &mut Settings) -> Result<(), ConfigError> {
		merge_toml(settings, &self.content)
	}

	fn description(&self) -> String {
		"TOML string".to_string()
	}
}

/// TOML file on disk. A missing file contributes nothing.
pub struct TomlFileSource {
	path: PathBuf,
}

impl TomlFileSource {
	/// Create a new TOML file configuration source
	///
	/// # Examples
	///
	/// ```
	/// use runway_conf::sources::TomlFileSource;
	///
	/// let source = TomlFileSource::new("runway.toml");
	/// ```
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}
}

impl ConfigSource for TomlFileSource {
	fn apply(&self, settings: &mut Settings) -> Result<(), ConfigError> {
		if !self.path.exists() {
			return Ok(());
		}
		let content = fs::read_to_string(&self.path)?;
		merge_toml(settings, &content)
	}

	fn description(&self) -> String {
		format!("TOML file: {}", self.path.display())
	}
}

/// Environment variable overrides, e.g. `RUNWAY_CASE_SENSITIVE=true`.
///
/// Recognised keys (after the prefix): `CASE_SENSITIVE`, `PARAM_ENCODING`,
/// `DECODE_PARAMS`, `LEGACY_OUTPUT_BUFFERING`, `REJECTION_STATUS`.
pub struct EnvSource {
	prefix: String,
	vars: Option<Vec<(String, String)>>,
}

impl EnvSource {
	/// Reads the process environment with the `RUNWAY_` prefix.
	pub fn new() -> Self {
		Self {
			prefix: "RUNWAY_".to_string(),
			vars: None,
		}
	}

	pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.prefix = prefix.into();
		self
	}

	/// Uses a fixed set of variables instead of the process environment.
	pub fn from_vars<I, K, V>(vars: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		Self {
			prefix: "RUNWAY_".to_string(),
			vars: Some(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect()),
		}
	}

	fn vars(&self) -> Vec<(String, String)> {
		match &self.vars {
			Some(vars) => vars.clone(),
			None => std::env::vars().collect(),
		}
	}
}

impl Default for EnvSource {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigSource for EnvSource {
	fn apply(&self, settings: &mut Settings) -> Result<(), ConfigError> {
		for (key, value) in self.vars() {
			let Some(name) = key.strip_prefix(&self.prefix) else {
				continue;
			};
			match name {
				"CASE_SENSITIVE" => settings.routing.case_sensitive = parse_bool(&key, &value)?,
				"DECODE_PARAMS" => settings.routing.decode_params = parse_bool(&key, &value)?,
				"PARAM_ENCODING" => {
					settings.routing.param_encoding = value
						.parse::<ParamEncoding>()
						.map_err(|reason| ConfigError::InvalidValue {
							key: key.clone(),
							reason,
						})?;
				}
				"LEGACY_OUTPUT_BUFFERING" => {
					settings.dispatch.legacy_output_buffering = parse_bool(&key, &value)?;
				}
				"REJECTION_STATUS" => {
					let status = value.trim().parse().map_err(|_| ConfigError::InvalidValue {
						key: key.clone(),
						reason: format!("'{}' is not a status code", value),
					})?;
					settings.dispatch.rejection_status = check_status(&key, status)?;
				}
				_ => {}
			}
		}
		Ok(())
	}

	fn description(&self) -> String {
		format!("Environment variables with prefix {}", self.prefix)
	}
}

/// Builds [`Settings`] from an ordered list of sources.
#[derive(Default)]
pub struct SettingsBuilder {
	sources: Vec<Box<dyn ConfigSource>>,
}

impl SettingsBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn add_source<S: ConfigSource + 'static>(mut self, source: S) -> Self {
		self.sources.push(Box::new(source));
		self
	}

	/// Applies every source over the defaults.
	///
	/// # Errors
	///
	/// Fails on the first source that cannot be applied, or with
	/// [`ConfigError::InvalidValue`] when the merged settings hold a value
	/// that is out of range.
	pub fn build(self) -> Result<Settings, ConfigError> {
		let mut settings = Settings::default();
		for source in &self.sources {
			source.apply(&mut settings)?;
		}
		check_status("dispatch.rejection_status", settings.dispatch.rejection_status)?;
		Ok(settings)
	}
}

fn check_status(key: &str, status: u16) -> Result<u16, ConfigError> {
	StatusCode::from_u16(status)
		.map(|code| code.as_u16())
		.map_err(|_| ConfigError::InvalidValue {
			key: key.to_string(),
			reason: format!("{} is not an HTTP status code", status),
		})
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
	match value.trim().to_ascii_lowercase().as_str() {
		"1" | "true" | "yes" | "on" => Ok(true),
		"0" | "false" | "no" | "off" => Ok(false),
		_ => Err(ConfigError::InvalidValue {
			key: key.to_string(),
			reason: format!("'{}' is not a boolean", value),
		}),
	}
}

// Deep-merges a TOML document over the current settings so that keys not
// present in the document keep their current value.
fn merge_toml(settings: &mut Settings, content: &str) -> Result<(), ConfigError> {
	let overlay: toml::Table = toml::from_str(content)?;
	let mut base = match toml::Value::try_from(&*settings)? {
		toml::Value::Table(table) => table,
		_ => toml::Table::new(),
	};
	merge_tables(&mut base, overlay);
	*settings = toml::Value::Table(base).try_into()?;
	Ok(())
}

fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
	for (key, value) in overlay {
		match (base.get_mut(&key), value) {
			(Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
				merge_tables(existing, incoming);
			}
			(_, value) => {
				base.insert(key, value);
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_toml_source_partial_override() {
		let settings = SettingsBuilder::new()
			.add_source(TomlSource::new("[dispatch]\nlegacy_output_buffering = true\n"))
			.build()
			.unwrap();

		assert!(settings.dispatch.legacy_output_buffering);
		assert_eq!(settings.dispatch.rejection_status, 403);
		assert!(!settings.routing.case_sensitive);
	}

	#[rstest]
	fn test_env_source_overrides() {
		let env = EnvSource::from_vars([
			("RUNWAY_CASE_SENSITIVE", "true"),
			("RUNWAY_PARAM_ENCODING", "percent"),
			("RUNWAY_REJECTION_STATUS", "401"),
			("OTHER_VAR", "ignored"),
		]);

		let settings = SettingsBuilder::new().add_source(env).build().unwrap();

		assert!(settings.routing.case_sensitive);
		assert_eq!(settings.routing.param_encoding, ParamEncoding::Percent);
		assert_eq!(settings.dispatch.rejection_status, 401);
	}

	#[rstest]
	fn test_env_source_rejects_bad_bool() {
		let env = EnvSource::from_vars([("RUNWAY_DECODE_PARAMS", "maybe")]);
		let result = SettingsBuilder::new().add_source(env).build();
		assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
	}

	#[rstest]
	#[case(TomlSource::new("[dispatch]\nrejection_status = 42\n"), "dispatch.rejection_status")]
	#[case(TomlSource::new("[dispatch]\nrejection_status = 1000\n"), "dispatch.rejection_status")]
	fn test_toml_rejection_status_out_of_range(#[case] source: TomlSource, #[case] expected_key: &str) {
		// Act
		let result = SettingsBuilder::new().add_source(source).build();

		// Assert
		match result {
			Err(ConfigError::InvalidValue { key, .. }) => assert_eq!(key, expected_key),
			other => panic!("expected InvalidValue, got {:?}", other),
		}
	}

	#[rstest]
	#[case("42")]
	#[case("99")]
	fn test_env_rejection_status_out_of_range(#[case] value: &str) {
		let env = EnvSource::from_vars([("RUNWAY_REJECTION_STATUS", value)]);

		let result = SettingsBuilder::new().add_source(env).build();

		assert!(matches!(
			result,
			Err(ConfigError::InvalidValue { key, .. }) if key == "RUNWAY_REJECTION_STATUS"
		));
	}

	#[rstest]
	fn test_missing_file_contributes_nothing() {
		let settings = SettingsBuilder::new()
			.add_source(TomlFileSource::new("/nonexistent/runway.toml"))
			.build()
			.unwrap();
		assert_eq!(settings, Settings::default());
	}

	#[rstest]
	fn test_later_sources_win() {
		let settings = SettingsBuilder::new()
			.add_source(TomlSource::new("[routing]\ncase_sensitive = true\n"))
			.add_source(EnvSource::from_vars([("RUNWAY_CASE_SENSITIVE", "false")]))
			.build()
			.unwrap();
		assert!(!settings.routing.case_sensitive);
	}
}
