//! # Runway Conf
//!
//! Typed settings for the Runway router and dispatcher, assembled from
//! layered sources (defaults < TOML < environment).
//!
//! ## Examples
//!
//! ```
//! use runway_conf::{SettingsBuilder, TomlSource};
//!
//! let settings = SettingsBuilder::new()
//!     .add_source(TomlSource::new("[routing]\ncase_sensitive = true\n"))
//!     .build()
//!     .unwrap();
//!
//! assert!(settings.routing.case_sensitive);
//! assert!(!settings.dispatch.legacy_output_buffering);
//! ```

pub mod settings;
pub mod sources;

pub use settings::{DispatchSettings, ParamEncoding, RoutingSettings, Settings};
pub use sources::{
	ConfigError, ConfigSource, EnvSource, SettingsBuilder, TomlFileSource, TomlSource,
};

impl Settings {
	/// Parses settings from a TOML document, filling gaps with defaults.
	pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
		SettingsBuilder::new()
			.add_source(TomlSource::new(content))
			.build()
	}

	/// Loads settings from a TOML file followed by `RUNWAY_*` environment
	/// overrides.
	pub fn load(path: impl Into<std::path::PathBuf>) -> Result<Self, ConfigError> {
		SettingsBuilder::new()
			.add_source(TomlFileSource::new(path))
			.add_source(EnvSource::new())
			.build()
	}
}
