//! Settings for routing and dispatch.
//!
//! # Examples
//!
//! ```
//! use runway::conf::Settings;
//!
//! let settings = Settings::from_toml_str("[routing]\ncase_sensitive = true\n").unwrap();
//! assert!(settings.routing.case_sensitive);
//! ```

pub use runway_conf::*;
