//! Parameters captured from a matched path.

use std::str::FromStr;

/// Named parameters captured by a route pattern, in pattern order.
///
/// An optional parameter whose segment is absent from the path is kept
/// with no value, so positional access stays aligned with the pattern.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
	entries: Vec<(String, Option<String>)>,
}

impl Params {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push(&mut self, name: impl Into<String>, value: Option<String>) {
		self.entries.push((name.into(), value));
	}

	/// Value captured for `name`.
	///
	/// # Examples
	///
	/// ```
	/// use runway_http::Params;
	///
	/// let mut params = Params::new();
	/// params.push("id", Some("42".to_string()));
	/// params.push("slug", None);
	///
	/// assert_eq!(params.get("id"), Some("42"));
	/// assert_eq!(params.get("slug"), None);
	/// assert!(params.contains("slug"));
	/// ```
	pub fn get(&self, name: &str) -> Option<&str> {
		self.entries
			.iter()
			.find(|(key, _)| key == name)
			.and_then(|(_, value)| value.as_deref())
	}

	/// Positional access, following the order of the pattern.
	pub fn get_index(&self, index: usize) -> Option<&str> {
		self.entries
			.get(index)
			.and_then(|(_, value)| value.as_deref())
	}

	/// Parses the value captured for `name`. `None` when absent or not
	/// parsable as `T`.
	pub fn parse<T: FromStr>(&self, name: &str) -> Option<T> {
		self.get(name).and_then(|value| value.parse().ok())
	}

	/// True if the pattern declares `name`, captured or not.
	pub fn contains(&self, name: &str) -> bool {
		self.entries.iter().any(|(key, _)| key == name)
	}

	pub fn names(&self) -> impl Iterator<Item = &str> {
		self.entries.iter().map(|(key, _)| key.as_str())
	}

	/// Values in pattern order; absent optional values are `None`.
	pub fn values(&self) -> impl Iterator<Item = Option<&str>> {
		self.entries.iter().map(|(_, value)| value.as_deref())
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
		self.entries
			.iter()
			.map(|(key, value)| (key.as_str(), value.as_deref()))
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}
