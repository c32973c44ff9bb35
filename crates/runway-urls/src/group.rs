//! Declaration-time group scopes.
//!
//! Each open group contributes a prefix and a list of middleware to every
//! route declared while it is open.
//!
//! Prefixes join literally, with one adjustment at each join point: a
//! trailing `/` on the left and a leading `/` on the right collapse into a
//! single `/`. Slashes inside a single prefix are left alone.

use runway_http::Middleware;
use std::sync::Arc;

#[derive(Clone)]
struct GroupFrame {
	prefix: String,
	middleware: Vec<Arc<dyn Middleware>>,
}

/// Stack of open groups.
#[derive(Clone, Default)]
pub struct GroupStack {
	frames: Vec<GroupFrame>,
}

impl GroupStack {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push(&mut self, prefix: impl Into<String>, middleware: Vec<Arc<dyn Middleware>>) {
		self.frames.push(GroupFrame {
			prefix: prefix.into(),
			middleware,
		});
	}

	/// Closes the innermost group. Returns false when no group is open.
	pub fn pop(&mut self) -> bool {
		self.frames.pop().is_some()
	}

	pub fn depth(&self) -> usize {
		self.frames.len()
	}

	/// Effective prefix of all open groups.
	///
	/// # Examples
	///
	/// ```
	/// use runway_urls::GroupStack;
	///
	/// let mut stack = GroupStack::new();
	/// stack.push("/a", Vec::new());
	/// stack.push("/b/", Vec::new());
	/// stack.push("/c", Vec::new());
	/// assert_eq!(stack.current_prefix(), "/a/b/c");
	/// ```
	pub fn current_prefix(&self) -> String {
		self.frames
			.iter()
			.fold(String::new(), |acc, frame| join_path(&acc, &frame.prefix))
	}

	/// Middleware of all open groups, outermost first.
	pub fn current_middleware(&self) -> Vec<Arc<dyn Middleware>> {
		self.frames
			.iter()
			.flat_map(|frame| frame.middleware.iter().cloned())
			.collect()
	}

	/// Effective pattern of a route declared inside the open groups.
	///
	/// A route pattern of exactly `/` inside a non-empty prefix adds
	/// nothing; an empty result is `/`.
	pub fn effective_pattern(&self, pattern: &str) -> String {
		let prefix = self.current_prefix();
		let joined = if pattern == "/" && !prefix.is_empty() {
			prefix
		} else {
			join_path(&prefix, pattern)
		};
		if joined.is_empty() {
			"/".to_string()
		} else {
			joined
		}
	}
}

/// Joins two path parts, collapsing the slash at the join point only.
pub fn join_path(left: &str, right: &str) -> String {
	match (left.ends_with('/'), right.starts_with('/')) {
		(true, true) => format!("{}{}", left, &right[1..]),
		_ => format!("{}{}", left, right),
	}
}
