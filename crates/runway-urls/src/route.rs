//! A declared route: methods, compiled pattern, handler and per-route
//! options.

use crate::pattern::PathPattern;
use http::{HeaderMap, StatusCode};
use runway_http::{Handler, MethodFilter, Middleware, RouteInfo};
use std::fmt;
use std::sync::Arc;

/// Streaming mode of a route.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Streaming {
	/// Output is buffered into the response body.
	#[default]
	Off,
	/// Output goes straight to the output channel.
	On,
	/// Like [`Streaming::On`], emitting the given status and headers before
	/// the handler runs.
	WithHeaders {
		status: StatusCode,
		headers: HeaderMap,
	},
}

impl Streaming {
	pub fn is_on(&self) -> bool {
		!matches!(self, Self::Off)
	}
}

/// A compiled route.
///
/// Routes are created by [`Router`](crate::Router) declarations and
/// only change afterwards through the [`RouteHandle`](crate::RouteHandle)
/// returned at registration.
#[derive(Clone)]
pub struct Route {
	pub(crate) methods: MethodFilter,
	pub(crate) pattern: PathPattern,
	pub(crate) name: Option<String>,
	pub(crate) middleware: Vec<Arc<dyn Middleware>>,
	pub(crate) streaming: Streaming,
	pub(crate) handler: Arc<dyn Handler>,
	pub(crate) pass_route: bool,
}

impl Route {
	pub fn new(methods: MethodFilter, pattern: PathPattern, handler: Arc<dyn Handler>) -> Self {
		Self {
			methods,
			pattern,
			name: None,
			middleware: Vec::new(),
			streaming: Streaming::Off,
			handler,
			pass_route: false,
		}
	}

	pub fn methods(&self) -> &MethodFilter {
		&self.methods
	}

	pub fn pattern(&self) -> &PathPattern {
		&self.pattern
	}

	pub fn name(&self) -> Option<&str> {
		self.name.as_deref()
	}

	/// Middleware in execution order (outermost group first).
	pub fn middleware(&self) -> &[Arc<dyn Middleware>] {
		&self.middleware
	}

	pub fn streaming(&self) -> &Streaming {
		&self.streaming
	}

	pub fn handler(&self) -> &Arc<dyn Handler> {
		&self.handler
	}

	/// Whether the handler receives the route description.
	pub fn passes_route(&self) -> bool {
		self.pass_route
	}

	/// Description handed to handlers of routes declared with route passing.
	pub fn info(&self) -> RouteInfo {
		RouteInfo {
			pattern: self.pattern.pattern().to_string(),
			name: self.name.clone(),
			methods: self.methods.clone(),
			streamed: self.streaming.is_on(),
		}
	}
}

impl fmt::Debug for Route {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Route")
			.field("methods", &self.methods.to_string())
			.field("pattern", &self.pattern.pattern())
			.field("name", &self.name)
			.field("middleware", &self.middleware.len())
			.field("streaming", &self.streaming)
			.field("pass_route", &self.pass_route)
			.finish()
	}
}
