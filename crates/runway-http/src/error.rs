//! Error types shared by the routing and dispatch layers.

use http::Method;

/// Result type used throughout Runway.
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error raised by user code (handlers, middleware, hooks, views).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced while declaring routes, matching requests, generating
/// URLs or dispatching a request.
///
/// Matching and generation failures are always returned to the caller;
/// mapping them to a status code is the job of the boundary layer.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum Error {
	/// No route structurally matches the request path.
	#[error("Route not found: {method} {path}")]
	RouteNotFound { method: String, path: String },

	/// A route matches the path, but none accepts the request method.
	#[error("Method {method} not allowed for {path}")]
	MethodNotAllowed {
		method: String,
		path: String,
		allowed: Vec<Method>,
	},

	/// A named event was invoked without a registered implementation.
	#[error("{0} must be a mapped method")]
	UnmappedHandler(String),

	/// URL generation was asked for a route name that was never registered.
	#[error("Unknown route: {0}")]
	UnknownRoute(String),

	/// URL generation is missing a value for a required parameter.
	#[error("Missing parameter '{param}' for route '{route}'")]
	MissingParameter { route: String, param: String },

	/// A route pattern could not be compiled.
	#[error("Invalid route pattern '{pattern}': {reason}")]
	InvalidPattern { pattern: String, reason: String },

	/// A route declaration (method list, name, ...) is malformed.
	#[error("Invalid route declaration: {0}")]
	InvalidDeclaration(String),

	/// A header name or value is not valid on the wire.
	#[error("Invalid header: {0}")]
	InvalidHeader(String),

	/// A status code outside of `100..=999`.
	#[error("Invalid status code: {0}")]
	InvalidStatus(u16),

	/// Attempt to map a custom event over a built-in one.
	#[error("Cannot override built-in event: {0}")]
	ReservedEvent(String),

	/// Writing to the output channel failed.
	#[error("Output error: {0}")]
	Io(#[from] std::io::Error),

	/// Error raised by user code, propagated unmodified.
	#[error("Handler error: {0}")]
	Handler(#[source] BoxError),
}

impl Error {
	/// Wraps an arbitrary user error so it can cross the dispatcher.
	///
	/// # Examples
	///
	/// ```
	/// use runway_http::Error;
	///
	/// let err = Error::handler(std::fmt::Error);
	/// assert!(err.to_string().starts_with("Handler error"));
	/// ```
	pub fn handler<E>(err: E) -> Self
	where
		E: Into<BoxError>,
	{
		Self::Handler(err.into())
	}

	/// Status code the boundary layer should use for this error.
	pub fn status_hint(&self) -> http::StatusCode {
		match self {
			Self::RouteNotFound { .. } | Self::UnknownRoute(_) => http::StatusCode::NOT_FOUND,
			Self::MethodNotAllowed { .. } => http::StatusCode::METHOD_NOT_ALLOWED,
			_ => http::StatusCode::INTERNAL_SERVER_ERROR,
		}
	}
}
