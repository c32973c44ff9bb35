//! Boundary layer: maps dispatch outcomes and errors to responses.

use crate::dispatcher::Dispatcher;
use http::header::ALLOW;
use http::{HeaderMap, HeaderValue, Method, StatusCode};
use runway_http::{Error, OutputStream, Request, Response, Result};
use std::io;
use std::sync::Arc;

type NotFoundHandler = Arc<dyn Fn(&Request, &mut Response) -> Result<()> + Send + Sync>;
type MethodNotAllowedHandler =
	Arc<dyn Fn(&Request, &[Method], &mut Response) -> Result<()> + Send + Sync>;
type ErrorHandler = Arc<dyn Fn(&Error, &mut Response) -> Result<()> + Send + Sync>;

/// Wraps a [`Dispatcher`] and turns every outcome into a sent response.
///
/// | outcome                | status |
/// |------------------------|--------|
/// | completed / rejected   | as set by the route |
/// | no matching route      | 404    |
/// | wrong method           | 405, with `Allow` |
/// | other errors           | [`Error::status_hint`], mostly 500 |
///
/// # Examples
///
/// ```
/// use http::StatusCode;
/// use runway_dispatch::{App, Dispatcher};
/// use runway_http::{MemoryOutput, Request};
/// use runway_urls::Router;
///
/// let mut router = Router::new();
/// router.get("/", |ctx| ctx.echo("home")).unwrap();
/// let app = App::new(Dispatcher::new(router));
///
/// let mut out = MemoryOutput::new();
/// let status = app.handle(&Request::get("/missing"), &mut out).unwrap();
///
/// assert_eq!(status, StatusCode::NOT_FOUND);
/// assert_eq!(out.body_string(), "404 Not Found");
/// ```
#[derive(Clone, Default)]
pub struct App {
	dispatcher: Dispatcher,
	not_found: Option<NotFoundHandler>,
	method_not_allowed: Option<MethodNotAllowedHandler>,
	error: Option<ErrorHandler>,
}

impl App {
	pub fn new(dispatcher: Dispatcher) -> Self {
		Self {
			dispatcher,
			..Self::default()
		}
	}

	pub fn dispatcher(&self) -> &Dispatcher {
		&self.dispatcher
	}

	pub fn dispatcher_mut(&mut self) -> &mut Dispatcher {
		&mut self.dispatcher
	}

	/// Replaces the default 404 body.
	pub fn on_not_found<F>(mut self, handler: F) -> Self
	where
		F: Fn(&Request, &mut Response) -> Result<()> + Send + Sync + 'static,
	{
		self.not_found = Some(Arc::new(handler));
		self
	}

	/// Replaces the default 405 body. The `Allow` header is set before the
	/// handler runs.
	pub fn on_method_not_allowed<F>(mut self, handler: F) -> Self
	where
		F: Fn(&Request, &[Method], &mut Response) -> Result<()> + Send + Sync + 'static,
	{
		self.method_not_allowed = Some(Arc::new(handler));
		self
	}

	/// Replaces the default 500 body.
	pub fn on_error<F>(mut self, handler: F) -> Self
	where
		F: Fn(&Error, &mut Response) -> Result<()> + Send + Sync + 'static,
	{
		self.error = Some(Arc::new(handler));
		self
	}

	/// Dispatches `request` and makes sure a response reaches `out`.
	///
	/// Returns the status that was sent. When hook or middleware output
	/// already emitted the head of a request that ends up unmatched, only
	/// the body follows and the emitted status is returned.
	///
	/// # Errors
	///
	/// Only when no response can be produced: the output channel fails, a
	/// custom status handler fails, or a handler fails after the response
	/// head was emitted.
	pub fn handle(&self, request: &Request, out: &mut dyn OutputStream) -> Result<StatusCode> {
		let mut out = TrackedOutput::new(out);
		let result = self
			.dispatcher
			.dispatch(request, &mut out)
			.and_then(|outcome| outcome.into_response(request));
		match result {
			Ok(response) => Ok(response.status()),
			Err(err) => self.respond_to(request, err, &mut out),
		}
	}

	fn respond_to(&self, request: &Request, err: Error, out: &mut TrackedOutput<'_>) -> Result<StatusCode> {
		let status = err.status_hint();
		let mut response = Response::new().with_status(status);
		match err {
			Error::RouteNotFound { .. } => match &self.not_found {
				Some(handler) => handler(request, &mut response)?,
				None => default_body(&mut response),
			},
			Error::MethodNotAllowed { allowed, .. } => {
				insert_allow(response.headers_mut(), &allowed)?;
				match &self.method_not_allowed {
					Some(handler) => handler(request, &allowed, &mut response)?,
					None => default_body(&mut response),
				}
			}
			err => {
				tracing::warn!(
					method = %request.method(),
					path = request.path(),
					status = status.as_u16(),
					error = %err,
					"Dispatch failed"
				);
				if out.emitted.is_some() {
					return Err(err);
				}
				match &self.error {
					Some(handler) => handler(&err, &mut response)?,
					None => default_body(&mut response),
				}
			}
		}
		send(response, out)
	}
}

fn default_body(response: &mut Response) {
	let status = response.status();
	let body = format!("{} {}", status.as_u16(), status.canonical_reason().unwrap_or(""));
	response.write(body.trim_end(), true);
}

fn send(mut response: Response, out: &mut TrackedOutput<'_>) -> Result<StatusCode> {
	if let Some(status) = out.emitted {
		tracing::debug!(
			status = response.status().as_u16(),
			sent = status.as_u16(),
			"Response head already emitted, sending body only"
		);
		out.write(response.body())?;
		out.flush()?;
		return Ok(status);
	}
	response.send(out)?;
	Ok(response.status())
}

fn insert_allow(headers: &mut HeaderMap, allowed: &[Method]) -> Result<()> {
	let value = allowed
		.iter()
		.map(Method::as_str)
		.collect::<Vec<_>>()
		.join(", ");
	let value = HeaderValue::from_str(&value).map_err(|_| Error::InvalidHeader(value.clone()))?;
	headers.insert(ALLOW, value);
	Ok(())
}

/// Output channel wrapper that remembers the status of an emitted head.
struct TrackedOutput<'a> {
	inner: &'a mut dyn OutputStream,
	emitted: Option<StatusCode>,
}

impl<'a> TrackedOutput<'a> {
	fn new(inner: &'a mut dyn OutputStream) -> Self {
		Self {
			inner,
			emitted: None,
		}
	}
}

impl OutputStream for TrackedOutput<'_> {
	fn emit_headers(&mut self, status: StatusCode, headers: &HeaderMap) -> io::Result<()> {
		self.emitted = Some(status);
		self.inner.emit_headers(status, headers)
	}

	fn write(&mut self, chunk: &[u8]) -> io::Result<()> {
		self.inner.write(chunk)
	}

	fn flush(&mut self) -> io::Result<()> {
		self.inner.flush()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use runway_http::MemoryOutput;
	use runway_urls::Router;
	use rstest::{fixture, rstest};

	#[fixture]
	fn app() -> App {
		let mut router = Router::new();
		router.get("/ok", |ctx| ctx.echo("fine")).unwrap();
		router.route("GET|POST /form", |_ctx| Ok(())).unwrap();
		router
			.get("/fail", |_ctx| -> Result<()> { Err(Error::handler("database is down")) })
			.unwrap();
		router
			.get("/stream-fail", |ctx| -> Result<()> {
				ctx.echo("partial")?;
				Err(Error::handler("stream broke"))
			})
			.unwrap()
			.stream();
		App::new(Dispatcher::new(router))
	}

	#[rstest]
	fn test_completed(app: App) {
		let mut out = MemoryOutput::new();

		let status = app.handle(&Request::get("/ok"), &mut out).unwrap();

		assert_eq!(status, StatusCode::OK);
		assert_eq!(out.body_string(), "fine");
	}

	#[rstest]
	fn test_method_not_allowed_sets_allow(app: App) {
		let mut out = MemoryOutput::new();

		let status = app
			.handle(&Request::new(Method::DELETE, "/form"), &mut out)
			.unwrap();

		assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
		assert_eq!(out.header("allow"), Some("GET, POST"));
		assert_eq!(out.body_string(), "405 Method Not Allowed");
	}

	#[rstest]
	fn test_handler_error_becomes_500(app: App) {
		// Arrange
		let mut out = MemoryOutput::new();

		// Act
		let status = app.handle(&Request::get("/fail"), &mut out).unwrap();

		// Assert
		assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
		assert_eq!(out.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
		assert_eq!(out.body_string(), "500 Internal Server Error");
	}

	#[rstest]
	fn test_custom_handlers(app: App) {
		let app = app
			.on_not_found(|request, response| {
				response.write(format!("no page at {}", request.path()), true);
				Ok(())
			})
			.on_error(|err, response| {
				response.write(format!("oops: {}", err), true);
				Ok(())
			});

		let mut missing = MemoryOutput::new();
		let mut failing = MemoryOutput::new();
		app.handle(&Request::get("/nope"), &mut missing).unwrap();
		app.handle(&Request::get("/fail"), &mut failing).unwrap();

		assert_eq!(missing.body_string(), "no page at /nope");
		assert_eq!(failing.body_string(), "oops: Handler error: database is down");
	}

	#[rstest]
	#[case(Error::UnknownRoute("gone".into()), StatusCode::NOT_FOUND, "404 Not Found")]
	#[case(Error::UnmappedHandler("greet".into()), StatusCode::INTERNAL_SERVER_ERROR, "500 Internal Server Error")]
	fn test_handler_error_status_follows_hint(
		#[case] err: Error,
		#[case] expected: StatusCode,
		#[case] body: &str,
	) {
		// Arrange
		let raised = std::sync::Mutex::new(Some(err));
		let mut router = Router::new();
		router
			.get("/raise", move |_ctx| -> Result<()> {
				match raised.lock().unwrap().take() {
					Some(err) => Err(err),
					None => Ok(()),
				}
			})
			.unwrap();
		let app = App::new(Dispatcher::new(router));
		let mut out = MemoryOutput::new();

		// Act
		let status = app.handle(&Request::get("/raise"), &mut out).unwrap();

		// Assert
		assert_eq!(status, expected);
		assert_eq!(out.status(), Some(expected));
		assert_eq!(out.body_string(), body);
	}

	#[rstest]
	fn test_custom_method_not_allowed_sees_allowed(app: App) {
		let app = app.on_method_not_allowed(|request, allowed, response| {
			response.write(format!("{} takes {}", request.path(), allowed.len()), true);
			Ok(())
		});
		let mut out = MemoryOutput::new();

		let status = app
			.handle(&Request::new(Method::PUT, "/form"), &mut out)
			.unwrap();

		assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
		assert_eq!(out.header("allow"), Some("GET, POST"));
		assert_eq!(out.body_string(), "/form takes 2");
	}

	#[rstest]
	fn test_error_after_stream_started_is_returned(app: App) {
		let mut out = MemoryOutput::new();

		let result = app.handle(&Request::get("/stream-fail"), &mut out);

		assert!(matches!(result, Err(Error::Handler(_))));
		assert_eq!(out.header_emissions(), 1);
		assert_eq!(out.body_string(), "partial");
	}
}
