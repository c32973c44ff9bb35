//! Request dispatch.
//!
//! A dispatch walks through these stages:
//!
//! 1. match the request against the route table (no match and wrong
//!    method are terminal outcomes; nothing else runs)
//! 2. `start` before hooks
//! 3. middleware `before` phases, outer to inner
//! 4. the handler
//! 5. middleware `after` phases, inner to outer, for every middleware
//!    whose `before` phase ran
//! 6. `start` after hooks
//! 7. finalize: `stop` before hooks, send the response, `stop` after hooks
//!
//! ## Output buffering
//!
//! By default handler output is captured and appended to the response
//! body; hooks and middleware write straight to the output channel. The
//! first direct write emits the response head, so status and header
//! changes made after it never reach the client and no `Content-Length`
//! is sent.
//!
//! With `legacy_output_buffering` everything echoed from the `start`
//! hooks until the response is sent is captured and appended to the body
//! after the `stop` before hooks, following whatever was set with
//! [`Response::write`].
//!
//! Streaming routes emit their headers up front and write all output
//! straight through, leaving the body empty. Output captured by the
//! legacy mode before the stream opened is written right after the head.

use crate::hooks::{Action, EventRegistry, Phase, START, STOP};
use crate::onion::{Layered, around};
use bytes::BytesMut;
use http::{Method, StatusCode};
use runway_conf::{DispatchSettings, Settings};
use runway_http::{
	Context, Error, Flow, Hook, HookContext, IntoControl, Output, OutputStream, Params, Request,
	Response, Result, RouteInfo, hook_fn,
};
use runway_urls::{Lookup, Route, RouteMatch, Router, Streaming};
use std::sync::Arc;

/// Result of dispatching one request.
#[derive(Debug)]
pub enum Outcome {
	/// A handler completed; the response has been sent.
	Completed(Response),
	/// A middleware stopped the request; the response has been sent.
	Rejected(Response),
	/// No route matches the path (or every matching route passed).
	NotFound,
	/// Routes match the path but none accepts the method.
	MethodNotAllowed { allowed: Vec<Method> },
}

impl Outcome {
	/// The sent response, for completed and rejected dispatches.
	pub fn response(&self) -> Option<&Response> {
		match self {
			Self::Completed(response) | Self::Rejected(response) => Some(response),
			Self::NotFound | Self::MethodNotAllowed { .. } => None,
		}
	}

	pub fn status(&self) -> StatusCode {
		match self {
			Self::Completed(response) | Self::Rejected(response) => response.status(),
			Self::NotFound => StatusCode::NOT_FOUND,
			Self::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
		}
	}

	/// The sent response, or the matching failure as an [`Error`].
	///
	/// # Errors
	///
	/// [`Error::RouteNotFound`] and [`Error::MethodNotAllowed`] for the
	/// terminal outcomes.
	///
	/// # Examples
	///
	/// ```
	/// use http::StatusCode;
	/// use runway_dispatch::Outcome;
	/// use runway_http::Request;
	///
	/// let err = Outcome::NotFound
	///     .into_response(&Request::get("/missing"))
	///     .unwrap_err();
	/// assert_eq!(err.status_hint(), StatusCode::NOT_FOUND);
	/// ```
	pub fn into_response(self, request: &Request) -> Result<Response> {
		match self {
			Self::Completed(response) | Self::Rejected(response) => Ok(response),
			Self::NotFound => Err(Error::RouteNotFound {
				method: request.method().to_string(),
				path: request.path().to_string(),
			}),
			Self::MethodNotAllowed { allowed } => Err(Error::MethodNotAllowed {
				method: request.method().to_string(),
				path: request.path().to_string(),
				allowed,
			}),
		}
	}
}

/// Routes requests and runs hooks, middleware and handlers.
///
/// Routes are declared on the [`Router`] before dispatching starts;
/// [`Dispatcher::dispatch`] only needs shared access, so a fully declared
/// dispatcher can be shared between threads.
#[derive(Clone, Default)]
pub struct Dispatcher {
	router: Router,
	events: EventRegistry,
	settings: DispatchSettings,
}

impl Dispatcher {
	pub fn new(router: Router) -> Self {
		Self::with_settings(router, DispatchSettings::default())
	}

	pub fn with_settings(router: Router, settings: DispatchSettings) -> Self {
		Self {
			router,
			events: EventRegistry::new(),
			settings,
		}
	}

	/// Creates a dispatcher with an empty router, both configured from
	/// `settings`.
	///
	/// # Examples
	///
	/// ```
	/// use runway_conf::Settings;
	/// use runway_dispatch::Dispatcher;
	///
	/// let settings = Settings::from_toml_str("[dispatch]\nlegacy_output_buffering = true\n")
	///     .unwrap();
	/// let dispatcher = Dispatcher::from_settings(&settings);
	/// assert!(dispatcher.settings().legacy_output_buffering);
	/// ```
	pub fn from_settings(settings: &Settings) -> Self {
		Self::with_settings(
			Router::with_settings(settings.routing.clone()),
			settings.dispatch.clone(),
		)
	}

	pub fn router(&self) -> &Router {
		&self.router
	}

	pub fn router_mut(&mut self) -> &mut Router {
		&mut self.router
	}

	pub fn settings(&self) -> &DispatchSettings {
		&self.settings
	}

	/// Switches the compatibility buffering mode.
	pub fn set_legacy_output_buffering(&mut self, enabled: bool) {
		self.settings.legacy_output_buffering = enabled;
	}

	pub fn events(&self) -> &EventRegistry {
		&self.events
	}

	/// Registers a hook that runs before `event`.
	///
	/// # Examples
	///
	/// ```
	/// use runway_dispatch::{Dispatcher, START};
	/// use runway_http::{MemoryOutput, Request};
	/// use runway_urls::Router;
	///
	/// let mut dispatcher = Dispatcher::new(Router::new());
	/// dispatcher.router_mut().get("/", |ctx| ctx.echo("test")).unwrap();
	/// dispatcher.before(START, |ctx| ctx.echo("hooked before start"));
	///
	/// let mut out = MemoryOutput::new();
	/// let outcome = dispatcher.dispatch(&Request::get("/"), &mut out).unwrap();
	///
	/// assert_eq!(out.body_string(), "hooked before starttest");
	/// assert_eq!(outcome.response().unwrap().body(), b"test");
	/// ```
	pub fn before<F, R>(&mut self, event: &str, hook: F)
	where
		F: Fn(&mut HookContext<'_>) -> Result<R> + Send + Sync + 'static,
		R: IntoControl + 'static,
	{
		self.events.add(Phase::Before, event, Arc::new(hook_fn(hook)));
	}

	/// Registers a hook that runs after `event`.
	pub fn after<F, R>(&mut self, event: &str, hook: F)
	where
		F: Fn(&mut HookContext<'_>) -> Result<R> + Send + Sync + 'static,
		R: IntoControl + 'static,
	{
		self.events.add(Phase::After, event, Arc::new(hook_fn(hook)));
	}

	/// Registers a [`Hook`] implementation.
	pub fn add_hook(&mut self, phase: Phase, event: &str, hook: Arc<dyn Hook>) {
		self.events.add(phase, event, hook);
	}

	/// Maps a custom event to an action, to be executed with
	/// [`Dispatcher::run`].
	///
	/// # Errors
	///
	/// [`Error::ReservedEvent`](runway_http::Error::ReservedEvent) when
	/// `name` is `start` or `stop`.
	pub fn map<F>(&mut self, name: &str, action: F) -> Result<()>
	where
		F: Fn(&mut HookContext<'_>) -> Result<()> + Send + Sync + 'static,
	{
		let action: Action = Arc::new(action);
		self.events.map(name, action)
	}

	/// Executes a mapped event with its hooks, writing to `out`.
	///
	/// # Errors
	///
	/// [`Error::UnmappedHandler`](runway_http::Error::UnmappedHandler) when
	/// `name` was never mapped.
	pub fn run(&self, name: &str, response: &mut Response, out: &mut dyn OutputStream) -> Result<()> {
		self.events.run(name, response, Output::Direct(out))
	}

	/// Dispatches one request, writing the response to `out`.
	///
	/// # Errors
	///
	/// Errors raised by handlers, middleware or hooks are returned
	/// unmodified once the entered middleware has been unwound. Nothing is
	/// sent for a failed dispatch unless a streaming route already emitted
	/// its headers.
	pub fn dispatch(&self, request: &Request, out: &mut dyn OutputStream) -> Result<Outcome> {
		let table = self.router.table();
		let mut current = match table.find(request.method(), request.path()) {
			Lookup::Found(matched) => matched,
			Lookup::MethodNotAllowed { allowed } => {
				tracing::debug!(
					method = %request.method(),
					path = request.path(),
					"No route accepts the request method"
				);
				return Ok(Outcome::MethodNotAllowed { allowed });
			}
			Lookup::NotFound => {
				tracing::debug!(
					method = %request.method(),
					path = request.path(),
					"No route matches the request path"
				);
				return Ok(Outcome::NotFound);
			}
		};

		let mut exchange = Exchange::new(self.settings.legacy_output_buffering);
		self.fire(Phase::Before, START, &mut exchange, out)?;

		let finished = loop {
			tracing::debug!(
				method = %request.method(),
				path = request.path(),
				pattern = current.route.pattern().pattern(),
				"Dispatching to route"
			);
			let executed = self.execute(request, &current, &mut exchange, out)?;
			if executed != Executed::Passed {
				break Some((executed, current.route.streaming().is_on()));
			}
			match table.find_from(current.index + 1, request.method(), request.path()) {
				Lookup::Found(next) => current = next,
				Lookup::MethodNotAllowed { .. } | Lookup::NotFound => break None,
			}
		};

		self.fire(Phase::After, START, &mut exchange, out)?;

		let Some((executed, streamed)) = finished else {
			tracing::debug!(path = request.path(), "Every matching route passed");
			return Ok(Outcome::NotFound);
		};

		if executed == Executed::Rejected {
			self.reject(&mut exchange.response)?;
		}
		self.finalize(&mut exchange, streamed, out)?;

		let response = exchange.response;
		tracing::debug!(status = response.status().as_u16(), "Dispatch finished");
		Ok(match executed {
			Executed::Rejected => Outcome::Rejected(response),
			Executed::Done | Executed::Passed => Outcome::Completed(response),
		})
	}

	fn execute(
		&self,
		request: &Request,
		matched: &RouteMatch<'_>,
		exchange: &mut Exchange,
		out: &mut dyn OutputStream,
	) -> Result<Executed> {
		let route = matched.route;
		let streamed = route.streaming().is_on();
		if streamed {
			open_stream(route, &mut exchange.response, out)?;
			if let Some(buffer) = exchange.legacy.take() {
				out.write(&buffer)?;
			}
		}

		let info = route.passes_route().then(|| route.info());
		let mut run = RouteRun {
			request,
			params: &matched.params,
			splat: matched.splat.as_deref(),
			info: info.as_ref(),
			exchange,
			out,
			streamed,
		};

		let layered = around(
			route.middleware(),
			&mut run,
			|run, middleware| run.phase(Stage::Middleware, |ctx| middleware.before(ctx)),
			|run| run.phase(Stage::Handler, |ctx| route.handler().handle(ctx)),
			|run, middleware| run.phase(Stage::Middleware, |ctx| middleware.after(ctx)),
		)?;

		Ok(match layered {
			Layered::Inner(Flow::Done) => Executed::Done,
			Layered::Inner(Flow::Pass) => {
				tracing::debug!(pattern = route.pattern().pattern(), "Handler passed");
				Executed::Passed
			}
			Layered::Stopped(position) => {
				tracing::warn!(
					pattern = route.pattern().pattern(),
					middleware = position,
					"Middleware rejected the request"
				);
				Executed::Rejected
			}
		})
	}

	fn fire(
		&self,
		phase: Phase,
		event: &str,
		exchange: &mut Exchange,
		out: &mut dyn OutputStream,
	) -> Result<()> {
		let output = match exchange.legacy.as_mut() {
			Some(buffer) => Output::Captured(buffer),
			None => Output::Direct(out),
		};
		self.events.fire(phase, event, &mut exchange.response, output)
	}

	// A middleware stop keeps a status the middleware chose itself.
	fn reject(&self, response: &mut Response) -> Result<()> {
		if response.status() == StatusCode::OK {
			response.set_status(self.settings.rejection_status)?;
		}
		if response.body().is_empty() {
			response.write("Forbidden", false);
		}
		Ok(())
	}

	fn finalize(&self, exchange: &mut Exchange, streamed: bool, out: &mut dyn OutputStream) -> Result<()> {
		self.fire(Phase::Before, STOP, exchange, out)?;
		if let Some(buffer) = exchange.legacy.take() {
			exchange.response.write(&buffer[..], false);
		}
		if streamed {
			exchange.response.clear_body();
			out.flush()?;
		} else {
			exchange.response.send(out)?;
		}
		self.fire(Phase::After, STOP, exchange, out)
	}
}

/// How a single route execution ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Executed {
	Done,
	Passed,
	Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
	Middleware,
	Handler,
}

/// Per-request state owned by the dispatcher.
struct Exchange {
	response: Response,
	/// Capture buffer of the compatibility mode, until the response is sent.
	legacy: Option<BytesMut>,
	/// Capture buffer of the current handler phase.
	phase: BytesMut,
}

impl Exchange {
	fn new(legacy: bool) -> Self {
		Self {
			response: Response::new(),
			legacy: legacy.then(BytesMut::new),
			phase: BytesMut::new(),
		}
	}
}

/// Everything the phases of one route execution share.
struct RouteRun<'r, 'o> {
	request: &'r Request,
	params: &'r Params,
	splat: Option<&'r str>,
	info: Option<&'r RouteInfo>,
	exchange: &'r mut Exchange,
	out: &'o mut dyn OutputStream,
	streamed: bool,
}

impl RouteRun<'_, '_> {
	fn phase<T>(&mut self, stage: Stage, f: impl FnOnce(&mut Context<'_>) -> Result<T>) -> Result<T> {
		let Exchange {
			response,
			legacy,
			phase,
		} = &mut *self.exchange;

		let output = if self.streamed {
			Output::Direct(&mut *self.out)
		} else if let Some(buffer) = legacy.as_mut() {
			Output::Captured(buffer)
		} else if stage == Stage::Handler {
			Output::Captured(&mut *phase)
		} else {
			Output::Direct(&mut *self.out)
		};

		let result = {
			let mut ctx = Context::new(self.request, &mut *response, self.params, output)
				.with_splat(self.splat)
				.with_route(self.info);
			f(&mut ctx)
		};

		if !phase.is_empty() {
			response.write(&phase[..], false);
			phase.clear();
		}
		result
	}
}

fn open_stream(route: &Route, response: &mut Response, out: &mut dyn OutputStream) -> Result<()> {
	if let Streaming::WithHeaders { status, headers } = route.streaming() {
		response.set_status(status.as_u16())?;
		for (name, value) in headers {
			response.headers_mut().insert(name.clone(), value.clone());
		}
	}
	response.header("X-Accel-Buffering", "no")?;
	response.header("Connection", "close")?;
	response.set_content_length(false);
	response.emit_headers(out)?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use runway_http::{Control, Error, MemoryOutput, after_fn, before_fn};
	use rstest::rstest;
	use std::sync::Mutex;

	fn dispatcher(declare: impl FnOnce(&mut Router)) -> Dispatcher {
		let mut router = Router::new();
		declare(&mut router);
		Dispatcher::new(router)
	}

	#[rstest]
	fn test_completed_response_is_sent() {
		// Arrange
		let dispatcher = dispatcher(|r| {
			r.get("/hello/@name", |ctx| {
				let name = ctx.param("name").unwrap_or_default().to_string();
				ctx.echo(format!("hello {}", name))
			})
			.unwrap();
		});
		let mut out = MemoryOutput::new();

		// Act
		let outcome = dispatcher
			.dispatch(&Request::get("/hello/bob"), &mut out)
			.unwrap();

		// Assert
		assert!(matches!(outcome, Outcome::Completed(_)));
		assert_eq!(out.status(), Some(StatusCode::OK));
		assert_eq!(out.header("content-length"), Some("9"));
		assert_eq!(out.body_string(), "hello bob");
	}

	#[rstest]
	#[case(Method::GET, "/missing", StatusCode::NOT_FOUND)]
	#[case(Method::DELETE, "/only-get", StatusCode::METHOD_NOT_ALLOWED)]
	fn test_terminal_outcomes_run_nothing(
		#[case] method: Method,
		#[case] path: &str,
		#[case] expected: StatusCode,
	) {
		let mut dispatcher = dispatcher(|r| {
			r.get("/only-get", |_ctx| Ok(())).unwrap();
		});
		dispatcher.before(START, |ctx| ctx.echo("hook"));
		let mut out = MemoryOutput::new();

		let outcome = dispatcher
			.dispatch(&Request::new(method, path), &mut out)
			.unwrap();

		assert_eq!(outcome.status(), expected);
		assert!(out.body().is_empty());
		assert!(!out.headers_emitted());
	}

	#[rstest]
	fn test_terminal_outcomes_convert_to_errors() {
		// Arrange
		let request = Request::new(Method::PUT, "/items");

		// Act
		let missing = Outcome::NotFound.into_response(&request).unwrap_err();
		let wrong = Outcome::MethodNotAllowed {
			allowed: vec![Method::GET],
		}
		.into_response(&request)
		.unwrap_err();
		let sent = Outcome::Completed(Response::new()).into_response(&request);

		// Assert
		assert!(matches!(
			&missing,
			Error::RouteNotFound { method, path } if method == "PUT" && path == "/items"
		));
		assert_eq!(missing.status_hint(), StatusCode::NOT_FOUND);
		assert!(matches!(
			&wrong,
			Error::MethodNotAllowed { allowed, .. } if allowed == &vec![Method::GET]
		));
		assert_eq!(wrong.status_hint(), StatusCode::METHOD_NOT_ALLOWED);
		assert!(sent.is_ok());
	}

	#[rstest]
	fn test_pass_continues_with_next_route() {
		let dispatcher = dispatcher(|r| {
			r.get("/items/@id", |ctx| {
				ctx.echo("first;")?;
				Ok(Flow::Pass)
			})
			.unwrap();
			r.get("/items/*", |ctx| ctx.echo("second")).unwrap();
		});
		let mut out = MemoryOutput::new();

		let outcome = dispatcher.dispatch(&Request::get("/items/3"), &mut out).unwrap();

		assert!(matches!(outcome, Outcome::Completed(_)));
		assert_eq!(out.body_string(), "first;second");
	}

	#[rstest]
	fn test_pass_without_next_route_is_not_found() {
		let dispatcher = dispatcher(|r| {
			r.get("/only", |_ctx| Ok(Flow::Pass)).unwrap();
		});
		let mut out = MemoryOutput::new();

		let outcome = dispatcher.dispatch(&Request::get("/only"), &mut out).unwrap();

		assert!(matches!(outcome, Outcome::NotFound));
		assert!(!out.headers_emitted());
	}

	#[rstest]
	fn test_rejection_uses_configured_status() {
		// Arrange
		let mut router = Router::new();
		router
			.get("/admin", |ctx| ctx.echo("secret"))
			.unwrap()
			.add_middleware(before_fn(|_ctx| Ok(Control::Stop)));
		let dispatcher = Dispatcher::with_settings(
			router,
			DispatchSettings {
				rejection_status: 401,
				..DispatchSettings::default()
			},
		);
		let mut out = MemoryOutput::new();

		// Act
		let outcome = dispatcher.dispatch(&Request::get("/admin"), &mut out).unwrap();

		// Assert
		assert!(matches!(outcome, Outcome::Rejected(_)));
		assert_eq!(out.status(), Some(StatusCode::UNAUTHORIZED));
		assert_eq!(out.body_string(), "Forbidden");
	}

	#[rstest]
	fn test_rejection_keeps_middleware_status() {
		let mut router = Router::new();
		router
			.get("/admin", |_ctx| Ok(()))
			.unwrap()
			.add_middleware(before_fn(|ctx| {
				ctx.response_mut().set_status(429)?;
				ctx.response_mut().write("slow down", false);
				Ok(Control::Stop)
			}));
		let dispatcher = Dispatcher::new(router);
		let mut out = MemoryOutput::new();

		dispatcher.dispatch(&Request::get("/admin"), &mut out).unwrap();

		assert_eq!(out.status(), Some(StatusCode::TOO_MANY_REQUESTS));
		assert_eq!(out.body_string(), "slow down");
	}

	#[rstest]
	fn test_handler_error_unwinds_then_propagates() {
		// Arrange
		let unwound = Arc::new(Mutex::new(false));
		let flag = Arc::clone(&unwound);
		let mut router = Router::new();
		router
			.get("/boom", |_ctx| -> Result<()> { Err(Error::handler("exploded")) })
			.unwrap()
			.add_middleware(after_fn(move |_ctx| {
				*flag.lock().unwrap() = true;
				Ok(())
			}));
		let dispatcher = Dispatcher::new(router);
		let mut out = MemoryOutput::new();

		// Act
		let result = dispatcher.dispatch(&Request::get("/boom"), &mut out);

		// Assert
		assert!(matches!(result, Err(Error::Handler(_))));
		assert!(*unwound.lock().unwrap());
		assert!(!out.headers_emitted());
	}

	#[rstest]
	fn test_route_info_only_for_passing_routes() {
		let seen = Arc::new(Mutex::new(Vec::new()));
		let (a, b) = (Arc::clone(&seen), Arc::clone(&seen));
		let mut router = Router::new();
		router
			.get("/with", move |ctx| {
				a.lock().unwrap().push(ctx.route().map(|r| r.pattern.clone()));
				Ok(())
			})
			.unwrap()
			.name("with")
			.pass_route();
		router
			.get("/without", move |ctx| {
				b.lock().unwrap().push(ctx.route().map(|r| r.pattern.clone()));
				Ok(())
			})
			.unwrap();
		let dispatcher = Dispatcher::new(router);

		dispatcher
			.dispatch(&Request::get("/with"), &mut MemoryOutput::new())
			.unwrap();
		dispatcher
			.dispatch(&Request::get("/without"), &mut MemoryOutput::new())
			.unwrap();

		assert_eq!(
			*seen.lock().unwrap(),
			vec![Some("/with".to_string()), None]
		);
	}

	#[rstest]
	fn test_stop_hooks_wrap_send() {
		let mut dispatcher = dispatcher(|r| {
			r.get("/", |ctx| ctx.echo("body")).unwrap();
		});
		dispatcher.before(STOP, |ctx| {
			ctx.response_mut().header("X-Stop", "before")?;
			Ok(())
		});
		dispatcher.after(STOP, |ctx| ctx.echo("<after-send>"));
		let mut out = MemoryOutput::new();

		dispatcher.dispatch(&Request::get("/"), &mut out).unwrap();

		assert_eq!(out.header("x-stop"), Some("before"));
		assert_eq!(out.body_string(), "body<after-send>");
	}

	#[rstest]
	fn test_run_mapped_event() {
		let mut dispatcher = Dispatcher::new(Router::new());
		dispatcher
			.map("greet", |ctx| ctx.echo("hello"))
			.unwrap();
		dispatcher.before("greet", |ctx| ctx.echo("<"));
		dispatcher.after("greet", |ctx| ctx.echo(">"));
		let mut response = Response::new();
		let mut out = MemoryOutput::new();

		dispatcher.run("greet", &mut response, &mut out).unwrap();

		assert_eq!(out.body_string(), "<hello>");
		assert!(matches!(
			dispatcher.run("nope", &mut response, &mut out),
			Err(Error::UnmappedHandler(_))
		));
		assert!(matches!(
			dispatcher.map(START, |_ctx| Ok(())),
			Err(Error::ReservedEvent(_))
		));
	}
}
