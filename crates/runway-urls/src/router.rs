//! Route declaration surface.
//!
//! ```rust
//! use runway_urls::{Router, UrlParams};
//!
//! let mut router = Router::new();
//! router
//!     .group("/path1/@id", Vec::new(), |r| {
//!         r.get("/@name", |ctx| ctx.echo("hi"))?.name("path1");
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! let url = router
//!     .url_for("path1", &UrlParams::new().with("id", 123).with("name", "abc"))
//!     .unwrap();
//! assert_eq!(url, "/path1/123/abc");
//! ```

use crate::group::GroupStack;
use crate::pattern::PathPattern;
use crate::reverse::{UrlParams, reverse};
use crate::route::{Route, Streaming};
use crate::table::{Lookup, RouteTable};
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Method, StatusCode};
use runway_conf::RoutingSettings;
use runway_http::{
	Context, Error, FnHandler, Handler, IntoFlow, MethodFilter, Middleware, Result,
};
use std::sync::Arc;

/// Owns the route table and the group scopes used while declaring routes.
#[derive(Clone, Default)]
pub struct Router {
	table: RouteTable,
	groups: GroupStack,
	settings: RoutingSettings,
}

impl Router {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_settings(settings: RoutingSettings) -> Self {
		Self {
			settings,
			..Self::default()
		}
	}

	pub fn settings(&self) -> &RoutingSettings {
		&self.settings
	}

	/// Declares a route from a `"METHODS pattern"` string and a closure.
	///
	/// The method list is `|`-separated and optional; without it (or with
	/// `*`) the route accepts any method.
	///
	/// # Examples
	///
	/// ```
	/// use http::Method;
	/// use runway_urls::Router;
	///
	/// let mut router = Router::new();
	/// router.route("GET|POST /login", |ctx| ctx.echo("login")).unwrap();
	/// router.route("/anything", |_ctx| Ok(())).unwrap();
	///
	/// assert!(router.find(&Method::POST, "/login").is_found());
	/// assert!(router.find(&Method::DELETE, "/anything").is_found());
	/// ```
	pub fn route<F, R>(&mut self, declaration: &str, handler: F) -> Result<RouteHandle<'_>>
	where
		F: Fn(&mut Context<'_>) -> Result<R> + Send + Sync + 'static,
		R: IntoFlow + 'static,
	{
		self.route_handler(declaration, FnHandler::new(handler))
	}

	/// Declares a route backed by a [`Handler`] implementation.
	pub fn route_handler<H>(&mut self, declaration: &str, handler: H) -> Result<RouteHandle<'_>>
	where
		H: Handler + 'static,
	{
		let (methods, pattern) = parse_declaration(declaration)?;
		self.add(methods, pattern, Arc::new(handler))
	}

	pub fn get<F, R>(&mut self, pattern: &str, handler: F) -> Result<RouteHandle<'_>>
	where
		F: Fn(&mut Context<'_>) -> Result<R> + Send + Sync + 'static,
		R: IntoFlow + 'static,
	{
		self.add(Method::GET.into(), pattern, Arc::new(FnHandler::new(handler)))
	}

	pub fn post<F, R>(&mut self, pattern: &str, handler: F) -> Result<RouteHandle<'_>>
	where
		F: Fn(&mut Context<'_>) -> Result<R> + Send + Sync + 'static,
		R: IntoFlow + 'static,
	{
		self.add(Method::POST.into(), pattern, Arc::new(FnHandler::new(handler)))
	}

	pub fn put<F, R>(&mut self, pattern: &str, handler: F) -> Result<RouteHandle<'_>>
	where
		F: Fn(&mut Context<'_>) -> Result<R> + Send + Sync + 'static,
		R: IntoFlow + 'static,
	{
		self.add(Method::PUT.into(), pattern, Arc::new(FnHandler::new(handler)))
	}

	pub fn patch<F, R>(&mut self, pattern: &str, handler: F) -> Result<RouteHandle<'_>>
	where
		F: Fn(&mut Context<'_>) -> Result<R> + Send + Sync + 'static,
		R: IntoFlow + 'static,
	{
		self.add(Method::PATCH.into(), pattern, Arc::new(FnHandler::new(handler)))
	}

	pub fn delete<F, R>(&mut self, pattern: &str, handler: F) -> Result<RouteHandle<'_>>
	where
		F: Fn(&mut Context<'_>) -> Result<R> + Send + Sync + 'static,
		R: IntoFlow + 'static,
	{
		self.add(Method::DELETE.into(), pattern, Arc::new(FnHandler::new(handler)))
	}

	/// Runs `declare` inside a group scope. Routes declared inside get the
	/// group prefix and middleware. Groups nest.
	///
	/// The scope is closed when `declare` returns, whether it succeeded or
	/// not.
	pub fn group<F>(
		&mut self,
		prefix: &str,
		middleware: Vec<Arc<dyn Middleware>>,
		declare: F,
	) -> Result<()>
	where
		F: FnOnce(&mut Router) -> Result<()>,
	{
		self.groups.push(prefix, middleware);
		tracing::debug!(
			prefix = prefix,
			depth = self.groups.depth(),
			"Entering route group"
		);
		let result = declare(self);
		self.groups.pop();
		result
	}

	/// Finds the first route matching `method` and `path`.
	pub fn find(&self, method: &Method, path: &str) -> Lookup<'_> {
		self.table.find(method, path)
	}

	/// Builds the path of the named route.
	///
	/// # Errors
	///
	/// [`Error::UnknownRoute`] if no route has this name,
	/// [`Error::MissingParameter`] if a required parameter is missing.
	pub fn url_for(&self, name: &str, params: &UrlParams) -> Result<String> {
		let route = self
			.table
			.by_name(name)
			.ok_or_else(|| Error::UnknownRoute(name.to_string()))?;
		reverse(name, route.pattern(), params, self.settings.param_encoding)
	}

	/// Declared routes in declaration order.
	pub fn routes(&self) -> impl Iterator<Item = &Route> {
		self.table.routes()
	}

	pub fn table(&self) -> &RouteTable {
		&self.table
	}

	fn add(
		&mut self,
		methods: MethodFilter,
		pattern: &str,
		handler: Arc<dyn Handler>,
	) -> Result<RouteHandle<'_>> {
		let effective = self.groups.effective_pattern(pattern);
		let compiled = PathPattern::compile(&effective, &self.settings)?;
		let mut route = Route::new(methods, compiled, handler);
		route.middleware = self.groups.current_middleware();

		tracing::debug!(
			methods = %route.methods(),
			pattern = %effective,
			"Declared route"
		);

		let index = self.table.add(route);
		Ok(RouteHandle {
			table: &mut self.table,
			index,
		})
	}
}

/// Builder-style handle on a freshly declared route.
pub struct RouteHandle<'a> {
	table: &'a mut RouteTable,
	index: usize,
}

impl RouteHandle<'_> {
	/// Names the route for URL generation. A name used before is
	/// repointed at this route; a name this route had before is released.
	pub fn name(self, name: &str) -> Self {
		let previous = self
			.table
			.get(self.index)
			.and_then(|route| route.name())
			.filter(|previous| *previous != name)
			.map(str::to_string);
		let handle = self.update(|route| route.name = Some(name.to_string()));
		if let Some(previous) = previous {
			handle.table.unindex_name(&previous, handle.index);
		}
		handle.table.index_name(name.to_string(), handle.index);
		handle
	}

	/// Exposes the route description to the handler.
	pub fn pass_route(self) -> Self {
		self.update(|route| route.pass_route = true)
	}

	/// Appends middleware after any inherited from enclosing groups.
	pub fn add_middleware<M: Middleware + 'static>(self, middleware: M) -> Self {
		self.middleware(Arc::new(middleware))
	}

	pub fn middleware(self, middleware: Arc<dyn Middleware>) -> Self {
		self.update(|route| route.middleware.push(middleware))
	}

	/// Writes handler output straight to the output channel.
	pub fn stream(self) -> Self {
		self.update(|route| route.streaming = Streaming::On)
	}

	/// Streams with a status and headers emitted before the handler runs.
	///
	/// # Errors
	///
	/// [`Error::InvalidStatus`] or [`Error::InvalidHeader`] for values that
	/// cannot be put on the wire.
	pub fn stream_with_headers(self, status: u16, headers: &[(&str, &str)]) -> Result<Self> {
		let status = StatusCode::from_u16(status).map_err(|_| Error::InvalidStatus(status))?;
		let mut map = HeaderMap::new();
		for (name, value) in headers {
			let name = HeaderName::from_bytes(name.as_bytes())
				.map_err(|_| Error::InvalidHeader(name.to_string()))?;
			let value = HeaderValue::from_str(value)
				.map_err(|_| Error::InvalidHeader(value.to_string()))?;
			map.insert(name, value);
		}
		Ok(self.update(|route| {
			route.streaming = Streaming::WithHeaders {
				status,
				headers: map,
			}
		}))
	}

	pub fn route(&self) -> Option<&Route> {
		self.table.get(self.index)
	}

	fn update(self, f: impl FnOnce(&mut Route)) -> Self {
		if let Some(route) = self.table.get_mut(self.index) {
			f(route);
		}
		self
	}
}

/// Splits `"GET|POST /path"` into its method filter and pattern.
fn parse_declaration(declaration: &str) -> Result<(MethodFilter, &str)> {
	let declaration = declaration.trim();
	match declaration.split_once(char::is_whitespace) {
		Some((methods, pattern)) => Ok((MethodFilter::parse(methods)?, pattern.trim())),
		None => Ok((MethodFilter::Any, declaration)),
	}
}
