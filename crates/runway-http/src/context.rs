//! Per-phase views handed to handlers, middleware and hooks.

use crate::methods::MethodFilter;
use crate::output::Output;
use crate::{Params, Request, Response, Result};

/// Description of the matched route, exposed to handlers of routes
/// declared with route passing enabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo {
	pub pattern: String,
	pub name: Option<String>,
	pub methods: MethodFilter,
	pub streamed: bool,
}

/// Everything a handler or middleware sees while a request is dispatched.
pub struct Context<'a> {
	request: &'a Request,
	response: &'a mut Response,
	params: &'a Params,
	splat: Option<&'a str>,
	route: Option<&'a RouteInfo>,
	output: Output<'a>,
}

impl<'a> Context<'a> {
	pub fn new(
		request: &'a Request,
		response: &'a mut Response,
		params: &'a Params,
		output: Output<'a>,
	) -> Self {
		Self {
			request,
			response,
			params,
			splat: None,
			route: None,
			output,
		}
	}

	pub fn with_splat(mut self, splat: Option<&'a str>) -> Self {
		self.splat = splat;
		self
	}

	pub fn with_route(mut self, route: Option<&'a RouteInfo>) -> Self {
		self.route = route;
		self
	}

	pub fn request(&self) -> &Request {
		self.request
	}

	pub fn response(&self) -> &Response {
		self.response
	}

	pub fn response_mut(&mut self) -> &mut Response {
		self.response
	}

	pub fn params(&self) -> &Params {
		self.params
	}

	/// Shorthand for `params().get(name)`.
	pub fn param(&self, name: &str) -> Option<&str> {
		self.params.get(name)
	}

	/// Remainder of the path matched by a trailing wildcard.
	pub fn splat(&self) -> Option<&str> {
		self.splat
	}

	/// The matched route, only for routes declared with route passing.
	pub fn route(&self) -> Option<&RouteInfo> {
		self.route
	}

	/// Writes output for the current phase. Depending on the buffering mode
	/// this lands in the response body or goes straight to the client. The
	/// first direct write emits the response head.
	pub fn echo(&mut self, data: impl AsRef<[u8]>) -> Result<()> {
		echo_to(self.response, &mut self.output, data.as_ref())
	}

	/// The raw echo target. Direct writes through it do not emit the
	/// response head.
	pub fn output(&mut self) -> &mut Output<'a> {
		&mut self.output
	}
}

/// What a hook sees when its event fires.
pub struct HookContext<'a> {
	event: &'a str,
	response: &'a mut Response,
	output: Output<'a>,
}

impl<'a> HookContext<'a> {
	pub fn new(event: &'a str, response: &'a mut Response, output: Output<'a>) -> Self {
		Self {
			event,
			response,
			output,
		}
	}

	pub fn event(&self) -> &str {
		self.event
	}

	/// Output accumulated in the response body so far.
	pub fn accumulated(&self) -> &[u8] {
		self.response.body()
	}

	pub fn response(&self) -> &Response {
		self.response
	}

	pub fn response_mut(&mut self) -> &mut Response {
		self.response
	}

	/// Same as [`Context::echo`].
	pub fn echo(&mut self, data: impl AsRef<[u8]>) -> Result<()> {
		echo_to(self.response, &mut self.output, data.as_ref())
	}
}

fn echo_to(response: &mut Response, output: &mut Output<'_>, data: &[u8]) -> Result<()> {
	if data.is_empty() {
		return Ok(());
	}
	// Body bytes on the wire must follow the head.
	if let Output::Direct(out) = output {
		response.emit_headers(&mut **out)?;
	}
	output.echo(data)?;
	Ok(())
}
