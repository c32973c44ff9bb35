//! Capability traits for request processing.
//!
//! ## Handler
//!
//! A handler is invoked with the captured route parameters and writes the
//! response:
//!
//! ```rust
//! use runway_http::{Context, Flow, Handler, Result};
//!
//! struct Hello;
//!
//! impl Handler for Hello {
//!     fn handle(&self, ctx: &mut Context<'_>) -> Result<Flow> {
//!         let name = ctx.param("name").unwrap_or("world").to_string();
//!         ctx.echo(format!("hello {}", name))?;
//!         Ok(Flow::Done)
//!     }
//! }
//! ```
//!
//! ## Middleware
//!
//! Middleware wraps handler invocation with an optional `before` and an
//! optional `after` phase. Missing phases are no-ops:
//!
//! ```rust
//! use runway_http::{Context, Control, Middleware, Result};
//!
//! struct RequireToken;
//!
//! impl Middleware for RequireToken {
//!     fn before(&self, ctx: &mut Context<'_>) -> Result<Control> {
//!         if ctx.request().header("x-token").is_some() {
//!             Ok(Control::Continue)
//!         } else {
//!             Ok(Control::Stop)
//!         }
//!     }
//! }
//! ```

use crate::context::{Context, HookContext};
use crate::Result;
use std::marker::PhantomData;
use std::sync::Arc;

/// Result of a handler invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flow {
	/// The request was handled.
	#[default]
	Done,
	/// Not handled here; continue with the next matching route.
	Pass,
}

/// Whether a `before` phase or a hook lets processing go on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Control {
	#[default]
	Continue,
	Stop,
}

impl Control {
	pub fn is_stop(self) -> bool {
		matches!(self, Self::Stop)
	}
}

/// Conversion of closure return values into a [`Flow`].
pub trait IntoFlow {
	fn into_flow(self) -> Flow;
}

impl IntoFlow for () {
	fn into_flow(self) -> Flow {
		Flow::Done
	}
}

impl IntoFlow for Flow {
	fn into_flow(self) -> Flow {
		self
	}
}

/// Conversion of closure return values into a [`Control`].
pub trait IntoControl {
	fn into_control(self) -> Control;
}

impl IntoControl for () {
	fn into_control(self) -> Control {
		Control::Continue
	}
}

impl IntoControl for Control {
	fn into_control(self) -> Control {
		self
	}
}

/// Handler trait for processing a matched request.
pub trait Handler: Send + Sync {
	/// Handles the request. Output goes through [`Context::echo`] or the
	/// response.
	///
	/// # Errors
	///
	/// Errors are propagated to the boundary unmodified and never retried.
	fn handle(&self, ctx: &mut Context<'_>) -> Result<Flow>;
}

/// Per-route middleware with optional `before` and `after` phases.
///
/// `before` runs outer-to-inner ahead of the handler; returning
/// [`Control::Stop`] skips the handler and the remaining `before` phases.
/// `after` runs inner-to-outer for every middleware whose `before` ran.
pub trait Middleware: Send + Sync {
	fn before(&self, _ctx: &mut Context<'_>) -> Result<Control> {
		Ok(Control::Continue)
	}

	fn after(&self, _ctx: &mut Context<'_>) -> Result<()> {
		Ok(())
	}
}

/// Callback attached to a named lifecycle event.
pub trait Hook: Send + Sync {
	/// Runs the hook. [`Control::Stop`] skips the rest of the hook chain.
	fn call(&self, ctx: &mut HookContext<'_>) -> Result<Control>;
}

/// Handler backed by a closure.
pub struct FnHandler<F, R> {
	func: F,
	_marker: PhantomData<fn() -> R>,
}

impl<F, R> FnHandler<F, R>
where
	F: Fn(&mut Context<'_>) -> Result<R> + Send + Sync,
	R: IntoFlow,
{
	pub fn new(func: F) -> Self {
		Self {
			func,
			_marker: PhantomData,
		}
	}
}

impl<F, R> Handler for FnHandler<F, R>
where
	F: Fn(&mut Context<'_>) -> Result<R> + Send + Sync,
	R: IntoFlow,
{
	fn handle(&self, ctx: &mut Context<'_>) -> Result<Flow> {
		(self.func)(ctx).map(IntoFlow::into_flow)
	}
}

impl<T: Handler + ?Sized> Handler for Arc<T> {
	fn handle(&self, ctx: &mut Context<'_>) -> Result<Flow> {
		(**self).handle(ctx)
	}
}

/// Wraps a closure as a [`Handler`].
///
/// # Examples
///
/// ```
/// use runway_http::{Context, Handler, handler_fn};
///
/// let handler = handler_fn(|ctx: &mut Context<'_>| ctx.echo("hi"));
/// # let _ = &handler as &dyn Handler;
/// ```
pub fn handler_fn<F, R>(func: F) -> FnHandler<F, R>
where
	F: Fn(&mut Context<'_>) -> Result<R> + Send + Sync,
	R: IntoFlow,
{
	FnHandler::new(func)
}

/// Middleware with only a `before` phase, backed by a closure.
pub struct BeforeFn<F, R> {
	func: F,
	_marker: PhantomData<fn() -> R>,
}

impl<F, R> Middleware for BeforeFn<F, R>
where
	F: Fn(&mut Context<'_>) -> Result<R> + Send + Sync,
	R: IntoControl,
{
	fn before(&self, ctx: &mut Context<'_>) -> Result<Control> {
		(self.func)(ctx).map(IntoControl::into_control)
	}
}

/// Middleware with only an `after` phase, backed by a closure.
pub struct AfterFn<F> {
	func: F,
}

impl<F> Middleware for AfterFn<F>
where
	F: Fn(&mut Context<'_>) -> Result<()> + Send + Sync,
{
	fn after(&self, ctx: &mut Context<'_>) -> Result<()> {
		(self.func)(ctx)
	}
}

pub fn before_fn<F, R>(func: F) -> BeforeFn<F, R>
where
	F: Fn(&mut Context<'_>) -> Result<R> + Send + Sync,
	R: IntoControl,
{
	BeforeFn {
		func,
		_marker: PhantomData,
	}
}

pub fn after_fn<F>(func: F) -> AfterFn<F>
where
	F: Fn(&mut Context<'_>) -> Result<()> + Send + Sync,
{
	AfterFn { func }
}

/// Hook backed by a closure.
pub struct FnHook<F, R> {
	func: F,
	_marker: PhantomData<fn() -> R>,
}

impl<F, R> Hook for FnHook<F, R>
where
	F: Fn(&mut HookContext<'_>) -> Result<R> + Send + Sync,
	R: IntoControl,
{
	fn call(&self, ctx: &mut HookContext<'_>) -> Result<Control> {
		(self.func)(ctx).map(IntoControl::into_control)
	}
}

pub fn hook_fn<F, R>(func: F) -> FnHook<F, R>
where
	F: Fn(&mut HookContext<'_>) -> Result<R> + Send + Sync,
	R: IntoControl,
{
	FnHook {
		func,
		_marker: PhantomData,
	}
}
