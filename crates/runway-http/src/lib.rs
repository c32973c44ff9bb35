//! HTTP primitives for the Runway router.
//!
//! This crate holds the collaborators the routing core talks to:
//!
//! - [`Request`]: the already-parsed method and path
//! - [`Response`]: status, headers and a body buffer, plus real header emission
//! - [`OutputStream`]: the host's output channel, with [`MemoryOutput`] and
//!   [`WriterOutput`] implementations
//! - [`Handler`], [`Middleware`] and [`Hook`]: the capability traits that user
//!   code implements
//! - [`Error`]: the error taxonomy shared by every Runway crate

pub mod context;
pub mod error;
pub mod methods;
pub mod middleware;
pub mod output;
pub mod params;
pub mod request;
pub mod response;

pub use context::{Context, HookContext, RouteInfo};
pub use error::{BoxError, Error, Result};
pub use methods::{MethodFilter, parse_method};
pub use middleware::{
	AfterFn, BeforeFn, Control, FnHandler, FnHook, Flow, Handler, Hook, IntoControl, IntoFlow,
	Middleware, after_fn, before_fn, handler_fn, hook_fn,
};
pub use output::{MemoryOutput, Output, OutputStream, WriterOutput};
pub use params::Params;
pub use request::Request;
pub use response::Response;

// Re-export the http types that appear in the public API.
pub use http::{HeaderMap, Method, StatusCode};
