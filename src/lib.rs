//! # Runway
//!
//! A pattern-based HTTP request router and dispatcher.
//!
//! Runway maps a method and a path to a handler through an ordered route
//! table, runs per-route middleware around the handler in onion order, and
//! fires named lifecycle hooks around route execution and response
//! sending. Output echoed by handlers is captured into the response body,
//! or streamed straight to the client for routes marked as streaming.
//!
//! ## Crates
//!
//! - [`http`]: request, response, output channels, handler and middleware traits
//! - [`urls`]: path patterns, the route table, groups and URL generation
//! - [`dispatch`]: the dispatcher, lifecycle hooks and the boundary [`App`](dispatch::App)
//! - [`conf`]: settings loaded from TOML files and the environment
//!
//! ## Pattern syntax
//!
//! | pattern                  | matches                                |
//! |--------------------------|----------------------------------------|
//! | `/users/@id`             | `/users/42`                            |
//! | `/users/@id:[0-9]{3}`    | `/users/123`, not `/users/12`          |
//! | `/blog(/@year(/@month))` | `/blog`, `/blog/2024`, `/blog/2024/05` |
//! | `/files/*`               | `/files`, `/files/a/b.txt`             |
//! | `*`                      | every path                             |
//!
//! ## Quick Example
//!
//! ```
//! use runway::prelude::*;
//!
//! let mut router = Router::new();
//! router
//!     .get("/hello/@name", |ctx| {
//!         let name = ctx.param("name").unwrap_or("world").to_string();
//!         ctx.echo(format!("Hello, {}!", name))
//!     })
//!     .unwrap()
//!     .name("hello");
//!
//! let app = App::new(Dispatcher::new(router));
//!
//! let mut out = MemoryOutput::new();
//! let status = app.handle(&Request::get("/hello/runway"), &mut out).unwrap();
//!
//! assert_eq!(status, StatusCode::OK);
//! assert_eq!(out.body_string(), "Hello, runway!");
//! ```

pub mod conf;
pub mod dispatch;
pub mod http;
pub mod urls;

pub use runway_conf::{ConfigError, Settings};
pub use runway_dispatch::{App, Dispatcher, Outcome};
pub use runway_http::{Error, Request, Response, Result, StatusCode};
pub use runway_urls::Router;

/// Everything needed to declare routes and dispatch requests.
pub mod prelude {
	pub use crate::{App, Dispatcher, Error, Outcome, Request, Response, Result, Router, Settings};
	pub use runway_dispatch::{Phase, START, STOP};
	pub use runway_http::{
		Context, Control, Flow, Handler, Hook, HookContext, MemoryOutput, Middleware,
		OutputStream, StatusCode, WriterOutput, after_fn, before_fn, handler_fn, hook_fn,
	};
	pub use runway_urls::{RouteHandle, UrlParams};
}
