//! # Runway Dispatch
//!
//! Runs matched routes: lifecycle hooks, onion-ordered middleware, the
//! handler, output buffering and streaming, then sends the response.
//!
//! - [`Dispatcher`]: the per-request state machine
//! - [`EventRegistry`]: `before`/`after` hook chains for named events
//! - [`around`]: onion execution with guaranteed unwinding
//! - [`App`]: boundary mapping of outcomes and errors to status codes

pub mod app;
pub mod dispatcher;
pub mod hooks;
pub mod onion;

pub use app::App;
pub use dispatcher::{Dispatcher, Outcome};
pub use hooks::{Action, EventRegistry, Phase, START, STOP, is_builtin};
pub use onion::{Layered, around};
