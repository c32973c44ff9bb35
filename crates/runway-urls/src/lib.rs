//! # Runway URLs
//!
//! Route declaration, pattern matching and URL generation.
//!
//! - [`PathPattern`]: compiles `/users/@id:[0-9]+(/@slug)` style patterns
//! - [`RouteTable`]: ordered first-match lookup plus the name index
//! - [`GroupStack`]: nested declaration scopes (prefix + middleware)
//! - [`reverse`] / [`UrlParams`]: named-route URL generation
//! - [`Router`]: the declaration surface tying these together

pub mod group;
pub mod pattern;
pub mod reverse;
pub mod route;
pub mod router;
pub mod table;

pub use group::{GroupStack, join_path};
pub use pattern::{PathMatch, PathPattern, Segment};
pub use reverse::{SPLAT_PARAM, UrlParams, reverse};
pub use route::{Route, Streaming};
pub use router::{RouteHandle, Router};
pub use table::{Lookup, RouteMatch, RouteTable};
