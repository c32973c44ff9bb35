//! Request and response types, output channels and the handler,
//! middleware and hook traits.

pub use runway_http::*;
