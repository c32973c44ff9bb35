//! Request dispatch, lifecycle hooks and the boundary [`App`].

pub use runway_dispatch::*;
