//! Path patterns, the route table, groups and URL generation.
//!
//! # Examples
//!
//! ```
//! use runway::urls::{Router, UrlParams};
//!
//! let mut router = Router::new();
//! router.get("/users/@id:[0-9]+", |_ctx| Ok(())).unwrap().name("user");
//!
//! let url = router.url_for("user", &UrlParams::from([("id", "7")])).unwrap();
//! assert_eq!(url, "/users/7");
//! ```

pub use runway_urls::*;
