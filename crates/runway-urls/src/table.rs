//! Ordered route table with name lookup.

use crate::route::Route;
use http::Method;
use runway_http::Params;
use std::collections::HashMap;

/// A route matched against a request.
#[derive(Debug)]
pub struct RouteMatch<'a> {
	/// Position of the route in declaration order.
	pub index: usize,
	pub route: &'a Route,
	pub params: Params,
	pub splat: Option<String>,
}

/// Outcome of a table lookup.
#[derive(Debug)]
pub enum Lookup<'a> {
	Found(RouteMatch<'a>),
	/// Some route matches the path, none accepts the method.
	MethodNotAllowed { allowed: Vec<Method> },
	NotFound,
}

impl Lookup<'_> {
	pub fn is_found(&self) -> bool {
		matches!(self, Self::Found(_))
	}
}

/// Routes in declaration order plus a name index.
///
/// The first route whose pattern and method both match wins. Registering a
/// second route under an existing name repoints the name; the earlier
/// route stays in the ordered list and keeps matching.
#[derive(Debug, Default, Clone)]
pub struct RouteTable {
	routes: Vec<Route>,
	names: HashMap<String, usize>,
}

impl RouteTable {
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends a route and returns its index.
	pub fn add(&mut self, route: Route) -> usize {
		let index = self.routes.len();
		if let Some(name) = route.name() {
			self.index_name(name.to_string(), index);
		}
		self.routes.push(route);
		index
	}

	/// Finds the first route matching `method` and `path`.
	pub fn find(&self, method: &Method, path: &str) -> Lookup<'_> {
		self.find_from(0, method, path)
	}

	/// Like [`RouteTable::find`], starting at route `start`. Used to resume
	/// the scan when a handler passes.
	pub fn find_from(&self, start: usize, method: &Method, path: &str) -> Lookup<'_> {
		let mut allowed: Vec<Method> = Vec::new();

		for (index, route) in self.routes.iter().enumerate().skip(start) {
			let Some(matched) = route.pattern().matches(path) else {
				continue;
			};
			tracing::trace!(
				pattern = route.pattern().pattern(),
				methods = %route.methods(),
				"path matched route pattern"
			);
			if route.methods().accepts(method) {
				return Lookup::Found(RouteMatch {
					index,
					route,
					params: matched.params,
					splat: matched.splat,
				});
			}
			for m in route.methods().methods() {
				if !allowed.contains(m) {
					allowed.push(m.clone());
				}
			}
		}

		if allowed.is_empty() {
			Lookup::NotFound
		} else {
			Lookup::MethodNotAllowed { allowed }
		}
	}

	/// The most recently registered route with this name.
	pub fn by_name(&self, name: &str) -> Option<&Route> {
		self.names.get(name).map(|&index| &self.routes[index])
	}

	pub fn get(&self, index: usize) -> Option<&Route> {
		self.routes.get(index)
	}

	pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut Route> {
		self.routes.get_mut(index)
	}

	/// Points `name` at the route at `index`.
	pub(crate) fn index_name(&mut self, name: String, index: usize) {
		if let Some(previous) = self.names.insert(name.clone(), index) {
			if previous != index {
				tracing::warn!(
					name = %name,
					previous = previous,
					current = index,
					"Duplicate route name; the later registration wins for URL generation"
				);
			}
		}
	}

	/// Removes `name` from the index when it points at `index`. An earlier
	/// route still carrying the name takes it back.
	pub(crate) fn unindex_name(&mut self, name: &str, index: usize) {
		if self.names.get(name) != Some(&index) {
			return;
		}
		self.names.remove(name);
		let fallback = self
			.routes
			.iter()
			.enumerate()
			.rev()
			.find(|(i, route)| *i != index && route.name() == Some(name))
			.map(|(i, _)| i);
		if let Some(fallback) = fallback {
			self.names.insert(name.to_string(), fallback);
		}
	}

	pub fn routes(&self) -> impl Iterator<Item = &Route> {
		self.routes.iter()
	}

	pub fn len(&self) -> usize {
		self.routes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.routes.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::pattern::PathPattern;
	use runway_conf::RoutingSettings;
	use runway_http::{MethodFilter, handler_fn};
	use rstest::{fixture, rstest};
	use std::sync::Arc;

	fn route(methods: &str, pattern: &str, name: Option<&str>) -> Route {
		let pattern = PathPattern::compile(pattern, &RoutingSettings::default()).unwrap();
		let mut route = Route::new(
			MethodFilter::parse(methods).unwrap(),
			pattern,
			Arc::new(handler_fn(|_ctx| Ok(()))),
		);
		route.name = name.map(str::to_string);
		route
	}

	#[fixture]
	fn table() -> RouteTable {
		let mut table = RouteTable::new();
		table.add(route("GET", "/users", Some("users")));
		table.add(route("POST", "/users", None));
		table.add(route("GET|PUT", "/users/@id", Some("user")));
		table.add(route("*", "/health", None));
		table
	}

	#[rstest]
	#[case(Method::GET, "/users", 0)]
	#[case(Method::POST, "/users", 1)]
	#[case(Method::PUT, "/users/9", 2)]
	#[case(Method::DELETE, "/health", 3)]
	fn test_find_first_match(
		table: RouteTable,
		#[case] method: Method,
		#[case] path: &str,
		#[case] expected: usize,
	) {
		// Act
		let lookup = table.find(&method, path);

		// Assert
		match lookup {
			Lookup::Found(m) => assert_eq!(m.index, expected),
			other => panic!("expected a match, got {:?}", other),
		}
	}

	#[rstest]
	fn test_not_found(table: RouteTable) {
		assert!(matches!(table.find(&Method::GET, "/nowhere"), Lookup::NotFound));
	}

	#[rstest]
	fn test_method_not_allowed_lists_methods(table: RouteTable) {
		let lookup = table.find(&Method::DELETE, "/users/1");

		match lookup {
			Lookup::MethodNotAllowed { allowed } => {
				assert_eq!(allowed, vec![Method::GET, Method::PUT]);
			}
			other => panic!("expected MethodNotAllowed, got {:?}", other),
		}
	}

	#[rstest]
	fn test_method_not_allowed_merges_routes(table: RouteTable) {
		let lookup = table.find(&Method::PATCH, "/users");

		match lookup {
			Lookup::MethodNotAllowed { allowed } => {
				assert_eq!(allowed, vec![Method::GET, Method::POST]);
			}
			other => panic!("expected MethodNotAllowed, got {:?}", other),
		}
	}

	#[rstest]
	fn test_find_from_skips_earlier_routes() {
		let mut table = RouteTable::new();
		table.add(route("GET", "/a/@x", None));
		table.add(route("GET", "/a/*", None));

		let lookup = table.find_from(1, &Method::GET, "/a/b");

		match lookup {
			Lookup::Found(m) => {
				assert_eq!(m.index, 1);
				assert_eq!(m.splat.as_deref(), Some("b"));
			}
			other => panic!("expected a match, got {:?}", other),
		}
	}

	#[rstest]
	fn test_duplicate_name_keeps_both_routes_matchable() {
		// Arrange
		let mut table = RouteTable::new();
		table.add(route("GET", "/first", Some("dup")));
		table.add(route("GET", "/second", Some("dup")));

		// Act
		let named = table.by_name("dup").unwrap();

		// Assert
		assert_eq!(named.pattern().pattern(), "/second");
		assert!(table.find(&Method::GET, "/first").is_found());
		assert!(table.find(&Method::GET, "/second").is_found());
		assert_eq!(table.len(), 2);
	}

	#[rstest]
	fn test_by_name_unknown(table: RouteTable) {
		assert!(table.by_name("missing").is_none());
		assert_eq!(table.by_name("user").unwrap().pattern().pattern(), "/users/@id");
	}
}
