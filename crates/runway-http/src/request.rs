use crate::methods::parse_method;
use crate::{Error, Result};
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Method};

/// Already-parsed request as seen by the router.
///
/// The router only needs the method and the path; headers and the raw
/// query string are carried along for handlers.
#[derive(Debug, Clone)]
pub struct Request {
	method: Method,
	path: String,
	query: Option<String>,
	headers: HeaderMap,
}

impl Request {
	/// Creates a request from a method and a path (no query string).
	///
	/// # Examples
	///
	/// ```
	/// use runway_http::Request;
	/// use http::Method;
	///
	/// let request = Request::new(Method::GET, "/users/42");
	/// assert_eq!(request.path(), "/users/42");
	/// assert_eq!(request.method(), &Method::GET);
	/// ```
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self {
			method,
			path: normalize_path(path.into()),
			query: None,
			headers: HeaderMap::new(),
		}
	}

	/// Creates a request from a request-line style URL, splitting off the
	/// query string.
	///
	/// # Examples
	///
	/// ```
	/// use runway_http::Request;
	///
	/// let request = Request::from_url("post", "/search?q=rust").unwrap();
	/// assert_eq!(request.method().as_str(), "POST");
	/// assert_eq!(request.path(), "/search");
	/// assert_eq!(request.query(), Some("q=rust"));
	/// ```
	pub fn from_url(method: &str, url: &str) -> Result<Self> {
		let method = parse_method(method)?;
		let (path, query) = match url.split_once('?') {
			Some((path, query)) => (path, Some(query.to_string())),
			None => (url, None),
		};
		let mut request = Self::new(method, path);
		request.query = query;
		Ok(request)
	}

	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::GET, path)
	}

	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::POST, path)
	}

	pub fn method(&self) -> &Method {
		&self.method
	}

	pub fn path(&self) -> &str {
		&self.path
	}

	/// Replaces the routed path. Used by test harnesses and rewriting
	/// front controllers.
	pub fn set_path(&mut self, path: impl Into<String>) {
		self.path = normalize_path(path.into());
	}

	pub fn query(&self) -> Option<&str> {
		self.query.as_deref()
	}

	pub fn headers(&self) -> &HeaderMap {
		&self.headers
	}

	/// Looks up a header value as a string.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(name).and_then(|v| v.to_str().ok())
	}

	/// Adds a header, builder style.
	pub fn with_header(mut self, name: &str, value: &str) -> Result<Self> {
		let name = HeaderName::from_bytes(name.as_bytes())
			.map_err(|_| Error::InvalidHeader(name.to_string()))?;
		let value =
			HeaderValue::from_str(value).map_err(|_| Error::InvalidHeader(value.to_string()))?;
		self.headers.append(name, value);
		Ok(self)
	}
}

// An empty path is the root.
fn normalize_path(path: String) -> String {
	if path.is_empty() {
		"/".to_string()
	} else {
		path
	}
}
