use crate::output::OutputStream;
use crate::{Error, Result};
use bytes::BytesMut;
use http::header::{CONTENT_LENGTH, HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};
use std::io;

/// HTTP response under construction.
///
/// The body is a buffer that handlers and middleware append to or rewrite.
/// Nothing reaches the wire until [`Response::emit_headers`] or
/// [`Response::send`] is called with the host's [`OutputStream`].
#[derive(Debug)]
pub struct Response {
	status: StatusCode,
	headers: HeaderMap,
	body: BytesMut,
	headers_sent: bool,
	content_length: bool,
}

impl Response {
	/// Creates an empty `200 OK` response.
	///
	/// # Examples
	///
	/// ```
	/// use runway_http::Response;
	/// use http::StatusCode;
	///
	/// let response = Response::new();
	/// assert_eq!(response.status(), StatusCode::OK);
	/// assert!(response.body().is_empty());
	/// ```
	pub fn new() -> Self {
		Self {
			status: StatusCode::OK,
			headers: HeaderMap::new(),
			body: BytesMut::new(),
			headers_sent: false,
			content_length: true,
		}
	}

	pub fn status(&self) -> StatusCode {
		self.status
	}

	/// Sets the status from a numeric code.
	pub fn set_status(&mut self, code: u16) -> Result<&mut Self> {
		self.status = StatusCode::from_u16(code).map_err(|_| Error::InvalidStatus(code))?;
		Ok(self)
	}

	pub fn with_status(mut self, status: StatusCode) -> Self {
		self.status = status;
		self
	}

	/// Sets a header, replacing any previous value with the same name.
	///
	/// # Examples
	///
	/// ```
	/// use runway_http::Response;
	///
	/// let mut response = Response::new();
	/// response.header("Content-Type", "text/plain").unwrap();
	/// response.header("content-type", "text/html").unwrap();
	/// assert_eq!(response.header_value("Content-Type"), Some("text/html"));
	/// ```
	pub fn header(&mut self, name: &str, value: &str) -> Result<&mut Self> {
		let name = HeaderName::from_bytes(name.as_bytes())
			.map_err(|_| Error::InvalidHeader(name.to_string()))?;
		let value =
			HeaderValue::from_str(value).map_err(|_| Error::InvalidHeader(value.to_string()))?;
		self.headers.insert(name, value);
		Ok(self)
	}

	pub fn with_header(mut self, name: &str, value: &str) -> Result<Self> {
		self.header(name, value)?;
		Ok(self)
	}

	pub fn headers(&self) -> &HeaderMap {
		&self.headers
	}

	pub fn headers_mut(&mut self) -> &mut HeaderMap {
		&mut self.headers
	}

	pub fn header_value(&self, name: &str) -> Option<&str> {
		self.headers.get(name).and_then(|v| v.to_str().ok())
	}

	/// Writes to the body buffer, appending unless `overwrite` is set.
	///
	/// # Examples
	///
	/// ```
	/// use runway_http::Response;
	///
	/// let mut response = Response::new();
	/// response.write("hello ", false);
	/// response.write("world", false);
	/// assert_eq!(response.body(), b"hello world");
	///
	/// response.write("replaced", true);
	/// assert_eq!(response.body(), b"replaced");
	/// ```
	pub fn write(&mut self, body: impl AsRef<[u8]>, overwrite: bool) -> &mut Self {
		if overwrite {
			self.body.clear();
		}
		self.body.extend_from_slice(body.as_ref());
		self
	}

	pub fn with_body(mut self, body: impl AsRef<[u8]>) -> Self {
		self.write(body, true);
		self
	}

	pub fn body(&self) -> &[u8] {
		&self.body
	}

	/// Body as UTF-8, lossy.
	pub fn body_string(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}

	pub fn clear_body(&mut self) -> &mut Self {
		self.body.clear();
		self
	}

	/// Resets status, headers and body. Has no effect on already-emitted
	/// headers.
	pub fn clear(&mut self) -> &mut Self {
		self.status = StatusCode::OK;
		self.headers.clear();
		self.body.clear();
		self
	}

	/// Controls whether [`Response::send`] adds a `Content-Length` header.
	pub fn set_content_length(&mut self, enabled: bool) -> &mut Self {
		self.content_length = enabled;
		self
	}

	pub fn headers_sent(&self) -> bool {
		self.headers_sent
	}

	/// Emits the real status line and headers to the output channel.
	///
	/// Emission happens at most once; later calls are no-ops.
	pub fn emit_headers(&mut self, out: &mut dyn OutputStream) -> io::Result<()> {
		if self.headers_sent {
			return Ok(());
		}
		out.emit_headers(self.status, &self.headers)?;
		self.headers_sent = true;
		Ok(())
	}

	/// Emits headers (if still pending) followed by the buffered body.
	pub fn send(&mut self, out: &mut dyn OutputStream) -> io::Result<()> {
		if !self.headers_sent && self.content_length && !self.body.is_empty() {
			self.headers
				.insert(CONTENT_LENGTH, HeaderValue::from(self.body.len()));
		}
		self.emit_headers(out)?;
		out.write(&self.body)?;
		out.flush()
	}
}

impl Default for Response {
	fn default() -> Self {
		Self::new()
	}
}
