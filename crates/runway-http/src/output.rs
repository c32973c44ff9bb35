//! The real output channel and the per-phase echo target.
//!
//! The dispatcher never talks to a socket. It writes headers and body
//! bytes to an [`OutputStream`] supplied by the host. User code writes
//! ("echoes") through an [`Output`], which is either the dispatcher's
//! capture buffer or the real stream, depending on the buffering mode.

use bytes::{Bytes, BytesMut};
use http::{HeaderMap, StatusCode};
use std::io;

/// The host-provided output channel.
pub trait OutputStream {
	/// Emits the status line and headers. Called at most once per response.
	fn emit_headers(&mut self, status: StatusCode, headers: &HeaderMap) -> io::Result<()>;

	/// Writes body bytes.
	fn write(&mut self, chunk: &[u8]) -> io::Result<()>;

	fn flush(&mut self) -> io::Result<()> {
		Ok(())
	}
}

/// In-memory output channel that records everything written to it.
#[derive(Debug, Default)]
pub struct MemoryOutput {
	status: Option<StatusCode>,
	headers: HeaderMap,
	body: BytesMut,
	header_emissions: usize,
}

impl MemoryOutput {
	pub fn new() -> Self {
		Self::default()
	}

	/// Status emitted with the headers, if headers were emitted.
	pub fn status(&self) -> Option<StatusCode> {
		self.status
	}

	pub fn headers(&self) -> &HeaderMap {
		&self.headers
	}

	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(name).and_then(|v| v.to_str().ok())
	}

	pub fn headers_emitted(&self) -> bool {
		self.header_emissions > 0
	}

	/// How many times headers were emitted (should never exceed one).
	pub fn header_emissions(&self) -> usize {
		self.header_emissions
	}

	/// All body bytes written so far.
	pub fn body(&self) -> &[u8] {
		&self.body
	}

	/// Body bytes as UTF-8, lossy.
	pub fn body_string(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}

	pub fn into_body(self) -> Bytes {
		self.body.freeze()
	}
}

impl OutputStream for MemoryOutput {
	fn emit_headers(&mut self, status: StatusCode, headers: &HeaderMap) -> io::Result<()> {
		self.status = Some(status);
		self.headers = headers.clone();
		self.header_emissions += 1;
		Ok(())
	}

	fn write(&mut self, chunk: &[u8]) -> io::Result<()> {
		self.body.extend_from_slice(chunk);
		Ok(())
	}
}

/// Output channel over any [`io::Write`], rendering an HTTP/1.1 head.
#[derive(Debug)]
pub struct WriterOutput<W> {
	inner: W,
}

impl<W: io::Write> WriterOutput<W> {
	pub fn new(inner: W) -> Self {
		Self { inner }
	}

	pub fn into_inner(self) -> W {
		self.inner
	}
}

impl<W: io::Write> OutputStream for WriterOutput<W> {
	fn emit_headers(&mut self, status: StatusCode, headers: &HeaderMap) -> io::Result<()> {
		write!(
			self.inner,
			"HTTP/1.1 {} {}\r\n",
			status.as_u16(),
			status.canonical_reason().unwrap_or("")
		)?;
		for (name, value) in headers {
			self.inner.write_all(name.as_str().as_bytes())?;
			self.inner.write_all(b": ")?;
			self.inner.write_all(value.as_bytes())?;
			self.inner.write_all(b"\r\n")?;
		}
		self.inner.write_all(b"\r\n")
	}

	fn write(&mut self, chunk: &[u8]) -> io::Result<()> {
		self.inner.write_all(chunk)
	}

	fn flush(&mut self) -> io::Result<()> {
		self.inner.flush()
	}
}

/// Where echoed output of the current phase goes.
pub enum Output<'a> {
	/// Captured into a buffer owned by the dispatcher.
	Captured(&'a mut BytesMut),
	/// Written straight to the real output channel.
	Direct(&'a mut dyn OutputStream),
}

impl Output<'_> {
	/// Writes bytes to the current target.
	pub fn echo(&mut self, data: impl AsRef<[u8]>) -> io::Result<()> {
		match self {
			Self::Captured(buf) => {
				buf.extend_from_slice(data.as_ref());
				Ok(())
			}
			Self::Direct(out) => out.write(data.as_ref()),
		}
	}

	pub fn is_captured(&self) -> bool {
		matches!(self, Self::Captured(_))
	}

	/// Bytes captured so far in this phase; empty for direct output.
	pub fn captured(&self) -> &[u8] {
		match self {
			Self::Captured(buf) => buf,
			Self::Direct(_) => &[],
		}
	}

	/// Reborrows the target for a shorter-lived phase.
	pub fn reborrow(&mut self) -> Output<'_> {
		match self {
			Self::Captured(buf) => Output::Captured(buf),
			Self::Direct(out) => Output::Direct(&mut **out),
		}
	}
}
