//! The response side of the host pipeline, as seen by the middleware.

use crate::error::ResponseError;
use http::{HeaderMap, StatusCode};
use std::io;

/// A connection taken over from the HTTP layer, e.g. for a protocol upgrade.
pub trait RawConnection: io::Read + io::Write + Send {}

impl<T: io::Read + io::Write + Send> RawConnection for T {}

/// A response under construction.
///
/// Headers can be changed until [`write_header`](ResponseWriter::write_header) commits the
/// status; the first [`write`](ResponseWriter::write) commits `200 OK` if nothing was committed
/// before. Flushing and connection takeover are optional, the default implementations report
/// them as unsupported.
pub trait ResponseWriter {
    fn headers(&self) -> &HeaderMap;

    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Commits the status line and headers. Only the first call has an effect.
    fn write_header(&mut self, status: StatusCode);

    /// Writes body bytes.
    fn write(&mut self, data: &[u8]) -> io::Result<usize>;

    /// The committed status, `200 OK` while nothing is committed.
    fn status(&self) -> StatusCode;

    /// Pushes buffered bytes to the client.
    fn flush(&mut self) -> Result<(), ResponseError> {
        Err(ResponseError::unsupported("flush"))
    }

    /// Takes over the underlying connection.
    fn hijack(&mut self) -> Result<Box<dyn RawConnection>, ResponseError> {
        Err(ResponseError::unsupported("hijack"))
    }
}

/// Adapts a [`ResponseWriter`] body to [`io::Write`].
pub(crate) struct ResponseSink<'a, W: ResponseWriter + ?Sized>(pub(crate) &'a mut W);

impl<W: ResponseWriter + ?Sized> io::Write for ResponseSink<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A response kept in memory.
///
/// Useful for hosts that buffer whole responses, and for exercising the middleware without a
/// server.
#[derive(Debug, Default)]
pub struct MemoryResponse {
    headers: HeaderMap,
    status: Option<StatusCode>,
    body: Vec<u8>,
    flushes: usize,
}

impl MemoryResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// The committed status, `None` while nothing is committed.
    pub fn committed_status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn into_body(self) -> Vec<u8> {
        self.body
    }

    /// How many times the response was flushed.
    pub fn flushes(&self) -> usize {
        self.flushes
    }
}

impl ResponseWriter for MemoryResponse {
    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_header(&mut self, status: StatusCode) {
        if self.status.is_none() {
            self.status = Some(status);
        }
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.write_header(StatusCode::OK);
        self.body.extend_from_slice(data);
        Ok(data.len())
    }

    fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    fn flush(&mut self) -> Result<(), ResponseError> {
        self.flushes += 1;
        Ok(())
    }
}
