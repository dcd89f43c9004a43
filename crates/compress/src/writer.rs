//! The compressing response wrapper.
//!
//! [`CompressResponseWriter`] sits between a handler and the host's response. Nothing is
//! decided until the handler commits the header: at that point the wrapper looks at the status
//! and the headers the handler set, and either binds a codec stream from the pools or lets the
//! response through untouched. Closing the wrapper (explicitly or on drop) finishes the stream
//! and gives it back to its pool.

use crate::codec::CodecStream;
use crate::config::CompressOptions;
use crate::encoding::Encoding;
use crate::error::ResponseError;
use crate::negotiate::Negotiated;
use crate::pool::CodecPools;
use crate::response::{RawConnection, ResponseSink, ResponseWriter};
use http::header::{CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, VARY};
use http::{HeaderMap, HeaderValue, StatusCode};
use std::{fmt, io, mem};
use tracing::{debug, trace, warn};

#[derive(Debug)]
enum State {
    /// Header not committed yet.
    Fresh,
    /// Body goes through a codec stream.
    Compressing(Box<dyn CodecStream>),
    /// Body goes to the response unchanged.
    PassThrough,
    /// The connection was taken over.
    Hijacked,
    Closed,
}

/// Wraps a [`ResponseWriter`] and compresses its body with the negotiated coding.
///
/// Headers set by the handler are left alone unless compression is chosen, in which case
/// `Content-Encoding` is set, `Accept-Encoding` is added to `Vary` and `Content-Length` is
/// removed before the status goes out.
pub struct CompressResponseWriter<'a> {
    inner: &'a mut dyn ResponseWriter,
    options: &'a CompressOptions,
    pools: &'a CodecPools,
    encoding: Option<Encoding>,
    state: State,
    status: Option<StatusCode>,
}

impl<'a> CompressResponseWriter<'a> {
    pub fn new(
        inner: &'a mut dyn ResponseWriter,
        options: &'a CompressOptions,
        pools: &'a CodecPools,
        negotiated: Negotiated,
    ) -> Self {
        Self { inner, options, pools, encoding: negotiated.encoding(), state: State::Fresh, status: None }
    }

    /// The coding chosen by negotiation, which is not necessarily applied.
    pub fn encoding(&self) -> Option<Encoding> {
        self.encoding
    }

    /// Whether the body is being compressed.
    pub fn is_compressing(&self) -> bool {
        matches!(self.state, State::Compressing(_))
    }

    pub fn is_header_committed(&self) -> bool {
        !matches!(self.state, State::Fresh)
    }

    /// Finishes the response.
    ///
    /// When compressing, the remaining compressed bytes and the trailer are written and the
    /// stream goes back to its pool. Only the first call does anything; dropping the wrapper
    /// closes it as well.
    pub fn close(&mut self) {
        match mem::replace(&mut self.state, State::Closed) {
            State::Compressing(mut stream) => {
                let encoding = stream.encoding();
                if let Err(e) = stream.close(&mut ResponseSink(&mut *self.inner)) {
                    warn!(%encoding, cause = %e, "failed to finish compressed response");
                }
                self.release(stream);
            }
            State::Fresh | State::PassThrough | State::Hijacked | State::Closed => {}
        }
    }

    fn release(&self, stream: Box<dyn CodecStream>) {
        let pool_enabled = self.options.algorithm(stream.encoding()).pool_enabled;
        self.pools.release(stream, pool_enabled);
    }

    /// Decides, once, how the body will be written.
    fn decide(&mut self, status: StatusCode) -> State {
        let Some(encoding) = self.encoding else {
            return State::PassThrough;
        };

        let headers = self.inner.headers();
        if is_bodiless(status) {
            debug!(%status, "status carries no body, skip compression");
            return State::PassThrough;
        }
        if headers.contains_key(CONTENT_ENCODING) {
            debug!("response already has content encoding, skip compression");
            return State::PassThrough;
        }
        let content_type = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()).unwrap_or_default();
        if !self.options.is_compressible(content_type) {
            debug!(content_type, "content type is not compressible, skip compression");
            return State::PassThrough;
        }
        if let Some(length) = content_length(headers)
            && self.options.is_below_min_length(length)
        {
            debug!(length, min = self.options.min_content_length, "response too small, skip compression");
            return State::PassThrough;
        }

        let config = self.options.algorithm(encoding);
        let stream = match self.pools.acquire(encoding, config.level, config.pool_enabled) {
            Ok(stream) => stream,
            Err(e) => {
                warn!(%encoding, cause = %e, "can't acquire codec stream, send response uncompressed");
                return State::PassThrough;
            }
        };

        let headers = self.inner.headers_mut();
        headers.insert(CONTENT_ENCODING, HeaderValue::from_static(encoding.as_str()));
        add_vary_accept_encoding(headers);
        headers.remove(CONTENT_LENGTH);

        debug!(%encoding, %status, "compress response");
        State::Compressing(stream)
    }
}

impl ResponseWriter for CompressResponseWriter<'_> {
    fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        self.inner.headers_mut()
    }

    fn write_header(&mut self, status: StatusCode) {
        if self.is_header_committed() {
            trace!(%status, "header already committed, ignore");
            return;
        }
        self.status = Some(status);
        self.state = self.decide(status);
        self.inner.write_header(status);
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if !self.is_header_committed() {
            self.write_header(StatusCode::OK);
        }
        match &mut self.state {
            State::Compressing(stream) => stream.write(data, &mut ResponseSink(&mut *self.inner)),
            State::Fresh | State::PassThrough | State::Hijacked | State::Closed => self.inner.write(data),
        }
    }

    fn status(&self) -> StatusCode {
        self.status.unwrap_or_else(|| self.inner.status())
    }

    /// Flushes the codec stream, then the response if it can be flushed.
    fn flush(&mut self) -> Result<(), ResponseError> {
        if let State::Compressing(stream) = &mut self.state {
            stream.flush(&mut ResponseSink(&mut *self.inner))?;
        }
        match self.inner.flush() {
            Err(e) if e.is_unsupported() => Ok(()),
            result => result,
        }
    }

    /// Takes over the connection; the codec stream goes back to its pool unfinished.
    fn hijack(&mut self) -> Result<Box<dyn RawConnection>, ResponseError> {
        let connection = self.inner.hijack()?;
        if let State::Compressing(stream) = mem::replace(&mut self.state, State::Hijacked) {
            debug!(encoding = %stream.encoding(), "connection hijacked, abandon compression");
            self.release(stream);
        }
        Ok(connection)
    }
}

impl Drop for CompressResponseWriter<'_> {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for CompressResponseWriter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompressResponseWriter")
            .field("encoding", &self.encoding)
            .field("state", &self.state)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

fn is_bodiless(status: StatusCode) -> bool {
    status.is_informational()
        || status == StatusCode::NO_CONTENT
        || status == StatusCode::RESET_CONTENT
        || status == StatusCode::NOT_MODIFIED
}

fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers.get(CONTENT_LENGTH)?.to_str().ok()?.trim().parse().ok()
}

fn add_vary_accept_encoding(headers: &mut HeaderMap) {
    let present = headers
        .get_all(VARY)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .any(|v| v == "*" || v.eq_ignore_ascii_case("accept-encoding"));

    if !present {
        headers.append(VARY, HeaderValue::from_static("Accept-Encoding"));
    }
}
