//! The compression middleware.

use crate::config::CompressOptions;
use crate::negotiate::{Negotiated, negotiate, parse_accept_encoding};
use crate::pool::CodecPools;
use crate::response::ResponseWriter;
use crate::writer::CompressResponseWriter;
use http::HeaderMap;
use http::header::ACCEPT_ENCODING;
use std::sync::Arc;
use tracing::{debug, trace};

/// Compresses responses with the coding negotiated from the request's `Accept-Encoding`.
///
/// A `Compression` is cheap to clone and can be shared by every request of a server.
///
/// ```
/// use http::{HeaderMap, HeaderValue, StatusCode};
/// use micro_compress::{Compression, CompressOptions, MemoryResponse, ResponseWriter};
///
/// let compression = Compression::new(CompressOptions::default());
///
/// let mut request_headers = HeaderMap::new();
/// request_headers.insert(http::header::ACCEPT_ENCODING, HeaderValue::from_static("gzip"));
///
/// let mut response = MemoryResponse::new();
/// compression.handle(&request_headers, &mut response, |response| {
///     response.headers_mut().insert(http::header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
///     response.write_header(StatusCode::OK);
///     response.write(b"hello world").unwrap();
/// });
///
/// assert_eq!(response.headers()[http::header::CONTENT_ENCODING], "gzip");
/// ```
#[derive(Debug, Clone)]
pub struct Compression {
    options: Arc<CompressOptions>,
    pools: Arc<CodecPools>,
}

impl Compression {
    /// Creates the middleware with the process wide pools.
    pub fn new(options: CompressOptions) -> Self {
        Self::with_pools(options, CodecPools::global())
    }

    /// Creates the middleware with its own pools.
    pub fn with_pools(options: CompressOptions, pools: Arc<CodecPools>) -> Self {
        let options = options.normalized();
        debug!(
            algorithms = ?options.algorithms,
            priority = ?options.encoding_priority,
            min_content_length = options.min_content_length,
            "build compression middleware"
        );
        Self { options: Arc::new(options), pools }
    }

    /// The normalized options.
    pub fn options(&self) -> &CompressOptions {
        &self.options
    }

    pub fn pools(&self) -> &CodecPools {
        &self.pools
    }

    /// Chooses the coding for a request with `request_headers`.
    ///
    /// Several `Accept-Encoding` lines are treated as one comma separated list.
    pub fn negotiate(&self, request_headers: &HeaderMap) -> Negotiated {
        let accept_encoding = request_headers
            .get_all(ACCEPT_ENCODING)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .collect::<Vec<_>>()
            .join(",");

        let prefs = parse_accept_encoding(&accept_encoding);
        negotiate(&prefs, |encoding| self.options.is_enabled(encoding), &self.options.encoding_priority)
    }

    /// Runs `next` with a response that compresses what it writes.
    ///
    /// When no coding is negotiated `next` gets `response` itself. Otherwise it gets a
    /// [`CompressResponseWriter`] that is closed once `next` returns, or while unwinding if
    /// `next` panics, so the codec stream always goes back to its pool.
    pub fn handle<F, R>(&self, request_headers: &HeaderMap, response: &mut dyn ResponseWriter, next: F) -> R
    where
        F: FnOnce(&mut dyn ResponseWriter) -> R,
    {
        let negotiated = self.negotiate(request_headers);
        if negotiated.encoding().is_none() {
            trace!(?negotiated, "no content coding negotiated");
            return next(response);
        }

        let mut writer = CompressResponseWriter::new(response, &self.options, &self.pools, negotiated);
        let result = next(&mut writer);
        writer.close();
        result
    }
}

impl Default for Compression {
    fn default() -> Self {
        Self::new(CompressOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::tests::decode;
    use crate::config::AlgorithmConfig;
    use crate::encoding::{DEFAULT_LEVEL, Encoding};
    use crate::response::MemoryResponse;
    use http::header::{CONTENT_ENCODING, CONTENT_TYPE};
    use http::{HeaderValue, StatusCode};
    use std::panic::{AssertUnwindSafe, catch_unwind};

    fn accept(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static(value));
        headers
    }

    fn write_text(response: &mut dyn ResponseWriter, body: &[u8]) {
        response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        response.write_header(StatusCode::OK);
        response.write(body).unwrap();
    }

    fn local(options: CompressOptions) -> Compression {
        Compression::with_pools(options, Arc::new(CodecPools::new()))
    }

    #[test]
    fn test_options_are_normalized() {
        let compression = local(CompressOptions::builder().min_content_length(10).build());
        assert_eq!(compression.options().encoding_priority, vec![Encoding::Gzip, Encoding::Deflate]);
        assert!(Compression::default().options().is_enabled(Encoding::Gzip));
    }

    #[test]
    fn test_negotiate_joins_header_lines() {
        let compression = local(CompressOptions::default());
        let mut headers = HeaderMap::new();
        headers.append(ACCEPT_ENCODING, HeaderValue::from_static("br"));
        headers.append(ACCEPT_ENCODING, HeaderValue::from_static("deflate"));
        assert_eq!(compression.negotiate(&headers), Negotiated::Encoding(Encoding::Deflate));
        assert_eq!(compression.negotiate(&HeaderMap::new()), Negotiated::Identity);
    }

    #[test]
    fn test_handle_compresses() {
        let compression = local(CompressOptions::default());
        let mut response = MemoryResponse::new();

        let len = compression.handle(&accept("gzip, deflate"), &mut response, |response| {
            write_text(response, b"compress me");
            11
        });

        assert_eq!(len, 11);
        assert_eq!(response.headers()[CONTENT_ENCODING], "gzip");
        assert_eq!(decode(Encoding::Gzip, response.body()), b"compress me");
        assert_eq!(compression.pools().idle_count(Encoding::Gzip, DEFAULT_LEVEL), 1);
    }

    #[test]
    fn test_handle_without_coding_uses_response_directly() {
        let compression = local(CompressOptions::default());
        for header in ["identity", "br"] {
            let mut response = MemoryResponse::new();
            compression.handle(&accept(header), &mut response, |response| write_text(response, b"as is"));
            assert_eq!(response.body(), b"as is");
            assert!(response.headers().get(CONTENT_ENCODING).is_none());
        }
    }

    #[test]
    fn test_handle_releases_stream_on_panic() {
        let options = CompressOptions::builder().algorithm(Encoding::Zstd, AlgorithmConfig::with_level(3)).build();
        let compression = local(options);
        let mut response = MemoryResponse::new();

        let result = catch_unwind(AssertUnwindSafe(|| {
            compression.handle::<_, ()>(&accept("zstd"), &mut response, |response| {
                write_text(response, b"partial");
                panic!("handler failed");
            });
        }));

        result.unwrap_err();
        assert_eq!(compression.pools().idle_count(Encoding::Zstd, 3), 1);
    }

    #[test]
    fn test_clones_share_pools() {
        let compression = local(CompressOptions::default());
        let clone = compression.clone();

        let mut response = MemoryResponse::new();
        clone.handle(&accept("deflate"), &mut response, |response| write_text(response, b"shared"));

        assert_eq!(compression.pools().idle_count(Encoding::Deflate, DEFAULT_LEVEL), 1);
        assert_eq!(decode(Encoding::Deflate, response.body()), b"shared");
    }
}
