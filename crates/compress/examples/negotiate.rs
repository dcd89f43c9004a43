//! Runs one response through the middleware for a few `Accept-Encoding` values and prints
//! what each client would receive.

use http::header::{ACCEPT_ENCODING, CONTENT_ENCODING, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, StatusCode};
use micro_compress::{AlgorithmConfig, CompressOptions, Compression, Encoding, MemoryResponse, ResponseWriter};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::DEBUG).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let options = CompressOptions::builder()
        .algorithm(Encoding::Zstd, AlgorithmConfig::with_level(3))
        .algorithm(Encoding::Gzip, AlgorithmConfig::with_level(6))
        .algorithm(Encoding::Deflate, AlgorithmConfig::default())
        .min_content_length(256)
        .build();
    let compression = Compression::new(options);

    let body = "<li>hello micro-compress</li>".repeat(200);

    for accept in ["gzip, deflate, br, zstd", "gzip;q=1.0, deflate;q=0.5", "br", "identity", "*"] {
        let mut request_headers = HeaderMap::new();
        request_headers.insert(ACCEPT_ENCODING, HeaderValue::from_static(accept));

        let mut response = MemoryResponse::new();
        compression.handle(&request_headers, &mut response, |response| {
            response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"));
            response.write_header(StatusCode::OK);
            response.write(body.as_bytes()).expect("memory response never fails");
        });

        let encoding = response.headers().get(CONTENT_ENCODING).and_then(|v| v.to_str().ok()).unwrap_or("identity");
        info!(accept, encoding, original = body.len(), sent = response.body().len(), "response sent");
    }
}
