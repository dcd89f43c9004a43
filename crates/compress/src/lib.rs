//! Negotiated, pooled response compression.
//!
//! The crate picks a content coding from the request's `Accept-Encoding`, decides once the
//! handler commits its header whether the response is worth compressing, and streams the body
//! through a gzip, deflate or zstd encoder taken from a reuse pool.
//!
//! The pieces, bottom up:
//! - [`codec`]: the streaming encoders, all behind [`CodecStream`]
//! - [`CodecPools`]: reuse pools keyed by coding and level
//! - [`parse_accept_encoding`] and [`negotiate`]: coding selection, server priority first
//! - [`CompressOptions`]: what to compress and how, loadable with serde
//! - [`CompressResponseWriter`]: the per response wrapper around a [`ResponseWriter`]
//! - [`Compression`]: the middleware tying it together
//!
//! Hosts plug in by implementing [`ResponseWriter`] for their response type and calling
//! [`Compression::handle`] around their handler.

pub mod codec;
mod config;
mod encoding;
mod error;
mod middleware;
mod negotiate;
mod pool;
mod response;
mod writer;

pub use codec::{CodecStream, new_stream};
pub use config::{AlgorithmConfig, CompressOptions, CompressOptionsBuilder, DEFAULT_COMPRESSIBLE_TYPES};
pub use encoding::{DEFAULT_LEVEL, Encoding, IDENTITY, UnknownEncoding, WILDCARD};
pub use error::{CodecError, ResponseError};
pub use middleware::Compression;
pub use negotiate::{Negotiated, QValue, negotiate, parse_accept_encoding};
pub use pool::{CodecPools, PoolKey};
pub use response::{MemoryResponse, RawConnection, ResponseWriter};
pub use writer::CompressResponseWriter;
