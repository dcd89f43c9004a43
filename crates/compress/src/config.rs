//! Options of the compression middleware.
//!
//! [`CompressOptions`] deserializes with serde, so hosts can keep it in whatever configuration
//! format they already load; code can use [`CompressOptions::builder`]. Either way the options
//! are [normalized](CompressOptions::normalized) once when the middleware is built and are
//! read-only afterwards.

use crate::encoding::{DEFAULT_LEVEL, Encoding};
use mime::Mime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Content types compressed when none are configured.
pub const DEFAULT_COMPRESSIBLE_TYPES: &[&str] = &[
    "text/html",
    "text/css",
    "text/plain",
    "text/javascript",
    "application/javascript",
    "application/x-javascript",
    "application/json",
    "application/xml",
    "image/svg+xml",
    "application/font-woff",
    "application/font-woff2",
    "application/x-font-woff",
    "application/x-font-woff2",
    "application/vnd.ms-fontobject",
    "image/x-icon",
    "image/bmp",
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
];

/// Settings for one compression algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlgorithmConfig {
    /// Backend specific level, [`DEFAULT_LEVEL`] for the backend's default.
    pub level: i32,
    /// Whether streams of this algorithm are reused across responses.
    pub pool_enabled: bool,
}

impl AlgorithmConfig {
    pub fn new(level: i32, pool_enabled: bool) -> Self {
        Self { level, pool_enabled }
    }

    /// A pooled algorithm at `level`.
    pub fn with_level(level: i32) -> Self {
        Self::new(level, true)
    }
}

impl Default for AlgorithmConfig {
    fn default() -> Self {
        Self::new(DEFAULT_LEVEL, true)
    }
}

/// Options of the compression middleware.
///
/// [`Default`] gives the built-in configuration: gzip and deflate at their default levels
/// with pooling, no minimum length and [`DEFAULT_COMPRESSIBLE_TYPES`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressOptions {
    /// Enabled algorithms.
    #[serde(default)]
    pub algorithms: HashMap<Encoding, AlgorithmConfig>,
    /// Responses declaring a smaller `Content-Length` are sent uncompressed.
    #[serde(default)]
    pub min_content_length: u64,
    /// Prefixes of the content types worth compressing.
    #[serde(default)]
    pub compressible_types: Vec<String>,
    /// Order in which enabled algorithms are preferred.
    #[serde(default)]
    pub encoding_priority: Vec<Encoding>,
}

impl CompressOptions {
    pub fn builder() -> CompressOptionsBuilder {
        CompressOptionsBuilder::new()
    }

    fn empty() -> Self {
        Self {
            algorithms: HashMap::new(),
            min_content_length: 0,
            compressible_types: Vec::new(),
            encoding_priority: Vec::new(),
        }
    }

    fn is_unset(&self) -> bool {
        self.algorithms.is_empty()
            && self.min_content_length == 0
            && self.compressible_types.is_empty()
            && self.encoding_priority.is_empty()
    }

    /// Fills in defaults for everything left unset.
    ///
    /// - nothing set at all: the built-in configuration
    /// - no algorithms: gzip and deflate at their default levels
    /// - no priority: zstd, gzip, deflate, restricted to the enabled algorithms
    /// - no compressible types: [`DEFAULT_COMPRESSIBLE_TYPES`]
    ///
    /// gzip and deflate are only filled in when no algorithm is configured at all; they are not
    /// added next to an explicit choice, so a zstd only configuration never answers with gzip.
    pub fn normalized(mut self) -> Self {
        if self.is_unset() {
            return Self::default();
        }

        if self.algorithms.is_empty() {
            self.algorithms.insert(Encoding::Gzip, AlgorithmConfig::default());
            self.algorithms.insert(Encoding::Deflate, AlgorithmConfig::default());
        }

        if self.encoding_priority.is_empty() {
            self.encoding_priority = [Encoding::Zstd, Encoding::Gzip, Encoding::Deflate]
                .into_iter()
                .filter(|encoding| self.algorithms.contains_key(encoding))
                .collect();
        }

        if self.compressible_types.is_empty() {
            self.compressible_types = DEFAULT_COMPRESSIBLE_TYPES.iter().map(|t| (*t).to_owned()).collect();
        } else {
            for prefix in &mut self.compressible_types {
                prefix.make_ascii_lowercase();
            }
        }

        self
    }

    /// Whether `encoding` is configured.
    pub fn is_enabled(&self, encoding: Encoding) -> bool {
        self.algorithms.contains_key(&encoding)
    }

    /// The configuration of `encoding`, or the default one if it is not configured.
    pub fn algorithm(&self, encoding: Encoding) -> AlgorithmConfig {
        self.algorithms.get(&encoding).copied().unwrap_or_default()
    }

    /// Whether a response of `content_type` should be compressed.
    ///
    /// Only the type itself takes part, parameters such as `charset` are ignored. Matching is a
    /// case-insensitive prefix match against the configured types.
    pub fn is_compressible(&self, content_type: &str) -> bool {
        let essence = essence(content_type);
        if essence.is_empty() {
            return false;
        }
        self.compressible_types.iter().any(|prefix| essence.starts_with(prefix.as_str()))
    }

    /// Whether a response declaring `content_length` bytes is too small to compress.
    pub fn is_below_min_length(&self, content_length: u64) -> bool {
        self.min_content_length > 0 && content_length < self.min_content_length
    }
}

impl Default for CompressOptions {
    fn default() -> Self {
        Self {
            algorithms: HashMap::from([
                (Encoding::Gzip, AlgorithmConfig::default()),
                (Encoding::Deflate, AlgorithmConfig::default()),
            ]),
            min_content_length: 0,
            compressible_types: DEFAULT_COMPRESSIBLE_TYPES.iter().map(|t| (*t).to_owned()).collect(),
            encoding_priority: vec![Encoding::Gzip, Encoding::Deflate],
        }
    }
}

fn essence(content_type: &str) -> String {
    match content_type.parse::<Mime>() {
        Ok(mime) => mime.essence_str().to_ascii_lowercase(),
        Err(_) => content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase(),
    }
}

/// Builds [`CompressOptions`]; unset parts are filled in by [`CompressOptions::normalized`].
#[derive(Debug)]
pub struct CompressOptionsBuilder {
    options: CompressOptions,
}

impl CompressOptionsBuilder {
    fn new() -> Self {
        Self { options: CompressOptions::empty() }
    }

    pub fn algorithm(mut self, encoding: Encoding, config: AlgorithmConfig) -> Self {
        self.options.algorithms.insert(encoding, config);
        self
    }

    pub fn min_content_length(mut self, min_content_length: u64) -> Self {
        self.options.min_content_length = min_content_length;
        self
    }

    pub fn compressible_type(mut self, prefix: impl Into<String>) -> Self {
        self.options.compressible_types.push(prefix.into());
        self
    }

    pub fn encoding_priority(mut self, priority: impl IntoIterator<Item = Encoding>) -> Self {
        self.options.encoding_priority = priority.into_iter().collect();
        self
    }

    pub fn build(self) -> CompressOptions {
        self.options.normalized()
    }
}
