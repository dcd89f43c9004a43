//! Content codings understood by the compression middleware.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sentinel level meaning "whatever the backend considers its default".
///
/// Every backend accepts it: gzip and deflate map it to zlib's level 6, zstd to
/// `zstd::DEFAULT_COMPRESSION_LEVEL`.
pub const DEFAULT_LEVEL: i32 = -1;

/// The `identity` token, meaning the body is sent as is.
pub const IDENTITY: &str = "identity";

/// The wildcard token of `Accept-Encoding`.
pub const WILDCARD: &str = "*";

/// A compressing content coding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// `gzip`, a deflate stream framed as a gzip member.
    Gzip,
    /// `deflate`, a deflate stream in the zlib format.
    Deflate,
    /// `zstd`, Zstandard.
    Zstd,
}

impl Encoding {
    /// All supported encodings.
    pub const ALL: [Encoding; 3] = [Encoding::Zstd, Encoding::Gzip, Encoding::Deflate];

    /// Returns the token used in `Accept-Encoding` and `Content-Encoding`.
    pub fn as_str(self) -> &'static str {
        match self {
            Encoding::Gzip => "gzip",
            Encoding::Deflate => "deflate",
            Encoding::Zstd => "zstd",
        }
    }

    /// Levels that get a reuse pool at startup.
    ///
    /// Any other level is served by fresh encoders that are dropped after use.
    pub fn pooled_levels(self) -> &'static [i32] {
        match self {
            Encoding::Gzip | Encoding::Deflate => &[DEFAULT_LEVEL, 0, 1, 2, 3, 4, 5, 6, 7, 8, 9],
            Encoding::Zstd => &[DEFAULT_LEVEL, 3],
        }
    }

    /// Whether `level` can be handed to this backend.
    pub fn is_valid_level(self, level: i32) -> bool {
        if level == DEFAULT_LEVEL {
            return true;
        }
        match self {
            Encoding::Gzip | Encoding::Deflate => (0..=9).contains(&level),
            Encoding::Zstd => (0..=*zstd::compression_level_range().end()).contains(&level),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a token is not one of the supported encodings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported content coding: {0}")]
pub struct UnknownEncoding(pub String);

impl FromStr for Encoding {
    type Err = UnknownEncoding;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("gzip") {
            Ok(Encoding::Gzip)
        } else if s.eq_ignore_ascii_case("deflate") {
            Ok(Encoding::Deflate)
        } else if s.eq_ignore_ascii_case("zstd") {
            Ok(Encoding::Zstd)
        } else {
            Err(UnknownEncoding(s.to_owned()))
        }
    }
}
