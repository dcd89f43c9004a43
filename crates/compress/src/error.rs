use crate::encoding::Encoding;
use std::io;
use thiserror::Error;

/// Failure to hand out a codec stream.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("invalid compression level {level} for {encoding}")]
    InvalidLevel { encoding: Encoding, level: i32 },

    #[error("failed to create {encoding} encoder: {source}")]
    Create {
        encoding: Encoding,
        #[source]
        source: io::Error,
    },
}

impl CodecError {
    pub fn invalid_level(encoding: Encoding, level: i32) -> Self {
        Self::InvalidLevel { encoding, level }
    }

    pub fn create<E: Into<io::Error>>(encoding: Encoding, e: E) -> Self {
        Self::Create { encoding, source: e.into() }
    }
}

/// Errors surfaced by a [`ResponseWriter`](crate::ResponseWriter).
#[derive(Error, Debug)]
pub enum ResponseError {
    #[error("response writer does not support {capability}")]
    Unsupported { capability: &'static str },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ResponseError {
    pub fn unsupported(capability: &'static str) -> Self {
        Self::Unsupported { capability }
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }
}
