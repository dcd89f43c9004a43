//! Streaming codec backends behind one interface.
//!
//! Every backend compresses into an internal staging [`Writer`] and drains whatever it produced
//! into the sink handed to each call. Because the sink is not owned, a stream can be parked in a
//! pool between responses and bound to the next response simply by using it with a new sink
//! after [`CodecStream::reset`].
//!
//! The backends are:
//! - [`gzip`]: `flate2`'s raw deflate encoder framed as a gzip member
//! - [`deflate`]: `flate2`'s zlib encoder, which is what HTTP calls `deflate`
//! - [`zstd`]: the `zstd` crate's streaming encoder

use crate::encoding::{DEFAULT_LEVEL, Encoding};
use crate::error::CodecError;
use bytes::BytesMut;
use flate2::Compression;
use std::fmt::Debug;
use std::io;

pub mod deflate;
pub mod gzip;
pub mod zstd;

/// A reusable compressing stream.
///
/// A stream is owned by exactly one response between acquisition and release. After
/// [`close`](CodecStream::close) the stream must be [`reset`](CodecStream::reset) before it
/// accepts data again.
pub trait CodecStream: Send + Debug {
    /// The coding this stream produces.
    fn encoding(&self) -> Encoding;

    /// The level the stream was configured with, used to route it back to its pool.
    fn level(&self) -> i32;

    /// Compresses `data`, forwarding any produced bytes to `sink`.
    fn write(&mut self, data: &[u8], sink: &mut dyn io::Write) -> io::Result<usize>;

    /// Emits everything written so far in decodable form.
    fn flush(&mut self, sink: &mut dyn io::Write) -> io::Result<()>;

    /// Finishes the stream, writing the remaining bytes and the trailer to `sink`.
    fn close(&mut self, sink: &mut dyn io::Write) -> io::Result<()>;

    /// Brings the stream back to the state of a newly constructed one.
    fn reset(&mut self) -> io::Result<()>;
}

/// Creates a fresh stream for `encoding` at `level`.
pub fn new_stream(encoding: Encoding, level: i32) -> Result<Box<dyn CodecStream>, CodecError> {
    if !encoding.is_valid_level(level) {
        return Err(CodecError::invalid_level(encoding, level));
    }

    Ok(match encoding {
        Encoding::Gzip => Box::new(gzip::GzipStream::new(level)?),
        Encoding::Deflate => Box::new(deflate::DeflateStream::new(level)?),
        Encoding::Zstd => Box::new(zstd::ZstdStream::new(level)?),
    })
}

fn flate_compression(encoding: Encoding, level: i32) -> Result<Compression, CodecError> {
    if level == DEFAULT_LEVEL {
        return Ok(Compression::default());
    }
    u32::try_from(level)
        .ok()
        .filter(|level| *level <= 9)
        .map(Compression::new)
        .ok_or_else(|| CodecError::invalid_level(encoding, level))
}

// inspired by from actix-http
#[derive(Debug, Default)]
pub(crate) struct Writer {
    buf: BytesMut,
}

impl Writer {
    fn new() -> Self {
        Self { buf: BytesMut::with_capacity(4096) }
    }

    fn extend(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    fn clear(&mut self) {
        self.buf.clear();
    }

    /// Moves the staged bytes into `sink`. The stage is emptied even if the sink fails.
    fn drain_into(&mut self, sink: &mut dyn io::Write) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let result = sink.write_all(&self.buf);
        self.buf.clear();
        result
    }
}

impl io::Write for Writer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
