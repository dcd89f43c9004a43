use crate::codec::{CodecStream, Writer, flate_compression};
use crate::encoding::Encoding;
use crate::error::CodecError;
use flate2::Crc;
use flate2::write::DeflateEncoder;
use std::fmt;
use std::io::{self, Write};
use tracing::trace;

// magic, CM = deflate, no flags, no mtime, no extra flags, OS = unknown
const GZIP_HEADER: [u8; 10] = [0x1f, 0x8b, 0x08, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xff];

/// A gzip member built on a resettable raw deflate encoder.
///
/// `flate2::write::GzEncoder` cannot be reset, so the member framing is written here around a
/// `DeflateEncoder`, whose compressor state survives between responses.
pub struct GzipStream {
    encoder: DeflateEncoder<Writer>,
    crc: Crc,
    level: i32,
    header_written: bool,
    finished: bool,
}

impl GzipStream {
    pub(crate) fn new(level: i32) -> Result<Self, CodecError> {
        let compression = flate_compression(Encoding::Gzip, level)?;
        Ok(Self {
            encoder: DeflateEncoder::new(Writer::new(), compression),
            crc: Crc::new(),
            level,
            header_written: false,
            finished: false,
        })
    }

    fn ensure_header(&mut self) -> io::Result<()> {
        if self.finished {
            return Err(io::Error::other("gzip stream already closed"));
        }
        if !self.header_written {
            self.encoder.get_mut().extend(&GZIP_HEADER);
            self.header_written = true;
        }
        Ok(())
    }
}

impl CodecStream for GzipStream {
    fn encoding(&self) -> Encoding {
        Encoding::Gzip
    }

    fn level(&self) -> i32 {
        self.level
    }

    fn write(&mut self, data: &[u8], sink: &mut dyn io::Write) -> io::Result<usize> {
        self.ensure_header()?;
        if let Err(err) = self.encoder.write_all(data) {
            trace!("Error encoding gzip encoding: {}", err);
            return Err(err);
        }
        self.crc.update(data);
        self.encoder.get_mut().drain_into(sink)?;
        Ok(data.len())
    }

    fn flush(&mut self, sink: &mut dyn io::Write) -> io::Result<()> {
        self.ensure_header()?;
        self.encoder.flush()?;
        self.encoder.get_mut().drain_into(sink)
    }

    fn close(&mut self, sink: &mut dyn io::Write) -> io::Result<()> {
        if self.finished {
            return Ok(());
        }
        self.ensure_header()?;
        self.encoder.try_finish()?;
        self.finished = true;

        let crc = self.crc.sum();
        let size = self.crc.amount();
        let writer = self.encoder.get_mut();
        writer.extend(&crc.to_le_bytes());
        writer.extend(&size.to_le_bytes());
        writer.drain_into(sink)
    }

    fn reset(&mut self) -> io::Result<()> {
        // flate2 finishes the old stream before resetting it. After close that finish emits
        // nothing; for an abandoned stream it flushes the leftovers into `previous`, dropped here.
        let mut previous = self.encoder.reset(Writer::default())?;
        previous.clear();
        *self.encoder.get_mut() = previous;

        self.crc.reset();
        self.header_written = false;
        self.finished = false;
        Ok(())
    }
}

impl fmt::Debug for GzipStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GzipStream")
            .field("level", &self.level)
            .field("header_written", &self.header_written)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}
