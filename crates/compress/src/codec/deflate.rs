use crate::codec::{CodecStream, Writer, flate_compression};
use crate::encoding::Encoding;
use crate::error::CodecError;
use flate2::write::ZlibEncoder;
use std::fmt;
use std::io::{self, Write};
use tracing::trace;

/// The HTTP `deflate` coding, which is a zlib stream.
pub struct DeflateStream {
    encoder: ZlibEncoder<Writer>,
    level: i32,
    finished: bool,
}

impl DeflateStream {
    pub(crate) fn new(level: i32) -> Result<Self, CodecError> {
        let compression = flate_compression(Encoding::Deflate, level)?;
        Ok(Self { encoder: ZlibEncoder::new(Writer::new(), compression), level, finished: false })
    }

    fn check_open(&self) -> io::Result<()> {
        if self.finished { Err(io::Error::other("deflate stream already closed")) } else { Ok(()) }
    }
}

impl CodecStream for DeflateStream {
    fn encoding(&self) -> Encoding {
        Encoding::Deflate
    }

    fn level(&self) -> i32 {
        self.level
    }

    fn write(&mut self, data: &[u8], sink: &mut dyn io::Write) -> io::Result<usize> {
        self.check_open()?;
        if let Err(err) = self.encoder.write_all(data) {
            trace!("Error encoding deflate encoding: {}", err);
            return Err(err);
        }
        self.encoder.get_mut().drain_into(sink)?;
        Ok(data.len())
    }

    fn flush(&mut self, sink: &mut dyn io::Write) -> io::Result<()> {
        self.check_open()?;
        self.encoder.flush()?;
        self.encoder.get_mut().drain_into(sink)
    }

    fn close(&mut self, sink: &mut dyn io::Write) -> io::Result<()> {
        if self.finished {
            return Ok(());
        }
        self.encoder.try_finish()?;
        self.finished = true;
        self.encoder.get_mut().drain_into(sink)
    }

    fn reset(&mut self) -> io::Result<()> {
        // same as gzip: the finish flate2 runs first is empty after close
        let mut previous = self.encoder.reset(Writer::default())?;
        previous.clear();
        *self.encoder.get_mut() = previous;
        self.finished = false;
        Ok(())
    }
}

impl fmt::Debug for DeflateStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeflateStream").field("level", &self.level).field("finished", &self.finished).finish_non_exhaustive()
    }
}
