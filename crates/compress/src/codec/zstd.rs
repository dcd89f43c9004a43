use crate::codec::{CodecStream, Writer};
use crate::encoding::{DEFAULT_LEVEL, Encoding};
use crate::error::CodecError;
use ::zstd::stream::raw::{self, Operation};
use ::zstd::stream::zio;
use std::fmt;
use std::io::{self, Write};
use tracing::trace;

type ZstdWriter = zio::Writer<Writer, raw::Encoder<'static>>;

/// A Zstandard frame per response.
///
/// The compression context is created once per stream. [`reset`](CodecStream::reset) takes the
/// streaming writer apart, reinitializes the session of the context and puts it back around the
/// cleared staging buffer, so a pooled stream skips the context setup a fresh one pays for.
pub struct ZstdStream {
    // None only after a reset that could not build a context; the next reset tries again
    writer: Option<ZstdWriter>,
    level: i32,
    finished: bool,
    contexts_created: usize,
}

impl ZstdStream {
    pub(crate) fn new(level: i32) -> Result<Self, CodecError> {
        let encoder = Self::context(level).map_err(|e| CodecError::create(Encoding::Zstd, e))?;
        Ok(Self { writer: Some(zio::Writer::new(Writer::new(), encoder)), level, finished: false, contexts_created: 1 })
    }

    fn context(level: i32) -> io::Result<raw::Encoder<'static>> {
        let level = if level == DEFAULT_LEVEL { ::zstd::DEFAULT_COMPRESSION_LEVEL } else { level };
        raw::Encoder::new(level)
    }

    fn open_writer(&mut self) -> io::Result<&mut ZstdWriter> {
        if self.finished {
            return Err(io::Error::other("zstd stream already closed"));
        }
        self.writer.as_mut().ok_or_else(|| io::Error::other("zstd stream lost its encoder"))
    }

    /// How many compression contexts this stream has built; reuse keeps it at one.
    pub fn contexts_created(&self) -> usize {
        self.contexts_created
    }
}

impl CodecStream for ZstdStream {
    fn encoding(&self) -> Encoding {
        Encoding::Zstd
    }

    fn level(&self) -> i32 {
        self.level
    }

    fn write(&mut self, data: &[u8], sink: &mut dyn io::Write) -> io::Result<usize> {
        let writer = self.open_writer()?;
        if let Err(err) = writer.write_all(data) {
            trace!("Error encoding zstd encoding: {}", err);
            return Err(err);
        }
        writer.writer_mut().drain_into(sink)?;
        Ok(data.len())
    }

    fn flush(&mut self, sink: &mut dyn io::Write) -> io::Result<()> {
        let writer = self.open_writer()?;
        writer.flush()?;
        writer.writer_mut().drain_into(sink)
    }

    fn close(&mut self, sink: &mut dyn io::Write) -> io::Result<()> {
        if self.finished {
            return Ok(());
        }
        let writer = self.open_writer()?;
        writer.finish()?;
        let result = writer.writer_mut().drain_into(sink);
        self.finished = true;
        result
    }

    fn reset(&mut self) -> io::Result<()> {
        // a finished zio writer stays finished, so it is rebuilt around the same context
        let (mut staging, encoder) = match self.writer.take() {
            Some(writer) => {
                let (staging, mut encoder) = writer.into_inner();
                match encoder.reinit() {
                    Ok(()) => (staging, Some(encoder)),
                    Err(e) => {
                        trace!("failed to reinit zstd context, creating a new one: {}", e);
                        (staging, None)
                    }
                }
            }
            None => (Writer::new(), None),
        };

        let encoder = match encoder {
            Some(encoder) => encoder,
            None => {
                let encoder = Self::context(self.level)?;
                self.contexts_created += 1;
                encoder
            }
        };

        staging.clear();
        self.writer = Some(zio::Writer::new(staging, encoder));
        self.finished = false;
        Ok(())
    }
}

impl fmt::Debug for ZstdStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZstdStream")
            .field("level", &self.level)
            .field("finished", &self.finished)
            .field("contexts_created", &self.contexts_created)
            .finish_non_exhaustive()
    }
}
