//! Consumers for streamed response bodies
//!
//! The executor hands every received chunk to a [`ResponseSink`] in wire
//! order. Chunk boundaries are decided by the transport and carry no meaning.
//! A sink returning [`ControlFlow::Break`] aborts the transfer.

use std::io::{self, Write};
use std::ops::ControlFlow;

/// Receives response body chunks as they arrive
pub trait ResponseSink {
    /// Consumes one chunk; `Break` aborts the transfer
    fn accept(&mut self, chunk: &[u8]) -> ControlFlow<()>;
}

/// Drops the body, used for requests that only need status and headers
#[derive(Debug, Clone, Copy, Default)]
pub struct Discard;

impl ResponseSink for Discard {
    fn accept(&mut self, _chunk: &[u8]) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }
}

/// Accumulates the whole body in memory
impl ResponseSink for Vec<u8> {
    fn accept(&mut self, chunk: &[u8]) -> ControlFlow<()> {
        self.extend_from_slice(chunk);
        ControlFlow::Continue(())
    }
}

/// Adapts a `FnMut(&[u8]) -> bool` callback; returning `false` aborts
pub struct ChunkCallback<F>(pub F);

impl<F> ResponseSink for ChunkCallback<F>
where
    F: FnMut(&[u8]) -> bool,
{
    fn accept(&mut self, chunk: &[u8]) -> ControlFlow<()> {
        if (self.0)(chunk) {
            ControlFlow::Continue(())
        } else {
            ControlFlow::Break(())
        }
    }
}

/// Writes chunks to any [`Write`] and counts the bytes written
///
/// The first write failure is kept and aborts the transfer; callers read it
/// back with [`WriteSink::into_parts`].
pub struct WriteSink<W: Write> {
    writer: W,
    written: u64,
    error: Option<io::Error>,
}

impl<W: Write> WriteSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            written: 0,
            error: None,
        }
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    /// Returns the writer, the byte count and the write failure, if any
    pub fn into_parts(self) -> (W, u64, Option<io::Error>) {
        (self.writer, self.written, self.error)
    }
}

impl<W: Write> ResponseSink for WriteSink<W> {
    fn accept(&mut self, chunk: &[u8]) -> ControlFlow<()> {
        if self.error.is_some() {
            return ControlFlow::Break(());
        }
        match self.writer.write_all(chunk) {
            Ok(()) => {
                self.written += chunk.len() as u64;
                ControlFlow::Continue(())
            }
            Err(e) => {
                self.error = Some(e);
                ControlFlow::Break(())
            }
        }
    }
}
