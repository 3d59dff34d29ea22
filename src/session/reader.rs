//! Bounded newline framing over an async byte stream.
//!
//! Lines are split on `\n`. A line that grows past the frame limit without
//! a newline is cut at the limit and returned; the rest of that line is
//! discarded up to the next newline. Oversized input is therefore
//! truncated, never an error.

use bytes::BytesMut;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Upper bound on a single buffered line
pub const MAX_FRAME_LENGTH: usize = 64 * 1024;

/// Read buffer growth step
const READ_CAPACITY: usize = 4 * 1024;

/// Splits an async byte stream into newline-delimited lines
#[derive(Debug)]
pub struct LineReader<R> {
    inner: R,
    buffer: BytesMut,
    max_frame: usize,
    /// Set while skipping the tail of an oversized line
    discarding: bool,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    /// Create a reader with the default frame limit
    pub fn new(inner: R) -> Self {
        Self::with_max_frame(inner, MAX_FRAME_LENGTH)
    }

    /// Create a reader with a custom frame limit
    pub fn with_max_frame(inner: R, max_frame: usize) -> Self {
        Self {
            inner,
            buffer: BytesMut::with_capacity(READ_CAPACITY),
            max_frame,
            discarding: false,
        }
    }

    /// Read the next line, without its `\n`.
    ///
    /// Returns `Ok(None)` at end of stream. A final line with no trailing
    /// newline is still returned. Invalid UTF-8 is replaced lossily.
    pub async fn next_line(&mut self) -> io::Result<Option<String>> {
        loop {
            if let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
                let frame = self.buffer.split_to(pos + 1);
                if self.discarding {
                    self.discarding = false;
                    continue;
                }
                return Ok(Some(decode(&frame[..pos])));
            }

            if self.discarding {
                self.buffer.clear();
            } else if self.buffer.len() >= self.max_frame {
                let frame = self.buffer.split_to(self.max_frame);
                self.discarding = true;
                return Ok(Some(decode(&frame)));
            }

            self.buffer.reserve(READ_CAPACITY);
            let n = self.inner.read_buf(&mut self.buffer).await?;
            if n == 0 {
                if self.buffer.is_empty() || self.discarding {
                    self.buffer.clear();
                    return Ok(None);
                }
                let frame = self.buffer.split();
                return Ok(Some(decode(&frame)));
            }
        }
    }
}

fn decode(frame: &[u8]) -> String {
    String::from_utf8_lossy(frame).into_owned()
}
