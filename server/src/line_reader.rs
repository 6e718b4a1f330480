//! Reading client input one line at a time

use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

/// Longest line a client may send, newline excluded.
pub const MAX_LINE_LENGTH: usize = 1024;

/// One unit of client input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputLine {
    /// A line without its terminator. Bytes that are not valid UTF-8 are
    /// replaced, so they can only ever fail to parse as a command.
    Text(String),
    /// A line longer than [`MAX_LINE_LENGTH`]. Its bytes were discarded.
    TooLong,
}

/// Splits a byte stream into lines of bounded length.
///
/// `next_line` is cancel safe: bytes of a partial line stay buffered in the
/// reader and the next call picks up where the last one stopped.
pub struct LineReader<R> {
    reader: R,
    buf: Vec<u8>,
    overflowed: bool,
}

impl<R: AsyncBufRead + Unpin> LineReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            overflowed: false,
        }
    }

    /// Returns the next line, or None once the stream has ended.
    ///
    /// A final line without a newline is still returned.
    pub async fn next_line(&mut self) -> io::Result<Option<InputLine>> {
        loop {
            if self.buf.len() > MAX_LINE_LENGTH {
                // Keep reading to the end of the line but throw the bytes away
                self.overflowed = true;
                self.buf.clear();
            }

            let room = (MAX_LINE_LENGTH + 1 - self.buf.len()) as u64;
            let read = (&mut self.reader)
                .take(room)
                .read_until(b'\n', &mut self.buf)
                .await?;

            let complete = self.buf.last() == Some(&b'\n');
            if !complete && read > 0 {
                continue;
            }

            let overflowed = std::mem::take(&mut self.overflowed);
            let mut line = std::mem::take(&mut self.buf);
            if overflowed {
                return Ok(Some(InputLine::TooLong));
            }
            if !complete && line.is_empty() {
                return Ok(None);
            }

            if complete {
                line.pop();
            }
            return Ok(Some(InputLine::Text(
                String::from_utf8_lossy(&line).into_owned(),
            )));
        }
    }
}
