use super::BlockStream;
use noodles::bgzf::VirtualPosition;
use std::io;

/// A line together with the virtual positions bounding it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line<'a> {
    pub text: &'a str,
    pub start: VirtualPosition,
    /// Position just past the line terminator.
    pub end: VirtualPosition,
}

/// Reads newline-terminated lines from a [`BlockStream`], remembering where
/// each line started so callers can seek back to it later.
pub struct LineReader<S> {
    inner: S,
    buf: Vec<u8>,
    line_start: VirtualPosition,
    next: VirtualPosition,
}

impl<S> LineReader<S>
where
    S: BlockStream,
{
    pub fn new(inner: S) -> Self {
        let pos = inner.virtual_position();

        Self {
            inner,
            buf: Vec::new(),
            line_start: pos,
            next: pos,
        }
    }

    /// Virtual position at which the most recently returned line began.
    pub fn line_start_offset(&self) -> VirtualPosition {
        self.line_start
    }

    /// Virtual position just past the most recently returned line.
    pub fn next_line_offset(&self) -> VirtualPosition {
        self.next
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    /// Discards buffered state and positions the stream at `pos`.
    pub fn seek(&mut self, pos: VirtualPosition) -> io::Result<()> {
        self.inner.seek_virtual(pos)?;
        self.buf.clear();
        self.line_start = pos;
        self.next = pos;
        Ok(())
    }

    /// Reads the next line without its line terminator, or `None` at end of stream.
    pub fn read_line(&mut self) -> io::Result<Option<&str>> {
        if !self.advance()? {
            return Ok(None);
        }

        decode(&self.buf).map(Some)
    }

    /// Like [`read_line`](Self::read_line), but also returns the offsets
    /// bounding the line.
    pub fn read_located(&mut self) -> io::Result<Option<Line<'_>>> {
        if !self.advance()? {
            return Ok(None);
        }

        Ok(Some(Line {
            text: decode(&self.buf)?,
            start: self.line_start,
            end: self.next,
        }))
    }

    fn advance(&mut self) -> io::Result<bool> {
        self.buf.clear();

        // Empty blocks (such as the EOF marker between concatenated files)
        // must not count as the start of the line.
        if !self.fill_nonempty()? {
            return Ok(false);
        }

        self.line_start = self.inner.virtual_position();

        loop {
            let (done, used) = {
                let available = self.inner.fill_buf()?;

                match available.iter().position(|&b| b == b'\n') {
                    Some(i) => {
                        self.buf.extend_from_slice(&available[..i]);
                        (true, i + 1)
                    }
                    None => {
                        self.buf.extend_from_slice(available);
                        (false, available.len())
                    }
                }
            };

            self.inner.consume(used);

            if done || (used == 0 && !self.fill_nonempty()?) {
                break;
            }
        }

        self.next = self.inner.virtual_position();

        if self.buf.last() == Some(&b'\r') {
            self.buf.pop();
        }

        Ok(true)
    }

    /// Returns false once the stream is exhausted.
    fn fill_nonempty(&mut self) -> io::Result<bool> {
        loop {
            let before = self.inner.virtual_position();

            if !self.inner.fill_buf()?.is_empty() {
                return Ok(true);
            }

            if self.inner.virtual_position() == before {
                return Ok(false);
            }
        }
    }
}

fn decode(buf: &[u8]) -> io::Result<&str> {
    std::str::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}
