//! Line-oriented access to BGZF-compressed text.
//!
//! The compression codec itself is provided by noodles; this module only
//! needs a stream that can report and seek to virtual positions.

mod line_reader;

pub use line_reader::{Line, LineReader};

#[cfg(test)]
pub(crate) use line_reader::tests::bgzf_blocks;

use noodles::bgzf::{self, VirtualPosition};
use std::io::{self, BufRead, Read, Seek};

/// A decompressing stream addressed by BGZF virtual positions.
pub trait BlockStream: BufRead {
    /// Virtual position of the next byte that `fill_buf` would return.
    fn virtual_position(&self) -> VirtualPosition;

    /// Repositions the stream so the next read starts at `pos`.
    fn seek_virtual(&mut self, pos: VirtualPosition) -> io::Result<VirtualPosition>;
}

impl<R> BlockStream for bgzf::Reader<R>
where
    R: Read + Seek,
{
    fn virtual_position(&self) -> VirtualPosition {
        bgzf::Reader::virtual_position(self)
    }

    fn seek_virtual(&mut self, pos: VirtualPosition) -> io::Result<VirtualPosition> {
        bgzf::Reader::seek(self, pos)
    }
}

impl<S> BlockStream for &mut S
where
    S: BlockStream + ?Sized,
{
    fn virtual_position(&self) -> VirtualPosition {
        (**self).virtual_position()
    }

    fn seek_virtual(&mut self, pos: VirtualPosition) -> io::Result<VirtualPosition> {
        (**self).seek_virtual(pos)
    }
}
