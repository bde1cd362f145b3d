//! BGZF writer that builds the tabix index of what it writes.

use crate::index::{Index, Indexer};
use crate::types::IndexOptions;
use crate::{Error, Result};
use flume::{Receiver, Sender};
use noodles::bgzf::{self, VirtualPosition};
use std::io::{self, Write};
use std::thread::{self, JoinHandle};

/// Lines queued for the indexing worker before writes block.
const QUEUE_CAPACITY: usize = 1024;

/// A complete line and the virtual positions bounding it.
struct WrittenLine {
    text: Vec<u8>,
    start: VirtualPosition,
    end: VirtualPosition,
}

/// Compresses text into BGZF while a worker thread indexes it.
///
/// Each completed line is handed over a bounded channel to a worker that
/// extracts positions and builds the index. [`IndexingWriter::finish`]
/// closes the channel, joins the worker and returns its result.
pub struct IndexingWriter<W>
where
    W: Write,
{
    inner: bgzf::Writer<W>,
    line: Vec<u8>,
    line_start: VirtualPosition,
    // a complete line whose end is only known once more data or a block
    // boundary follows it
    completed: Option<(Vec<u8>, VirtualPosition)>,
    sender: Sender<WrittenLine>,
    worker: JoinHandle<Result<Index>>,
}

impl<W> IndexingWriter<W>
where
    W: Write,
{
    pub fn new(inner: W, options: IndexOptions) -> Self {
        let (sender, receiver) = flume::bounded(QUEUE_CAPACITY);
        let worker = thread::spawn(move || index_lines(receiver, options));

        Self {
            inner: bgzf::Writer::new(inner),
            line: Vec::new(),
            line_start: VirtualPosition::from(0),
            completed: None,
            sender,
            worker,
        }
    }

    pub fn get_ref(&self) -> &W {
        self.inner.get_ref()
    }

    /// Writes the BGZF end-of-file marker and waits for the index.
    ///
    /// A final line without a terminator is still indexed.
    pub fn finish(mut self) -> Result<(W, Index)> {
        self.inner.flush()?;

        let mut sent = self.send_completed();
        if sent.is_ok() && !self.line.is_empty() {
            let text = std::mem::take(&mut self.line);
            sent = self.send(text, self.line_start);
        }

        let Self {
            inner,
            sender,
            worker,
            ..
        } = self;

        let inner = inner.finish()?;
        drop(sender);

        let index = worker
            .join()
            .map_err(|_| Error::Internal("indexing worker panicked".to_string()))??;
        sent?;

        Ok((inner, index))
    }

    /// Hands the last completed line to the worker, ending it at the
    /// current position.
    fn send_completed(&mut self) -> io::Result<()> {
        match self.completed.take() {
            Some((text, start)) => self.send(text, start),
            None => Ok(()),
        }
    }

    fn send(&mut self, text: Vec<u8>, start: VirtualPosition) -> io::Result<()> {
        let line = WrittenLine {
            text,
            start,
            end: self.inner.virtual_position(),
        };

        self.sender.send(line).map_err(|_| {
            io::Error::new(
                io::ErrorKind::BrokenPipe,
                "indexing worker stopped; finish() reports the cause",
            )
        })
    }
}

impl<W> Write for IndexingWriter<W>
where
    W: Write,
{
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut rest = buf;

        while !rest.is_empty() {
            self.send_completed()?;

            if self.line.is_empty() {
                self.line_start = self.inner.virtual_position();
            }

            let (segment, complete) = match rest.iter().position(|&b| b == b'\n') {
                Some(i) => (&rest[..=i], true),
                None => (rest, false),
            };

            self.inner.write_all(segment)?;
            self.line.extend_from_slice(segment);
            rest = &rest[segment.len()..];

            if complete {
                self.completed = Some((std::mem::take(&mut self.line), self.line_start));
            }
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

fn index_lines(receiver: Receiver<WrittenLine>, options: IndexOptions) -> Result<Index> {
    let mut indexer = Indexer::new(options);
    let mut count = 0u64;

    for line in receiver.iter() {
        let mut text = line.text.as_slice();
        if let Some(stripped) = text.strip_suffix(b"\n") {
            text = stripped;
        }
        if let Some(stripped) = text.strip_suffix(b"\r") {
            text = stripped;
        }

        let text = std::str::from_utf8(text).map_err(|e| {
            Error::InvalidInput(format!("line {} is not valid UTF-8: {}", count + 1, e))
        })?;
        indexer.push_line(text, line.start, line.end)?;
        count += 1;
    }

    tracing::debug!("Indexing worker saw {} lines", count);
    indexer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::tests::reader_for;

    fn index_of(data: &[u8], options: IndexOptions) -> Index {
        let mut reader = reader_for(data);
        let mut indexer = Indexer::new(options);
        while let Some(line) = reader.read_located().unwrap() {
            indexer.push_line(line.text, line.start, line.end).unwrap();
        }
        indexer.finish().unwrap()
    }

    #[test]
    fn test_index_matches_reading_back() {
        let mut writer = IndexingWriter::new(Vec::new(), IndexOptions::vcf());
        writeln!(writer, "##fileformat=VCFv4.2").unwrap();
        writeln!(writer, "#CHROM\tPOS\tID\tREF\tALT").unwrap();
        for chrom in ["chr1", "chr2"] {
            for i in 0..4000u64 {
                writeln!(writer, "{}\t{}\t.\tACGT\tA", chrom, i * 37 + 1).unwrap();
            }
        }

        let (data, index) = writer.finish().unwrap();
        assert_eq!(index, index_of(&data, IndexOptions::vcf()));
        assert_eq!(
            index.header().names.iter().collect::<Vec<_>>(),
            vec!["chr1", "chr2"]
        );
    }

    #[test]
    fn test_split_writes_and_explicit_flushes() {
        let mut writer = IndexingWriter::new(Vec::new(), IndexOptions::bed());
        writer.write_all(b"chr1\t0\t").unwrap();
        writer.flush().unwrap();
        writer.write_all(b"10\nchr1\t5\t20\nchr").unwrap();
        writer.write_all(b"2\t0\t1").unwrap();

        let (data, index) = writer.finish().unwrap();
        assert_eq!(index.references().len(), 2);

        let expected = index_of(&data, IndexOptions::bed());
        assert_eq!(index.references()[0], expected.references()[0]);
        assert_eq!(index.header(), expected.header());
    }

    #[test]
    fn test_worker_error_surfaces_on_finish() {
        let mut writer = IndexingWriter::new(Vec::new(), IndexOptions::bed());
        writer.write_all(b"chr1\t100\t200\nchr1\t50\t60\n").unwrap();
        let err = writer.finish().unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)), "{}", err);
    }
}
