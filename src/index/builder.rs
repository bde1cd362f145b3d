use super::binning::{self, MAX_POSITION};
use super::{Chunk, Header, Index, Metadata, ReferenceIndex, ReferenceNames};
use crate::formats::{Extractor, HeaderFilter, LinePosition, PositionExtractor};
use crate::io::LineReader;
use crate::types::IndexOptions;
use crate::{Error, Result};
use noodles::bgzf::{self, VirtualPosition};
use std::fs::File;
use std::path::Path;

/// Builds an [`Index`] from lines fed in file order.
#[derive(Debug)]
pub struct Indexer {
    options: IndexOptions,
    extractor: Extractor,
    headers: HeaderFilter,
    names: ReferenceNames,
    references: Vec<ReferenceIndex>,
    finished: Vec<bool>,
    current: Option<ReferenceBuilder>,
    unplaced: u64,
}

impl Indexer {
    pub fn new(options: IndexOptions) -> Self {
        Self::with_names(options, ReferenceNames::new())
    }

    /// Starts from an existing name table; names already in it keep their ids.
    pub fn with_names(options: IndexOptions, names: ReferenceNames) -> Self {
        Self {
            extractor: Extractor::new(&options),
            headers: HeaderFilter::new(&options),
            options,
            names,
            references: Vec::new(),
            finished: Vec::new(),
            current: None,
            unplaced: 0,
        }
    }

    pub fn names(&self) -> &ReferenceNames {
        &self.names
    }

    /// Feeds one raw line spanning `[start, end)` in the data file.
    ///
    /// Header lines are recognised here and ignored, so every line of the
    /// file must be passed in order.
    pub fn push_line(&mut self, line: &str, start: VirtualPosition, end: VirtualPosition) -> Result<()> {
        if self.headers.is_header(line) {
            return Ok(());
        }

        let position = self.extractor.extract(line)?;
        self.push(position, start, end)
    }

    /// Feeds one extracted record; `None` marks a record without a reference.
    pub fn push(
        &mut self,
        position: Option<LinePosition<'_>>,
        start: VirtualPosition,
        end: VirtualPosition,
    ) -> Result<()> {
        let Some(position) = position else {
            self.unplaced += 1;
            return Ok(());
        };

        if position.end() > MAX_POSITION {
            return Err(Error::InvalidInput(format!(
                "{}:{} exceeds the maximum indexable position {}",
                position.reference_name,
                position.end(),
                MAX_POSITION
            )));
        }

        let id = self.names.get_or_insert(position.reference_name);

        match self.current.as_ref().map(|current| (current.id, current.last_start)) {
            Some((current_id, last_start)) if current_id == id => {
                if position.start < last_start {
                    return Err(unsorted(&position, last_start));
                }
            }
            _ => {
                if self.finished.get(id).copied().unwrap_or(false) {
                    return Err(Error::InvalidInput(format!(
                        "file is not sorted: {} appears again after another sequence",
                        position.reference_name
                    )));
                }
                self.finish_reference();
                self.current = Some(ReferenceBuilder::new(id, start));
            }
        }

        if let Some(current) = self.current.as_mut() {
            current.push(&position, start, end);
        }

        Ok(())
    }

    /// Completes the index. Every name in the table gets a reference entry,
    /// empty for names without records.
    pub fn finish(mut self) -> Result<Index> {
        self.finish_reference();
        self.references.resize_with(self.names.len(), ReferenceIndex::new);

        Ok(Index::new(
            Header::new(self.options, self.names),
            self.references,
            Some(self.unplaced),
        ))
    }

    fn finish_reference(&mut self) {
        let Some(current) = self.current.take() else {
            return;
        };

        let id = current.id;
        if self.references.len() <= id {
            self.references.resize_with(id + 1, ReferenceIndex::new);
            self.finished.resize(id + 1, false);
        }

        self.references[id] = current.finish();
        self.finished[id] = true;
    }
}

fn unsorted(position: &LinePosition<'_>, previous: u64) -> Error {
    Error::InvalidInput(format!(
        "file is not sorted: {}:{} follows start {}",
        position.reference_name,
        position.start + 1,
        previous + 1
    ))
}

/// Accumulates the index of the reference currently being read.
#[derive(Debug)]
struct ReferenceBuilder {
    id: usize,
    index: ReferenceIndex,
    linear: Vec<Option<VirtualPosition>>,
    first_offset: VirtualPosition,
    last_offset: VirtualPosition,
    last_start: u64,
    mapped: u64,
    unmapped: u64,
    // bin and chunk of the current run of records sharing a bin
    run: Option<(u32, Chunk)>,
}

impl ReferenceBuilder {
    fn new(id: usize, first_offset: VirtualPosition) -> Self {
        Self {
            id,
            index: ReferenceIndex::new(),
            linear: Vec::new(),
            first_offset,
            last_offset: first_offset,
            last_start: 0,
            mapped: 0,
            unmapped: 0,
            run: None,
        }
    }

    fn push(&mut self, position: &LinePosition<'_>, start: VirtualPosition, end: VirtualPosition) {
        let bin = binning::reg2bin(position.start, position.end());

        // a run only grows over contiguous lines, never across skipped data
        match self.run.as_mut() {
            Some((run_bin, chunk)) if *run_bin == bin && chunk.end() == start => {
                *chunk = Chunk::new(chunk.start(), end)
            }
            _ => {
                if let Some((run_bin, chunk)) = self.run.take() {
                    self.index.push_chunk(run_bin, chunk);
                }
                self.run = Some((bin, Chunk::new(start, end)));
            }
        }

        if position.mapped {
            self.mapped += 1;

            let first = binning::window(position.start);
            let last = binning::window(position.end().max(position.start + 1) - 1);
            if self.linear.len() <= last {
                self.linear.resize(last + 1, None);
            }
            for slot in &mut self.linear[first..=last] {
                match slot {
                    Some(pos) if *pos <= start => {}
                    _ => *slot = Some(start),
                }
            }
        } else {
            self.unmapped += 1;
        }

        self.last_start = position.start;
        self.last_offset = end;
    }

    fn finish(mut self) -> ReferenceIndex {
        if let Some((bin, chunk)) = self.run.take() {
            self.index.push_chunk(bin, chunk);
        }

        // empty windows take the offset of the next window holding a record;
        // the last window is always set
        let mut next = self.last_offset;
        let mut filled: Vec<VirtualPosition> = self
            .linear
            .iter()
            .rev()
            .map(|slot| {
                let pos = slot.unwrap_or(next);
                next = pos;
                pos
            })
            .collect();
        filled.reverse();
        *self.index.linear_mut() = filled;

        self.index.set_metadata(Metadata {
            start: self.first_offset,
            end: self.last_offset,
            mapped: self.mapped,
            unmapped: self.unmapped,
        });

        self.index
    }
}

/// Indexes a BGZF-compressed text file.
pub fn build_index<P: AsRef<Path>>(path: P, options: IndexOptions) -> Result<Index> {
    let path = path.as_ref();

    let build = || -> Result<Index> {
        let mut reader = LineReader::new(bgzf::Reader::new(File::open(path)?));
        let mut indexer = Indexer::new(options);
        let mut lines = 0u64;

        while let Some(line) = reader.read_located()? {
            indexer.push_line(line.text, line.start, line.end).map_err(|e| match e {
                Error::InvalidInput(msg) => Error::InvalidInput(format!("line {}: {}", lines + 1, msg)),
                e => e,
            })?;
            lines += 1;
        }

        let index = indexer.finish()?;
        tracing::info!(
            "Indexed {} lines over {} sequences from {:?}",
            lines,
            index.references().len(),
            path
        );
        Ok(index)
    };

    build().map_err(Error::in_file(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::binning::META_BIN;

    fn vp(compressed: u64, uncompressed: u16) -> VirtualPosition {
        VirtualPosition::try_from((compressed, uncompressed)).unwrap()
    }

    fn position(name: &str, start: u64, span: u64) -> Option<LinePosition<'_>> {
        Some(LinePosition {
            reference_name: name,
            start,
            span,
            mapped: true,
        })
    }

    #[test]
    fn test_consecutive_records_in_one_bin_share_a_chunk() {
        let mut indexer = Indexer::new(IndexOptions::bed());
        indexer.push(position("chr1", 100, 10), vp(0, 0), vp(0, 20)).unwrap();
        indexer.push(position("chr1", 200, 10), vp(0, 20), vp(0, 40)).unwrap();
        indexer.push(position("chr1", 300, 10), vp(0, 40), vp(0, 60)).unwrap();
        let index = indexer.finish().unwrap();

        let chr1 = &index.references()[0];
        assert_eq!(chr1.chunks(4681), &[Chunk::new(vp(0, 0), vp(0, 60))]);
        assert_eq!(chr1.linear_index(), &[vp(0, 0)]);

        let meta = chr1.metadata().unwrap();
        assert_eq!((meta.start, meta.end, meta.mapped, meta.unmapped), (vp(0, 0), vp(0, 60), 3, 0));
        assert_eq!(index.unplaced(), Some(0));
    }

    #[test]
    fn test_bin_change_splits_chunks() {
        let mut indexer = Indexer::new(IndexOptions::bed());
        indexer.push(position("chr1", 100, 10), vp(0, 0), vp(0, 20)).unwrap();
        // spans a window boundary, lands in a parent bin
        indexer.push(position("chr1", 16000, 1000), vp(0, 20), vp(0, 40)).unwrap();
        indexer.push(position("chr1", 16500, 10), vp(0, 40), vp(0, 60)).unwrap();
        let index = indexer.finish().unwrap();

        let chr1 = &index.references()[0];
        assert_eq!(chr1.chunks(4681), &[Chunk::new(vp(0, 0), vp(0, 20))]);
        assert_eq!(chr1.chunks(585), &[Chunk::new(vp(0, 20), vp(0, 40))]);
        assert_eq!(chr1.chunks(4682), &[Chunk::new(vp(0, 40), vp(0, 60))]);
        assert_eq!(chr1.linear_index(), &[vp(0, 0), vp(0, 20)]);
        assert!(chr1.bins().contains_key(&META_BIN));
    }

    #[test]
    fn test_linear_index_gaps_are_filled() {
        let mut indexer = Indexer::new(IndexOptions::bed());
        indexer.push(position("chr1", 3 * 16384, 10), vp(5, 0), vp(5, 30)).unwrap();
        indexer.push(position("chr1", 6 * 16384, 10), vp(5, 30), vp(9, 0)).unwrap();
        let index = indexer.finish().unwrap();

        let linear = index.references()[0].linear_index();
        assert_eq!(linear.len(), 7);
        assert!(linear[..4].iter().all(|&pos| pos == vp(5, 0)));
        assert!(linear[4..].iter().all(|&pos| pos == vp(5, 30)));
    }

    #[test]
    fn test_run_splits_over_skipped_data() {
        let mut indexer = Indexer::new(IndexOptions::bed());
        indexer.push(position("chr1", 0, 10), vp(0, 0), vp(0, 20)).unwrap();
        // an empty block sits between the two lines
        indexer.push(position("chr1", 100, 10), vp(60, 0), vp(60, 20)).unwrap();
        indexer.push(position("chr1", 200, 10), vp(60, 20), vp(60, 40)).unwrap();
        let index = indexer.finish().unwrap();

        assert_eq!(
            index.references()[0].chunks(4681),
            &[Chunk::new(vp(0, 0), vp(0, 20)), Chunk::new(vp(60, 0), vp(60, 40))]
        );
    }

    #[test]
    fn test_unmapped_and_unplaced_counts() {
        let mut indexer = Indexer::new(IndexOptions::sam());
        indexer.push(position("chr1", 10, 5), vp(0, 0), vp(0, 10)).unwrap();
        let unmapped = LinePosition {
            reference_name: "chr1",
            start: 20,
            span: 1,
            mapped: false,
        };
        indexer.push(Some(unmapped), vp(0, 10), vp(0, 20)).unwrap();
        indexer.push(None, vp(0, 20), vp(0, 30)).unwrap();
        let index = indexer.finish().unwrap();

        let meta = index.references()[0].metadata().unwrap();
        assert_eq!((meta.mapped, meta.unmapped), (1, 1));
        assert_eq!(index.unplaced(), Some(1));
    }

    #[test]
    fn test_rejects_unsorted_input() {
        let mut indexer = Indexer::new(IndexOptions::bed());
        indexer.push(position("chr1", 100, 1), vp(0, 0), vp(0, 1)).unwrap();
        let err = indexer.push(position("chr1", 50, 1), vp(0, 1), vp(0, 2)).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));

        let mut indexer = Indexer::new(IndexOptions::bed());
        indexer.push(position("chr1", 1, 1), vp(0, 0), vp(0, 1)).unwrap();
        indexer.push(position("chr2", 1, 1), vp(0, 1), vp(0, 2)).unwrap();
        assert!(indexer.push(position("chr1", 5, 1), vp(0, 2), vp(0, 3)).is_err());
    }

    #[test]
    fn test_rejects_positions_beyond_binning_range() {
        let mut indexer = Indexer::new(IndexOptions::bed());
        assert!(indexer.push(position("chr1", MAX_POSITION, 1), vp(0, 0), vp(0, 1)).is_err());
    }

    #[test]
    fn test_injected_names_keep_ids() {
        let names = ReferenceNames::from_names(["chrA", "chrB"]).unwrap();
        let mut indexer = Indexer::with_names(IndexOptions::bed(), names);
        indexer.push(position("chrB", 1, 1), vp(0, 0), vp(0, 5)).unwrap();
        let index = indexer.finish().unwrap();

        assert_eq!(index.references().len(), 2);
        assert!(index.references()[0].bins().is_empty());
        assert_eq!(index.reference_id("chrB"), Some(1));
        assert!(index.references()[1].metadata().is_some());
    }

    #[test]
    fn test_push_line_skips_headers() {
        let mut indexer = Indexer::new(IndexOptions::vcf());
        indexer.push_line("##fileformat=VCFv4.2", vp(0, 0), vp(0, 21)).unwrap();
        indexer.push_line("#CHROM\tPOS", vp(0, 21), vp(0, 32)).unwrap();
        indexer
            .push_line("chr1\t10\t.\tA\tT\t.\t.\t.", vp(0, 32), vp(0, 50))
            .unwrap();
        let index = indexer.finish().unwrap();

        assert_eq!(index.header().names.iter().collect::<Vec<_>>(), vec!["chr1"]);
        assert_eq!(index.references()[0].metadata().unwrap().start, vp(0, 32));
    }

    #[test]
    fn test_build_index_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.bed.gz");
        let data = crate::io::bgzf_blocks(&[
            "#header\nchr1\t0\t10\nchr1\t5\t20\n",
            "chr2\t100\t200\n",
        ]);
        std::fs::write(&path, data).unwrap();

        let index = build_index(&path, IndexOptions::bed()).unwrap();
        assert_eq!(index.header().names.iter().collect::<Vec<_>>(), vec!["chr1", "chr2"]);
        let chr2 = &index.references()[1];
        assert!(chr2.metadata().unwrap().start.compressed() > 0);
        assert_eq!(index.query("chr1", 0, 100).unwrap().len(), 1);
    }

    #[test]
    fn test_build_index_reports_line_and_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.bed.gz");
        let data = crate::io::bgzf_blocks(&["chr1\t0\t10\nchr1\tx\t20\n"]);
        std::fs::write(&path, data).unwrap();

        let err = build_index(&path, IndexOptions::bed()).unwrap_err();
        assert_eq!(err.path(), Some(path.as_path()));
        assert!(err.to_string().contains("line 2"), "{}", err);
    }
}
