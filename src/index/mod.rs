//! The tabix binning index.
//!
//! An [`Index`] maps each reference sequence to bins of chunks (virtual
//! position ranges in the BGZF data file) plus a linear index of minimum
//! offsets per 16 Kbp window. See [`binning`] for the bin scheme.
//!
//! # File Layout
//!
//! - Header: see [`Header`]
//! - Per reference: `n_bin`, then per bin `bin, n_chunk, (beg, end)*`,
//!   then `n_intv` linear offsets
//! - Optional trailing count of records without coordinates

pub mod binning;
mod builder;
mod codec;
mod header;
mod merge;
mod names;

pub use builder::{Indexer, build_index};
pub use codec::{read_index, write_index};
pub use header::{FIXED_HEADER_LEN, Header, MAGIC, merge_headers, shares_boundary};
pub use merge::{merge_index_files, merge_indices};
pub use names::ReferenceNames;

use binning::META_BIN;
use noodles::bgzf::VirtualPosition;
use std::collections::BTreeMap;

/// A virtual position range believed to hold records of one bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    start: VirtualPosition,
    end: VirtualPosition,
}

impl Chunk {
    pub fn new(start: VirtualPosition, end: VirtualPosition) -> Self {
        Self { start, end }
    }

    pub fn start(&self) -> VirtualPosition {
        self.start
    }

    pub fn end(&self) -> VirtualPosition {
        self.end
    }

    /// Moves the chunk `bytes` compressed bytes further into the file.
    pub fn shifted(self, bytes: u64) -> Self {
        Self {
            start: shift(self.start, bytes),
            end: shift(self.end, bytes),
        }
    }
}

/// Moves a virtual position `bytes` compressed bytes further into the file.
pub fn shift(pos: VirtualPosition, bytes: u64) -> VirtualPosition {
    VirtualPosition::from(u64::from(pos) + (bytes << 16))
}

/// Per-reference summary stored in the meta pseudo-bin.
///
/// `start`/`end` are virtual positions; `mapped`/`unmapped` are plain
/// counters and are never shifted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metadata {
    pub start: VirtualPosition,
    pub end: VirtualPosition,
    pub mapped: u64,
    pub unmapped: u64,
}

/// Contents of one bin number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bin {
    Chunks(Vec<Chunk>),
    Metadata(Metadata),
}

/// Bins and linear index of one reference sequence.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReferenceIndex {
    bins: BTreeMap<u32, Bin>,
    linear: Vec<VirtualPosition>,
}

impl ReferenceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bins(&self) -> &BTreeMap<u32, Bin> {
        &self.bins
    }

    pub fn linear_index(&self) -> &[VirtualPosition] {
        &self.linear
    }

    pub fn chunks(&self, bin: u32) -> &[Chunk] {
        match self.bins.get(&bin) {
            Some(Bin::Chunks(chunks)) => chunks,
            _ => &[],
        }
    }

    pub fn metadata(&self) -> Option<&Metadata> {
        match self.bins.get(&META_BIN) {
            Some(Bin::Metadata(metadata)) => Some(metadata),
            _ => None,
        }
    }

    /// Appends a chunk to `bin`, extending the last chunk when they abut.
    pub fn push_chunk(&mut self, bin: u32, chunk: Chunk) {
        debug_assert_ne!(bin, META_BIN);
        match self.bins.entry(bin).or_insert_with(|| Bin::Chunks(Vec::new())) {
            Bin::Chunks(chunks) => match chunks.last_mut() {
                Some(last) if last.end == chunk.start => last.end = chunk.end,
                _ => chunks.push(chunk),
            },
            Bin::Metadata(_) => unreachable!("meta bin only holds metadata"),
        }
    }

    pub fn set_metadata(&mut self, metadata: Metadata) {
        self.bins.insert(META_BIN, Bin::Metadata(metadata));
    }

    pub(crate) fn insert_bin(&mut self, bin: u32, contents: Bin) {
        self.bins.insert(bin, contents);
    }

    pub(crate) fn bins_mut(&mut self) -> &mut BTreeMap<u32, Bin> {
        &mut self.bins
    }

    pub(crate) fn linear_mut(&mut self) -> &mut Vec<VirtualPosition> {
        &mut self.linear
    }

    /// Smallest virtual position of any record overlapping the window of `start`.
    pub fn min_offset(&self, start: u64) -> VirtualPosition {
        let window = binning::window(start);
        match self.linear.get(window).or(self.linear.last()) {
            Some(&pos) => pos,
            None => VirtualPosition::from(0),
        }
    }

    /// Chunks that may hold records overlapping `[start, end)`, pruned by
    /// the linear index, sorted and merged.
    pub fn query(&self, start: u64, end: u64) -> Vec<Chunk> {
        let min_offset = self.min_offset(start);

        let mut chunks: Vec<Chunk> = binning::reg2bins(start, end)
            .into_iter()
            .flat_map(|bin| self.chunks(bin).iter().copied())
            .filter(|chunk| chunk.end > min_offset)
            .collect();

        chunks.sort_by_key(|chunk| chunk.start);
        merge_chunks(&chunks)
    }
}

/// Merges overlapping or adjacent chunks of a list sorted by start.
pub fn merge_chunks(chunks: &[Chunk]) -> Vec<Chunk> {
    let mut merged: Vec<Chunk> = Vec::with_capacity(chunks.len());

    for chunk in chunks {
        match merged.last_mut() {
            Some(current) if chunk.start <= current.end => {
                if chunk.end > current.end {
                    current.end = chunk.end;
                }
            }
            _ => merged.push(*chunk),
        }
    }

    merged
}

/// A complete tabix index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Index {
    header: Header,
    references: Vec<ReferenceIndex>,
    unplaced: Option<u64>,
}

impl Index {
    pub fn new(header: Header, references: Vec<ReferenceIndex>, unplaced: Option<u64>) -> Self {
        Self {
            header,
            references,
            unplaced,
        }
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn references(&self) -> &[ReferenceIndex] {
        &self.references
    }

    /// Count of records without coordinates, when recorded.
    pub fn unplaced(&self) -> Option<u64> {
        self.unplaced
    }

    pub fn reference_id(&self, name: &str) -> Option<usize> {
        self.header.names.get(name)
    }

    pub fn reference(&self, name: &str) -> Option<&ReferenceIndex> {
        self.reference_id(name).and_then(|id| self.references.get(id))
    }

    /// Chunks for `[start, end)` on `name`, or `None` for an unknown reference.
    pub fn query(&self, name: &str, start: u64, end: u64) -> Option<Vec<Chunk>> {
        self.reference(name).map(|reference| reference.query(start, end))
    }

    pub(crate) fn into_parts(self) -> (Header, Vec<ReferenceIndex>, Option<u64>) {
        (self.header, self.references, self.unplaced)
    }
}
