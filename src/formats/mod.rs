//! Per-format extraction of reference name and coordinates from text lines.
//!
//! # Supported Layouts
//!
//! - [`GenericExtractor`] - configurable sequence/begin/end columns (GFF, BED, ...)
//! - [`SamExtractor`] - SAM alignment lines, span taken from the CIGAR string
//! - [`VcfExtractor`] - VCF lines, span taken from REF or `END=` in INFO
//!
//! Extractors are stateless; the reference name table is owned by whoever
//! assigns ids (see [`crate::index::Indexer`]).

mod fields;
mod generic;
mod sam;
mod vcf;

pub use fields::Fields;
pub use generic::GenericExtractor;
pub use sam::{SamExtractor, cigar_reference_length};
pub use vcf::VcfExtractor;

use crate::types::{IndexOptions, Preset};
use crate::{Error, Result};

/// Reference name and 0-based coordinates of one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinePosition<'a> {
    pub reference_name: &'a str,
    pub start: u64,
    pub span: u64,
    /// False for records placed on a reference but flagged unmapped.
    pub mapped: bool,
}

impl LinePosition<'_> {
    /// Exclusive 0-based end coordinate.
    pub fn end(&self) -> u64 {
        self.start.saturating_add(self.span)
    }
}

pub trait PositionExtractor {
    /// Extracts the position of a data line, or `None` for records that have
    /// no reference placement.
    fn extract<'a>(&self, line: &'a str) -> Result<Option<LinePosition<'a>>>;
}

/// Extractor selected from the index options.
#[derive(Debug, Clone)]
pub enum Extractor {
    Generic(GenericExtractor),
    Sam(SamExtractor),
    Vcf(VcfExtractor),
}

impl Extractor {
    pub fn new(options: &IndexOptions) -> Self {
        match options.preset {
            Preset::Generic => Extractor::Generic(GenericExtractor::new(options)),
            Preset::Sam => Extractor::Sam(SamExtractor),
            Preset::Vcf => Extractor::Vcf(VcfExtractor),
        }
    }
}

impl PositionExtractor for Extractor {
    fn extract<'a>(&self, line: &'a str) -> Result<Option<LinePosition<'a>>> {
        match self {
            Extractor::Generic(extractor) => extractor.extract(line),
            Extractor::Sam(extractor) => extractor.extract(line),
            Extractor::Vcf(extractor) => extractor.extract(line),
        }
    }
}

/// Tells header lines apart from data lines.
#[derive(Debug, Clone)]
pub struct HeaderFilter {
    meta_char: u8,
    skip_lines: u64,
    seen: u64,
}

impl HeaderFilter {
    pub fn new(options: &IndexOptions) -> Self {
        Self {
            meta_char: options.meta_char,
            skip_lines: u64::from(options.skip_lines),
            seen: 0,
        }
    }

    /// Whether the next line from the start of the file is a header line.
    /// Must see every line in file order.
    pub fn is_header(&mut self, line: &str) -> bool {
        self.seen += 1;
        self.seen <= self.skip_lines || self.is_meta(line)
    }

    /// Whether a line read after an arbitrary seek is a header line.
    pub fn is_meta(&self, line: &str) -> bool {
        line.is_empty() || line.as_bytes()[0] == self.meta_char
    }
}

pub(crate) fn required<'a>(fields: &mut Fields<'a>, col: usize, what: &str) -> Result<&'a str> {
    fields.get(col).ok_or_else(|| {
        Error::InvalidInput(format!("missing {} column (column {})", what, col + 1))
    })
}

pub(crate) fn parse_coordinate(value: &str, what: &str) -> Result<i64> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::InvalidInput(format!("invalid {} coordinate: {:?}", what, value)))
}

/// Converts a parsed start to 0-based, clamping negatives to 0.
pub(crate) fn normalize_start(value: i64, zero_based: bool) -> u64 {
    let start = if zero_based { value } else { value - 1 };
    start.max(0) as u64
}
