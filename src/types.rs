use crate::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Format code bit marking 0-based (UCSC/BED style) start coordinates.
pub const ZERO_BASED_FLAG: i32 = 0x10000;

/// Column layout presets recorded in the low bits of the format code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Preset {
    #[default]
    Generic,
    Sam,
    Vcf,
}

impl Preset {
    pub fn code(&self) -> i32 {
        match self {
            Preset::Generic => 0,
            Preset::Sam => 1,
            Preset::Vcf => 2,
        }
    }

    pub fn from_code(code: i32) -> Result<Self> {
        match code {
            0 => Ok(Preset::Generic),
            1 => Ok(Preset::Sam),
            2 => Ok(Preset::Vcf),
            _ => Err(Error::Format(format!("unknown format preset: {}", code))),
        }
    }
}

/// Column conventions of an indexed file.
///
/// Columns are 0-based here; the index header stores them 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexOptions {
    pub preset: Preset,
    pub seq_col: usize,
    pub begin_col: usize,
    pub end_col: Option<usize>,
    pub meta_char: u8,
    pub skip_lines: u32,
    pub zero_based: bool,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self::gff()
    }
}

impl IndexOptions {
    pub fn gff() -> Self {
        Self {
            preset: Preset::Generic,
            seq_col: 0,
            begin_col: 3,
            end_col: Some(4),
            meta_char: b'#',
            skip_lines: 0,
            zero_based: false,
        }
    }

    pub fn bed() -> Self {
        Self {
            preset: Preset::Generic,
            seq_col: 0,
            begin_col: 1,
            end_col: Some(2),
            meta_char: b'#',
            skip_lines: 0,
            zero_based: true,
        }
    }

    pub fn sam() -> Self {
        Self {
            preset: Preset::Sam,
            seq_col: 2,
            begin_col: 3,
            end_col: None,
            meta_char: b'@',
            skip_lines: 0,
            zero_based: false,
        }
    }

    pub fn vcf() -> Self {
        Self {
            preset: Preset::Vcf,
            seq_col: 0,
            begin_col: 1,
            end_col: None,
            meta_char: b'#',
            skip_lines: 0,
            zero_based: false,
        }
    }

    pub fn with_columns(mut self, seq_col: usize, begin_col: usize, end_col: Option<usize>) -> Self {
        self.seq_col = seq_col;
        self.begin_col = begin_col;
        self.end_col = end_col;
        self
    }

    pub fn with_meta_char(mut self, meta_char: u8) -> Self {
        self.meta_char = meta_char;
        self
    }

    pub fn with_skip_lines(mut self, skip_lines: u32) -> Self {
        self.skip_lines = skip_lines;
        self
    }

    pub fn with_zero_based(mut self, zero_based: bool) -> Self {
        self.zero_based = zero_based;
        self
    }

    pub fn format_code(&self) -> i32 {
        let mut code = self.preset.code();
        if self.zero_based {
            code |= ZERO_BASED_FLAG;
        }
        code
    }

    /// Rebuilds options from the raw header fields (1-based columns, 0 for an unused end column).
    pub fn from_header_fields(
        format: i32,
        col_seq: i32,
        col_beg: i32,
        col_end: i32,
        meta: i32,
        skip: i32,
    ) -> Result<Self> {
        let preset = Preset::from_code(format & 0xffff)?;
        let column = |value: i32, name: &str| -> Result<usize> {
            usize::try_from(value - 1)
                .map_err(|_| Error::Format(format!("invalid {} column: {}", name, value)))
        };
        let end_col = if col_end <= 0 || col_end == col_beg {
            None
        } else {
            Some(column(col_end, "end")?)
        };
        let skip_lines = u32::try_from(skip)
            .map_err(|_| Error::Format(format!("invalid skip line count: {}", skip)))?;

        Ok(Self {
            preset,
            seq_col: column(col_seq, "sequence")?,
            begin_col: column(col_beg, "begin")?,
            end_col,
            meta_char: meta as u8,
            skip_lines,
            zero_based: format & ZERO_BASED_FLAG != 0,
        })
    }
}

/// A genomic region in 0-based half-open coordinates.
///
/// A missing start means the beginning of the sequence, a missing end its end.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Region {
    pub reference_name: String,
    pub start: Option<u64>,
    pub end: Option<u64>,
}

impl Region {
    pub fn new(reference_name: impl Into<String>, start: u64, end: u64) -> Self {
        Self {
            reference_name: reference_name.into(),
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn whole(reference_name: impl Into<String>) -> Self {
        Self {
            reference_name: reference_name.into(),
            start: None,
            end: None,
        }
    }

    pub fn begin(&self) -> u64 {
        self.start.unwrap_or(0)
    }

    /// End coordinate, `u64::MAX` when unbounded.
    pub fn end_or_max(&self) -> u64 {
        self.end.unwrap_or(u64::MAX)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reference_name)?;
        match (self.start, self.end) {
            (None, None) => Ok(()),
            (start, None) => write!(f, ":{}", start.unwrap_or(0) + 1),
            (start, Some(end)) => write!(f, ":{}-{}", start.unwrap_or(0) + 1, end),
        }
    }
}

impl FromStr for Region {
    type Err = Error;

    /// Parses `name`, `name:start` or `name:start-end` with 1-based inclusive coordinates.
    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(Error::InvalidRange("empty region".to_string()));
        }

        let Some((name, interval)) = s.rsplit_once(':') else {
            return Ok(Region::whole(s));
        };

        let parse = |value: &str| -> Option<u64> { value.replace(',', "").parse().ok() };

        let (start, end) = match interval.split_once('-') {
            Some((start, "")) => (parse(start), None),
            Some((start, end)) => match (parse(start), parse(end)) {
                (Some(start), Some(end)) => (Some(start), Some(end)),
                // not a coordinate suffix, the colon belongs to the name
                _ => return Ok(Region::whole(s)),
            },
            None => (parse(interval), None),
        };

        let Some(start) = start else {
            return Ok(Region::whole(s));
        };

        let start = start.saturating_sub(1);
        if let Some(end) = end {
            if end < start {
                return Err(Error::InvalidRange(format!(
                    "start ({}) is greater than end ({}) in {}",
                    start + 1,
                    end,
                    s
                )));
            }
        }

        Ok(Region {
            reference_name: name.to_string(),
            start: Some(start),
            end,
        })
    }
}
