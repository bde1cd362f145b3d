use super::{Fields, LinePosition, PositionExtractor, normalize_start, parse_coordinate, required};
use crate::Result;
use crate::types::IndexOptions;

/// Extractor for files with configurable sequence/begin/end columns.
#[derive(Debug, Clone)]
pub struct GenericExtractor {
    seq_col: usize,
    begin_col: usize,
    end_col: Option<usize>,
    zero_based: bool,
}

impl GenericExtractor {
    pub fn new(options: &IndexOptions) -> Self {
        Self {
            seq_col: options.seq_col,
            begin_col: options.begin_col,
            // an end column equal to the begin column marks point records
            end_col: options.end_col.filter(|&col| col != options.begin_col),
            zero_based: options.zero_based,
        }
    }
}

impl PositionExtractor for GenericExtractor {
    fn extract<'a>(&self, line: &'a str) -> Result<Option<LinePosition<'a>>> {
        let mut fields = Fields::new(line);

        let reference_name = required(&mut fields, self.seq_col, "sequence")?;
        let begin = parse_coordinate(required(&mut fields, self.begin_col, "begin")?, "begin")?;
        let start = normalize_start(begin, self.zero_based);

        // 1-based inclusive and 0-based exclusive ends share the same value
        let span = match self.end_col {
            Some(col) => {
                let end = parse_coordinate(required(&mut fields, col, "end")?, "end")?;
                (end.max(1) as u64).saturating_sub(start).max(1)
            }
            None => 1,
        };

        Ok(Some(LinePosition {
            reference_name,
            start,
            span,
            mapped: true,
        }))
    }
}
