use super::{Fields, LinePosition, PositionExtractor, normalize_start, parse_coordinate, required};
use crate::{Error, Result};

const FLAG_COL: usize = 1;
const RNAME_COL: usize = 2;
const POS_COL: usize = 3;
const CIGAR_COL: usize = 5;

const UNMAPPED: u16 = 0x4;

/// Extractor for SAM alignment lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct SamExtractor;

impl PositionExtractor for SamExtractor {
    fn extract<'a>(&self, line: &'a str) -> Result<Option<LinePosition<'a>>> {
        let mut fields = Fields::new(line);

        let reference_name = required(&mut fields, RNAME_COL, "RNAME")?;
        if reference_name == "*" {
            return Ok(None);
        }

        let flag = required(&mut fields, FLAG_COL, "FLAG")?;
        let flag: u16 = flag
            .parse()
            .map_err(|_| Error::InvalidInput(format!("invalid FLAG: {:?}", flag)))?;

        let pos = parse_coordinate(required(&mut fields, POS_COL, "POS")?, "POS")?;
        let span = cigar_reference_length(required(&mut fields, CIGAR_COL, "CIGAR")?)?.max(1);

        Ok(Some(LinePosition {
            reference_name,
            start: normalize_start(pos, false),
            span,
            mapped: flag & UNMAPPED == 0,
        }))
    }
}

/// Number of reference bases covered by a CIGAR string (`*` covers none).
pub fn cigar_reference_length(cigar: &str) -> Result<u64> {
    if cigar == "*" {
        return Ok(0);
    }

    let invalid = || Error::InvalidInput(format!("invalid CIGAR: {:?}", cigar));

    let mut total = 0u64;
    let mut len: Option<u64> = None;

    for c in cigar.chars() {
        if let Some(digit) = c.to_digit(10) {
            len = len
                .unwrap_or(0)
                .checked_mul(10)
                .and_then(|n| n.checked_add(u64::from(digit)));
            if len.is_none() {
                return Err(invalid());
            }
            continue;
        }

        let n = len.take().ok_or_else(invalid)?;
        match c {
            'M' | 'D' | 'N' | '=' | 'X' => total = total.checked_add(n).ok_or_else(invalid)?,
            'I' | 'S' | 'H' | 'P' => {}
            _ => return Err(invalid()),
        }
    }

    if len.is_some() {
        return Err(invalid());
    }

    Ok(total)
}
