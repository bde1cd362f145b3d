use super::{Fields, LinePosition, PositionExtractor, normalize_start, parse_coordinate, required};
use crate::Result;

const CHROM_COL: usize = 0;
const POS_COL: usize = 1;
const REF_COL: usize = 3;
const INFO_COL: usize = 7;

/// Extractor for VCF lines.
///
/// The span is the length of REF unless INFO carries an `END` key, as
/// symbolic alleles such as `<DEL>` do.
#[derive(Debug, Clone, Copy, Default)]
pub struct VcfExtractor;

impl PositionExtractor for VcfExtractor {
    fn extract<'a>(&self, line: &'a str) -> Result<Option<LinePosition<'a>>> {
        let mut fields = Fields::new(line);

        let reference_name = required(&mut fields, CHROM_COL, "CHROM")?;
        let pos = parse_coordinate(required(&mut fields, POS_COL, "POS")?, "POS")?;
        let start = normalize_start(pos, false);

        let reference_bases = required(&mut fields, REF_COL, "REF")?;
        let mut span = (reference_bases.len() as u64).max(1);

        if let Some(end) = fields.get(INFO_COL).and_then(info_end) {
            if end > start {
                span = end - start;
            }
        }

        Ok(Some(LinePosition {
            reference_name,
            start,
            span,
            mapped: true,
        }))
    }
}

/// Value of the `END` key in an INFO column, if present and numeric.
fn info_end(info: &str) -> Option<u64> {
    info.split(';')
        .find_map(|entry| entry.strip_prefix("END="))
        .and_then(|value| value.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_from_ref() {
        let line = "chr1\t1000\trs1\tACG\tA\t50\tPASS\tDP=10";
        let pos = VcfExtractor.extract(line).unwrap().unwrap();
        assert_eq!((pos.reference_name, pos.start, pos.span), ("chr1", 999, 3));
    }

    #[test]
    fn test_span_from_info_end() {
        let line = "chr1\t1000\t.\tN\t<DEL>\t.\tPASS\tSVTYPE=DEL;END=2000;SVLEN=-1000";
        let pos = VcfExtractor.extract(line).unwrap().unwrap();
        assert_eq!(pos.start, 999);
        assert_eq!(pos.span, 1001);
    }

    #[test]
    fn test_info_end_ignores_similar_keys() {
        assert_eq!(info_end("BLEND=5;DP=3"), None);
        assert_eq!(info_end("DP=3;END=77"), Some(77));
    }

    #[test]
    fn test_sites_only_line_without_info() {
        let line = "chr2\t1\t.\tA\tT";
        let pos = VcfExtractor.extract(line).unwrap().unwrap();
        assert_eq!((pos.start, pos.span), (0, 1));
    }

    #[test]
    fn test_missing_ref_is_an_error() {
        assert!(VcfExtractor.extract("chr1\t5").is_err());
    }
}
