use super::ReferenceNames;
use crate::types::IndexOptions;
use crate::{Error, Result};
use bytes::{Buf, BufMut};

/// Index magic: "TBI\1"
pub const MAGIC: &[u8; 4] = b"TBI\x01";

/// Size of the fixed header prefix preceding the name table.
pub const FIXED_HEADER_LEN: usize = 36;

/// Index header: column conventions plus the reference name table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub options: IndexOptions,
    pub names: ReferenceNames,
}

impl Header {
    pub fn new(options: IndexOptions, names: ReferenceNames) -> Self {
        Self { options, names }
    }

    pub fn encode<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        let options = &self.options;
        let packed = self.names.to_packed();

        let to_i32 = |value: usize, what: &str| {
            i32::try_from(value)
                .map_err(|_| Error::InvalidInput(format!("{} out of range: {}", what, value)))
        };

        buf.put_slice(MAGIC);
        buf.put_i32_le(to_i32(self.names.len(), "reference count")?);
        buf.put_i32_le(options.format_code());
        buf.put_i32_le(to_i32(options.seq_col + 1, "sequence column")?);
        buf.put_i32_le(to_i32(options.begin_col + 1, "begin column")?);
        buf.put_i32_le(match options.end_col {
            Some(col) => to_i32(col + 1, "end column")?,
            None => 0,
        });
        buf.put_i32_le(i32::from(options.meta_char));
        buf.put_i32_le(to_i32(options.skip_lines as usize, "skip line count")?);
        buf.put_i32_le(to_i32(packed.len(), "name table length")?);
        buf.put_slice(&packed);

        Ok(())
    }

    /// Decodes a header, advancing `buf` past it.
    pub fn decode(buf: &mut &[u8]) -> Result<Self> {
        if buf.remaining() < FIXED_HEADER_LEN {
            return Err(Error::Format(format!(
                "truncated header: {} bytes, expected at least {}",
                buf.remaining(),
                FIXED_HEADER_LEN
            )));
        }

        let mut magic = [0u8; 4];
        buf.copy_to_slice(&mut magic);
        if &magic != MAGIC {
            return Err(Error::Format(format!(
                "invalid magic: expected {:?}, got {:?}",
                MAGIC, magic
            )));
        }

        let n_ref = buf.get_i32_le();
        let format = buf.get_i32_le();
        let col_seq = buf.get_i32_le();
        let col_beg = buf.get_i32_le();
        let col_end = buf.get_i32_le();
        let meta = buf.get_i32_le();
        let skip = buf.get_i32_le();
        let l_nm = buf.get_i32_le();

        let l_nm = usize::try_from(l_nm)
            .map_err(|_| Error::Format(format!("invalid name table length: {}", l_nm)))?;
        if l_nm > buf.remaining() {
            return Err(Error::Format(format!(
                "truncated name table: {} bytes declared, {} available",
                l_nm,
                buf.remaining()
            )));
        }

        let names = ReferenceNames::from_packed(&(*buf)[..l_nm])?;
        buf.advance(l_nm);

        if names.len() as i64 != i64::from(n_ref) {
            return Err(Error::Format(format!(
                "header declares {} references but the name table has {}",
                n_ref,
                names.len()
            )));
        }

        let options = IndexOptions::from_header_fields(format, col_seq, col_beg, col_end, meta, skip)?;

        Ok(Self { options, names })
    }
}

/// Whether the second file continues the last sequence of the first.
pub fn shares_boundary(a: &Header, b: &Header) -> bool {
    matches!((a.names.last(), b.names.first()), (Some(last), Some(first)) if last == first)
}

/// Merges the headers of two files concatenated in order.
///
/// A sequence ending `a` and starting `b` appears once. Column conventions
/// are taken from `a`. Any other name found in both is `InvalidInput`.
pub fn merge_headers(a: &Header, b: &Header) -> Result<Header> {
    let skip = usize::from(shares_boundary(a, b));

    let mut names = a.names.clone();
    for name in b.names.iter().skip(skip) {
        if names.get(name).is_some() {
            return Err(Error::InvalidInput(format!(
                "sequence {} appears in more than one input and not at their boundary",
                name
            )));
        }
        names.get_or_insert(name);
    }

    Ok(Header {
        options: a.options.clone(),
        names,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(names: &[&str]) -> Header {
        Header::new(
            IndexOptions::vcf(),
            ReferenceNames::from_names(names.iter().copied()).unwrap(),
        )
    }

    fn encoded(header: &Header) -> Vec<u8> {
        let mut buf = Vec::new();
        header.encode(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_encode_layout() {
        let buf = encoded(&header(&["chr1", "chr2"]));
        assert_eq!(&buf[..4], &[0x54, 0x42, 0x49, 0x01]);
        assert_eq!(buf.len(), FIXED_HEADER_LEN + 10);
        // n_ref, format, col_seq, col_beg, col_end, meta, skip, l_nm
        let fields: Vec<i32> = buf[4..36]
            .chunks(4)
            .map(|c| i32::from_le_bytes(c.try_into().unwrap()))
            .collect();
        assert_eq!(fields, vec![2, 2, 1, 2, 0, 35, 0, 10]);
        assert_eq!(&buf[36..], b"chr1\0chr2\0");
    }

    #[test]
    fn test_roundtrip_all_presets() {
        for options in [
            IndexOptions::gff(),
            IndexOptions::bed(),
            IndexOptions::sam(),
            IndexOptions::vcf().with_skip_lines(3).with_meta_char(b'!'),
            IndexOptions::gff().with_columns(4, 6, Some(9)),
        ] {
            let header = Header::new(
                options,
                ReferenceNames::from_names(["1", "2", "X", "MT"]).unwrap(),
            );
            let buf = encoded(&header);
            let mut slice = &buf[..];
            assert_eq!(Header::decode(&mut slice).unwrap(), header);
            assert!(slice.is_empty());
        }
    }

    #[test]
    fn test_decode_leaves_trailing_bytes() {
        let mut buf = encoded(&header(&["chr1"]));
        buf.extend_from_slice(&[1, 2, 3]);
        let mut slice = &buf[..];
        Header::decode(&mut slice).unwrap();
        assert_eq!(slice, &[1, 2, 3]);
    }

    #[test]
    fn test_decode_truncated_prefix() {
        let buf = encoded(&header(&["chr1"]));
        let err = Header::decode(&mut &buf[..35]).unwrap_err();
        assert!(err.is_format());
    }

    #[test]
    fn test_decode_bad_magic() {
        let mut buf = encoded(&header(&["chr1"]));
        buf[3] = 2;
        let err = Header::decode(&mut &buf[..]).unwrap_err();
        assert!(err.to_string().contains("magic"));
    }

    #[test]
    fn test_decode_truncated_name_table() {
        let buf = encoded(&header(&["chr1", "chr2"]));
        let err = Header::decode(&mut &buf[..buf.len() - 1]).unwrap_err();
        assert!(err.to_string().contains("truncated name table"));
    }

    #[test]
    fn test_merge_collapses_shared_boundary() {
        let merged = merge_headers(&header(&["seq1", "seq2"]), &header(&["seq2", "seq3"])).unwrap();
        assert_eq!(merged.names.iter().collect::<Vec<_>>(), vec!["seq1", "seq2", "seq3"]);
    }

    #[test]
    fn test_merge_disjoint() {
        let a = header(&["seq1", "seq2"]);
        let b = header(&["seq3"]);
        assert!(!shares_boundary(&a, &b));
        let merged = merge_headers(&a, &b).unwrap();
        assert_eq!(merged.names.len(), 3);
        assert_eq!(merged.options, a.options);
    }

    #[test]
    fn test_merge_rejects_name_repeated_off_boundary() {
        let err = merge_headers(&header(&["seq1", "seq2"]), &header(&["seq1", "seq3"])).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(ref msg) if msg.contains("seq1")), "{}", err);

        // the boundary sequence may appear once more, but not again after it
        assert!(merge_headers(&header(&["seq1", "seq2"]), &header(&["seq2", "seq1"])).is_err());
    }
}
