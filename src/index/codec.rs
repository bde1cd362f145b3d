use super::binning::META_BIN;
use super::{Bin, Chunk, Header, Index, Metadata, ReferenceIndex};
use crate::{Error, Result};
use bytes::{Buf, BufMut};
use noodles::bgzf::{self, VirtualPosition};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

impl Index {
    /// Serializes the index to its uncompressed binary form.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.header().encode(&mut buf)?;

        for reference in self.references() {
            encode_reference(&mut buf, reference)?;
        }

        if let Some(unplaced) = self.unplaced() {
            buf.put_u64_le(unplaced);
        }

        Ok(buf)
    }

    /// Parses an uncompressed binary index.
    pub fn decode(src: &[u8]) -> Result<Self> {
        let mut buf = src;
        let header = Header::decode(&mut buf)?;

        let references = (0..header.names.len())
            .map(|id| {
                decode_reference(&mut buf).map_err(|e| match e {
                    Error::Format(msg) => Error::Format(format!(
                        "reference {} ({}): {}",
                        id,
                        header.names.name(id).unwrap_or_default(),
                        msg
                    )),
                    e => e,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let unplaced = match buf.remaining() {
            0 => None,
            8 => Some(buf.get_u64_le()),
            n => {
                return Err(Error::Format(format!(
                    "{} unexpected trailing bytes after index data",
                    n
                )));
            }
        };

        Ok(Index::new(header, references, unplaced))
    }
}

fn count_to_i32(count: usize, what: &str) -> Result<i32> {
    i32::try_from(count).map_err(|_| Error::InvalidInput(format!("too many {}: {}", what, count)))
}

fn encode_reference(buf: &mut Vec<u8>, reference: &ReferenceIndex) -> Result<()> {
    buf.put_i32_le(count_to_i32(reference.bins().len(), "bins")?);

    for (&bin, contents) in reference.bins() {
        buf.put_u32_le(bin);
        match contents {
            Bin::Chunks(chunks) => {
                buf.put_i32_le(count_to_i32(chunks.len(), "chunks")?);
                for chunk in chunks {
                    buf.put_u64_le(u64::from(chunk.start()));
                    buf.put_u64_le(u64::from(chunk.end()));
                }
            }
            Bin::Metadata(metadata) => {
                buf.put_i32_le(2);
                buf.put_u64_le(u64::from(metadata.start));
                buf.put_u64_le(u64::from(metadata.end));
                buf.put_u64_le(metadata.mapped);
                buf.put_u64_le(metadata.unmapped);
            }
        }
    }

    let linear = reference.linear_index();
    buf.put_i32_le(count_to_i32(linear.len(), "linear index entries")?);
    for &pos in linear {
        buf.put_u64_le(u64::from(pos));
    }

    Ok(())
}

fn ensure(buf: &[u8], len: usize, what: &str) -> Result<()> {
    if buf.remaining() < len {
        return Err(Error::Format(format!(
            "truncated {}: need {} bytes, {} available",
            what,
            len,
            buf.remaining()
        )));
    }
    Ok(())
}

fn read_count(buf: &mut &[u8], what: &str) -> Result<usize> {
    ensure(buf, 4, what)?;
    let n = buf.get_i32_le();
    usize::try_from(n).map_err(|_| Error::Format(format!("negative {}: {}", what, n)))
}

fn read_position(buf: &mut &[u8]) -> VirtualPosition {
    VirtualPosition::from(buf.get_u64_le())
}

fn decode_reference(buf: &mut &[u8]) -> Result<ReferenceIndex> {
    let mut reference = ReferenceIndex::new();

    let n_bin = read_count(buf, "bin count")?;
    for _ in 0..n_bin {
        ensure(buf, 8, "bin header")?;
        let bin = buf.get_u32_le();
        let n_chunk = usize::try_from(buf.get_i32_le())
            .map_err(|_| Error::Format(format!("negative chunk count in bin {}", bin)))?;
        ensure(buf, n_chunk.saturating_mul(16), "chunk list")?;

        let contents = if bin == META_BIN {
            if n_chunk != 2 {
                return Err(Error::Format(format!(
                    "metadata pseudo-bin has {} chunks, expected 2",
                    n_chunk
                )));
            }
            Bin::Metadata(Metadata {
                start: read_position(buf),
                end: read_position(buf),
                mapped: buf.get_u64_le(),
                unmapped: buf.get_u64_le(),
            })
        } else {
            Bin::Chunks(
                (0..n_chunk)
                    .map(|_| {
                        let start = read_position(buf);
                        let end = read_position(buf);
                        Chunk::new(start, end)
                    })
                    .collect(),
            )
        };

        if reference.bins().contains_key(&bin) {
            return Err(Error::Format(format!("duplicate bin {}", bin)));
        }
        reference.insert_bin(bin, contents);
    }

    let n_intv = read_count(buf, "linear index size")?;
    ensure(buf, n_intv.saturating_mul(8), "linear index")?;
    let linear = reference.linear_mut();
    linear.reserve(n_intv);
    for _ in 0..n_intv {
        linear.push(read_position(buf));
    }

    Ok(reference)
}

/// Writes an index to `path` inside a BGZF container.
pub fn write_index<P: AsRef<Path>>(path: P, index: &Index) -> Result<()> {
    let path = path.as_ref();

    let write = || -> Result<()> {
        let data = index.encode()?;
        let mut writer = bgzf::Writer::new(File::create(path)?);
        writer.write_all(&data)?;
        writer.finish()?;
        Ok(())
    };

    write().map_err(Error::in_file(path))
}

/// Reads an index from `path`, BGZF-compressed or raw.
pub fn read_index<P: AsRef<Path>>(path: P) -> Result<Index> {
    let path = path.as_ref();

    let read = || -> Result<Index> {
        let raw = std::fs::read(path)?;

        if raw.starts_with(&GZIP_MAGIC) {
            let mut data = Vec::new();
            bgzf::Reader::new(&raw[..]).read_to_end(&mut data)?;
            Index::decode(&data)
        } else {
            Index::decode(&raw)
        }
    };

    read().map_err(Error::in_file(path))
}
