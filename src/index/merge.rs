use super::codec::{read_index, write_index};
use super::header::{merge_headers, shares_boundary};
use super::{Bin, Index, Metadata, ReferenceIndex, shift};
use crate::{Error, Result};
use std::path::Path;

/// Merges the indices of files that will be concatenated in the given order.
///
/// Each input pairs an index with the byte size of its data file. Offsets
/// contributed by input `i` move by the total size of the inputs before it;
/// record counters are left alone. A sequence that ends one input and starts
/// the next is merged into a single entry.
pub fn merge_indices(inputs: &[(Index, u64)]) -> Result<Index> {
    let Some(((first, first_size), rest)) = inputs.split_first() else {
        return Err(Error::InvalidInput("no indices to merge".to_string()));
    };

    let mut header = first.header().clone();
    let mut references = first.references().to_vec();
    let mut unplaced = first.unplaced();
    let mut offset = *first_size;

    for (index, size) in rest {
        let next = index.header();
        if next.options != header.options {
            tracing::warn!(
                "Merging indices with different column conventions; keeping those of the first input"
            );
        }

        let shared = shares_boundary(&header, next);
        let merged = merge_headers(&header, next)?;

        for (i, reference) in index.references().iter().enumerate() {
            let reference = shift_reference(reference, offset);
            match references.last_mut() {
                Some(last) if i == 0 && shared => append_reference(last, reference),
                _ => references.push(reference),
            }
        }

        unplaced = match (unplaced, index.unplaced()) {
            (Some(a), Some(b)) => Some(a + b),
            (a, b) => a.or(b),
        };
        header = merged;
        offset += size;
    }

    tracing::debug!(
        "Merged {} indices into {} sequences",
        inputs.len(),
        references.len()
    );

    Ok(Index::new(header, references, unplaced))
}

/// Copy of `reference` with every virtual position moved `bytes` further.
fn shift_reference(reference: &ReferenceIndex, bytes: u64) -> ReferenceIndex {
    let mut shifted = reference.clone();
    if bytes == 0 {
        return shifted;
    }

    for contents in shifted.bins_mut().values_mut() {
        match contents {
            Bin::Chunks(chunks) => {
                for chunk in chunks.iter_mut() {
                    *chunk = chunk.shifted(bytes);
                }
            }
            Bin::Metadata(metadata) => {
                metadata.start = shift(metadata.start, bytes);
                metadata.end = shift(metadata.end, bytes);
            }
        }
    }

    for pos in shifted.linear_mut() {
        *pos = shift(*pos, bytes);
    }

    shifted
}

/// Appends the later part of a sequence split across two inputs.
fn append_reference(earlier: &mut ReferenceIndex, later: ReferenceIndex) {
    let ReferenceIndex { bins, linear } = later;

    for (bin, contents) in bins {
        let merged = match (earlier.bins_mut().remove(&bin), contents) {
            (Some(Bin::Chunks(mut chunks)), Bin::Chunks(more)) => {
                chunks.extend(more);
                Bin::Chunks(chunks)
            }
            (Some(Bin::Metadata(a)), Bin::Metadata(b)) => Bin::Metadata(Metadata {
                start: a.start,
                end: b.end,
                mapped: a.mapped + b.mapped,
                unmapped: a.unmapped + b.unmapped,
            }),
            (_, contents) => contents,
        };
        earlier.insert_bin(bin, merged);
    }

    let covered = earlier.linear_index().len();
    earlier.linear_mut().extend(linear.into_iter().skip(covered));
}

/// Merges on-disk indices of data files concatenated in the given order and
/// writes the result to `output`.
///
/// Each input pairs an index path with its data file, whose size sets the
/// offset shift for the inputs after it.
pub fn merge_index_files<P, Q, R>(inputs: &[(P, Q)], output: R) -> Result<Index>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
    R: AsRef<Path>,
{
    let loaded = inputs
        .iter()
        .map(|(index_path, data_path)| {
            let index = read_index(index_path)?;
            let size = std::fs::metadata(data_path.as_ref())
                .map_err(|e| Error::in_file(data_path.as_ref())(e.into()))?
                .len();
            Ok((index, size))
        })
        .collect::<Result<Vec<_>>>()?;

    let merged = merge_indices(&loaded)?;
    write_index(output.as_ref(), &merged)?;

    tracing::info!(
        "Wrote merged index of {} files to {:?}",
        inputs.len(),
        output.as_ref()
    );

    Ok(merged)
}
