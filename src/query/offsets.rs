use crate::index::{Chunk, Index};
use crate::types::Region;
use noodles::bgzf::VirtualPosition;
use std::cmp::Ordering;

/// One virtual position range to scan, with the region it serves.
///
/// `region` is `None` only for whole-file scans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetRange {
    pub begin: VirtualPosition,
    pub end: VirtualPosition,
    pub region: Option<Region>,
}

/// Ranges resolved from one or more regions.
#[derive(Debug, Clone, Default)]
pub struct VirtualOffsetSet {
    entries: Vec<OffsetRange>,
}

impl VirtualOffsetSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves each region against the index, one range per chunk.
    ///
    /// Regions on sequences the index does not know contribute nothing.
    pub fn from_regions(index: &Index, regions: &[Region]) -> Self {
        let mut set = Self::new();

        for region in regions {
            match resolve(index, region) {
                Some(chunks) => {
                    for chunk in chunks {
                        set.push(chunk.start(), chunk.end(), Some(region.clone()));
                    }
                }
                None => tracing::debug!("No index entry for {}", region.reference_name),
            }
        }

        set
    }

    pub fn push(&mut self, begin: VirtualPosition, end: VirtualPosition, region: Option<Region>) {
        self.entries.push(OffsetRange { begin, end, region });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OffsetRange> {
        self.entries.iter()
    }

    /// Orders entries by begin offset, breaking ties by region.
    ///
    /// For equal begins, regions on the same sequence come in ascending start
    /// order and regions on different sequences in descending start order, so
    /// the tail of one sequence is visited before the head of the next.
    /// Entries without a region keep their relative position.
    pub fn sort(&mut self) {
        self.entries.sort_by_key(|entry| entry.begin);

        // The tie-break is not a total order, so it is applied as a stable
        // insertion sort within each run of equal begins.
        let mut run_start = 0;
        while run_start < self.entries.len() {
            let begin = self.entries[run_start].begin;
            let run_end = self.entries[run_start..]
                .iter()
                .position(|entry| entry.begin != begin)
                .map_or(self.entries.len(), |n| run_start + n);

            let run = &mut self.entries[run_start..run_end];
            for i in 1..run.len() {
                let mut j = i;
                while j > 0 && compare_regions(&run[j - 1].region, &run[j].region) == Ordering::Greater {
                    run.swap(j - 1, j);
                    j -= 1;
                }
            }

            run_start = run_end;
        }
    }

    pub fn into_vec(self) -> Vec<OffsetRange> {
        self.entries
    }
}

impl IntoIterator for VirtualOffsetSet {
    type Item = OffsetRange;
    type IntoIter = std::vec::IntoIter<OffsetRange>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

fn compare_regions(a: &Option<Region>, b: &Option<Region>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) if a.reference_name == b.reference_name => a.begin().cmp(&b.begin()),
        (Some(a), Some(b)) => b.begin().cmp(&a.begin()),
        _ => Ordering::Equal,
    }
}

/// Chunks that may hold records of `region`, or `None` for an unknown sequence.
///
/// The lookup starts one base early since a record ending exactly at the
/// region start still counts as overlapping it.
pub(crate) fn resolve(index: &Index, region: &Region) -> Option<Vec<Chunk>> {
    index.query(
        &region.reference_name,
        region.begin().saturating_sub(1),
        region.end_or_max(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vp(raw: u64) -> VirtualPosition {
        VirtualPosition::from(raw)
    }

    fn entry_regions(set: &VirtualOffsetSet) -> Vec<(u64, String)> {
        set.iter()
            .map(|entry| {
                let label = match &entry.region {
                    Some(region) => region.to_string(),
                    None => "*".to_string(),
                };
                (u64::from(entry.begin), label)
            })
            .collect()
    }

    #[test]
    fn test_sort_by_begin() {
        let mut set = VirtualOffsetSet::new();
        set.push(vp(300), vp(400), Some(Region::new("chr1", 0, 10)));
        set.push(vp(100), vp(200), Some(Region::new("chr1", 50, 60)));
        set.sort();
        assert_eq!(
            entry_regions(&set),
            vec![(100, "chr1:51-60".to_string()), (300, "chr1:1-10".to_string())]
        );
    }

    #[test]
    fn test_tie_break_same_sequence_ascending() {
        let mut set = VirtualOffsetSet::new();
        set.push(vp(100), vp(200), Some(Region::new("chr1", 500, 600)));
        set.push(vp(100), vp(200), Some(Region::new("chr1", 0, 100)));
        set.sort();
        assert_eq!(entry_regions(&set)[0].1, "chr1:1-100");
    }

    #[test]
    fn test_tie_break_different_sequences_descending() {
        let mut set = VirtualOffsetSet::new();
        set.push(vp(100), vp(200), Some(Region::new("chr2", 0, 100)));
        set.push(vp(100), vp(200), Some(Region::new("chr1", 90_000, 100_000)));
        set.sort();
        assert_eq!(entry_regions(&set)[0].1, "chr1:90001-100000");
        assert_eq!(entry_regions(&set)[1].1, "chr2:1-100");
    }

    #[test]
    fn test_entries_without_region_keep_position() {
        let mut set = VirtualOffsetSet::new();
        set.push(vp(100), vp(200), None);
        set.push(vp(100), vp(200), Some(Region::new("chr1", 5, 10)));
        set.push(vp(100), vp(200), Some(Region::new("chr1", 0, 10)));
        set.sort();
        let labels: Vec<_> = entry_regions(&set).into_iter().map(|(_, l)| l).collect();
        assert_eq!(labels, vec!["*", "chr1:1-10", "chr1:6-10"]);
    }

    #[test]
    fn test_sort_with_mixed_ties_does_not_panic() {
        let mut set = VirtualOffsetSet::new();
        set.push(vp(100), vp(200), Some(Region::new("chr1", 100, 200)));
        set.push(vp(100), vp(200), Some(Region::new("chr2", 50, 60)));
        set.push(vp(100), vp(200), Some(Region::new("chr1", 10, 20)));
        set.sort();
        assert_eq!(set.len(), 3);
    }
}
