//! The fixed 6-level hierarchical binning scheme shared by BAI and TBI.
//!
//! - Level 0: 1 bin (512 Mbp)
//! - Level 1: 8 bins (64 Mbp each)
//! - Level 2: 64 bins (8 Mbp each)
//! - Level 3: 512 bins (1 Mbp each)
//! - Level 4: 4096 bins (128 Kbp each)
//! - Level 5: 32768 bins (16 Kbp each)

/// Width of the smallest bin and of a linear index window, as a shift.
pub const MIN_SHIFT: u32 = 14;

/// Number of levels below the root bin.
pub const DEPTH: u32 = 5;

/// Exclusive upper bound for coordinates representable by the scheme.
pub const MAX_POSITION: u64 = 1 << (MIN_SHIFT + 3 * DEPTH);

/// Pseudo-bin that carries per-reference metadata instead of chunks.
pub const META_BIN: u32 = 37450;

/// First bin number of each level, root first.
const LEVEL_OFFSETS: [u32; 6] = [0, 1, 9, 73, 585, 4681];

fn level_shift(level: usize) -> u32 {
    MIN_SHIFT + 3 * (DEPTH - level as u32)
}

/// Computes the smallest bin fully containing `[start, end)`.
pub fn reg2bin(start: u64, end: u64) -> u32 {
    let end = end.max(start + 1) - 1;

    for level in (1..LEVEL_OFFSETS.len()).rev() {
        let shift = level_shift(level);
        if start >> shift == end >> shift {
            return LEVEL_OFFSETS[level] + (start >> shift) as u32;
        }
    }

    0
}

/// Lists every bin that may hold records overlapping `[start, end)`.
pub fn reg2bins(start: u64, end: u64) -> Vec<u32> {
    let start = start.min(MAX_POSITION - 1);
    let end = end.clamp(start + 1, MAX_POSITION) - 1;

    let mut bins = Vec::new();
    for (level, offset) in LEVEL_OFFSETS.iter().enumerate() {
        let shift = level_shift(level);
        let first = offset + (start >> shift) as u32;
        let last = offset + (end >> shift) as u32;
        bins.extend(first..=last);
    }

    bins
}

/// Linear index window holding `position`.
pub fn window(position: u64) -> usize {
    (position >> MIN_SHIFT) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reg2bin_smallest_level() {
        assert_eq!(reg2bin(1000, 2000), 4681);
        assert_eq!(reg2bin(1000, 2000), reg2bin(1000, 2000));
        assert_eq!(reg2bin(16384, 16385), 4682);
    }

    #[test]
    fn test_reg2bin_climbs_to_parent() {
        // crosses a 16 Kbp boundary but stays within one 128 Kbp bin
        assert_eq!(reg2bin(16000, 17000), 585);
        // crosses a 128 Kbp boundary
        assert_eq!(reg2bin(131000, 132000), 73);
        assert_eq!(reg2bin(0, MAX_POSITION), 0);
    }

    #[test]
    fn test_reg2bin_empty_interval_is_a_point() {
        assert_eq!(reg2bin(5, 5), reg2bin(5, 6));
        assert_eq!(reg2bin(0, 0), 4681);
    }

    #[test]
    fn test_nested_intervals_never_land_in_a_child_only_bin() {
        // Every interval spanning two smallest windows must use a parent
        let mut start = 0;
        while start < 1 << 20 {
            let bin = reg2bin(start, start + (1 << MIN_SHIFT) + 1);
            assert!(bin < 4681, "bin {} for start {}", bin, start);
            start += 4099;
        }
    }

    #[test]
    fn test_reg2bins_contains_record_bins() {
        let bins = reg2bins(1000, 2000);
        assert_eq!(bins, vec![0, 1, 9, 73, 585, 4681]);

        let bins = reg2bins(0, 40000);
        for bin in [0, 1, 9, 73, 585, 4681, 4682, 4683] {
            assert!(bins.contains(&bin));
        }
        assert!(bins.contains(&reg2bin(20000, 20100)));
    }

    #[test]
    fn test_reg2bins_unbounded_end() {
        let bins = reg2bins(0, u64::MAX);
        assert_eq!(bins.len(), 37449);
        assert_eq!(bins.last(), Some(&37448));
    }

    #[test]
    fn test_window() {
        assert_eq!(window(0), 0);
        assert_eq!(window(16383), 0);
        assert_eq!(window(16384), 1);
    }
}
