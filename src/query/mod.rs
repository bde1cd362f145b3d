//! Region queries over an indexed BGZF text file.
//!
//! - [`SingleRegionQuery`] serves one region (or the whole file) with a
//!   single seek.
//! - [`MultiRegionQuery`] serves several, possibly overlapping, regions
//!   through one reader, returning each record at most once.

mod multi;
mod offsets;
mod single;

pub use multi::MultiRegionQuery;
pub use offsets::{OffsetRange, VirtualOffsetSet};
pub use single::SingleRegionQuery;
