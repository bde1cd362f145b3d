pub mod config;
pub mod error;
pub mod formats;
pub mod index;
pub mod io;
pub mod query;
pub mod reader;
pub mod types;
pub mod writer;

pub use config::Config;
pub use error::{Error, Result};
pub use index::{Index, build_index, merge_index_files, merge_indices, read_index, write_index};
pub use reader::IndexedReader;
pub use types::{IndexOptions, Preset, Region};
pub use writer::IndexingWriter;
