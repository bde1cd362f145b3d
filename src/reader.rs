use crate::formats::HeaderFilter;
use crate::index::{Index, read_index};
use crate::io::LineReader;
use crate::query::{MultiRegionQuery, SingleRegionQuery};
use crate::types::Region;
use crate::{Error, Result};
use noodles::bgzf;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Index file extension.
pub const INDEX_EXTENSION: &str = "tbi";

/// Line reader over a BGZF file on disk.
pub type FileLineReader = LineReader<bgzf::Reader<File>>;

/// Finds the index of a data file.
///
/// Tries the appended convention (`data.vcf.gz.tbi`) first, then the
/// replaced one (`data.vcf.tbi`).
pub fn index_path<P: AsRef<Path>>(data_path: P) -> Option<PathBuf> {
    let path = data_path.as_ref();

    let appended = PathBuf::from(format!("{}.{}", path.display(), INDEX_EXTENSION));
    if appended.exists() {
        return Some(appended);
    }

    let replaced = path.with_extension(INDEX_EXTENSION);
    if replaced.exists() {
        return Some(replaced);
    }

    None
}

/// A BGZF text file together with its tabix index.
#[derive(Debug, Clone)]
pub struct IndexedReader {
    path: PathBuf,
    index: Index,
}

impl IndexedReader {
    /// Opens `path`, loading the index found next to it.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let index_path = index_path(path).ok_or_else(|| {
            Error::in_file(path)(Error::InvalidInput("no tabix index found".to_string()))
        })?;

        tracing::debug!("Using index {:?} for {:?}", index_path, path);

        Ok(Self::with_index(path, read_index(index_path)?))
    }

    pub fn with_index<P: AsRef<Path>>(path: P, index: Index) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            index,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    /// Sequence names in index order.
    pub fn reference_names(&self) -> impl Iterator<Item = &str> {
        self.index.header().names.iter()
    }

    /// The skipped and meta-character lines at the top of the file.
    pub fn header_lines(&self) -> Result<Vec<String>> {
        let mut reader = self.open_data()?;
        let mut headers = HeaderFilter::new(&self.index.header().options);
        let mut lines = Vec::new();

        while let Some(line) = reader.read_line().map_err(|e| self.file_error(e))? {
            if !headers.is_header(line) {
                break;
            }
            lines.push(line.to_string());
        }

        Ok(lines)
    }

    /// Lines overlapping `region`.
    pub fn query(&self, region: &Region) -> Result<SingleRegionQuery<bgzf::Reader<File>>> {
        SingleRegionQuery::new(self.open_data()?, &self.index, Some(region))
    }

    /// Every data line of the file.
    pub fn query_all(&self) -> Result<SingleRegionQuery<bgzf::Reader<File>>> {
        SingleRegionQuery::new(self.open_data()?, &self.index, None)
    }

    /// Lines overlapping any of `regions`, each returned once.
    pub fn query_regions(&self, regions: &[Region]) -> Result<MultiRegionQuery<bgzf::Reader<File>>> {
        MultiRegionQuery::new(self.open_data()?, &self.index, regions)
    }

    fn open_data(&self) -> Result<FileLineReader> {
        let file = File::open(&self.path).map_err(|e| self.file_error(e))?;
        Ok(LineReader::new(bgzf::Reader::new(file)))
    }

    fn file_error(&self, e: std::io::Error) -> Error {
        Error::in_file(&self.path)(e.into())
    }
}
