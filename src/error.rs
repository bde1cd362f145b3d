use std::path::{Path, PathBuf};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid index format: {0}")]
    Format(String),

    #[error("index does not match data: {0}")]
    IndexMismatch(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid range: {0}")]
    InvalidRange(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("{}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Returns a closure that attaches `path` to an error, for use with `map_err`.
    pub fn in_file(path: impl AsRef<Path>) -> impl FnOnce(Error) -> Error {
        let path = path.as_ref().to_path_buf();
        move |source| match source {
            // keep the innermost path
            Error::File { .. } => source,
            source => Error::File {
                path,
                source: Box::new(source),
            },
        }
    }

    fn root(&self) -> &Error {
        match self {
            Error::File { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn is_format(&self) -> bool {
        matches!(self.root(), Error::Format(_))
    }

    pub fn is_index_mismatch(&self) -> bool {
        matches!(self.root(), Error::IndexMismatch(_))
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            Error::File { path, .. } => Some(path),
            _ => None,
        }
    }
}
