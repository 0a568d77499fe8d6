//! Shared value types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Name, folder and checksum of a file produced by a pipeline step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMeta {
    pub file_name: String,
    pub file_path: PathBuf,
    pub checksum: String,
}

impl FileMeta {
    pub fn new(
        file_name: impl Into<String>,
        file_path: impl Into<PathBuf>,
        checksum: impl Into<String>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            file_path: file_path.into(),
            checksum: checksum.into(),
        }
    }

    /// Folder joined with the file name
    pub fn full_path(&self) -> PathBuf {
        self.file_path.join(&self.file_name)
    }
}

/// Produces the name (extension included) of a file about to be written
pub trait FileNaming: Send + Sync {
    fn new_file_name(&self) -> String;
}

impl<F> FileNaming for F
where
    F: Fn() -> String + Send + Sync,
{
    fn new_file_name(&self) -> String {
        self()
    }
}

/// Encoding label plus the naming strategy used when a file is created
pub struct FileFormat {
    pub encoding: String,
    naming: Box<dyn FileNaming>,
}

impl FileFormat {
    pub fn new(encoding: impl Into<String>, naming: impl FileNaming + 'static) -> Self {
        Self {
            encoding: encoding.into(),
            naming: Box::new(naming),
        }
    }

    pub fn new_file_name(&self) -> String {
        self.naming.new_file_name()
    }
}

impl fmt::Debug for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileFormat")
            .field("encoding", &self.encoding)
            .finish_non_exhaustive()
    }
}
