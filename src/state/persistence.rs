// Roster document persistence
// Narrow file-persistence seam: read/write one named document. The
// store never touches the filesystem except through this trait.

use super::agent::Agent;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::PathBuf;
use tokio::fs;

/// On-disk layout of the roster document
///
/// The whole document is rewritten on every mutation; there are no
/// partial updates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RosterDocument {
    /// All agents, in document order
    pub agents: Vec<Agent>,
}

/// Provider of named-document persistence
///
/// `read` returns `Ok(None)` when the document does not exist yet,
/// which is distinct from an I/O failure.
#[async_trait]
pub trait DocumentStorage: Send + Sync {
    /// Read the named document, or `None` if it has never been written
    async fn read(&self, name: &str) -> io::Result<Option<String>>;

    /// Durably replace the named document with `contents`
    async fn write(&self, name: &str, contents: &str) -> io::Result<()>;
}

/// Document storage backed by a directory on the local filesystem
///
/// Writes go to a temporary file in the same directory and are renamed
/// into place, so a crashed write can never leave a torn document.
pub struct FileDocumentStorage {
    root: PathBuf,
}

impl FileDocumentStorage {
    /// Create storage rooted at the given directory
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

#[async_trait]
impl DocumentStorage for FileDocumentStorage {
    async fn read(&self, name: &str) -> io::Result<Option<String>> {
        match fs::read_to_string(self.path_for(name)).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn write(&self, name: &str, contents: &str) -> io::Result<()> {
        fs::create_dir_all(&self.root).await?;
        let tmp = self.path_for(&format!("{}.tmp", name));
        fs::write(&tmp, contents).await?;
        fs::rename(&tmp, self.path_for(name)).await?;
        Ok(())
    }
}
