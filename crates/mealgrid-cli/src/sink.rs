use mealgrid_core::{Sink, SinkError};
use std::fs;
use std::path::PathBuf;
use tracing::debug;

/// Writes documents as files under a root directory (created on demand)
#[derive(Clone, Debug)]
pub struct DirectorySink {
    root: PathBuf,
}

impl DirectorySink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Sink for DirectorySink {
    fn write(&self, name: &str, content: &[u8], content_type: &str) -> Result<String, SinkError> {
        // Names are plain file names; anything that could escape the root is refused
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(SinkError::Rejected {
                name: name.to_string(),
                reason: "not a plain file name".to_string(),
            });
        }
        let io_error = |source| SinkError::Io {
            name: name.to_string(),
            source,
        };
        fs::create_dir_all(&self.root).map_err(io_error)?;
        let path = self.root.join(name);
        fs::write(&path, content).map_err(io_error)?;

        debug!(path = %path.display(), content_type, bytes = content.len(), "wrote document");
        Ok(path.display().to_string())
    }
}
