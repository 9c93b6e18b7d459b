//! Scoped temporary files.

use std::path::{Path, PathBuf};

use tracing::warn;
use uuid::Uuid;

/// A temporary file or directory that is removed when dropped.
///
/// Names are random so concurrent operations never collide. Removal failures
/// other than "already gone" are logged and otherwise ignored.
#[derive(Debug)]
pub struct TempArtifact {
    path: PathBuf,
    is_dir: bool,
}

impl TempArtifact {
    /// Reserves a file path `<root>/<prefix>-<uuid>.<ext>` without creating it.
    pub fn file(root: &Path, prefix: &str, ext: &str) -> Self {
        let name = if ext.is_empty() {
            format!("{prefix}-{}", Uuid::new_v4())
        } else {
            format!("{prefix}-{}.{ext}", Uuid::new_v4())
        };
        Self {
            path: root.join(name),
            is_dir: false,
        }
    }

    /// Creates a fresh directory `<root>/<prefix>-<uuid>`.
    pub async fn dir(root: &Path, prefix: &str) -> std::io::Result<Self> {
        let path = root.join(format!("{prefix}-{}", Uuid::new_v4()));
        tokio::fs::create_dir_all(&path).await?;
        Ok(Self { path, is_dir: true })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns a path inside a directory artifact.
    pub fn join(&self, name: impl AsRef<Path>) -> PathBuf {
        self.path.join(name)
    }
}

impl AsRef<Path> for TempArtifact {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempArtifact {
    fn drop(&mut self) {
        let result = if self.is_dir {
            std::fs::remove_dir_all(&self.path)
        } else {
            std::fs::remove_file(&self.path)
        };
        if let Err(e) = result
            && e.kind() != std::io::ErrorKind::NotFound
        {
            warn!(path = %self.path.display(), error = %e, "Failed to remove temporary artifact");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_removed_on_drop() {
        let root = tempfile::tempdir().unwrap();
        let path = {
            let artifact = TempArtifact::file(root.path(), "out", "pdf");
            tokio::fs::write(artifact.path(), b"%PDF").await.unwrap();
            assert!(artifact.path().exists());
            artifact.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_dir_removed_on_drop_and_missing_file_is_fine() {
        let root = tempfile::tempdir().unwrap();
        let dir_path = {
            let dir = TempArtifact::dir(root.path(), "frames").await.unwrap();
            tokio::fs::write(dir.join("f1.png"), b"x").await.unwrap();
            dir.path().to_path_buf()
        };
        assert!(!dir_path.exists());

        // Never created: dropping must not panic.
        drop(TempArtifact::file(root.path(), "never", ""));
    }
}
