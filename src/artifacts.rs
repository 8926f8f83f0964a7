//! Generated files offered back to the user: MP3 audio, PPTX decks and
//! cover images. They live in ephemeral storage only.

use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Audio,
    Slides,
    Image,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub file_name: String,
    pub path: PathBuf,
    pub mime: String,
    pub size: u64,
}

enum Root {
    /// Removed with the store.
    Temp(TempDir),
    Fixed(PathBuf),
}

pub struct ArtifactStore {
    root: Root,
}

impl ArtifactStore {
    pub fn ephemeral() -> io::Result<Self> {
        let dir = tempfile::Builder::new().prefix("study-box-").tempdir()?;
        Ok(Self {
            root: Root::Temp(dir),
        })
    }

    pub fn at(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            root: Root::Fixed(dir),
        })
    }

    /// Use `dir` when given, otherwise a temporary directory.
    pub fn from_setting(dir: Option<&Path>) -> io::Result<Self> {
        match dir {
            Some(dir) => Self::at(dir),
            None => Self::ephemeral(),
        }
    }

    pub fn dir(&self) -> &Path {
        match &self.root {
            Root::Temp(dir) => dir.path(),
            Root::Fixed(dir) => dir,
        }
    }

    /// Write a complete artifact.
    pub async fn store(
        &self,
        kind: ArtifactKind,
        file_name: &str,
        mime: &str,
        bytes: &[u8],
    ) -> io::Result<Artifact> {
        let path = self.dir().join(sanitize_file_name(file_name));
        tokio::fs::write(&path, bytes).await?;
        self.describe(kind, path, mime).await
    }

    /// Open a file for an artifact that is written incrementally.
    pub async fn create(&self, file_name: &str) -> io::Result<(PathBuf, tokio::fs::File)> {
        let path = self.dir().join(sanitize_file_name(file_name));
        let file = tokio::fs::File::create(&path).await?;
        Ok((path, file))
    }

    /// Describe a file previously opened with [`ArtifactStore::create`].
    pub async fn describe(&self, kind: ArtifactKind, path: PathBuf, mime: &str) -> io::Result<Artifact> {
        let size = tokio::fs::metadata(&path).await?.len();
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        info!(kind = ?kind, file = %file_name, size, "artifact written");
        Ok(Artifact {
            kind,
            file_name,
            path,
            mime: mime.to_string(),
            size,
        })
    }

    /// Whether `path` points at a file inside this store.
    pub fn contains(&self, path: &Path) -> bool {
        match (path.canonicalize(), self.dir().canonicalize()) {
            (Ok(path), Ok(dir)) => path.starts_with(dir),
            _ => false,
        }
    }
}

/// Reduce a user-derived name to one safe path component.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim_matches('.').trim();
    if cleaned.is_empty() {
        "artifact".into()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("Cells: a/b?.pptx"), "Cells_ a_b_.pptx");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "_.._etc_passwd");
        assert_eq!(sanitize_file_name(" .. "), "artifact");
    }

    #[tokio::test]
    async fn test_store_and_contains() {
        let store = ArtifactStore::ephemeral().unwrap();
        let artifact = store
            .store(ArtifactKind::Image, "cover.png", "image/png", b"\x89PNG")
            .await
            .unwrap();
        assert_eq!(artifact.size, 4);
        assert_eq!(artifact.file_name, "cover.png");
        assert!(store.contains(&artifact.path));
        assert!(!store.contains(Path::new("/")));
    }

    #[test]
    fn test_ephemeral_dir_removed_on_drop() {
        let store = ArtifactStore::ephemeral().unwrap();
        let dir = store.dir().to_path_buf();
        assert!(dir.exists());
        drop(store);
        assert!(!dir.exists());
    }
}
