//! Naming and cleanup policy for engine artifacts.
//!
//! Every invocation writes to `<scratch>/<kind>_<token>`. Tokens are unique per target, so
//! concurrent workers never share a file.

use std::io;
use std::path::{Path, PathBuf};

use relayscan_common::models::CorrelationToken;
use tokio::fs::File;
use tokio::io::BufReader;
use tracing::{debug, warn};

use crate::lines::LossyLines;
use crate::runner::ToolError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Discovery,
    Fingerprint,
}

impl ArtifactKind {
    fn prefix(self) -> &'static str {
        match self {
            ArtifactKind::Discovery => "discovery",
            ArtifactKind::Fingerprint => "fingerprint",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
    retain: bool,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>, retain: bool) -> Self {
        Self {
            dir: dir.into(),
            retain,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Creates the scratch directory if it does not exist yet.
    pub async fn prepare(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await
    }

    pub fn path_for(&self, kind: ArtifactKind, token: &CorrelationToken) -> PathBuf {
        self.dir.join(format!("{}_{}", kind.prefix(), token))
    }

    /// Opens an artifact for line-by-line reading.
    pub async fn lines(&self, path: &Path) -> Result<LossyLines<BufReader<File>>, ToolError> {
        let file: File = File::open(path)
            .await
            .map_err(|source| ToolError::Artifact {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(LossyLines::new(BufReader::new(file)))
    }

    /// Deletes a parsed artifact unless retention is on. Failures are only logged.
    pub async fn release(&self, path: &Path, tag: &str) {
        if self.retain {
            debug!("{tag} keeping artifact {}", path.display());
            return;
        }

        match tokio::fs::remove_file(path).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("{tag} could not delete artifact {}: {e}", path.display()),
        }
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_scoped_by_kind_and_token() {
        let store = ArtifactStore::new("/tmp/scratch", false);
        let token = CorrelationToken::fresh();

        let discovery = store.path_for(ArtifactKind::Discovery, &token);
        let fingerprint = store.path_for(ArtifactKind::Fingerprint, &token);

        assert_eq!(discovery.parent(), Some(Path::new("/tmp/scratch")));
        assert_eq!(
            discovery.file_name().unwrap().to_str().unwrap(),
            format!("discovery_{token}")
        );
        assert_ne!(discovery, fingerprint);
        assert_ne!(
            discovery,
            store.path_for(ArtifactKind::Discovery, &CorrelationToken::fresh())
        );
    }

    #[tokio::test]
    async fn prepare_creates_nested_scratch_dir() {
        let root = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(root.path().join("a").join("b"), false);
        store.prepare().await.unwrap();
        assert!(store.dir().is_dir());
    }

    #[tokio::test]
    async fn missing_artifact_is_a_tool_error() {
        let root = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(root.path(), false);
        let path = store.path_for(ArtifactKind::Fingerprint, &CorrelationToken::fresh());

        let err = store.lines(&path).await.unwrap_err();
        assert!(matches!(err, ToolError::Artifact { .. }));

        tokio::fs::write(&path, b"a\n\xff\nb\n").await.unwrap();
        let mut lines = store.lines(&path).await.unwrap();
        assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("a"));
        assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("\u{FFFD}"));
        assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("b"));
        assert_eq!(lines.next_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn release_deletes_unless_retained() {
        let root = tempfile::tempdir().unwrap();
        let token = CorrelationToken::fresh();

        let store = ArtifactStore::new(root.path(), false);
        let path = store.path_for(ArtifactKind::Discovery, &token);
        tokio::fs::write(&path, "open tcp 80 10.0.0.5 1700000000\n").await.unwrap();
        store.release(&path, "[test]").await;
        assert!(!path.exists());

        // Releasing a missing artifact is silent.
        store.release(&path, "[test]").await;

        let keeper = ArtifactStore::new(root.path(), true);
        tokio::fs::write(&path, "kept").await.unwrap();
        keeper.release(&path, "[test]").await;
        assert!(path.exists());
    }
}
