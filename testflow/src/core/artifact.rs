//! Report artifacts left behind by a successful coverage run.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Whether an artifact is a single file or a directory tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// A single file (e.g. the style report).
    File,
    /// A directory (e.g. the HTML coverage export).
    Directory,
}

/// An artifact produced by a report sub-stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportArtifact {
    /// The stage that produced the artifact.
    pub stage: String,
    /// File or directory.
    pub kind: ArtifactKind,
    /// Location of the artifact.
    pub path: PathBuf,
    /// Whether the artifact exists after the stage ran.
    pub present: bool,
}

impl ReportArtifact {
    /// Describes an artifact and checks the filesystem for it.
    #[must_use]
    pub fn inspect(stage: impl Into<String>, kind: ArtifactKind, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let present = match kind {
            ArtifactKind::File => path.is_file(),
            ArtifactKind::Directory => path.is_dir(),
        };
        Self {
            stage: stage.into(),
            kind,
            path,
            present,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inspect_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("codestyle.txt");
        std::fs::write(&file, "0\n").unwrap();

        let artifact = ReportArtifact::inspect("codestyle", ArtifactKind::File, &file);
        assert!(artifact.present);

        let wrong_kind = ReportArtifact::inspect("codestyle", ArtifactKind::Directory, &file);
        assert!(!wrong_kind.present);
    }

    #[test]
    fn test_inspect_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let artifact =
            ReportArtifact::inspect("coverage-html", ArtifactKind::Directory, dir.path().join("coverage"));
        assert!(!artifact.present);
        assert_eq!(artifact.stage, "coverage-html");
    }
}
