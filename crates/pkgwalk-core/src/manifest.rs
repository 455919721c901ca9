//! Package descriptor model and filesystem collaborators.
//!
//! The walker never touches the filesystem directly; it goes through
//! the [`ManifestSource`] and [`DirProbe`] traits so tests can swap in
//! doubles.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::WalkError;

/// File name of the package descriptor.
pub const MANIFEST_FILE: &str = "package.json";

/// Parsed package descriptor, limited to the fields the walker reads.
///
/// `main`, `jsnext:main` and `browser` are the recognized entry-point
/// fields; they are carried verbatim into the emitted metadata when
/// present.
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    pub name: String,
    pub version: String,

    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,

    #[serde(default, rename = "devDependencies")]
    pub dev_dependencies: BTreeMap<String, String>,

    #[serde(default, rename = "optionalDependencies")]
    pub optional_dependencies: BTreeMap<String, String>,

    pub main: Option<String>,

    #[serde(rename = "jsnext:main")]
    pub jsnext_main: Option<String>,

    pub browser: Option<String>,
}

/// Reads and parses the package descriptor found in a directory.
#[async_trait]
pub trait ManifestSource: Send + Sync + std::fmt::Debug {
    async fn read(&self, dir: &Path) -> Result<Manifest, WalkError>;
}

/// Tests whether a directory exists at a path.
#[async_trait]
pub trait DirProbe: Send + Sync + std::fmt::Debug {
    /// Returns `Ok(false)` when nothing is installed at `path`; that
    /// is a normal negative outcome. Any other filesystem failure is
    /// an error and aborts the walk.
    async fn is_dir(&self, path: &Path) -> Result<bool, WalkError>;
}

/// Filesystem-backed [`ManifestSource`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FsManifestSource;

#[async_trait]
impl ManifestSource for FsManifestSource {
    async fn read(&self, dir: &Path) -> Result<Manifest, WalkError> {
        let path = dir.join(MANIFEST_FILE);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(WalkError::ManifestNotFound { path });
            }
            Err(err) => return Err(WalkError::Io(err)),
        };
        serde_json::from_str(&raw).map_err(|source| WalkError::ManifestParse { path, source })
    }
}

/// Filesystem-backed [`DirProbe`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FsDirProbe;

#[async_trait]
impl DirProbe for FsDirProbe {
    async fn is_dir(&self, path: &Path) -> Result<bool, WalkError> {
        match tokio::fs::metadata(path).await {
            Ok(meta) => Ok(meta.is_dir()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(WalkError::Io(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_parse_minimal_manifest() {
        let manifest: Manifest =
            serde_json::from_str(r#"{"name": "app", "version": "1.0.0"}"#).unwrap();
        assert_eq!(manifest.name, "app");
        assert_eq!(manifest.version, "1.0.0");
        assert!(manifest.dependencies.is_empty());
        assert!(manifest.dev_dependencies.is_empty());
        assert!(manifest.main.is_none());
    }

    #[test]
    fn test_parse_dependency_sections() {
        let manifest: Manifest = serde_json::from_str(
            r#"{
                "name": "app",
                "version": "1.0.0",
                "dependencies": {"a": "^1.0.0"},
                "devDependencies": {"b": "^2.0.0"},
                "optionalDependencies": {"c": "~3.0.0"}
            }"#,
        )
        .unwrap();
        assert_eq!(manifest.dependencies.get("a").unwrap(), "^1.0.0");
        assert_eq!(manifest.dev_dependencies.get("b").unwrap(), "^2.0.0");
        assert_eq!(manifest.optional_dependencies.get("c").unwrap(), "~3.0.0");
    }

    #[test]
    fn test_parse_entry_point_fields() {
        let manifest: Manifest = serde_json::from_str(
            r#"{
                "name": "lib",
                "version": "0.1.0",
                "main": "index.js",
                "jsnext:main": "index.mjs",
                "browser": "browser.js"
            }"#,
        )
        .unwrap();
        assert_eq!(manifest.main.as_deref(), Some("index.js"));
        assert_eq!(manifest.jsnext_main.as_deref(), Some("index.mjs"));
        assert_eq!(manifest.browser.as_deref(), Some("browser.js"));
    }

    #[test]
    fn test_parse_rejects_missing_name() {
        let result: Result<Manifest, _> = serde_json::from_str(r#"{"version": "1.0.0"}"#);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_fs_source_reads_descriptor() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(MANIFEST_FILE),
            r#"{"name": "app", "version": "2.0.0"}"#,
        )
        .unwrap();

        let manifest = FsManifestSource.read(dir.path()).await.unwrap();
        assert_eq!(manifest.name, "app");
        assert_eq!(manifest.version, "2.0.0");
    }

    #[tokio::test]
    async fn test_fs_source_missing_descriptor() {
        let dir = tempdir().unwrap();

        let err = FsManifestSource.read(dir.path()).await.unwrap_err();
        assert!(matches!(err, WalkError::ManifestNotFound { .. }));
    }

    #[tokio::test]
    async fn test_fs_source_malformed_descriptor() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(MANIFEST_FILE), "not valid json {{{").unwrap();

        let err = FsManifestSource.read(dir.path()).await.unwrap_err();
        assert!(matches!(err, WalkError::ManifestParse { .. }));
    }

    #[tokio::test]
    async fn test_fs_probe_directory() {
        let dir = tempdir().unwrap();
        assert!(FsDirProbe.is_dir(dir.path()).await.unwrap());
    }

    #[tokio::test]
    async fn test_fs_probe_absent_path_is_negative() {
        let dir = tempdir().unwrap();
        let absent = dir.path().join("nope");
        assert!(!FsDirProbe.is_dir(&absent).await.unwrap());
    }

    #[tokio::test]
    async fn test_fs_probe_plain_file_is_negative() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("left-pad");
        fs::write(&file, "not a directory").unwrap();
        assert!(!FsDirProbe.is_dir(&file).await.unwrap());
    }
}
