// src/store.rs - Named, whole-file artifacts that each pipeline stage reloads from
use crate::dataset::Dataset;
use crate::error::{AuditError, Result};
use crate::input_format::{parse_delimited, TextEncoding};
use crate::output_format::{to_csv_bytes, write_csv};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// File extension of persisted artifacts
pub const ARTIFACT_EXTENSION: &str = "csv";

/// Where an artifact lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "location", rename_all = "lowercase")]
pub enum ArtifactLocation {
    File(PathBuf),
    Memory(String),
}

impl ArtifactLocation {
    pub fn path(&self) -> Option<&Path> {
        match self {
            ArtifactLocation::File(path) => Some(path),
            ArtifactLocation::Memory(_) => None,
        }
    }
}

impl fmt::Display for ArtifactLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactLocation::File(path) => write!(f, "{}", path.display()),
            ArtifactLocation::Memory(name) => write!(f, "memory:{}", name),
        }
    }
}

/// Storage for pipeline artifacts.
///
/// `put` always replaces the whole artifact. `get` must go back through the
/// serialized form so a later stage never sees in-memory state the artifact
/// does not contain.
pub trait ArtifactStore {
    fn put(&mut self, name: &str, dataset: &Dataset) -> Result<()>;
    fn get(&self, name: &str) -> Result<Dataset>;
    fn location(&self, name: &str) -> ArtifactLocation;
}

fn artifact_file_name(name: &str) -> String {
    format!("{}.{}", name, ARTIFACT_EXTENSION)
}

fn decode_artifact(name: &str, bytes: &[u8]) -> Result<Dataset> {
    let invalid = |reason: String| {
        AuditError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("artifact '{}': {}", name, reason),
        ))
    };
    let text = TextEncoding::Utf8.decode(bytes).map_err(invalid)?;
    parse_delimited(&text, b',').map_err(invalid)
}

/// Artifacts as `<dir>/<name>.csv`, replaced atomically via temp file + rename
#[derive(Debug, Clone)]
pub struct DirStore {
    dir: PathBuf,
}

impl DirStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(DirStore { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(artifact_file_name(name))
    }
}

impl ArtifactStore for DirStore {
    fn put(&mut self, name: &str, dataset: &Dataset) -> Result<()> {
        let target = self.path_for(name);
        // Same directory, so the rename stays on one filesystem
        let tmp = NamedTempFile::new_in(&self.dir)?;
        {
            let mut out = BufWriter::new(tmp.as_file());
            write_csv(dataset, &mut out)?;
            out.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&target).map_err(|e| AuditError::Io(e.error))?;

        debug!(artifact = name, path = %target.display(), records = dataset.len(), "artifact written");
        Ok(())
    }

    fn get(&self, name: &str) -> Result<Dataset> {
        let path = self.path_for(name);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AuditError::ArtifactNotFound(name.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        decode_artifact(name, &bytes)
    }

    fn location(&self, name: &str) -> ArtifactLocation {
        ArtifactLocation::File(self.path_for(name))
    }
}

/// Artifacts kept as serialized CSV bytes in memory
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    artifacts: HashMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw serialized bytes of an artifact
    pub fn bytes(&self, name: &str) -> Option<&[u8]> {
        self.artifacts.get(name).map(|b| b.as_slice())
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.artifacts.keys().cloned().collect();
        names.sort();
        names
    }
}

impl ArtifactStore for MemoryStore {
    fn put(&mut self, name: &str, dataset: &Dataset) -> Result<()> {
        let bytes = to_csv_bytes(dataset)?;
        self.artifacts.insert(name.to_string(), bytes);
        Ok(())
    }

    fn get(&self, name: &str) -> Result<Dataset> {
        let bytes = self
            .artifacts
            .get(name)
            .ok_or_else(|| AuditError::ArtifactNotFound(name.to_string()))?;
        decode_artifact(name, bytes)
    }

    fn location(&self, name: &str) -> ArtifactLocation {
        ArtifactLocation::Memory(artifact_file_name(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Cell;
    use tempfile::TempDir;

    fn sample(value: &str) -> Dataset {
        Dataset::new(
            vec!["Nome".to_string(), "Obs".to_string()],
            vec![vec![Cell::from_raw(value), Cell::Missing]],
        )
    }

    #[test]
    fn test_dir_store_overwrites_and_reloads() {
        let dir = TempDir::new().unwrap();
        let mut store = DirStore::new(dir.path().join("outputs")).unwrap();

        store.put("roster-stage-1", &sample("Ana")).unwrap();
        store.put("roster-stage-1", &sample("Bruno")).unwrap();

        let reloaded = store.get("roster-stage-1").unwrap();
        assert_eq!(reloaded, sample("Bruno"));

        // only the artifact itself, no leftover temp files
        let entries: Vec<_> = fs::read_dir(store.dir()).unwrap().collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(
            store.location("roster-stage-1").path(),
            Some(dir.path().join("outputs").join("roster-stage-1.csv").as_path())
        );
    }

    #[test]
    fn test_missing_artifact() {
        let dir = TempDir::new().unwrap();
        let store = DirStore::new(dir.path()).unwrap();
        assert!(matches!(
            store.get("flagged-final"),
            Err(AuditError::ArtifactNotFound(name)) if name == "flagged-final"
        ));
        assert!(matches!(
            MemoryStore::new().get("flagged-final"),
            Err(AuditError::ArtifactNotFound(_))
        ));
    }

    #[test]
    fn test_memory_store_goes_through_csv() {
        let mut store = MemoryStore::new();
        let login = chrono::NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let ds = Dataset::new(
            vec!["Nome".to_string(), "Login".to_string()],
            vec![vec![Cell::from_raw("A"), Cell::DateTime(login)]],
        );
        store.put("roster-stage-1", &ds).unwrap();

        let reloaded = store.get("roster-stage-1").unwrap();
        let record = reloaded.records().next().unwrap();
        // datetimes come back as text
        assert_eq!(record.get("Login").unwrap(), &Cell::from_raw("2020-01-01 10:00:00"));
        assert_eq!(store.bytes("roster-stage-1").unwrap(), b"Nome,Login\nA,2020-01-01 10:00:00\n");
    }
}
