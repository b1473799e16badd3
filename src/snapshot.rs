//! Prior-run snapshot: per-file content hashes persisted as JSON.
//!
//! The analysis core never touches snapshots. The CLI captures one after a
//! run and diffs it against the file named by `--snapshot`.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::framework::Framework;
use crate::graph::GraphStats;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHash {
    /// Lowercase hex SHA-256 of the file contents.
    pub sha256: String,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub analyzed_at: DateTime<Utc>,
    pub framework: Framework,
    pub stats: GraphStats,
    pub files: BTreeMap<String, FileHash>,
}

/// Files classified against an earlier snapshot. Each list is sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SnapshotDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub modified: Vec<String>,
    pub unchanged: Vec<String>,
}

impl SnapshotDiff {
    pub fn has_changes(&self) -> bool {
        !(self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty())
    }
}

fn hash_file(path: &Path) -> anyhow::Result<FileHash> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(FileHash {
        sha256: hex::encode(hasher.finalize()),
        size: bytes.len() as u64,
    })
}

impl Snapshot {
    /// Hash `files` (project-relative ids) under `root`.
    pub fn capture<S: AsRef<str>>(
        root: &Path,
        files: &[S],
        framework: Framework,
        stats: GraphStats,
    ) -> anyhow::Result<Self> {
        let mut hashes = BTreeMap::new();
        for id in files {
            let id = id.as_ref();
            hashes.insert(id.to_string(), hash_file(&root.join(id))?);
        }
        Ok(Self {
            analyzed_at: Utc::now(),
            framework,
            stats,
            files: hashes,
        })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading snapshot {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing snapshot {}", path.display()))
    }

    /// Read `path` if it exists.
    pub fn load_optional<P: AsRef<Path>>(path: P) -> anyhow::Result<Option<Self>> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(None);
        }
        Self::load(path).map(Some)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        }
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text).with_context(|| format!("writing snapshot {}", path.display()))
    }

    /// Classify this snapshot's files relative to `previous`.
    pub fn diff(&self, previous: &Snapshot) -> SnapshotDiff {
        let mut diff = SnapshotDiff::default();
        for (id, hash) in &self.files {
            match previous.files.get(id) {
                None => diff.added.push(id.clone()),
                Some(old) if old != hash => diff.modified.push(id.clone()),
                Some(_) => diff.unchanged.push(id.clone()),
            }
        }
        diff.removed = previous
            .files
            .keys()
            .filter(|id| !self.files.contains_key(*id))
            .cloned()
            .collect();
        diff
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn capture(root: &Path, files: &[&str]) -> Snapshot {
        Snapshot::capture(root, files, Framework::NextjsApp, GraphStats::default()).unwrap()
    }

    #[test]
    fn test_capture_hashes_contents() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.ts"), "abc").unwrap();
        let snapshot = capture(temp.path(), &["a.ts"]);
        let hash = &snapshot.files["a.ts"];
        assert_eq!(hash.size, 3);
        assert_eq!(
            hash.sha256,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_diff_classifies_files() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        for name in ["keep.ts", "edit.ts", "gone.ts"] {
            fs::write(root.join(name), name).unwrap();
        }
        let before = capture(root, &["keep.ts", "edit.ts", "gone.ts"]);

        fs::write(root.join("edit.ts"), "changed").unwrap();
        fs::write(root.join("new.ts"), "new").unwrap();
        let after = capture(root, &["keep.ts", "edit.ts", "new.ts"]);

        let diff = after.diff(&before);
        assert_eq!(diff.added, vec!["new.ts"]);
        assert_eq!(diff.removed, vec!["gone.ts"]);
        assert_eq!(diff.modified, vec!["edit.ts"]);
        assert_eq!(diff.unchanged, vec!["keep.ts"]);
        assert!(diff.has_changes());
        assert!(!after.diff(&after).has_changes());
    }

    #[test]
    fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.ts"), "x").unwrap();
        let snapshot = capture(temp.path(), &["a.ts"]);
        let path = temp.path().join("out/snapshot.json");
        snapshot.save(&path).unwrap();

        let loaded = Snapshot::load(&path).unwrap();
        assert_eq!(loaded, snapshot);
        assert!(Snapshot::load_optional(temp.path().join("none.json")).unwrap().is_none());
    }

    #[test]
    fn test_missing_file_fails_capture() {
        let temp = TempDir::new().unwrap();
        let result = Snapshot::capture(temp.path(), &["absent.ts"], Framework::Auto, GraphStats::default());
        assert!(result.is_err());
    }
}
