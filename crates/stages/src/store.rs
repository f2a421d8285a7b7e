//! On-disk stage store: one `standard-v1` document per stage.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use allowlist_merkle::{StandardMerkleTree, TreeDocument};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::stage::{StageError, StageId};

const EXTENSION: &str = "json";

/// Directory of persisted stage trees, `<dir>/<stage>.json`.
#[derive(Clone, Debug)]
pub struct StageStore {
    dir: PathBuf,
}

impl StageStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StageError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, stage: &StageId) -> PathBuf {
        self.dir.join(format!("{}.{}", stage, EXTENSION))
    }

    /// Persist `tree` for `stage`.
    ///
    /// The document is written to a temporary file in the store directory
    /// and renamed into place, so readers see either the previous document
    /// or the complete new one.
    pub fn save(&self, stage: &StageId, tree: &StandardMerkleTree) -> Result<PathBuf, StageError> {
        let json = tree
            .dump()
            .to_json()
            .map_err(|source| StageError::Malformed {
                stage: stage.clone(),
                source,
            })?;

        let path = self.path_for(stage);
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| e.error)?;

        info!(%stage, root = %tree.root(), leaves = tree.len(), path = %path.display(), "Saved stage tree");
        Ok(path)
    }

    /// Read the raw document for `stage` without validating it.
    pub fn read_document(&self, stage: &StageId) -> Result<TreeDocument, StageError> {
        let path = self.path_for(stage);
        let json = match std::fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StageError::UnknownStage(stage.clone()))
            }
            Err(e) => return Err(e.into()),
        };
        TreeDocument::from_json(&json).map_err(|source| StageError::Malformed {
            stage: stage.clone(),
            source,
        })
    }

    /// Load and validate the tree for `stage`.
    pub fn load(&self, stage: &StageId) -> Result<StandardMerkleTree, StageError> {
        let doc = self.read_document(stage)?;
        let tree = StandardMerkleTree::load(&doc).map_err(|source| StageError::Malformed {
            stage: stage.clone(),
            source,
        })?;
        debug!(%stage, root = %tree.root(), "Loaded stage tree");
        Ok(tree)
    }

    pub fn contains(&self, stage: &StageId) -> bool {
        self.path_for(stage).is_file()
    }

    /// Stage ids with a document in the store, sorted.
    ///
    /// Files whose stem is not a valid stage id are skipped.
    pub fn list(&self) -> Result<Vec<StageId>, StageError> {
        let mut stages = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stage) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| StageId::new(s).ok())
            {
                stages.push(stage);
            }
        }
        stages.sort();
        Ok(stages)
    }
}

#[cfg(test)]
mod store_tests {
    use super::*;
    use allowlist_merkle::{Address, DumpError};
    use tempfile::TempDir;

    fn stage(id: &str) -> StageId {
        StageId::new(id).unwrap()
    }

    fn sample_tree(n: u8) -> StandardMerkleTree {
        StandardMerkleTree::from_addresses((1..=n).map(Address::repeat_byte)).unwrap()
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let store = StageStore::open(dir.path()).unwrap();
        let tree = sample_tree(5);

        let path = store.save(&stage("guaranteed"), &tree).unwrap();
        assert_eq!(path, dir.path().join("guaranteed.json"));

        let loaded = store.load(&stage("guaranteed")).unwrap();
        assert_eq!(loaded.root(), tree.root());
        assert_eq!(loaded.values(), tree.values());
    }

    #[test]
    fn test_overwrite_replaces_document() {
        let dir = TempDir::new().unwrap();
        let store = StageStore::open(dir.path()).unwrap();

        store.save(&stage("whitelist"), &sample_tree(3)).unwrap();
        store.save(&stage("whitelist"), &sample_tree(4)).unwrap();

        assert_eq!(
            store.load(&stage("whitelist")).unwrap().root(),
            sample_tree(4).root()
        );
        assert_eq!(store.list().unwrap(), vec![stage("whitelist")]);
    }

    #[test]
    fn test_unknown_stage() {
        let dir = TempDir::new().unwrap();
        let store = StageStore::open(dir.path()).unwrap();

        assert!(matches!(
            store.load(&stage("missing")),
            Err(StageError::UnknownStage(_))
        ));
        assert!(!store.contains(&stage("missing")));
    }

    #[test]
    fn test_malformed_document() {
        let dir = TempDir::new().unwrap();
        let store = StageStore::open(dir.path()).unwrap();
        std::fs::write(dir.path().join("broken.json"), "{\"format\": 1}").unwrap();

        assert!(matches!(
            store.load(&stage("broken")),
            Err(StageError::Malformed {
                source: DumpError::Json(_),
                ..
            })
        ));
    }

    #[test]
    fn test_tampered_document() {
        let dir = TempDir::new().unwrap();
        let store = StageStore::open(dir.path()).unwrap();
        store.save(&stage("guaranteed"), &sample_tree(4)).unwrap();

        let path = store.path_for(&stage("guaranteed"));
        let mut doc = TreeDocument::from_json(&std::fs::read_to_string(&path).unwrap()).unwrap();
        doc.tree[0] = format!("0x{}", "11".repeat(32));
        std::fs::write(&path, doc.to_json().unwrap()).unwrap();

        assert!(matches!(
            store.load(&stage("guaranteed")),
            Err(StageError::Malformed {
                source: DumpError::NodeHashMismatch(0),
                ..
            })
        ));
    }

    #[test]
    fn test_list_skips_foreign_files() {
        let dir = TempDir::new().unwrap();
        let store = StageStore::open(dir.path()).unwrap();
        store.save(&stage("whitelist"), &sample_tree(2)).unwrap();
        store.save(&stage("guaranteed"), &sample_tree(2)).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();
        std::fs::write(dir.path().join("bad name.json"), "{}").unwrap();

        assert_eq!(
            store.list().unwrap(),
            vec![stage("guaranteed"), stage("whitelist")]
        );
    }
}
