//! JSON file storage.

use super::{BoxFuture, PersistedBoard, Storage, StorageError, StorageResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Stores each board as `<id>.json` in a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    base_path: PathBuf,
}

impl FileStorage {
    /// Open storage rooted at `base_path`, creating the directory if needed.
    pub fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path).map_err(|e| {
            StorageError::Io(format!(
                "Failed to create storage directory {}: {e}",
                base_path.display()
            ))
        })?;
        Ok(Self { base_path })
    }

    /// Storage under the user's local data directory
    /// (`~/.local/share/boardsync/boards` on Linux).
    pub fn default_location() -> StorageResult<Self> {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| StorageError::Io("Could not determine home directory".to_string()))?;
        Self::new(base.join("boardsync").join("boards"))
    }

    /// File path for a board id. Characters outside `[A-Za-z0-9_-]` map to `_`.
    fn board_path(&self, id: &str) -> PathBuf {
        let safe_id: String = id
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.base_path.join(format!("{safe_id}.json"))
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

impl Storage for FileStorage {
    fn save(&self, id: &str, board: &PersistedBoard) -> BoxFuture<'_, StorageResult<()>> {
        let path = self.board_path(id);
        let json = board.to_json();
        Box::pin(async move {
            let json = json.map_err(|e| StorageError::Serialization(e.to_string()))?;
            fs::write(&path, json)
                .map_err(|e| StorageError::Io(format!("Failed to write {}: {e}", path.display())))
        })
    }

    fn load(&self, id: &str) -> BoxFuture<'_, StorageResult<PersistedBoard>> {
        let path = self.board_path(id);
        let id = id.to_string();
        Box::pin(async move {
            if !path.exists() {
                return Err(StorageError::NotFound(id));
            }
            let json = fs::read_to_string(&path)
                .map_err(|e| StorageError::Io(format!("Failed to read {}: {e}", path.display())))?;
            PersistedBoard::from_json(&json).map_err(|e| {
                StorageError::Serialization(format!("Failed to parse {}: {e}", path.display()))
            })
        })
    }

    fn delete(&self, id: &str) -> BoxFuture<'_, StorageResult<()>> {
        let path = self.board_path(id);
        Box::pin(async move {
            if path.exists() {
                fs::remove_file(&path).map_err(|e| {
                    StorageError::Io(format!("Failed to delete {}: {e}", path.display()))
                })?;
            }
            Ok(())
        })
    }

    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<String>>> {
        let base = self.base_path.clone();
        Box::pin(async move {
            let entries = fs::read_dir(&base)
                .map_err(|e| StorageError::Io(format!("Failed to read directory: {e}")))?;
            let mut ids: Vec<String> = entries
                .flatten()
                .map(|entry| entry.path())
                .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
                .filter_map(|path| path.file_stem()?.to_str().map(str::to_string))
                .collect();
            ids.sort();
            Ok(ids)
        })
    }

    fn exists(&self, id: &str) -> BoxFuture<'_, StorageResult<bool>> {
        let path = self.board_path(id);
        Box::pin(async move { Ok(path.exists()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{block_on, sample_board};
    use tempfile::tempdir;

    #[test]
    fn test_save_load() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();
        block_on(storage.save("board-1", &sample_board())).unwrap();
        assert!(dir.path().join("board-1.json").exists());
        assert_eq!(block_on(storage.load("board-1")).unwrap(), sample_board());
    }

    #[test]
    fn test_not_found() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();
        assert!(matches!(
            block_on(storage.load("missing")),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn test_corrupt_file_is_serialization_error() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();
        fs::write(dir.path().join("broken.json"), "{ nope").unwrap();
        assert!(matches!(
            block_on(storage.load("broken")),
            Err(StorageError::Serialization(_))
        ));
    }

    #[test]
    fn test_list_only_json() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();
        block_on(storage.save("doc2", &sample_board())).unwrap();
        block_on(storage.save("doc1", &sample_board())).unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();
        assert_eq!(block_on(storage.list()).unwrap(), vec!["doc1", "doc2"]);
    }

    #[test]
    fn test_delete() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();
        block_on(storage.save("test", &sample_board())).unwrap();
        block_on(storage.delete("test")).unwrap();
        assert!(!block_on(storage.exists("test")).unwrap());
    }

    #[test]
    fn test_sanitizes_id() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();
        block_on(storage.save("room/board:1*", &sample_board())).unwrap();
        assert!(dir.path().join("room_board_1_.json").exists());
        assert!(block_on(storage.exists("room/board:1*")).unwrap());
    }
}
