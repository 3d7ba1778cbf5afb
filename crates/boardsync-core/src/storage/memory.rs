//! In-memory storage implementation.

use super::{BoxFuture, PersistedBoard, Storage, StorageError, StorageResult};
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory storage for tests and ephemeral replicas.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    boards: RwLock<HashMap<String, PersistedBoard>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_error(e: impl std::fmt::Display) -> StorageError {
    StorageError::Other(format!("Lock error: {e}"))
}

impl Storage for MemoryStorage {
    fn save(&self, id: &str, board: &PersistedBoard) -> BoxFuture<'_, StorageResult<()>> {
        let id = id.to_string();
        let board = board.clone();
        Box::pin(async move {
            self.boards.write().map_err(lock_error)?.insert(id, board);
            Ok(())
        })
    }

    fn load(&self, id: &str) -> BoxFuture<'_, StorageResult<PersistedBoard>> {
        let id = id.to_string();
        Box::pin(async move {
            let boards = self.boards.read().map_err(lock_error)?;
            boards.get(&id).cloned().ok_or(StorageError::NotFound(id))
        })
    }

    fn delete(&self, id: &str) -> BoxFuture<'_, StorageResult<()>> {
        let id = id.to_string();
        Box::pin(async move {
            self.boards.write().map_err(lock_error)?.remove(&id);
            Ok(())
        })
    }

    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<String>>> {
        Box::pin(async move {
            let boards = self.boards.read().map_err(lock_error)?;
            let mut ids: Vec<String> = boards.keys().cloned().collect();
            ids.sort();
            Ok(ids)
        })
    }

    fn exists(&self, id: &str) -> BoxFuture<'_, StorageResult<bool>> {
        let id = id.to_string();
        Box::pin(async move { Ok(self.boards.read().map_err(lock_error)?.contains_key(&id)) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{block_on, sample_board};

    #[test]
    fn test_save_and_load() {
        let storage = MemoryStorage::new();
        block_on(storage.save("board", &sample_board())).unwrap();
        let loaded = block_on(storage.load("board")).unwrap();
        assert_eq!(loaded, sample_board());
    }

    #[test]
    fn test_not_found() {
        let storage = MemoryStorage::new();
        let result = block_on(storage.load("nonexistent"));
        assert!(matches!(result, Err(StorageError::NotFound(id)) if id == "nonexistent"));
    }

    #[test]
    fn test_exists_and_delete() {
        let storage = MemoryStorage::new();
        assert!(!block_on(storage.exists("board")).unwrap());
        block_on(storage.save("board", &sample_board())).unwrap();
        assert!(block_on(storage.exists("board")).unwrap());
        block_on(storage.delete("board")).unwrap();
        assert!(!block_on(storage.exists("board")).unwrap());
        block_on(storage.delete("board")).unwrap();
    }

    #[test]
    fn test_list_sorted() {
        let storage = MemoryStorage::new();
        block_on(storage.save("b", &sample_board())).unwrap();
        block_on(storage.save("a", &sample_board())).unwrap();
        assert_eq!(block_on(storage.list()).unwrap(), vec!["a", "b"]);
    }
}
