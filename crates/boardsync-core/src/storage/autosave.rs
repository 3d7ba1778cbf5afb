//! Periodic saving of board state.

use super::{PersistedBoard, Storage, StorageResult};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const DEFAULT_AUTOSAVE_INTERVAL_SECS: u64 = 30;

/// Key under which the most recently saved board is mirrored for restore on
/// startup.
pub const LAST_BOARD_KEY: &str = "__last_board__";

/// Saves a board when it is dirty and the interval has elapsed.
pub struct AutoSaveManager<S: Storage> {
    storage: Arc<S>,
    interval: Duration,
    last_save: Option<Instant>,
    dirty: bool,
    board_id: String,
}

impl<S: Storage> AutoSaveManager<S> {
    pub fn new(storage: Arc<S>, board_id: impl Into<String>) -> Self {
        Self {
            storage,
            interval: Duration::from_secs(DEFAULT_AUTOSAVE_INTERVAL_SECS),
            last_save: None,
            dirty: false,
            board_id: board_id.into(),
        }
    }

    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn board_id(&self) -> &str {
        &self.board_id
    }

    /// Whether a save is due at `now`.
    pub fn should_save(&self, now: Instant) -> bool {
        if !self.dirty {
            return false;
        }
        match self.last_save {
            Some(last) => now.saturating_duration_since(last) >= self.interval,
            None => true,
        }
    }

    /// Save if dirty and due. Returns whether a save happened.
    pub async fn maybe_save(&mut self, board: &PersistedBoard, now: Instant) -> StorageResult<bool> {
        if !self.should_save(now) {
            return Ok(false);
        }
        self.save(board, now).await?;
        Ok(true)
    }

    /// Save immediately under the board id and [`LAST_BOARD_KEY`].
    pub async fn save(&mut self, board: &PersistedBoard, now: Instant) -> StorageResult<()> {
        self.storage.save(&self.board_id, board).await?;
        self.storage.save(LAST_BOARD_KEY, board).await?;
        self.last_save = Some(now);
        self.dirty = false;
        log::debug!("Saved board {}", self.board_id);
        Ok(())
    }

    /// Load this manager's board.
    pub async fn load(&mut self) -> StorageResult<PersistedBoard> {
        let board = self.storage.load(&self.board_id).await?;
        self.dirty = false;
        Ok(board)
    }

    /// Load the most recently saved board of any id, if there is one.
    pub async fn load_last(&mut self) -> Option<PersistedBoard> {
        match self.storage.load(LAST_BOARD_KEY).await {
            Ok(board) => {
                self.dirty = false;
                Some(board)
            }
            Err(e) => {
                log::debug!("No last board to restore: {e}");
                None
            }
        }
    }

    /// Saved board ids, excluding [`LAST_BOARD_KEY`].
    pub async fn list_boards(&self) -> StorageResult<Vec<String>> {
        let mut ids = self.storage.list().await?;
        ids.retain(|id| id != LAST_BOARD_KEY);
        Ok(ids)
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }
}
