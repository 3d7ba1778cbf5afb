//! Linear undo/redo over full document snapshots.

use crate::document::Document;
use serde::{Deserialize, Serialize};

/// Default maximum number of snapshots kept.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Snapshot list with a cursor pointing at the snapshot that matches the
/// live document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct History {
    entries: Vec<Document>,
    cursor: usize,
    #[serde(skip, default = "default_limit")]
    limit: usize,
}

fn default_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

impl History {
    /// History seeded with the initial document.
    pub fn new(initial: Document, limit: usize) -> Self {
        Self {
            entries: vec![initial],
            cursor: 0,
            limit: limit.max(1),
        }
    }

    /// Rebuild from persisted parts. Returns `None` when the entries are
    /// empty or the cursor is out of range.
    pub fn from_parts(entries: Vec<Document>, cursor: usize, limit: usize) -> Option<Self> {
        if cursor >= entries.len() {
            return None;
        }
        let mut history = Self {
            entries,
            cursor,
            limit: limit.max(1),
        };
        history.enforce_limit();
        Some(history)
    }

    /// Drop everything after the cursor, append, and move the cursor onto
    /// the new snapshot.
    pub fn push(&mut self, snapshot: Document) {
        self.entries.truncate(self.cursor + 1);
        self.entries.push(snapshot);
        self.cursor = self.entries.len() - 1;
        self.enforce_limit();
    }

    /// Keep at most `limit` entries in a window that still contains the
    /// cursor. Oldest entries go first; redo entries go only when the cursor
    /// sits too close to the start.
    fn enforce_limit(&mut self) {
        if self.entries.len() > self.limit {
            let excess = self.entries.len() - self.limit;
            let start = excess.min(self.cursor);
            self.entries.drain(..start);
            self.entries.truncate(self.limit);
            self.cursor -= start;
        }
    }

    /// Step back. Returns the snapshot to restore.
    pub fn undo(&mut self) -> Option<&Document> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        self.entries.get(self.cursor)
    }

    /// Step forward. Returns the snapshot to restore.
    pub fn redo(&mut self) -> Option<&Document> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        self.entries.get(self.cursor)
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    pub fn current(&self) -> Option<&Document> {
        self.entries.get(self.cursor)
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn entries(&self) -> &[Document] {
        &self.entries
    }
}
