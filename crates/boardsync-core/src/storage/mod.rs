//! Persistence of board state through a key-value backend.
//!
//! The board never writes to disk itself. Hosts pick a [`Storage`] backend and
//! feed it [`PersistedBoard`] records, usually through an [`AutoSaveManager`].

mod autosave;
mod file;
mod memory;

pub use autosave::{AutoSaveManager, DEFAULT_AUTOSAVE_INTERVAL_SECS, LAST_BOARD_KEY};
pub use file::FileStorage;
pub use memory::MemoryStorage;

use crate::document::Document;
use crate::element::{PageNumber, Pages};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Board not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Storage error: {0}")]
    Other(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Everything needed to bring a replica back: pages, active page and the
/// undo history with its cursor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedBoard {
    pub pages: Pages,
    pub current_page: PageNumber,
    pub history: Vec<Document>,
    pub history_cursor: usize,
}

impl PersistedBoard {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn document(&self) -> Document {
        Document {
            pages: self.pages.clone(),
            current_page: self.current_page,
        }
    }
}

/// Key-value backend for persisted boards.
pub trait Storage: Send + Sync {
    fn save(&self, id: &str, board: &PersistedBoard) -> BoxFuture<'_, StorageResult<()>>;

    fn load(&self, id: &str) -> BoxFuture<'_, StorageResult<PersistedBoard>>;

    /// Delete a board. Deleting a missing board is not an error.
    fn delete(&self, id: &str) -> BoxFuture<'_, StorageResult<()>>;

    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<String>>>;

    fn exists(&self, id: &str) -> BoxFuture<'_, StorageResult<bool>>;
}

/// Drive a storage future to completion on the current thread. The bundled
/// backends never return `Pending`.
#[cfg(test)]
pub(crate) fn block_on<F: Future>(f: F) -> F::Output {
    use std::task::{Context, Poll, Waker};

    let mut cx = Context::from_waker(Waker::noop());
    let mut f = std::pin::pin!(f);
    loop {
        if let Poll::Ready(result) = f.as_mut().poll(&mut cx) {
            return result;
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_board() -> PersistedBoard {
    use crate::element::Element;

    let mut doc = Document::new();
    doc.page_mut(1)
        .push(Element::circle(10.0, 10.0, 5.0).with_id("c1"));
    PersistedBoard {
        pages: doc.pages.clone(),
        current_page: 1,
        history: vec![Document::new(), doc],
        history_cursor: 1,
    }
}
