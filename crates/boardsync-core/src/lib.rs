//! boardsync core library
//!
//! Document state, selection geometry and sync engine for a shared vector
//! whiteboard. A [`Board`] is one replica: it owns the pages, undo history and
//! selection, and exchanges [`SyncEnvelope`]s with its peers through an
//! injected [`SyncChannel`].

pub mod board;
pub mod config;
pub mod debounce;
pub mod document;
pub mod element;
pub mod geometry;
pub mod history;
pub mod selection;
pub mod storage;
pub mod sync;
pub mod transform;
pub mod viewport;

pub use board::{Board, BoardError, Notice};
pub use config::{BoardConfig, ConfigError};
pub use debounce::Debouncer;
pub use document::Document;
pub use element::{Color, Element, ElementId, ElementKind, ElementStyle, PageNumber, Pages, Shape};
pub use geometry::point_in_polygon;
pub use history::History;
pub use selection::{Lasso, LassoState, Selection};
pub use storage::{
    AutoSaveManager, FileStorage, MemoryStorage, PersistedBoard, Storage, StorageError,
    StorageResult,
};
pub use sync::{
    ChannelError, ClientFrame, MemoryChannel, MemoryHub, NullChannel, RoomCommand, ServerFrame,
    SyncChannel, SyncEnvelope, SyncEvent,
};
pub use transform::TransformGesture;
pub use viewport::Viewport;
