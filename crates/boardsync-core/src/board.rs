//! The authoritative per-replica board.
//!
//! [`Board`] owns the document, its undo history, the selection and the
//! interactive lasso/transform state. Every local mutation goes through its
//! methods, which update state, push history where the change is structural,
//! and announce the change on the injected [`SyncChannel`]. Remote envelopes
//! are applied through the same page operations by [`Board::apply_remote`],
//! without touching history and without being re-announced.

use crate::config::BoardConfig;
use crate::debounce::Debouncer;
use crate::document::Document;
use crate::element::{new_element_id, Element, ElementId, PageNumber, Pages};
use crate::history::History;
use crate::selection::{elements_in_lasso, Lasso, Selection};
use crate::storage::PersistedBoard;
use crate::sync::{NullChannel, SyncChannel, SyncEnvelope, SyncEvent};
use crate::transform::{self, TransformGesture};
use crate::viewport::Viewport;
use kurbo::Point;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Refused board operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error("cannot delete the last remaining page")]
    LastPage,
    #[error("page {0} does not exist")]
    PageNotFound(PageNumber),
    #[error("invalid page number {0}")]
    InvalidPage(PageNumber),
    #[error("no element is selected")]
    NoSelection,
}

/// Side notifications for the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// A lasso captured more than one element.
    MultipleSelected { count: usize },
}

type UpdateKey = (PageNumber, ElementId);

pub struct Board {
    document: Document,
    history: History,
    selection: Selection,
    lasso: Lasso,
    viewport: Viewport,
    /// Pre-gesture copy of the element being transformed.
    transform_base: Option<Element>,
    origin: String,
    channel: Box<dyn SyncChannel>,
    pending_updates: Debouncer<UpdateKey, SyncEvent>,
    notices: Vec<Notice>,
    lasso_timeout: Duration,
}

impl Board {
    pub fn new(config: BoardConfig, channel: Box<dyn SyncChannel>) -> Self {
        let document = Document::new();
        let origin = config.resolve_origin();
        log::info!("Board created with origin {origin}");
        Self {
            history: History::new(document.clone(), config.history_limit),
            document,
            selection: Selection::new(),
            lasso: Lasso::new(),
            viewport: Viewport::default(),
            transform_base: None,
            origin,
            channel,
            pending_updates: Debouncer::new(config.update_interval()),
            notices: Vec::new(),
            lasso_timeout: config.lasso_timeout(),
        }
    }

    /// A board that is not connected to anyone.
    pub fn offline() -> Self {
        Self::new(BoardConfig::default(), Box::new(NullChannel))
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn pages(&self) -> &Pages {
        &self.document.pages
    }

    pub fn current_page(&self) -> PageNumber {
        self.document.current_page
    }

    /// Elements of the active page.
    pub fn elements(&self) -> &[Element] {
        self.document.elements()
    }

    /// Element on the active page.
    pub fn element(&self, id: &str) -> Option<&Element> {
        self.elements().iter().find(|e| e.id == id)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Hosts pan and zoom through this; lasso samples are mapped with the
    /// viewport in effect when they arrive.
    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    pub fn is_lasso_active(&self) -> bool {
        self.lasso.is_drawing()
    }

    /// Drain UI notices queued since the last call.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    // --- Local mutations -------------------------------------------------

    /// Add an element to the active page under a freshly generated id.
    ///
    /// Returns the stored element, or `None` if the id collides with an
    /// existing element anywhere in the document.
    pub fn add_element(&mut self, draft: Element) -> Option<Element> {
        let element = draft.with_id(new_element_id());
        if self.document.contains_id(&element.id) {
            log::debug!("Id collision on add: {}", element.id);
            return None;
        }

        let page = self.current_page();
        self.document.page_mut(page).push(element.clone());
        self.push_history();
        self.emit(SyncEvent::Add {
            page,
            element: element.clone(),
        });
        Some(element)
    }

    /// Replace an element on the active page. Not recorded in history; the
    /// change is announced once the update interval passes without another
    /// update to the same element.
    pub fn update_element(&mut self, element: Element) -> bool {
        self.update_element_at(element, Instant::now())
    }

    /// [`Board::update_element`] with an explicit clock reading.
    pub fn update_element_at(&mut self, element: Element, now: Instant) -> bool {
        let page = self.current_page();
        let Some(slot) = self
            .document
            .page_mut(page)
            .iter_mut()
            .find(|e| e.id == element.id)
        else {
            log::debug!("Update for unknown element {} ignored", element.id);
            return false;
        };
        *slot = element.clone();
        self.pending_updates.schedule(
            (page, element.id.clone()),
            SyncEvent::Update { page, element },
            now,
        );
        true
    }

    /// Remove an element from the active page.
    pub fn delete_element(&mut self, id: &str) -> bool {
        let page = self.current_page();
        let elements = self.document.page_mut(page);
        let Some(index) = elements.iter().position(|e| e.id == id) else {
            log::debug!("Delete for unknown element {id} ignored");
            return false;
        };
        elements.remove(index);
        self.selection.remove(id);
        self.push_history();
        self.emit(SyncEvent::Delete {
            page,
            element_id: id.to_string(),
        });
        true
    }

    /// Empty the active page.
    pub fn clear_page(&mut self) {
        let page = self.current_page();
        self.document.page_mut(page).clear();
        self.selection.clear();
        self.push_history();
        self.emit(SyncEvent::Clear { page });
    }

    /// Record the current state as an undo step.
    pub fn commit(&mut self) {
        self.push_history();
    }

    /// Activate page `n`, creating it if needed.
    pub fn change_page(&mut self, page: PageNumber) -> Result<(), BoardError> {
        if page == 0 {
            return Err(BoardError::InvalidPage(page));
        }
        self.document.current_page = page;
        self.reset_interaction();
        if !self.document.pages.contains_key(&page) {
            self.document.page_mut(page);
            log::info!("Created page {page}");
            self.emit(SyncEvent::PageChange {
                pages: self.document.pages.clone(),
            });
        }
        Ok(())
    }

    /// Remove page `n`. The last remaining page can never be deleted.
    pub fn delete_page(&mut self, page: PageNumber) -> Result<(), BoardError> {
        if self.document.pages.len() <= 1 {
            log::warn!("Refusing to delete page {page}: it is the last page");
            return Err(BoardError::LastPage);
        }
        if self.document.pages.remove(&page).is_none() {
            return Err(BoardError::PageNotFound(page));
        }
        if self.document.current_page == page {
            self.document.current_page = self.document.lowest_page().unwrap_or(1);
            self.reset_interaction();
        }
        log::info!("Deleted page {page}");
        self.push_history();
        self.emit(SyncEvent::PageDelete { page_number: page });
        Ok(())
    }

    /// Step back in history. Returns whether anything changed.
    pub fn undo(&mut self) -> bool {
        let Some(snapshot) = self.history.undo().cloned() else {
            return false;
        };
        self.restore_snapshot(snapshot);
        true
    }

    /// Step forward in history. Returns whether anything changed.
    pub fn redo(&mut self) -> bool {
        let Some(snapshot) = self.history.redo().cloned() else {
            return false;
        };
        self.restore_snapshot(snapshot);
        true
    }

    fn restore_snapshot(&mut self, snapshot: Document) {
        self.document = snapshot;
        self.reset_interaction();
        self.emit(SyncEvent::PageChange {
            pages: self.document.pages.clone(),
        });
    }

    // --- Selection -------------------------------------------------------

    /// Select a single element on the active page.
    pub fn select_element(&mut self, id: &str) -> bool {
        if self.element(id).is_none() {
            return false;
        }
        self.selection.select_only(id);
        true
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
        self.transform_base = None;
    }

    /// Delete every selected element. Returns how many were deleted.
    pub fn delete_selection(&mut self) -> usize {
        let ids = self.selection.ids().to_vec();
        let deleted = ids.iter().filter(|id| self.delete_element(id)).count();
        self.clear_selection();
        deleted
    }

    /// Start a lasso at a screen-space pointer position.
    pub fn begin_lasso(&mut self, screen_point: Point, now: Instant) {
        self.clear_selection();
        self.lasso.begin(screen_point, &self.viewport, now);
    }

    pub fn extend_lasso(&mut self, screen_point: Point, now: Instant) {
        self.lasso.extend(screen_point, &self.viewport, now);
    }

    /// Finish the lasso and select what it encloses. Returns the number of
    /// selected elements.
    pub fn end_lasso(&mut self) -> usize {
        let Some(polygon) = self.lasso.finish() else {
            self.selection.clear();
            return 0;
        };
        let ids = elements_in_lasso(self.elements(), &polygon);
        let count = ids.len();
        self.selection.set(ids);
        if count > 1 {
            self.notices.push(Notice::MultipleSelected { count });
        }
        count
    }

    pub fn cancel_lasso(&mut self) {
        if self.lasso.is_drawing() {
            log::debug!("Lasso cancelled");
        }
        self.lasso.cancel();
        self.selection.clear();
    }

    /// Cancel a lasso that has not received a sample within the configured
    /// timeout. Returns whether one was cancelled.
    pub fn expire_lasso(&mut self, now: Instant) -> bool {
        if !self.lasso.is_expired(now, self.lasso_timeout) {
            return false;
        }
        log::debug!("Lasso expired");
        self.cancel_lasso();
        true
    }

    // --- Transform -------------------------------------------------------

    /// Start a transform gesture on the primary selected element.
    pub fn begin_transform(&mut self) -> Result<TransformGesture, BoardError> {
        let element = self
            .selection
            .primary()
            .and_then(|id| self.element(id))
            .cloned()
            .ok_or(BoardError::NoSelection)?;
        let gesture = TransformGesture::at(&element);
        self.transform_base = Some(element);
        Ok(gesture)
    }

    /// Show a gesture in progress. Not recorded in history.
    pub fn preview_transform(&mut self, gesture: &TransformGesture) -> Result<(), BoardError> {
        let base = self.transform_base.as_ref().ok_or(BoardError::NoSelection)?;
        let previewed = transform::preview(base, gesture);
        if self.update_element(previewed) {
            Ok(())
        } else {
            self.transform_base = None;
            Err(BoardError::NoSelection)
        }
    }

    /// Bake a finished gesture into the element and record an undo step.
    pub fn end_transform(&mut self, gesture: &mut TransformGesture) -> Result<Element, BoardError> {
        let base = self.transform_base.take().ok_or(BoardError::NoSelection)?;
        let resolved = transform::resolve(&base, gesture);
        if !self.update_element(resolved.clone()) {
            return Err(BoardError::NoSelection);
        }
        self.commit();
        Ok(resolved)
    }

    // --- Sync ------------------------------------------------------------

    /// Pump the board: send updates whose interval has passed, apply
    /// everything the channel received, and expire an abandoned lasso.
    pub fn tick(&mut self, now: Instant) {
        for event in self.pending_updates.drain_due(now) {
            self.send(event);
        }
        for envelope in self.channel.poll() {
            self.apply_remote(&envelope);
        }
        self.expire_lasso(now);
    }

    /// Send every pending update immediately.
    pub fn flush_updates(&mut self) {
        for event in self.pending_updates.drain_all() {
            self.send(event);
        }
    }

    pub fn has_pending_updates(&self) -> bool {
        !self.pending_updates.is_empty()
    }

    /// Apply an envelope from another replica. Returns false for our own
    /// echoes and for events addressed to page 0. Never touches history and
    /// never re-announces.
    pub fn apply_remote(&mut self, envelope: &SyncEnvelope) -> bool {
        if envelope.origin == self.origin {
            log::debug!("Ignoring own {} event", envelope.event.name());
            return false;
        }

        if let Some(page) = envelope.event.page().filter(|page| *page == 0) {
            log::warn!(
                "Dropping {} event for invalid page {page} from {}",
                envelope.event.name(),
                envelope.origin
            );
            return false;
        }

        match &envelope.event {
            SyncEvent::Add { page, element } => {
                let elements = self.document.page_mut(*page);
                if elements.iter().any(|e| e.id == element.id) {
                    log::debug!("Element {} already on page {page}, skipping add", element.id);
                } else {
                    elements.push(element.clone());
                }
            }
            SyncEvent::Update { page, element } => {
                match self
                    .document
                    .pages
                    .get_mut(page)
                    .and_then(|elements| elements.iter_mut().find(|e| e.id == element.id))
                {
                    Some(slot) => *slot = element.clone(),
                    None => log::debug!("Element {} not on page {page}, skipping update", element.id),
                }
            }
            SyncEvent::Delete { page, element_id } => {
                if let Some(elements) = self.document.pages.get_mut(page) {
                    elements.retain(|e| &e.id != element_id);
                }
            }
            SyncEvent::Clear { page } => {
                if let Some(elements) = self.document.pages.get_mut(page) {
                    elements.clear();
                }
            }
            SyncEvent::PageDelete { page_number } => self.remote_page_delete(*page_number),
            SyncEvent::PageChange { pages } => {
                for (page, elements) in pages {
                    if *page == 0 {
                        log::warn!("Skipping invalid page 0 in page-change from {}", envelope.origin);
                        continue;
                    }
                    self.document.pages.insert(*page, elements.clone());
                }
            }
        }

        self.revalidate_selection();
        true
    }

    fn remote_page_delete(&mut self, page: PageNumber) {
        if !self.document.pages.contains_key(&page) {
            return;
        }
        if self.document.pages.len() <= 1 {
            log::warn!("Refusing remote delete of page {page}: it is the last page");
            return;
        }
        self.document.pages.remove(&page);
        if self.document.current_page == page {
            self.document.current_page = self.document.lowest_page().unwrap_or(1);
            self.reset_interaction();
        }
        log::info!("Page {page} deleted by a peer");
    }

    // --- Persistence -----------------------------------------------------

    /// Snapshot of everything worth persisting.
    pub fn persisted_state(&self) -> PersistedBoard {
        PersistedBoard {
            pages: self.document.pages.clone(),
            current_page: self.document.current_page,
            history: self.history.entries().to_vec(),
            history_cursor: self.history.cursor(),
        }
    }

    /// Replace local state with a persisted record. An unusable history is
    /// replaced by a fresh one seeded with the restored document.
    pub fn restore(&mut self, state: PersistedBoard) {
        let mut document = state.document();
        document.normalize();
        let limit = self.history.limit();
        self.history = History::from_parts(state.history, state.history_cursor, limit)
            .unwrap_or_else(|| {
                log::warn!("Persisted history is unusable, starting a new one");
                History::new(document.clone(), limit)
            });
        self.document = document;
        self.pending_updates.drain_all();
        self.reset_interaction();
    }

    // --- Internals -------------------------------------------------------

    fn push_history(&mut self) {
        self.history.push(self.document.clone());
    }

    fn reset_interaction(&mut self) {
        self.lasso.cancel();
        self.selection.clear();
        self.transform_base = None;
    }

    fn revalidate_selection(&mut self) {
        let elements = self.document.elements();
        self.selection
            .retain(|id| elements.iter().any(|e| e.id == id));
        let base_gone = self
            .transform_base
            .as_ref()
            .is_some_and(|base| !self.selection.contains(&base.id));
        if base_gone {
            self.transform_base = None;
        }
    }

    /// Announce a structural event. Pending updates go out first so peers
    /// see changes in local call order.
    fn emit(&mut self, event: SyncEvent) {
        self.flush_updates();
        self.send(event);
    }

    fn send(&mut self, event: SyncEvent) {
        let envelope = SyncEnvelope::new(event, self.origin.clone());
        if let Err(e) = self.channel.send(&envelope) {
            log::warn!("Failed to send {} event: {e}", envelope.event.name());
        }
    }
}
