//! Keeps a `Scene` and a `TextDocument` in sync, in both directions.
//!
//! The binder subscribes to the scene, the document and the format set, and
//! reacts when `process_notifications` drains its mailboxes:
//!
//! - typed text flows from the edited block into its linked element
//! - element type changes flow back as a reformat of the linked block
//! - structural drift (unlinked blocks, dead linkages) is repaired by
//!   resynchronizing the scene from the document
//!
//! Deferred work (coalesced re-initialization, the cursor placeholder fix)
//! runs from `tick`.

mod cursor;
mod highlight;
mod sync;


use std::cell::RefCell;
use std::rc::Rc;

use smol_str::SmolStr;
use web_time::Instant;

use crate::block::BlockLinkage;
use crate::config::EditorConfig;
use crate::document::{DocumentEvent, SharedDocument, TextDocument};
use crate::element::{ElementId, ElementType};
use crate::error::BindError;
use crate::format::{FormatEvent, FormatSet, SharedFormatSet};
use crate::notify::{Observable, SubscriptionId};
use crate::scene::{Scene, SceneEvent, SharedScene};
use crate::scheduler::{DeferredTask, Scheduler};

/// Lifecycle of a binder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BinderState {
    /// Scene, document or format set missing.
    #[default]
    Unbound,
    /// The document is being rebuilt from the scene.
    Initializing,
    Ready,
    /// The scene is being replaced wholesale.
    Resetting,
}

/// Notifications the binder emits to its own observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinderEvent {
    DocumentInitialized,
    DocumentLoadCountChanged,
    CursorPositionChanged,
    CurrentElementChanged,
    CurrentFontChanged,
    AutoCompleteHintsChanged,
    CompletionPrefixChanged,
    /// Ask the view to put its cursor at this char offset.
    RequestCursorPosition(usize),
}

/// A subscription held on one collaborator.
struct Attached<T: Observable> {
    target: Rc<RefCell<T>>,
    subscription: SubscriptionId,
}

impl<T: Observable> Attached<T> {
    fn attach(target: Rc<RefCell<T>>) -> Option<Self> {
        let subscription = match target.try_borrow_mut() {
            Ok(mut t) => t.notifier_mut().subscribe(),
            Err(_) => {
                tracing::warn!(target: "slugline::binder", "collaborator is busy, cannot subscribe");
                return None;
            }
        };
        Some(Self {
            target,
            subscription,
        })
    }

    fn detach(self) {
        match self.target.try_borrow_mut() {
            Ok(mut t) => {
                t.notifier_mut().unsubscribe(self.subscription);
            }
            Err(_) => {
                tracing::warn!(target: "slugline::binder", "collaborator is busy, subscription leaked");
            }
        }
    }

    fn pop(&self) -> Option<T::Event> {
        self.target
            .try_borrow_mut()
            .ok()?
            .notifier_mut()
            .pop(self.subscription)
    }

    /// Throw away everything queued so far.
    fn discard_pending(&self) {
        if let Ok(mut t) = self.target.try_borrow_mut() {
            t.notifier_mut().discard_since(self.subscription, 0);
        }
    }
}

/// Run a mutation on a collaborator and drop the notifications it caused
/// from the binder's own mailbox.
fn quietly<T: Observable, R>(
    target: &Rc<RefCell<T>>,
    subscription: SubscriptionId,
    f: impl FnOnce(&mut T) -> R,
) -> R {
    let mut target = target.borrow_mut();
    let mark = target.notifier_mut().mark(subscription);
    let result = f(&mut *target);
    target.notifier_mut().discard_since(subscription, mark);
    result
}

/// Rc handles to all three collaborators, cloned out so the binder can
/// borrow them without borrowing itself.
struct Bound {
    scene: SharedScene,
    document: SharedDocument,
    formats: SharedFormatSet,
    scene_subscription: SubscriptionId,
    document_subscription: SubscriptionId,
}

pub struct Binder {
    config: EditorConfig,
    state: BinderState,
    scene: Option<Attached<Scene>>,
    document: Option<Attached<TextDocument>>,
    formats: Option<Attached<FormatSet>>,
    scheduler: Scheduler,

    cursor_position: Option<usize>,
    current_element_cursor_position: Option<usize>,
    current_element: Option<ElementId>,
    tab_history: Vec<ElementType>,

    character_names: Vec<SmolStr>,
    auto_complete_hints: Vec<SmolStr>,
    completion_prefix: SmolStr,

    document_load_count: u64,
    events: Vec<BinderEvent>,
}

impl Default for Binder {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl std::fmt::Debug for Binder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binder")
            .field("state", &self.state)
            .field("cursor_position", &self.cursor_position)
            .field("current_element", &self.current_element)
            .field("document_load_count", &self.document_load_count)
            .finish_non_exhaustive()
    }
}

impl Binder {
    pub fn new(config: EditorConfig) -> Self {
        Self {
            scheduler: Scheduler::new(config.initialize_delay()),
            config,
            state: BinderState::Unbound,
            scene: None,
            document: None,
            formats: None,
            cursor_position: None,
            current_element_cursor_position: None,
            current_element: None,
            tab_history: Vec::new(),
            character_names: Vec::new(),
            auto_complete_hints: Vec::new(),
            completion_prefix: SmolStr::default(),
            document_load_count: 0,
            events: Vec::new(),
        }
    }

    // === Binding ===

    /// Attach a scene, a document and a format set.
    ///
    /// Every earlier subscription is dropped first. With all three present
    /// the document is rebuilt from the scene and the cursor placed at 0;
    /// otherwise the binder stays `Unbound` and does nothing.
    pub fn bind(
        &mut self,
        scene: Option<SharedScene>,
        document: Option<SharedDocument>,
        formats: Option<SharedFormatSet>,
    ) {
        self.detach_all();

        self.scene = scene.and_then(Attached::attach);
        self.document = document.and_then(Attached::attach);
        self.formats = formats.and_then(Attached::attach);

        self.cursor_position = None;
        self.current_element_cursor_position = None;
        self.set_current_element(None);

        if self.bound().is_err() {
            tracing::debug!(target: "slugline::binder", "binder left unbound");
            self.state = BinderState::Unbound;
            return;
        }

        self.initialize_document();
        self.set_cursor_position(0);
    }

    /// Drop every collaborator.
    pub fn unbind(&mut self) {
        self.bind(None, None, None);
    }

    fn detach_all(&mut self) {
        if let Some(attached) = self.scene.take() {
            attached.detach();
        }
        if let Some(attached) = self.document.take() {
            attached.detach();
        }
        if let Some(attached) = self.formats.take() {
            attached.detach();
        }
        self.scheduler = Scheduler::new(self.config.initialize_delay());
        self.state = BinderState::Unbound;
    }

    fn bound(&self) -> Result<Bound, BindError> {
        match (&self.scene, &self.document, &self.formats) {
            (Some(scene), Some(document), Some(formats)) => Ok(Bound {
                scene: scene.target.clone(),
                document: document.target.clone(),
                formats: formats.target.clone(),
                scene_subscription: scene.subscription,
                document_subscription: document.subscription,
            }),
            _ => Err(BindError::NotBound),
        }
    }

    pub fn is_bound(&self) -> bool {
        self.bound().is_ok()
    }

    pub fn scene(&self) -> Option<&SharedScene> {
        self.scene.as_ref().map(|a| &a.target)
    }

    pub fn document(&self) -> Option<&SharedDocument> {
        self.document.as_ref().map(|a| &a.target)
    }

    pub fn format_set(&self) -> Option<&SharedFormatSet> {
        self.formats.as_ref().map(|a| &a.target)
    }

    // === Accessors ===

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn state(&self) -> BinderState {
        self.state
    }

    pub fn document_load_count(&self) -> u64 {
        self.document_load_count
    }

    pub fn cursor_position(&self) -> Option<usize> {
        self.cursor_position
    }

    /// Cursor offset relative to the start of the current block.
    pub fn current_element_cursor_position(&self) -> Option<usize> {
        self.current_element_cursor_position
    }

    pub fn current_element(&self) -> Option<ElementId> {
        self.current_element
    }

    pub fn auto_complete_hints(&self) -> &[SmolStr] {
        &self.auto_complete_hints
    }

    pub fn completion_prefix(&self) -> &str {
        &self.completion_prefix
    }

    pub fn character_names(&self) -> &[SmolStr] {
        &self.character_names
    }

    pub fn set_character_names(&mut self, names: Vec<SmolStr>) {
        if self.character_names == names {
            return;
        }
        self.character_names = names;
        self.evaluate_auto_complete_hints();
    }

    pub fn set_force_sync_document(&mut self, force: bool) {
        self.config.force_sync_document = force;
    }

    /// Take every event emitted since the last call.
    pub fn take_events(&mut self) -> Vec<BinderEvent> {
        std::mem::take(&mut self.events)
    }

    fn emit(&mut self, event: BinderEvent) {
        self.events.push(event);
    }

    // === Notification pump ===

    /// Handle every queued collaborator notification, oldest first, each to
    /// completion. Work a handler causes is queued and handled in the same call.
    pub fn process_notifications(&mut self) {
        loop {
            if let Some(event) = self.scene.as_ref().and_then(Attached::pop) {
                self.handle_scene_event(event);
                continue;
            }
            if let Some(event) = self.document.as_ref().and_then(Attached::pop) {
                self.handle_document_event(event);
                continue;
            }
            if let Some(event) = self.formats.as_ref().and_then(Attached::pop) {
                self.handle_format_event(event);
                continue;
            }
            break;
        }
    }

    fn is_suppressing(&self) -> bool {
        matches!(
            self.state,
            BinderState::Initializing | BinderState::Resetting
        )
    }

    fn handle_scene_event(&mut self, event: SceneEvent) {
        match event {
            SceneEvent::AboutToReset => self.on_scene_about_to_reset(),
            SceneEvent::Reset { cursor_position } => self.on_scene_reset(cursor_position),
            _ if self.is_suppressing() => {
                tracing::trace!(target: "slugline::binder", ?event, "scene notification suppressed");
            }
            SceneEvent::ElementChanged { id, kind } => self.on_scene_element_changed(id, kind),
            SceneEvent::ElementInserted { id, index } => self.on_element_inserted(id, index),
            SceneEvent::ElementAboutToBeRemoved { id, index } => {
                self.on_element_removed(id, index)
            }
            SceneEvent::ElementMoved { .. } | SceneEvent::ElementsReplaced => {
                tracing::debug!(target: "slugline::binder", ?event, "scene restructured");
                self.initialize_document_later();
            }
        }
    }

    fn handle_document_event(&mut self, event: DocumentEvent) {
        if self.is_suppressing() {
            tracing::trace!(target: "slugline::binder", ?event, "document notification suppressed");
            return;
        }
        match event {
            DocumentEvent::ContentsChange {
                from,
                chars_removed,
                chars_added,
            } => self.on_buffer_changed(from, chars_removed, chars_added),
            DocumentEvent::BlockCountChanged { count } => {
                self.resynchronize_from_buffer(Some(count))
            }
        }
    }

    fn handle_format_event(&mut self, event: FormatEvent) {
        tracing::trace!(target: "slugline::binder", ?event, "formats changed");
        if self.state == BinderState::Ready {
            self.highlight_all();
        }
        if matches!(event, FormatEvent::DefaultFontChanged) {
            self.emit(BinderEvent::CurrentFontChanged);
        }
    }

    // === Deferred work ===

    /// Schedule a coalesced re-initialization; only the last request in a
    /// burst runs.
    pub fn initialize_document_later(&mut self) {
        self.scheduler.request_initialize(Instant::now());
    }

    pub fn is_initialize_pending(&self) -> bool {
        self.scheduler.is_initialize_pending()
    }

    /// When `tick` next has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.next_deadline(Instant::now())
    }

    /// Run deferred work due at `now`, then handle what it caused.
    pub fn tick(&mut self, now: Instant) {
        for task in self.scheduler.tick(now) {
            match task {
                DeferredTask::CursorFix { element } => {
                    if let Err(err) = self.finish_cursor_fix(element) {
                        tracing::debug!(target: "slugline::binder", %err, "cursor fix skipped");
                    }
                    self.process_notifications();
                }
                DeferredTask::InitializeDocument => self.initialize_document(),
            }
        }
    }

    // === Shared helpers ===

    fn linkage_for(scene: &Scene, element: ElementId) -> BlockLinkage {
        BlockLinkage {
            scene: scene.id(),
            element,
        }
    }

    /// The element a linkage points at, if it is alive in `scene`.
    fn resolve_linkage(scene: &Scene, linkage: Option<BlockLinkage>) -> Option<ElementId> {
        let linkage = linkage?;
        if linkage.scene != scene.id() || !scene.contains(linkage.element) {
            return None;
        }
        Some(linkage.element)
    }

    /// Index of the block linked to `element`, trying `guess` first.
    fn find_block_for(
        document: &TextDocument,
        element: ElementId,
        guess: Option<usize>,
    ) -> Option<usize> {
        let linked = |index: usize| {
            document
                .block(index)
                .and_then(|b| b.linkage())
                .is_some_and(|l| l.element == element)
        };
        if let Some(index) = guess.filter(|i| linked(*i)) {
            return Some(index);
        }
        (0..document.block_count()).find(|i| linked(*i))
    }
}

impl Drop for Binder {
    fn drop(&mut self) {
        self.detach_all();
    }
}
