//! Scene ⇄ document synchronization.

use std::collections::HashSet;

use crate::block::Block;
use crate::document::TextDocument;
use crate::element::{ChangeKind, ElementId, ElementType};
use crate::error::BindError;
use crate::text::TextBuffer;

use super::{Binder, BinderEvent, BinderState, Bound, quietly};

impl Binder {
    /// Rebuild the document from the scene: one linked block per element,
    /// in scene order, each holding the element's text verbatim.
    pub fn initialize_document(&mut self) {
        let Ok(b) = self.bound() else {
            tracing::debug!(target: "slugline::binder", "initialize skipped, binder not bound");
            return;
        };

        self.state = BinderState::Initializing;
        self.scheduler.cancel_initialize();
        self.tab_history.clear();

        let element_count = {
            let scene = b.scene.borrow();
            let mut doc = b.document.borrow_mut();
            let was_blocked = doc.set_signals_blocked(true);
            doc.clear();
            for (i, element) in scene.elements().enumerate() {
                let index = if i == 0 {
                    doc.insert(0, element.text());
                    0
                } else {
                    doc.push_block(element.text())
                };
                doc.set_block_linkage(index, Some(Self::linkage_for(&scene, element.id())));
            }
            doc.set_signals_blocked(was_blocked);
            scene.len()
        };

        // The scene is the source of truth now; anything still queued
        // describes a state that no longer exists.
        if let Some(attached) = &self.scene {
            attached.discard_pending();
        }
        if let Some(attached) = &self.document {
            attached.discard_pending();
        }

        let current_alive = self
            .current_element
            .is_some_and(|id| b.scene.borrow().contains(id));
        if !current_alive {
            self.set_current_element(None);
        }
        if self.cursor_position.unwrap_or(0) == 0
            && self.current_element.is_none()
            && element_count == 1
        {
            let first = b.scene.borrow().id_at(0);
            self.set_current_element(first);
        }

        self.document_load_count += 1;
        self.emit(BinderEvent::DocumentLoadCountChanged);

        self.state = BinderState::Ready;
        self.highlight_all();

        tracing::debug!(
            target: "slugline::binder",
            elements = element_count,
            load_count = self.document_load_count,
            "document initialized"
        );
        self.emit(BinderEvent::DocumentInitialized);
    }

    /// Text typed into a block flows into its linked element.
    pub(super) fn on_buffer_changed(&mut self, from: usize, removed: usize, added: usize) {
        let Ok(b) = self.bound() else {
            return;
        };
        tracing::trace!(target: "slugline::binder", from, removed, added, "buffer changed");

        match self.push_block_text(&b, from) {
            Ok(()) => {
                self.tab_history.clear();
                self.highlight_range(&b, from, from + added);
            }
            Err(BindError::MissingLinkage(index)) => {
                tracing::debug!(
                    target: "slugline::binder",
                    index,
                    "edited block is unlinked, resynchronizing"
                );
                self.resynchronize_from_buffer(None);
            }
            Err(err) => {
                tracing::warn!(target: "slugline::binder", %err, "buffer change not applied");
            }
        }
    }

    fn push_block_text(&mut self, b: &Bound, offset: usize) -> Result<(), BindError> {
        let (element, text) = {
            let doc = b.document.borrow();
            let scene = b.scene.borrow();
            let len = doc.len_chars();
            let (index, _) = doc
                .find_block(offset)
                .ok_or(BindError::OffsetOutOfRange { offset, len })?;
            let linkage = doc.block(index).and_then(Block::linkage);
            let element =
                Self::resolve_linkage(&scene, linkage).ok_or(BindError::MissingLinkage(index))?;
            (element, doc.block_text(index).unwrap_or_default())
        };
        quietly(&b.scene, b.scene_subscription, |scene| {
            scene.set_element_text(element, &text)
        });
        Ok(())
    }

    /// Walk every block and make the scene match the document.
    ///
    /// Unlinked blocks get a fresh element whose type follows the previous
    /// element's type; elements whose blocks are gone are dropped. The whole
    /// walk is one undo step. `block_count_hint` is informational.
    pub fn resynchronize_from_buffer(&mut self, block_count_hint: Option<usize>) {
        if self.is_suppressing() {
            return;
        }
        let Ok(b) = self.bound() else {
            return;
        };

        let (created, count) = {
            let mut doc = b.document.borrow_mut();
            let count = doc.block_count();
            if block_count_hint.is_some_and(|hint| hint != count) {
                tracing::trace!(target: "slugline::binder", ?block_count_hint, count, "stale block count hint");
            }

            quietly(&b.scene, b.scene_subscription, |scene| {
                scene.begin_undo_capture();
                let mut ids = Vec::with_capacity(count);
                let mut seen = HashSet::with_capacity(count);
                let mut previous: Option<ElementType> = None;
                let mut created = 0;

                for index in 0..count {
                    let text = doc.block_text(index).unwrap_or_default();
                    let linkage = doc.block(index).and_then(Block::linkage);
                    let linked =
                        Self::resolve_linkage(scene, linkage).filter(|id| !seen.contains(id));
                    let id = match linked {
                        Some(id) => {
                            scene.set_element_text(id, &text);
                            id
                        }
                        None => {
                            let id = scene.create_element(ElementType::successor(previous), &text);
                            doc.set_block_linkage(index, Some(Self::linkage_for(scene, id)));
                            if let Some(block) = doc.block_mut(index) {
                                block.user_data_mut().reset_format();
                            }
                            created += 1;
                            id
                        }
                    };
                    previous = scene.element(id).map(|e| e.element_type());
                    seen.insert(id);
                    ids.push(id);
                }

                scene.set_elements_list(ids);
                scene.end_undo_capture();
                (created, count)
            })
        };

        tracing::debug!(
            target: "slugline::binder",
            blocks = count,
            created,
            "scene resynchronized from buffer"
        );

        if let Some(id) = self.current_element {
            if !b.scene.borrow().contains(id) {
                self.set_current_element(None);
            }
        }
        self.highlight_all();
    }

    /// Element type changes reformat the linked block. Text changes came from
    /// the buffer in the first place and are not echoed back.
    pub(super) fn on_scene_element_changed(&mut self, id: ElementId, kind: ChangeKind) {
        if self.config.force_sync_document {
            self.initialize_document_later();
        }
        if kind != ChangeKind::Type {
            return;
        }
        if self.current_element == Some(id) {
            self.evaluate_auto_complete_hints();
        }
        let Ok(b) = self.bound() else {
            return;
        };

        let found = {
            let scene = b.scene.borrow();
            let Some(element) = scene.element(id) else {
                tracing::debug!(target: "slugline::binder", %id, "changed element no longer exists");
                return;
            };
            let mut doc = b.document.borrow_mut();
            let found = Self::find_block_for(&doc, id, scene.index_of(id));
            if let Some(block) = found.and_then(|index| doc.block_mut(index)) {
                block.user_data_mut().reset_format();
            }
            found.map(|index| (index, element.text().is_empty()))
        };
        let Some((index, empty)) = found else {
            tracing::debug!(target: "slugline::binder", %id, "no block for changed element");
            return;
        };

        if let Err(err) = self.highlight_block(&b, index) {
            tracing::debug!(target: "slugline::binder", %err, "reformat after type change failed");
        }

        if empty {
            self.insert_cursor_placeholder(&b, index, id);
        }
    }

    /// An element inserted by a collaborator. A lone insertion into an
    /// otherwise consistent document is patched in place.
    pub(super) fn on_element_inserted(&mut self, id: ElementId, index: usize) {
        match self.patch_inserted(id, index) {
            Ok(true) => {}
            Ok(false) => self.initialize_document_later(),
            Err(err) => {
                tracing::debug!(target: "slugline::binder", %err, "insertion not patched");
                self.initialize_document_later();
            }
        }
    }

    fn patch_inserted(&mut self, id: ElementId, index: usize) -> Result<bool, BindError> {
        let b = self.bound()?;
        let touched = {
            let scene = b.scene.borrow();
            let mut doc = b.document.borrow_mut();
            if Self::find_block_for(&doc, id, Some(index)).is_some() {
                return Ok(true);
            }
            if scene.index_of(id) != Some(index) {
                return Ok(false);
            }
            let element = scene.element(id).ok_or(BindError::ElementNotInScene(id))?;
            let text = element.text().to_owned();
            let linkage = Some(Self::linkage_for(&scene, id));
            let linked_to = |doc: &TextDocument, block: usize| {
                Self::resolve_linkage(&scene, doc.block(block).and_then(Block::linkage))
            };

            let placeholder = scene.len() == 1
                && doc.block_count() == 1
                && doc.is_empty()
                && linked_to(&*doc, 0).is_none();
            if !placeholder && doc.block_count() + 1 != scene.len() {
                return Ok(false);
            }

            let mark = doc.notifier_mut().mark(b.document_subscription);
            let touched = if placeholder {
                doc.insert(0, &text);
                vec![0]
            } else if index == 0 {
                if linked_to(&*doc, 0) != scene.id_at(1) {
                    return Ok(false);
                }
                let displaced = doc.block(0).and_then(Block::linkage);
                doc.insert(0, &format!("{text}\n"));
                doc.set_block_linkage(1, displaced);
                vec![0, 1]
            } else {
                if linked_to(&*doc, index - 1) != scene.id_at(index - 1) {
                    return Ok(false);
                }
                let count = doc.block_count();
                let end = doc
                    .block_range(index - 1)
                    .ok_or(BindError::BlockOutOfRange {
                        index: index - 1,
                        count,
                    })?
                    .end;
                doc.insert(end, &format!("\n{text}"));
                vec![index]
            };
            doc.set_block_linkage(touched[0], linkage);
            for &block in &touched {
                if let Some(block) = doc.block_mut(block) {
                    block.user_data_mut().reset_format();
                }
            }
            doc.notifier_mut()
                .discard_since(b.document_subscription, mark);
            touched
        };

        tracing::debug!(target: "slugline::binder", %id, index, "patched element insertion");
        for block in touched {
            if let Err(err) = self.highlight_block(&b, block) {
                tracing::debug!(target: "slugline::binder", %err, "reformat after insertion failed");
            }
        }
        Ok(true)
    }

    /// An element removed by a collaborator. Its block goes with it.
    pub(super) fn on_element_removed(&mut self, id: ElementId, index: usize) {
        if self.current_element == Some(id) {
            self.set_current_element(None);
        }
        match self.patch_removed(id, index) {
            Ok(true) => {}
            Ok(false) => self.initialize_document_later(),
            Err(err) => {
                tracing::debug!(target: "slugline::binder", %err, "removal not patched");
                self.initialize_document_later();
            }
        }
    }

    fn patch_removed(&mut self, id: ElementId, index: usize) -> Result<bool, BindError> {
        let b = self.bound()?;
        let first_block = {
            let scene = b.scene.borrow();
            let mut doc = b.document.borrow_mut();
            let count = doc.block_count();
            let Some(block) = Self::find_block_for(&doc, id, Some(index)) else {
                return Ok(count == scene.len().max(1));
            };
            if count != scene.len() + 1 && !(count == 1 && scene.is_empty()) {
                return Ok(false);
            }

            let range = doc
                .block_range(block)
                .ok_or(BindError::BlockOutOfRange { index: block, count })?;
            let mark = doc.notifier_mut().mark(b.document_subscription);
            if count == 1 {
                doc.delete(range);
                doc.set_block_linkage(0, None);
            } else if block == 0 {
                let survivor = doc.block(1).and_then(Block::linkage);
                doc.delete(range.start..range.end + 1);
                doc.set_block_linkage(0, survivor);
                if let Some(first) = doc.block_mut(0) {
                    first.user_data_mut().reset_format();
                }
            } else {
                doc.delete(range.start - 1..range.end);
            }
            doc.notifier_mut()
                .discard_since(b.document_subscription, mark);
            block == 0 && count > 1
        };

        tracing::debug!(target: "slugline::binder", %id, index, "patched element removal");
        if first_block {
            if let Err(err) = self.highlight_block(&b, 0) {
                tracing::debug!(target: "slugline::binder", %err, "reformat after removal failed");
            }
        }
        Ok(true)
    }

    pub(super) fn on_scene_about_to_reset(&mut self) {
        tracing::debug!(target: "slugline::binder", "scene about to reset");
        self.state = BinderState::Resetting;
    }

    /// The scene was replaced wholesale: rebuild, then ask the view to put
    /// the cursor back, clamped into the new document.
    pub(super) fn on_scene_reset(&mut self, position: Option<usize>) {
        if !self.is_bound() {
            self.state = BinderState::Unbound;
            return;
        }
        self.initialize_document();

        if let Some(position) = position {
            let len = self
                .document()
                .map(|doc| doc.borrow().len_chars())
                .unwrap_or(0);
            self.emit(BinderEvent::RequestCursorPosition(position.min(len)));
        }
    }
}
