//! Cursor tracking, the current element and tab re-typing.

use crate::block::Block;
use crate::element::{ElementId, ElementType};
use crate::error::BindError;
use crate::format::Font;
use crate::hints;
use crate::text::TextBuffer;

use super::{Binder, BinderEvent, BinderState, Bound};

impl Binder {
    /// Track the view's cursor.
    ///
    /// Offsets past the end of the document, and any request made while the
    /// document is being rebuilt, are ignored. An unlinked block under the
    /// cursor triggers a resynchronization first.
    pub fn set_cursor_position(&mut self, offset: usize) {
        if self.state == BinderState::Initializing {
            return;
        }
        let Ok(b) = self.bound() else {
            if self.cursor_position.take().is_some() {
                self.current_element_cursor_position = None;
                self.emit(BinderEvent::CursorPositionChanged);
            }
            return;
        };
        if self.cursor_position == Some(offset) {
            return;
        }

        let (located, empty) = {
            let doc = b.document.borrow();
            (doc.find_block(offset), doc.is_empty())
        };
        let Some((index, local)) = located else {
            tracing::trace!(target: "slugline::binder", offset, "cursor position out of range");
            return;
        };

        self.cursor_position = Some(offset);
        self.current_element_cursor_position = None;
        self.tab_history.clear();
        if empty {
            self.emit(BinderEvent::CursorPositionChanged);
            return;
        }

        if !self.block_is_linked(&b, index) {
            self.resynchronize_from_buffer(None);
        }

        let (element, text) = {
            let scene = b.scene.borrow();
            let doc = b.document.borrow();
            let linkage = doc.block(index).and_then(Block::linkage);
            (
                Self::resolve_linkage(&scene, linkage),
                doc.block_text(index).unwrap_or_default(),
            )
        };
        match element {
            Some(id) => {
                self.set_current_element(Some(id));
                if !self.auto_complete_hints.is_empty() {
                    self.set_completion_prefix(&text);
                }
            }
            None => {
                tracing::warn!(
                    target: "slugline::binder",
                    offset,
                    "cursor block is not backed by an element"
                );
                self.set_current_element(None);
            }
        }

        self.current_element_cursor_position = Some(local);
        self.emit(BinderEvent::CursorPositionChanged);
    }

    pub(super) fn set_current_element(&mut self, element: Option<ElementId>) {
        if self.current_element == element {
            return;
        }
        self.current_element = element;
        self.emit(BinderEvent::CurrentElementChanged);

        self.tab_history.clear();
        self.evaluate_auto_complete_hints();

        self.emit(BinderEvent::CurrentFontChanged);
    }

    fn current_element_type(&self) -> Option<ElementType> {
        let id = self.current_element?;
        let scene = self.scene()?.borrow();
        scene.element(id).map(|e| e.element_type())
    }

    pub(super) fn evaluate_auto_complete_hints(&mut self) {
        let hints = hints::hints_for(self.current_element_type(), &self.character_names);
        if hints == self.auto_complete_hints {
            return;
        }
        self.auto_complete_hints = hints;
        self.emit(BinderEvent::AutoCompleteHintsChanged);
    }

    fn set_completion_prefix(&mut self, block_text: &str) {
        let Some(prefix) = hints::completion_prefix(&self.auto_complete_hints, block_text) else {
            return;
        };
        if prefix == self.completion_prefix {
            return;
        }
        self.completion_prefix = prefix;
        self.emit(BinderEvent::CompletionPrefixChanged);
    }

    // === Tab ===

    /// Re-type the current element by the tab cycle.
    ///
    /// A character cue tabs to a transition or back to action depending on
    /// the configured rule and whether a tab already happened in this burst.
    pub fn tab(&mut self) {
        let (Some(id), Some(_)) = (self.current_element, self.cursor_position) else {
            return;
        };
        let Ok(b) = self.bound() else {
            return;
        };

        let current = {
            let scene = b.scene.borrow();
            if !scene.contains(id) {
                return;
            }
            match scene.element(id) {
                Some(element) => element.element_type(),
                None => return,
            }
        };
        let tabbed_before = !self.tab_history.is_empty();
        let next = match current {
            ElementType::Action => ElementType::Character,
            ElementType::Character
                if self
                    .config
                    .character_tab_rule
                    .prefers_transition(tabbed_before) =>
            {
                ElementType::Transition
            }
            ElementType::Character => ElementType::Action,
            ElementType::Dialogue => ElementType::Parenthetical,
            ElementType::Parenthetical => ElementType::Dialogue,
            ElementType::Shot => ElementType::Transition,
            ElementType::Transition => ElementType::Action,
            ElementType::Heading => ElementType::Heading,
        };

        if next != current {
            tracing::trace!(target: "slugline::binder", %id, from = %current, to = %next, "tab");
            b.scene.borrow_mut().set_element_type(id, next);
            self.process_notifications();
        }
        self.tab_history.push(next);
    }

    /// Reverse tab. Deliberately does nothing.
    pub fn backtab(&mut self) {
        tracing::trace!(target: "slugline::binder", "backtab is not supported");
    }

    /// The placeholder keeps an empty block's cursor anchored across a
    /// format change; it is removed on the next tick.
    pub(super) fn insert_cursor_placeholder(
        &mut self,
        b: &Bound,
        index: usize,
        element: ElementId,
    ) {
        {
            let mut doc = b.document.borrow_mut();
            let Some(range) = doc.block_range(index) else {
                return;
            };
            if !range.is_empty() {
                return;
            }
            doc.insert(range.start, "(");
        }
        self.scheduler.schedule_cursor_fix(element);
    }

    /// Remove the placeholder. An empty parenthetical is seeded with `()`
    /// and the cursor asked to sit between the parens.
    pub(super) fn finish_cursor_fix(&mut self, element: ElementId) -> Result<(), BindError> {
        let b = self.bound()?;
        let position = {
            let scene = b.scene.borrow();
            let mut doc = b.document.borrow_mut();
            let index = Self::find_block_for(&doc, element, scene.index_of(element))
                .ok_or(BindError::ElementNotInScene(element))?;
            let count = doc.block_count();
            let start = doc
                .block_position(index)
                .ok_or(BindError::BlockOutOfRange { index, count })?;
            if doc.char_at(start) == Some('(') {
                doc.delete(start..start + 1);
            }

            let parenthetical = scene
                .element(element)
                .is_some_and(|e| e.element_type() == ElementType::Parenthetical);
            if parenthetical && doc.block(index).is_some_and(Block::is_empty) {
                doc.insert(start, "()");
                start + 1
            } else {
                start
            }
        };
        self.emit(BinderEvent::RequestCursorPosition(position));
        Ok(())
    }

    // === Cursor queries ===

    fn cursor_block(&self) -> Option<(Bound, usize)> {
        let offset = self.cursor_position?;
        let b = self.bound().ok()?;
        let (index, _) = b.document.borrow().find_block(offset)?;
        Some((b, index))
    }

    /// True if there is a block above the cursor's block.
    pub fn can_go_up(&self) -> bool {
        self.cursor_block().is_some_and(|(_, index)| index > 0)
    }

    /// True if there is a block below the cursor's block.
    pub fn can_go_down(&self) -> bool {
        self.cursor_block().is_some_and(|(b, index)| {
            let count = b.document.borrow().block_count();
            index + 1 < count
        })
    }

    /// Offset of the end of the document, or 0 without a cursor.
    pub fn last_cursor_position(&self) -> usize {
        match (self.cursor_position, self.document()) {
            (Some(_), Some(doc)) => doc.borrow().len_chars(),
            _ => 0,
        }
    }

    /// The cursor if it lies in block `block`, otherwise the end of that block.
    pub fn cursor_position_at_block(&self, block: usize) -> Option<usize> {
        let doc = self.document()?.borrow();
        let range = doc.block_range(block)?;
        match self.cursor_position {
            Some(cursor) if cursor >= range.start && cursor <= range.end => Some(cursor),
            _ => Some(range.end),
        }
    }

    /// Font of the character before the cursor.
    pub fn current_font(&self) -> Option<Font> {
        let doc = self.document()?.borrow();
        let offset = self.cursor_position.unwrap_or(0);
        doc.char_format_at(offset).map(|format| format.font())
    }
}
