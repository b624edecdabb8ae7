//! The scene model: an ordered list of screenplay elements.
//!
//! Elements live in a generational arena; the scene's reading order is a
//! separate list of handles. Removing an element frees its slot and bumps the
//! slot generation, so handles held elsewhere (block linkages) go stale
//! instead of dangling.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use smol_str::SmolStr;

use crate::element::{ChangeKind, ElementId, ElementType, SceneElement};
use crate::notify::{Notifier, Observable};
use crate::undo::{SceneSnapshot, UndoManager, UndoStack};

/// Shared handle to a scene, as bound by the binder and its collaborators.
pub type SharedScene = Rc<RefCell<Scene>>;

static NEXT_SCENE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SceneId(u64);

/// Notifications emitted by a scene.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneEvent {
    ElementChanged { id: ElementId, kind: ChangeKind },
    ElementInserted { id: ElementId, index: usize },
    ElementAboutToBeRemoved { id: ElementId, index: usize },
    ElementMoved { id: ElementId, from: usize, to: usize },
    /// The element order was replaced in one step.
    ElementsReplaced,
    AboutToReset,
    Reset { cursor_position: Option<usize> },
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    element: Option<SceneElement>,
}

/// An ordered sequence of screenplay elements.
#[derive(Debug)]
pub struct Scene {
    id: SceneId,
    slots: Vec<Slot>,
    free: Vec<u32>,
    order: Vec<ElementId>,
    notifier: Notifier<SceneEvent>,
    undo: UndoStack,
    capture_depth: usize,
    capture_before: Option<SceneSnapshot>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        Self {
            id: SceneId(NEXT_SCENE_ID.fetch_add(1, Ordering::Relaxed)),
            slots: Vec::new(),
            free: Vec::new(),
            order: Vec::new(),
            notifier: Notifier::new(),
            undo: UndoStack::new(100),
            capture_depth: 0,
            capture_before: None,
        }
    }

    /// Build a scene from `(type, text)` pairs, in order.
    pub fn from_elements<'a>(elements: impl IntoIterator<Item = (ElementType, &'a str)>) -> Self {
        let mut scene = Self::new();
        for (ty, text) in elements {
            scene.append_element(ty, text);
        }
        scene
    }

    pub fn into_shared(self) -> SharedScene {
        Rc::new(RefCell::new(self))
    }

    pub fn id(&self) -> SceneId {
        self.id
    }

    pub fn notifier(&self) -> &Notifier<SceneEvent> {
        &self.notifier
    }

    pub fn notifier_mut(&mut self) -> &mut Notifier<SceneEvent> {
        &mut self.notifier
    }

    // === Lookup ===

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Resolve a handle. Stale handles and detached elements both resolve,
    /// as long as the element has not been destroyed.
    pub fn element(&self, id: ElementId) -> Option<&SceneElement> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.element.as_ref()
    }

    fn element_mut(&mut self, id: ElementId) -> Option<&mut SceneElement> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.element.as_mut()
    }

    /// True if the element is alive and part of the reading order.
    pub fn contains(&self, id: ElementId) -> bool {
        self.element(id).is_some() && self.order.contains(&id)
    }

    pub fn index_of(&self, id: ElementId) -> Option<usize> {
        self.order.iter().position(|e| *e == id)
    }

    pub fn element_at(&self, index: usize) -> Option<&SceneElement> {
        self.order.get(index).and_then(|id| self.element(*id))
    }

    pub fn id_at(&self, index: usize) -> Option<ElementId> {
        self.order.get(index).copied()
    }

    pub fn element_ids(&self) -> &[ElementId] {
        &self.order
    }

    pub fn elements(&self) -> impl Iterator<Item = &SceneElement> + '_ {
        self.order.iter().filter_map(|id| self.element(*id))
    }

    // === Structural edits ===

    /// Allocate an element that is not (yet) part of the reading order.
    pub fn create_element(&mut self, element_type: ElementType, text: &str) -> ElementId {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    element: None,
                });
                (self.slots.len() - 1) as u32
            }
        };
        let slot = &mut self.slots[index as usize];
        let id = ElementId {
            index,
            generation: slot.generation,
        };
        slot.element = Some(SceneElement::new(id, element_type, SmolStr::new(text)));
        id
    }

    fn destroy_element(&mut self, id: ElementId) {
        if let Some(slot) = self.slots.get_mut(id.index as usize) {
            if slot.generation == id.generation && slot.element.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(id.index);
            }
        }
    }

    pub fn append_element(&mut self, element_type: ElementType, text: &str) -> ElementId {
        let index = self.order.len();
        self.insert_element_at(index, element_type, text)
    }

    /// Create and insert an element; `index` is clamped to the scene length.
    pub fn insert_element_at(
        &mut self,
        index: usize,
        element_type: ElementType,
        text: &str,
    ) -> ElementId {
        let id = self.create_element(element_type, text);
        let index = index.min(self.order.len());
        self.order.insert(index, id);
        self.notifier.emit(SceneEvent::ElementInserted { id, index });
        id
    }

    /// Insert right after `after`, or at the end if `after` is not in the scene.
    pub fn insert_element_after(
        &mut self,
        after: ElementId,
        element_type: ElementType,
        text: &str,
    ) -> ElementId {
        let index = self
            .index_of(after)
            .map(|i| i + 1)
            .unwrap_or(self.order.len());
        self.insert_element_at(index, element_type, text)
    }

    pub fn remove_element(&mut self, id: ElementId) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        self.notifier
            .emit(SceneEvent::ElementAboutToBeRemoved { id, index });
        self.order.remove(index);
        self.destroy_element(id);
        true
    }

    pub fn move_element(&mut self, from: usize, to: usize) -> bool {
        if from >= self.order.len() || to >= self.order.len() || from == to {
            return false;
        }
        let id = self.order.remove(from);
        self.order.insert(to, id);
        self.notifier.emit(SceneEvent::ElementMoved { id, from, to });
        true
    }

    /// Replace the reading order in one step.
    ///
    /// Elements in the old order that are missing from `ids` are destroyed.
    /// Dead or duplicate handles in `ids` are skipped.
    pub fn set_elements_list(&mut self, ids: Vec<ElementId>) {
        let mut new_order = Vec::with_capacity(ids.len());
        for id in ids {
            if self.element(id).is_some() && !new_order.contains(&id) {
                new_order.push(id);
            }
        }
        if new_order == self.order {
            return;
        }

        let dropped: Vec<(usize, ElementId)> = self
            .order
            .iter()
            .enumerate()
            .filter(|(_, id)| !new_order.contains(id))
            .map(|(i, id)| (i, *id))
            .collect();
        for (index, id) in &dropped {
            self.notifier.emit(SceneEvent::ElementAboutToBeRemoved {
                id: *id,
                index: *index,
            });
        }

        self.order = new_order;
        for (_, id) in dropped {
            self.destroy_element(id);
        }
        self.notifier.emit(SceneEvent::ElementsReplaced);
    }

    /// Replace every element wholesale.
    ///
    /// Emits `AboutToReset` before the change and `Reset` after it; existing
    /// handles all go stale.
    pub fn reset_elements<S: AsRef<str>>(
        &mut self,
        elements: impl IntoIterator<Item = (ElementType, S)>,
        cursor_position: Option<usize>,
    ) {
        self.notifier.emit(SceneEvent::AboutToReset);
        for id in std::mem::take(&mut self.order) {
            self.destroy_element(id);
        }
        for (ty, text) in elements {
            let id = self.create_element(ty, text.as_ref());
            self.order.push(id);
        }
        self.notifier.emit(SceneEvent::Reset { cursor_position });
    }

    // === Element edits ===

    pub fn set_element_text(&mut self, id: ElementId, text: &str) -> bool {
        let changed = self
            .element_mut(id)
            .map(|e| e.set_text(text))
            .unwrap_or(false);
        if changed {
            self.notifier.emit(SceneEvent::ElementChanged {
                id,
                kind: ChangeKind::Text,
            });
        }
        changed
    }

    pub fn set_element_type(&mut self, id: ElementId, element_type: ElementType) -> bool {
        let changed = self
            .element_mut(id)
            .map(|e| e.set_type(element_type))
            .unwrap_or(false);
        if changed {
            self.notifier.emit(SceneEvent::ElementChanged {
                id,
                kind: ChangeKind::Type,
            });
        }
        changed
    }

    // === Undo capture ===

    /// Open an undo transaction. Nested calls join the outermost one.
    pub fn begin_undo_capture(&mut self) {
        if self.capture_depth == 0 {
            self.capture_before = Some(self.snapshot());
        }
        self.capture_depth += 1;
    }

    /// Close an undo transaction, recording it if the scene changed.
    pub fn end_undo_capture(&mut self) {
        if self.capture_depth == 0 {
            tracing::warn!(target: "slugline::scene", "end_undo_capture without begin");
            return;
        }
        self.capture_depth -= 1;
        if self.capture_depth > 0 {
            return;
        }
        if let Some(before) = self.capture_before.take() {
            let after = self.snapshot();
            if before != after {
                self.undo.record(before, after);
            }
        }
    }

    pub fn is_capturing_undo(&self) -> bool {
        self.capture_depth > 0
    }

    pub fn snapshot(&self) -> SceneSnapshot {
        SceneSnapshot::new(
            self.elements()
                .map(|e| (e.element_type(), SmolStr::new(e.text())))
                .collect(),
        )
    }

    fn restore(&mut self, snapshot: &SceneSnapshot) {
        self.reset_elements(
            snapshot
                .elements()
                .iter()
                .map(|(ty, text)| (*ty, text.clone())),
            None,
        );
    }
}

impl UndoManager for Scene {
    fn can_undo(&self) -> bool {
        self.undo.can_undo()
    }

    fn can_redo(&self) -> bool {
        self.undo.can_redo()
    }

    fn undo(&mut self) -> bool {
        let Some(snapshot) = self.undo.undo() else {
            return false;
        };
        self.restore(&snapshot);
        true
    }

    fn redo(&mut self) -> bool {
        let Some(snapshot) = self.undo.redo() else {
            return false;
        };
        self.restore(&snapshot);
        true
    }

    fn clear_history(&mut self) {
        self.undo.clear();
    }
}

impl Observable for Scene {
    type Event = SceneEvent;

    fn notifier_mut(&mut self) -> &mut Notifier<SceneEvent> {
        &mut self.notifier
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(scene: &Scene) -> Vec<String> {
        scene.elements().map(|e| e.text().to_string()).collect()
    }

    #[test]
    fn test_stale_handle_resolves_to_none() {
        let mut scene = Scene::from_elements([(ElementType::Action, "a")]);
        let id = scene.id_at(0).unwrap();
        assert!(scene.remove_element(id));
        assert!(scene.element(id).is_none());

        // Slot gets reused with a new generation.
        let fresh = scene.append_element(ElementType::Dialogue, "b");
        assert_eq!(fresh.slot(), id.slot());
        assert_ne!(fresh, id);
        assert!(scene.element(id).is_none());
        assert_eq!(scene.element(fresh).unwrap().text(), "b");
    }

    #[test]
    fn test_insert_after_and_move() {
        let mut scene = Scene::new();
        let a = scene.append_element(ElementType::Action, "a");
        let _c = scene.append_element(ElementType::Action, "c");
        scene.insert_element_after(a, ElementType::Action, "b");
        assert_eq!(texts(&scene), ["a", "b", "c"]);

        assert!(scene.move_element(0, 2));
        assert_eq!(texts(&scene), ["b", "c", "a"]);
        assert!(!scene.move_element(0, 3));
    }

    #[test]
    fn test_set_elements_list_destroys_dropped() {
        let mut scene = Scene::from_elements([
            (ElementType::Character, "BOB"),
            (ElementType::Dialogue, "Hi."),
        ]);
        let sub = scene.notifier_mut().subscribe();
        let bob = scene.id_at(0).unwrap();
        let line = scene.id_at(1).unwrap();
        let extra = scene.create_element(ElementType::Action, "new");

        scene.set_elements_list(vec![bob, extra, bob]);
        assert_eq!(texts(&scene), ["BOB", "new"]);
        assert!(scene.element(line).is_none());

        let events = scene.notifier_mut().drain(sub);
        assert_eq!(
            events,
            vec![
                SceneEvent::ElementAboutToBeRemoved { id: line, index: 1 },
                SceneEvent::ElementsReplaced,
            ]
        );
    }

    #[test]
    fn test_change_events_only_on_real_change() {
        let mut scene = Scene::from_elements([(ElementType::Action, "a")]);
        let sub = scene.notifier_mut().subscribe();
        let id = scene.id_at(0).unwrap();

        assert!(!scene.set_element_text(id, "a"));
        assert!(scene.set_element_text(id, "ab"));
        assert!(scene.set_element_type(id, ElementType::Shot));
        assert!(!scene.set_element_type(id, ElementType::Shot));

        assert_eq!(
            scene.notifier_mut().drain(sub),
            vec![
                SceneEvent::ElementChanged {
                    id,
                    kind: ChangeKind::Text
                },
                SceneEvent::ElementChanged {
                    id,
                    kind: ChangeKind::Type
                },
            ]
        );
    }

    #[test]
    fn test_undo_capture_records_one_transaction() {
        let mut scene = Scene::from_elements([(ElementType::Action, "a")]);
        scene.begin_undo_capture();
        scene.begin_undo_capture();
        scene.append_element(ElementType::Action, "b");
        scene.end_undo_capture();
        scene.append_element(ElementType::Action, "c");
        scene.end_undo_capture();

        assert!(scene.can_undo());
        assert!(scene.undo());
        assert_eq!(texts(&scene), ["a"]);
        assert!(!scene.can_undo());

        assert!(scene.redo());
        assert_eq!(texts(&scene), ["a", "b", "c"]);
    }

    #[test]
    fn test_reset_emits_bracketing_events() {
        let mut scene = Scene::from_elements([(ElementType::Action, "a")]);
        let sub = scene.notifier_mut().subscribe();
        scene.reset_elements([(ElementType::Heading, "INT. ROOM")], Some(3));

        assert_eq!(
            scene.notifier_mut().drain(sub),
            vec![
                SceneEvent::AboutToReset,
                SceneEvent::Reset {
                    cursor_position: Some(3)
                },
            ]
        );
        assert_eq!(texts(&scene), ["INT. ROOM"]);
    }
}
