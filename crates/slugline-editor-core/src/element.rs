//! Screenplay elements and the handles that address them.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// The fixed screenplay line categories.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum ElementType {
    Heading,
    #[default]
    Action,
    Character,
    Dialogue,
    Parenthetical,
    Shot,
    Transition,
}

impl ElementType {
    /// All types, in index order.
    pub const ALL: [ElementType; 7] = [
        ElementType::Heading,
        ElementType::Action,
        ElementType::Character,
        ElementType::Dialogue,
        ElementType::Parenthetical,
        ElementType::Shot,
        ElementType::Transition,
    ];

    pub const COUNT: usize = Self::ALL.len();

    /// Normalize any integer into a type by wrapping around.
    ///
    /// Negative values wrap from the end, so `-1` is `Transition`.
    pub fn from_index(index: i64) -> Self {
        let wrapped = index.rem_euclid(Self::COUNT as i64) as usize;
        Self::ALL[wrapped]
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Type given to a line created right after an element of type `previous`.
    ///
    /// After a character cue the next line is dialogue, after dialogue comes
    /// the next cue, and so on. `None` (no predecessor) yields `Action`.
    pub fn successor(previous: Option<ElementType>) -> Self {
        match previous {
            Some(ElementType::Character) => ElementType::Dialogue,
            Some(ElementType::Dialogue) => ElementType::Character,
            Some(ElementType::Parenthetical) => ElementType::Dialogue,
            Some(ElementType::Action)
            | Some(ElementType::Shot)
            | Some(ElementType::Transition)
            | Some(ElementType::Heading)
            | None => ElementType::Action,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ElementType::Heading => "Heading",
            ElementType::Action => "Action",
            ElementType::Character => "Character",
            ElementType::Dialogue => "Dialogue",
            ElementType::Parenthetical => "Parenthetical",
            ElementType::Shot => "Shot",
            ElementType::Transition => "Transition",
        }
    }
}

impl std::fmt::Display for ElementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Generational handle into a scene's element arena.
///
/// Handles are never dereferenced blindly: a handle whose element has been
/// removed resolves to `None` because the slot's generation moved on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl ElementId {
    pub fn slot(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "e{}v{}", self.index, self.generation)
    }
}

/// One line of a screenplay scene.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneElement {
    id: ElementId,
    element_type: ElementType,
    text: SmolStr,
}

impl SceneElement {
    pub(crate) fn new(id: ElementId, element_type: ElementType, text: SmolStr) -> Self {
        Self {
            id,
            element_type,
            text,
        }
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub(crate) fn set_type(&mut self, element_type: ElementType) -> bool {
        if self.element_type == element_type {
            return false;
        }
        self.element_type = element_type;
        true
    }

    pub(crate) fn set_text(&mut self, text: &str) -> bool {
        if self.text == text {
            return false;
        }
        self.text = SmolStr::new(text);
        true
    }
}

/// What changed on an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Text,
    Type,
}
