//! slugline-editor-core: the scene/document binder of a screenplay editor.
//!
//! This crate provides:
//! - `Scene` - ordered screenplay elements behind generational handles
//! - `TextDocument` - ropey-backed block buffer implementing `TextBuffer`
//! - `FormatSet` / `ElementFormatResolver` - per-type formats and what they
//!   resolve to for a block
//! - `script` - script segmentation and per-language fonts
//! - `Binder` - keeps a scene and a document in sync in both directions

pub mod binder;
pub mod block;
pub mod config;
pub mod document;
pub mod element;
pub mod error;
pub mod format;
pub mod hints;
pub mod notify;
pub mod page;
pub mod resolver;
pub mod scene;
pub mod scheduler;
pub mod script;
pub mod text;
pub mod undo;

pub use binder::{Binder, BinderEvent, BinderState};
pub use block::{Block, BlockLinkage, BlockUserData, CharRun};
pub use config::{CharacterTabRule, EditorConfig};
pub use document::{DocumentEvent, SharedDocument, TextDocument};
pub use element::{ChangeKind, ElementId, ElementType, SceneElement};
pub use error::BindError;
pub use format::{
    BlockAlignment, BlockFormat, CharFormat, Color, ElementFormat, Font, FormatEvent,
    FormatProperty, FormatSet, SharedFormatSet, TextAlignment,
};
pub use notify::{Notifier, Observable, SubscriptionId};
pub use page::{ContentWidth, PageLayout, PaperSize};
pub use resolver::ElementFormatResolver;
pub use scene::{Scene, SceneEvent, SceneId, SharedScene};
pub use script::{Language, LanguageFonts, Transliteration};
pub use smol_str::SmolStr;
pub use text::TextBuffer;
pub use undo::{SceneSnapshot, UndoManager};
