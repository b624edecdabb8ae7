//! Editor configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use slugline_common::config::{FileStore, load_or_default};

use crate::script::LanguageFonts;

/// When tabbing out of a Character cue lands on Transition instead of Action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CharacterTabRule {
    /// Transition if a tab already happened since the cursor last moved.
    #[default]
    AfterPriorTab,
    /// Always Action.
    Never,
    /// Always Transition.
    Always,
}

impl CharacterTabRule {
    pub fn prefers_transition(self, tabbed_before: bool) -> bool {
        match self {
            CharacterTabRule::AfterPriorTab => tabbed_before,
            CharacterTabRule::Never => false,
            CharacterTabRule::Always => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Coalescing window for deferred document re-initialization.
    pub initialize_delay_ms: u64,
    /// On-screen pixel height every font must reach.
    pub min_font_pixel_size: u32,
    pub character_tab_rule: CharacterTabRule,
    pub language_fonts: LanguageFonts,
    /// Rebuild the whole document (coalesced) after every model-side change.
    pub force_sync_document: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            initialize_delay_ms: 100,
            min_font_pixel_size: 21,
            character_tab_rule: CharacterTabRule::default(),
            language_fonts: LanguageFonts::default(),
            force_sync_document: false,
        }
    }
}

impl EditorConfig {
    /// Load from a JSON file, or defaults if the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> miette::Result<Self> {
        let store = FileStore::new(path);
        let exists = store.exists();
        load_or_default(&store, exists)
    }

    pub fn initialize_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.initialize_delay_ms)
    }
}
