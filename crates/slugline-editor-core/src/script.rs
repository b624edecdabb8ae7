//! Script-aware font runs.
//!
//! A block's text is partitioned into maximal runs of one effective script.
//! Whitespace, digits, punctuation and Latin letters share a neutral bucket
//! and keep the element's own font; every other script is rendered in the
//! font configured for its language.

use std::collections::BTreeMap;
use std::ops::Range;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use unicode_script::{Script, UnicodeScript};

/// Languages a transliteration engine can produce, and that get their own font.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Language {
    #[default]
    English,
    Bengali,
    Gujarati,
    Hindi,
    Kannada,
    Malayalam,
    Oriya,
    Punjabi,
    Tamil,
    Telugu,
}

impl Language {
    pub const ALL: [Language; 10] = [
        Language::English,
        Language::Bengali,
        Language::Gujarati,
        Language::Hindi,
        Language::Kannada,
        Language::Malayalam,
        Language::Oriya,
        Language::Punjabi,
        Language::Tamil,
        Language::Telugu,
    ];

    /// The language whose font renders `script`, if one is configured for it.
    pub fn for_script(script: Script) -> Option<Self> {
        let language = match script {
            Script::Devanagari => Language::Hindi,
            Script::Bengali => Language::Bengali,
            Script::Gujarati => Language::Gujarati,
            Script::Gurmukhi => Language::Punjabi,
            Script::Kannada => Language::Kannada,
            Script::Malayalam => Language::Malayalam,
            Script::Oriya => Language::Oriya,
            Script::Tamil => Language::Tamil,
            Script::Telugu => Language::Telugu,
            _ => return None,
        };
        Some(language)
    }
}

/// Font family per language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LanguageFonts {
    fonts: BTreeMap<Language, SmolStr>,
}

impl Default for LanguageFonts {
    fn default() -> Self {
        let fonts = [
            (Language::English, "Courier Prime"),
            (Language::Bengali, "Hind Siliguri"),
            (Language::Gujarati, "Rasa"),
            (Language::Hindi, "Mukta"),
            (Language::Kannada, "Baloo Tamma 2"),
            (Language::Malayalam, "Baloo Chettan 2"),
            (Language::Oriya, "Baloo Bhaina 2"),
            (Language::Punjabi, "Baloo Paaji 2"),
            (Language::Tamil, "Hind Madurai"),
            (Language::Telugu, "Hind Guntur"),
        ]
        .into_iter()
        .map(|(lang, family)| (lang, SmolStr::new_static(family)))
        .collect();
        Self { fonts }
    }
}

impl LanguageFonts {
    /// An empty table: every lookup falls back.
    pub fn empty() -> Self {
        Self {
            fonts: BTreeMap::new(),
        }
    }

    pub fn family(&self, language: Language) -> Option<&str> {
        self.fonts.get(&language).map(|f| f.as_str())
    }

    pub fn set_family(&mut self, language: Language, family: impl Into<SmolStr>) {
        self.fonts.insert(language, family.into());
    }

    fn family_or<'a>(&'a self, language: Language, fallback: &'a str) -> &'a str {
        self.family(language).unwrap_or(fallback)
    }
}

/// Script classification used for font selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectiveScript {
    /// Whitespace, digits, punctuation, Latin letters and unclassified characters.
    Neutral,
    Script(Script),
}

impl EffectiveScript {
    pub fn language(self) -> Option<Language> {
        match self {
            EffectiveScript::Neutral => None,
            EffectiveScript::Script(script) => Language::for_script(script),
        }
    }
}

/// Classify one character. Combining marks take the script of what precedes them.
pub fn effective_script(ch: char, previous: Option<EffectiveScript>) -> EffectiveScript {
    if ch.is_whitespace() || ch.is_numeric() || ch.is_ascii_punctuation() {
        return EffectiveScript::Neutral;
    }
    match ch.script() {
        Script::Latin | Script::Common | Script::Unknown => EffectiveScript::Neutral,
        Script::Inherited => previous.unwrap_or(EffectiveScript::Neutral),
        script => EffectiveScript::Script(script),
    }
}

fn classify(text: &str) -> Vec<EffectiveScript> {
    let mut out = Vec::with_capacity(text.len());
    let mut previous = None;
    for ch in text.chars() {
        let script = effective_script(ch, previous);
        out.push(script);
        previous = Some(script);
    }
    out
}

/// A maximal run of one effective script, in char offsets within the block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptRun {
    pub range: Range<usize>,
    pub script: EffectiveScript,
}

/// Partition `text` into script runs, starting at the run that contains `from`.
///
/// Runs before that one are left out; callers pass the first changed offset so only
/// the part of the block that could have changed is rescanned.
pub fn segment(text: &str, from: usize) -> Vec<ScriptRun> {
    let scripts = classify(text);
    if scripts.is_empty() {
        return Vec::new();
    }

    let mut start = from.min(scripts.len() - 1);
    while start > 0 && scripts[start - 1] == scripts[start] {
        start -= 1;
    }

    let mut runs: Vec<ScriptRun> = Vec::new();
    for (offset, script) in scripts.iter().enumerate().skip(start) {
        match runs.last_mut() {
            Some(run) if run.script == *script => run.range.end = offset + 1,
            _ => runs.push(ScriptRun {
                range: offset..offset + 1,
                script: *script,
            }),
        }
    }
    runs
}

/// A font-family assignment over a char range of a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontRun {
    pub range: Range<usize>,
    pub family: SmolStr,
}

/// A one-shot instruction to render an exact range in a language's font.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transliteration {
    pub range: Range<usize>,
    pub language: Language,
}

/// Font families for `text` from offset `from` onwards.
///
/// With a transliteration, classification is skipped and exactly one run
/// covering the transliterated range (clamped to the text) is returned.
/// Neutral runs use `base_family`.
pub fn font_runs(
    text: &str,
    from: usize,
    base_family: &str,
    fonts: &LanguageFonts,
    transliteration: Option<&Transliteration>,
) -> Vec<FontRun> {
    if let Some(tr) = transliteration {
        let len = text.chars().count();
        let end = tr.range.end.min(len);
        let start = tr.range.start.min(end);
        if start == end {
            return Vec::new();
        }
        return vec![FontRun {
            range: start..end,
            family: SmolStr::new(fonts.family_or(tr.language, base_family)),
        }];
    }

    segment(text, from)
        .into_iter()
        .map(|run| {
            let family = match run.script.language() {
                None => base_family,
                Some(lang) => fonts.family_or(lang, base_family),
            };
            FontRun {
                range: run.range,
                family: SmolStr::new(family),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neutral_characters_fold_together() {
        let runs = segment("Hello, 42 world!", 0);
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].script, EffectiveScript::Neutral);
        assert_eq!(runs[0].range, 0..16);
    }

    #[test]
    fn test_runs_break_at_script_boundary() {
        // "Hi " + Devanagari "नमस्ते"
        let text = "Hi नमस्ते";
        let runs = segment(text, 0);
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].range, 0..3);
        assert_eq!(runs[1].range, 3..text.chars().count());
        assert_eq!(runs[1].script, EffectiveScript::Script(Script::Devanagari));
    }

    #[test]
    fn test_combining_mark_joins_previous_run() {
        // Latin 'e' followed by U+0301 COMBINING ACUTE ACCENT.
        let runs = segment("e\u{301}", 0);
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].script, EffectiveScript::Neutral);
    }

    #[test]
    fn test_segment_walks_back_to_run_start() {
        let text = "ab தமிழ் cd";
        // Start inside the Tamil run; the whole run is rescanned.
        let runs = segment(text, 5);
        assert_eq!(runs[0].range.start, 3);
        assert_eq!(runs[0].script, EffectiveScript::Script(Script::Tamil));
        assert_eq!(runs.last().unwrap().range.end, text.chars().count());
    }

    #[test]
    fn test_language_for_script() {
        assert_eq!(Language::for_script(Script::Gurmukhi), Some(Language::Punjabi));
        assert_eq!(Language::for_script(Script::Devanagari), Some(Language::Hindi));
        assert_eq!(Language::for_script(Script::Cyrillic), None);
    }

    #[test]
    fn test_font_runs_use_language_fonts() {
        let fonts = LanguageFonts::default();
        let runs = font_runs("Hi नमस्ते", 0, "Courier Prime", &fonts, None);
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].family, "Courier Prime");
        assert_eq!(runs[1].family, "Mukta");
    }

    #[test]
    fn test_transliteration_overrides_classification() {
        let fonts = LanguageFonts::default();
        let tr = Transliteration {
            range: 0..100,
            language: Language::Tamil,
        };
        let runs = font_runs("vanakkam", 0, "Courier Prime", &fonts, Some(&tr));
        assert_eq!(
            runs,
            vec![FontRun {
                range: 0..8,
                family: SmolStr::new("Hind Madurai"),
            }]
        );
    }

    #[test]
    fn test_missing_language_font_falls_back_to_base() {
        let fonts = LanguageFonts::empty();
        let runs = font_runs("नमस्ते", 0, "Courier Prime", &fonts, None);
        assert_eq!(runs[0].family, "Courier Prime");
    }

    #[test]
    fn test_unmapped_script_keeps_element_family() {
        let fonts = LanguageFonts::default();
        let runs = font_runs("Hi Привет", 0, "Courier New", &fonts, None);
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[1].range, 3..9);
        assert_eq!(runs[1].family, "Courier New");
    }
}
