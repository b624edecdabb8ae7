//! Blocks: the paragraph units of a `TextDocument`.

use std::ops::Range;

use smol_str::SmolStr;

use crate::element::ElementId;
use crate::format::{BlockFormat, CharFormat};
use crate::scene::SceneId;
use crate::script::{Language, Transliteration};

/// Back-reference from a block to the scene element it renders.
///
/// Never owns the element: resolving it goes through the scene, and a
/// destroyed element resolves to nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockLinkage {
    pub scene: SceneId,
    pub element: ElementId,
}

/// Character formatting over a char range of one block.
#[derive(Debug, Clone, PartialEq)]
pub struct CharRun {
    pub range: Range<usize>,
    pub format: CharFormat,
}

/// Per-block state cached by the binder's formatting pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockUserData {
    format_revision: Option<u64>,
    highlighted_text: SmolStr,
    transliteration: Option<Transliteration>,
}

impl BlockUserData {
    /// Force the next formatting pass to reapply the element format.
    pub fn reset_format(&mut self) {
        self.format_revision = None;
    }

    pub fn format_revision(&self) -> Option<u64> {
        self.format_revision
    }

    /// True if a format at `revision` has not been applied yet.
    pub fn is_stale(&self, revision: u64) -> bool {
        self.format_revision != Some(revision)
    }

    pub(crate) fn mark_formatted(&mut self, revision: u64) {
        self.format_revision = Some(revision);
    }

    pub fn highlighted_text(&self) -> &str {
        &self.highlighted_text
    }

    pub(crate) fn set_highlighted_text(&mut self, text: &str) {
        self.highlighted_text = SmolStr::new(text);
    }

    pub fn set_transliteration(&mut self, range: Range<usize>, language: Language) {
        self.transliteration = Some(Transliteration { range, language });
    }

    pub fn has_transliteration(&self) -> bool {
        self.transliteration
            .as_ref()
            .is_some_and(|t| t.range.end > t.range.start)
    }

    /// Read and clear the pending transliteration range.
    pub fn take_transliteration(&mut self) -> Option<Transliteration> {
        self.transliteration
            .take()
            .filter(|t| t.range.end > t.range.start)
    }
}

/// One paragraph of a document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Block {
    pub(crate) len: usize,
    pub(crate) linkage: Option<BlockLinkage>,
    pub(crate) block_format: BlockFormat,
    pub(crate) char_format: CharFormat,
    pub(crate) char_runs: Vec<CharRun>,
    pub(crate) user_data: BlockUserData,
}

impl Block {
    pub(crate) fn with_len(len: usize) -> Self {
        Self {
            len,
            ..Self::default()
        }
    }

    /// A block created by splitting `self`: same formatting, no linkage, no cache.
    pub(crate) fn split_off_template(&self, len: usize) -> Self {
        Self {
            len,
            linkage: None,
            block_format: self.block_format.clone(),
            char_format: self.char_format.clone(),
            char_runs: Vec::new(),
            user_data: BlockUserData::default(),
        }
    }

    /// Length in chars, not counting the separator.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn linkage(&self) -> Option<BlockLinkage> {
        self.linkage
    }

    pub fn block_format(&self) -> &BlockFormat {
        &self.block_format
    }

    /// The block's base character format.
    pub fn char_format(&self) -> &CharFormat {
        &self.char_format
    }

    pub fn char_runs(&self) -> &[CharRun] {
        &self.char_runs
    }

    pub fn user_data(&self) -> &BlockUserData {
        &self.user_data
    }

    pub fn user_data_mut(&mut self) -> &mut BlockUserData {
        &mut self.user_data
    }

    /// Character format at in-block offset `at`, taken from the char before it.
    pub fn char_format_at(&self, at: usize) -> &CharFormat {
        let probe = at.saturating_sub(1);
        self.char_runs
            .iter()
            .find(|run| run.range.contains(&probe))
            .map(|run| &run.format)
            .unwrap_or(&self.char_format)
    }
}

// === Char run maintenance ===
//
// Runs are either empty (block never formatted) or contiguous and cover the
// whole block.

/// Grow the run that owns the char before `at` by `n`.
pub(crate) fn runs_insert(runs: &mut [CharRun], at: usize, n: usize) {
    if runs.is_empty() || n == 0 {
        return;
    }
    let probe = at.saturating_sub(1);
    let owner = runs
        .iter()
        .position(|run| run.range.contains(&probe))
        .unwrap_or(runs.len() - 1);
    runs[owner].range.end += n;
    for run in &mut runs[owner + 1..] {
        run.range.start += n;
        run.range.end += n;
    }
}

pub(crate) fn runs_delete(runs: &mut Vec<CharRun>, removed: Range<usize>) {
    if removed.is_empty() {
        return;
    }
    let shrink = |x: usize| {
        if x <= removed.start {
            x
        } else if x >= removed.end {
            x - removed.len()
        } else {
            removed.start
        }
    };
    for run in runs.iter_mut() {
        run.range = shrink(run.range.start)..shrink(run.range.end);
    }
    runs.retain(|run| !run.range.is_empty());
}

/// Split runs at `at`; the right half is rebased to start at 0.
pub(crate) fn runs_split(runs: &[CharRun], at: usize) -> (Vec<CharRun>, Vec<CharRun>) {
    let mut left = Vec::new();
    let mut right = Vec::new();
    for run in runs {
        if run.range.start < at {
            left.push(CharRun {
                range: run.range.start..run.range.end.min(at),
                format: run.format.clone(),
            });
        }
        if run.range.end > at {
            right.push(CharRun {
                range: run.range.start.max(at) - at..run.range.end - at,
                format: run.format.clone(),
            });
        }
    }
    (left, right)
}

/// Append `n` chars starting at `start` in `format`, extending the last run if it matches.
pub(crate) fn runs_append(
    runs: &mut Vec<CharRun>,
    start: usize,
    n: usize,
    format: Option<&CharFormat>,
) {
    let Some(format) = format else {
        return;
    };
    if n == 0 {
        return;
    }
    if let Some(last) = runs.last_mut() {
        if last.range.end == start && last.format == *format {
            last.range.end += n;
            return;
        }
    }
    runs.push(CharRun {
        range: start..start + n,
        format: format.clone(),
    });
}

pub(crate) fn runs_shift(runs: &mut [CharRun], by: usize) {
    for run in runs {
        run.range.start += by;
        run.range.end += by;
    }
}

/// Set the font family over `range`, splitting runs at its edges.
///
/// Returns true if any run's family changed.
pub(crate) fn runs_merge_family(
    runs: &mut Vec<CharRun>,
    range: Range<usize>,
    family: &str,
) -> bool {
    let untouched = |r: &CharRun| {
        r.range.end <= range.start || r.range.start >= range.end || r.format.family == family
    };
    if range.is_empty() || runs.iter().all(untouched) {
        return false;
    }
    let mut out = Vec::with_capacity(runs.len() + 2);
    for run in runs.drain(..) {
        let overlap_start = run.range.start.max(range.start);
        let overlap_end = run.range.end.min(range.end);
        if overlap_start >= overlap_end || run.format.family == family {
            out.push(run);
            continue;
        }
        if run.range.start < overlap_start {
            out.push(CharRun {
                range: run.range.start..overlap_start,
                format: run.format.clone(),
            });
        }
        let mut format = run.format.clone();
        format.family = SmolStr::new(family);
        out.push(CharRun {
            range: overlap_start..overlap_end,
            format,
        });
        if overlap_end < run.range.end {
            out.push(CharRun {
                range: overlap_end..run.range.end,
                format: run.format,
            });
        }
    }
    // Coalesce neighbours that ended up identical.
    let mut merged: Vec<CharRun> = Vec::with_capacity(out.len());
    for run in out {
        match merged.last_mut() {
            Some(last) if last.range.end == run.range.start && last.format == run.format => {
                last.range.end = run.range.end;
            }
            _ => merged.push(run),
        }
    }
    *runs = merged;
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt(family: &str) -> CharFormat {
        CharFormat {
            family: SmolStr::new(family),
            ..CharFormat::default()
        }
    }

    fn run(range: Range<usize>, family: &str) -> CharRun {
        CharRun {
            range,
            format: fmt(family),
        }
    }

    #[test]
    fn test_insert_grows_run_before_cursor() {
        let mut runs = vec![run(0..3, "a"), run(3..6, "b")];
        runs_insert(&mut runs, 3, 2);
        assert_eq!(runs, vec![run(0..5, "a"), run(5..8, "b")]);

        runs_insert(&mut runs, 0, 1);
        assert_eq!(runs, vec![run(0..6, "a"), run(6..9, "b")]);
    }

    #[test]
    fn test_delete_drops_swallowed_runs() {
        let mut runs = vec![run(0..3, "a"), run(3..5, "b"), run(5..8, "c")];
        runs_delete(&mut runs, 2..6);
        assert_eq!(runs, vec![run(0..2, "a"), run(2..4, "c")]);
    }

    #[test]
    fn test_split_rebases_right_half() {
        let runs = vec![run(0..4, "a"), run(4..6, "b")];
        let (left, right) = runs_split(&runs, 2);
        assert_eq!(left, vec![run(0..2, "a")]);
        assert_eq!(right, vec![run(0..2, "a"), run(2..4, "b")]);
    }

    #[test]
    fn test_merge_family_splits_and_coalesces() {
        let mut runs = vec![run(0..10, "base")];
        assert!(runs_merge_family(&mut runs, 3..6, "other"));
        assert_eq!(
            runs,
            vec![run(0..3, "base"), run(3..6, "other"), run(6..10, "base")]
        );

        assert!(!runs_merge_family(&mut runs, 3..6, "other"));
        assert!(runs_merge_family(&mut runs, 3..6, "base"));
        assert_eq!(runs, vec![run(0..10, "base")]);
    }

    #[test]
    fn test_transliteration_is_read_once() {
        let mut data = BlockUserData::default();
        data.set_transliteration(2..5, Language::Hindi);
        assert!(data.has_transliteration());
        let taken = data.take_transliteration().unwrap();
        assert_eq!(taken.range, 2..5);
        assert_eq!(taken.language, Language::Hindi);
        assert!(!data.has_transliteration());
        assert!(data.take_transliteration().is_none());
    }
}
