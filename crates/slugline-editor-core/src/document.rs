//! The editable block buffer.
//!
//! Text lives in a ropey `Rope`; blocks are separated by `\n` and tracked in a
//! parallel `Vec<Block>` that always has at least one entry. Edits keep the
//! two aligned: the block holding the edit start keeps its linkage and cache,
//! blocks swallowed by a deleted separator are dropped, and blocks created by
//! an inserted separator start unlinked.

use std::cell::RefCell;
use std::ops::Range;
use std::rc::Rc;

use ropey::Rope;
use smol_str::{SmolStr, ToSmolStr};

use crate::block::{
    Block, BlockLinkage, runs_append, runs_delete, runs_insert, runs_merge_family, runs_shift,
    runs_split,
};
use crate::format::{BlockFormat, CharFormat};
use crate::notify::{Notifier, Observable};
use crate::text::TextBuffer;

/// Shared handle to a document.
pub type SharedDocument = Rc<RefCell<TextDocument>>;

/// Notifications emitted by a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentEvent {
    ContentsChange {
        from: usize,
        chars_removed: usize,
        chars_added: usize,
    },
    BlockCountChanged {
        count: usize,
    },
}

#[derive(Debug)]
pub struct TextDocument {
    rope: Rope,
    blocks: Vec<Block>,
    notifier: Notifier<DocumentEvent>,
    signals_blocked: bool,
}

impl Default for TextDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl TextDocument {
    pub fn new() -> Self {
        Self {
            rope: Rope::new(),
            blocks: vec![Block::default()],
            notifier: Notifier::new(),
            signals_blocked: false,
        }
    }

    /// A document of unlinked blocks, one per line of `text`.
    pub fn from_text(text: &str) -> Self {
        let blocks = text
            .split('\n')
            .map(|line| Block::with_len(line.chars().count()))
            .collect();
        Self {
            rope: Rope::from_str(text),
            blocks,
            notifier: Notifier::new(),
            signals_blocked: false,
        }
    }

    pub fn into_shared(self) -> SharedDocument {
        Rc::new(RefCell::new(self))
    }

    pub fn notifier(&self) -> &Notifier<DocumentEvent> {
        &self.notifier
    }

    pub fn notifier_mut(&mut self) -> &mut Notifier<DocumentEvent> {
        &mut self.notifier
    }

    /// While blocked, edits emit no notifications.
    pub fn set_signals_blocked(&mut self, blocked: bool) -> bool {
        std::mem::replace(&mut self.signals_blocked, blocked)
    }

    pub fn signals_blocked(&self) -> bool {
        self.signals_blocked
    }

    fn emit(&mut self, event: DocumentEvent) {
        if !self.signals_blocked {
            self.notifier.emit(event);
        }
    }

    // === Blocks ===

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn block(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index)
    }

    pub fn block_mut(&mut self, index: usize) -> Option<&mut Block> {
        self.blocks.get_mut(index)
    }

    pub fn blocks(&self) -> impl Iterator<Item = &Block> + '_ {
        self.blocks.iter()
    }

    /// Char offset of the first char of block `index`.
    pub fn block_position(&self, index: usize) -> Option<usize> {
        if index >= self.blocks.len() {
            return None;
        }
        Some(self.blocks[..index].iter().map(|b| b.len + 1).sum())
    }

    /// Char range of block `index`, separator excluded.
    pub fn block_range(&self, index: usize) -> Option<Range<usize>> {
        let start = self.block_position(index)?;
        Some(start..start + self.blocks[index].len)
    }

    pub fn block_text(&self, index: usize) -> Option<String> {
        let range = self.block_range(index)?;
        Some(self.rope.slice(range).to_string())
    }

    /// Block index and in-block offset for a char offset.
    ///
    /// An offset sitting on a separator belongs to the block it ends.
    pub fn find_block(&self, offset: usize) -> Option<(usize, usize)> {
        let mut start = 0;
        for (index, block) in self.blocks.iter().enumerate() {
            let end = start + block.len;
            if offset <= end {
                return Some((index, offset - start));
            }
            start = end + 1;
        }
        None
    }

    pub fn set_block_linkage(&mut self, index: usize, linkage: Option<BlockLinkage>) -> bool {
        match self.blocks.get_mut(index) {
            Some(block) => {
                block.linkage = linkage;
                true
            }
            None => false,
        }
    }

    /// Append a new block holding `text` and return its index.
    pub fn push_block(&mut self, text: &str) -> usize {
        let mut with_separator = String::with_capacity(text.len() + 1);
        with_separator.push('\n');
        with_separator.push_str(text);
        let at = self.rope.len_chars();
        self.insert(at, &with_separator);
        self.blocks.len() - 1
    }

    // === Formatting ===

    /// Replace block `index`'s paragraph format and base character format,
    /// resetting its runs to one run covering the block.
    pub fn apply_block_format(
        &mut self,
        index: usize,
        block_format: BlockFormat,
        char_format: CharFormat,
    ) -> bool {
        let Some(block) = self.blocks.get_mut(index) else {
            return false;
        };
        block.char_runs.clear();
        runs_append(&mut block.char_runs, 0, block.len, Some(&char_format));
        block.block_format = block_format;
        block.char_format = char_format;
        true
    }

    /// Override the font family over an in-block range, leaving every other
    /// character attribute alone.
    pub fn merge_font_family(&mut self, index: usize, range: Range<usize>, family: &str) -> bool {
        let Some(block) = self.blocks.get_mut(index) else {
            return false;
        };
        if block.char_runs.is_empty() {
            let base = block.char_format.clone();
            runs_append(&mut block.char_runs, 0, block.len, Some(&base));
        }
        let range = range.start.min(block.len)..range.end.min(block.len);
        runs_merge_family(&mut block.char_runs, range, family)
    }

    /// Character format in effect at a char offset.
    pub fn char_format_at(&self, offset: usize) -> Option<&CharFormat> {
        let (index, local) = self.find_block(offset)?;
        Some(self.blocks[index].char_format_at(local))
    }

    // === Editing ===

    /// Remove every block but one empty one.
    pub fn clear(&mut self) {
        let removed = self.rope.len_chars();
        let old_count = self.blocks.len();
        self.rope = Rope::new();
        self.blocks = vec![Block::default()];
        if removed > 0 {
            self.emit(DocumentEvent::ContentsChange {
                from: 0,
                chars_removed: removed,
                chars_added: 0,
            });
        }
        if old_count != 1 {
            self.emit(DocumentEvent::BlockCountChanged { count: 1 });
        }
    }

    fn insert_impl(&mut self, offset: usize, text: &str) -> usize {
        let Some((index, local)) = self.find_block(offset) else {
            return 0;
        };
        let parts: Vec<&str> = text.split('\n').collect();
        let added = text.chars().count();

        if parts.len() == 1 {
            let block = &mut self.blocks[index];
            runs_insert(&mut block.char_runs, local, added);
            block.len += added;
        } else {
            let block = &mut self.blocks[index];
            let insert_format = (!block.char_runs.is_empty())
                .then(|| block.char_format_at(local).clone());
            let (left, right) = runs_split(&block.char_runs, local);
            let tail_len = block.len - local;
            let template = block.split_off_template(0);

            let first_len = parts[0].chars().count();
            block.len = local + first_len;
            block.char_runs = left;
            runs_append(&mut block.char_runs, local, first_len, insert_format.as_ref());

            let mut created = Vec::with_capacity(parts.len() - 1);
            for (i, part) in parts.iter().enumerate().skip(1) {
                let part_len = part.chars().count();
                let mut new_block = template.split_off_template(part_len);
                runs_append(&mut new_block.char_runs, 0, part_len, insert_format.as_ref());
                if i == parts.len() - 1 {
                    let mut tail = right.clone();
                    runs_shift(&mut tail, part_len);
                    new_block.char_runs.extend(tail);
                    new_block.len += tail_len;
                }
                created.push(new_block);
            }
            self.blocks.splice(index + 1..index + 1, created);
        }

        self.rope.insert(offset, text);
        added
    }

    fn delete_impl(&mut self, range: Range<usize>) -> usize {
        let Some((first, first_local)) = self.find_block(range.start) else {
            return 0;
        };
        let Some((last, last_local)) = self.find_block(range.end) else {
            return 0;
        };

        if first == last {
            let block = &mut self.blocks[first];
            runs_delete(&mut block.char_runs, first_local..last_local);
            block.len -= last_local - first_local;
        } else {
            let last_block = &self.blocks[last];
            let (_, mut tail) = runs_split(&last_block.char_runs, last_local);
            let tail_len = last_block.len - last_local;

            let block = &mut self.blocks[first];
            let (mut kept, _) = runs_split(&block.char_runs, first_local);
            runs_shift(&mut tail, first_local);
            kept.extend(tail);
            block.char_runs = kept;
            block.len = first_local + tail_len;

            self.blocks.drain(first + 1..=last);
        }

        self.rope.remove(range.clone());
        range.len()
    }

    /// Apply one edit and emit a single change notification for it.
    fn edit(&mut self, range: Range<usize>, text: &str) {
        let len = self.rope.len_chars();
        let start = range.start.min(len);
        let end = range.end.clamp(start, len);
        if start != range.start || end != range.end {
            tracing::warn!(
                target: "slugline::document",
                requested = ?range,
                len,
                "edit range clamped to document"
            );
        }

        let old_count = self.blocks.len();
        let removed = self.delete_impl(start..end);
        let added = self.insert_impl(start, text);
        if removed == 0 && added == 0 {
            return;
        }

        self.emit(DocumentEvent::ContentsChange {
            from: start,
            chars_removed: removed,
            chars_added: added,
        });
        if self.blocks.len() != old_count {
            let count = self.blocks.len();
            self.emit(DocumentEvent::BlockCountChanged { count });
        }
    }
}

impl TextBuffer for TextDocument {
    fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    fn insert(&mut self, char_offset: usize, text: &str) {
        self.edit(char_offset..char_offset, text);
    }

    fn delete(&mut self, char_range: Range<usize>) {
        self.edit(char_range, "");
    }

    fn replace(&mut self, char_range: Range<usize>, text: &str) {
        self.edit(char_range, text);
    }

    fn slice(&self, char_range: Range<usize>) -> Option<SmolStr> {
        if char_range.start > char_range.end || char_range.end > self.len_chars() {
            return None;
        }
        Some(self.rope.slice(char_range).to_smolstr())
    }

    fn char_at(&self, char_offset: usize) -> Option<char> {
        if char_offset >= self.len_chars() {
            return None;
        }
        Some(self.rope.char(char_offset))
    }

    fn to_string(&self) -> String {
        self.rope.to_string()
    }

}

impl Observable for TextDocument {
    type Event = DocumentEvent;

    fn notifier_mut(&mut self) -> &mut Notifier<DocumentEvent> {
        &mut self.notifier
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::ElementId;
    use crate::scene::Scene;

    fn texts(doc: &TextDocument) -> Vec<String> {
        (0..doc.block_count())
            .map(|i| doc.block_text(i).unwrap())
            .collect()
    }

    fn link(scene: &Scene, slot: u32) -> BlockLinkage {
        BlockLinkage {
            scene: scene.id(),
            element: ElementId {
                index: slot,
                generation: 0,
            },
        }
    }

    #[test]
    fn test_from_text_splits_on_newline() {
        let doc = TextDocument::from_text("one\ntwo\n");
        assert_eq!(texts(&doc), ["one", "two", ""]);
        assert_eq!(doc.block_position(1), Some(4));
        assert_eq!(doc.block_range(2), Some(8..8));
    }

    #[test]
    fn test_find_block_assigns_separator_to_preceding_block() {
        let doc = TextDocument::from_text("ab\ncd");
        assert_eq!(doc.find_block(0), Some((0, 0)));
        assert_eq!(doc.find_block(2), Some((0, 2)));
        assert_eq!(doc.find_block(3), Some((1, 0)));
        assert_eq!(doc.find_block(5), Some((1, 2)));
        assert_eq!(doc.find_block(6), None);
    }

    #[test]
    fn test_insert_newline_keeps_linkage_on_first_half() {
        let scene = Scene::new();
        let mut doc = TextDocument::from_text("hello world");
        doc.set_block_linkage(0, Some(link(&scene, 0)));
        let sub = doc.notifier_mut().subscribe();

        doc.insert(5, "\n");
        assert_eq!(texts(&doc), ["hello", " world"]);
        assert_eq!(doc.block(0).unwrap().linkage(), Some(link(&scene, 0)));
        assert_eq!(doc.block(1).unwrap().linkage(), None);

        assert_eq!(
            doc.notifier_mut().drain(sub),
            vec![
                DocumentEvent::ContentsChange {
                    from: 5,
                    chars_removed: 0,
                    chars_added: 1
                },
                DocumentEvent::BlockCountChanged { count: 2 },
            ]
        );
    }

    #[test]
    fn test_delete_separator_merges_into_first_block() {
        let scene = Scene::new();
        let mut doc = TextDocument::from_text("ab\ncd\nef");
        doc.set_block_linkage(0, Some(link(&scene, 0)));
        doc.set_block_linkage(1, Some(link(&scene, 1)));
        doc.set_block_linkage(2, Some(link(&scene, 2)));

        doc.delete(1..4);
        assert_eq!(texts(&doc), ["ad", "ef"]);
        assert_eq!(doc.block(0).unwrap().linkage(), Some(link(&scene, 0)));
        assert_eq!(doc.block(1).unwrap().linkage(), Some(link(&scene, 2)));
    }

    #[test]
    fn test_multi_line_insert_carries_tail() {
        let mut doc = TextDocument::from_text("ac");
        doc.insert(1, "X\nY\nZ");
        assert_eq!(texts(&doc), ["aX", "Y", "Zc"]);
        assert_eq!(doc.to_string(), "aX\nY\nZc");
    }

    #[test]
    fn test_runs_follow_split_and_merge() {
        let mut doc = TextDocument::from_text("abcdef");
        let base = CharFormat {
            family: SmolStr::new("Courier Prime"),
            ..CharFormat::default()
        };
        doc.apply_block_format(0, BlockFormat::default(), base);
        doc.merge_font_family(0, 3..6, "Mukta");

        doc.insert(3, "\n");
        let first = doc.block(0).unwrap();
        let second = doc.block(1).unwrap();
        assert_eq!(first.char_runs().len(), 1);
        assert_eq!(first.char_runs()[0].range, 0..3);
        assert_eq!(second.char_runs()[0].range, 0..3);
        assert_eq!(second.char_runs()[0].format.family, "Mukta");

        doc.delete(3..4);
        let merged = doc.block(0).unwrap();
        assert_eq!(merged.len(), 6);
        assert_eq!(merged.char_runs().len(), 2);
        assert_eq!(merged.char_runs()[1].range, 3..6);
    }

    #[test]
    fn test_blocked_signals_emit_nothing() {
        let mut doc = TextDocument::new();
        let sub = doc.notifier_mut().subscribe();
        doc.set_signals_blocked(true);
        doc.insert(0, "quiet");
        doc.push_block("also quiet");
        doc.set_signals_blocked(false);
        assert!(doc.notifier_mut().drain(sub).is_empty());
        assert_eq!(texts(&doc), ["quiet", "also quiet"]);
    }

    #[test]
    fn test_clear_leaves_one_empty_block() {
        let mut doc = TextDocument::from_text("a\nb\nc");
        let sub = doc.notifier_mut().subscribe();
        doc.clear();
        assert_eq!(doc.block_count(), 1);
        assert!(doc.is_empty());
        assert_eq!(
            doc.notifier_mut().drain(sub),
            vec![
                DocumentEvent::ContentsChange {
                    from: 0,
                    chars_removed: 5,
                    chars_added: 0
                },
                DocumentEvent::BlockCountChanged { count: 1 },
            ]
        );
    }

    #[test]
    fn test_replace_emits_one_change() {
        let mut doc = TextDocument::from_text("hello");
        let sub = doc.notifier_mut().subscribe();
        doc.replace(1..4, "ipp");
        assert_eq!(doc.to_string(), "hippo");
        assert_eq!(
            doc.notifier_mut().drain(sub),
            vec![DocumentEvent::ContentsChange {
                from: 1,
                chars_removed: 3,
                chars_added: 3
            }]
        );
    }

    #[test]
    fn test_out_of_range_edit_is_clamped() {
        let mut doc = TextDocument::from_text("abc");
        doc.delete(2..10);
        assert_eq!(doc.to_string(), "ab");
        doc.insert(99, "!");
        assert_eq!(doc.to_string(), "ab!");
    }
}
