//! The char-offset editing surface of a screenplay buffer.
//!
//! Offsets count Unicode scalar values. Block separators (`\n`) count as one
//! char each, so an offset can address the gap between two blocks.

use std::ops::Range;

use smol_str::SmolStr;

pub trait TextBuffer {
    fn len_chars(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len_chars() == 0
    }

    /// Insert at `offset`. A `\n` in `text` starts a new block.
    fn insert(&mut self, offset: usize, text: &str);

    /// Delete `range`. Deleting a separator joins the two blocks around it.
    fn delete(&mut self, range: Range<usize>);

    /// Delete then insert. Implementors may report it as one edit.
    fn replace(&mut self, range: Range<usize>, text: &str) {
        self.delete(range.clone());
        self.insert(range.start, text);
    }

    /// Text in `range`, or `None` if it runs past the end.
    fn slice(&self, range: Range<usize>) -> Option<SmolStr>;

    fn char_at(&self, offset: usize) -> Option<char>;

    fn to_string(&self) -> String;
}

