//! The formatting pass: element formats plus per-script font runs.

use crate::block::Block;
use crate::error::BindError;
use crate::resolver::ElementFormatResolver;
use crate::script::{Language, font_runs};
use crate::text::TextBuffer;

use super::{Binder, BinderEvent, BinderState, Bound};

impl Binder {
    /// Reformat one block.
    ///
    /// A stale block (element format revised since it was last applied, or
    /// never highlighted) gets the resolver's block and char formats over its
    /// whole length. Then either the pending transliteration range is forced
    /// into its language's font, or script runs are re-segmented from the
    /// first char that differs from the text seen by the previous pass.
    pub(super) fn highlight_block(&mut self, b: &Bound, index: usize) -> Result<(), BindError> {
        if self.state != BinderState::Ready {
            return Ok(());
        }

        let element = {
            let formats = b.formats.borrow();
            let scene = b.scene.borrow();
            let mut doc = b.document.borrow_mut();
            let count = doc.block_count();
            let block = doc
                .block(index)
                .ok_or(BindError::BlockOutOfRange { index, count })?;
            let element = Self::resolve_linkage(&scene, block.linkage())
                .ok_or(BindError::MissingLinkage(index))?;
            let element_type = scene
                .element(element)
                .map(|e| e.element_type())
                .ok_or(BindError::ElementNotInScene(element))?;

            let revision = formats.format_revision(element_type);
            let text = doc.block_text(index).unwrap_or_default();
            let data = block.user_data();
            let stale = data.is_stale(revision) || data.highlighted_text().is_empty();
            if !stale && !data.has_transliteration() && data.highlighted_text() == text {
                return Ok(());
            }
            let from = if stale {
                0
            } else {
                first_changed_char(data.highlighted_text(), &text).saturating_sub(1)
            };

            if stale {
                let resolver = ElementFormatResolver::new(&formats);
                doc.apply_block_format(
                    index,
                    resolver.block_format(element_type),
                    resolver.char_format(element_type),
                );
            }

            let block = doc
                .block_mut(index)
                .ok_or(BindError::BlockOutOfRange { index, count })?;
            let base_family = block.char_format().family.clone();
            let transliteration = block.user_data_mut().take_transliteration();
            block.user_data_mut().mark_formatted(revision);
            block.user_data_mut().set_highlighted_text(&text);

            let runs = font_runs(
                &text,
                from,
                &base_family,
                formats.language_fonts(),
                transliteration.as_ref(),
            );
            if let Some(tr) = &transliteration {
                tracing::trace!(
                    target: "slugline::binder",
                    index,
                    range = ?tr.range,
                    language = ?tr.language,
                    "applying transliterated range"
                );
            }
            for run in runs {
                doc.merge_font_family(index, run.range, &run.family);
            }
            element
        };

        if self.current_element == Some(element) {
            self.emit(BinderEvent::CurrentFontChanged);
        }
        Ok(())
    }

    /// Reformat every block whose char range intersects `from..to`.
    pub(super) fn highlight_range(&mut self, b: &Bound, from: usize, to: usize) {
        let span = {
            let doc = b.document.borrow();
            let first = doc.find_block(from).map(|(i, _)| i);
            let last = doc
                .find_block(to)
                .map(|(i, _)| i)
                .unwrap_or_else(|| doc.block_count().saturating_sub(1));
            first.map(|first| first..=last.max(first))
        };
        let Some(span) = span else {
            return;
        };
        for index in span {
            if let Err(err) = self.highlight_block(b, index) {
                tracing::trace!(target: "slugline::binder", index, %err, "block not highlighted");
            }
        }
    }

    /// Run the formatting pass over every block.
    pub fn highlight_all(&mut self) {
        let Ok(b) = self.bound() else {
            return;
        };
        let count = b.document.borrow().block_count();
        let mut orphans = 0;
        for index in 0..count {
            match self.highlight_block(&b, index) {
                Ok(()) => {}
                Err(BindError::MissingLinkage(_)) => orphans += 1,
                Err(err) => {
                    tracing::debug!(
                        target: "slugline::binder",
                        index,
                        %err,
                        "block not highlighted"
                    )
                }
            }
        }
        if orphans > 0 {
            tracing::debug!(
                target: "slugline::binder",
                orphans,
                "unlinked blocks left unformatted"
            );
        }
    }

    /// Mark every block stale and reformat the whole document.
    pub fn refresh(&mut self) {
        let Ok(b) = self.bound() else {
            return;
        };
        {
            let mut doc = b.document.borrow_mut();
            for index in 0..doc.block_count() {
                if let Some(block) = doc.block_mut(index) {
                    block.user_data_mut().reset_format();
                }
            }
        }
        self.highlight_all();
    }

    /// Record that `start..end` (document offsets) was transliterated into
    /// `language` and reformat the owning block. The range is clipped to the
    /// block holding `start`.
    pub fn apply_transliteration(&mut self, start: usize, end: usize, language: Language) {
        let result = self.bound().and_then(|b| {
            let index = {
                let mut doc = b.document.borrow_mut();
                let len = doc.len_chars();
                let count = doc.block_count();
                let (index, local_start) = doc
                    .find_block(start)
                    .ok_or(BindError::OffsetOutOfRange { offset: start, len })?;
                let block = doc
                    .block_mut(index)
                    .ok_or(BindError::BlockOutOfRange { index, count })?;
                let local_end = end.saturating_sub(start - local_start).min(block.len());
                block
                    .user_data_mut()
                    .set_transliteration(local_start..local_end.max(local_start), language);
                index
            };
            self.highlight_block(&b, index)
        });
        if let Err(err) = result {
            tracing::debug!(target: "slugline::binder", %err, "transliteration not applied");
        }
    }

    pub(super) fn block_is_linked(&self, b: &Bound, index: usize) -> bool {
        let scene = b.scene.borrow();
        let doc = b.document.borrow();
        Self::resolve_linkage(&scene, doc.block(index).and_then(Block::linkage)).is_some()
    }
}

/// Char offset of the first difference between `before` and `after`.
fn first_changed_char(before: &str, after: &str) -> usize {
    before
        .chars()
        .zip(after.chars())
        .take_while(|(a, b)| a == b)
        .count()
}
