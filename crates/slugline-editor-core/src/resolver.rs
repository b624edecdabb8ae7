//! Element type → concrete block and character formatting.

use crate::element::ElementType;
use crate::format::{BlockAlignment, BlockFormat, CharFormat, FormatSet};
use crate::page::ContentWidth;

/// Resolves formats from the current state of a `FormatSet`.
///
/// Both operations are pure: nothing in the format set is touched.
#[derive(Debug, Clone, Copy)]
pub struct ElementFormatResolver<'a> {
    formats: &'a FormatSet,
    page_width: f32,
}

impl<'a> ElementFormatResolver<'a> {
    /// Resolve against the format set's own page layout.
    pub fn new(formats: &'a FormatSet) -> Self {
        Self {
            formats,
            page_width: formats.page_layout().content_width(),
        }
    }

    /// Resolve against an explicit content width.
    pub fn with_content_width(formats: &'a FormatSet, layout: &impl ContentWidth) -> Self {
        Self {
            formats,
            page_width: layout.content_width(),
        }
    }

    pub fn page_width(&self) -> f32 {
        self.page_width
    }

    pub fn block_format(&self, element_type: ElementType) -> BlockFormat {
        let format = self.formats.element_format(element_type);
        let block_px = self.page_width * format.block_width();
        let slack = self.page_width - block_px;
        let left_margin = match format.block_alignment() {
            BlockAlignment::Left => 0.0,
            BlockAlignment::Center => slack * 0.5,
            BlockAlignment::Right => slack,
        };

        BlockFormat {
            left_margin,
            right_margin: self.page_width - block_px - left_margin,
            top_margin: format.top_margin(),
            bottom_margin: format.bottom_margin(),
            line_height_percent: format.line_height() * 100.0,
            alignment: format.text_alignment(),
            background: format.background_color(),
            foreground: format.text_color(),
        }
    }

    pub fn char_format(&self, element_type: ElementType) -> CharFormat {
        let format = self.formats.element_format(element_type);
        let font = format.font();
        CharFormat {
            family: font.family.clone(),
            point_size: font.point_size + self.formats.font_point_size_delta(),
            weight: font.weight,
            italic: font.italic,
            underline: font.underline,
            overline: font.overline,
            strike_out: font.strike_out,
            stretch: font.stretch,
            capitalization: font.capitalization,
            letter_spacing: font.letter_spacing,
            word_spacing: font.word_spacing,
            background: format.background_color(),
            foreground: format.text_color(),
        }
    }
}
