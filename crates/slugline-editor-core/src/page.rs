//! Screenplay page geometry.
//!
//! Margins follow the common screenplay convention: 1.5in on the left, top
//! and bottom, a 6in text column, and whatever is left of the paper width on
//! the right.

use serde::{Deserialize, Serialize};

const LEFT_MARGIN_IN: f32 = 1.5;
const TOP_MARGIN_IN: f32 = 1.5;
const BOTTOM_MARGIN_IN: f32 = 1.5;
const CONTENT_WIDTH_IN: f32 = 6.0;

/// Anything that can report the width available to text, in pixels.
///
/// The format resolver only needs this one number from page layout.
pub trait ContentWidth {
    fn content_width(&self) -> f32;
}

impl ContentWidth for f32 {
    fn content_width(&self) -> f32 {
        *self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaperSize {
    #[default]
    Letter,
    A4,
}

impl PaperSize {
    /// Paper dimensions in inches, portrait.
    pub fn size_inches(self) -> (f32, f32) {
        match self {
            PaperSize::Letter => (8.5, 11.0),
            PaperSize::A4 => (8.27, 11.69),
        }
    }
}

/// Axis-aligned rectangle in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Margins {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageLayout {
    paper_size: PaperSize,
    /// Dots per inch used to convert inches to pixels.
    resolution: f32,
}

impl Default for PageLayout {
    fn default() -> Self {
        Self {
            paper_size: PaperSize::Letter,
            resolution: 72.0,
        }
    }
}

impl PageLayout {
    pub fn new(paper_size: PaperSize, resolution: f32) -> Self {
        Self {
            paper_size,
            resolution: resolution.max(1.0),
        }
    }

    pub fn paper_size(&self) -> PaperSize {
        self.paper_size
    }

    pub fn set_paper_size(&mut self, paper_size: PaperSize) -> bool {
        if self.paper_size == paper_size {
            return false;
        }
        self.paper_size = paper_size;
        true
    }

    pub fn resolution(&self) -> f32 {
        self.resolution
    }

    pub fn set_resolution(&mut self, resolution: f32) -> bool {
        let resolution = resolution.max(1.0);
        if (self.resolution - resolution).abs() < f32::EPSILON {
            return false;
        }
        self.resolution = resolution;
        true
    }

    pub fn paper_rect(&self) -> Rect {
        let (w, h) = self.paper_size.size_inches();
        Rect {
            x: 0.0,
            y: 0.0,
            width: w * self.resolution,
            height: h * self.resolution,
        }
    }

    pub fn margins(&self) -> Margins {
        let (w, _) = self.paper_size.size_inches();
        Margins {
            left: LEFT_MARGIN_IN * self.resolution,
            top: TOP_MARGIN_IN * self.resolution,
            right: (w - CONTENT_WIDTH_IN - LEFT_MARGIN_IN) * self.resolution,
            bottom: BOTTOM_MARGIN_IN * self.resolution,
        }
    }

    /// The printable area inside the margins.
    pub fn paint_rect(&self) -> Rect {
        let paper = self.paper_rect();
        let m = self.margins();
        Rect {
            x: m.left,
            y: m.top,
            width: paper.width - m.left - m.right,
            height: paper.height - m.top - m.bottom,
        }
    }
}

impl ContentWidth for PageLayout {
    fn content_width(&self) -> f32 {
        CONTENT_WIDTH_IN * self.resolution
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_width_scales_with_resolution() {
        let layout = PageLayout::default();
        assert_eq!(layout.content_width(), 432.0);

        let layout = PageLayout::new(PaperSize::A4, 96.0);
        assert_eq!(layout.content_width(), 576.0);
    }

    #[test]
    fn test_paint_rect_matches_content_width() {
        for paper in [PaperSize::Letter, PaperSize::A4] {
            let layout = PageLayout::new(paper, 72.0);
            let paint = layout.paint_rect();
            assert!((paint.width - layout.content_width()).abs() < 0.01);
            assert_eq!(paint.x, 108.0);
        }
    }

    #[test]
    fn test_setters_report_change() {
        let mut layout = PageLayout::default();
        assert!(!layout.set_paper_size(PaperSize::Letter));
        assert!(layout.set_paper_size(PaperSize::A4));
        assert!(!layout.set_resolution(72.0));
        assert!(layout.set_resolution(96.0));
    }
}
