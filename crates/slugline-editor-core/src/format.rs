//! Per-element-type formatting and the document-wide format set.
//!
//! Every `ElementFormat` carries a revision stamp taken from a process-wide
//! counter whenever one of its properties actually changes. Blocks remember
//! the revision they were last formatted with, so staleness is a cheap
//! comparison at reformat time rather than a fan-out of notifications.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::config::EditorConfig;
use crate::element::ElementType;
use crate::notify::{Notifier, Observable};
use crate::page::PageLayout;
use crate::script::LanguageFonts;

static FORMAT_REVISION: AtomicU64 = AtomicU64::new(1);

fn next_revision() -> u64 {
    FORMAT_REVISION.fetch_add(1, Ordering::Relaxed)
}

pub const DEFAULT_FONT_FAMILY: &str = "Courier Prime";
pub const DEFAULT_FONT_POINT_SIZE: u32 = 12;
/// Logical DPI assumed for on-screen pixel sizes until told otherwise.
pub const DEFAULT_SCREEN_DPI: f32 = 96.0;

/// An RGBA colour packed as `0xRRGGBBAA`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color(pub u32);

impl Color {
    pub const TRANSPARENT: Color = Color(0x0000_0000);
    pub const BLACK: Color = Color(0x0000_00FF);
    pub const WHITE: Color = Color(0xFFFF_FFFF);

    /// Alpha used for every non-transparent background (25%).
    pub const BACKGROUND_ALPHA: u8 = 0x40;

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Color((r as u32) << 24 | (g as u32) << 16 | (b as u32) << 8 | a as u32)
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 0xFF)
    }

    pub fn red(self) -> u8 {
        (self.0 >> 24) as u8
    }

    pub fn green(self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub fn blue(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub fn alpha(self) -> u8 {
        self.0 as u8
    }

    pub fn with_alpha(self, alpha: u8) -> Self {
        Color((self.0 & 0xFFFF_FF00) | alpha as u32)
    }

    pub fn is_transparent(self) -> bool {
        self.alpha() == 0
    }

    /// Map any colour onto the two representable background states.
    ///
    /// Black and white (at any alpha) become transparent; every other hue is
    /// kept at 25% opacity.
    pub fn normalize_background(self) -> Self {
        let opaque = self.with_alpha(0xFF);
        if opaque == Color::BLACK || opaque == Color::WHITE {
            Color::TRANSPARENT
        } else {
            self.with_alpha(Self::BACKGROUND_ALPHA)
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextAlignment {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

/// Where a block narrower than the page sits horizontally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockAlignment {
    Left,
    #[default]
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capitalization {
    #[default]
    Mixed,
    AllUppercase,
    AllLowercase,
    SmallCaps,
    Capitalize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Font {
    pub family: SmolStr,
    pub point_size: u32,
    pub weight: u16,
    pub italic: bool,
    pub underline: bool,
    pub overline: bool,
    pub strike_out: bool,
    /// Percentage; 100 is unstretched.
    pub stretch: u16,
    pub capitalization: Capitalization,
    pub letter_spacing: f32,
    pub word_spacing: f32,
}

impl Default for Font {
    fn default() -> Self {
        Self::new(DEFAULT_FONT_FAMILY, DEFAULT_FONT_POINT_SIZE)
    }
}

impl Font {
    pub const WEIGHT_NORMAL: u16 = 400;
    pub const WEIGHT_BOLD: u16 = 700;

    pub fn new(family: impl Into<SmolStr>, point_size: u32) -> Self {
        Self {
            family: family.into(),
            point_size,
            weight: Self::WEIGHT_NORMAL,
            italic: false,
            underline: false,
            overline: false,
            strike_out: false,
            stretch: 100,
            capitalization: Capitalization::Mixed,
            letter_spacing: 0.0,
            word_spacing: 0.0,
        }
    }

    pub fn is_bold(&self) -> bool {
        self.weight >= Self::WEIGHT_BOLD
    }

    pub fn set_bold(&mut self, bold: bool) {
        self.weight = if bold {
            Self::WEIGHT_BOLD
        } else {
            Self::WEIGHT_NORMAL
        };
    }

    /// Rendered pixel height at `dpi`.
    pub fn pixel_size(&self, dpi: f32) -> u32 {
        (self.point_size as f32 * dpi / 72.0).round() as u32
    }
}

/// Paragraph-level formatting produced for a block.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct BlockFormat {
    pub left_margin: f32,
    pub right_margin: f32,
    pub top_margin: f32,
    pub bottom_margin: f32,
    /// Proportional line height, in percent.
    pub line_height_percent: f32,
    pub alignment: TextAlignment,
    pub background: Color,
    pub foreground: Color,
}

/// Character-level formatting produced for a block.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CharFormat {
    pub family: SmolStr,
    pub point_size: u32,
    pub weight: u16,
    pub italic: bool,
    pub underline: bool,
    pub overline: bool,
    pub strike_out: bool,
    pub stretch: u16,
    pub capitalization: Capitalization,
    pub letter_spacing: f32,
    pub word_spacing: f32,
    pub background: Color,
    pub foreground: Color,
}

impl CharFormat {
    pub fn font(&self) -> Font {
        Font {
            family: self.family.clone(),
            point_size: self.point_size,
            weight: self.weight,
            italic: self.italic,
            underline: self.underline,
            overline: self.overline,
            strike_out: self.strike_out,
            stretch: self.stretch,
            capitalization: self.capitalization,
            letter_spacing: self.letter_spacing,
            word_spacing: self.word_spacing,
        }
    }
}

/// Property groups that can be copied from one element format to all others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormatProperty {
    FontFamily,
    FontSize,
    FontStyle,
    LineHeight,
    TextAndBackgroundColors,
    TextAlignment,
    BlockWidth,
    BlockAlignment,
    Margins,
}

/// The visual contract for one element type.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementFormat {
    element_type: ElementType,
    font: Font,
    text_color: Color,
    background_color: Color,
    text_alignment: TextAlignment,
    block_width: f32,
    block_alignment: BlockAlignment,
    top_margin: f32,
    bottom_margin: f32,
    line_height: f32,
    revision: u64,
}

macro_rules! setter {
    ($name:ident, $field:ident, $ty:ty) => {
        pub fn $name(&mut self, value: $ty) -> bool {
            if self.$field == value {
                return false;
            }
            self.$field = value;
            self.touch();
            true
        }
    };
}

macro_rules! font_setter {
    ($name:ident, $field:ident, $ty:ty) => {
        pub fn $name(&mut self, value: $ty) -> bool {
            if self.font.$field == value {
                return false;
            }
            self.font.$field = value;
            self.touch();
            true
        }
    };
}

impl ElementFormat {
    pub fn new(element_type: ElementType, font: Font) -> Self {
        Self {
            element_type,
            font,
            text_color: Color::BLACK,
            background_color: Color::TRANSPARENT,
            text_alignment: TextAlignment::Left,
            block_width: 1.0,
            block_alignment: BlockAlignment::Center,
            top_margin: 20.0,
            bottom_margin: 0.0,
            line_height: 1.0,
            revision: next_revision(),
        }
    }

    fn touch(&mut self) {
        self.revision = next_revision();
    }

    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn font(&self) -> &Font {
        &self.font
    }

    pub fn text_color(&self) -> Color {
        self.text_color
    }

    pub fn background_color(&self) -> Color {
        self.background_color
    }

    pub fn text_alignment(&self) -> TextAlignment {
        self.text_alignment
    }

    pub fn block_width(&self) -> f32 {
        self.block_width
    }

    pub fn block_alignment(&self) -> BlockAlignment {
        self.block_alignment
    }

    pub fn top_margin(&self) -> f32 {
        self.top_margin
    }

    pub fn bottom_margin(&self) -> f32 {
        self.bottom_margin
    }

    pub fn line_height(&self) -> f32 {
        self.line_height
    }

    setter!(set_font, font, Font);
    setter!(set_text_color, text_color, Color);
    setter!(set_text_alignment, text_alignment, TextAlignment);
    setter!(set_block_alignment, block_alignment, BlockAlignment);
    setter!(set_top_margin, top_margin, f32);
    setter!(set_bottom_margin, bottom_margin, f32);
    setter!(set_line_height, line_height, f32);

    font_setter!(set_font_point_size, point_size, u32);
    font_setter!(set_font_italic, italic, bool);
    font_setter!(set_font_underline, underline, bool);
    font_setter!(set_font_capitalization, capitalization, Capitalization);

    pub fn set_font_family(&mut self, family: &str) -> bool {
        if self.font.family == family {
            return false;
        }
        self.font.family = SmolStr::new(family);
        self.touch();
        true
    }

    pub fn set_font_bold(&mut self, bold: bool) -> bool {
        if self.font.is_bold() == bold {
            return false;
        }
        self.font.set_bold(bold);
        self.touch();
        true
    }

    /// Stored normalized; see [`Color::normalize_background`].
    pub fn set_background_color(&mut self, color: Color) -> bool {
        let color = color.normalize_background();
        if self.background_color == color {
            return false;
        }
        self.background_color = color;
        self.touch();
        true
    }

    /// Clamped into `[0.1, 1.0]`.
    pub fn set_block_width(&mut self, width: f32) -> bool {
        let width = width.clamp(0.1, 1.0);
        if (self.block_width - width).abs() < f32::EPSILON {
            return false;
        }
        self.block_width = width;
        self.touch();
        true
    }

    /// Copy one property group from `from`.
    fn copy_property(&mut self, from: &ElementFormat, property: FormatProperty) -> bool {
        match property {
            FormatProperty::FontFamily => self.set_font_family(&from.font.family),
            FormatProperty::FontSize => self.set_font_point_size(from.font.point_size),
            FormatProperty::FontStyle => {
                let bold = self.set_font_bold(from.font.is_bold());
                let italic = self.set_font_italic(from.font.italic);
                let underline = self.set_font_underline(from.font.underline);
                bold | italic | underline
            }
            FormatProperty::LineHeight => self.set_line_height(from.line_height),
            FormatProperty::TextAndBackgroundColors => {
                let text = self.set_text_color(from.text_color);
                let background = self.set_background_color(from.background_color);
                text | background
            }
            FormatProperty::TextAlignment => self.set_text_alignment(from.text_alignment),
            FormatProperty::BlockWidth => self.set_block_width(from.block_width),
            FormatProperty::BlockAlignment => self.set_block_alignment(from.block_alignment),
            FormatProperty::Margins => {
                let top = self.set_top_margin(from.top_margin);
                let bottom = self.set_bottom_margin(from.bottom_margin);
                top | bottom
            }
        }
    }
}

/// Notifications emitted by a format set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatEvent {
    ElementFormatChanged(ElementType),
    DefaultFontChanged,
    PageLayoutChanged,
    LanguageFontsChanged,
}

/// Shared handle to a format set.
pub type SharedFormatSet = std::rc::Rc<std::cell::RefCell<FormatSet>>;

/// One `ElementFormat` per element type plus document-wide settings.
#[derive(Debug)]
pub struct FormatSet {
    formats: Vec<ElementFormat>,
    default_font: Font,
    font_point_size_delta: u32,
    min_font_pixel_size: u32,
    screen_dpi: f32,
    page_layout: PageLayout,
    language_fonts: LanguageFonts,
    revision: u64,
    /// Bumped by changes that affect every element type at once.
    shared_revision: u64,
    notifier: Notifier<FormatEvent>,
}

impl Default for FormatSet {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatSet {
    /// A format set with the standard screenplay formats.
    pub fn new() -> Self {
        Self::from_config(&EditorConfig::default())
    }

    pub fn from_config(config: &EditorConfig) -> Self {
        let default_font = Font::default();
        let formats = ElementType::ALL
            .iter()
            .map(|ty| ElementFormat::new(*ty, default_font.clone()))
            .collect();
        let mut set = Self {
            formats,
            default_font: default_font.clone(),
            font_point_size_delta: 0,
            min_font_pixel_size: config.min_font_pixel_size,
            screen_dpi: DEFAULT_SCREEN_DPI,
            page_layout: PageLayout::default(),
            language_fonts: config.language_fonts.clone(),
            revision: next_revision(),
            shared_revision: next_revision(),
            notifier: Notifier::new(),
        };
        set.font_point_size_delta = set.compute_point_size_delta(&default_font);
        set.reset_to_defaults();
        set
    }

    pub fn into_shared(self) -> SharedFormatSet {
        std::rc::Rc::new(std::cell::RefCell::new(self))
    }

    pub fn notifier(&self) -> &Notifier<FormatEvent> {
        &self.notifier
    }

    pub fn notifier_mut(&mut self) -> &mut Notifier<FormatEvent> {
        &mut self.notifier
    }

    /// Set-wide revision, bumped by every effective change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn element_format(&self, element_type: ElementType) -> &ElementFormat {
        &self.formats[element_type.index()]
    }

    /// Fingerprint of everything that goes into formatting `element_type`.
    ///
    /// Revisions come from one monotonic counter, so the larger of the two
    /// stamps changes whenever either does.
    pub fn format_revision(&self, element_type: ElementType) -> u64 {
        self.formats[element_type.index()]
            .revision
            .max(self.shared_revision)
    }

    fn bump_shared(&mut self) {
        self.shared_revision = next_revision();
        self.revision = self.shared_revision;
    }

    /// Mutate one element format. Emits a change only if something changed.
    pub fn update<R>(
        &mut self,
        element_type: ElementType,
        f: impl FnOnce(&mut ElementFormat) -> R,
    ) -> R {
        let format = &mut self.formats[element_type.index()];
        let before = format.revision;
        let result = f(format);
        if format.revision != before {
            self.revision = next_revision();
            self.notifier
                .emit(FormatEvent::ElementFormatChanged(element_type));
        }
        result
    }

    /// Copy one property group from `from`'s format to every other type.
    pub fn apply_to_all(&mut self, from: ElementType, property: FormatProperty) {
        let source = self.formats[from.index()].clone();
        for ty in ElementType::ALL {
            if ty == from {
                continue;
            }
            self.update(ty, |format| format.copy_property(&source, property));
        }
    }

    /// Restore the industry-standard screenplay formats.
    pub fn reset_to_defaults(&mut self) {
        self.set_default_font(Font::new(DEFAULT_FONT_FAMILY, DEFAULT_FONT_POINT_SIZE));
        let font = self.default_font.clone();
        let base_point_size = font.point_size;

        for ty in ElementType::ALL {
            self.update(ty, |f| f.set_font(font.clone()));
        }

        self.update(ElementType::Action, |f| {
            f.set_text_alignment(TextAlignment::Justify);
        });
        self.update(ElementType::Character, |f| {
            f.set_block_width(0.6);
            f.set_text_alignment(TextAlignment::Center);
            f.set_font_bold(true);
            f.set_font_capitalization(Capitalization::AllUppercase);
        });
        self.update(ElementType::Dialogue, |f| {
            f.set_block_width(0.6);
            f.set_text_alignment(TextAlignment::Justify);
            f.set_top_margin(0.0);
        });
        self.update(ElementType::Parenthetical, |f| {
            f.set_block_width(0.5);
            f.set_text_alignment(TextAlignment::Center);
            f.set_font_italic(true);
            f.set_top_margin(0.0);
        });
        self.update(ElementType::Shot, |f| {
            f.set_text_alignment(TextAlignment::Left);
            f.set_block_width(0.85);
            f.set_block_alignment(BlockAlignment::Center);
            f.set_font_capitalization(Capitalization::AllUppercase);
        });
        self.update(ElementType::Transition, |f| {
            f.set_text_alignment(TextAlignment::Right);
            f.set_font_capitalization(Capitalization::AllUppercase);
        });
        self.update(ElementType::Heading, |f| {
            f.set_font_bold(true);
            f.set_font_point_size(base_point_size + 2);
            f.set_font_capitalization(Capitalization::AllUppercase);
        });
    }

    pub fn default_font(&self) -> &Font {
        &self.default_font
    }

    /// Replace the default font and recompute the point-size delta.
    pub fn set_default_font(&mut self, font: Font) -> bool {
        if self.default_font == font {
            return false;
        }
        self.font_point_size_delta = self.compute_point_size_delta(&font);
        self.default_font = font;
        self.bump_shared();
        self.notifier.emit(FormatEvent::DefaultFontChanged);
        true
    }

    /// Points added to every element's font so text clears the pixel floor.
    pub fn font_point_size_delta(&self) -> u32 {
        self.font_point_size_delta
    }

    fn compute_point_size_delta(&self, font: &Font) -> u32 {
        let mut probe = font.clone();
        if probe.point_size == 0 {
            probe.point_size = 1;
        }
        while probe.pixel_size(self.screen_dpi) < self.min_font_pixel_size {
            probe.point_size += 1;
        }
        probe.point_size.saturating_sub(font.point_size)
    }

    pub fn screen_dpi(&self) -> f32 {
        self.screen_dpi
    }

    pub fn set_screen_dpi(&mut self, dpi: f32) {
        let dpi = dpi.max(1.0);
        if (self.screen_dpi - dpi).abs() < f32::EPSILON {
            return;
        }
        self.screen_dpi = dpi;
        let delta = self.compute_point_size_delta(&self.default_font);
        if delta != self.font_point_size_delta {
            self.font_point_size_delta = delta;
            self.bump_shared();
            self.notifier.emit(FormatEvent::DefaultFontChanged);
        }
    }

    pub fn page_layout(&self) -> &PageLayout {
        &self.page_layout
    }

    pub fn set_page_layout(&mut self, layout: PageLayout) {
        if self.page_layout == layout {
            return;
        }
        self.page_layout = layout;
        self.bump_shared();
        self.notifier.emit(FormatEvent::PageLayoutChanged);
    }

    pub fn language_fonts(&self) -> &LanguageFonts {
        &self.language_fonts
    }

    pub fn set_language_fonts(&mut self, fonts: LanguageFonts) {
        if self.language_fonts == fonts {
            return;
        }
        self.language_fonts = fonts;
        self.bump_shared();
        self.notifier.emit(FormatEvent::LanguageFontsChanged);
    }
}

impl Observable for FormatSet {
    type Event = FormatEvent;

    fn notifier_mut(&mut self) -> &mut Notifier<FormatEvent> {
        &mut self.notifier
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::Language;

    #[test]
    fn test_background_normalization() {
        assert_eq!(
            Color::WHITE.normalize_background(),
            Color::TRANSPARENT
        );
        assert_eq!(
            Color::BLACK.normalize_background(),
            Color::TRANSPARENT
        );
        assert_eq!(
            Color::rgba(0, 0, 0, 0x80).normalize_background(),
            Color::TRANSPARENT
        );
        assert_eq!(
            Color::rgb(0x12, 0x34, 0x56).normalize_background(),
            Color(0x1234_5640)
        );
    }

    #[test]
    fn test_setter_without_change_keeps_revision() {
        let mut format = ElementFormat::new(ElementType::Action, Font::default());
        let rev = format.revision();
        assert!(!format.set_text_alignment(TextAlignment::Left));
        assert_eq!(format.revision(), rev);
        assert!(format.set_text_alignment(TextAlignment::Right));
        assert!(format.revision() > rev);
    }

    #[test]
    fn test_block_width_is_clamped() {
        let mut format = ElementFormat::new(ElementType::Action, Font::default());
        format.set_block_width(0.0);
        assert_eq!(format.block_width(), 0.1);
        format.set_block_width(7.0);
        assert_eq!(format.block_width(), 1.0);
    }

    #[test]
    fn test_point_size_delta_reaches_pixel_floor() {
        let set = FormatSet::new();
        // 12pt at 96 dpi renders at 16px; 16pt is the first size at 21px or more.
        assert_eq!(set.font_point_size_delta(), 4);
    }

    #[test]
    fn test_defaults_follow_screenplay_conventions() {
        let set = FormatSet::new();
        let character = set.element_format(ElementType::Character);
        assert_eq!(character.block_width(), 0.6);
        assert!(character.font().is_bold());
        assert_eq!(
            character.font().capitalization,
            Capitalization::AllUppercase
        );

        let heading = set.element_format(ElementType::Heading);
        assert_eq!(heading.font().point_size, DEFAULT_FONT_POINT_SIZE + 2);

        let transition = set.element_format(ElementType::Transition);
        assert_eq!(transition.text_alignment(), TextAlignment::Right);
    }

    #[test]
    fn test_update_emits_only_on_change() {
        let mut set = FormatSet::new();
        let sub = set.notifier_mut().subscribe();

        set.update(ElementType::Dialogue, |f| f.set_top_margin(0.0));
        assert!(set.notifier_mut().drain(sub).is_empty());

        set.update(ElementType::Dialogue, |f| f.set_top_margin(4.0));
        assert_eq!(
            set.notifier_mut().drain(sub),
            vec![FormatEvent::ElementFormatChanged(ElementType::Dialogue)]
        );
    }

    #[test]
    fn test_shared_changes_restale_every_type() {
        let mut set = FormatSet::new();
        let before = set.format_revision(ElementType::Dialogue);
        set.set_page_layout(PageLayout::new(crate::page::PaperSize::A4, 72.0));
        assert!(set.format_revision(ElementType::Dialogue) > before);

        let before = set.format_revision(ElementType::Action);
        set.update(ElementType::Dialogue, |f| f.set_top_margin(9.0));
        assert_eq!(set.format_revision(ElementType::Action), before);
    }

    #[test]
    fn test_language_fonts_change_restales_and_notifies() {
        let mut set = FormatSet::new();
        let sub = set.notifier_mut().subscribe();
        let before = set.format_revision(ElementType::Dialogue);

        let unchanged = set.language_fonts().clone();
        set.set_language_fonts(unchanged);
        assert!(set.notifier_mut().drain(sub).is_empty());
        assert_eq!(set.format_revision(ElementType::Dialogue), before);

        let mut fonts = set.language_fonts().clone();
        fonts.set_family(Language::Hindi, "Other Hindi");
        set.set_language_fonts(fonts);
        assert!(set.format_revision(ElementType::Dialogue) > before);
        assert_eq!(
            set.notifier_mut().drain(sub),
            vec![FormatEvent::LanguageFontsChanged]
        );
    }

    #[test]
    fn test_apply_to_all_copies_one_group() {
        let mut set = FormatSet::new();
        set.update(ElementType::Action, |f| f.set_line_height(1.5));
        set.apply_to_all(ElementType::Action, FormatProperty::LineHeight);

        for ty in ElementType::ALL {
            assert_eq!(set.element_format(ty).line_height(), 1.5);
        }
        // Other groups untouched.
        assert_eq!(
            set.element_format(ElementType::Character).block_width(),
            0.6
        );
    }
}
