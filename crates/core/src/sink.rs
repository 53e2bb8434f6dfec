//! The document-authoring surface a deck is generated into.
//!
//! Geometry is in points with the origin at the top-left of the page.

use crate::Result;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Page dimensions in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    /// 16:9 widescreen, 13.333in x 7.5in.
    pub const WIDESCREEN: Self = Self {
        width: 960.0,
        height: 540.0,
    };

    /// Rectangle expressed as fractions of the page.
    pub fn fraction(&self, left: f64, top: f64, width: f64, height: f64) -> Rect {
        Rect {
            left: self.width * left,
            top: self.height * top,
            width: self.width * width,
            height: self.height * height,
        }
    }
}

/// Positioned rectangle in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// Width and height in points (or pixels, for natural image sizes).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

/// Predefined slide templates a sink must offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlideTemplate {
    /// Centered title plus subtitle.
    Title,
    /// Title plus body.
    TitleAndBody,
}

/// Role tag carried by a template region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegionRole {
    CenteredTitle,
    Title,
    Subtitle,
    Body,
}

/// Handle to a slide inside a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlideId(pub usize);

/// Handle to a text region inside a slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegionId(pub usize);

/// A template region as discovered on a freshly created slide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionInfo {
    pub id: RegionId,

    /// `None` for regions the template does not tag.
    pub role: Option<RegionRole>,
}

/// Paragraph alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Alignment {
    Left,
    Center,
    Right,
}

/// Partial character style. Unset fields leave the current value alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    /// Font size in points.
    pub font_size: Option<f64>,
    pub font_family: Option<String>,
    /// `#RRGGBB` foreground color.
    pub color: Option<String>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
}

impl TextStyle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn size(mut self, points: f64) -> Self {
        self.font_size = Some(points);
        self
    }

    pub fn family(mut self, family: impl Into<String>) -> Self {
        self.font_family = Some(family.into());
        self
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn bold(mut self, bold: bool) -> Self {
        self.bold = Some(bold);
        self
    }

    pub fn italic(mut self, italic: bool) -> Self {
        self.italic = Some(italic);
        self
    }

    /// Overlay `other` on top of `self`.
    pub fn merged(&self, other: &TextStyle) -> TextStyle {
        TextStyle {
            font_size: other.font_size.or(self.font_size),
            font_family: other
                .font_family
                .clone()
                .or_else(|| self.font_family.clone()),
            color: other.color.clone().or_else(|| self.color.clone()),
            bold: other.bold.or(self.bold),
            italic: other.italic.or(self.italic),
        }
    }
}

/// A labeled rectangle drawn in place of missing media.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeSpec {
    pub label: String,
    pub label_style: TextStyle,
    pub fill_color: String,
    pub border_color: String,
    /// Border weight in points.
    pub border_weight: f64,
}

/// Capability interface for building a slide document.
///
/// Text ranges are character (not byte) offsets into the region's text.
pub trait DocumentSink {
    /// Start a new, empty document with the given title. Any implicit first
    /// slide the host adds is removed.
    fn start_document(&mut self, title: &str) -> Result<()>;

    fn page_size(&self) -> PageSize;

    /// Append a slide built from `template`.
    fn create_slide(&mut self, template: SlideTemplate) -> Result<SlideId>;

    /// All slides in document order.
    fn slides(&self) -> Vec<SlideId>;

    /// Regions the template placed on `slide`.
    fn regions(&self, slide: SlideId) -> Result<Vec<RegionInfo>>;

    /// Replace the text of a region.
    fn set_text(&mut self, slide: SlideId, region: RegionId, text: &str) -> Result<()>;

    /// Style the whole region text, or only `range` of it.
    fn style_text(
        &mut self,
        slide: SlideId,
        region: RegionId,
        range: Option<Range<usize>>,
        style: &TextStyle,
    ) -> Result<()>;

    fn set_alignment(&mut self, slide: SlideId, region: RegionId, alignment: Alignment)
        -> Result<()>;

    fn set_background(&mut self, slide: SlideId, color: &str) -> Result<()>;

    /// Insert image bytes occupying `frame`.
    fn insert_image(&mut self, slide: SlideId, bytes: &[u8], frame: Rect) -> Result<()>;

    /// Insert a filled, bordered rectangle with a centered label.
    fn insert_shape(&mut self, slide: SlideId, frame: Rect, shape: &ShapeSpec) -> Result<()>;

    /// Insert a free-standing text box.
    fn insert_text_box(
        &mut self,
        slide: SlideId,
        frame: Rect,
        text: &str,
        style: &TextStyle,
        alignment: Alignment,
    ) -> Result<()>;

    /// Attach speaker notes, optionally styled.
    fn set_speaker_notes(
        &mut self,
        slide: SlideId,
        text: &str,
        style: Option<&TextStyle>,
    ) -> Result<()>;
}
