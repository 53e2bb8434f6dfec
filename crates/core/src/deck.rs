//! In-memory slide document.
//!
//! [`Deck`] is the reference [`DocumentSink`]: generation writes into it and
//! backends such as the PPTX writer serialize it afterwards.

use crate::sink::{
    Alignment, DocumentSink, PageSize, Rect, RegionId, RegionInfo, RegionRole, ShapeSpec,
    SlideId, SlideTemplate, TextStyle,
};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// A generated slide document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deck {
    /// Document title.
    pub title: String,

    /// Page dimensions shared by every slide.
    pub page: PageSize,

    /// Slides in presentation order.
    pub slides: Vec<DeckSlide>,
}

impl Deck {
    /// Create an empty, untitled deck.
    pub fn new(page: PageSize) -> Self {
        Self {
            title: String::new(),
            page,
            slides: Vec::new(),
        }
    }

    /// Look up a slide by handle.
    pub fn slide(&self, id: SlideId) -> Option<&DeckSlide> {
        self.slides.iter().find(|s| s.id == id)
    }

    fn slide_mut(&mut self, id: SlideId) -> Result<&mut DeckSlide> {
        self.slides
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| Error::DocumentError(format!("no slide with id {}", id.0)))
    }

    fn region_mut(&mut self, slide: SlideId, region: RegionId) -> Result<&mut TextRegion> {
        self.slide_mut(slide)?
            .elements
            .iter_mut()
            .find_map(|e| match e {
                Element::Region(r) if r.id == region => Some(r),
                _ => None,
            })
            .ok_or_else(|| {
                Error::DocumentError(format!(
                    "no region {} on slide {}",
                    region.0, slide.0
                ))
            })
    }
}

impl Default for Deck {
    fn default() -> Self {
        Self::new(PageSize::WIDESCREEN)
    }
}

/// One slide of a [`Deck`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeckSlide {
    pub id: SlideId,

    pub template: SlideTemplate,

    /// `#RRGGBB` background, `None` for the template default.
    pub background: Option<String>,

    /// Elements in z-order, back to front.
    pub elements: Vec<Element>,

    pub notes: Option<TextFrame>,
}

impl DeckSlide {
    /// First region tagged with `role`.
    pub fn region(&self, role: RegionRole) -> Option<&TextRegion> {
        self.elements.iter().find_map(|e| match e {
            Element::Region(r) if r.role == Some(role) => Some(r),
            _ => None,
        })
    }

    pub fn images(&self) -> impl Iterator<Item = &ImageElement> {
        self.elements.iter().filter_map(|e| match e {
            Element::Image(i) => Some(i),
            _ => None,
        })
    }

    pub fn shapes(&self) -> impl Iterator<Item = &ShapeElement> {
        self.elements.iter().filter_map(|e| match e {
            Element::Shape(s) => Some(s),
            _ => None,
        })
    }

    pub fn text_boxes(&self) -> impl Iterator<Item = &TextBoxElement> {
        self.elements.iter().filter_map(|e| match e {
            Element::TextBox(t) => Some(t),
            _ => None,
        })
    }

    /// Speaker notes text, if any.
    pub fn notes_text(&self) -> Option<&str> {
        self.notes.as_ref().map(|n| n.text.as_str())
    }
}

/// A drawable element on a slide.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Element {
    /// Template placeholder region.
    Region(TextRegion),
    Image(ImageElement),
    Shape(ShapeElement),
    TextBox(TextBoxElement),
}

/// A template placeholder holding text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextRegion {
    pub id: RegionId,
    pub role: Option<RegionRole>,
    pub frame: Rect,
    pub body: TextFrame,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageElement {
    pub frame: Rect,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShapeElement {
    pub frame: Rect,
    pub shape: ShapeSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextBoxElement {
    pub frame: Rect,
    pub body: TextFrame,
}

/// Text with layered style spans and a paragraph alignment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextFrame {
    pub text: String,

    /// Applied in order; later spans win where they overlap.
    pub styles: Vec<StyleSpan>,

    pub alignment: Option<Alignment>,
}

/// A style applied to the whole text (`range: None`) or a char range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleSpan {
    pub range: Option<Range<usize>>,
    pub style: TextStyle,
}

/// A run of identically styled text.
#[derive(Debug, Clone, PartialEq)]
pub struct StyledRun {
    pub text: String,
    pub style: TextStyle,
}

impl TextFrame {
    /// Unstyled text.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Text with a single whole-text style.
    pub fn styled(text: impl Into<String>, style: TextStyle) -> Self {
        Self {
            text: text.into(),
            styles: vec![StyleSpan { range: None, style }],
            alignment: None,
        }
    }

    /// Effective style at each character position.
    fn char_styles(&self) -> Vec<TextStyle> {
        (0..self.text.chars().count())
            .map(|idx| {
                self.styles
                    .iter()
                    .filter(|span| span.range.as_ref().map_or(true, |r| r.contains(&idx)))
                    .fold(TextStyle::default(), |acc, span| acc.merged(&span.style))
            })
            .collect()
    }

    /// Split into paragraphs (on `\n`), each a list of styled runs.
    ///
    /// An empty paragraph yields an empty run list.
    pub fn paragraphs(&self) -> Vec<Vec<StyledRun>> {
        let styles = self.char_styles();
        let mut paragraphs: Vec<Vec<StyledRun>> = vec![Vec::new()];

        for (c, style) in self.text.chars().zip(styles) {
            if c == '\n' {
                paragraphs.push(Vec::new());
                continue;
            }
            let Some(current) = paragraphs.last_mut() else {
                continue;
            };
            match current.last_mut() {
                Some(run) if run.style == style => run.text.push(c),
                _ => current.push(StyledRun {
                    text: c.to_string(),
                    style,
                }),
            }
        }

        paragraphs
    }

    /// Style covering the first character, or the whole-text style for empty text.
    pub fn leading_style(&self) -> TextStyle {
        self.char_styles().into_iter().next().unwrap_or_else(|| {
            self.styles
                .iter()
                .filter(|s| s.range.is_none())
                .fold(TextStyle::default(), |acc, s| acc.merged(&s.style))
        })
    }

    fn apply(&mut self, range: Option<Range<usize>>, style: &TextStyle) -> Result<()> {
        if let Some(r) = &range {
            let len = self.text.chars().count();
            if r.start > r.end || r.end > len {
                return Err(Error::StyleError(format!(
                    "range {}..{} out of bounds for text of length {}",
                    r.start, r.end, len
                )));
            }
        }
        validate_style(style)?;
        self.styles.push(StyleSpan {
            range,
            style: style.clone(),
        });
        Ok(())
    }
}

/// Normalize a `#RRGGBB` color to bare uppercase hex.
pub fn hex_color(value: &str) -> Option<String> {
    let hex = value.trim().strip_prefix('#')?;
    if hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
        Some(hex.to_ascii_uppercase())
    } else {
        None
    }
}

fn validate_style(style: &TextStyle) -> Result<()> {
    if let Some(size) = style.font_size {
        if !(size.is_finite() && size > 0.0) {
            return Err(Error::StyleError(format!("invalid font size {}", size)));
        }
    }
    if let Some(color) = &style.color {
        if hex_color(color).is_none() {
            return Err(Error::StyleError(format!("invalid color '{}'", color)));
        }
    }
    if let Some(family) = &style.font_family {
        if family.trim().is_empty() {
            return Err(Error::StyleError("empty font family".to_string()));
        }
    }
    Ok(())
}

fn validate_frame(frame: &Rect) -> Result<()> {
    let values = [frame.left, frame.top, frame.width, frame.height];
    if values.iter().all(|v| v.is_finite()) && frame.width > 0.0 && frame.height > 0.0 {
        Ok(())
    } else {
        Err(Error::DocumentError(format!("invalid frame {:?}", frame)))
    }
}

fn template_regions(template: SlideTemplate, page: &PageSize) -> Vec<(RegionRole, Rect)> {
    match template {
        SlideTemplate::Title => vec![
            (RegionRole::CenteredTitle, page.fraction(0.075, 0.29, 0.85, 0.2)),
            (RegionRole::Subtitle, page.fraction(0.15, 0.53, 0.7, 0.14)),
        ],
        SlideTemplate::TitleAndBody => vec![
            (RegionRole::Title, page.fraction(0.05, 0.05, 0.9, 0.15)),
            (RegionRole::Body, page.fraction(0.05, 0.23, 0.9, 0.65)),
        ],
    }
}

impl DocumentSink for Deck {
    fn start_document(&mut self, title: &str) -> Result<()> {
        self.title = title.to_string();
        self.slides.clear();
        Ok(())
    }

    fn page_size(&self) -> PageSize {
        self.page
    }

    fn create_slide(&mut self, template: SlideTemplate) -> Result<SlideId> {
        let id = SlideId(self.slides.iter().map(|s| s.id.0 + 1).max().unwrap_or(0));
        let elements = template_regions(template, &self.page)
            .into_iter()
            .enumerate()
            .map(|(idx, (role, frame))| {
                Element::Region(TextRegion {
                    id: RegionId(idx),
                    role: Some(role),
                    frame,
                    body: TextFrame::default(),
                })
            })
            .collect();

        self.slides.push(DeckSlide {
            id,
            template,
            background: None,
            elements,
            notes: None,
        });
        Ok(id)
    }

    fn slides(&self) -> Vec<SlideId> {
        self.slides.iter().map(|s| s.id).collect()
    }

    fn regions(&self, slide: SlideId) -> Result<Vec<RegionInfo>> {
        let slide = self
            .slide(slide)
            .ok_or_else(|| Error::DocumentError(format!("no slide with id {}", slide.0)))?;
        Ok(slide
            .elements
            .iter()
            .filter_map(|e| match e {
                Element::Region(r) => Some(RegionInfo {
                    id: r.id,
                    role: r.role,
                }),
                _ => None,
            })
            .collect())
    }

    fn set_text(&mut self, slide: SlideId, region: RegionId, text: &str) -> Result<()> {
        let region = self.region_mut(slide, region)?;
        region.body.text = text.to_string();
        region.body.styles.clear();
        Ok(())
    }

    fn style_text(
        &mut self,
        slide: SlideId,
        region: RegionId,
        range: Option<Range<usize>>,
        style: &TextStyle,
    ) -> Result<()> {
        self.region_mut(slide, region)?.body.apply(range, style)
    }

    fn set_alignment(
        &mut self,
        slide: SlideId,
        region: RegionId,
        alignment: Alignment,
    ) -> Result<()> {
        self.region_mut(slide, region)?.body.alignment = Some(alignment);
        Ok(())
    }

    fn set_background(&mut self, slide: SlideId, color: &str) -> Result<()> {
        if hex_color(color).is_none() {
            return Err(Error::StyleError(format!("invalid color '{}'", color)));
        }
        self.slide_mut(slide)?.background = Some(color.to_string());
        Ok(())
    }

    fn insert_image(&mut self, slide: SlideId, bytes: &[u8], frame: Rect) -> Result<()> {
        validate_frame(&frame)?;
        image::guess_format(bytes)
            .map_err(|e| Error::DocumentError(format!("unsupported image data: {}", e)))?;
        self.slide_mut(slide)?.elements.push(Element::Image(ImageElement {
            frame,
            bytes: bytes.to_vec(),
        }));
        Ok(())
    }

    fn insert_shape(&mut self, slide: SlideId, frame: Rect, shape: &ShapeSpec) -> Result<()> {
        validate_frame(&frame)?;
        validate_style(&shape.label_style)?;
        self.slide_mut(slide)?.elements.push(Element::Shape(ShapeElement {
            frame,
            shape: shape.clone(),
        }));
        Ok(())
    }

    fn insert_text_box(
        &mut self,
        slide: SlideId,
        frame: Rect,
        text: &str,
        style: &TextStyle,
        alignment: Alignment,
    ) -> Result<()> {
        validate_frame(&frame)?;
        validate_style(style)?;
        let mut body = TextFrame::styled(text, style.clone());
        body.alignment = Some(alignment);
        self.slide_mut(slide)?
            .elements
            .push(Element::TextBox(TextBoxElement { frame, body }));
        Ok(())
    }

    fn set_speaker_notes(
        &mut self,
        slide: SlideId,
        text: &str,
        style: Option<&TextStyle>,
    ) -> Result<()> {
        let mut notes = TextFrame::plain(text);
        if let Some(style) = style {
            notes.apply(None, style)?;
        }
        self.slide_mut(slide)?.notes = Some(notes);
        Ok(())
    }
}
