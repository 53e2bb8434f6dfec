//! Slide and notes-slide XML for one [`DeckSlide`].

use crate::parts::{escape_text, presentation_ns_attrs, XML_DECLARATION};
use deckgen_core::deck::{hex_color, DeckSlide, Element, TextFrame};
use deckgen_core::sink::{Alignment, Rect, RegionRole, ShapeSpec, TextStyle};
use std::fmt::Write;

/// English Metric Units per point.
pub const EMU_PER_POINT: f64 = 12700.0;

/// Convert points to EMU.
pub fn emu(points: f64) -> i64 {
    (points * EMU_PER_POINT).round() as i64
}

/// Font size in hundredths of a point, clamped to what OOXML accepts.
fn font_size(points: f64) -> i64 {
    ((points * 100.0).round() as i64).clamp(100, 400_000)
}

fn alignment_value(alignment: Alignment) -> &'static str {
    match alignment {
        Alignment::Left => "l",
        Alignment::Center => "ctr",
        Alignment::Right => "r",
    }
}

/// Placeholder attributes for a template region.
fn placeholder(role: RegionRole) -> &'static str {
    match role {
        RegionRole::CenteredTitle => r#"<p:ph type="ctrTitle"/>"#,
        RegionRole::Title => r#"<p:ph type="title"/>"#,
        RegionRole::Subtitle => r#"<p:ph type="subTitle" idx="1"/>"#,
        RegionRole::Body => r#"<p:ph idx="1"/>"#,
    }
}

fn solid_fill(color: &str) -> Option<String> {
    hex_color(color).map(|hex| format!(r#"<a:solidFill><a:srgbClr val="{}"/></a:solidFill>"#, hex))
}

fn transform(frame: &Rect) -> String {
    format!(
        r#"<a:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></a:xfrm>"#,
        emu(frame.left),
        emu(frame.top),
        emu(frame.width),
        emu(frame.height)
    )
}

/// `<a:rPr>`-style element (`tag` is the element name) for a run style.
fn run_properties(tag: &str, style: &TextStyle) -> String {
    let mut attrs = String::from(r#" lang="en-US""#);
    if let Some(size) = style.font_size {
        let _ = write!(attrs, r#" sz="{}""#, font_size(size));
    }
    if let Some(bold) = style.bold {
        let _ = write!(attrs, r#" b="{}""#, u8::from(bold));
    }
    if let Some(italic) = style.italic {
        let _ = write!(attrs, r#" i="{}""#, u8::from(italic));
    }
    attrs.push_str(r#" dirty="0""#);

    let mut children = String::new();
    if let Some(fill) = style.color.as_deref().and_then(solid_fill) {
        children.push_str(&fill);
    }
    if let Some(family) = &style.font_family {
        let _ = write!(children, r#"<a:latin typeface="{}"/>"#, escape_text(family));
    }

    if children.is_empty() {
        format!("<{}{}/>", tag, attrs)
    } else {
        format!("<{0}{1}>{2}</{0}>", tag, attrs, children)
    }
}

/// Vertical tab, used by spreadsheet exports for in-cell line breaks.
const LINE_BREAK: char = '\u{000B}';

/// Paragraph list for a text frame. Vertical tabs become `<a:br/>`.
fn paragraphs(body: &TextFrame) -> String {
    let fallback = body.leading_style();
    let mut xml = String::new();

    for runs in body.paragraphs() {
        xml.push_str("<a:p>");
        if let Some(alignment) = body.alignment {
            let _ = write!(xml, r#"<a:pPr algn="{}"/>"#, alignment_value(alignment));
        }
        if runs.is_empty() {
            xml.push_str(&run_properties("a:endParaRPr", &fallback));
        }
        for run in runs {
            let properties = run_properties("a:rPr", &run.style);
            for (i, segment) in run.text.split(LINE_BREAK).enumerate() {
                if i > 0 {
                    let _ = write!(xml, "<a:br>{}</a:br>", properties);
                }
                if !segment.is_empty() {
                    let _ = write!(xml, "<a:r>{}<a:t>{}</a:t></a:r>", properties, escape_text(segment));
                }
            }
        }
        xml.push_str("</a:p>");
    }
    xml
}

fn text_body(body: &TextFrame, body_pr: &str) -> String {
    format!("<p:txBody>{}<a:lstStyle/>{}</p:txBody>", body_pr, paragraphs(body))
}

/// Accumulates `p:spTree` children with unique shape ids.
struct ShapeTree {
    xml: String,
    next_id: u32,
}

impl ShapeTree {
    fn new() -> Self {
        Self {
            xml: String::new(),
            next_id: 2,
        }
    }

    fn id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn region(&mut self, role: Option<RegionRole>, frame: &Rect, body: &TextFrame) {
        let id = self.id();
        let (name, nv_pr, locks) = match role {
            Some(role) => (
                format!("Placeholder {}", id - 1),
                format!("<p:nvPr>{}</p:nvPr>", placeholder(role)),
                r#"<p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr>"#,
            ),
            None => (
                format!("TextBox {}", id - 1),
                "<p:nvPr/>".to_string(),
                r#"<p:cNvSpPr txBox="1"/>"#,
            ),
        };
        let _ = write!(
            self.xml,
            r#"<p:sp><p:nvSpPr><p:cNvPr id="{}" name="{}"/>{}{}</p:nvSpPr><p:spPr>{}</p:spPr>{}</p:sp>"#,
            id,
            name,
            locks,
            nv_pr,
            transform(frame),
            text_body(body, "<a:bodyPr/>")
        );
    }

    fn picture(&mut self, frame: &Rect, rid: &str) {
        let id = self.id();
        let _ = write!(
            self.xml,
            concat!(
                r#"<p:pic><p:nvPicPr><p:cNvPr id="{0}" name="Picture {1}"/>"#,
                r#"<p:cNvPicPr><a:picLocks noChangeAspect="1"/></p:cNvPicPr><p:nvPr/></p:nvPicPr>"#,
                r#"<p:blipFill><a:blip r:embed="{2}"/><a:stretch><a:fillRect/></a:stretch></p:blipFill>"#,
                r#"<p:spPr>{3}<a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr></p:pic>"#
            ),
            id,
            id - 1,
            rid,
            transform(frame)
        );
    }

    fn shape(&mut self, frame: &Rect, shape: &ShapeSpec) {
        let id = self.id();
        let fill = solid_fill(&shape.fill_color).unwrap_or_else(|| "<a:noFill/>".to_string());
        let line = match solid_fill(&shape.border_color) {
            Some(fill) => format!(r#"<a:ln w="{}">{}</a:ln>"#, emu(shape.border_weight), fill),
            None => "<a:ln><a:noFill/></a:ln>".to_string(),
        };
        let mut label = TextFrame::styled(shape.label.as_str(), shape.label_style.clone());
        label.alignment = Some(Alignment::Center);

        let _ = write!(
            self.xml,
            concat!(
                r#"<p:sp><p:nvSpPr><p:cNvPr id="{0}" name="Rectangle {1}"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr>"#,
                r#"<p:spPr>{2}<a:prstGeom prst="rect"><a:avLst/></a:prstGeom>{3}{4}</p:spPr>{5}</p:sp>"#
            ),
            id,
            id - 1,
            transform(frame),
            fill,
            line,
            text_body(&label, r#"<a:bodyPr anchor="ctr"/>"#)
        );
    }

    fn text_box(&mut self, frame: &Rect, body: &TextFrame) {
        let id = self.id();
        let _ = write!(
            self.xml,
            concat!(
                r#"<p:sp><p:nvSpPr><p:cNvPr id="{0}" name="TextBox {1}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr>"#,
                r#"<p:spPr>{2}<a:prstGeom prst="rect"><a:avLst/></a:prstGeom><a:noFill/></p:spPr>{3}</p:sp>"#
            ),
            id,
            id - 1,
            transform(frame),
            text_body(body, r#"<a:bodyPr wrap="square"/>"#)
        );
    }

    fn finish(self) -> String {
        format!(
            concat!(
                r#"<p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>"#,
                r#"<p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/>"#,
                r#"<a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>{}</p:spTree>"#
            ),
            self.xml
        )
    }
}

/// `ppt/slides/slideN.xml`. `image_rids` maps the slide's images, in
/// element order, to their relationship ids.
pub(crate) fn slide_xml(slide: &DeckSlide, image_rids: &[String]) -> String {
    let mut tree = ShapeTree::new();
    let mut images = image_rids.iter();

    for element in &slide.elements {
        match element {
            Element::Region(region) => tree.region(region.role, &region.frame, &region.body),
            Element::Image(image) => match images.next() {
                Some(rid) => tree.picture(&image.frame, rid),
                None => log::warn!("Image on slide {} has no media relationship", slide.id.0),
            },
            Element::Shape(shape) => tree.shape(&shape.frame, &shape.shape),
            Element::TextBox(text_box) => tree.text_box(&text_box.frame, &text_box.body),
        }
    }

    let background = slide
        .background
        .as_deref()
        .and_then(solid_fill)
        .map(|fill| format!("<p:bg><p:bgPr>{}<a:effectLst/></p:bgPr></p:bg>", fill))
        .unwrap_or_default();

    format!(
        "{}<p:sld {}><p:cSld>{}{}</p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>",
        XML_DECLARATION,
        presentation_ns_attrs(),
        background,
        tree.finish()
    )
}

/// `ppt/notesSlides/notesSlideN.xml` holding `notes` in the body placeholder.
pub(crate) fn notes_xml(notes: &TextFrame) -> String {
    let mut tree = ShapeTree::new();
    let image_id = tree.id();
    let body_id = tree.id();
    let _ = write!(
        tree.xml,
        concat!(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="{0}" name="Slide Image Placeholder 1"/>"#,
            r#"<p:cNvSpPr><a:spLocks noGrp="1" noRot="1" noChangeAspect="1"/></p:cNvSpPr>"#,
            r#"<p:nvPr><p:ph type="sldImg"/></p:nvPr></p:nvSpPr><p:spPr/></p:sp>"#,
            r#"<p:sp><p:nvSpPr><p:cNvPr id="{1}" name="Notes Placeholder 2"/>"#,
            r#"<p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr>"#,
            r#"<p:nvPr><p:ph type="body" idx="1"/></p:nvPr></p:nvSpPr><p:spPr/>{2}</p:sp>"#
        ),
        image_id,
        body_id,
        text_body(notes, "<a:bodyPr/>")
    );

    format!(
        "{}<p:notes {}><p:cSld>{}</p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:notes>",
        XML_DECLARATION,
        presentation_ns_attrs(),
        tree.finish()
    )
}
