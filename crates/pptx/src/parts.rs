//! Fixed package parts and the relationship/content-type manifests.

use quick_xml::escape::escape;
use std::fmt::Write;

pub(crate) const XML_DECLARATION: &str =
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

pub(crate) const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
pub(crate) const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
pub(crate) const NS_P: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";

/// True for characters allowed in XML 1.0 content.
fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r' | '\u{20}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}')
}

/// Escape `text` for element or attribute content, dropping characters
/// XML 1.0 cannot carry.
pub(crate) fn escape_text(text: &str) -> String {
    if text.chars().all(is_xml_char) {
        return escape(text).into_owned();
    }
    let kept: String = text.chars().filter(|&c| is_xml_char(c)).collect();
    escape(kept.as_str()).into_owned()
}

const NS_PACKAGE_RELS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const NS_CONTENT_TYPES: &str = "http://schemas.openxmlformats.org/package/2006/content-types";

/// Relationship types used by the package.
pub(crate) mod rel {
    pub const OFFICE_DOCUMENT: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
    pub const CORE_PROPERTIES: &str =
        "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties";
    pub const EXTENDED_PROPERTIES: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties";
    pub const SLIDE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
    pub const SLIDE_MASTER: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster";
    pub const SLIDE_LAYOUT: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout";
    pub const NOTES_MASTER: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/notesMaster";
    pub const NOTES_SLIDE: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/notesSlide";
    pub const THEME: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme";
    pub const IMAGE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
    pub const PRES_PROPS: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/presProps";
    pub const VIEW_PROPS: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/viewProps";
    pub const TABLE_STYLES: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/tableStyles";
}

/// Content types of the parts we emit.
pub(crate) mod content_type {
    pub const PRESENTATION: &str =
        "application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml";
    pub const SLIDE: &str = "application/vnd.openxmlformats-officedocument.presentationml.slide+xml";
    pub const SLIDE_MASTER: &str =
        "application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml";
    pub const SLIDE_LAYOUT: &str =
        "application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml";
    pub const NOTES_MASTER: &str =
        "application/vnd.openxmlformats-officedocument.presentationml.notesMaster+xml";
    pub const NOTES_SLIDE: &str =
        "application/vnd.openxmlformats-officedocument.presentationml.notesSlide+xml";
    pub const THEME: &str = "application/vnd.openxmlformats-officedocument.theme+xml";
    pub const PRES_PROPS: &str =
        "application/vnd.openxmlformats-officedocument.presentationml.presProps+xml";
    pub const VIEW_PROPS: &str =
        "application/vnd.openxmlformats-officedocument.presentationml.viewProps+xml";
    pub const TABLE_STYLES: &str =
        "application/vnd.openxmlformats-officedocument.presentationml.tableStyles+xml";
    pub const CORE_PROPERTIES: &str = "application/vnd.openxmlformats-package.core-properties+xml";
    pub const EXTENDED_PROPERTIES: &str =
        "application/vnd.openxmlformats-officedocument.extended-properties+xml";
    pub const RELATIONSHIPS: &str = "application/vnd.openxmlformats-package.relationships+xml";
}

/// A `.rels` part under construction.
#[derive(Debug, Default)]
pub(crate) struct Relationships {
    entries: Vec<(String, &'static str, String)>,
}

impl Relationships {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a relationship and return its id.
    pub fn add(&mut self, rel_type: &'static str, target: impl Into<String>) -> String {
        let id = format!("rId{}", self.entries.len() + 1);
        self.entries.push((id.clone(), rel_type, target.into()));
        id
    }

    pub fn to_xml(&self) -> String {
        let mut xml = String::from(XML_DECLARATION);
        let _ = write!(xml, r#"<Relationships xmlns="{}">"#, NS_PACKAGE_RELS);
        for (id, rel_type, target) in &self.entries {
            let _ = write!(
                xml,
                r#"<Relationship Id="{}" Type="{}" Target="{}"/>"#,
                id,
                rel_type,
                escape(target.as_str())
            );
        }
        xml.push_str("</Relationships>");
        xml
    }
}

/// `[Content_Types].xml` under construction.
#[derive(Debug, Default)]
pub(crate) struct ContentTypes {
    defaults: Vec<(String, String)>,
    overrides: Vec<(String, &'static str)>,
}

impl ContentTypes {
    pub fn new() -> Self {
        let mut types = Self::default();
        types.add_default("rels", content_type::RELATIONSHIPS);
        types.add_default("xml", "application/xml");
        types
    }

    /// Register an extension once; later registrations are ignored.
    pub fn add_default(&mut self, extension: &str, content_type: &str) {
        if !self.defaults.iter().any(|(ext, _)| ext == extension) {
            self.defaults
                .push((extension.to_string(), content_type.to_string()));
        }
    }

    /// Register a part by absolute package path (without leading slash).
    pub fn add_override(&mut self, part: impl Into<String>, content_type: &'static str) {
        self.overrides.push((part.into(), content_type));
    }

    pub fn to_xml(&self) -> String {
        let mut xml = String::from(XML_DECLARATION);
        let _ = write!(xml, r#"<Types xmlns="{}">"#, NS_CONTENT_TYPES);
        for (ext, ct) in &self.defaults {
            let _ = write!(xml, r#"<Default Extension="{}" ContentType="{}"/>"#, ext, ct);
        }
        for (part, ct) in &self.overrides {
            let _ = write!(xml, r#"<Override PartName="/{}" ContentType="{}"/>"#, part, ct);
        }
        xml.push_str("</Types>");
        xml
    }
}

pub(crate) fn presentation_ns_attrs() -> String {
    format!(r#"xmlns:a="{}" xmlns:r="{}" xmlns:p="{}""#, NS_A, NS_R, NS_P)
}

/// `ppt/presentation.xml`.
pub(crate) fn presentation(
    master_rid: &str,
    notes_master_rid: &str,
    slide_rids: &[String],
    width_emu: i64,
    height_emu: i64,
) -> String {
    let mut xml = String::from(XML_DECLARATION);
    let _ = write!(xml, r#"<p:presentation {} saveSubsetFonts="1">"#, presentation_ns_attrs());
    let _ = write!(
        xml,
        r#"<p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="{}"/></p:sldMasterIdLst>"#,
        master_rid
    );
    let _ = write!(
        xml,
        r#"<p:notesMasterIdLst><p:notesMasterId r:id="{}"/></p:notesMasterIdLst>"#,
        notes_master_rid
    );
    if !slide_rids.is_empty() {
        xml.push_str("<p:sldIdLst>");
        for (idx, rid) in slide_rids.iter().enumerate() {
            let _ = write!(xml, r#"<p:sldId id="{}" r:id="{}"/>"#, 256 + idx, rid);
        }
        xml.push_str("</p:sldIdLst>");
    }
    let _ = write!(
        xml,
        r#"<p:sldSz cx="{}" cy="{}"/><p:notesSz cx="6858000" cy="9144000"/>"#,
        width_emu, height_emu
    );
    xml.push_str("</p:presentation>");
    xml
}

const EMPTY_SHAPE_TREE: &str = concat!(
    r#"<p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>"#,
    r#"<p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/>"#,
    r#"<a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr></p:spTree>"#
);

const COLOR_MAP: &str = concat!(
    r#"<p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" "#,
    r#"accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" "#,
    r#"folHlink="folHlink"/>"#
);

/// `ppt/slideMasters/slideMaster1.xml`, listing the two layouts.
pub(crate) fn slide_master(layout_rids: &[String]) -> String {
    let mut xml = String::from(XML_DECLARATION);
    let _ = write!(xml, "<p:sldMaster {}>", presentation_ns_attrs());
    xml.push_str(r#"<p:cSld><p:bg><p:bgRef idx="1001"><a:schemeClr val="bg1"/></p:bgRef></p:bg>"#);
    xml.push_str(EMPTY_SHAPE_TREE);
    xml.push_str("</p:cSld>");
    xml.push_str(COLOR_MAP);
    xml.push_str("<p:sldLayoutIdLst>");
    for (idx, rid) in layout_rids.iter().enumerate() {
        let _ = write!(
            xml,
            r#"<p:sldLayoutId id="{}" r:id="{}"/>"#,
            2147483649u64 + idx as u64,
            rid
        );
    }
    xml.push_str("</p:sldLayoutIdLst></p:sldMaster>");
    xml
}

/// A slide layout with the given OOXML layout type and display name.
pub(crate) fn slide_layout(layout_type: &str, name: &str) -> String {
    let mut xml = String::from(XML_DECLARATION);
    let _ = write!(
        xml,
        r#"<p:sldLayout {} type="{}" preserve="1"><p:cSld name="{}">"#,
        presentation_ns_attrs(),
        layout_type,
        name
    );
    xml.push_str(EMPTY_SHAPE_TREE);
    xml.push_str("</p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>");
    xml
}

/// `ppt/notesMasters/notesMaster1.xml`.
pub(crate) fn notes_master() -> String {
    let mut xml = String::from(XML_DECLARATION);
    let _ = write!(xml, "<p:notesMaster {}><p:cSld>", presentation_ns_attrs());
    xml.push_str(EMPTY_SHAPE_TREE);
    xml.push_str("</p:cSld>");
    xml.push_str(COLOR_MAP);
    xml.push_str("</p:notesMaster>");
    xml
}

pub(crate) fn pres_props() -> String {
    format!("{}<p:presentationPr {}/>", XML_DECLARATION, presentation_ns_attrs())
}

pub(crate) fn view_props() -> String {
    format!("{}<p:viewPr {}/>", XML_DECLARATION, presentation_ns_attrs())
}

pub(crate) fn table_styles() -> String {
    format!(
        r#"{}<a:tblStyleLst xmlns:a="{}" def="{{5C22544A-7EE6-4342-B048-85BDC9FD1C3A}}"/>"#,
        XML_DECLARATION, NS_A
    )
}

/// A theme with a plain Office color scheme and the given major/minor font.
pub(crate) fn theme(name: &str, font: &str) -> String {
    let font = escape_text(font);
    let mut xml = String::from(XML_DECLARATION);
    let _ = write!(xml, r#"<a:theme xmlns:a="{}" name="{}"><a:themeElements>"#, NS_A, escape_text(name));

    xml.push_str(r#"<a:clrScheme name="Office">"#);
    xml.push_str(r#"<a:dk1><a:sysClr val="windowText" lastClr="000000"/></a:dk1>"#);
    xml.push_str(r#"<a:lt1><a:sysClr val="window" lastClr="FFFFFF"/></a:lt1>"#);
    for (slot, rgb) in [
        ("dk2", "44546A"),
        ("lt2", "E7E6E6"),
        ("accent1", "4472C4"),
        ("accent2", "ED7D31"),
        ("accent3", "A5A5A5"),
        ("accent4", "FFC000"),
        ("accent5", "5B9BD5"),
        ("accent6", "70AD47"),
        ("hlink", "0563C1"),
        ("folHlink", "954F72"),
    ] {
        let _ = write!(xml, r#"<a:{0}><a:srgbClr val="{1}"/></a:{0}>"#, slot, rgb);
    }
    xml.push_str("</a:clrScheme>");

    let _ = write!(
        xml,
        concat!(
            r#"<a:fontScheme name="Office">"#,
            r#"<a:majorFont><a:latin typeface="{0}"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont>"#,
            r#"<a:minorFont><a:latin typeface="{0}"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont>"#,
            "</a:fontScheme>"
        ),
        font
    );

    let solid = r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#;
    xml.push_str(r#"<a:fmtScheme name="Office"><a:fillStyleLst>"#);
    xml.push_str(&solid.repeat(3));
    xml.push_str("</a:fillStyleLst><a:lnStyleLst>");
    for width in [6350, 12700, 19050] {
        let _ = write!(xml, r#"<a:ln w="{}">{}</a:ln>"#, width, solid);
    }
    xml.push_str("</a:lnStyleLst><a:effectStyleLst>");
    xml.push_str(&"<a:effectStyle><a:effectLst/></a:effectStyle>".repeat(3));
    xml.push_str("</a:effectStyleLst><a:bgFillStyleLst>");
    xml.push_str(&solid.repeat(3));
    xml.push_str("</a:bgFillStyleLst></a:fmtScheme>");

    xml.push_str("</a:themeElements><a:objectDefaults/><a:extraClrSchemeLst/></a:theme>");
    xml
}

/// `docProps/core.xml`.
pub(crate) fn core_properties(title: &str, creator: &str) -> String {
    format!(
        concat!(
            "{}",
            r#"<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" "#,
            r#"xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" "#,
            r#"xmlns:dcmitype="http://purl.org/dc/dcmitype/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">"#,
            "<dc:title>{}</dc:title><dc:creator>{}</dc:creator></cp:coreProperties>"
        ),
        XML_DECLARATION,
        escape_text(title),
        escape_text(creator)
    )
}

/// `docProps/app.xml`.
pub(crate) fn app_properties(application: &str, slides: usize, notes: usize) -> String {
    format!(
        concat!(
            "{}",
            r#"<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties" "#,
            r#"xmlns:vt="http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes">"#,
            "<Application>{}</Application><Slides>{}</Slides><Notes>{}</Notes></Properties>"
        ),
        XML_DECLARATION,
        escape_text(application),
        slides,
        notes
    )
}
