//! Reading a `.pptx` back into a per-slide text outline.

use deckgen_core::{Error, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use zip::ZipArchive;

/// Text found on one slide.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SlideOutline {
    /// 1-based slide number.
    pub number: usize,

    /// Text of each shape, top-to-bottom then left-to-right.
    pub texts: Vec<String>,

    /// Speaker notes, if the slide has any.
    pub notes: Option<String>,
}

/// Text outline of a whole presentation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeckOutline {
    pub title: Option<String>,
    pub slides: Vec<SlideOutline>,
}

impl fmt::Display for DeckOutline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(title) = &self.title {
            writeln!(f, "{}", title)?;
            writeln!(f, "{}", "=".repeat(title.chars().count().max(3)))?;
        }
        for slide in &self.slides {
            writeln!(f)?;
            writeln!(f, "--- Slide {} ---", slide.number)?;
            for text in &slide.texts {
                writeln!(f, "{}", text)?;
            }
            if let Some(notes) = &slide.notes {
                writeln!(f, "[notes] {}", notes)?;
            }
        }
        Ok(())
    }
}

/// Reader for PPTX (Office Open XML) packages.
pub struct PptxReader;

impl PptxReader {
    /// Create a new PPTX reader.
    pub fn new() -> Self {
        Self
    }

    /// Read the outline of a `.pptx` file on disk.
    pub fn open(&self, path: &Path) -> Result<DeckOutline> {
        let file = File::open(path)?;
        self.read(BufReader::new(file))
    }

    /// Read the outline of a package from a reader.
    pub fn read<R: Read + Seek>(&self, reader: R) -> Result<DeckOutline> {
        let mut archive =
            ZipArchive::new(reader).map_err(|e| Error::ZipError(format!("Failed to open ZIP: {}", e)))?;

        let title = read_file_from_archive(&mut archive, "docProps/core.xml")
            .ok()
            .and_then(|core| element_text(&core, b"title"));

        let mut outline = DeckOutline {
            title,
            slides: Vec::new(),
        };

        for (idx, slide_path) in slide_order(&mut archive)?.iter().enumerate() {
            outline.slides.push(read_slide(&mut archive, slide_path, idx + 1)?);
        }

        log::debug!("Read outline of {} slides", outline.slides.len());
        Ok(outline)
    }
}

impl Default for PptxReader {
    fn default() -> Self {
        Self::new()
    }
}

/// A relationship entry from a `.rels` part.
#[derive(Debug, Clone, PartialEq)]
struct Relationship {
    id: String,
    rel_type: String,
    target: String,
}

fn attribute(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == key)
        .map(|attr| String::from_utf8_lossy(&attr.value).to_string())
}

fn read_relationships(content: &str) -> Result<Vec<Relationship>> {
    let mut reader = Reader::from_str(content);
    reader.trim_text(true);
    let mut rels = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"Relationship" =>
            {
                rels.push(Relationship {
                    id: attribute(e, b"Id").unwrap_or_default(),
                    rel_type: attribute(e, b"Type").unwrap_or_default(),
                    target: attribute(e, b"Target").unwrap_or_default(),
                });
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!(
                    "Error parsing relationships: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(rels)
}

/// Resolve a relationship target against the directory of its source part.
fn resolve_target(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for part in target.split('/') {
        match part {
            ".." => {
                segments.pop();
            }
            "." | "" => {}
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Ordered slide part paths from the presentation relationships.
fn slide_order<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<Vec<String>> {
    let rels_content = read_file_from_archive(archive, "ppt/_rels/presentation.xml.rels")?;
    let mut slides: Vec<(String, Option<usize>)> = read_relationships(&rels_content)?
        .into_iter()
        .filter(|r| r.rel_type.ends_with("/slide"))
        .map(|r| {
            let order = extract_slide_number(&r.target).or_else(|| extract_slide_number(&r.id));
            (resolve_target("ppt", &r.target), order)
        })
        .collect();

    slides.sort_by(|a, b| match (a.1, b.1) {
        (Some(na), Some(nb)) => na.cmp(&nb),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.0.cmp(&b.0),
    });

    Ok(slides.into_iter().map(|(path, _)| path).collect())
}

fn read_slide<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    slide_path: &str,
    number: usize,
) -> Result<SlideOutline> {
    let content = read_file_from_archive(archive, slide_path)?;
    let mut shapes = extract_shapes_from_xml(&content);
    shapes.sort_by(|a, b| a.y.total_cmp(&b.y).then(a.x.total_cmp(&b.x)));

    Ok(SlideOutline {
        number,
        texts: shapes.into_iter().map(|s| s.text).collect(),
        notes: read_notes(archive, slide_path)?,
    })
}

/// Notes text of a slide, following its notesSlide relationship.
fn read_notes<R: Read + Seek>(archive: &mut ZipArchive<R>, slide_path: &str) -> Result<Option<String>> {
    let (dir, file) = slide_path.rsplit_once('/').unwrap_or(("", slide_path));
    let rels_path = format!("{}/_rels/{}.rels", dir, file);
    let Ok(rels_content) = read_file_from_archive(archive, &rels_path) else {
        return Ok(None);
    };

    let Some(notes_rel) = read_relationships(&rels_content)?
        .into_iter()
        .find(|r| r.rel_type.ends_with("/notesSlide"))
    else {
        return Ok(None);
    };

    let notes_path = resolve_target(dir, &notes_rel.target);
    let content = read_file_from_archive(archive, &notes_path)?;
    let text = extract_shapes_from_xml(&content)
        .into_iter()
        .map(|s| s.text)
        .collect::<Vec<_>>()
        .join("\n");

    Ok((!text.is_empty()).then_some(text))
}

/// Information about a shape extracted from XML.
#[derive(Debug, Default)]
struct ShapeInfo {
    text: String,
    x: f64,
    y: f64,
}

fn read_offset(e: &BytesStart<'_>, shape: &mut ShapeInfo) {
    if let Some(x) = attribute(e, b"x").and_then(|v| v.parse::<f64>().ok()) {
        shape.x = x;
    }
    if let Some(y) = attribute(e, b"y").and_then(|v| v.parse::<f64>().ok()) {
        shape.y = y;
    }
}

/// Shapes with text, in document order.
fn extract_shapes_from_xml(xml_content: &str) -> Vec<ShapeInfo> {
    let mut shapes = Vec::new();
    let mut reader = Reader::from_str(xml_content);
    reader.trim_text(false);

    let mut current_shape: Option<ShapeInfo> = None;
    let mut in_text_body = false;
    let mut in_run_text = false;
    let mut current_text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match local_name(e.name().as_ref()) {
                b"sp" | b"pic" => current_shape = Some(ShapeInfo::default()),
                b"off" => {
                    if let Some(shape) = current_shape.as_mut() {
                        read_offset(e, shape);
                    }
                }
                b"txBody" => in_text_body = true,
                b"p" if in_text_body && !current_text.is_empty() => current_text.push('\n'),
                b"t" if in_text_body => in_run_text = true,
                b"br" if in_text_body => current_text.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match local_name(e.name().as_ref()) {
                b"off" => {
                    if let Some(shape) = current_shape.as_mut() {
                        read_offset(e, shape);
                    }
                }
                b"p" if in_text_body && !current_text.is_empty() => current_text.push('\n'),
                b"br" if in_text_body => current_text.push('\n'),
                _ => {}
            },
            Ok(Event::Text(ref e)) if in_run_text => {
                current_text.push_str(&e.unescape().unwrap_or_default());
            }
            Ok(Event::End(ref e)) => match local_name(e.name().as_ref()) {
                b"sp" | b"pic" => {
                    if let Some(mut shape) = current_shape.take() {
                        shape.text = current_text.trim().to_string();
                        if !shape.text.is_empty() {
                            shapes.push(shape);
                        }
                    }
                    current_text.clear();
                    in_text_body = false;
                    in_run_text = false;
                }
                b"txBody" => in_text_body = false,
                b"t" => in_run_text = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                log::warn!("XML parsing error (continuing): {}", e);
                break;
            }
            _ => {}
        }
    }

    shapes
}

/// Text of the first element with the given local name.
fn element_text(xml_content: &str, name: &[u8]) -> Option<String> {
    let mut reader = Reader::from_str(xml_content);
    reader.trim_text(true);
    let mut inside = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if local_name(e.name().as_ref()) == name => inside = true,
            Ok(Event::Text(ref e)) if inside => {
                return e.unescape().ok().map(|t| t.into_owned());
            }
            Ok(Event::End(_)) if inside => return None,
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
    }
}

/// Read a file from the ZIP archive.
fn read_file_from_archive<R: Read + Seek>(archive: &mut ZipArchive<R>, path: &str) -> Result<String> {
    let mut file = archive
        .by_name(path)
        .map_err(|e| Error::ZipError(format!("File not found in archive '{}': {}", path, e)))?;

    let mut content = String::new();
    file.read_to_string(&mut content)
        .map_err(|e| Error::ZipError(format!("Failed to read '{}': {}", path, e)))?;

    Ok(content)
}

/// Extract the local name from a potentially namespaced XML element name.
fn local_name(name: &[u8]) -> &[u8] {
    match name.iter().position(|&b| b == b':') {
        Some(pos) => &name[pos + 1..],
        None => name,
    }
}

/// Extract a slide number from a string like "rId2" or "slides/slide3.xml".
fn extract_slide_number(s: &str) -> Option<usize> {
    let s = s.trim_end_matches(".xml").trim_end_matches(".rels");
    let digits: String = s.chars().rev().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.chars().rev().collect::<String>().parse().ok()
}
