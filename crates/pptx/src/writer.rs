//! Serializing a [`Deck`] into a `.pptx` package.

use crate::parts::{self, content_type, rel, ContentTypes, Relationships};
use crate::slide::{emu, notes_xml, slide_xml};
use deckgen_core::deck::{Deck, DeckSlide};
use deckgen_core::sink::SlideTemplate;
use deckgen_core::{Error, Result};
use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Font the package theme falls back to.
const THEME_FONT: &str = "Arial";

/// An image part queued for the package.
struct MediaPart {
    path: String,
    bytes: Vec<u8>,
}

/// Writer for PPTX (Office Open XML) packages.
pub struct PptxWriter {
    application: String,
}

impl PptxWriter {
    /// Create a writer that stamps `deckgen` as the producing application.
    pub fn new() -> Self {
        Self {
            application: "deckgen".to_string(),
        }
    }

    /// Override the application name recorded in the document properties.
    pub fn with_application(mut self, application: impl Into<String>) -> Self {
        self.application = application.into();
        self
    }

    /// Write `deck` to a file, replacing it if it exists.
    pub fn save(&self, deck: &Deck, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = self.write(deck, BufWriter::new(file))?;
        writer.flush()?;
        log::info!("Saved {} slides to {}", deck.slides.len(), path.display());
        Ok(())
    }

    /// Write `deck` as a package into `writer` and hand the writer back.
    pub fn write<W: Write + Seek>(&self, deck: &Deck, writer: W) -> Result<W> {
        let mut zip = ZipWriter::new(writer);
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut content_types = ContentTypes::new();
        let add = |zip: &mut ZipWriter<W>, path: &str, data: &[u8]| -> Result<()> {
            zip.start_file(path, options)
                .map_err(|e| Error::ZipError(format!("Failed to start '{}': {}", path, e)))?;
            zip.write_all(data)?;
            Ok(())
        };

        // Package-level relationships and properties.
        let mut package_rels = Relationships::new();
        package_rels.add(rel::OFFICE_DOCUMENT, "ppt/presentation.xml");
        package_rels.add(rel::CORE_PROPERTIES, "docProps/core.xml");
        package_rels.add(rel::EXTENDED_PROPERTIES, "docProps/app.xml");
        add(&mut zip, "_rels/.rels", package_rels.to_xml().as_bytes())?;

        let notes_count = deck.slides.iter().filter(|s| s.notes.is_some()).count();
        add(
            &mut zip,
            "docProps/core.xml",
            parts::core_properties(&deck.title, &self.application).as_bytes(),
        )?;
        add(
            &mut zip,
            "docProps/app.xml",
            parts::app_properties(&self.application, deck.slides.len(), notes_count).as_bytes(),
        )?;
        content_types.add_override("docProps/core.xml", content_type::CORE_PROPERTIES);
        content_types.add_override("docProps/app.xml", content_type::EXTENDED_PROPERTIES);

        // Master, layouts, themes.
        let mut master_rels = Relationships::new();
        let layout_rids = vec![
            master_rels.add(rel::SLIDE_LAYOUT, "../slideLayouts/slideLayout1.xml"),
            master_rels.add(rel::SLIDE_LAYOUT, "../slideLayouts/slideLayout2.xml"),
        ];
        master_rels.add(rel::THEME, "../theme/theme1.xml");
        add(
            &mut zip,
            "ppt/slideMasters/slideMaster1.xml",
            parts::slide_master(&layout_rids).as_bytes(),
        )?;
        add(
            &mut zip,
            "ppt/slideMasters/_rels/slideMaster1.xml.rels",
            master_rels.to_xml().as_bytes(),
        )?;
        content_types.add_override("ppt/slideMasters/slideMaster1.xml", content_type::SLIDE_MASTER);

        for (idx, (layout_type, name)) in [("title", "Title Slide"), ("obj", "Title and Content")]
            .into_iter()
            .enumerate()
        {
            let path = format!("ppt/slideLayouts/slideLayout{}.xml", idx + 1);
            let mut layout_rels = Relationships::new();
            layout_rels.add(rel::SLIDE_MASTER, "../slideMasters/slideMaster1.xml");
            add(&mut zip, &path, parts::slide_layout(layout_type, name).as_bytes())?;
            add(
                &mut zip,
                &format!("ppt/slideLayouts/_rels/slideLayout{}.xml.rels", idx + 1),
                layout_rels.to_xml().as_bytes(),
            )?;
            content_types.add_override(path, content_type::SLIDE_LAYOUT);
        }

        add(&mut zip, "ppt/theme/theme1.xml", parts::theme("Deck", THEME_FONT).as_bytes())?;
        add(&mut zip, "ppt/theme/theme2.xml", parts::theme("Notes", THEME_FONT).as_bytes())?;
        content_types.add_override("ppt/theme/theme1.xml", content_type::THEME);
        content_types.add_override("ppt/theme/theme2.xml", content_type::THEME);

        let mut notes_master_rels = Relationships::new();
        notes_master_rels.add(rel::THEME, "../theme/theme2.xml");
        add(&mut zip, "ppt/notesMasters/notesMaster1.xml", parts::notes_master().as_bytes())?;
        add(
            &mut zip,
            "ppt/notesMasters/_rels/notesMaster1.xml.rels",
            notes_master_rels.to_xml().as_bytes(),
        )?;
        content_types.add_override("ppt/notesMasters/notesMaster1.xml", content_type::NOTES_MASTER);

        // Slides, notes and media.
        let mut presentation_rels = Relationships::new();
        let master_rid = presentation_rels.add(rel::SLIDE_MASTER, "slideMasters/slideMaster1.xml");
        let notes_master_rid = presentation_rels.add(rel::NOTES_MASTER, "notesMasters/notesMaster1.xml");
        presentation_rels.add(rel::THEME, "theme/theme1.xml");
        presentation_rels.add(rel::PRES_PROPS, "presProps.xml");
        presentation_rels.add(rel::VIEW_PROPS, "viewProps.xml");
        presentation_rels.add(rel::TABLE_STYLES, "tableStyles.xml");

        let mut slide_rids = Vec::with_capacity(deck.slides.len());
        let mut media = Vec::new();

        for (idx, slide) in deck.slides.iter().enumerate() {
            let number = idx + 1;
            let slide_path = format!("ppt/slides/slide{}.xml", number);
            let (slide_rels, image_rids) =
                slide_relationships(slide, number, &mut media, &mut content_types)?;

            add(&mut zip, &slide_path, slide_xml(slide, &image_rids).as_bytes())?;
            add(
                &mut zip,
                &format!("ppt/slides/_rels/slide{}.xml.rels", number),
                slide_rels.to_xml().as_bytes(),
            )?;
            content_types.add_override(slide_path, content_type::SLIDE);
            slide_rids.push(presentation_rels.add(rel::SLIDE, format!("slides/slide{}.xml", number)));

            if let Some(notes) = &slide.notes {
                let notes_path = format!("ppt/notesSlides/notesSlide{}.xml", number);
                let mut notes_rels = Relationships::new();
                notes_rels.add(rel::NOTES_MASTER, "../notesMasters/notesMaster1.xml");
                notes_rels.add(rel::SLIDE, format!("../slides/slide{}.xml", number));
                add(&mut zip, &notes_path, notes_xml(notes).as_bytes())?;
                add(
                    &mut zip,
                    &format!("ppt/notesSlides/_rels/notesSlide{}.xml.rels", number),
                    notes_rels.to_xml().as_bytes(),
                )?;
                content_types.add_override(notes_path, content_type::NOTES_SLIDE);
            }
        }

        for part in &media {
            add(&mut zip, &part.path, &part.bytes)?;
        }

        add(
            &mut zip,
            "ppt/presentation.xml",
            parts::presentation(
                &master_rid,
                &notes_master_rid,
                &slide_rids,
                emu(deck.page.width),
                emu(deck.page.height),
            )
            .as_bytes(),
        )?;
        add(
            &mut zip,
            "ppt/_rels/presentation.xml.rels",
            presentation_rels.to_xml().as_bytes(),
        )?;
        add(&mut zip, "ppt/presProps.xml", parts::pres_props().as_bytes())?;
        add(&mut zip, "ppt/viewProps.xml", parts::view_props().as_bytes())?;
        add(&mut zip, "ppt/tableStyles.xml", parts::table_styles().as_bytes())?;
        content_types.add_override("ppt/presentation.xml", content_type::PRESENTATION);
        content_types.add_override("ppt/presProps.xml", content_type::PRES_PROPS);
        content_types.add_override("ppt/viewProps.xml", content_type::VIEW_PROPS);
        content_types.add_override("ppt/tableStyles.xml", content_type::TABLE_STYLES);

        add(&mut zip, "[Content_Types].xml", content_types.to_xml().as_bytes())?;

        let writer = zip
            .finish()
            .map_err(|e| Error::ZipError(format!("Failed to finish package: {}", e)))?;
        log::debug!(
            "Wrote package with {} slides, {} notes, {} media parts",
            deck.slides.len(),
            notes_count,
            media.len()
        );
        Ok(writer)
    }
}

impl Default for PptxWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Relationships of one slide, queuing its images as media parts.
fn slide_relationships(
    slide: &DeckSlide,
    number: usize,
    media: &mut Vec<MediaPart>,
    content_types: &mut ContentTypes,
) -> Result<(Relationships, Vec<String>)> {
    let mut rels = Relationships::new();
    let layout = match slide.template {
        SlideTemplate::Title => "../slideLayouts/slideLayout1.xml",
        SlideTemplate::TitleAndBody => "../slideLayouts/slideLayout2.xml",
    };
    rels.add(rel::SLIDE_LAYOUT, layout);

    let mut image_rids = Vec::new();
    for image in slide.images() {
        let format = image::guess_format(&image.bytes)
            .map_err(|e| Error::DocumentError(format!("unsupported image on slide {}: {}", number, e)))?;
        let extension = format.extensions_str().first().copied().unwrap_or("bin");
        content_types.add_default(extension, format.to_mime_type());

        let file_name = format!("image{}.{}", media.len() + 1, extension);
        media.push(MediaPart {
            path: format!("ppt/media/{}", file_name),
            bytes: image.bytes.clone(),
        });
        image_rids.push(rels.add(rel::IMAGE, format!("../media/{}", file_name)));
    }

    if slide.notes.is_some() {
        rels.add(rel::NOTES_SLIDE, format!("../notesSlides/notesSlide{}.xml", number));
    }
    Ok((rels, image_rids))
}
