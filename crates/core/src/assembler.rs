//! Deck assembly: one pass over the slide list into a document sink.

use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::layout::{render_slide, theme_for_section, StyleSheet};
use crate::media::{place_media, AssetStore, MediaKind};
use crate::sink::{Alignment, DocumentSink, SlideId, TextStyle};
use crate::types::{Config, Slide};
use crate::Result;
use chrono::NaiveDate;

/// Font size of the footer text box.
const FOOTER_FONT_SIZE: f64 = 10.0;

/// Footer text color.
const FOOTER_COLOR: &str = "#666666";

/// Result of building one slide.
#[derive(Debug, Clone)]
pub struct SlideOutcome {
    /// 1-based position in the sorted slide list.
    pub index: usize,

    pub title: String,

    /// The created slide, if creation got that far.
    pub slide: Option<SlideId>,

    /// Why the slide failed. `None` means it was created.
    pub error: Option<String>,

    /// Cosmetic problems that did not fail the slide.
    pub diagnostics: Vec<Diagnostic>,
}

impl SlideOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// A finished generation run.
#[derive(Debug)]
pub struct GeneratedDeck<S> {
    /// The sink, now holding the generated slides.
    pub document: S,

    pub title: String,

    /// Slides created without a fatal error.
    pub success_count: usize,

    /// Slides attempted.
    pub total_count: usize,

    /// Per-slide results in generation order.
    pub outcomes: Vec<SlideOutcome>,

    /// Problems adding footers.
    pub footer_diagnostics: Vec<Diagnostic>,
}

impl<S> GeneratedDeck<S> {
    /// Every diagnostic recorded during the run.
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.outcomes
            .iter()
            .flat_map(|o| o.diagnostics.iter())
            .chain(self.footer_diagnostics.iter())
    }

    /// Outcomes of slides that failed.
    pub fn failures(&self) -> impl Iterator<Item = &SlideOutcome> {
        self.outcomes.iter().filter(|o| !o.succeeded())
    }
}

/// Title used when the config has no `deck_title`.
pub fn default_deck_title(date: NaiveDate) -> String {
    format!("Presentation - {}", date.format("%Y-%m-%d"))
}

/// The configured deck title, or a date-stamped default.
pub fn deck_title(config: &Config, today: NaiveDate) -> String {
    config
        .deck_title()
        .unwrap_or_else(|| default_deck_title(today))
}

/// Generate a deck titled from the config.
///
/// See [`generate_deck_titled`].
pub fn generate_deck<S, A>(sink: S, assets: &A, slides: &[Slide], config: &Config) -> Result<GeneratedDeck<S>>
where
    S: DocumentSink,
    A: AssetStore + ?Sized,
{
    let title = deck_title(config, chrono::Local::now().date_naive());
    generate_deck_titled(sink, assets, slides, config, &title)
}

/// Generate a deck with an explicit title.
///
/// Only starting the document can fail. After that every slide is attempted;
/// a failing slide is logged and tallied and the run moves on.
pub fn generate_deck_titled<S, A>(
    mut sink: S,
    assets: &A,
    slides: &[Slide],
    config: &Config,
    title: &str,
) -> Result<GeneratedDeck<S>>
where
    S: DocumentSink,
    A: AssetStore + ?Sized,
{
    sink.start_document(title)?;
    log::info!("Created presentation: {}", title);

    let styles = StyleSheet::from_config(config);
    let mut outcomes = Vec::with_capacity(slides.len());

    for (idx, slide) in slides.iter().enumerate() {
        log::debug!("Creating slide {}: {} (layout: {})", idx + 1, slide.title, slide.layout);
        let outcome = match build_slide(&mut sink, assets, slide, config, &styles) {
            Ok((id, diagnostics)) => SlideOutcome {
                index: idx + 1,
                title: slide.title.clone(),
                slide: Some(id),
                error: None,
                diagnostics,
            },
            Err(e) => {
                log::error!("Error creating slide {}: {}", idx + 1, e);
                SlideOutcome {
                    index: idx + 1,
                    title: slide.title.clone(),
                    slide: None,
                    error: Some(e.to_string()),
                    diagnostics: Vec::new(),
                }
            }
        };
        outcomes.push(outcome);
    }

    let footer_diagnostics = match config.footer_text() {
        Some(footer) => add_footers(&mut sink, &footer, &styles),
        None => Vec::new(),
    };

    let success_count = outcomes.iter().filter(|o| o.succeeded()).count();
    log::info!("{} of {} slides created successfully", success_count, slides.len());

    Ok(GeneratedDeck {
        document: sink,
        title: title.to_string(),
        success_count,
        total_count: slides.len(),
        outcomes,
        footer_diagnostics,
    })
}

/// Build one slide: layout, then chart, then image, then speaker notes.
pub fn build_slide<S, A>(
    sink: &mut S,
    assets: &A,
    slide: &Slide,
    config: &Config,
    styles: &StyleSheet,
) -> Result<(SlideId, Vec<Diagnostic>)>
where
    S: DocumentSink + ?Sized,
    A: AssetStore + ?Sized,
{
    let theme = theme_for_section(&slide.section_id, config);
    let (id, mut diagnostics) = render_slide(sink, slide, styles, &theme)?;

    // Chart and image share the same frame; the image lands on top.
    if !slide.chart_ref.trim().is_empty() {
        place_media(sink, assets, id, MediaKind::Chart, &slide.chart_ref, &mut diagnostics);
    }
    if !slide.media_ref.trim().is_empty() {
        place_media(sink, assets, id, MediaKind::Image, &slide.media_ref, &mut diagnostics);
    }

    if !slide.speaker_notes.is_empty() {
        attach_notes(sink, id, &slide.speaker_notes, styles, &mut diagnostics);
    }

    Ok((id, diagnostics))
}

fn attach_notes<S: DocumentSink + ?Sized>(
    sink: &mut S,
    slide: SlideId,
    notes: &str,
    styles: &StyleSheet,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let style = styles
        .speaker_notes_font_size
        .map(|size| TextStyle::new().size(size).family(&styles.body_font));

    let Err(e) = sink.set_speaker_notes(slide, notes, style.as_ref()) else {
        return;
    };
    diagnostics.push(Diagnostic::new(
        DiagnosticKind::Notes,
        format!("Could not add speaker notes: {}", e),
    ));

    if style.is_some() {
        if let Err(e) = sink.set_speaker_notes(slide, notes, None) {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::Notes,
                format!("Could not add unstyled speaker notes: {}", e),
            ));
        }
    }
}

/// Add the footer text box to every slide but the first.
pub fn add_footers<S: DocumentSink + ?Sized>(
    sink: &mut S,
    footer: &str,
    styles: &StyleSheet,
) -> Vec<Diagnostic> {
    let frame = sink.page_size().fraction(0.05, 0.93, 0.9, 0.04);
    let style = TextStyle::new()
        .size(FOOTER_FONT_SIZE)
        .family(&styles.body_font)
        .color(FOOTER_COLOR);

    let mut diagnostics = Vec::new();
    for (idx, slide) in sink.slides().into_iter().enumerate().skip(1) {
        if let Err(e) = sink.insert_text_box(slide, frame, footer, &style, Alignment::Center) {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::Footer,
                format!("Could not add footer to slide {}: {}", idx + 1, e),
            ));
        }
    }
    log::debug!("Added footer to slides");
    diagnostics
}
