use deckgen_core::deck::Deck;
use deckgen_core::media::{MemoryAssetStore, ASSETS_FOLDER};
use deckgen_core::sink::{
    Alignment, PageSize, Rect, RegionId, RegionInfo, RegionRole, ShapeSpec, SlideId, SlideTemplate,
    TextStyle,
};
use deckgen_core::store::{read_config, read_slides, MemoryTableStore, CONFIG_TABLE, SLIDES_TABLE};
use deckgen_core::{
    generate_deck, Config, ConfigValue, DiagnosticKind, DocumentSink, Error, Result, Slide,
};
use std::io::Cursor;
use std::ops::Range;

/// Which speaker notes a [`RefusingSink`] rejects.
#[derive(Clone, Copy, PartialEq)]
enum NotesPolicy {
    Accept,
    RefuseStyled,
    RefuseAll,
}

/// Delegates to a [`Deck`] but refuses to create the n-th slide, and
/// optionally refuses speaker notes.
struct RefusingSink {
    inner: Deck,
    refuse_at: usize,
    created: usize,
    notes: NotesPolicy,
    /// One entry per notes call: whether a style was passed.
    notes_calls: Vec<bool>,
}

impl RefusingSink {
    fn new(refuse_at: usize) -> Self {
        Self {
            inner: Deck::default(),
            refuse_at,
            created: 0,
            notes: NotesPolicy::Accept,
            notes_calls: Vec::new(),
        }
    }

    fn with_notes(mut self, notes: NotesPolicy) -> Self {
        self.notes = notes;
        self
    }
}

impl DocumentSink for RefusingSink {
    fn start_document(&mut self, title: &str) -> Result<()> {
        self.inner.start_document(title)
    }

    fn page_size(&self) -> PageSize {
        self.inner.page_size()
    }

    fn create_slide(&mut self, template: SlideTemplate) -> Result<SlideId> {
        self.created += 1;
        if self.created == self.refuse_at {
            return Err(Error::DocumentError("quota exceeded".to_string()));
        }
        self.inner.create_slide(template)
    }

    fn slides(&self) -> Vec<SlideId> {
        self.inner.slides()
    }

    fn regions(&self, slide: SlideId) -> Result<Vec<RegionInfo>> {
        self.inner.regions(slide)
    }

    fn set_text(&mut self, slide: SlideId, region: RegionId, text: &str) -> Result<()> {
        self.inner.set_text(slide, region, text)
    }

    fn style_text(
        &mut self,
        slide: SlideId,
        region: RegionId,
        range: Option<Range<usize>>,
        style: &TextStyle,
    ) -> Result<()> {
        self.inner.style_text(slide, region, range, style)
    }

    fn set_alignment(&mut self, slide: SlideId, region: RegionId, alignment: Alignment) -> Result<()> {
        self.inner.set_alignment(slide, region, alignment)
    }

    fn set_background(&mut self, slide: SlideId, color: &str) -> Result<()> {
        self.inner.set_background(slide, color)
    }

    fn insert_image(&mut self, slide: SlideId, bytes: &[u8], frame: Rect) -> Result<()> {
        self.inner.insert_image(slide, bytes, frame)
    }

    fn insert_shape(&mut self, slide: SlideId, frame: Rect, shape: &ShapeSpec) -> Result<()> {
        self.inner.insert_shape(slide, frame, shape)
    }

    fn insert_text_box(
        &mut self,
        slide: SlideId,
        frame: Rect,
        text: &str,
        style: &TextStyle,
        alignment: Alignment,
    ) -> Result<()> {
        self.inner.insert_text_box(slide, frame, text, style, alignment)
    }

    fn set_speaker_notes(&mut self, slide: SlideId, text: &str, style: Option<&TextStyle>) -> Result<()> {
        self.notes_calls.push(style.is_some());
        let refused = match self.notes {
            NotesPolicy::Accept => false,
            NotesPolicy::RefuseStyled => style.is_some(),
            NotesPolicy::RefuseAll => true,
        };
        if refused {
            return Err(Error::DocumentError("notes page unavailable".to_string()));
        }
        self.inner.set_speaker_notes(slide, text, style)
    }
}

fn tables() -> MemoryTableStore {
    MemoryTableStore::new()
        .with_table(
            CONFIG_TABLE,
            &[
                &["Setting", "Value"],
                &["Deck Title", "X"],
                &["Footer Text", "F"],
            ],
        )
        .with_table(
            SLIDES_TABLE,
            &[
                &["Order", "Layout", "Title", "Subtitle", "Bullets"],
                &["2", "", "Agenda", "", "a|b"],
                &["1", "Title", "Welcome", "Kickoff", ""],
            ],
        )
}

#[test]
fn test_end_to_end_from_tables() {
    let tables = tables();
    let config = read_config(&tables).unwrap();
    let slides = read_slides(&tables).unwrap();

    let deck = generate_deck(Deck::default(), &MemoryAssetStore::new(), &slides, &config).unwrap();

    assert_eq!(deck.title, "X");
    assert_eq!(deck.success_count, 2);
    assert_eq!(deck.total_count, 2);

    let doc = &deck.document;
    assert_eq!(doc.title, "X");
    assert_eq!(doc.slides.len(), 2);

    let cover = &doc.slides[0];
    assert_eq!(cover.template, SlideTemplate::Title);
    assert_eq!(cover.region(RegionRole::CenteredTitle).unwrap().body.text, "Welcome");
    assert_eq!(cover.region(RegionRole::Subtitle).unwrap().body.text, "Kickoff");
    assert_eq!(cover.text_boxes().count(), 0);

    let agenda = &doc.slides[1];
    assert_eq!(agenda.region(RegionRole::Title).unwrap().body.text, "Agenda");
    assert_eq!(agenda.region(RegionRole::Body).unwrap().body.text, "• a\n• b");
    let footers: Vec<_> = agenda.text_boxes().collect();
    assert_eq!(footers.len(), 1);
    assert_eq!(footers[0].body.text, "F");
}

#[test]
fn test_failed_slide_does_not_stop_the_run() {
    let tables = tables();
    let config = read_config(&tables).unwrap();
    let mut slides = read_slides(&tables).unwrap();
    slides.push(slides[1].clone().with_bullets("c"));

    let deck = generate_deck(RefusingSink::new(2), &MemoryAssetStore::new(), &slides, &config).unwrap();

    assert_eq!(deck.total_count, 3);
    assert_eq!(deck.success_count, 2);
    let failed: Vec<_> = deck.failures().collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].index, 2);
    assert!(failed[0].error.as_deref().unwrap().contains("quota exceeded"));
    assert_eq!(deck.document.inner.slides.len(), 2);
}

fn noted_slides() -> (Vec<Slide>, Config) {
    let slides = vec![
        Slide::new(1.0, "Agenda")
            .with_bullets("a|b")
            .with_speaker_notes("Keep it short"),
        Slide::new(2.0, "Wrap-up"),
    ];
    let config = Config::from_pairs([("speaker_notes_font_size", ConfigValue::Number(12.0))]);
    (slides, config)
}

#[test]
fn test_styled_notes_failure_retries_unstyled() {
    let (slides, config) = noted_slides();
    let sink = RefusingSink::new(0).with_notes(NotesPolicy::RefuseStyled);

    let deck = generate_deck(sink, &MemoryAssetStore::new(), &slides, &config).unwrap();

    assert_eq!(deck.success_count, deck.total_count);
    assert_eq!(deck.document.notes_calls, vec![true, false]);
    let notes: Vec<_> = deck
        .diagnostics()
        .filter(|d| d.kind == DiagnosticKind::Notes)
        .collect();
    assert_eq!(notes.len(), 1);
    assert!(notes[0].message.contains("notes page unavailable"));
    assert_eq!(
        deck.document.inner.slides[0].notes_text(),
        Some("Keep it short")
    );
}

#[test]
fn test_notes_failure_does_not_fail_the_slide() {
    let (slides, config) = noted_slides();
    let sink = RefusingSink::new(0).with_notes(NotesPolicy::RefuseAll);

    let deck = generate_deck(sink, &MemoryAssetStore::new(), &slides, &config).unwrap();

    assert_eq!(deck.success_count, 2);
    assert_eq!(deck.total_count, 2);
    assert!(deck.outcomes[0].succeeded());
    assert_eq!(
        deck.diagnostics()
            .filter(|d| d.kind == DiagnosticKind::Notes)
            .count(),
        2
    );
    assert_eq!(deck.document.inner.slides[0].notes_text(), None);
    assert_eq!(deck.document.notes_calls, vec![true, false]);
}

#[test]
fn test_bad_colors_are_cosmetic() {
    let tables = tables()
        .with_table(
            CONFIG_TABLE,
            &[&["Setting", "Value"], &["Deck Title", "X"], &["Text Color", "red"]],
        );
    let config = read_config(&tables).unwrap();
    let slides = read_slides(&tables).unwrap();

    let deck = generate_deck(Deck::default(), &MemoryAssetStore::new(), &slides, &config).unwrap();

    assert_eq!(deck.success_count, 2);
    assert!(deck.diagnostics().any(|d| d.kind == DiagnosticKind::Style));
    let cover = &deck.document.slides[0];
    let title = &cover.region(RegionRole::CenteredTitle).unwrap().body;
    assert_eq!(title.text, "Welcome");
    assert!(title.styles.is_empty());
}

#[test]
fn test_image_found_in_assets_folder_is_fitted() {
    let mut bytes = Vec::new();
    image::RgbImage::new(400, 400)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    let mut assets = MemoryAssetStore::new();
    assets.insert(Some(ASSETS_FOLDER), "logo.png", bytes);

    let tables = tables().with_table(
        SLIDES_TABLE,
        &[&["order", "title", "media_ref"], &["1", "Brand", "logo.png"]],
    );
    let config = read_config(&tables).unwrap();
    let slides = read_slides(&tables).unwrap();

    let deck = generate_deck(Deck::default(), &assets, &slides, &config).unwrap();
    let images: Vec<_> = deck.document.slides[0].images().collect();

    assert_eq!(images.len(), 1);
    let frame = images[0].frame;
    assert!((frame.width - 270.0).abs() < 1e-6);
    assert!((frame.height - 270.0).abs() < 1e-6);
    assert!((frame.left - 345.0).abs() < 1e-6);
    assert_eq!(deck.document.slides[0].shapes().count(), 0);
}
