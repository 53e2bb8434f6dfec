//! Chart and image placement.
//!
//! A reference is resolved against the asset store, scaled to fit a cap box
//! while keeping its aspect ratio, and inserted. Any failure along the way
//! degrades to a labeled placeholder rectangle instead of propagating.

use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::sink::{DocumentSink, PageSize, Rect, ShapeSpec, Size, SlideId, TextStyle};
use crate::{Error, Result};
use std::collections::HashMap;
use std::io::Cursor;

/// Conventional subfolder searched before the store root.
pub const ASSETS_FOLDER: &str = "images";

/// Largest share of the page width a placed asset may take.
const MAX_WIDTH_FRACTION: f64 = 0.7;

/// Largest share of the page height a placed asset may take.
const MAX_HEIGHT_FRACTION: f64 = 0.5;

/// Top edge of placed assets, as a share of the page height.
const TOP_FRACTION: f64 = 0.3;

/// Opaque handle to a located asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetId(pub String);

/// Named-blob lookup backing chart and image references.
pub trait AssetStore {
    /// Find an asset by exact name in `folder`, or in the root when `None`.
    fn find(&self, folder: Option<&str>, name: &str) -> Result<Option<AssetId>>;

    /// Read the asset's bytes.
    fn fetch(&self, id: &AssetId) -> Result<Vec<u8>>;
}

/// What a media reference stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Chart,
    Image,
}

impl MediaKind {
    fn label(self) -> &'static str {
        match self {
            MediaKind::Chart => "CHART",
            MediaKind::Image => "IMAGE",
        }
    }

    fn placeholder_fill(self) -> &'static str {
        match self {
            MediaKind::Chart => "#F0F0F0",
            MediaKind::Image => "#E8E8E8",
        }
    }
}

/// Where a media reference ended up.
#[derive(Debug, Clone, PartialEq)]
pub enum Placement {
    /// The asset was inserted at this frame.
    Inserted(Rect),
    /// A placeholder was drawn at this frame.
    Placeholder(Rect),
    /// Even the placeholder could not be drawn.
    Skipped,
}

/// Look up an asset in [`ASSETS_FOLDER`] first, then the root.
pub fn resolve_asset<A: AssetStore + ?Sized>(assets: &A, name: &str) -> Result<Option<AssetId>> {
    if let Some(id) = assets.find(Some(ASSETS_FOLDER), name)? {
        return Ok(Some(id));
    }
    assets.find(None, name)
}

/// Natural pixel dimensions of encoded image bytes.
pub fn image_size(bytes: &[u8]) -> Result<Size> {
    let (width, height) = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| Error::AssetError(format!("unreadable image: {}", e)))?
        .into_dimensions()
        .map_err(|e| Error::AssetError(format!("unreadable image: {}", e)))?;

    if width == 0 || height == 0 {
        return Err(Error::AssetError(format!(
            "image has zero dimension ({}x{})",
            width, height
        )));
    }
    Ok(Size {
        width: width as f64,
        height: height as f64,
    })
}

/// Scale `natural` into the cap box and position it on the page.
///
/// The box is 70% of the page width by 50% of its height. The result is
/// centered horizontally with its top edge at 30% of the page height.
pub fn fit_within(natural: Size, page: PageSize) -> Rect {
    let aspect_ratio = natural.width / natural.height;
    let max_width = page.width * MAX_WIDTH_FRACTION;
    let max_height = page.height * MAX_HEIGHT_FRACTION;

    let (width, height) = if max_width / max_height > aspect_ratio {
        (max_height * aspect_ratio, max_height)
    } else {
        (max_width, max_width / aspect_ratio)
    };

    Rect {
        left: (page.width - width) / 2.0,
        top: page.height * TOP_FRACTION,
        width,
        height,
    }
}

/// Fixed frame of the "not found" placeholder.
pub fn placeholder_frame(page: PageSize) -> Rect {
    page.fraction(0.1, 0.4, 0.8, 0.4)
}

/// Placeholder shape for a missing reference.
pub fn placeholder_spec(kind: MediaKind, reference: &str) -> ShapeSpec {
    ShapeSpec {
        label: format!("{} NOT FOUND: {}", kind.label(), reference),
        label_style: TextStyle::new().size(24.0).color("#666666"),
        fill_color: kind.placeholder_fill().to_string(),
        border_color: "#CCCCCC".to_string(),
        border_weight: 2.0,
    }
}

fn insert_asset<S, A>(sink: &mut S, assets: &A, slide: SlideId, name: &str) -> Result<Rect>
where
    S: DocumentSink + ?Sized,
    A: AssetStore + ?Sized,
{
    let id = resolve_asset(assets, name)?
        .ok_or_else(|| Error::AssetError(format!("'{}' not found in asset store", name)))?;
    let bytes = assets.fetch(&id)?;
    let frame = fit_within(image_size(&bytes)?, sink.page_size());
    sink.insert_image(slide, &bytes, frame)?;
    Ok(frame)
}

/// Place a chart or image reference on a slide.
///
/// Never fails: lookup, decode and insert errors all fall back to the
/// placeholder and are recorded in `diagnostics`.
pub fn place_media<S, A>(
    sink: &mut S,
    assets: &A,
    slide: SlideId,
    kind: MediaKind,
    reference: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> Placement
where
    S: DocumentSink + ?Sized,
    A: AssetStore + ?Sized,
{
    let name = reference.trim();
    match insert_asset(sink, assets, slide, name) {
        Ok(frame) => {
            log::debug!("Inserted {} '{}'", kind.label().to_lowercase(), name);
            return Placement::Inserted(frame);
        }
        Err(e) => diagnostics.push(Diagnostic::new(
            DiagnosticKind::Media,
            format!("Using placeholder for {} '{}': {}", kind.label().to_lowercase(), name, e),
        )),
    }

    let frame = placeholder_frame(sink.page_size());
    match sink.insert_shape(slide, frame, &placeholder_spec(kind, reference)) {
        Ok(()) => Placement::Placeholder(frame),
        Err(e) => {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::Media,
                format!("Could not add {} placeholder: {}", kind.label().to_lowercase(), e),
            ));
            Placement::Skipped
        }
    }
}

/// Asset store held in memory, keyed by folder and name.
#[derive(Debug, Clone, Default)]
pub struct MemoryAssetStore {
    assets: HashMap<(Option<String>, String), Vec<u8>>,
}

impl MemoryAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an asset under `folder` (or the root).
    pub fn insert(&mut self, folder: Option<&str>, name: &str, bytes: Vec<u8>) {
        self.assets
            .insert((folder.map(str::to_string), name.to_string()), bytes);
    }

    fn key(id: &AssetId) -> (Option<String>, String) {
        match id.0.split_once('/') {
            Some((folder, name)) => (Some(folder.to_string()), name.to_string()),
            None => (None, id.0.clone()),
        }
    }
}

impl AssetStore for MemoryAssetStore {
    fn find(&self, folder: Option<&str>, name: &str) -> Result<Option<AssetId>> {
        let key = (folder.map(str::to_string), name.to_string());
        if !self.assets.contains_key(&key) {
            return Ok(None);
        }
        Ok(Some(AssetId(match folder {
            Some(folder) => format!("{}/{}", folder, name),
            None => name.to_string(),
        })))
    }

    fn fetch(&self, id: &AssetId) -> Result<Vec<u8>> {
        self.assets
            .get(&Self::key(id))
            .cloned()
            .ok_or_else(|| Error::AssetError(format!("asset '{}' disappeared", id.0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::Deck;
    use crate::sink::SlideTemplate;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut bytes = Vec::new();
        image::RgbImage::new(width, height)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_fit_within_height_bound() {
        let frame = fit_within(
            Size {
                width: 1600.0,
                height: 900.0,
            },
            PageSize::WIDESCREEN,
        );
        assert!(frame.width <= 0.7 * 960.0 + 1e-9);
        assert!(frame.height <= 0.5 * 540.0 + 1e-9);
        assert!((frame.width / frame.height - 1600.0 / 900.0).abs() < 1e-9);
        assert!((frame.height - 270.0).abs() < 1e-9);
        assert!((frame.left - 240.0).abs() < 1e-9);
        assert!((frame.top - 162.0).abs() < 1e-9);
    }

    #[test]
    fn test_fit_within_width_bound() {
        let frame = fit_within(
            Size {
                width: 4000.0,
                height: 1000.0,
            },
            PageSize::WIDESCREEN,
        );
        assert!((frame.width - 672.0).abs() < 1e-9);
        assert!((frame.height - 168.0).abs() < 1e-9);
        assert!((frame.left - 144.0).abs() < 1e-9);
    }

    #[test]
    fn test_resolve_prefers_assets_folder() {
        let mut assets = MemoryAssetStore::new();
        assets.insert(None, "chart.png", vec![1]);
        assets.insert(Some(ASSETS_FOLDER), "chart.png", vec![2]);
        assets.insert(None, "root-only.png", vec![3]);

        let id = resolve_asset(&assets, "chart.png").unwrap().unwrap();
        assert_eq!(assets.fetch(&id).unwrap(), vec![2]);
        let id = resolve_asset(&assets, "root-only.png").unwrap().unwrap();
        assert_eq!(assets.fetch(&id).unwrap(), vec![3]);
        assert!(resolve_asset(&assets, "missing.png").unwrap().is_none());
    }

    #[test]
    fn test_place_media_inserts_scaled_image() {
        let mut assets = MemoryAssetStore::new();
        assets.insert(Some(ASSETS_FOLDER), "wide.png", png(16, 9));
        let mut deck = Deck::default();
        let slide = deck.create_slide(SlideTemplate::TitleAndBody).unwrap();
        let mut diagnostics = Vec::new();

        let placement = place_media(&mut deck, &assets, slide, MediaKind::Image, " wide.png ", &mut diagnostics);

        assert!(diagnostics.is_empty());
        let Placement::Inserted(frame) = placement else {
            panic!("expected insertion, got {:?}", placement);
        };
        assert!((frame.width / frame.height - 16.0 / 9.0).abs() < 1e-9);
        assert_eq!(deck.slide(slide).unwrap().images().count(), 1);
    }

    #[test]
    fn test_missing_asset_falls_back_to_placeholder() {
        let assets = MemoryAssetStore::new();
        let mut deck = Deck::default();
        let slide = deck.create_slide(SlideTemplate::TitleAndBody).unwrap();
        let mut diagnostics = Vec::new();

        let placement = place_media(&mut deck, &assets, slide, MediaKind::Chart, "q3.png", &mut diagnostics);

        assert_eq!(placement, Placement::Placeholder(placeholder_frame(deck.page)));
        assert_eq!(diagnostics.len(), 1);
        let shape = deck.slide(slide).unwrap().shapes().next().unwrap();
        assert_eq!(shape.shape.label, "CHART NOT FOUND: q3.png");
        assert_eq!(shape.shape.border_weight, 2.0);
    }

    #[test]
    fn test_undecodable_asset_falls_back_to_placeholder() {
        let mut assets = MemoryAssetStore::new();
        assets.insert(None, "broken.png", b"definitely not a png".to_vec());
        let mut deck = Deck::default();
        let slide = deck.create_slide(SlideTemplate::TitleAndBody).unwrap();
        let mut diagnostics = Vec::new();

        let placement = place_media(&mut deck, &assets, slide, MediaKind::Image, "broken.png", &mut diagnostics);

        assert!(matches!(placement, Placement::Placeholder(_)));
        let shape = deck.slide(slide).unwrap().shapes().next().unwrap();
        assert_eq!(shape.shape.label, "IMAGE NOT FOUND: broken.png");
        assert_eq!(deck.slide(slide).unwrap().images().count(), 0);
    }
}
