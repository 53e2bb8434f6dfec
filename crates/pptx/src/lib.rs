//! PPTX (Office Open XML) backend for generated decks.
//!
//! [`PptxWriter`] packages a [`deckgen_core::Deck`] as a `.pptx` ZIP archive
//! of XML parts. [`PptxReader`] reads a package back into a text outline.

mod parts;
pub mod reader;
mod slide;
pub mod writer;

pub use reader::{DeckOutline, PptxReader, SlideOutline};
pub use slide::{emu, EMU_PER_POINT};
pub use writer::PptxWriter;
