//! Table-driven slide deck generation.
//!
//! A Config table and a Slides table are parsed into typed records, each
//! slide is resolved to a layout and written into a [`DocumentSink`], media
//! references are placed or replaced with labelled placeholders, and the
//! whole run is tallied. [`sync`] refreshes both tables from a remote,
//! versioned feed.

pub mod assembler;
pub mod deck;
pub mod delimited;
pub mod diagnostic;
pub mod error;
pub mod layout;
pub mod media;
pub mod sink;
pub mod store;
pub mod sync;
pub mod tabular;
pub mod types;
pub mod validate;

pub use assembler::{generate_deck, generate_deck_titled, GeneratedDeck, SlideOutcome};
pub use deck::Deck;
pub use diagnostic::{Diagnostic, DiagnosticKind};
pub use error::{Error, Result};
pub use media::{AssetId, AssetStore};
pub use sink::DocumentSink;
pub use store::{KeyValueStore, TableStore};
pub use sync::{HttpFetcher, HttpResponse, SyncEndpoint, UpdateSynchronizer};
pub use types::{Config, ConfigValue, LayoutKind, Slide, Theme};
