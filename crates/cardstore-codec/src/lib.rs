//! # cardstore-codec
//!
//! Maps a [`Model`](cardstore_model::Model) onto a hierarchical
//! [`Document`](cardstore_container::Document) and back.
//!
//! ```text
//!            export_document                       load_document
//!   Model ───────────────────► Document      Document ───────────────────► Model
//!     │                                                                     ▲
//!     ├─ minor_attributes ──── header (encoding, options, line lists)       │
//!     ├─ collections ───────── GroupExporter ─┬─ generic  (object.rs)       │
//!     │   (catalogue order)                   └─ columnar (columnar.rs)     │
//!     ├─ primitive lists ───── typed arrays                                 │
//!     └─ cards_to_read ─────── sorted text array          GroupImporter ────┘
//! ```
//!
//! Each storage shape (scalar, keyed map, keyed multimap, flat list) has its
//! own matched encode/decode pair in [`group`]. Errors carry a [`Location`]
//! naming the collection, type tag and attribute involved.

pub mod columnar;
pub mod config;
pub mod diagnostics;
pub mod document;
mod error;
pub mod group;
pub mod minor;
pub mod object;
mod order;
pub mod text;

pub use config::CodecConfig;
pub use diagnostics::{Diagnostic, Diagnostics};
pub use document::{open_model, save_model, ExportReport, LoadReport, Orchestrator, Phase, CARDS_TO_READ};
pub use error::{CodecError, Location, Result};
pub use group::{GroupExporter, GroupImporter};
pub use object::{decode_entity, decode_value, encode_entity, encode_value};
pub use order::{IndexOrder, IndexRanks};
pub use text::TextEncoding;

use cardstore_container::Document;
use cardstore_model::{Model, TypeRegistry};

/// Export `model` with `config`, returning the document and its diagnostics.
pub fn export_document(registry: &TypeRegistry, model: &Model, config: &CodecConfig) -> Result<ExportReport> {
    Orchestrator::new(registry, config.clone()).export_document(model)
}

/// Load `document` into a new model.
pub fn load_document(registry: &TypeRegistry, document: &Document) -> Result<Model> {
    Orchestrator::new(registry, CodecConfig::default())
        .load_document(document)
        .map(|report| report.model)
}
