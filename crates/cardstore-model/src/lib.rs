//! # cardstore-model
//!
//! The in-memory side of cardstore: typed entities, the per-type field
//! descriptor table, the collection catalogue and the [`Model`] that holds
//! everything together.
//!
//! ```text
//!   TypeRegistry  (tag -> CardSchema: fields, skip list, layout, finalize)
//!        |
//!   Model ---- collections (catalogue order)
//!        |       nodes:  Map      { 1 -> GRID, 2 -> GRID, ... }
//!        |       spcs:   MultiMap { 17 -> [SPC, SPC1], ... }
//!        |       asets:  List     [ASET1, ASET1]
//!        |       aero:   Scalar   AERO
//!        |
//!        +---- TypeTally  (tag -> count)
//!        +---- TypeIndex  (tag -> ids in insertion order)
//! ```

pub mod bookkeeping;
pub mod cards;
pub mod catalogue;
pub mod collection;
pub mod dump;
pub mod entity;
mod error;
pub mod minor;
pub mod model;
pub mod registry;
pub mod schema;
pub mod value;

pub use bookkeeping::{TypeIndex, TypeTally};
pub use catalogue::{classify, CollectionSpec, KeyKind, Shape, TypeStrategy};
pub use collection::{Collection, KeyedMap, KeyedMultimap};
pub use dump::ModelDump;
pub use entity::Entity;
pub use error::{ModelError, Result};
pub use minor::{MinorAttributes, RejectedLines};
pub use model::Model;
pub use registry::TypeRegistry;
pub use schema::{CardSchema, FieldKind, FieldSpec, Layout, ScalarKind};
pub use value::{Key, Scalar, Value};
