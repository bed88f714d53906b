//! Document-level export and load.
//!
//! Both directions run the same state machine:
//!
//! ```text
//! Idle -> ValidatingHeader -> Streaming -> Finalizing -> Done
//!              \                  \            \
//!               +------------------+------------+--> Failed
//! ```
//!
//! Streaming enters each section at most once, in catalogue order, then the
//! primitive lists, then `cards_to_read`.

use std::collections::BTreeSet;
use std::path::Path;

use cardstore_container::{ArrayData, ContainerFile, Dataset, Document, Group, Node};
use cardstore_model::catalogue::{self, CATALOGUE, PRIMITIVE_LISTS};
use cardstore_model::{Model, Scalar, TypeRegistry};

use crate::config::CodecConfig;
use crate::diagnostics::Diagnostics;
use crate::error::{CodecError, Location, Result};
use crate::group::{GroupExporter, GroupImporter};
use crate::order::{IndexOrder, IndexRanks};
use crate::minor::{self, SECTION};
use crate::object::{array_to_scalars, decode_text, encode_text, scalars_to_array};
use crate::text::TextEncoding;

pub const CARDS_TO_READ: &str = "cards_to_read";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    ValidatingHeader,
    Streaming,
    Finalizing,
    Done,
    Failed,
}

#[derive(Debug)]
pub struct ExportReport {
    pub document: Document,
    pub diagnostics: Diagnostics,
}

#[derive(Debug)]
pub struct LoadReport {
    pub model: Model,
    /// Encoding the document declared.
    pub encoding: TextEncoding,
}

/// Runs one export or load at a time. Every call starts from `Idle`.
pub struct Orchestrator<'r> {
    registry: &'r TypeRegistry,
    config: CodecConfig,
    phase: Phase,
    entered: BTreeSet<String>,
    diagnostics: Diagnostics,
}

impl<'r> Orchestrator<'r> {
    pub fn new(registry: &'r TypeRegistry, config: CodecConfig) -> Self {
        Self {
            registry,
            config,
            phase: Phase::Idle,
            entered: BTreeSet::new(),
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Findings from the most recent operation.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Encode `model` into a new document.
    pub fn export_document(&mut self, model: &Model) -> Result<ExportReport> {
        self.begin();
        let result = self.run_export(model);
        let document = self.finish(result)?;
        Ok(ExportReport {
            document,
            diagnostics: self.diagnostics.clone(),
        })
    }

    /// Rebuild a model from `document`. On error nothing is returned.
    pub fn load_document(&mut self, document: &Document) -> Result<LoadReport> {
        self.begin();
        let result = self.run_load(document);
        self.finish(result)
    }

    // ========================================================================
    // State
    // ========================================================================

    fn begin(&mut self) {
        self.phase = Phase::Idle;
        self.entered.clear();
        self.diagnostics = Diagnostics::new();
    }

    fn transition(&mut self, next: Phase) {
        tracing::debug!(from = ?self.phase, to = ?next, "phase");
        self.phase = next;
    }

    fn enter(&mut self, section: &str) -> Result<()> {
        if !self.entered.insert(section.to_string()) {
            return Err(CodecError::SectionReentered {
                name: section.to_string(),
            });
        }
        tracing::debug!(section, "entering section");
        Ok(())
    }

    fn finish<T>(&mut self, result: Result<T>) -> Result<T> {
        match &result {
            Ok(_) => self.transition(Phase::Done),
            Err(err) => {
                tracing::debug!(error = %err, "operation failed");
                self.transition(Phase::Failed);
            }
        }
        result
    }

    // ========================================================================
    // Export
    // ========================================================================

    fn run_export(&mut self, model: &Model) -> Result<Document> {
        let encoding = self.config.encoding;
        let mut root = Group::new();

        self.transition(Phase::ValidatingHeader);
        self.enter(SECTION)?;
        let mut header = minor::write_header(model.minor(), encoding)?;

        self.transition(Phase::Streaming);
        let mut ranks = IndexRanks::new(model.type_index());
        for (spec, _) in model.collections() {
            self.enter(spec.name)?;
            let group = GroupExporter::new(self.registry, &self.config, &mut self.diagnostics)
                .export(spec, model, &mut ranks)?;
            *root.create_group(spec.name)? = group;
        }

        for (name, values) in model.primitive_lists() {
            self.enter(name)?;
            let loc = Location::collection(name);
            let refs: Vec<&Scalar> = values.iter().collect();
            let data = scalars_to_array(&refs, encoding, &loc)?
                .ok_or_else(|| CodecError::unsupported(&loc, "list mixes value kinds"))?;
            root.create_dataset(name, Dataset::array(data))?;
        }

        if self.config.write_cards_to_read && !model.cards_to_read().is_empty() {
            self.enter(CARDS_TO_READ)?;
            let loc = Location::collection(CARDS_TO_READ);
            let tags = model
                .cards_to_read()
                .iter()
                .map(|tag| encode_text(tag, encoding, &loc))
                .collect::<Result<Vec<_>>>()?;
            root.create_dataset(CARDS_TO_READ, Dataset::array(ArrayData::Bytes(tags)))?;
        }

        self.transition(Phase::Finalizing);
        model
            .verify_bookkeeping()
            .map_err(|e| CodecError::model(&Location::document(), e))?;
        minor::write_rejects(model.minor(), encoding, &mut header)?;
        *root.create_group(SECTION)? = header;

        tracing::info!(
            sections = root.len(),
            entities = model.entity_count(),
            diagnostics = self.diagnostics.len(),
            "exported document"
        );
        Ok(Document::from_root(root))
    }

    // ========================================================================
    // Load
    // ========================================================================

    fn run_load(&mut self, document: &Document) -> Result<LoadReport> {
        let root = document.root();

        self.transition(Phase::ValidatingHeader);
        let header = match root.get(SECTION) {
            Some(Node::Group(g)) => g,
            Some(Node::Dataset(_)) => {
                return Err(CodecError::malformed(
                    &Location::collection(SECTION),
                    "header must be a group",
                ))
            }
            None => return Err(CodecError::MissingHeader { name: SECTION }),
        };
        let encoding = minor::read_encoding(header)?;
        if let Some(name) = root.names().find(|name| !is_known_section(name)) {
            return Err(CodecError::UnrecognizedSection { name: name.to_string() });
        }
        self.enter(SECTION)?;
        let mut model = Model::new();
        minor::read_header(header, encoding, model.minor_mut())?;

        self.transition(Phase::Streaming);
        let importer = GroupImporter::new(self.registry, encoding);
        let mut order = IndexOrder::new();
        for spec in CATALOGUE {
            if let Some(node) = root.get(spec.name) {
                self.enter(spec.name)?;
                importer.import(spec, node, &mut model, &mut order)?;
            }
        }

        for &(name, _) in PRIMITIVE_LISTS {
            if let Some(node) = root.get(name) {
                self.enter(name)?;
                let loc = Location::collection(name);
                let values = match node.as_dataset() {
                    Some(ds) if ds.ndim() == 1 => array_to_scalars(ds.data(), encoding, &loc)?,
                    _ => return Err(CodecError::malformed(&loc, "expected a 1-D array")),
                };
                model
                    .set_primitive_list(name, values)
                    .map_err(|e| CodecError::model(&loc, e))?;
            }
        }

        if let Some(node) = root.get(CARDS_TO_READ) {
            self.enter(CARDS_TO_READ)?;
            let loc = Location::collection(CARDS_TO_READ);
            let tags = node
                .as_dataset()
                .filter(|ds| ds.ndim() == 1)
                .and_then(|ds| ds.as_bytes())
                .ok_or_else(|| CodecError::malformed(&loc, "expected a text array"))?;
            for tag in tags {
                model.enable_card(decode_text(tag, encoding, &loc)?);
            }
        }

        self.transition(Phase::Finalizing);
        minor::read_rejects(header, encoding, model.minor_mut())?;
        order.apply(&mut model)?;
        model
            .verify_bookkeeping()
            .map_err(|e| CodecError::model(&Location::document(), e))?;

        tracing::info!(
            sections = self.entered.len(),
            entities = model.entity_count(),
            encoding = %encoding,
            "loaded document"
        );
        Ok(LoadReport { model, encoding })
    }
}

fn is_known_section(name: &str) -> bool {
    name == SECTION
        || name == CARDS_TO_READ
        || catalogue::collection(name).is_some()
        || catalogue::primitive_list(name).is_some()
}

// ============================================================================
// Files
// ============================================================================

/// Export `model` and write it to `path`.
///
/// The file handle is acquired before export starts; if export fails the
/// handle is dropped and nothing is left at `path`.
pub fn save_model(path: &Path, registry: &TypeRegistry, model: &Model, config: &CodecConfig) -> Result<Diagnostics> {
    let file = ContainerFile::create(path)?;
    let report = Orchestrator::new(registry, config.clone()).export_document(model)?;
    file.commit(&report.document)?;
    Ok(report.diagnostics)
}

pub fn open_model(path: &Path, registry: &TypeRegistry) -> Result<LoadReport> {
    let document = Document::read_from(path)?;
    Orchestrator::new(registry, CodecConfig::default()).load_document(&document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardstore_model::{cards, Entity, Key, Value};

    fn sample() -> Model {
        let mut model = Model::new();
        model
            .insert(
                "nodes",
                Some(Key::Id(1)),
                Entity::new("GRID").with("nid", 1).with("xyz", Value::floats([0.0, 0.0, 0.0])),
            )
            .unwrap();
        model
    }

    #[test]
    fn phases_end_in_done_or_failed() {
        let registry = cards::registry().unwrap();
        let mut orchestrator = Orchestrator::new(&registry, CodecConfig::default());
        assert_eq!(orchestrator.phase(), Phase::Idle);

        let report = orchestrator.export_document(&sample()).unwrap();
        assert_eq!(orchestrator.phase(), Phase::Done);

        let mut document = report.document;
        document
            .root_mut()
            .create_dataset("mystery", Dataset::scalar_int(1))
            .unwrap();
        assert!(orchestrator.load_document(&document).is_err());
        assert_eq!(orchestrator.phase(), Phase::Failed);
    }

    #[test]
    fn sections_cannot_be_entered_twice() {
        let registry = cards::registry().unwrap();
        let mut orchestrator = Orchestrator::new(&registry, CodecConfig::default());
        orchestrator.enter("nodes").unwrap();
        assert!(matches!(
            orchestrator.enter("nodes"),
            Err(CodecError::SectionReentered { name }) if name == "nodes"
        ));
    }

    #[test]
    fn documents_without_a_header_are_rejected() {
        let registry = cards::registry().unwrap();
        let mut orchestrator = Orchestrator::new(&registry, CodecConfig::default());
        let err = orchestrator.load_document(&Document::new()).unwrap_err();
        assert!(matches!(err, CodecError::MissingHeader { name: "minor_attributes" }));
    }
}
