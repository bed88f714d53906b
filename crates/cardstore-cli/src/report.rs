use std::fmt::Write;

use colored::Colorize;
use serde::Serialize;

use cardstore_codec::TextEncoding;
use cardstore_model::{CardSchema, Model, TypeRegistry};

#[derive(Debug, Serialize)]
pub struct TypeStats {
    pub tag: String,
    pub count: usize,
    pub indexed: usize,
}

#[derive(Debug, Serialize)]
pub struct CollectionStats {
    pub name: &'static str,
    pub shape: &'static str,
    pub entities: usize,
}

#[derive(Debug, Serialize)]
pub struct ModelStats {
    pub encoding: TextEncoding,
    pub entities: usize,
    pub collections: Vec<CollectionStats>,
    pub types: Vec<TypeStats>,
}

impl ModelStats {
    pub fn collect(model: &Model, encoding: TextEncoding) -> Self {
        let collections = model
            .collections()
            .map(|(spec, collection)| CollectionStats {
                name: spec.name,
                shape: spec.shape.name(),
                entities: collection.entity_count(),
            })
            .collect();
        let types = model
            .type_tally()
            .iter()
            .map(|(tag, count)| TypeStats {
                tag: tag.to_string(),
                count,
                indexed: model.type_index().get(tag).len(),
            })
            .collect();
        Self {
            encoding,
            entities: model.entity_count(),
            collections,
            types,
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{} {} entities, encoding={}",
            "Model".green().bold(),
            self.entities,
            self.encoding
        );
        let _ = writeln!(out, "{}", "collections".bold());
        for c in &self.collections {
            let _ = writeln!(out, "  {:<24} {:<16} {}", c.name, c.shape, c.entities);
        }
        let _ = writeln!(out, "{}", "types".bold());
        for t in &self.types {
            let _ = writeln!(out, "  {:<24} {:>8} {:>8}", t.tag, t.count, t.indexed);
        }
        out
    }
}

pub fn render_registry(registry: &TypeRegistry) -> String {
    let mut out = String::new();
    for schema in registry.schemas() {
        let _ = writeln!(
            out,
            "{:<10} {:<9} {} fields",
            schema.tag(),
            schema.layout().name(),
            schema.persisted().count()
        );
    }
    out
}

pub fn render_card(schema: &CardSchema) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} ({})", schema.tag().bold(), schema.layout().name());
    for field in schema.fields() {
        let mut notes = Vec::new();
        if field.nullable {
            notes.push("optional");
        }
        if schema.is_excluded(&field.name) {
            notes.push("derived");
        }
        let _ = writeln!(out, "  {:<16} {:<16} {}", field.name, field.kind.to_string(), notes.join(", "));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardstore_model::{cards, Entity, Key, Value};

    #[test]
    fn stats_count_types_and_indexed_ids() {
        let mut model = Model::new();
        model
            .insert("nodes", Some(Key::Id(1)), Entity::new("GRID").with("nid", 1))
            .unwrap();
        model
            .insert("asets", None, Entity::new("ASET1").with("ids", Value::ints([1])))
            .unwrap();
        model
            .insert("aero", None, Entity::new("AERO").with("acsid", 0))
            .unwrap();

        let stats = ModelStats::collect(&model, TextEncoding::Utf8);
        assert_eq!(stats.entities, 3);
        let names: Vec<&str> = stats.collections.iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["nodes", "asets", "aero"]);
        let aero = stats.types.iter().find(|t| t.tag == "AERO").unwrap();
        assert_eq!((aero.count, aero.indexed), (1, 0));
        let aset = stats.types.iter().find(|t| t.tag == "ASET1").unwrap();
        assert_eq!((aset.count, aset.indexed), (1, 1));
    }

    #[test]
    fn card_table_marks_optional_and_derived_fields() {
        colored::control::set_override(false);
        let registry = cards::registry().unwrap();
        let text = render_card(registry.resolve("DMIG").unwrap());
        assert!(text.starts_with("DMIG (generic)\n"));
        assert!(text.contains("complex"));
        let derived = text.lines().find(|l| l.trim_start().starts_with("is_complex")).unwrap();
        assert!(derived.ends_with("derived"));
    }
}
