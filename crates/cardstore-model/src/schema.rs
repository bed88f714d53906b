//! Per-type field descriptors.
//!
//! Every registered type declares its persisted attributes up front: name,
//! kind and whether the attribute may be unset. The codec works from this
//! table alone; nothing is discovered by inspecting live entities.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::entity::Entity;
use crate::error::{ModelError, Result};
use crate::value::Scalar;

/// Attributes that are never persisted for any type.
pub const ALWAYS_EXCLUDED: &[&str] = &["comment", "field_map"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarKind {
    Int,
    Float,
    Str,
    Bool,
    /// Int, float or string, decided per value (e.g. PARAM values).
    Any,
}

impl ScalarKind {
    pub fn name(self) -> &'static str {
        match self {
            ScalarKind::Int => "int",
            ScalarKind::Float => "float",
            ScalarKind::Str => "str",
            ScalarKind::Bool => "bool",
            ScalarKind::Any => "any",
        }
    }

    pub fn accepts(self, value: &Scalar) -> bool {
        match (self, value) {
            (ScalarKind::Any, Scalar::Bool(_)) => false,
            (ScalarKind::Any, _) => true,
            (ScalarKind::Int, Scalar::Int(_)) => true,
            (ScalarKind::Float, Scalar::Float(_)) => true,
            (ScalarKind::Str, Scalar::Str(_)) => true,
            (ScalarKind::Bool, Scalar::Bool(_)) => true,
            _ => false,
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, ScalarKind::Int | ScalarKind::Float)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Scalar(ScalarKind),
    /// Id of another entity. Stored as the raw id, never resolved here.
    Ref,
    /// Fixed number of elements.
    Vector(ScalarKind, usize),
    /// Variable number of elements; elements may be absent.
    List(ScalarKind),
    /// String key -> primitive.
    Map(ScalarKind),
}

impl FieldKind {
    /// Element kind of the stored values.
    pub fn element(self) -> ScalarKind {
        match self {
            FieldKind::Scalar(k) | FieldKind::Vector(k, _) | FieldKind::List(k) | FieldKind::Map(k) => k,
            FieldKind::Ref => ScalarKind::Int,
        }
    }

    /// Whether every instance stores the same number of elements, which is
    /// what a columnar layout needs.
    pub fn is_fixed_width(self) -> bool {
        match self {
            FieldKind::Scalar(k) | FieldKind::Vector(k, _) => k != ScalarKind::Any,
            FieldKind::Ref => true,
            FieldKind::List(_) | FieldKind::Map(_) => false,
        }
    }

    /// Elements per instance for fixed-width kinds.
    pub fn width(self) -> usize {
        match self {
            FieldKind::Vector(_, n) => n,
            _ => 1,
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Scalar(k) => f.write_str(k.name()),
            FieldKind::Ref => f.write_str("ref"),
            FieldKind::Vector(k, n) => write!(f, "{}[{n}]", k.name()),
            FieldKind::List(k) => write!(f, "list<{}>", k.name()),
            FieldKind::Map(k) => write!(f, "map<str, {}>", k.name()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    pub nullable: bool,
}

/// Storage layout chosen for a type at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// One sub-group per instance.
    Generic,
    /// Parallel arrays, one per field, indexed like the key array.
    Columnar,
}

impl Layout {
    pub fn name(self) -> &'static str {
        match self {
            Layout::Generic => "generic",
            Layout::Columnar => "columnar",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "generic" => Some(Layout::Generic),
            "columnar" => Some(Layout::Columnar),
            _ => None,
        }
    }
}

/// Called once per decoded instance after every stored attribute is set.
pub type FinalizeHook = fn(&mut Entity);

#[derive(Debug, Clone)]
pub struct CardSchema {
    tag: String,
    fields: Vec<FieldSpec>,
    skip: Vec<String>,
    layout: Layout,
    finalize: Option<FinalizeHook>,
}

impl CardSchema {
    pub fn generic(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            fields: Vec::new(),
            skip: Vec::new(),
            layout: Layout::Generic,
            finalize: None,
        }
    }

    pub fn columnar(tag: &str) -> Self {
        Self {
            layout: Layout::Columnar,
            ..Self::generic(tag)
        }
    }

    /// A field that every instance sets.
    pub fn field(mut self, name: &str, kind: FieldKind) -> Self {
        self.fields.push(FieldSpec {
            name: name.to_string(),
            kind,
            nullable: false,
        });
        self
    }

    /// A field that may be unset.
    pub fn optional(mut self, name: &str, kind: FieldKind) -> Self {
        self.fields.push(FieldSpec {
            name: name.to_string(),
            kind,
            nullable: true,
        });
        self
    }

    /// A derived attribute: never persisted, never decoded.
    pub fn skip(mut self, name: &str) -> Self {
        self.skip.push(name.to_string());
        self
    }

    pub fn on_finalize(mut self, hook: FinalizeHook) -> Self {
        self.finalize = Some(hook);
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn skip_list(&self) -> &[String] {
        &self.skip
    }

    pub fn finalize_hook(&self) -> Option<FinalizeHook> {
        self.finalize
    }

    pub fn field_spec(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Skipped or always-excluded; such attributes are ignored by the codec.
    pub fn is_excluded(&self, name: &str) -> bool {
        ALWAYS_EXCLUDED.contains(&name) || self.skip.iter().any(|s| s == name)
    }

    /// Declared fields that are written to the container, in declaration order.
    pub fn persisted(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| !self.is_excluded(&f.name))
    }

    /// A fresh instance with nothing set.
    pub fn construct(&self) -> Entity {
        Entity::new(self.tag.clone())
    }

    pub fn finalize(&self, entity: &mut Entity) {
        if let Some(hook) = self.finalize {
            hook(entity);
        }
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| ModelError::InvalidSchema {
            tag: self.tag.clone(),
            reason,
        };

        if self.tag.is_empty() || self.tag.contains('/') {
            return Err(invalid("type tags must be non-empty and free of '/'".to_string()));
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            if field.name.is_empty() || field.name.contains('/') {
                return Err(invalid(format!("bad field name `{}`", field.name)));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(invalid(format!("field `{}` declared twice", field.name)));
            }
            if let FieldKind::Vector(kind, n) = field.kind {
                if n == 0 || kind == ScalarKind::Any {
                    return Err(invalid(format!("vector field `{}` needs a concrete kind and width", field.name)));
                }
            }
            if self.layout == Layout::Columnar
                && !self.is_excluded(&field.name)
                && !field.kind.is_fixed_width()
            {
                return Err(invalid(format!(
                    "columnar types need fixed-width fields; `{}` is {}",
                    field.name, field.kind
                )));
            }
        }
        Ok(())
    }
}

/// Shorthand kinds for descriptor tables.
pub mod kinds {
    use super::{FieldKind, ScalarKind};

    pub const INT: FieldKind = FieldKind::Scalar(ScalarKind::Int);
    pub const FLOAT: FieldKind = FieldKind::Scalar(ScalarKind::Float);
    pub const STR: FieldKind = FieldKind::Scalar(ScalarKind::Str);
    pub const BOOL: FieldKind = FieldKind::Scalar(ScalarKind::Bool);
    pub const ANY: FieldKind = FieldKind::Scalar(ScalarKind::Any);
    pub const REF: FieldKind = FieldKind::Ref;
    pub const INTS: FieldKind = FieldKind::List(ScalarKind::Int);
    pub const FLOATS: FieldKind = FieldKind::List(ScalarKind::Float);
    pub const STRS: FieldKind = FieldKind::List(ScalarKind::Str);
    pub const ANYS: FieldKind = FieldKind::List(ScalarKind::Any);
    pub const FLOAT_MAP: FieldKind = FieldKind::Map(ScalarKind::Float);
    pub const ANY_MAP: FieldKind = FieldKind::Map(ScalarKind::Any);

    pub const fn floats(n: usize) -> FieldKind {
        FieldKind::Vector(ScalarKind::Float, n)
    }

    pub const fn ints(n: usize) -> FieldKind {
        FieldKind::Vector(ScalarKind::Int, n)
    }
}

#[cfg(test)]
mod tests {
    use super::kinds::*;
    use super::*;

    #[test]
    fn columnar_rejects_variable_width_fields() {
        let schema = CardSchema::columnar("RBE2").field("eid", INT).field("gn", INTS);
        assert!(matches!(schema.validate(), Err(ModelError::InvalidSchema { .. })));
    }

    #[test]
    fn skipped_fields_are_not_persisted() {
        let schema = CardSchema::generic("DMIG")
            .field("name", STR)
            .field("is_complex", BOOL)
            .skip("is_complex");
        let names: Vec<&str> = schema.persisted().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["name"]);
        assert!(schema.is_excluded("comment"));
    }

    #[test]
    fn duplicate_fields_are_rejected() {
        let schema = CardSchema::generic("X").field("a", INT).optional("a", FLOAT);
        assert!(schema.validate().is_err());
    }

    #[test]
    fn any_kind_accepts_numbers_and_text() {
        assert!(ScalarKind::Any.accepts(&Scalar::Int(1)));
        assert!(ScalarKind::Any.accepts(&Scalar::Str("YES".into())));
        assert!(!ScalarKind::Any.accepts(&Scalar::Bool(true)));
        assert!(!ScalarKind::Float.accepts(&Scalar::Int(1)));
    }
}
