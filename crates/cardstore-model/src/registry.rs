use ahash::AHashMap;

use crate::entity::Entity;
use crate::error::{ModelError, Result};
use crate::schema::CardSchema;

/// Type tag -> descriptor table. Read-only once built.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    schemas: Vec<CardSchema>,
    by_tag: AHashMap<String, usize>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, schema: CardSchema) -> Result<()> {
        schema.validate()?;
        if self.by_tag.contains_key(schema.tag()) {
            return Err(ModelError::DuplicateType {
                tag: schema.tag().to_string(),
            });
        }
        tracing::trace!(tag = schema.tag(), layout = schema.layout().name(), "registered card");
        self.by_tag.insert(schema.tag().to_string(), self.schemas.len());
        self.schemas.push(schema);
        Ok(())
    }

    pub fn resolve(&self, tag: &str) -> Result<&CardSchema> {
        self.get(tag).ok_or_else(|| ModelError::UnknownType {
            tag: tag.to_string(),
        })
    }

    pub fn get(&self, tag: &str) -> Option<&CardSchema> {
        self.by_tag.get(tag).map(|&i| &self.schemas[i])
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.by_tag.contains_key(tag)
    }

    pub fn construct(&self, tag: &str) -> Result<Entity> {
        Ok(self.resolve(tag)?.construct())
    }

    /// Registration order; this is the order type groups are written in.
    pub fn schemas(&self) -> impl Iterator<Item = &CardSchema> {
        self.schemas.iter()
    }

    pub fn position(&self, tag: &str) -> Option<usize> {
        self.by_tag.get(tag).copied()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}
