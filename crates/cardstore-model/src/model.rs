use std::collections::{BTreeMap, BTreeSet};

use crate::bookkeeping::{TypeIndex, TypeTally};
use crate::catalogue::{self, CollectionSpec, Shape, CATALOGUE};
use crate::collection::{Collection, KeyedMap, KeyedMultimap};
use crate::entity::Entity;
use crate::error::{ModelError, Result};
use crate::minor::MinorAttributes;
use crate::value::{Key, Scalar};

/// The in-memory engineering model.
///
/// Entities enter only through [`Model::insert`], which updates the
/// collection, the [`TypeTally`] and the [`TypeIndex`] together. Empty
/// collections are never materialized.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Model {
    collections: BTreeMap<&'static str, Collection>,
    lists: BTreeMap<&'static str, Vec<Scalar>>,
    cards_to_read: BTreeSet<String>,
    minor: MinorAttributes,
    tally: TypeTally,
    index: TypeIndex,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Insertion
    // ========================================================================

    /// Store `entity` in `collection`.
    ///
    /// Keyed collections need a key of the declared kind; flat lists and
    /// scalars take none. On error the model is unchanged.
    pub fn insert(&mut self, collection: &str, key: Option<Key>, entity: Entity) -> Result<()> {
        let spec = catalogue::collection(collection).ok_or_else(|| ModelError::UnknownCollection {
            name: collection.to_string(),
        })?;
        let key = check_key(spec, key)?;
        let tag = entity.type_tag().to_string();

        let indexed = match (spec.shape, key) {
            (Shape::Scalar, _) => {
                if self.collections.contains_key(spec.name) {
                    return Err(ModelError::ScalarAlreadySet {
                        collection: spec.name.to_string(),
                    });
                }
                self.collections.insert(spec.name, Collection::Scalar(entity));
                None
            }
            (Shape::KeyedMap, Some(key)) => {
                let slot = self
                    .collections
                    .entry(spec.name)
                    .or_insert_with(|| Collection::Map(KeyedMap::new()));
                let Collection::Map(map) = slot else {
                    return Err(shape_conflict(spec));
                };
                if map.insert(key.clone(), entity).is_err() {
                    return Err(ModelError::DuplicateKey {
                        collection: spec.name.to_string(),
                        key: key.to_string(),
                    });
                }
                Some(key)
            }
            (Shape::KeyedMultimap, Some(key)) => {
                let slot = self
                    .collections
                    .entry(spec.name)
                    .or_insert_with(|| Collection::MultiMap(KeyedMultimap::new()));
                let Collection::MultiMap(map) = slot else {
                    return Err(shape_conflict(spec));
                };
                map.push(key.clone(), entity);
                Some(key)
            }
            (Shape::FlatList, _) => {
                let slot = self
                    .collections
                    .entry(spec.name)
                    .or_insert_with(|| Collection::List(Vec::new()));
                let Collection::List(list) = slot else {
                    return Err(shape_conflict(spec));
                };
                list.push(entity);
                Some(Key::Id(list.len() as i64 - 1))
            }
            (_, None) => {
                return Err(ModelError::KeyRequired {
                    collection: spec.name.to_string(),
                })
            }
        };

        self.tally.increment(&tag);
        if let Some(key) = indexed {
            self.index.push(&tag, key);
        }
        Ok(())
    }

    /// Put the [`TypeIndex`] entries of `tag` in the order given by `keys`.
    ///
    /// `keys` must hold exactly the ids already recorded for `tag`, so only
    /// the order can change.
    pub fn restore_index_order(&mut self, tag: &str, keys: Vec<Key>) -> Result<()> {
        let mut current = self.index.get(tag).to_vec();
        let mut wanted = keys.clone();
        current.sort_unstable();
        wanted.sort_unstable();
        if current != wanted {
            return Err(ModelError::BookkeepingMismatch {
                tag: tag.to_string(),
                reason: format!(
                    "stored index order names {} ids, {} recorded",
                    keys.len(),
                    current.len()
                ),
            });
        }
        self.index.replace(tag, keys);
        Ok(())
    }

    // ========================================================================
    // Read access
    // ========================================================================

    pub fn collection(&self, name: &str) -> Option<&Collection> {
        self.collections.get(name)
    }

    /// Non-empty collections in catalogue order.
    pub fn collections(&self) -> impl Iterator<Item = (&'static CollectionSpec, &Collection)> {
        CATALOGUE
            .iter()
            .filter_map(move |spec| self.collections.get(spec.name).map(|c| (spec, c)))
            .filter(|(_, c)| c.entity_count() > 0)
    }

    pub fn get(&self, collection: &str, key: &Key) -> Option<&Entity> {
        match self.collections.get(collection)? {
            Collection::Map(map) => map.get(key),
            _ => None,
        }
    }

    pub fn group(&self, collection: &str, key: &Key) -> Option<&[Entity]> {
        match self.collections.get(collection)? {
            Collection::MultiMap(map) => map.get(key),
            _ => None,
        }
    }

    pub fn scalar(&self, collection: &str) -> Option<&Entity> {
        match self.collections.get(collection)? {
            Collection::Scalar(entity) => Some(entity),
            _ => None,
        }
    }

    pub fn list(&self, collection: &str) -> Option<&[Entity]> {
        match self.collections.get(collection)? {
            Collection::List(list) => Some(list),
            _ => None,
        }
    }

    /// Every instance of `tag`, in catalogue then storage order.
    pub fn of_type<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Entity> + 'a {
        self.collections()
            .flat_map(|(_, c)| c.entities())
            .filter_map(move |(_, e)| (e.type_tag() == tag).then_some(e))
    }

    /// First instance of `tag` stored under `key` in a keyed collection.
    pub fn lookup(&self, tag: &str, key: &Key) -> Option<&Entity> {
        self.collections()
            .filter(|(spec, _)| spec.shape.is_keyed())
            .flat_map(|(_, c)| c.entities())
            .find(|(k, e)| k.as_ref() == Some(key) && e.type_tag() == tag)
            .map(|(_, e)| e)
    }

    pub fn type_tally(&self) -> &TypeTally {
        &self.tally
    }

    pub fn type_index(&self) -> &TypeIndex {
        &self.index
    }

    pub fn entity_count(&self) -> usize {
        self.collections.values().map(Collection::entity_count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
            && self.lists.is_empty()
            && self.cards_to_read.is_empty()
            && self.minor == MinorAttributes::default()
    }

    // ========================================================================
    // Non-entity content
    // ========================================================================

    pub fn minor(&self) -> &MinorAttributes {
        &self.minor
    }

    pub fn minor_mut(&mut self) -> &mut MinorAttributes {
        &mut self.minor
    }

    /// Replace a primitive list. Every element must have the list's kind.
    pub fn set_primitive_list(&mut self, name: &str, values: Vec<Scalar>) -> Result<()> {
        let (name, kind) = catalogue::PRIMITIVE_LISTS
            .iter()
            .find(|(n, _)| *n == name)
            .copied()
            .ok_or_else(|| ModelError::UnknownList {
                name: name.to_string(),
            })?;
        if let Some(bad) = values.iter().find(|v| !kind.accepts(v)) {
            return Err(ModelError::ValueKindMismatch {
                name: name.to_string(),
                expected: kind.name(),
                found: bad.kind_name(),
            });
        }
        if values.is_empty() {
            self.lists.remove(name);
        } else {
            self.lists.insert(name, values);
        }
        Ok(())
    }

    pub fn primitive_list(&self, name: &str) -> Option<&[Scalar]> {
        self.lists.get(name).map(Vec::as_slice)
    }

    pub fn primitive_lists(&self) -> impl Iterator<Item = (&'static str, &[Scalar])> {
        self.lists.iter().map(|(k, v)| (*k, v.as_slice()))
    }

    pub fn enable_card(&mut self, tag: impl Into<String>) {
        self.cards_to_read.insert(tag.into());
    }

    pub fn cards_to_read(&self) -> &BTreeSet<String> {
        &self.cards_to_read
    }

    // ========================================================================
    // Consistency
    // ========================================================================

    /// Check that tally and index agree with what the collections hold.
    pub fn verify_bookkeeping(&self) -> Result<()> {
        let mut counted: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
        for (_, collection) in self.collections() {
            for (key, entity) in collection.entities() {
                let slot = counted.entry(entity.type_tag()).or_default();
                slot.0 += 1;
                if key.is_some() {
                    slot.1 += 1;
                }
            }
        }

        for (tag, &(instances, keyed)) in &counted {
            let tallied = self.tally.get(tag);
            if tallied != instances {
                return Err(ModelError::BookkeepingMismatch {
                    tag: tag.to_string(),
                    reason: format!("tally {tallied}, {instances} instances stored"),
                });
            }
            let indexed = self.index.get(tag).len();
            if indexed != keyed {
                return Err(ModelError::BookkeepingMismatch {
                    tag: tag.to_string(),
                    reason: format!("index holds {indexed} ids, {keyed} keyed instances stored"),
                });
            }
        }
        if let Some((tag, n)) = self.tally.iter().find(|(tag, _)| !counted.contains_key(tag)) {
            return Err(ModelError::BookkeepingMismatch {
                tag: tag.to_string(),
                reason: format!("tally {n}, nothing stored"),
            });
        }
        Ok(())
    }
}

fn check_key(spec: &CollectionSpec, key: Option<Key>) -> Result<Option<Key>> {
    match (spec.shape.is_keyed(), key) {
        (true, None) => Err(ModelError::KeyRequired {
            collection: spec.name.to_string(),
        }),
        (true, Some(key)) if !spec.key.accepts(&key) => Err(ModelError::KeyKindMismatch {
            collection: spec.name.to_string(),
            key: key.to_string(),
        }),
        (false, Some(_)) => Err(ModelError::KeyNotAllowed {
            collection: spec.name.to_string(),
        }),
        (_, key) => Ok(key),
    }
}

fn shape_conflict(spec: &CollectionSpec) -> ModelError {
    ModelError::InvalidSchema {
        tag: spec.name.to_string(),
        reason: format!("collection is not a {}", spec.shape.name()),
    }
}
