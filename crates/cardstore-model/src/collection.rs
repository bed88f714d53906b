use ahash::AHashMap;

use crate::entity::Entity;
use crate::value::Key;

/// Key -> one entity, iterated in insertion order.
#[derive(Debug, Clone, Default)]
pub struct KeyedMap {
    entries: Vec<(Key, Entity)>,
    index: AHashMap<Key, usize>,
}

impl KeyedMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &Key) -> bool {
        self.index.contains_key(key)
    }

    /// Returns the entity back if `key` is already present.
    pub fn insert(&mut self, key: Key, entity: Entity) -> Result<(), Entity> {
        if self.index.contains_key(&key) {
            return Err(entity);
        }
        self.index.insert(key.clone(), self.entries.len());
        self.entries.push((key, entity));
        Ok(())
    }

    pub fn get(&self, key: &Key) -> Option<&Entity> {
        self.index.get(key).map(|&i| &self.entries[i].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Entity)> {
        self.entries.iter().map(|(k, e)| (k, e))
    }

    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Maps are equal when they hold the same entity under every key; the
/// interleaving of different keys is not part of a map's identity.
impl PartialEq for KeyedMap {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(k, e)| other.get(k) == Some(e))
    }
}

/// Key -> ordered list of entities. The inner order is significant.
#[derive(Debug, Clone, Default)]
pub struct KeyedMultimap {
    entries: Vec<(Key, Vec<Entity>)>,
    index: AHashMap<Key, usize>,
}

impl KeyedMultimap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append to the list under `key`, creating it on first use. Returns the
    /// position of the new entity within that list.
    pub fn push(&mut self, key: Key, entity: Entity) -> usize {
        let slot = match self.index.get(&key) {
            Some(&i) => i,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, Vec::new()));
                self.entries.len() - 1
            }
        };
        let list = &mut self.entries[slot].1;
        list.push(entity);
        list.len() - 1
    }

    pub fn get(&self, key: &Key) -> Option<&[Entity]> {
        self.index.get(key).map(|&i| self.entries[i].1.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Key, &[Entity])> {
        self.entries.iter().map(|(k, list)| (k, list.as_slice()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.entries.iter().map(|(k, _)| k)
    }

    /// Number of outer keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entity_count(&self) -> usize {
        self.entries.iter().map(|(_, list)| list.len()).sum()
    }
}

impl PartialEq for KeyedMultimap {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

/// A non-empty model collection in one of the four storage shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum Collection {
    Scalar(Entity),
    Map(KeyedMap),
    MultiMap(KeyedMultimap),
    List(Vec<Entity>),
}

impl Collection {
    /// Number of entities held.
    pub fn entity_count(&self) -> usize {
        match self {
            Collection::Scalar(_) => 1,
            Collection::Map(map) => map.len(),
            Collection::MultiMap(map) => map.entity_count(),
            Collection::List(list) => list.len(),
        }
    }

    /// Every entity, with the key it is stored under (position for lists,
    /// `None` for a scalar).
    pub fn entities(&self) -> Box<dyn Iterator<Item = (Option<Key>, &Entity)> + '_> {
        match self {
            Collection::Scalar(entity) => Box::new(std::iter::once((None, entity))),
            Collection::Map(map) => Box::new(map.iter().map(|(k, e)| (Some(k.clone()), e))),
            Collection::MultiMap(map) => Box::new(
                map.iter()
                    .flat_map(|(k, list)| list.iter().map(move |e| (Some(k.clone()), e))),
            ),
            Collection::List(list) => Box::new(
                list.iter()
                    .enumerate()
                    .map(|(i, e)| (Some(Key::Id(i as i64)), e)),
            ),
        }
    }
}
