//! Whole-collection export and import, one matched pair per storage shape.

use std::collections::BTreeSet;

use cardstore_container::{ArrayData, Dataset, Group, Node};
use cardstore_model::{
    classify, CardSchema, Collection, CollectionSpec, Entity, Key, KeyKind, Layout, Model, ModelError, Shape,
    TypeRegistry, TypeStrategy, TypeTally,
};

use crate::columnar::{decode_columns, encode_columns};
use crate::config::CodecConfig;
use crate::diagnostics::Diagnostics;
use crate::error::{CodecError, Location, Result};
use crate::object::{decode_entity, decode_text, encode_entity, encode_text, TYPE_ATTR};
use crate::order::{IndexOrder, IndexRanks, ORDER};
use crate::text::TextEncoding;

pub(crate) const KEYS: &str = "keys";
pub(crate) const VALUES: &str = "values";
pub(crate) const LAYOUT_ATTR: &str = "layout";

fn resolve<'r>(registry: &'r TypeRegistry, tag: &str, loc: &Location) -> Result<&'r CardSchema> {
    registry.resolve(tag).map_err(|e| CodecError::model(loc, e))
}

// ============================================================================
// Keys
// ============================================================================

fn keys_dataset(keys: &[Key], encoding: TextEncoding, loc: &Location) -> Result<Dataset> {
    if keys.iter().all(|k| matches!(k, Key::Id(_))) {
        let ids = keys.iter().filter_map(Key::as_id).collect();
        return Ok(Dataset::array(ArrayData::Int(ids)));
    }
    let names = keys
        .iter()
        .map(|k| match k {
            Key::Name(name) => encode_text(name, encoding, loc),
            Key::Id(id) => Err(CodecError::unsupported(
                loc,
                format!("integer key {id} in a collection keyed by name"),
            )),
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Dataset::array(ArrayData::Bytes(names)))
}

fn read_keys(group: &Group, kind: KeyKind, encoding: TextEncoding, loc: &Location) -> Result<Vec<Key>> {
    let ds = group.dataset(KEYS).map_err(|e| CodecError::container(loc, e))?;
    if ds.ndim() != 1 {
        return Err(CodecError::malformed(loc, "keys must be a 1-D array"));
    }
    match (kind, ds.data()) {
        (KeyKind::Id, ArrayData::Int(ids)) => Ok(ids.iter().map(|&id| Key::Id(id)).collect()),
        (KeyKind::Name, ArrayData::Bytes(names)) => names
            .iter()
            .map(|n| decode_text(n, encoding, loc).map(Key::Name))
            .collect(),
        (KeyKind::Name, ArrayData::Int(ids)) if ids.is_empty() => Ok(Vec::new()),
        (_, data) => Err(CodecError::malformed(
            loc,
            format!("{} keys where {:?} keys were expected", data.dtype().name(), kind),
        )),
    }
}

/// A decoded row: its stored key, the entity, and its type-index rank.
type Row = (Key, Entity, Option<usize>);

/// A row ready for export: stored key, type-index key, entity.
type Outgoing<'e> = (Key, Key, &'e Entity);

/// A decoded instance ready to insert: insert key, type-index key, entity, rank.
type Staged = (Option<Key>, Option<Key>, Entity, Option<usize>);

/// Order rows by their stored position; positions must be exactly 0..n.
fn order_by_position(items: Vec<Row>, loc: &Location) -> Result<Vec<(Entity, Option<usize>)>> {
    let n = items.len();
    let mut slots: Vec<Option<(Entity, Option<usize>)>> = vec![None; n];
    for (key, entity, rank) in items {
        let pos = key
            .as_id()
            .and_then(|p| usize::try_from(p).ok())
            .filter(|&p| p < n)
            .ok_or_else(|| CodecError::malformed(loc, format!("position {key} is out of range 0..{n}")))?;
        if slots[pos].replace((entity, rank)).is_some() {
            return Err(CodecError::malformed(loc, format!("position {pos} is stored twice")));
        }
    }
    Ok(slots.into_iter().flatten().collect())
}

/// The optional `order` dataset of a type group, one rank per row.
fn read_order(group: &Group, rows: usize, loc: &Location) -> Result<Option<Vec<usize>>> {
    let Some(node) = group.get(ORDER) else {
        return Ok(None);
    };
    let ranks = match node.as_dataset().map(|ds| (ds.ndim(), ds.data())) {
        Some((1, ArrayData::Int(ranks))) => ranks,
        _ => return Err(CodecError::malformed(loc, "order must be a 1-D integer array")),
    };
    if ranks.len() != rows {
        return Err(CodecError::malformed(
            loc,
            format!("{rows} keys but {} order entries", ranks.len()),
        ));
    }
    ranks
        .iter()
        .map(|&r| usize::try_from(r).map_err(|_| CodecError::malformed(loc, format!("negative order {r}"))))
        .collect::<Result<Vec<_>>>()
        .map(Some)
}

// ============================================================================
// Export
// ============================================================================

pub struct GroupExporter<'a> {
    registry: &'a TypeRegistry,
    config: &'a CodecConfig,
    diagnostics: &'a mut Diagnostics,
}

impl<'a> GroupExporter<'a> {
    pub fn new(registry: &'a TypeRegistry, config: &'a CodecConfig, diagnostics: &'a mut Diagnostics) -> Self {
        Self {
            registry,
            config,
            diagnostics,
        }
    }

    /// Encode the collection `spec` names from `model` into a new group.
    ///
    /// `ranks` must be built from `model` and shared by every collection
    /// of one export, since a card type may appear in more than one.
    pub fn export(&mut self, spec: &CollectionSpec, model: &Model, ranks: &mut IndexRanks) -> Result<Group> {
        let loc = Location::collection(spec.name);
        let collection = model
            .collection(spec.name)
            .filter(|c| c.entity_count() > 0)
            .ok_or_else(|| CodecError::unsupported(&loc, "collection is empty"))?;
        let shape = classify(spec.name).ok_or_else(|| CodecError::UnrecognizedSection {
            name: spec.name.to_string(),
        })?;
        let tally = model.type_tally();
        let group = match (shape, collection) {
            (Shape::Scalar, Collection::Scalar(entity)) => {
                let at = loc.with_type(entity.type_tag());
                let schema = resolve(self.registry, entity.type_tag(), &at)?;
                self.note_unset_required(schema, &[entity], &at);
                encode_entity(schema, entity, self.config.encoding, &at, self.diagnostics)?
            }
            (Shape::KeyedMap, Collection::Map(map)) => {
                let entries: Vec<Outgoing> = map.iter().map(|(k, e)| (k.clone(), k.clone(), e)).collect();
                let mut group = Group::new();
                if spec.types == TypeStrategy::SingleType {
                    let tag = single_type(&entries, &loc)?;
                    group.set_attr(TYPE_ATTR, tag);
                }
                self.write_types(&mut group, &entries, tally, ranks, &loc)?;
                group
            }
            (Shape::KeyedMultimap, Collection::MultiMap(map)) => {
                let outer: Vec<Key> = map.keys().cloned().collect();
                let mut group = Group::new();
                group
                    .create_dataset(KEYS, keys_dataset(&outer, self.config.encoding, &loc)?)
                    .map_err(|e| CodecError::container(&loc, e))?;
                for (key, list) in map.iter() {
                    let entries: Vec<Outgoing> = list
                        .iter()
                        .enumerate()
                        .map(|(i, e)| (Key::Id(i as i64), key.clone(), e))
                        .collect();
                    let mut sub = Group::new();
                    self.write_types(&mut sub, &entries, tally, ranks, &loc)?;
                    *group
                        .create_group(&key.to_string())
                        .map_err(|e| CodecError::container(&loc, e))? = sub;
                }
                group
            }
            (Shape::FlatList, Collection::List(list)) => {
                let entries: Vec<Outgoing> = list
                    .iter()
                    .enumerate()
                    .map(|(i, e)| (Key::Id(i as i64), Key::Id(i as i64), e))
                    .collect();
                let mut group = Group::new();
                self.write_types(&mut group, &entries, tally, ranks, &loc)?;
                group
            }
            _ => {
                return Err(CodecError::unsupported(
                    &loc,
                    format!("collection is not stored as a {}", shape.name()),
                ))
            }
        };
        tracing::debug!(
            collection = spec.name,
            shape = shape.name(),
            entities = collection.entity_count(),
            "exported collection"
        );
        Ok(group)
    }

    /// One sub-group per type tag present, in registry order.
    fn write_types(
        &mut self,
        group: &mut Group,
        entries: &[Outgoing],
        tally: &TypeTally,
        ranks: &mut IndexRanks,
        loc: &Location,
    ) -> Result<()> {
        let present: BTreeSet<&str> = entries.iter().map(|(_, _, e)| e.type_tag()).collect();
        for &tag in &present {
            resolve(self.registry, tag, &loc.with_type(tag))?;
            if !tally.contains(tag) {
                return Err(CodecError::model(
                    loc,
                    ModelError::BookkeepingMismatch {
                        tag: tag.to_string(),
                        reason: "stored but never tallied".to_string(),
                    },
                ));
            }
        }

        let registry = self.registry;
        for schema in registry
            .schemas()
            .filter(|s| present.contains(s.tag()) && tally.contains(s.tag()))
        {
            let rows: Vec<Outgoing> = entries
                .iter()
                .filter(|(_, _, e)| e.type_tag() == schema.tag())
                .cloned()
                .collect();
            let at = loc.with_type(schema.tag());
            let type_group = self.write_type_group(schema, &rows, ranks, &at)?;
            *group
                .create_group(schema.tag())
                .map_err(|e| CodecError::container(&at, e))? = type_group;
        }
        Ok(())
    }

    fn write_type_group(
        &mut self,
        schema: &CardSchema,
        rows: &[Outgoing],
        ranks: &mut IndexRanks,
        loc: &Location,
    ) -> Result<Group> {
        let keys: Vec<Key> = rows.iter().map(|(k, _, _)| k.clone()).collect();
        let entities: Vec<&Entity> = rows.iter().map(|(_, _, e)| *e).collect();
        let order = rows
            .iter()
            .map(|(_, indexed, _)| {
                ranks.take(schema.tag(), indexed).map(|r| r as i64).ok_or_else(|| {
                    CodecError::model(
                        loc,
                        ModelError::BookkeepingMismatch {
                            tag: schema.tag().to_string(),
                            reason: format!("`{indexed}` stored more often than indexed"),
                        },
                    )
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let layout = if schema.layout() == Layout::Columnar && self.config.columnar {
            Layout::Columnar
        } else {
            Layout::Generic
        };
        self.note_unset_required(schema, &entities, loc);

        let mut group = Group::new();
        group.set_attr(LAYOUT_ATTR, layout.name());
        group
            .create_dataset(KEYS, keys_dataset(&keys, self.config.encoding, loc)?)
            .map_err(|e| CodecError::container(loc, e))?;
        group
            .create_dataset(ORDER, Dataset::array(ArrayData::Int(order)))
            .map_err(|e| CodecError::container(loc, e))?;

        match layout {
            Layout::Columnar => encode_columns(
                schema,
                &entities,
                self.config.encoding,
                loc,
                &mut group,
                self.diagnostics,
            )?,
            Layout::Generic => {
                let mut values = Group::new();
                for (i, entity) in entities.iter().enumerate() {
                    let instance = encode_entity(schema, entity, self.config.encoding, loc, self.diagnostics)?;
                    *values
                        .create_group(&i.to_string())
                        .map_err(|e| CodecError::container(loc, e))? = instance;
                }
                *group
                    .create_group(VALUES)
                    .map_err(|e| CodecError::container(loc, e))? = values;
            }
        }

        tracing::debug!(location = %loc, count = rows.len(), layout = layout.name(), "exported type group");
        Ok(group)
    }

    /// Record declared-required fields that some instances leave unset.
    fn note_unset_required(&mut self, schema: &CardSchema, entities: &[&Entity], loc: &Location) {
        for spec in schema.persisted().filter(|f| !f.nullable) {
            let unset = entities.iter().filter(|e| !e.is_set(&spec.name)).count();
            if unset > 0 {
                self.diagnostics.push(
                    loc.with_attribute(&spec.name),
                    format!("required attribute unset in {unset} of {} instances", entities.len()),
                );
            }
        }
    }
}

fn single_type<'e>(entries: &[Outgoing<'e>], loc: &Location) -> Result<&'e str> {
    let mut tags = entries.iter().map(|(_, _, e)| e.type_tag());
    let first = tags.next().unwrap_or_default();
    match tags.find(|t| *t != first) {
        Some(second) => Err(CodecError::MixedMatrixTypes {
            location: loc.clone(),
            first: first.to_string(),
            second: second.to_string(),
        }),
        None => Ok(first),
    }
}

// ============================================================================
// Import
// ============================================================================

pub struct GroupImporter<'a> {
    registry: &'a TypeRegistry,
    encoding: TextEncoding,
}

impl<'a> GroupImporter<'a> {
    pub fn new(registry: &'a TypeRegistry, encoding: TextEncoding) -> Self {
        Self { registry, encoding }
    }

    /// Decode one collection section and insert it into `model`.
    ///
    /// Every instance is decoded before the first insert, so a failure
    /// leaves nothing of this collection in the model. Stored type-index
    /// ranks go to `order`, to be applied once the whole document is in.
    pub fn import(&self, spec: &CollectionSpec, node: &Node, model: &mut Model, order: &mut IndexOrder) -> Result<()> {
        let loc = Location::collection(spec.name);
        let group = node
            .as_group()
            .ok_or_else(|| CodecError::malformed(&loc, "collection section must be a group"))?;
        let shape = classify(spec.name).ok_or_else(|| CodecError::UnrecognizedSection {
            name: spec.name.to_string(),
        })?;

        let staged: Vec<Staged> = match shape {
            Shape::Scalar => {
                let tag = group
                    .attr_str(TYPE_ATTR)
                    .ok_or_else(|| CodecError::malformed(&loc, "scalar section has no type"))?;
                let at = loc.with_type(tag);
                let schema = resolve(self.registry, tag, &at)?;
                vec![(None, None, decode_entity(schema, group, self.encoding, &at)?, None)]
            }
            Shape::KeyedMap => {
                if spec.types == TypeStrategy::SingleType {
                    self.check_single_type(group, &loc)?;
                }
                self.read_types(group, spec.key, &loc)?
                    .into_iter()
                    .map(|(k, e, rank)| (Some(k.clone()), Some(k), e, rank))
                    .collect()
            }
            Shape::KeyedMultimap => self.read_multimap(spec, group, &loc)?,
            Shape::FlatList => order_by_position(self.read_types(group, KeyKind::Id, &loc)?, &loc)?
                .into_iter()
                .enumerate()
                .map(|(i, (e, rank))| (None, Some(Key::Id(i as i64)), e, rank))
                .collect(),
        };

        let count = staged.len();
        for (key, indexed, entity, rank) in staged {
            let at = loc.with_type(entity.type_tag());
            if let Some(indexed) = indexed {
                order.record(entity.type_tag(), rank, indexed);
            }
            model
                .insert(spec.name, key, entity)
                .map_err(|e| CodecError::model(&at, e))?;
        }
        tracing::debug!(collection = spec.name, entities = count, "loaded collection");
        Ok(())
    }

    fn check_single_type(&self, group: &Group, loc: &Location) -> Result<()> {
        let declared = group
            .attr_str(TYPE_ATTR)
            .ok_or_else(|| CodecError::malformed(loc, "matrix collection has no type"))?;
        match group.names().find(|name| *name != declared) {
            Some(other) => Err(CodecError::MixedMatrixTypes {
                location: loc.clone(),
                first: declared.to_string(),
                second: other.to_string(),
            }),
            None => Ok(()),
        }
    }

    fn read_multimap(&self, spec: &CollectionSpec, group: &Group, loc: &Location) -> Result<Vec<Staged>> {
        let outer = read_keys(group, spec.key, self.encoding, loc)?;
        let expected: BTreeSet<String> = outer.iter().map(Key::to_string).collect();
        if expected.len() != outer.len() {
            return Err(CodecError::malformed(loc, "outer keys are stored twice"));
        }
        if let Some(stray) = group.names().find(|n| *n != KEYS && !expected.contains(*n)) {
            return Err(CodecError::malformed(loc, format!("`{stray}` is not a stored key")));
        }

        let mut staged = Vec::new();
        for key in outer {
            let name = key.to_string();
            let sub = group.group(&name).map_err(|e| CodecError::container(loc, e))?;
            let items = self.read_types(sub, KeyKind::Id, loc)?;
            let rows = order_by_position(items, loc)?;
            if rows.is_empty() {
                return Err(CodecError::malformed(loc, format!("outer key `{key}` holds no entities")));
            }
            for (entity, rank) in rows {
                staged.push((Some(key.clone()), Some(key.clone()), entity, rank));
            }
        }
        Ok(staged)
    }

    /// Decode every type group under `group`, in registry order. Tags are
    /// resolved up front so an unknown tag fails before anything is decoded.
    fn read_types(&self, group: &Group, key_kind: KeyKind, loc: &Location) -> Result<Vec<Row>> {
        let mut tags: Vec<(usize, &str)> = Vec::with_capacity(group.len());
        for name in group.names() {
            let at = loc.with_type(name);
            let position = self.registry.position(name).ok_or_else(|| CodecError::UnknownType {
                location: at.clone(),
                tag: name.to_string(),
            })?;
            tags.push((position, name));
        }
        tags.sort_unstable();

        let mut out = Vec::new();
        for (_, tag) in tags {
            let at = loc.with_type(tag);
            let schema = resolve(self.registry, tag, &at)?;
            let type_group = group.group(tag).map_err(|e| CodecError::container(&at, e))?;
            let keys = read_keys(type_group, key_kind, self.encoding, &at)?;
            let entities = self.read_type_group(schema, type_group, keys.len(), &at)?;
            let ranks = read_order(type_group, keys.len(), &at)?;
            tracing::debug!(location = %at, count = keys.len(), "loaded type group");
            out.extend(
                keys.into_iter()
                    .zip(entities)
                    .enumerate()
                    .map(|(i, (k, e))| (k, e, ranks.as_ref().map(|r| r[i]))),
            );
        }
        Ok(out)
    }

    fn read_type_group(&self, schema: &CardSchema, group: &Group, rows: usize, loc: &Location) -> Result<Vec<Entity>> {
        let layout = group
            .attr_str(LAYOUT_ATTR)
            .and_then(Layout::parse)
            .ok_or_else(|| CodecError::malformed(loc, "type group has no valid layout"))?;
        match layout {
            Layout::Columnar if schema.layout() != Layout::Columnar => Err(CodecError::malformed(
                loc,
                "columnar layout stored for a type registered as generic",
            )),
            Layout::Columnar => decode_columns(schema, group, rows, self.encoding, loc),
            Layout::Generic => {
                let values = group.group(VALUES).map_err(|e| CodecError::container(loc, e))?;
                if values.len() != rows {
                    return Err(CodecError::malformed(
                        loc,
                        format!("{rows} keys but {} stored instances", values.len()),
                    ));
                }
                (0..rows)
                    .map(|i| {
                        let instance = values
                            .group(&i.to_string())
                            .map_err(|e| CodecError::container(loc, e))?;
                        decode_entity(schema, instance, self.encoding, loc)
                    })
                    .collect()
            }
        }
    }
}
