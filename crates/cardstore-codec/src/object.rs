//! Generic per-instance codec.
//!
//! One instance becomes one group tagged with `type`. Each set attribute
//! becomes a child in one of four forms:
//!
//! ```text
//! scalar          dataset with a scalar dataspace
//! sequence        1-D typed array (zero-length for an empty sequence)
//! gappy sequence  group, attr type=list, children "0".."n-1"; an absent
//!                 element is NaN for numeric kinds, a null dataset otherwise
//! mapping         group, attr type=dict, `keys` bytes array + `values`
//! ```
//!
//! Unset attributes have no child at all.

use cardstore_container::{ArrayData, DType, Dataset, Element, Group, Node};
use cardstore_model::{CardSchema, Entity, FieldKind, Scalar, ScalarKind, Value};

use crate::diagnostics::Diagnostics;
use crate::error::{CodecError, Location, Result};
use crate::text::TextEncoding;

pub(crate) const TYPE_ATTR: &str = "type";
const LIST_TAG: &str = "list";
const DICT_TAG: &str = "dict";

// ============================================================================
// Scalars and arrays
// ============================================================================

pub(crate) fn encode_text(text: &str, encoding: TextEncoding, loc: &Location) -> Result<Vec<u8>> {
    encoding
        .encode(text)
        .ok_or_else(|| CodecError::EncodingMismatch {
            location: loc.clone(),
            encoding: encoding.label(),
        })
}

pub(crate) fn decode_text(bytes: &[u8], encoding: TextEncoding, loc: &Location) -> Result<String> {
    encoding
        .decode(bytes)
        .ok_or_else(|| CodecError::EncodingMismatch {
            location: loc.clone(),
            encoding: encoding.label(),
        })
}

pub(crate) fn scalar_dataset(value: &Scalar, encoding: TextEncoding, loc: &Location) -> Result<Dataset> {
    Ok(match value {
        Scalar::Int(v) => Dataset::scalar_int(*v),
        Scalar::Float(v) => Dataset::scalar_float(*v),
        Scalar::Bool(v) => Dataset::scalar_bool(*v),
        Scalar::Str(v) => Dataset::scalar_bytes(encode_text(v, encoding, loc)?),
    })
}

pub(crate) fn element_scalar(element: Element<'_>, encoding: TextEncoding, loc: &Location) -> Result<Scalar> {
    Ok(match element {
        Element::Int(v) => Scalar::Int(v),
        Element::Float(v) => Scalar::Float(v),
        Element::Bool(v) => Scalar::Bool(v),
        Element::Bytes(v) => Scalar::Str(decode_text(v, encoding, loc)?),
    })
}

pub(crate) fn dtype_of(kind: ScalarKind) -> DType {
    match kind {
        ScalarKind::Int | ScalarKind::Any => DType::Int,
        ScalarKind::Float => DType::Float,
        ScalarKind::Str => DType::Bytes,
        ScalarKind::Bool => DType::Bool,
    }
}

/// One typed array for `values`, or `None` if they mix variants.
pub(crate) fn scalars_to_array(
    values: &[&Scalar],
    encoding: TextEncoding,
    loc: &Location,
) -> Result<Option<ArrayData>> {
    let Some(first) = values.first() else {
        return Ok(Some(ArrayData::Int(Vec::new())));
    };
    macro_rules! collect {
        ($variant:ident) => {
            values
                .iter()
                .map(|v| match v {
                    Scalar::$variant(x) => Some(x.clone()),
                    _ => None,
                })
                .collect::<Option<Vec<_>>>()
        };
    }
    Ok(match first {
        Scalar::Int(_) => collect!(Int).map(ArrayData::Int),
        Scalar::Float(_) => collect!(Float).map(ArrayData::Float),
        Scalar::Bool(_) => collect!(Bool).map(ArrayData::Bool),
        Scalar::Str(_) => match collect!(Str) {
            Some(texts) => Some(ArrayData::Bytes(
                texts
                    .iter()
                    .map(|t| encode_text(t, encoding, loc))
                    .collect::<Result<Vec<_>>>()?,
            )),
            None => None,
        },
    })
}

pub(crate) fn array_to_scalars(data: &ArrayData, encoding: TextEncoding, loc: &Location) -> Result<Vec<Scalar>> {
    Ok(match data {
        ArrayData::Int(v) => v.iter().map(|x| Scalar::Int(*x)).collect(),
        ArrayData::Float(v) => v.iter().map(|x| Scalar::Float(*x)).collect(),
        ArrayData::Bool(v) => v.iter().map(|x| Scalar::Bool(*x)).collect(),
        ArrayData::Bytes(v) => v
            .iter()
            .map(|b| decode_text(b, encoding, loc).map(Scalar::Str))
            .collect::<Result<_>>()?,
    })
}

// ============================================================================
// Encode
// ============================================================================

/// Encode one instance into a new group.
///
/// Attributes with no declared field are rejected; excluded attributes are
/// ignored. An attribute holding only absent elements is dropped and
/// recorded in `diagnostics`.
pub fn encode_entity(
    schema: &CardSchema,
    entity: &Entity,
    encoding: TextEncoding,
    loc: &Location,
    diagnostics: &mut Diagnostics,
) -> Result<Group> {
    let mut group = Group::new();
    group.set_attr(TYPE_ATTR, schema.tag());
    for (name, value) in entity.attrs() {
        if schema.is_excluded(name) {
            continue;
        }
        let at = loc.with_attribute(name);
        let spec = schema
            .field_spec(name)
            .ok_or_else(|| CodecError::unsupported(&at, "attribute is not declared for this type"))?;
        match encode_value(spec.kind, value, encoding, &at)? {
            Some(Node::Dataset(ds)) => group
                .create_dataset(name, ds)
                .map_err(|e| CodecError::container(&at, e))?,
            Some(Node::Group(child)) => {
                *group
                    .create_group(name)
                    .map_err(|e| CodecError::container(&at, e))? = child;
            }
            None => diagnostics.push(at, "every element is absent; attribute dropped"),
        }
    }
    Ok(group)
}

/// Encode one attribute value. `None` means the value carries nothing
/// storable (a sequence of only absent elements).
pub fn encode_value(kind: FieldKind, value: &Value, encoding: TextEncoding, loc: &Location) -> Result<Option<Node>> {
    let mismatch = || CodecError::unsupported(loc, format!("expected {kind}, found {}", value.shape_name()));

    match (kind, value) {
        (_, Value::Object(inner)) => Err(CodecError::unsupported(
            loc,
            format!("embedded `{}` entity; store its id instead", inner.type_tag()),
        )),
        (FieldKind::Scalar(_) | FieldKind::Ref, Value::Scalar(s)) => {
            if !kind.element().accepts(s) {
                return Err(mismatch());
            }
            Ok(Some(Node::Dataset(scalar_dataset(s, encoding, loc)?)))
        }
        (FieldKind::Vector(elem, n), Value::List(items)) => {
            if items.len() != n {
                return Err(CodecError::unsupported(
                    loc,
                    format!("expected {n} elements, found {}", items.len()),
                ));
            }
            encode_sequence(elem, items, encoding, loc)
        }
        (FieldKind::List(elem), Value::List(items)) => encode_sequence(elem, items, encoding, loc),
        (FieldKind::Map(elem), Value::Map(pairs)) => {
            encode_mapping(elem, pairs, encoding, loc).map(|g| Some(Node::Group(g)))
        }
        _ => Err(mismatch()),
    }
}

fn encode_sequence(
    elem: ScalarKind,
    items: &[Option<Scalar>],
    encoding: TextEncoding,
    loc: &Location,
) -> Result<Option<Node>> {
    for item in items.iter().flatten() {
        if !elem.accepts(item) {
            return Err(CodecError::unsupported(
                loc,
                format!("expected {} elements, found {}", elem.name(), item.kind_name()),
            ));
        }
    }

    if items.is_empty() {
        return Ok(Some(Node::Dataset(Dataset::array(ArrayData::empty(dtype_of(elem))))));
    }
    let present: Vec<&Scalar> = items.iter().flatten().collect();
    if present.is_empty() {
        return Ok(None);
    }
    if present.len() == items.len() {
        if let Some(data) = scalars_to_array(&present, encoding, loc)? {
            return Ok(Some(Node::Dataset(Dataset::array(data))));
        }
    }
    Ok(Some(Node::Group(positional_group(elem, items, encoding, loc)?)))
}

fn positional_group(
    elem: ScalarKind,
    items: &[Option<Scalar>],
    encoding: TextEncoding,
    loc: &Location,
) -> Result<Group> {
    let mut group = Group::new();
    group.set_attr(TYPE_ATTR, LIST_TAG);
    for (i, item) in items.iter().enumerate() {
        let ds = match item {
            Some(s) => scalar_dataset(s, encoding, loc)?,
            None if elem.is_numeric() => Dataset::scalar_float(f64::NAN),
            None => Dataset::null(),
        };
        group
            .create_dataset(&i.to_string(), ds)
            .map_err(|e| CodecError::container(loc, e))?;
    }
    Ok(group)
}

fn encode_mapping(
    elem: ScalarKind,
    pairs: &[(String, Scalar)],
    encoding: TextEncoding,
    loc: &Location,
) -> Result<Group> {
    let mut group = Group::new();
    group.set_attr(TYPE_ATTR, DICT_TAG);

    let keys = pairs
        .iter()
        .map(|(k, _)| encode_text(k, encoding, loc))
        .collect::<Result<Vec<_>>>()?;
    let values: Vec<Option<Scalar>> = pairs.iter().map(|(_, v)| Some(v.clone())).collect();
    let values = match encode_sequence(elem, &values, encoding, loc)? {
        Some(node) => node,
        None => Node::Dataset(Dataset::array(ArrayData::empty(dtype_of(elem)))),
    };

    let wrap = |e| CodecError::container(loc, e);
    group
        .create_dataset("keys", Dataset::array(ArrayData::Bytes(keys)))
        .map_err(wrap)?;
    match values {
        Node::Dataset(ds) => group.create_dataset("values", ds).map_err(wrap)?,
        Node::Group(g) => *group.create_group("values").map_err(wrap)? = g,
    }
    Ok(group)
}

// ============================================================================
// Decode
// ============================================================================

/// Rebuild one instance from its group and run the type's finalize hook.
pub fn decode_entity(schema: &CardSchema, group: &Group, encoding: TextEncoding, loc: &Location) -> Result<Entity> {
    if let Some(tag) = group.attr_str(TYPE_ATTR) {
        if tag != schema.tag() {
            return Err(CodecError::malformed(
                loc,
                format!("instance is tagged `{tag}`, expected `{}`", schema.tag()),
            ));
        }
    }

    let mut entity = schema.construct();
    for (name, node) in group.children() {
        if schema.is_excluded(name) {
            continue;
        }
        let at = loc.with_attribute(name);
        let spec = schema
            .field_spec(name)
            .ok_or_else(|| CodecError::malformed(&at, "attribute is not declared for this type"))?;
        let value = decode_value(spec.kind, node, encoding, &at)?;
        entity.set(name, value);
    }
    schema.finalize(&mut entity);
    Ok(entity)
}

pub fn decode_value(kind: FieldKind, node: &Node, encoding: TextEncoding, loc: &Location) -> Result<Value> {
    match (kind, node) {
        (FieldKind::Scalar(_) | FieldKind::Ref, Node::Dataset(ds)) => {
            if !ds.is_scalar() {
                return Err(CodecError::malformed(loc, format!("expected a scalar {kind}")));
            }
            let s = read_element(kind.element(), ds, 0, encoding, loc)?;
            Ok(Value::Scalar(s))
        }
        (FieldKind::Vector(elem, _) | FieldKind::List(elem), Node::Dataset(ds)) => {
            if ds.ndim() != 1 {
                return Err(CodecError::malformed(loc, "expected a 1-D array"));
            }
            let items = (0..ds.len())
                .map(|i| read_element(elem, ds, i, encoding, loc).map(Some))
                .collect::<Result<Vec<_>>>()?;
            check_width(kind, items.len(), loc)?;
            Ok(Value::List(items))
        }
        (FieldKind::Vector(elem, _) | FieldKind::List(elem), Node::Group(g))
            if g.attr_str(TYPE_ATTR) == Some(LIST_TAG) =>
        {
            let items = decode_positional(elem, g, encoding, loc)?;
            check_width(kind, items.len(), loc)?;
            Ok(Value::List(items))
        }
        (FieldKind::Map(elem), Node::Group(g)) if g.attr_str(TYPE_ATTR) == Some(DICT_TAG) => {
            decode_mapping(elem, g, encoding, loc)
        }
        (_, Node::Group(_)) => Err(CodecError::malformed(loc, format!("group does not hold a {kind}"))),
        (_, Node::Dataset(_)) => Err(CodecError::malformed(loc, format!("dataset does not hold a {kind}"))),
    }
}

fn check_width(kind: FieldKind, len: usize, loc: &Location) -> Result<()> {
    match kind {
        FieldKind::Vector(_, n) if n != len => Err(CodecError::malformed(
            loc,
            format!("expected {n} elements, found {len}"),
        )),
        _ => Ok(()),
    }
}

pub(crate) fn read_element(kind: ScalarKind, ds: &Dataset, index: usize, encoding: TextEncoding, loc: &Location) -> Result<Scalar> {
    let element = ds
        .element(index)
        .ok_or_else(|| CodecError::malformed(loc, format!("missing element {index}")))?;
    let value = element_scalar(element, encoding, loc)?;
    if !kind.accepts(&value) {
        return Err(CodecError::malformed(
            loc,
            format!("stored {} where {} was declared", ds.dtype().name(), kind.name()),
        ));
    }
    Ok(value)
}

/// Children "0".."n-1" of a positional group, in index order.
fn decode_positional(
    elem: ScalarKind,
    group: &Group,
    encoding: TextEncoding,
    loc: &Location,
) -> Result<Vec<Option<Scalar>>> {
    let mut items = Vec::with_capacity(group.len());
    for i in 0..group.len() {
        let name = i.to_string();
        let ds = match group.get(&name) {
            Some(Node::Dataset(ds)) => ds,
            _ => {
                return Err(CodecError::malformed(
                    loc,
                    format!("positional group has no element {name}"),
                ))
            }
        };
        let item = if ds.is_null() {
            None
        } else if !ds.is_scalar() {
            return Err(CodecError::malformed(loc, format!("element {name} is not a scalar")));
        } else {
            match ds.element(0) {
                Some(Element::Float(v)) if v.is_nan() && elem.is_numeric() => None,
                _ => Some(read_element(elem, ds, 0, encoding, loc)?),
            }
        };
        items.push(item);
    }
    Ok(items)
}

fn decode_mapping(elem: ScalarKind, group: &Group, encoding: TextEncoding, loc: &Location) -> Result<Value> {
    let keys = group
        .dataset("keys")
        .map_err(|e| CodecError::container(loc, e))?;
    let keys = keys
        .as_bytes()
        .ok_or_else(|| CodecError::malformed(loc, "mapping keys must be text"))?
        .iter()
        .map(|k| decode_text(k, encoding, loc))
        .collect::<Result<Vec<_>>>()?;

    let values_node = group
        .get("values")
        .ok_or_else(|| CodecError::malformed(loc, "mapping has no values"))?;
    let values = match decode_value(FieldKind::List(elem), values_node, encoding, loc)? {
        Value::List(items) => items,
        _ => return Err(CodecError::malformed(loc, "mapping values must be a sequence")),
    };
    if keys.len() != values.len() {
        return Err(CodecError::malformed(
            loc,
            format!("{} keys but {} values", keys.len(), values.len()),
        ));
    }

    let pairs = keys
        .into_iter()
        .zip(values)
        .map(|(k, v)| {
            v.map(|v| (k, v))
                .ok_or_else(|| CodecError::malformed(loc, "mapping values cannot be absent"))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Value::Map(pairs))
}
