//! Columnar fast path for high-cardinality types.
//!
//! Row `i` of every column belongs to `keys[i]` of the enclosing type group:
//!
//! ```text
//! <TYPE>/columns/<field>   [n] or [n, width] typed array
//! <TYPE>/present/<field>   [n] bool, written only when some rows are unset
//! <TYPE>/holes/<field>     [n, width] bool, written only when some set
//!                          vector has absent elements (true = absent)
//! ```
//!
//! A field unset in every row has no column. Unset rows and absent vector
//! elements hold a filler value that is never read back.

use cardstore_container::{ArrayData, Dataset, Group, Node};
use cardstore_model::{CardSchema, Entity, FieldKind, FieldSpec, Scalar, Value};

use crate::diagnostics::Diagnostics;
use crate::error::{CodecError, Location, Result};
use crate::object::{dtype_of, encode_text, read_element};
use crate::text::TextEncoding;

pub(crate) const COLUMNS: &str = "columns";
pub(crate) const PRESENT: &str = "present";
pub(crate) const HOLES: &str = "holes";

struct Column {
    data: ArrayData,
    present: Option<Vec<bool>>,
    holes: Option<Vec<bool>>,
}

// ============================================================================
// Encode
// ============================================================================

/// Write `columns` (and `present`/`holes` if needed) for `rows` into `group`.
pub fn encode_columns(
    schema: &CardSchema,
    rows: &[&Entity],
    encoding: TextEncoding,
    loc: &Location,
    group: &mut Group,
    diagnostics: &mut Diagnostics,
) -> Result<()> {
    for entity in rows {
        if let Some((name, _)) = entity
            .attrs()
            .find(|(name, _)| !schema.is_excluded(name) && schema.field_spec(name).is_none())
        {
            return Err(CodecError::unsupported(
                &loc.with_attribute(name),
                "attribute is not declared for this type",
            ));
        }
    }

    let mut columns = Group::new();
    let mut present = Group::new();
    let mut holes = Group::new();
    for spec in schema.persisted() {
        let at = loc.with_attribute(&spec.name);
        let Some(column) = build_column(spec, rows, encoding, &at, diagnostics)? else {
            continue;
        };
        let ds = match spec.kind {
            FieldKind::Vector(_, width) => Dataset::matrix(column.data, width),
            _ => Ok(Dataset::array(column.data)),
        }
        .map_err(|e| CodecError::container(&at, e))?;
        columns
            .create_dataset(&spec.name, ds)
            .map_err(|e| CodecError::container(&at, e))?;
        if let Some(mask) = column.present {
            present
                .create_dataset(&spec.name, Dataset::array(ArrayData::Bool(mask)))
                .map_err(|e| CodecError::container(&at, e))?;
        }
        if let Some(mask) = column.holes {
            let ds = Dataset::matrix(ArrayData::Bool(mask), spec.kind.width())
                .map_err(|e| CodecError::container(&at, e))?;
            holes
                .create_dataset(&spec.name, ds)
                .map_err(|e| CodecError::container(&at, e))?;
        }
    }

    let wrap = |e| CodecError::container(loc, e);
    *group.create_group(COLUMNS).map_err(wrap)? = columns;
    if !present.is_empty() {
        *group.create_group(PRESENT).map_err(wrap)? = present;
    }
    if !holes.is_empty() {
        *group.create_group(HOLES).map_err(wrap)? = holes;
    }
    Ok(())
}

/// The flattened column plus the masks it needs. `None` when no row sets
/// the field. A vector with every element absent counts as unset.
fn build_column(
    spec: &FieldSpec,
    rows: &[&Entity],
    encoding: TextEncoding,
    loc: &Location,
    diagnostics: &mut Diagnostics,
) -> Result<Option<Column>> {
    let width = spec.kind.width();
    let mut data = ArrayData::empty(dtype_of(spec.kind.element()));
    let mut mask = Vec::with_capacity(rows.len());
    let mut holes = Vec::with_capacity(rows.len() * width);

    for entity in rows {
        let elements = match entity.get(&spec.name) {
            None => None,
            Some(value) => {
                let elements = fixed_elements(spec.kind, value, loc)?;
                if !elements.is_empty() && elements.iter().all(Option::is_none) {
                    diagnostics.push(loc.clone(), "every element is absent; attribute dropped");
                    None
                } else {
                    Some(elements)
                }
            }
        };
        match elements {
            None => {
                mask.push(false);
                for _ in 0..width {
                    push_filler(&mut data);
                    holes.push(false);
                }
            }
            Some(elements) => {
                mask.push(true);
                for element in elements {
                    match element {
                        Some(s) => push_scalar(&mut data, s, encoding, loc)?,
                        None => push_filler(&mut data),
                    }
                    holes.push(element.is_none());
                }
            }
        }
    }

    let set = mask.iter().filter(|&&m| m).count();
    if set == 0 {
        return Ok(None);
    }
    Ok(Some(Column {
        data,
        present: (set < rows.len()).then_some(mask),
        holes: holes.contains(&true).then_some(holes),
    }))
}

fn fixed_elements<'a>(kind: FieldKind, value: &'a Value, loc: &Location) -> Result<Vec<Option<&'a Scalar>>> {
    let elem = kind.element();
    match (kind, value) {
        (_, Value::Object(inner)) => Err(CodecError::unsupported(
            loc,
            format!("embedded `{}` entity; store its id instead", inner.type_tag()),
        )),
        (FieldKind::Scalar(_) | FieldKind::Ref, Value::Scalar(s)) if elem.accepts(s) => Ok(vec![Some(s)]),
        (FieldKind::Vector(_, n), Value::List(items)) if items.len() == n => items
            .iter()
            .map(|item| match item {
                Some(s) if elem.accepts(s) => Ok(Some(s)),
                Some(s) => Err(CodecError::unsupported(
                    loc,
                    format!("expected {} elements, found {}", elem.name(), s.kind_name()),
                )),
                None => Ok(None),
            })
            .collect(),
        _ => Err(CodecError::unsupported(
            loc,
            format!("expected {kind}, found {}", value.shape_name()),
        )),
    }
}

fn push_filler(data: &mut ArrayData) {
    match data {
        ArrayData::Int(v) => v.push(0),
        ArrayData::Float(v) => v.push(0.0),
        ArrayData::Bool(v) => v.push(false),
        ArrayData::Bytes(v) => v.push(Vec::new()),
    }
}

fn push_scalar(data: &mut ArrayData, value: &Scalar, encoding: TextEncoding, loc: &Location) -> Result<()> {
    match (data, value) {
        (ArrayData::Int(v), Scalar::Int(x)) => v.push(*x),
        (ArrayData::Float(v), Scalar::Float(x)) => v.push(*x),
        (ArrayData::Bool(v), Scalar::Bool(x)) => v.push(*x),
        (ArrayData::Bytes(v), Scalar::Str(x)) => v.push(encode_text(x, encoding, loc)?),
        (data, value) => {
            return Err(CodecError::unsupported(
                loc,
                format!("{} value in a {} column", value.kind_name(), data.dtype().name()),
            ))
        }
    }
    Ok(())
}

// ============================================================================
// Decode
// ============================================================================

/// Rebuild `rows` instances from the columns under `group`, finalizing each.
pub fn decode_columns(
    schema: &CardSchema,
    group: &Group,
    rows: usize,
    encoding: TextEncoding,
    loc: &Location,
) -> Result<Vec<Entity>> {
    let columns = group
        .group(COLUMNS)
        .map_err(|e| CodecError::container(loc, e))?;
    let present = mask_group(group, PRESENT, columns, loc)?;
    let holes = mask_group(group, HOLES, columns, loc)?;

    let mut entities: Vec<Entity> = (0..rows).map(|_| schema.construct()).collect();
    for (name, node) in columns.children() {
        if schema.is_excluded(name) {
            continue;
        }
        let at = loc.with_attribute(name);
        let spec = schema
            .field_spec(name)
            .ok_or_else(|| CodecError::malformed(&at, "attribute is not declared for this type"))?;
        let ds = node
            .as_dataset()
            .ok_or_else(|| CodecError::malformed(&at, "column must be a dataset"))?;

        let width = spec.kind.width();
        let expected: Vec<usize> = match spec.kind {
            FieldKind::Vector(_, n) => vec![rows, n],
            _ => vec![rows],
        };
        if ds.shape() != expected.as_slice() {
            return Err(CodecError::malformed(
                &at,
                format!("column shape {:?}, expected {:?}", ds.shape(), expected),
            ));
        }

        let mask = match present.and_then(|p| p.get(name)) {
            None => None,
            Some(Node::Dataset(m)) => match m.as_bools() {
                Some(bits) if m.ndim() == 1 && bits.len() == rows => Some(bits),
                _ => return Err(CodecError::malformed(&at, "presence mask must be bool[rows]")),
            },
            Some(Node::Group(_)) => return Err(CodecError::malformed(&at, "presence mask must be a dataset")),
        };
        let gaps = match holes.and_then(|h| h.get(name)) {
            None => None,
            Some(Node::Dataset(m)) => match m.as_bools() {
                Some(bits) if m.shape() == expected.as_slice() && matches!(spec.kind, FieldKind::Vector(..)) => {
                    Some(bits)
                }
                _ => return Err(CodecError::malformed(&at, "hole mask must be bool[rows, width]")),
            },
            Some(Node::Group(_)) => return Err(CodecError::malformed(&at, "hole mask must be a dataset")),
        };

        let elem = spec.kind.element();
        for (row, entity) in entities.iter_mut().enumerate() {
            if mask.is_some_and(|bits| !bits[row]) {
                continue;
            }
            let value = match spec.kind {
                FieldKind::Vector(..) => Value::List(
                    (0..width)
                        .map(|j| {
                            let i = row * width + j;
                            if gaps.is_some_and(|bits| bits[i]) {
                                return Ok(None);
                            }
                            read_element(elem, ds, i, encoding, &at).map(Some)
                        })
                        .collect::<Result<Vec<_>>>()?,
                ),
                _ => Value::Scalar(read_element(elem, ds, row, encoding, &at)?),
            };
            entity.set(name, value);
        }
    }

    for entity in &mut entities {
        schema.finalize(entity);
    }
    Ok(entities)
}

/// An optional group of per-field masks; every mask must name a column.
fn mask_group<'g>(group: &'g Group, name: &str, columns: &Group, loc: &Location) -> Result<Option<&'g Group>> {
    let masks = match group.get(name) {
        None => return Ok(None),
        Some(Node::Group(g)) => g,
        Some(Node::Dataset(_)) => return Err(CodecError::malformed(loc, format!("`{name}` must be a group"))),
    };
    if let Some(orphan) = masks.names().find(|field| !columns.contains(field)) {
        return Err(CodecError::malformed(
            &loc.with_attribute(orphan),
            format!("`{name}` mask without a column"),
        ));
    }
    Ok(Some(masks))
}
