//! The `minor_attributes` section: document header plus everything in a
//! model that is not an entity.
//!
//! ```text
//! minor_attributes/
//!     encoding                 bytes scalar, plain ASCII label
//!     is_enddata               bool scalar
//!     <option>                 scalar per set option
//!     <line list>              bytes[n] per non-empty line list
//!     reject_lines/<i>/        comment (bytes scalar), lines (bytes[n])
//!     reject_cards/<i>         bytes[n]; an empty field is a blank
//! ```

use cardstore_container::{ArrayData, Dataset, Group, Node};
use cardstore_model::{catalogue, MinorAttributes, RejectedLines};

use crate::error::{CodecError, Location, Result};
use crate::object::{decode_text, element_scalar, encode_text, scalar_dataset};
use crate::text::TextEncoding;

pub const SECTION: &str = "minor_attributes";
const ENCODING: &str = "encoding";
const IS_ENDDATA: &str = "is_enddata";
const REJECT_LINES: &str = "reject_lines";
const REJECT_CARDS: &str = "reject_cards";
const COMMENT: &str = "comment";
const LINES: &str = "lines";

fn section() -> Location {
    Location::collection(SECTION)
}

fn text_array(lines: &[String], encoding: TextEncoding, loc: &Location) -> Result<Dataset> {
    let bytes = lines
        .iter()
        .map(|l| encode_text(l, encoding, loc))
        .collect::<Result<Vec<_>>>()?;
    Ok(Dataset::array(ArrayData::Bytes(bytes)))
}

fn read_text_array(node: &Node, encoding: TextEncoding, loc: &Location) -> Result<Vec<String>> {
    let ds = node
        .as_dataset()
        .ok_or_else(|| CodecError::malformed(loc, "expected a text array"))?;
    if ds.ndim() != 1 {
        return Err(CodecError::malformed(loc, "expected a 1-D text array"));
    }
    match ds.data() {
        ArrayData::Bytes(items) => items.iter().map(|b| decode_text(b, encoding, loc)).collect(),
        ArrayData::Int(items) if items.is_empty() => Ok(Vec::new()),
        other => Err(CodecError::malformed(
            loc,
            format!("expected text, found {}", other.dtype().name()),
        )),
    }
}

/// Children "0".."n-1" of `group`, in index order.
fn indexed<'g>(group: &'g Group, loc: &Location) -> Result<Vec<&'g Node>> {
    (0..group.len())
        .map(|i| {
            group
                .get(&i.to_string())
                .ok_or_else(|| CodecError::malformed(loc, format!("no entry {i}")))
        })
        .collect()
}

// ============================================================================
// Export
// ============================================================================

/// The header group: encoding, end-of-data flag, options and line lists.
pub fn write_header(minor: &MinorAttributes, encoding: TextEncoding) -> Result<Group> {
    let loc = section();
    let mut group = Group::new();
    let wrap = |at: &Location, e| CodecError::container(at, e);

    group
        .create_dataset(ENCODING, Dataset::scalar_bytes(encoding.label()))
        .map_err(|e| wrap(&loc, e))?;
    group
        .create_dataset(IS_ENDDATA, Dataset::scalar_bool(minor.is_enddata))
        .map_err(|e| wrap(&loc, e))?;
    for (name, value) in minor.options() {
        let at = loc.with_attribute(name);
        group
            .create_dataset(name, scalar_dataset(value, encoding, &at)?)
            .map_err(|e| wrap(&at, e))?;
    }
    for (name, lines) in minor.line_lists() {
        let at = loc.with_attribute(name);
        group
            .create_dataset(name, text_array(lines, encoding, &at)?)
            .map_err(|e| wrap(&at, e))?;
    }
    Ok(group)
}

/// Append the rejected content. Written last, after every collection.
pub fn write_rejects(minor: &MinorAttributes, encoding: TextEncoding, group: &mut Group) -> Result<()> {
    let loc = section();
    if !minor.reject_lines.is_empty() {
        let at = loc.with_attribute(REJECT_LINES);
        let mut blocks = Group::new();
        for (i, block) in minor.reject_lines.iter().enumerate() {
            let mut entry = Group::new();
            entry
                .create_dataset(COMMENT, Dataset::scalar_bytes(encode_text(&block.comment, encoding, &at)?))
                .map_err(|e| CodecError::container(&at, e))?;
            entry
                .create_dataset(LINES, text_array(&block.lines, encoding, &at)?)
                .map_err(|e| CodecError::container(&at, e))?;
            *blocks
                .create_group(&i.to_string())
                .map_err(|e| CodecError::container(&at, e))? = entry;
        }
        *group
            .create_group(REJECT_LINES)
            .map_err(|e| CodecError::container(&at, e))? = blocks;
    }

    if !minor.reject_cards.is_empty() {
        let at = loc.with_attribute(REJECT_CARDS);
        let mut cards = Group::new();
        for (i, fields) in minor.reject_cards.iter().enumerate() {
            let fields: Vec<String> = fields.iter().map(|f| f.clone().unwrap_or_default()).collect();
            cards
                .create_dataset(&i.to_string(), text_array(&fields, encoding, &at)?)
                .map_err(|e| CodecError::container(&at, e))?;
        }
        *group
            .create_group(REJECT_CARDS)
            .map_err(|e| CodecError::container(&at, e))? = cards;
    }
    Ok(())
}

// ============================================================================
// Import
// ============================================================================

/// The declared text encoding, read before anything else in the document.
pub fn read_encoding(group: &Group) -> Result<TextEncoding> {
    let ds = match group.get(ENCODING) {
        Some(Node::Dataset(ds)) if ds.is_scalar() => ds,
        Some(_) => {
            return Err(CodecError::malformed(
                &section().with_attribute(ENCODING),
                "encoding must be a text scalar",
            ))
        }
        None => return Err(CodecError::MissingHeader { name: ENCODING }),
    };
    let label = ds
        .as_bytes()
        .and_then(|b| b.first())
        .map(|b| String::from_utf8_lossy(b).into_owned())
        .ok_or_else(|| CodecError::malformed(&section().with_attribute(ENCODING), "encoding must be text"))?;
    label.parse()
}

/// Options, line lists and the end-of-data flag. Rejected content is left
/// for [`read_rejects`].
pub fn read_header(group: &Group, encoding: TextEncoding, minor: &mut MinorAttributes) -> Result<()> {
    let loc = section();
    for (name, node) in group.children() {
        let at = loc.with_attribute(name);
        match name {
            ENCODING | REJECT_LINES | REJECT_CARDS => {}
            IS_ENDDATA => {
                minor.is_enddata = node
                    .as_dataset()
                    .and_then(|ds| ds.as_bools())
                    .and_then(|b| b.first().copied())
                    .ok_or_else(|| CodecError::malformed(&at, "expected a bool scalar"))?;
            }
            _ if catalogue::minor_option(name).is_some() => {
                let ds = node
                    .as_dataset()
                    .filter(|ds| ds.is_scalar())
                    .ok_or_else(|| CodecError::malformed(&at, "option must be a scalar"))?;
                let element = ds
                    .element(0)
                    .ok_or_else(|| CodecError::malformed(&at, "option has no value"))?;
                let value = element_scalar(element, encoding, &at)?;
                minor.set_option(name, value).map_err(|e| CodecError::model(&at, e))?;
            }
            _ if catalogue::LINE_LISTS.contains(&name) => {
                let lines = read_text_array(node, encoding, &at)?;
                minor.set_lines(name, lines).map_err(|e| CodecError::model(&at, e))?;
            }
            _ => return Err(CodecError::malformed(&at, "not a known option or line list")),
        }
    }
    Ok(())
}

pub fn read_rejects(group: &Group, encoding: TextEncoding, minor: &mut MinorAttributes) -> Result<()> {
    let loc = section();
    if let Some(node) = group.get(REJECT_LINES) {
        let at = loc.with_attribute(REJECT_LINES);
        let blocks = node
            .as_group()
            .ok_or_else(|| CodecError::malformed(&at, "expected a group"))?;
        for entry in indexed(blocks, &at)? {
            let entry = entry
                .as_group()
                .ok_or_else(|| CodecError::malformed(&at, "rejected block must be a group"))?;
            let comment = entry
                .dataset(COMMENT)
                .map_err(|e| CodecError::container(&at, e))?
                .as_bytes()
                .and_then(|b| b.first())
                .ok_or_else(|| CodecError::malformed(&at, "comment must be text"))?;
            let lines = entry
                .get(LINES)
                .ok_or_else(|| CodecError::malformed(&at, "rejected block has no lines"))?;
            minor.reject_lines.push(RejectedLines {
                comment: decode_text(comment, encoding, &at)?,
                lines: read_text_array(lines, encoding, &at)?,
            });
        }
    }

    if let Some(node) = group.get(REJECT_CARDS) {
        let at = loc.with_attribute(REJECT_CARDS);
        let cards = node
            .as_group()
            .ok_or_else(|| CodecError::malformed(&at, "expected a group"))?;
        for card in indexed(cards, &at)? {
            let fields = read_text_array(card, encoding, &at)?
                .into_iter()
                .map(|f| (!f.is_empty()).then_some(f))
                .collect();
            minor.reject_cards.push(fields);
        }
    }
    Ok(())
}
