//! The fixed table of model collections and their storage shapes.
//!
//! Shape is decided by collection name, never by looking at contents: two
//! collections that happen to hold similar data may still need different
//! encode/decode pairs. Table order is the order sections are written in.

use serde::Serialize;

use crate::schema::ScalarKind;
use crate::value::Key;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Shape {
    /// At most one instance.
    Scalar,
    /// Key -> one instance.
    KeyedMap,
    /// Key -> ordered list of instances.
    KeyedMultimap,
    /// Positionally addressed, no external key.
    FlatList,
}

impl Shape {
    pub fn name(self) -> &'static str {
        match self {
            Shape::Scalar => "scalar",
            Shape::KeyedMap => "keyed-map",
            Shape::KeyedMultimap => "keyed-multimap",
            Shape::FlatList => "flat-list",
        }
    }

    pub fn is_keyed(self) -> bool {
        matches!(self, Shape::KeyedMap | Shape::KeyedMultimap)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyKind {
    Id,
    Name,
}

impl KeyKind {
    pub fn accepts(self, key: &Key) -> bool {
        matches!((self, key), (KeyKind::Id, Key::Id(_)) | (KeyKind::Name, Key::Name(_)))
    }
}

/// How many type tags a collection may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TypeStrategy {
    /// One sub-group per type tag present.
    PerType,
    /// Every entry has the same type tag, recorded once on the collection
    /// group (sparse-matrix collections).
    SingleType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CollectionSpec {
    pub name: &'static str,
    pub shape: Shape,
    pub key: KeyKind,
    pub types: TypeStrategy,
}

impl CollectionSpec {
    const fn new(name: &'static str, shape: Shape, key: KeyKind, types: TypeStrategy) -> Self {
        Self {
            name,
            shape,
            key,
            types,
        }
    }

    const fn map(name: &'static str) -> Self {
        Self::new(name, Shape::KeyedMap, KeyKind::Id, TypeStrategy::PerType)
    }

    const fn named_map(name: &'static str) -> Self {
        Self::new(name, Shape::KeyedMap, KeyKind::Name, TypeStrategy::PerType)
    }

    const fn multimap(name: &'static str) -> Self {
        Self::new(name, Shape::KeyedMultimap, KeyKind::Id, TypeStrategy::PerType)
    }

    const fn named_multimap(name: &'static str) -> Self {
        Self::new(name, Shape::KeyedMultimap, KeyKind::Name, TypeStrategy::PerType)
    }

    const fn matrix(name: &'static str) -> Self {
        Self::new(name, Shape::KeyedMap, KeyKind::Name, TypeStrategy::SingleType)
    }

    const fn list(name: &'static str) -> Self {
        Self::new(name, Shape::FlatList, KeyKind::Id, TypeStrategy::PerType)
    }

    const fn scalar(name: &'static str) -> Self {
        Self::new(name, Shape::Scalar, KeyKind::Id, TypeStrategy::PerType)
    }
}

pub const CATALOGUE: &[CollectionSpec] = &[
    // geometry
    CollectionSpec::map("nodes"),
    CollectionSpec::map("spoints"),
    CollectionSpec::map("epoints"),
    CollectionSpec::map("coords"),
    // elements and properties
    CollectionSpec::map("elements"),
    CollectionSpec::map("masses"),
    CollectionSpec::map("rigid_elements"),
    CollectionSpec::map("properties"),
    CollectionSpec::map("properties_mass"),
    // materials
    CollectionSpec::map("materials"),
    CollectionSpec::map("thermal_materials"),
    CollectionSpec::map("creep_materials"),
    // constraints and loads
    CollectionSpec::multimap("spcs"),
    CollectionSpec::multimap("spcadds"),
    CollectionSpec::multimap("mpcs"),
    CollectionSpec::multimap("mpcadds"),
    CollectionSpec::multimap("loads"),
    CollectionSpec::multimap("load_combinations"),
    CollectionSpec::multimap("dloads"),
    CollectionSpec::multimap("dload_entries"),
    CollectionSpec::multimap("frequencies"),
    CollectionSpec::multimap("nsms"),
    CollectionSpec::multimap("nsmadds"),
    CollectionSpec::multimap("bcs"),
    CollectionSpec::multimap("transfer_functions"),
    CollectionSpec::map("dareas"),
    CollectionSpec::map("delays"),
    CollectionSpec::map("dphases"),
    CollectionSpec::map("tics"),
    // dynamics
    CollectionSpec::map("methods"),
    CollectionSpec::map("tables"),
    CollectionSpec::map("tables_d"),
    CollectionSpec::map("tables_m"),
    CollectionSpec::map("tsteps"),
    CollectionSpec::map("tstepnls"),
    CollectionSpec::map("nlparms"),
    CollectionSpec::map("nlpcis"),
    // optimization
    CollectionSpec::map("desvars"),
    CollectionSpec::map("ddvals"),
    CollectionSpec::map("dlinks"),
    CollectionSpec::map("dresps"),
    CollectionSpec::multimap("dconstrs"),
    CollectionSpec::map("dconadds"),
    CollectionSpec::map("dvprels"),
    CollectionSpec::map("dvcrels"),
    CollectionSpec::map("dvmrels"),
    CollectionSpec::multimap("dvgrids"),
    // aero
    CollectionSpec::map("caeros"),
    CollectionSpec::map("splines"),
    CollectionSpec::map("aesurf"),
    CollectionSpec::map("aelists"),
    CollectionSpec::map("aestats"),
    CollectionSpec::named_map("aecomps"),
    CollectionSpec::map("aefacts"),
    CollectionSpec::map("aeparams"),
    CollectionSpec::multimap("aelinks"),
    CollectionSpec::map("csschds"),
    CollectionSpec::map("flfacts"),
    CollectionSpec::map("trims"),
    CollectionSpec::map("flutters"),
    CollectionSpec::map("gusts"),
    CollectionSpec::map("divergs"),
    // plotting and sets
    CollectionSpec::map("plotels"),
    CollectionSpec::map("sets"),
    // sparse matrices
    CollectionSpec::matrix("dmigs"),
    CollectionSpec::matrix("dmijs"),
    CollectionSpec::matrix("dmijis"),
    CollectionSpec::matrix("dmiks"),
    CollectionSpec::matrix("dmis"),
    // irregular tables
    CollectionSpec::named_map("params"),
    CollectionSpec::named_multimap("usets"),
    // positional sets
    CollectionSpec::list("asets"),
    CollectionSpec::list("bsets"),
    CollectionSpec::list("csets"),
    CollectionSpec::list("qsets"),
    CollectionSpec::list("omits"),
    CollectionSpec::list("suport"),
    CollectionSpec::list("mkaeros"),
    CollectionSpec::list("monitor_points"),
    CollectionSpec::list("se_bsets"),
    CollectionSpec::list("se_csets"),
    CollectionSpec::list("se_qsets"),
    CollectionSpec::list("se_suport"),
    // singletons
    CollectionSpec::scalar("aero"),
    CollectionSpec::scalar("aeros"),
    CollectionSpec::scalar("axic"),
    CollectionSpec::scalar("axif"),
    CollectionSpec::scalar("baror"),
    CollectionSpec::scalar("beamor"),
    CollectionSpec::scalar("case_control_deck"),
    CollectionSpec::scalar("doptprm"),
    CollectionSpec::scalar("dtable"),
    CollectionSpec::scalar("grdset"),
    CollectionSpec::scalar("radset"),
    CollectionSpec::scalar("seqgp"),
];

/// Flat lists of primitives, stored as plain typed arrays.
pub const PRIMITIVE_LISTS: &[(&str, ScalarKind)] = &[
    ("duplicate_nodes", ScalarKind::Int),
    ("duplicate_properties", ScalarKind::Int),
    ("duplicate_elements", ScalarKind::Int),
    ("duplicate_thermal_materials", ScalarKind::Int),
    ("stored_parse_errors", ScalarKind::Str),
];

/// Scalar configuration values kept under `minor_attributes`.
pub const MINOR_OPTIONS: &[(&str, ScalarKind)] = &[
    ("sol", ScalarKind::Int),
    ("sol_method", ScalarKind::Str),
    ("sol_iline", ScalarKind::Int),
    ("nastran_format", ScalarKind::Str),
    ("is_msc", ScalarKind::Bool),
    ("is_nx", ScalarKind::Bool),
    ("punch", ScalarKind::Bool),
    ("is_superelements", ScalarKind::Bool),
    ("is_zona", ScalarKind::Bool),
    ("dumplines", ScalarKind::Bool),
    ("echo", ScalarKind::Bool),
    ("read_includes", ScalarKind::Bool),
    ("include_dir", ScalarKind::Str),
    ("bdf_filename", ScalarKind::Str),
    ("active_filename", ScalarKind::Str),
];

/// Verbatim text line lists kept under `minor_attributes`.
pub const LINE_LISTS: &[&str] = &[
    "case_control_lines",
    "executive_control_lines",
    "system_command_lines",
    "active_filenames",
];

pub fn collection(name: &str) -> Option<&'static CollectionSpec> {
    CATALOGUE.iter().find(|c| c.name == name)
}

pub fn classify(name: &str) -> Option<Shape> {
    collection(name).map(|c| c.shape)
}

pub fn primitive_list(name: &str) -> Option<ScalarKind> {
    PRIMITIVE_LISTS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, kind)| *kind)
}

pub fn minor_option(name: &str) -> Option<ScalarKind> {
    MINOR_OPTIONS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, kind)| *kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn names_are_unique_across_every_table() {
        let mut seen = HashSet::new();
        let all = CATALOGUE
            .iter()
            .map(|c| c.name)
            .chain(PRIMITIVE_LISTS.iter().map(|(n, _)| *n))
            .chain(LINE_LISTS.iter().copied());
        for name in all {
            assert!(seen.insert(name), "{name} listed twice");
        }
    }

    #[test]
    fn shapes_come_from_the_table() {
        assert_eq!(classify("nodes"), Some(Shape::KeyedMap));
        assert_eq!(classify("spcs"), Some(Shape::KeyedMultimap));
        assert_eq!(classify("asets"), Some(Shape::FlatList));
        assert_eq!(classify("aero"), Some(Shape::Scalar));
        assert_eq!(classify("dvgrids"), Some(Shape::KeyedMultimap));
        assert_eq!(classify("tables_m"), Some(Shape::KeyedMap));
        assert_eq!(classify("se_suport"), Some(Shape::FlatList));
        assert_eq!(classify("case_control_deck"), Some(Shape::Scalar));
        assert_eq!(classify("duplicate_nodes"), None);
        assert_eq!(primitive_list("duplicate_thermal_materials"), Some(ScalarKind::Int));
        assert_eq!(primitive_list("duplicate_nodes"), Some(ScalarKind::Int));
    }

    #[test]
    fn matrix_collections_hold_one_type() {
        for name in ["dmigs", "dmijs", "dmijis", "dmiks", "dmis"] {
            let spec = collection(name).unwrap();
            assert_eq!(spec.types, TypeStrategy::SingleType);
            assert_eq!(spec.key, KeyKind::Name);
        }
    }
}
