use cardstore_codec::{
    export_document, load_document, CodecConfig, CodecError, GroupImporter, IndexOrder, TextEncoding,
};
use cardstore_container::{Dataset, Document};
use cardstore_model::{cards, catalogue, Entity, Key, Model, RejectedLines, Scalar, TypeRegistry, Value};
use proptest::prelude::*;

fn registry() -> TypeRegistry {
    cards::registry().unwrap()
}

fn round_trip(registry: &TypeRegistry, model: &Model, config: &CodecConfig) -> Model {
    let report = export_document(registry, model, config).unwrap();
    let bytes = report.document.to_bytes().unwrap();
    let document = Document::from_bytes(&bytes).unwrap();
    load_document(registry, &document).unwrap()
}

/// One or more instances in every storage shape, plus the non-entity content.
fn full_model(registry: &TypeRegistry) -> Model {
    let mut model = Model::new();

    for (nid, cp) in [(1, Some(2)), (2, None), (3, Some(0))] {
        let mut grid = Entity::new("GRID")
            .with("nid", nid)
            .with("xyz", Value::floats([nid as f64, 0.5, -1.0]));
        if let Some(cp) = cp {
            grid.set("cp", cp);
        }
        model.insert("nodes", Some(Key::Id(nid)), grid).unwrap();
    }
    model
        .insert("nodes", Some(Key::Id(100)), Entity::new("SPOINT").with("nid", 100))
        .unwrap();
    model
        .insert(
            "coords",
            Some(Key::Id(5)),
            Entity::new("CORD2R")
                .with("cid", 5)
                .with("e1", Value::floats([0.0, 0.0, 0.0]))
                .with("e2", Value::floats([0.0, 0.0, 1.0]))
                .with("e3", Value::floats([1.0, 0.0, 0.0])),
        )
        .unwrap();
    model
        .insert(
            "elements",
            Some(Key::Id(10)),
            Entity::new("CQUAD4")
                .with("eid", 10)
                .with("pid", 1)
                .with("nids", Value::ints([1, 2, 3, 1]))
                .with("theta", 30.0),
        )
        .unwrap();
    model
        .insert(
            "elements",
            Some(Key::Id(11)),
            Entity::new("CHEXA")
                .with("eid", 11)
                .with("pid", 2)
                .with("nids", Value::ints([1, 2, 3, 4, 5, 6, 7, 8])),
        )
        .unwrap();
    model
        .insert(
            "properties",
            Some(Key::Id(1)),
            Entity::new("PSHELL")
                .with("pid", 1)
                .with("mid1", 1)
                .with("t", 0.1)
                .with("twelve_it3", 1.0)
                .with("tst", 0.833333)
                .with("nsm", 0.0),
        )
        .unwrap();
    model
        .insert(
            "properties",
            Some(Key::Id(3)),
            Entity::new("PCOMP")
                .with("pid", 3)
                .with("nsm", 0.0)
                .with("sb", 0.0)
                .with("tref", 0.0)
                .with("ge", 0.0)
                .with("mids", Value::ints([1, 1]))
                .with("thicknesses", Value::floats([0.1, 0.2]))
                .with("thetas", Value::floats([0.0, 90.0]))
                .with("souts", Value::strs(["YES", "NO"])),
        )
        .unwrap();
    model
        .insert(
            "materials",
            Some(Key::Id(1)),
            Entity::new("MAT1").with("mid", 1).with("e", 7.0e10).with("nu", 0.33),
        )
        .unwrap();

    model
        .insert(
            "spcs",
            Some(Key::Id(17)),
            Entity::new("SPC1")
                .with("conid", 17)
                .with("components", "123456")
                .with("nodes", Value::ints([1, 2])),
        )
        .unwrap();
    model
        .insert(
            "spcs",
            Some(Key::Id(17)),
            Entity::new("SPC")
                .with("conid", 17)
                .with("nodes", Value::ints([3]))
                .with("components", Value::strs(["3"]))
                .with("enforced", Value::floats([0.01])),
        )
        .unwrap();
    model
        .insert(
            "spcs",
            Some(Key::Id(3)),
            Entity::new("SPC1")
                .with("conid", 3)
                .with("components", "1")
                .with("nodes", Value::ints([3])),
        )
        .unwrap();
    model
        .insert(
            "loads",
            Some(Key::Id(2)),
            Entity::new("FORCE")
                .with("sid", 2)
                .with("node", 3)
                .with("cid", 0)
                .with("mag", 100.0)
                .with("xyz", Value::floats([0.0, 0.0, -1.0])),
        )
        .unwrap();
    model
        .insert(
            "loads",
            Some(Key::Id(2)),
            Entity::new("TEMP")
                .with("sid", 2)
                .with("temperatures", Value::Map(vec![("1".into(), Scalar::Float(20.0))])),
        )
        .unwrap();
    model
        .insert(
            "params",
            Some(Key::from("POST")),
            Entity::new("PARAM").with("key", "POST").with("values", Value::ints([-1])),
        )
        .unwrap();
    model
        .insert(
            "usets",
            Some(Key::from("SETA")),
            Entity::new("USET1")
                .with("name", "SETA")
                .with("components", "12")
                .with("ids", Value::ints([1, 2])),
        )
        .unwrap();

    let mut dmi = Entity::new("DMI")
        .with("name", "W2GJ")
        .with("form", 2)
        .with("tin", 3)
        .with("tout", 0)
        .with("nrows", 2)
        .with("ncols", 1)
        .with("gcj", Value::ints([1, 1]))
        .with("gci", Value::ints([1, 2]))
        .with("real", Value::floats([1.0, 2.0]))
        .with("complex", Value::floats([0.0, -0.5]));
    registry.resolve("DMI").unwrap().finalize(&mut dmi);
    model.insert("dmis", Some(Key::from("W2GJ")), dmi).unwrap();

    model
        .insert(
            "asets",
            None,
            Entity::new("ASET1").with("components", "123").with("ids", Value::ints([1])),
        )
        .unwrap();
    model
        .insert(
            "asets",
            None,
            Entity::new("ASET").with("ids", Value::ints([2])).with("components", Value::strs(["3"])),
        )
        .unwrap();
    model
        .insert(
            "doptprm",
            None,
            Entity::new("DOPTPRM").with(
                "params",
                Value::Map(vec![("DESMAX".into(), Scalar::Int(30)), ("DELP".into(), Scalar::Float(0.2))]),
            ),
        )
        .unwrap();

    model
        .set_primitive_list("duplicate_nodes", vec![Scalar::Int(4)])
        .unwrap();
    model
        .set_primitive_list("stored_parse_errors", vec![Scalar::Str("bad field 3".into())])
        .unwrap();
    model.enable_card("GRID");
    model.enable_card("SPC1");

    let minor = model.minor_mut();
    minor.set_option("sol", 101i64).unwrap();
    minor.set_option("echo", false).unwrap();
    minor
        .set_lines("executive_control_lines", vec!["SOL 101".into(), "CEND".into()])
        .unwrap();
    minor.is_enddata = true;
    minor.reject_lines.push(RejectedLines {
        comment: String::new(),
        lines: vec!["CUSTOM, 1".into()],
    });
    minor.reject_cards.push(vec![Some("CUSTOM".into()), None, Some("1".into())]);
    model
}

#[test]
fn every_shape_round_trips_with_bookkeeping() {
    let registry = registry();
    let model = full_model(&registry);
    let back = round_trip(&registry, &model, &CodecConfig::default());

    assert_eq!(back, model);
    assert_eq!(back.type_tally(), model.type_tally());
    assert_eq!(back.type_index(), model.type_index());
    assert_eq!(back.type_index().get("SPC1"), &[Key::Id(17), Key::Id(3)]);
    assert_eq!(back.lookup("DMI", &Key::from("W2GJ")).unwrap().get("is_complex"), Some(&Value::bool(true)));
}

#[test]
fn generic_layout_round_trips_the_same_model() {
    let registry = registry();
    let model = full_model(&registry);
    let config = CodecConfig {
        columnar: false,
        ..CodecConfig::default()
    };
    assert_eq!(round_trip(&registry, &model, &config), model);
}

#[test]
fn unset_attributes_stay_unset() {
    let registry = registry();
    let model = full_model(&registry);
    let back = round_trip(&registry, &model, &CodecConfig::default());

    let grid = back.get("nodes", &Key::Id(2)).unwrap();
    assert!(!grid.is_set("cp"));
    assert!(!grid.is_set("cd"));
    let mat = back.get("materials", &Key::Id(1)).unwrap();
    assert!(!mat.is_set("g"));
    assert!(!mat.is_set("rho"));
    assert!(!back.lookup("CQUAD4", &Key::Id(10)).unwrap().is_set("mcid"));
}

#[test]
fn mixed_absence_survives_in_order() {
    let registry = registry();
    for columnar in [true, false] {
        let mut model = Model::new();
        for (mid, e) in [(1, Some(1.5)), (2, None), (3, Some(2.25))] {
            let mut mat = Entity::new("MAT1").with("mid", mid);
            if let Some(e) = e {
                mat.set("e", e);
            }
            model.insert("materials", Some(Key::Id(mid)), mat).unwrap();
        }
        let config = CodecConfig {
            columnar,
            ..CodecConfig::default()
        };
        let back = round_trip(&registry, &model, &config);
        let values: Vec<Option<f64>> = back.of_type("MAT1").map(|m| m.float("e")).collect();
        assert_eq!(values, vec![Some(1.5), None, Some(2.25)]);
    }
}

#[test]
fn gappy_lists_keep_their_gaps() {
    let registry = registry();
    let mut model = Model::new();
    model
        .insert(
            "loads",
            Some(Key::Id(9)),
            Entity::new("PLOAD4")
                .with("sid", 9)
                .with("eids", Value::ints([10]))
                .with(
                    "pressures",
                    Value::List(vec![Some(Scalar::Float(1.5)), None, Some(Scalar::Float(2.25))]),
                )
                .with("surf_or_line", "SURF")
                .with("line_load_dir", "NORM"),
        )
        .unwrap();
    let back = round_trip(&registry, &model, &CodecConfig::default());
    assert_eq!(back, model);
}

#[test]
fn unknown_type_aborts_the_collection() {
    let registry = registry();
    let model = full_model(&registry);
    let mut document = export_document(&registry, &model, &CodecConfig::default())
        .unwrap()
        .document;
    let fake = document
        .root_mut()
        .require_group("elements")
        .unwrap()
        .create_group("CFAKE")
        .unwrap();
    fake.set_attr("layout", "generic");
    fake.create_dataset("keys", Dataset::array(cardstore_container::ArrayData::Int(vec![99])))
        .unwrap();

    let err = load_document(&registry, &document).unwrap_err();
    assert!(matches!(err, CodecError::UnknownType { ref tag, .. } if tag == "CFAKE"));

    let mut partial = Model::new();
    let node = document.root().get("elements").unwrap();
    let spec = catalogue::collection("elements").unwrap();
    assert!(GroupImporter::new(&registry, TextEncoding::Utf8)
        .import(spec, node, &mut partial, &mut IndexOrder::new())
        .is_err());
    assert!(partial.collection("elements").is_none());
    assert!(partial.type_tally().is_empty());
}

#[test]
fn unrecognized_section_fails_the_whole_load() {
    let registry = registry();
    let model = full_model(&registry);
    let mut document = export_document(&registry, &model, &CodecConfig::default())
        .unwrap()
        .document;
    document
        .root_mut()
        .create_group("contact_pairs")
        .unwrap();

    match load_document(&registry, &document) {
        Err(CodecError::UnrecognizedSection { name }) => assert_eq!(name, "contact_pairs"),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn multimap_keeps_both_types_under_one_id() {
    let registry = registry();
    let model = full_model(&registry);
    let back = round_trip(&registry, &model, &CodecConfig::default());
    let tags: Vec<&str> = back
        .group("spcs", &Key::Id(17))
        .unwrap()
        .iter()
        .map(Entity::type_tag)
        .collect();
    assert_eq!(tags, vec!["SPC1", "SPC"]);
}

#[test]
fn empty_collections_are_omitted() {
    let registry = registry();
    let mut model = Model::new();
    model
        .insert("nodes", Some(Key::Id(1)), Entity::new("SPOINT").with("nid", 1))
        .unwrap();
    let report = export_document(&registry, &model, &CodecConfig::default()).unwrap();
    let root = report.document.root();
    assert!(root.contains("nodes"));
    assert!(!root.contains("elements"));
    assert!(!root.contains("asets"));
    assert!(!root.contains("aero"));

    let back = load_document(&registry, &report.document).unwrap();
    assert!(back.collection("elements").is_none());
    assert_eq!(back.collections().count(), 1);
}

#[test]
fn latin1_rejects_text_it_cannot_hold() {
    let registry = registry();
    let mut model = Model::new();
    model
        .insert(
            "nodes",
            Some(Key::Id(1)),
            Entity::new("GRID")
                .with("nid", 1)
                .with("xyz", Value::floats([0.0, 0.0, 0.0]))
                .with("ps", "σ"),
        )
        .unwrap();
    let config = CodecConfig {
        encoding: TextEncoding::Latin1,
        ..CodecConfig::default()
    };
    let err = export_document(&registry, &model, &config).unwrap_err();
    match err {
        CodecError::EncodingMismatch { location, encoding } => {
            assert_eq!(encoding, "latin-1");
            assert_eq!(location.to_string(), "nodes/GRID.ps");
        }
        other => panic!("unexpected {other:?}"),
    }

    model = Model::new();
    model
        .insert(
            "nodes",
            Some(Key::Id(1)),
            Entity::new("GRID")
                .with("nid", 1)
                .with("xyz", Value::floats([0.0, 0.0, 0.0]))
                .with("ps", "Température"),
        )
        .unwrap();
    let back = round_trip(&registry, &model, &config);
    assert_eq!(back.get("nodes", &Key::Id(1)).unwrap().str("ps"), Some("Température"));
}

#[test]
fn legacy_reference_sentinel_is_cleared_on_load() {
    let registry = registry();
    let mut model = Model::new();
    model
        .insert(
            "materials",
            Some(Key::Id(4)),
            Entity::new("MAT2")
                .with("mid", 4)
                .with("g", Value::floats([1.0, 0.0, 0.0, 1.0, 0.0, 0.5]))
                .with("rho", 0.0)
                .with("tref", 0.0)
                .with("ge", 0.0)
                .with("mcsid", -1),
        )
        .unwrap();
    let back = round_trip(&registry, &model, &CodecConfig::default());
    assert!(!back.get("materials", &Key::Id(4)).unwrap().is_set("mcsid"));
}

#[test]
fn interleaved_multimap_inserts_keep_type_order() {
    let registry = registry();
    let mut model = Model::new();
    for id in [1, 2, 1] {
        model.insert("spcs", Some(Key::Id(id)), spc1(id)).unwrap();
    }
    model.insert("spcs", Some(Key::Id(2)), spc(2)).unwrap();
    model.insert("spcs", Some(Key::Id(1)), spc(1)).unwrap();

    for columnar in [true, false] {
        let config = CodecConfig { columnar, ..CodecConfig::default() };
        let back = round_trip(&registry, &model, &config);
        assert_eq!(back.type_index().get("SPC1"), &[Key::Id(1), Key::Id(2), Key::Id(1)]);
        assert_eq!(back.type_index().get("SPC"), &[Key::Id(2), Key::Id(1)]);
        assert_eq!(back, model);
    }
}

#[test]
fn card_types_shared_between_collections_keep_their_order() {
    let registry = registry();
    let dconadd = |oid: i64| Entity::new("DCONADD").with("oid", oid).with("dconstrs", Value::ints([oid + 100]));
    let mut model = Model::new();
    model.insert("dconadds", Some(Key::Id(3)), dconadd(3)).unwrap();
    model.insert("dconstrs", Some(Key::Id(3)), dconadd(3)).unwrap();
    model.insert("dconadds", Some(Key::Id(1)), dconadd(1)).unwrap();

    let back = round_trip(&registry, &model, &CodecConfig::default());
    assert_eq!(back.type_index().get("DCONADD"), &[Key::Id(3), Key::Id(3), Key::Id(1)]);
    assert_eq!(back, model);
}

#[test]
fn gaps_inside_fixed_width_vectors_round_trip() {
    let registry = registry();
    let mut model = Model::new();
    let gappy = Value::List(vec![Some(Scalar::Float(1.0)), None, Some(Scalar::Float(2.0))]);
    model
        .insert("nodes", Some(Key::Id(1)), Entity::new("GRID").with("nid", 1).with("xyz", gappy.clone()))
        .unwrap();
    model
        .insert(
            "nodes",
            Some(Key::Id(2)),
            Entity::new("GRID").with("nid", 2).with("xyz", Value::floats([0.0, 0.0, 0.0])),
        )
        .unwrap();

    let report = export_document(&registry, &model, &CodecConfig::default()).unwrap();
    assert!(report.document.root().lookup("nodes/GRID/holes/xyz").is_ok());
    let back = load_document(&registry, &report.document).unwrap();
    assert_eq!(back.get("nodes", &Key::Id(1)).unwrap().get("xyz"), Some(&gappy));
    assert_eq!(back, model);
}

#[test]
fn outer_keys_without_entities_are_malformed() {
    let registry = registry();
    let mut model = Model::new();
    model
        .insert("nodes", Some(Key::Id(1)), Entity::new("SPOINT").with("nid", 1))
        .unwrap();
    let mut document = export_document(&registry, &model, &CodecConfig::default())
        .unwrap()
        .document;
    let spcs = document.root_mut().create_group("spcs").unwrap();
    spcs.create_dataset("keys", Dataset::array(cardstore_container::ArrayData::Int(vec![5])))
        .unwrap();
    spcs.create_group("5").unwrap();

    let err = load_document(&registry, &document).unwrap_err();
    match err {
        CodecError::MalformedAttribute { location, detail } => {
            assert_eq!(location.collection, "spcs");
            assert!(detail.contains("`5`"), "{detail}");
        }
        other => panic!("unexpected {other:?}"),
    }
}

/// One entity in every collection added for superelements, aero,
/// optimization, nonlinear and dynamic input.
fn extended_model() -> Model {
    let mut model = Model::new();
    let mut put = |collection: &str, key: Option<Key>, entity: Entity| model.insert(collection, key, entity).unwrap();

    put(
        "nsms",
        Some(Key::Id(10)),
        Entity::new("NSM")
            .with("sid", 10)
            .with("nsm_type", "PSHELL")
            .with("ids", Value::ints([1, 2]))
            .with("values", Value::floats([0.5, 0.25])),
    );
    put("nsmadds", Some(Key::Id(11)), Entity::new("NSMADD").with("sid", 11).with("sets", Value::ints([10])));
    put(
        "bcs",
        Some(Key::Id(7)),
        Entity::new("CONV")
            .with("eid", 7)
            .with("pconid", 3)
            .with("ta", Value::ints([100, 101])),
    );
    put(
        "transfer_functions",
        Some(Key::Id(4)),
        Entity::new("TF")
            .with("sid", 4)
            .with("nid0", 1)
            .with("c", 3)
            .with("b", Value::floats([1.0, 0.0, 0.5]))
            .with("nids", Value::ints([2]))
            .with("components", Value::ints([1]))
            .with("a", Value::floats([0.1, 0.2, 0.3])),
    );
    for (dvid, nid) in [(1, 5), (2, 5), (1, 6)] {
        put(
            "dvgrids",
            Some(Key::Id(dvid)),
            Entity::new("DVGRID")
                .with("dvid", dvid)
                .with("nid", nid)
                .with("coeff", 1.0)
                .with("dxyz", Value::floats([0.0, 0.0, 1.0])),
        );
    }
    put(
        "tables_m",
        Some(Key::Id(30)),
        Entity::new("TABLEM1")
            .with("tid", 30)
            .with("xaxis", "LINEAR")
            .with("yaxis", "LINEAR")
            .with("x", Value::floats([0.0, 100.0]))
            .with("y", Value::floats([1.0, 0.8]))
            .with("extrap", 0),
    );
    put(
        "tsteps",
        Some(Key::Id(2)),
        Entity::new("TSTEP")
            .with("sid", 2)
            .with("n", Value::ints([100]))
            .with("dt", Value::floats([0.01]))
            .with("no", Value::ints([1])),
    );
    put(
        "caeros",
        Some(Key::Id(1001)),
        Entity::new("CAERO1")
            .with("eid", 1001)
            .with("pid", 1)
            .with("nspan", 8)
            .with("nchord", 4)
            .with("igroup", 1)
            .with("p1", Value::floats([0.0, 0.0, 0.0]))
            .with("x12", 1.0)
            .with("p4", Value::floats([0.0, 5.0, 0.0]))
            .with("x43", 1.0),
    );
    put(
        "flutters",
        Some(Key::Id(5)),
        Entity::new("FLUTTER")
            .with("sid", 5)
            .with("method", "PK")
            .with("density", 1)
            .with("mach", 2)
            .with("reduced_freq_velocity", 3)
            .with("imethod", "L")
            .with("epsilon", 1.0e-3),
    );
    put(
        "aecomps",
        Some(Key::from("WING")),
        Entity::new("AECOMP")
            .with("name", "WING")
            .with("list_type", "AELIST")
            .with("lists", Value::ints([1])),
    );
    put(
        "se_bsets",
        None,
        Entity::new("SEBSET1").with("seid", 1).with("components", "123").with("ids", Value::ints([4])),
    );
    put(
        "se_suport",
        None,
        Entity::new("SESUP")
            .with("seid", 1)
            .with("nodes", Value::ints([4]))
            .with("components", Value::strs(["123456"])),
    );
    put(
        "axif",
        None,
        Entity::new("AXIF")
            .with("cid", 2)
            .with("g", 9.81)
            .with("drho", 1.0)
            .with("db", 1.0e6)
            .with("harmonics", Value::ints([0, 1, 2])),
    );
    put(
        "case_control_deck",
        None,
        Entity::new("CASE_CONTROL_DECK").with("lines", Value::strs(["SUBCASE 1", "  LOAD = 2"])),
    );
    model
        .set_primitive_list("duplicate_thermal_materials", vec![Scalar::Int(8), Scalar::Int(9)])
        .unwrap();
    model
}

#[test]
fn extended_collections_round_trip() {
    let registry = registry();
    let model = extended_model();
    let report = export_document(&registry, &model, &CodecConfig::default()).unwrap();
    let root = report.document.root();
    assert_eq!(root.group("case_control_deck").unwrap().attr_str("type"), Some("CASE_CONTROL_DECK"));
    assert!(root.lookup("dvgrids/1/DVGRID/columns/dxyz").is_ok());
    assert!(root.lookup("duplicate_thermal_materials").is_ok());

    let back = load_document(&registry, &report.document).unwrap();
    assert_eq!(back.type_index().get("DVGRID"), &[Key::Id(1), Key::Id(2), Key::Id(1)]);
    assert_eq!(back, model);
}

fn spc1(id: i64) -> Entity {
    Entity::new("SPC1")
        .with("conid", id)
        .with("components", "123")
        .with("nodes", Value::ints([id]))
}

fn spc(id: i64) -> Entity {
    Entity::new("SPC")
        .with("conid", id)
        .with("nodes", Value::ints([id]))
        .with("components", Value::strs(["1"]))
        .with("enforced", Value::floats([0.0]))
}

fn pload4(sid: i64, pressures: Vec<Option<f64>>) -> Entity {
    Entity::new("PLOAD4")
        .with("sid", sid)
        .with("eids", Value::ints([1]))
        .with("pressures", Value::List(pressures.into_iter().map(|p| p.map(Scalar::Float)).collect()))
        .with("surf_or_line", "SURF")
        .with("line_load_dir", "NORM")
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 48,
        failure_persistence: None,
        ..ProptestConfig::default()
    })]

    #[test]
    fn float_lists_with_gaps_round_trip(
        pressures in proptest::collection::vec(proptest::option::of(-1.0e6f64..1.0e6), 0..10),
    ) {
        let registry = registry();
        let mut model = Model::new();
        model.insert("loads", Some(Key::Id(1)), pload4(1, pressures.clone())).unwrap();
        let back = round_trip(&registry, &model, &CodecConfig::default());
        let loaded = &back.group("loads", &Key::Id(1)).unwrap()[0];

        let all_absent = !pressures.is_empty() && pressures.iter().all(Option::is_none);
        if all_absent {
            prop_assert!(!loaded.is_set("pressures"));
        } else {
            let expected: Vec<Option<Scalar>> = pressures.into_iter().map(|p| p.map(Scalar::Float)).collect();
            prop_assert_eq!(loaded.list("pressures"), Some(expected.as_slice()));
        }
    }

    #[test]
    fn keyed_grids_round_trip_in_insertion_order(
        rows in proptest::collection::hash_map(1i64..100_000, proptest::option::of(0i64..50), 0..40),
        columnar in any::<bool>(),
    ) {
        let registry = registry();
        let mut model = Model::new();
        for (&nid, cp) in &rows {
            let mut grid = Entity::new("GRID")
                .with("nid", nid)
                .with("xyz", Value::floats([nid as f64, 0.0, 1.0]));
            if let Some(cp) = cp {
                grid.set("cp", *cp);
            }
            model.insert("nodes", Some(Key::Id(nid)), grid).unwrap();
        }
        let config = CodecConfig { columnar, ..CodecConfig::default() };
        let back = round_trip(&registry, &model, &config);
        prop_assert_eq!(back.type_index(), model.type_index());
        prop_assert_eq!(back, model);
    }

    #[test]
    fn multimap_insert_sequences_round_trip(
        inserts in proptest::collection::vec((0u8..3, 1i64..6), 1..30),
        columnar in any::<bool>(),
    ) {
        let registry = registry();
        let mut model = Model::new();
        for (kind, id) in inserts {
            match kind {
                0 => model.insert("spcs", Some(Key::Id(id)), spc1(id)).unwrap(),
                1 => model.insert("spcs", Some(Key::Id(id)), spc(id)).unwrap(),
                _ => {
                    let mut grid = Entity::new("DVGRID")
                        .with("dvid", id)
                        .with("nid", id * 10)
                        .with("coeff", 0.5)
                        .with("dxyz", Value::List(vec![Some(Scalar::Float(1.0)), None, Some(Scalar::Float(id as f64))]));
                    if id % 2 == 0 {
                        grid.set("cid", id);
                    }
                    model.insert("dvgrids", Some(Key::Id(id)), grid).unwrap();
                }
            }
        }
        let config = CodecConfig { columnar, ..CodecConfig::default() };
        let back = round_trip(&registry, &model, &config);
        prop_assert_eq!(back.type_index(), model.type_index());
        prop_assert_eq!(back, model);
    }
}
