use cardstore_model::{cards, catalogue, Entity, Key, Model, Shape, Value};
use proptest::prelude::*;

#[test]
fn every_builtin_type_constructs_empty() {
    let registry = cards::registry().unwrap();
    for schema in registry.schemas() {
        let entity = registry.construct(schema.tag()).unwrap();
        assert_eq!(entity.type_tag(), schema.tag());
        assert!(entity.is_empty());
    }
}

#[test]
fn catalogue_covers_every_shape() {
    for shape in [Shape::Scalar, Shape::KeyedMap, Shape::KeyedMultimap, Shape::FlatList] {
        assert!(
            catalogue::CATALOGUE.iter().any(|c| c.shape == shape),
            "no collection uses {}",
            shape.name()
        );
    }
}

#[test]
fn multimap_keeps_card_order_under_one_id() {
    let mut model = Model::new();
    model
        .insert("spcs", Some(Key::Id(17)), Entity::new("SPC").with("conid", 17))
        .unwrap();
    model
        .insert("spcs", Some(Key::Id(17)), Entity::new("SPC1").with("conid", 17))
        .unwrap();
    model
        .insert("spcs", Some(Key::Id(17)), Entity::new("SPC").with("conid", 17).with("enforced", Value::floats([0.5])))
        .unwrap();

    let tags: Vec<&str> = model
        .group("spcs", &Key::Id(17))
        .unwrap()
        .iter()
        .map(Entity::type_tag)
        .collect();
    assert_eq!(tags, vec!["SPC", "SPC1", "SPC"]);
    assert_eq!(model.type_index().get("SPC"), &[Key::Id(17), Key::Id(17)]);
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        failure_persistence: None,
        ..ProptestConfig::default()
    })]

    #[test]
    fn index_is_insertion_order(ids in proptest::collection::hash_set(-1000i64..1000, 0..40)) {
        let ids: Vec<i64> = ids.into_iter().collect();
        let mut model = Model::new();
        for &id in &ids {
            model
                .insert("nodes", Some(Key::Id(id)), Entity::new("GRID").with("nid", id))
                .unwrap();
        }
        let expected: Vec<Key> = ids.iter().map(|&id| Key::Id(id)).collect();
        prop_assert_eq!(model.type_index().get("GRID"), expected.as_slice());
        prop_assert_eq!(model.type_tally().get("GRID"), ids.len());
        prop_assert!(model.verify_bookkeeping().is_ok());
    }
}
