use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use cardstore_model::{Entity, Key, Model, ModelDump, Value};

fn cardstore_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_cardstore"))
}

fn run(args: &[&str]) -> Output {
    let output = Command::new(cardstore_bin())
        .args(args)
        .env("NO_COLOR", "1")
        .output()
        .expect("run cardstore");
    assert!(
        output.status.success(),
        "cardstore {args:?} failed:\n{}",
        String::from_utf8_lossy(&output.stderr)
    );
    output
}

fn write_model(dir: &Path) -> (PathBuf, Model) {
    let mut model = Model::new();
    model
        .insert(
            "nodes",
            Some(Key::Id(1)),
            Entity::new("GRID").with("nid", 1).with("xyz", Value::floats([0.0, 0.0, 0.0])),
        )
        .unwrap();
    model
        .insert(
            "spcs",
            Some(Key::Id(17)),
            Entity::new("SPC1")
                .with("conid", 17)
                .with("components", "123")
                .with("nodes", Value::ints([1])),
        )
        .unwrap();
    let path = dir.join("model.json");
    fs::write(&path, serde_json::to_string_pretty(&model.to_dump()).unwrap()).unwrap();
    (path, model)
}

fn s(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn pack_then_unpack_reproduces_the_dump() {
    let dir = tempfile::tempdir().unwrap();
    let (input, model) = write_model(dir.path());
    let doc = dir.path().join("model.csh5");
    let back = dir.path().join("back.json");

    run(&["pack", s(&input), "-o", s(&doc)]);
    assert!(doc.exists());
    run(&["unpack", s(&doc), "-o", s(&back)]);

    let dump: ModelDump = serde_json::from_str(&fs::read_to_string(&back).unwrap()).unwrap();
    assert_eq!(Model::from_dump(dump).unwrap(), model);
}

#[test]
fn inspect_and_stats_describe_the_document() {
    let dir = tempfile::tempdir().unwrap();
    let (input, _) = write_model(dir.path());
    let doc = dir.path().join("model.csh5");
    run(&["pack", s(&input), "-o", s(&doc)]);

    let tree = String::from_utf8(run(&["inspect", s(&doc)]).stdout).unwrap();
    assert!(tree.contains("GRID/  [layout=columnar]"));
    assert!(tree.contains("minor_attributes/"));
    assert!(tree.contains("format: CSH5 v1"));
    assert!(tree.contains("not readable by HDF5 tools"));

    let stats = String::from_utf8(run(&["stats", s(&doc), "--json"]).stdout).unwrap();
    let stats: serde_json::Value = serde_json::from_str(&stats).unwrap();
    assert_eq!(stats["entities"], 2);
    assert_eq!(stats["encoding"], "utf-8");
}

#[test]
fn pack_honours_the_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let (input, _) = write_model(dir.path());
    let config = dir.path().join("codec.json");
    fs::write(&config, r#"{"columnar": false, "encoding": "ascii"}"#).unwrap();
    let doc = dir.path().join("model.csh5");

    run(&["pack", s(&input), "-o", s(&doc), "--config", s(&config)]);
    let tree = String::from_utf8(run(&["inspect", s(&doc)]).stdout).unwrap();
    assert!(tree.contains("GRID/  [layout=generic]"));

    let stats = String::from_utf8(run(&["stats", s(&doc), "--json"]).stdout).unwrap();
    assert!(stats.contains("\"ascii\""));
}

#[test]
fn cards_lists_the_registry() {
    let out = String::from_utf8(run(&["cards"]).stdout).unwrap();
    assert!(out.lines().any(|l| l.starts_with("GRID") && l.contains("columnar")));
    let grid = String::from_utf8(run(&["cards", "--tag", "GRID"]).stdout).unwrap();
    assert!(grid.contains("xyz"));
}

#[test]
fn unknown_card_tag_fails() {
    let output = Command::new(cardstore_bin())
        .args(["cards", "--tag", "CFAKE"])
        .output()
        .unwrap();
    assert!(!output.status.success());
}
