use assert_cmd::prelude::*;
use serde_json::Value;
use std::fs;
use std::process::Command;

const SMALL_GRAPH: &str = r#"{
  "nodes": [
    {"id": "a", "position": [0.0, 0.0, 0.0]},
    {"id": "b", "position": [5.0, 0.0, 0.0]},
    {"id": "c", "position": [0.0, 5.0, 0.0], "isPinned": true}
  ],
  "edges": [
    {"id": "ab", "source": "a", "target": "b"}
  ]
}"#;

fn write_graph(dir: &tempfile::TempDir, text: &str) -> std::path::PathBuf {
    let path = dir.path().join("graph.json");
    fs::write(&path, text).expect("write graph");
    path
}

fn run_json(args: &[&str]) -> Value {
    let exe = assert_cmd::cargo_bin!("trellis-cli");
    let output = Command::new(exe).args(args).assert().success().get_output().clone();
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

#[test]
fn select_reports_the_winning_rule() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let path = write_graph(&tmp, SMALL_GRAPH);
    let out = run_json(&["select", path.to_string_lossy().as_ref()]);
    assert_eq!(out["strategy"], "circular");
    assert_eq!(out["reason"], "small-graph");
    assert_eq!(out["metrics"]["nodeCount"], 3);
}

#[test]
fn metrics_include_complexity_and_mode() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let path = write_graph(&tmp, SMALL_GRAPH);
    let out = run_json(&["metrics", "--pretty", path.to_string_lossy().as_ref()]);
    assert_eq!(out["metrics"]["edgeCount"], 1);
    assert_eq!(out["mode"], "standard");
    assert!(out["complexity"].as_f64().unwrap() > 0.0);
}

#[test]
fn layout_places_free_nodes_and_keeps_pinned_ones() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let path = write_graph(&tmp, SMALL_GRAPH);
    let out = run_json(&["layout", "--strategy", "grid", path.to_string_lossy().as_ref()]);
    assert_eq!(out["strategy"], "grid");
    let nodes = out["graph"]["nodes"].as_array().unwrap();
    assert_eq!(nodes.len(), 3);
    let by_id = |id: &str| {
        nodes
            .iter()
            .find(|n| n["id"] == id)
            .map(|n| n["position"].clone())
            .unwrap()
    };
    assert_eq!(by_id("a"), serde_json::json!([-50.0, 50.0, 0.0]));
    assert_eq!(by_id("c"), serde_json::json!([0.0, 5.0, 0.0]));
}

#[test]
fn layout_reads_config_overrides() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let path = write_graph(&tmp, SMALL_GRAPH);
    let config = tmp.path().join("config.json");
    fs::write(&config, r#"{"placement": {"spacing": 10}}"#).expect("write config");
    let out = run_json(&[
        "layout",
        "--strategy",
        "grid",
        "--config",
        config.to_string_lossy().as_ref(),
        path.to_string_lossy().as_ref(),
    ]);
    let a = &out["graph"]["nodes"][0]["position"];
    assert_eq!(a, &serde_json::json!([-5.0, 5.0, 0.0]));
}

#[test]
fn unknown_strategy_is_a_usage_error() {
    let exe = assert_cmd::cargo_bin!("trellis-cli");
    Command::new(exe)
        .args(["layout", "--strategy", "spiral", "-"])
        .assert()
        .code(2);
}

#[test]
fn edges_with_missing_endpoints_are_rejected() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let path = write_graph(
        &tmp,
        r#"{"nodes": [{"id": "a"}], "edges": [{"id": "ax", "source": "a", "target": "x"}]}"#,
    );
    let exe = assert_cmd::cargo_bin!("trellis-cli");
    Command::new(exe)
        .args(["layout", path.to_string_lossy().as_ref()])
        .assert()
        .code(1);
}
