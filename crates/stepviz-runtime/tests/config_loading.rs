#![forbid(unsafe_code)]

//! Loading engine configuration from disk and applying it to a workspace.
//!
//! Run:
//!   cargo test -p stepviz-runtime --features policy-config --test config_loading

use std::io::Write;

use stepviz_runtime::policy_config::CapacityMode;
use stepviz_runtime::{
    Action, ArrayCapacity, CommandError, EngineConfig, Intent, Mode, PolicyConfigError,
    RestagePolicy, StructureKind, Submitted, Workspace,
};

fn write_file(dir: &tempfile::TempDir, name: &str, body: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(body.as_bytes()).unwrap();
    path
}

#[test]
fn full_toml_file_configures_every_section() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        &dir,
        "stepviz.toml",
        r#"
[history]
max_depth = 5

[array]
capacity = "growable"

[stack]
capacity = 2

[staging]
restage = "forbid"
default_mode = "immediate"
"#,
    );
    let config = EngineConfig::load(&path).unwrap();
    assert_eq!(config.history.max_depth, 5);
    assert_eq!(config.array.capacity, CapacityMode::Growable);
    assert_eq!(config.array_capacity(), ArrayCapacity::Growable);
    assert_eq!(config.stack.capacity, Some(2));
    assert_eq!(config.staging.restage, RestagePolicy::Forbid);
    assert_eq!(config.staging.default_mode, Mode::Immediate);
}

#[test]
fn json_file_is_detected_by_extension() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        &dir,
        "engine.json",
        r#"{"array": {"capacity": "fixed", "fixed_capacity": 4}}"#,
    );
    let config = EngineConfig::load(&path).unwrap();
    assert_eq!(config.array_capacity(), ArrayCapacity::Fixed(4));
    assert_eq!(config.history.max_depth, 100);
}

#[test]
fn toml_syntax_error_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "broken.toml", "[history\nmax_depth = ");
    let err = EngineConfig::load(&path).unwrap_err();
    assert!(matches!(err, PolicyConfigError::Toml(_)));
    assert!(err.to_string().starts_with("TOML parse error"));
}

#[test]
fn unknown_enum_value_is_rejected() {
    let err = EngineConfig::from_toml_str(
        r#"
[staging]
restage = "sometimes"
"#,
    )
    .unwrap_err();
    assert!(matches!(err, PolicyConfigError::Toml(_)));
}

#[test]
fn default_mode_from_config_applies_to_intents() {
    let config = EngineConfig::from_toml_str(
        r#"
[staging]
default_mode = "immediate"
"#,
    )
    .unwrap();
    let mut ws = Workspace::new(config);
    let out = ws
        .submit(Intent::new(StructureKind::Stack, Action::Push { value: 1 }))
        .unwrap();
    assert!(matches!(out, Submitted::Committed { .. }));

    // An explicit mode still wins.
    let out = ws
        .submit(Intent::new(StructureKind::Stack, Action::Push { value: 2 }).with_mode(Mode::Step))
        .unwrap();
    assert!(matches!(out, Submitted::Staged { total: 1, .. }));
}

#[test]
fn stack_capacity_from_config_limits_pushes() {
    let config = EngineConfig::from_toml_str(
        r#"
[stack]
capacity = 1

[staging]
default_mode = "immediate"
"#,
    )
    .unwrap();
    let mut ws = Workspace::new(config);
    ws.submit(Intent::new(StructureKind::Stack, Action::Push { value: 1 }))
        .unwrap();
    let err = ws
        .submit(Intent::new(StructureKind::Stack, Action::Push { value: 2 }))
        .unwrap_err();
    assert!(matches!(err, CommandError::CapacityExceeded { capacity: 1 }));
}

#[test]
fn history_depth_from_config_evicts_oldest() {
    let config = EngineConfig::from_toml_str(
        r#"
[history]
max_depth = 2

[staging]
default_mode = "immediate"
"#,
    )
    .unwrap();
    let mut ws = Workspace::new(config);
    for value in 1..=4 {
        ws.submit(Intent::new(StructureKind::Stack, Action::Push { value }))
            .unwrap();
    }
    assert!(ws.undo().unwrap().is_ok());
    assert!(ws.undo().unwrap().is_ok());
    assert!(ws.undo().is_none());
    assert_eq!(ws.contents(StructureKind::Stack), vec![1, 2]);
}

#[test]
fn jsonl_reflects_loaded_values() {
    let config = EngineConfig::from_toml_str(
        r#"
[stack]
capacity = 16

[staging]
restage = "forbid"
"#,
    )
    .unwrap();
    let line = config.to_jsonl();
    assert!(line.contains(r#""stack_capacity":16"#));
    assert!(line.contains(r#""restage":"forbid""#));
    assert!(!line.contains('\n'));
}
