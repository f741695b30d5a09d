use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

const BUNDLE: &str = r#"
undo_limit: 10
editors:
  - name: Favorites
    properties:
      - {name: best, type: xref, targets: Pets}
collections:
  - name: Pets
    entities:
      - name: Cat
        properties:
          - {name: lives, type: int, default: 9, min: 0, max: 9}
      - name: Dog
        properties:
          - {name: good, type: bool, default: true}
  - name: People
    entities:
      - name: Person
        properties:
          - {name: pet, type: xref, targets: Pets}
"#;

fn write_bundle(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("bundle.yml");
    fs::write(&path, BUNDLE).expect("failed to write bundle");
    path
}

fn write_document(dir: &TempDir, document: serde_json::Value) -> PathBuf {
    let path = dir.path().join("data.json");
    fs::write(&path, serde_json::to_string_pretty(&document).unwrap())
        .expect("failed to write document");
    path
}

fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_entity-maker"))
        .args(args)
        .output()
        .expect("failed to run entity-maker")
}

fn arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

#[test]
fn validate_reports_registered_entries() {
    let dir = TempDir::new().unwrap();
    let bundle = write_bundle(&dir);

    let output = run(&["validate", arg(&bundle)]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("2 collection(s), 1 editor(s), 4 entity type(s)"), "{stdout}");
}

#[test]
fn validate_warns_about_unknown_targets() {
    let dir = TempDir::new().unwrap();
    let bundle = dir.path().join("bundle.json");
    fs::write(
        &bundle,
        r#"{"editors": [{"name": "Owner", "properties": [{"name": "pet", "type": "xref", "targets": "Pets"}]}]}"#,
    )
    .unwrap();

    let output = run(&["validate", arg(&bundle)]);
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Owner.pet references unknown target 'Pets'"), "{stderr}");
}

#[test]
fn validate_rejects_malformed_bundle() {
    let dir = TempDir::new().unwrap();
    let bundle = dir.path().join("bundle.yml");
    fs::write(
        &bundle,
        "collections:\n  - name: Pets\n    entities:\n      - name: Cat\n        properties:\n          - {name: lives, type: int}\n",
    )
    .unwrap();

    let output = run(&["validate", arg(&bundle)]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("error: Failed to load bundle"));
}

#[test]
fn validate_missing_bundle_fails() {
    let dir = TempDir::new().unwrap();
    let output = run(&["validate", arg(&dir.path().join("missing.yml"))]);
    assert_eq!(output.status.code(), Some(1));
}

// ---------------------------------------------------------------------------
// defaults
// ---------------------------------------------------------------------------

#[test]
fn defaults_prints_json_record() {
    let dir = TempDir::new().unwrap();
    let bundle = write_bundle(&dir);

    let output = run(&["defaults", arg(&bundle), "Cat", "--name", "Tom"]);
    assert!(output.status.success());
    let record: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(record, serde_json::json!({"name": "Tom", "type": "Cat", "lives": 9}));
}

#[test]
fn defaults_prints_yaml_record() {
    let dir = TempDir::new().unwrap();
    let bundle = write_bundle(&dir);

    let output = run(&["defaults", arg(&bundle), "Favorites", "--format", "yaml"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("type: Favorites"), "{stdout}");
    assert!(stdout.contains("best: null"), "{stdout}");
}

#[test]
fn defaults_unknown_type_fails() {
    let dir = TempDir::new().unwrap();
    let bundle = write_bundle(&dir);

    let output = run(&["defaults", arg(&bundle), "Fish"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Unknown entity type 'Fish'"));
}

// ---------------------------------------------------------------------------
// check
// ---------------------------------------------------------------------------

#[test]
fn check_normalizes_document() {
    let dir = TempDir::new().unwrap();
    let bundle = write_bundle(&dir);
    let document = write_document(
        &dir,
        serde_json::json!({
            "Pets": [
                {"name": "Tom", "type": "Cat", "lives": "3.7"},
                {"name": "Nemo", "type": "Fish"},
            ],
        }),
    );
    let normalized = dir.path().join("out/normalized.json");

    let output = run(&["check", arg(&bundle), arg(&document), "--output", arg(&normalized)]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(
        read_json(&normalized),
        serde_json::json!({
            "Pets": [{"name": "Tom", "type": "Cat", "lives": 4}],
            "People": [],
            "Favorites": {"type": "Favorites", "best": null},
        })
    );
}

#[test]
fn check_prints_to_stdout() {
    let dir = TempDir::new().unwrap();
    let bundle = write_bundle(&dir);
    let document = write_document(&dir, serde_json::json!({}));

    let output = run(&["check", arg(&bundle), arg(&document)]);
    assert!(output.status.success());
    let printed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(printed["Pets"], serde_json::json!([]));
}

// ---------------------------------------------------------------------------
// rename
// ---------------------------------------------------------------------------

fn pets_document(dir: &TempDir) -> PathBuf {
    write_document(
        dir,
        serde_json::json!({
            "Pets": [
                {"name": "Tom", "type": "Cat", "lives": 9},
                {"name": "Rex", "type": "Dog", "good": true},
            ],
            "People": [{"name": "Alice", "type": "Person", "pet": "Tom"}],
            "Favorites": {"type": "Favorites", "best": "Tom"},
        }),
    )
}

#[test]
fn rename_updates_references() {
    let dir = TempDir::new().unwrap();
    let bundle = write_bundle(&dir);
    let document = pets_document(&dir);

    let output = run(&["rename", arg(&bundle), arg(&document), "Tom", "Thomas"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let updated = read_json(&document);
    assert_eq!(updated["Pets"][0]["name"], "Thomas");
    assert_eq!(updated["People"][0]["pet"], "Thomas");
    assert_eq!(updated["Favorites"]["best"], "Thomas");
}

#[test]
fn rename_rejects_duplicate_name() {
    let dir = TempDir::new().unwrap();
    let bundle = write_bundle(&dir);
    let document = pets_document(&dir);
    let before = fs::read_to_string(&document).unwrap();

    let output = run(&["rename", arg(&bundle), arg(&document), "Tom", "Rex"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("duplicate name"));
    assert_eq!(fs::read_to_string(&document).unwrap(), before);
}

#[test]
fn rename_unknown_record_fails() {
    let dir = TempDir::new().unwrap();
    let bundle = write_bundle(&dir);
    let document = pets_document(&dir);

    let output = run(&["rename", arg(&bundle), arg(&document), "Garfield", "Odie"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("No record named 'Garfield'"));
}
