use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::Value;
use std::path::PathBuf;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

fn info_json(name: &str) -> Value {
    let output = cargo_bin_cmd!("pdf-ink")
        .arg("info")
        .arg(fixture(name))
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    serde_json::from_slice(&output).expect("stdout should contain valid json")
}

#[test]
fn info_emits_stable_json_contract() {
    insta::assert_json_snapshot!(info_json("annotated.ink.json"), @r###"
    {
      "page_count": 2,
      "pages": [
        {
          "index": 0,
          "points": 3,
          "strokes": 1
        },
        {
          "index": 3,
          "points": 3,
          "strokes": 2
        }
      ],
      "stroke_count": 3,
      "version": 4
    }
    "###);
}

#[test]
fn info_accepts_bare_page_map() {
    let value = info_json("bare-map.ink.json");
    assert_eq!(value["version"], 4);
    assert_eq!(value["stroke_count"], 1);
    assert_eq!(value["pages"][0]["index"], 1);
}

#[test]
fn flatten_writes_png_per_annotated_page() {
    let temp = tempfile::tempdir().expect("temp dir should be created");

    cargo_bin_cmd!("pdf-ink")
        .arg("flatten")
        .arg(fixture("annotated.ink.json"))
        .arg("--width")
        .arg("100")
        .arg("--height")
        .arg("50")
        .arg("--scale")
        .arg("1")
        .arg("--output-dir")
        .arg(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("page-1.png").and(predicate::str::contains("page-4.png")));

    let image = image::open(temp.path().join("page-1.png")).expect("page 1 should be a png");
    assert_eq!((image.width(), image.height()), (100, 50));
    assert!(temp.path().join("page-4.png").exists());
    assert!(!temp.path().join("page-6.png").exists(), "empty pages are not flattened");
}

#[test]
fn flatten_rejects_non_positive_size() {
    cargo_bin_cmd!("pdf-ink")
        .arg("flatten")
        .arg(fixture("annotated.ink.json"))
        .arg("--width")
        .arg("0")
        .arg("--height")
        .arg("50")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--width must be a positive number"));
}

#[test]
fn locate_resolves_mirror_layout() {
    cargo_bin_cmd!("pdf-ink")
        .args(["locate", "papers/paper.pdf", "--layout", "mirror", "--root", "/data/ink"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/data/ink/papers/paper.pdf.ink.json"));
}

#[test]
fn info_fails_for_missing_file() {
    cargo_bin_cmd!("pdf-ink")
        .arg("info")
        .arg(fixture("missing.ink.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("file does not exist"));
}

#[test]
fn info_fails_for_invalid_json() {
    cargo_bin_cmd!("pdf-ink")
        .arg("info")
        .arg(fixture("invalid.ink.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to parse annotation document"));
}

#[test]
fn version_prints_package_version() {
    cargo_bin_cmd!("pdf-ink")
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with(env!("CARGO_PKG_VERSION")));
}
