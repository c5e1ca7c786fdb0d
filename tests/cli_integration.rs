use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const CHANNELS: [&str; 6] = [
    "lp-unknown",
    "lp-linestring",
    "lp-polygon",
    "lp-both",
    "lp-no-tags",
    "lp-error",
];

fn sample_rules() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("rules")
}

fn write_rules(dir: &Path, polygon: &str) {
    std::fs::write(dir.join("polygon-tags"), polygon).unwrap();
    std::fs::write(dir.join("linestring-tags"), "highway\n").unwrap();
    std::fs::write(dir.join("meta-tags"), "source\n").unwrap();
    std::fs::write(dir.join("neutral-tags"), "name\n").unwrap();
    std::fs::write(dir.join("import-tags"), "tiger:*\n").unwrap();
}

fn empty_input(dir: &Path) -> PathBuf {
    let path = dir.join("empty.osm.pbf");
    std::fs::write(&path, b"").unwrap();
    path
}

fn run(args: &[&Path]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_lpclass"))
        .args(args)
        .output()
        .expect("failed to execute process")
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn empty_input_writes_six_empty_channels() {
    let dir = tempfile::tempdir().unwrap();
    let input = empty_input(dir.path());
    let out = dir.path().join("out");

    let output = run(&[
        &input,
        Path::new("-e"),
        &sample_rules(),
        Path::new("-o"),
        &out,
    ]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.starts_with("Statistics:\n"));
    assert!(stdout.contains("  non-closed: 0\n"));
    assert!(stdout.contains("  closed:     0 (100%)\n"));
    assert!(stdout.contains("    no tags:    0 (0%)\n"));
    assert!(stdout.ends_with("Keys:\n"));

    for stem in CHANNELS {
        let path = out.join(format!("{stem}.geojsonl"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "", "{path:?}");
    }
}

#[test]
fn geojson_format_writes_empty_collections() {
    let dir = tempfile::tempdir().unwrap();
    let input = empty_input(dir.path());

    let output = run(&[
        &input,
        Path::new("-e"),
        &sample_rules(),
        Path::new("-o"),
        dir.path(),
        Path::new("--format"),
        Path::new("geojson"),
    ]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    for stem in CHANNELS {
        let content = std::fs::read_to_string(dir.path().join(format!("{stem}.geojson"))).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed["type"], "FeatureCollection");
        assert!(parsed["features"].as_array().unwrap().is_empty());
    }
}

#[test]
fn config_file_and_json_report() {
    let dir = tempfile::tempdir().unwrap();
    let input = empty_input(dir.path());
    let rules = dir.path().join("rules");
    std::fs::create_dir(&rules).unwrap();
    write_rules(&rules, "building\n");

    let config = dir.path().join("lpclass.yaml");
    std::fs::write(
        &config,
        format!(
            "expressions_dir: {}\noutput_dir: {}\nmin_key_count: 3\n",
            rules.display(),
            dir.path().join("from-config").display()
        ),
    )
    .unwrap();
    let report = dir.path().join("report.json");

    let output = run(&[
        &input,
        Path::new("--config"),
        &config,
        Path::new("--report-json"),
        &report,
    ]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(dir.path().join("from-config/lp-both.geojsonl").exists());

    let parsed: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(parsed["min_key_count"], 3);
    assert_eq!(parsed["summary"]["closed"], 0);
    assert!(parsed["keys"].as_array().unwrap().is_empty());
}

#[test]
fn geometry_pass_accepts_empty_input() {
    let dir = tempfile::tempdir().unwrap();
    let input = empty_input(dir.path());

    let output = run(&[
        &input,
        Path::new("-e"),
        &sample_rules(),
        Path::new("-o"),
        dir.path(),
        Path::new("--with-geometry"),
        Path::new("--node-cache-mode"),
        Path::new("sparse"),
    ]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
}

#[test]
fn missing_rule_file_fails_before_processing() {
    let dir = tempfile::tempdir().unwrap();
    let input = empty_input(dir.path());
    let out = dir.path().join("out");

    let output = run(&[&input, Path::new("-e"), dir.path(), Path::new("-o"), &out]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("Rules: Failed to read polygon rules"));
    assert!(!out.exists());
}

#[test]
fn malformed_rule_reports_file_and_line() {
    let dir = tempfile::tempdir().unwrap();
    let input = empty_input(dir.path());
    write_rules(dir.path(), "building\nlanduse=\n");

    let output = run(&[&input, Path::new("-e"), dir.path(), Path::new("-o"), dir.path()]);

    assert!(!output.status.success());
    let stderr = stderr(&output);
    assert!(stderr.contains("polygon-tags"));
    assert!(stderr.contains("line 2"));
}

#[test]
fn unreadable_input_is_an_input_error() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("garbage.osm.pbf");
    std::fs::write(&input, b"this is not a protobuf file at all").unwrap();

    let output = run(&[
        &input,
        Path::new("-e"),
        &sample_rules(),
        Path::new("-o"),
        dir.path(),
    ]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("Input:"));
}
