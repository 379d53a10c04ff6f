use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use assert_cmd::Command;
use tempfile::{TempDir, tempdir};

// Config keeping history inside the temp dir; the built-in trace pattern is
// left at its default so `analyze` without --trace finds nothing.
fn write_config(dir: &TempDir, extra: &str) -> PathBuf {
    let history = dir.path().join("history.json");
    let toml = format!(
        r#"
[analysis]
min_interval_s = 60

[history]
file = '{}'

{extra}
"#,
        history.display()
    );
    let path = dir.path().join("genius.toml");
    fs::write(&path, toml).unwrap();
    path
}

// 600 s print, extrusion between 0.1 and 0.9
fn trace_600s() -> String {
    let mut out = String::from("Analysis:{\"slicer\":\"demo\"}\n");
    for i in 0..=60u32 {
        let filament = match i {
            0..=5 => 0.0,
            6..=54 => f64::from(i - 5),
            _ => 49.0,
        };
        out.push_str(&format!("Progress:{},{},{}\n", f64::from(i) / 60.0, filament, i * 10));
    }
    out
}

fn write_ticks(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("ticks.csv");
    let mut f = fs::File::create(&path).unwrap();
    writeln!(f, "progress,elapsed").unwrap();
    for i in 0..=60u32 {
        writeln!(f, "{},{}", f64::from(i) / 60.0, i * 10).unwrap();
    }
    path
}

fn genius(cfg: &Path) -> Command {
    let mut cmd = Command::cargo_bin("genius").unwrap();
    cmd.arg("--config").arg(cfg);
    cmd
}

/// Analyze the fixture trace into `analysis.json` and return its path.
fn analyze_fixture(dir: &TempDir, cfg: &Path) -> PathBuf {
    let trace = dir.path().join("part.trace");
    fs::write(&trace, trace_600s()).unwrap();
    let out = dir.path().join("analysis.json");
    genius(cfg)
        .arg("analyze")
        .arg(dir.path().join("part.gcode"))
        .arg("--trace")
        .arg(&trace)
        .arg("--out")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("estimated print time: 10m00s"));
    out
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["history"], 0, "no prints recorded", "stdout")]
#[case(&["analyze"], 2, "required", "stderr")]
#[case(&["analyze", "missing.gcode"], 5, "Analysis produced no result", "stderr")]
#[case(&["replay", "nope.json", "--ticks", "nope.csv"], 1, "read analysis", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "");

    let mut cmd = genius(&cfg);
    cmd.current_dir(dir.path());
    for a in args {
        cmd.arg(a);
    }

    let assert = cmd.assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[rstest]
#[case("Progress:0.5,abc,10\n", 3, "line 1")]
#[case("", 3, "trace is empty")]
#[case("Progress:0.5,1,10\nAnalysis:[1]\n", 3, "line 2")]
fn build_map_rejects_bad_traces(#[case] trace: &str, #[case] code: i32, #[case] needle: &str) {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "");
    let input = dir.path().join("bad.trace");
    fs::write(&input, trace).unwrap();

    genius(&cfg)
        .arg("build-map")
        .arg("--input")
        .arg(&input)
        .assert()
        .code(code)
        .stderr(predicate::str::contains(needle));
}

#[test]
fn build_map_prints_a_fragment() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "");

    let out = genius(&cfg)
        .arg("build-map")
        .write_stdin(trace_600s())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let v: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(v["slicer"], "demo");
    assert_eq!(v["firstFilament"], 0.1);
    assert_eq!(v["lastFilament"], 0.9);
    assert_eq!(v["estimatedPrintTime"], 600.0);
    let progress = v["progress"].as_array().unwrap();
    assert_eq!(progress.first().unwrap()[0], 0.0);
    assert_eq!(progress.last().unwrap()[0], 1.0);
}

#[test]
fn json_errors_are_structured() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "");
    let input = dir.path().join("bad.trace");
    fs::write(&input, "Progress:1,2\n").unwrap();

    genius(&cfg)
        .arg("--json")
        .arg("build-map")
        .arg("--input")
        .arg(&input)
        .assert()
        .code(3)
        .stderr(predicate::str::contains("\"reason\":\"Trace\""));
}

#[test]
fn analyze_writes_the_sidecar_by_default() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "");
    let gcode = dir.path().join("part.gcode");
    fs::write(&gcode, "G1 X0\n").unwrap();
    // default built-in pattern is `{gcode}.trace`
    fs::write(dir.path().join("part.gcode.trace"), trace_600s()).unwrap();

    let out = genius(&cfg)
        .arg("--json")
        .arg("analyze")
        .arg(&gcode)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let v: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(v["analyzers"], serde_json::json!(["builtin"]));
    assert_eq!(v["compensated"], false);

    let sidecar = dir.path().join("part.gcode.genius.json");
    let stored: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(sidecar).unwrap()).unwrap();
    assert_eq!(stored["analysisPrintTime"], 600.0);
    assert_eq!(stored["slicer"], "demo");
}

#[test]
fn failing_analyzer_is_skipped() {
    let dir = tempdir().unwrap();
    let cfg = write_config(
        &dir,
        r#"
[[analysis.analyzers]]
command = ["/definitely/not/here", "{gcode}"]
"#,
    );
    let trace = dir.path().join("part.trace");
    fs::write(&trace, trace_600s()).unwrap();

    genius(&cfg)
        .arg("analyze")
        .arg(dir.path().join("part.gcode"))
        .arg("--trace")
        .arg(&trace)
        .arg("--out")
        .arg(dir.path().join("out.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains("skipped:"));
}

#[cfg(unix)]
#[test]
fn badly_typed_analyzer_output_keeps_the_builtin_map() {
    let dir = tempdir().unwrap();
    let cfg = write_config(
        &dir,
        r#"
[[analysis.analyzers]]
command = ["echo", "{\"estimatedPrintTime\":\"soon\"}"]
"#,
    );
    let trace = dir.path().join("part.trace");
    fs::write(&trace, trace_600s()).unwrap();
    let out = dir.path().join("out.json");

    genius(&cfg)
        .arg("analyze")
        .arg(dir.path().join("part.gcode"))
        .arg("--trace")
        .arg(&trace)
        .arg("--out")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("estimated print time: 10m00s"))
        .stdout(predicate::str::contains("skipped:"));

    let stored: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out).unwrap()).unwrap();
    assert_eq!(stored["estimatedPrintTime"], 600.0);
    assert!(stored["progress"].is_array());
}

#[test]
fn replay_emits_one_json_line_per_tick() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "");
    let analysis = analyze_fixture(&dir, &cfg);
    let ticks = write_ticks(&dir);

    let out = genius(&cfg)
        .arg("--json")
        .arg("replay")
        .arg(&analysis)
        .arg("--ticks")
        .arg(&ticks)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let lines: Vec<serde_json::Value> = String::from_utf8(out)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 61);
    assert!(lines.iter().all(|l| l["source"] == "genius"));
    assert_eq!(lines.last().unwrap()["remaining"], 0.0);
}

#[test]
fn recorded_print_shows_up_in_history_and_clears() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "");
    let analysis = analyze_fixture(&dir, &cfg);
    let ticks = write_ticks(&dir);

    genius(&cfg)
        .arg("replay")
        .arg(&analysis)
        .arg("--ticks")
        .arg(&ticks)
        .arg("--actual-total")
        .arg("600")
        .arg("--record")
        .assert()
        .success()
        .stdout(predicate::str::contains("recorded in"));

    let out = genius(&cfg)
        .arg("--json")
        .arg("history")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let records: serde_json::Value = serde_json::from_slice(&out).unwrap();
    let records = records.as_array().unwrap();
    assert_eq!(records.len(), 1);
    let first = records[0]["firstFilamentPrintTime"].as_f64().unwrap();
    let last = records[0]["lastFilamentPrintTime"].as_f64().unwrap();
    assert!(first >= 60.0 && first < last && last <= 540.0, "{first} {last}");
    assert_eq!(records[0]["payload"]["time"], 600.0);

    // the next analysis reads the recorded history
    genius(&cfg)
        .arg("analyze")
        .arg(dir.path().join("part.gcode"))
        .arg("--trace")
        .arg(dir.path().join("part.trace"))
        .arg("--out")
        .arg(dir.path().join("again.json"))
        .assert()
        .success();

    genius(&cfg).arg("history").arg("--clear").assert().success();
    genius(&cfg)
        .arg("history")
        .assert()
        .success()
        .stdout(predicate::str::contains("no prints recorded"));
}

#[test]
fn replay_reports_bad_ticks_header() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "");
    let analysis = analyze_fixture(&dir, &cfg);
    let bad = dir.path().join("ticks.csv");
    fs::write(&bad, "pos,secs\n0.5,10\n").unwrap();

    genius(&cfg)
        .arg("replay")
        .arg(&analysis)
        .arg("--ticks")
        .arg(&bad)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid headers"));
}

#[test]
fn invalid_config_is_rejected() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "[logging]\nlevel = \"loud\"\n");

    genius(&cfg)
        .arg("history")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("logging.level"));
}
