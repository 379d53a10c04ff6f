use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant};

use genius_analyzer::error::AnalyzerError;
use genius_analyzer::util::{poll_with_timeout, split_command, substitute};
use genius_analyzer::{CommandAnalyzer, CommandTemplate, TraceFileAnalyzer};
use genius_traits::Analyzer;
use rstest::rstest;

#[rstest]
#[case("a b  c", &["a", "b", "c"])]
#[case(r#"python3 analyze.py "{gcode}""#, &["python3", "analyze.py", "{gcode}"])]
#[case(r#"say 'it''s' "a \"b\"""#, &["say", "its", r#"a "b""#])]
#[case(r"one\ word", &["one word"])]
#[case(r#"x "" y"#, &["x", "", "y"])]
#[case("", &[])]
fn splits_like_a_shell(#[case] line: &str, #[case] want: &[&str]) {
    assert_eq!(split_command(line).unwrap(), want);
}

#[rstest]
#[case(r#"echo "open"#)]
#[case("echo 'open")]
#[case(r"echo trailing\")]
fn unterminated_quotes_fail(#[case] line: &str) {
    assert!(matches!(
        split_command(line),
        Err(AnalyzerError::UnterminatedQuote)
    ));
}

#[test]
fn placeholder_is_replaced_in_every_word() {
    let argv = vec!["--in={gcode}".to_owned(), "{gcode}".to_owned(), "x".to_owned()];
    assert_eq!(
        substitute(&argv, Path::new("/tmp/a b.gcode")),
        vec!["--in=/tmp/a b.gcode", "/tmp/a b.gcode", "x"]
    );
}

#[test]
fn poll_times_out() {
    let start = Instant::now();
    let err = poll_with_timeout(
        || Ok(None::<()>),
        Duration::from_millis(5),
        Duration::from_micros(200),
    )
    .expect_err("expected timeout");
    assert!(matches!(err, AnalyzerError::Timeout(_)));
    assert!(start.elapsed() >= Duration::from_millis(5));
}

#[cfg(unix)]
mod unix {
    use super::*;

    fn sh(script: &str) -> CommandAnalyzer {
        CommandAnalyzer::new(
            CommandTemplate::from_argv(vec!["sh".into(), "-c".into(), script.into()]).unwrap(),
        )
        .with_poll_interval(Duration::from_millis(5))
    }

    #[test]
    fn returns_stdout_of_successful_command() {
        let out = sh("echo 'Progress:0.5,1,10'").execute(Path::new("x.gcode")).unwrap();
        assert_eq!(out.trim(), "Progress:0.5,1,10");
    }

    #[test]
    fn passes_absolute_gcode_path() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "G1 X1").unwrap();
        let a = CommandAnalyzer::new(CommandTemplate::parse("cat {gcode}").unwrap());
        let out = a.execute(f.path()).unwrap();
        assert_eq!(out, "G1 X1\n");
        assert_eq!(a.name(), "cat {gcode}");
    }

    #[test]
    fn non_zero_exit_reports_stderr() {
        let err = sh("echo boom >&2; exit 3").execute(Path::new("x.gcode")).unwrap_err();
        match err {
            AnalyzerError::Exit { stderr, .. } => assert_eq!(stderr, "boom"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn slow_command_is_killed() {
        let start = Instant::now();
        let err = sh("sleep 5")
            .with_timeout(Duration::from_millis(100))
            .execute(Path::new("x.gcode"))
            .unwrap_err();
        assert!(matches!(err, AnalyzerError::Timeout(_)));
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn chatty_command_does_not_deadlock() {
        let out = sh("i=0; while [ $i -lt 20000 ]; do echo 0123456789abcdef; i=$((i+1)); done")
            .execute(Path::new("x.gcode"))
            .unwrap();
        assert_eq!(out.lines().count(), 20_000);
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let a = CommandAnalyzer::new(
            CommandTemplate::parse("/definitely/not/here {gcode}").unwrap(),
        );
        assert!(matches!(
            a.execute(Path::new("x.gcode")),
            Err(AnalyzerError::Spawn { .. })
        ));
        assert!(a.run(Path::new("x.gcode")).is_err());
    }
}

#[test]
fn trace_file_analyzer_reads_sidecar() {
    let dir = tempfile::tempdir().unwrap();
    let gcode = dir.path().join("part.gcode");
    std::fs::write(dir.path().join("part.gcode.trace"), "Progress:0,0,0\n").unwrap();
    let a = TraceFileAnalyzer::new("{gcode}.trace");
    assert_eq!(a.run(&gcode).unwrap(), "Progress:0,0,0\n");
    let missing = dir.path().join("other.gcode");
    let err = a.run(&missing).unwrap_err().to_string();
    assert!(err.contains("other.gcode.trace"), "{err}");
}
