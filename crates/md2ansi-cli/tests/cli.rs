//! End-to-end tests for the md2ansi binary

use std::io::Write;
use std::process::{Command, Output, Stdio};
use std::thread;
use std::time::Duration;

use md2ansi_core::MAX_INPUT_BYTES;
use pretty_assertions::assert_eq;
use tempfile::NamedTempFile;

fn md2ansi() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_md2ansi"));
    cmd.env_remove("COLUMNS").env_remove("MD2ANSI_LOG");
    cmd
}

fn markdown(content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".md")
        .tempfile()
        .expect("Failed to create temp file");
    file.write_all(content.as_bytes())
        .expect("Failed to write temp file");
    file
}

fn run_with_stdin(args: &[&str], input: &str) -> Output {
    let mut child = md2ansi()
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to start md2ansi");
    child
        .stdin
        .take()
        .expect("stdin is piped")
        .write_all(input.as_bytes())
        .expect("Failed to write stdin");
    child.wait_with_output().expect("Failed to wait for md2ansi")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn renders_file_in_color() {
    let file = markdown("# Title\n\nSome **bold** text.\n");
    let output = md2ansi()
        .args(["--width", "60"])
        .arg(file.path())
        .output()
        .unwrap();

    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("\x1b[38;5;226mTitle"));
    assert!(out.ends_with("\x1b[0m"));
}

#[test]
fn plain_output_has_no_escapes() {
    let file = markdown("# Title\n\n**bold** `code` [link](u)\n\n```rust\nfn x() {}\n```\n");
    let output = md2ansi()
        .args(["--plain", "--width", "60"])
        .arg(file.path())
        .output()
        .unwrap();

    assert!(output.status.success());
    let out = stdout(&output);
    assert!(!out.contains('\x1b'));
    assert_eq!(
        out,
        "Title\n\nbold `code` [link](u)\n\n``` rust\nfn x() {}\n```\n"
    );
}

#[test]
fn reads_standard_input() {
    let output = run_with_stdin(&["--plain"], "# From stdin\n");
    assert!(output.status.success());
    assert_eq!(stdout(&output), "From stdin\n");

    let output = run_with_stdin(&["--plain", "-"], "dash\n");
    assert_eq!(stdout(&output), "dash\n");
}

#[test]
fn multiple_files_are_separated() {
    let a = markdown("first\n");
    let b = markdown("second\n");
    let output = md2ansi()
        .arg("--plain")
        .arg(a.path())
        .arg(b.path())
        .output()
        .unwrap();

    assert!(output.status.success());
    assert_eq!(stdout(&output), "first\n\nsecond\n");
}

#[test]
fn missing_file_is_reported_and_others_still_render() {
    let good = markdown("still here\n");
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.md");

    let output = md2ansi()
        .arg("--plain")
        .arg(&missing)
        .arg(good.path())
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("not found"));
    assert_eq!(stdout(&output), "still here\n");
}

#[test]
fn oversized_file_is_rejected() {
    let file = NamedTempFile::new().unwrap();
    file.as_file().set_len(15 * 1024 * 1024).unwrap();
    assert!(15 * 1024 * 1024 > MAX_INPUT_BYTES);

    let output = md2ansi().arg(file.path()).output().unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    assert!(stderr(&output).contains("too large"));
}

#[test]
fn invalid_flag_exits_with_error() {
    let output = md2ansi().arg("--no-such-flag").output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    assert!(stderr(&output).contains("invalid option"));
}

#[test]
fn zero_width_is_rejected() {
    let output = md2ansi().args(["--width", "0"]).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn help_exits_successfully() {
    let output = md2ansi().arg("--help").output().unwrap();
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("--plain"));
    assert!(out.contains("--no-footnotes"));
}

#[test]
fn feature_flags_disable_constructs() {
    let file = markdown("| a |\n|---|\n\n- [x] done\n");
    let output = md2ansi()
        .args(["--no-tables", "--no-task-lists", "--width", "60"])
        .arg(file.path())
        .output()
        .unwrap();

    let out = stdout(&output);
    let plain: String = md2ansi_core::strip_ansi(&out).into_owned();
    assert!(plain.contains("| a |"));
    assert!(plain.contains("* [x] done"));
    assert!(!plain.contains("+---+"));
}

#[test]
fn dump_blocks_prints_json() {
    let file = markdown("# Hi\n\ntext[^a]\n\n[^a]: note\n");
    let output = md2ansi()
        .arg("--dump-blocks")
        .arg(file.path())
        .output()
        .unwrap();

    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["blocks"][0]["type"], "heading");
    assert_eq!(value["blocks"][0]["text"], "Hi");
    assert_eq!(value["blocks"][0]["line"], 1);
    assert_eq!(value["footnotes"], 1);
    assert!(value["diagnostics"].as_array().unwrap().is_empty());
}

#[test]
fn debug_flag_logs_to_stderr() {
    let file = markdown("# Hi\n");
    let output = md2ansi()
        .args(["-D", "--plain"])
        .arg(file.path())
        .output()
        .unwrap();

    assert!(output.status.success());
    assert_eq!(stdout(&output), "Hi\n");
    assert!(stderr(&output).contains("DEBUG"));
}

#[cfg(unix)]
#[test]
fn interrupt_resets_terminal_and_exits_130() {
    let mut child = md2ansi()
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to start md2ansi");
    // Held open so the process stays blocked on its read.
    let stdin = child.stdin.take();
    thread::sleep(Duration::from_millis(500));

    let status = Command::new("kill")
        .args(["-INT", &child.id().to_string()])
        .status()
        .expect("Failed to run kill");
    assert!(status.success());

    let output = child.wait_with_output().expect("Failed to wait for md2ansi");
    drop(stdin);

    assert_eq!(output.status.code(), Some(130));
    assert!(stdout(&output).ends_with("\x1b[0m"));
    assert!(stderr(&output).contains("Interrupted by user."));
}
