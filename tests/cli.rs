#![cfg(feature = "cli")]

use std::path::{Path, PathBuf};
use std::process::Command;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("archgrid-{}-{}", name, std::process::id()));
    std::fs::create_dir_all(&dir).expect("create scratch dir");
    dir
}

fn archgrid() -> Command {
    Command::new(env!("CARGO_BIN_EXE_archgrid"))
}

#[test]
fn renders_text_to_stdout() {
    let output = archgrid()
        .args(["-i"])
        .arg(fixture("frontend_backend.json"))
        .output()
        .expect("run archgrid");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("│ Frontend │─────▶│ Backend  │"));
}

#[test]
fn renders_svg_with_forced_format() {
    let output = archgrid()
        .arg("-i")
        .arg(fixture("frontend_backend.mmd"))
        .args(["-f", "mermaid", "-e", "svg", "--theme", "dark"])
        .output()
        .expect("run archgrid");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.starts_with("<svg"));
    assert!(stdout.contains("Frontend"));
}

#[test]
fn markdown_blocks_become_numbered_outputs() {
    let dir = scratch_dir("markdown");
    let status = archgrid()
        .arg("-i")
        .arg(fixture("readme.md"))
        .arg("-o")
        .arg(dir.join("diagram.txt"))
        .status()
        .expect("run archgrid");
    assert!(status.success());
    let first = std::fs::read_to_string(dir.join("diagram-1.txt")).unwrap();
    let second = std::fs::read_to_string(dir.join("diagram-2.txt")).unwrap();
    assert!(first.contains("Client"));
    assert_eq!(first, second);
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn dumps_the_layout_as_json() {
    let dir = scratch_dir("dump");
    let dump = dir.join("layout.json");
    let status = archgrid()
        .arg("-i")
        .arg(fixture("web_stack.json"))
        .arg("-o")
        .arg(dir.join("out.txt"))
        .arg("--dump-layout")
        .arg(&dump)
        .status()
        .expect("run archgrid");
    assert!(status.success());
    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&dump).unwrap()).unwrap();
    assert_eq!(value["boxes"].as_array().map(Vec::len), Some(7));
    assert!(value["width"].as_i64().unwrap() > 0);
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn invalid_documents_fail_with_exit_code_one() {
    let dir = scratch_dir("invalid");
    let input = dir.join("bad.json");
    std::fs::write(&input, r#"{"children": [{"border": "wavy"}]}"#).unwrap();
    let output = archgrid().arg("-i").arg(&input).output().expect("run archgrid");
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("/children/0/border"));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn png_needs_an_output_path() {
    let output = archgrid()
        .arg("-i")
        .arg(fixture("frontend_backend.json"))
        .args(["-e", "png"])
        .output()
        .expect("run archgrid");
    assert_eq!(output.status.code(), Some(1));
}
