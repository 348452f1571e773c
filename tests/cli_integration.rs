use std::process::Command;
use tempfile::tempdir;

fn bin() -> String {
    env!("CARGO_BIN_EXE_bsdelta").to_string()
}

#[test]
fn cli_diff_patch_roundtrip() {
    let dir = tempdir().unwrap();
    let old = dir.path().join("old.bin");
    let new = dir.path().join("new.bin");
    let patch = dir.path().join("delta.bsdelta");
    let restored = dir.path().join("restored.bin");

    std::fs::write(&old, b"abcde12345abcde12345").unwrap();
    std::fs::write(&new, b"abcdeXXXXXabcde12345!").unwrap();

    let st = Command::new(bin())
        .arg("diff")
        .arg(&old)
        .arg(&new)
        .arg(&patch)
        .status()
        .unwrap();
    assert!(st.success());

    let st = Command::new(bin())
        .arg("patch")
        .arg(&old)
        .arg(&restored)
        .arg(&patch)
        .status()
        .unwrap();
    assert!(st.success());
    assert_eq!(
        std::fs::read(&restored).unwrap(),
        std::fs::read(&new).unwrap()
    );
}

#[test]
fn cli_refuses_overwrite_without_force() {
    let dir = tempdir().unwrap();
    let old = dir.path().join("old.bin");
    let new = dir.path().join("new.bin");
    let patch = dir.path().join("delta.bsdelta");

    std::fs::write(&old, b"one").unwrap();
    std::fs::write(&new, b"two").unwrap();
    std::fs::write(&patch, b"already here").unwrap();

    let st = Command::new(bin())
        .arg("diff")
        .arg(&old)
        .arg(&new)
        .arg(&patch)
        .status()
        .unwrap();
    assert!(!st.success());
    // Preexisting content untouched.
    assert_eq!(std::fs::read(&patch).unwrap(), b"already here");

    let st = Command::new(bin())
        .arg("--force")
        .arg("diff")
        .arg(&old)
        .arg(&new)
        .arg(&patch)
        .status()
        .unwrap();
    assert!(st.success());
}

#[test]
fn cli_lcp_searcher_and_threads() {
    let dir = tempdir().unwrap();
    let old = dir.path().join("old.bin");
    let new = dir.path().join("new.bin");
    let patch = dir.path().join("delta.bsdelta");
    let restored = dir.path().join("restored.bin");

    let source: Vec<u8> = (0..=255u8).cycle().take(50_000).collect();
    let mut target = source.clone();
    target[30_000] ^= 0xFF;
    std::fs::write(&old, &source).unwrap();
    std::fs::write(&new, &target).unwrap();

    let st = Command::new(bin())
        .args(["diff", "--searcher", "lcp", "--threads", "3"])
        .arg(&old)
        .arg(&new)
        .arg(&patch)
        .status()
        .unwrap();
    assert!(st.success());

    let st = Command::new(bin())
        .arg("patch")
        .arg(&old)
        .arg(&restored)
        .arg(&patch)
        .status()
        .unwrap();
    assert!(st.success());
    assert_eq!(std::fs::read(&restored).unwrap(), target);
}

#[test]
fn cli_info_prints_header_fields() {
    let dir = tempdir().unwrap();
    let old = dir.path().join("old.bin");
    let new = dir.path().join("new.bin");
    let patch = dir.path().join("delta.bsdelta");

    std::fs::write(&old, b"aaaa").unwrap();
    std::fs::write(&new, b"aaaabbbb").unwrap();

    let st = Command::new(bin())
        .arg("diff")
        .arg(&old)
        .arg(&new)
        .arg(&patch)
        .status()
        .unwrap();
    assert!(st.success());

    let out = Command::new(bin()).arg("info").arg(&patch).output().unwrap();
    assert!(out.status.success());
    let text = String::from_utf8_lossy(&out.stdout);
    assert!(text.contains("target length:      8"), "stdout: {text}");
}

#[test]
fn cli_info_rejects_non_patch() {
    let dir = tempdir().unwrap();
    let bogus = dir.path().join("bogus.bin");
    std::fs::write(&bogus, b"definitely not a patch file").unwrap();

    let st = Command::new(bin()).arg("info").arg(&bogus).status().unwrap();
    assert!(!st.success());
}

#[test]
fn cli_patch_rejects_corrupt_input() {
    let dir = tempdir().unwrap();
    let old = dir.path().join("old.bin");
    let out = dir.path().join("out.bin");
    let bogus = dir.path().join("bogus.bsdelta");
    std::fs::write(&old, b"source").unwrap();
    std::fs::write(&bogus, b"garbage").unwrap();

    let st = Command::new(bin())
        .arg("patch")
        .arg(&old)
        .arg(&out)
        .arg(&bogus)
        .status()
        .unwrap();
    assert!(!st.success());
}

#[test]
fn cli_json_stats() {
    let dir = tempdir().unwrap();
    let old = dir.path().join("old.bin");
    let new = dir.path().join("new.bin");
    let patch = dir.path().join("delta.bsdelta");

    std::fs::write(&old, b"json test source").unwrap();
    std::fs::write(&new, b"json test target").unwrap();

    let out = Command::new(bin())
        .arg("--json")
        .arg("diff")
        .arg(&old)
        .arg(&new)
        .arg(&patch)
        .output()
        .unwrap();
    assert!(out.status.success());
    let text = String::from_utf8_lossy(&out.stderr);
    assert!(text.contains("\"command\": \"diff\""), "stderr: {text}");
    assert!(text.contains("\"patch_size\""), "stderr: {text}");
}
