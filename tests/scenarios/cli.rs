//! Scenario: the binary's exit code follows the artifact check

use crate::helpers::*;
use labelpipe::core::ToolNames;
use std::path::Path;
use std::process::{Command, Output};

/// Config that finds tools only in `tools`
fn write_config(dir: &Path, tools: &Path) -> std::path::PathBuf {
    let path = dir.join("config.yaml");
    let yaml = format!(
        "poll_interval_ms: 10\nsearch_dirs:\n  - {}\nhost_dir_platforms: []\n",
        tools.display()
    );
    std::fs::write(&path, yaml).unwrap();
    path
}

fn labelpipe(config: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_labelpipe"))
        .arg("-c")
        .arg(config)
        .args(args)
        .current_dir(config.parent().unwrap())
        .env("RUST_LOG", "warn")
        .output()
        .unwrap()
}

fn combine(config: &Path, output: &Path) -> Output {
    labelpipe(
        config,
        &["combine", "--input-a", "a.nii", "--input-b", "b.nii", "-o", output.to_str().unwrap()],
    )
}

#[cfg(unix)]
#[test]
fn test_exit_zero_when_artifact_written() {
    let tools = tempfile::tempdir().unwrap();
    install_fake_tools(tools.path());
    let work = tempfile::tempdir().unwrap();
    let config = write_config(work.path(), tools.path());
    let output = work.path().join("ab.nii");

    let result = combine(&config, &output);

    assert_eq!(result.status.code(), Some(0), "{}", String::from_utf8_lossy(&result.stderr));
    assert!(output.exists());
}

/// The tool exits 0 but writes nothing: verification decides
#[cfg(unix)]
#[test]
fn test_exit_one_when_artifact_missing() {
    let tools = tempfile::tempdir().unwrap();
    write_script(tools.path(), &ToolNames::default().label_combine, "exit 0");
    let work = tempfile::tempdir().unwrap();
    let config = write_config(work.path(), tools.path());
    let output = work.path().join("ab.nii");

    let result = combine(&config, &output);

    assert_eq!(result.status.code(), Some(1));
    assert!(!output.exists());
}

/// A failing stage whose output still exists is not fatal
#[cfg(unix)]
#[test]
fn test_exit_zero_despite_failed_stage_when_artifact_exists() {
    let tools = tempfile::tempdir().unwrap();
    write_script(
        tools.path(),
        &ToolNames::default().label_combine,
        r#"for last; do :; done
printf 'volume' > "$last"
exit 4"#,
    );
    let work = tempfile::tempdir().unwrap();
    let config = write_config(work.path(), tools.path());

    let result = combine(&config, &work.path().join("ab.nii"));
    assert_eq!(result.status.code(), Some(0));
}

#[test]
fn test_exit_one_on_build_error() {
    let work = tempfile::tempdir().unwrap();
    let config = write_config(work.path(), work.path());

    let result = labelpipe(
        &config,
        &["register", "--moving-volume", "m.nii", "--fixed-volume", "f.nii"],
    );
    assert_eq!(result.status.code(), Some(1));
}
