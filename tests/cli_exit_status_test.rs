use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const PUBLISH_ENV: [&str; 6] = [
    "DATABASE_URL",
    "USER_EMAIL",
    "DEVICE_NAME",
    "FIREBASE_ACCESS_TOKEN",
    "FIREBASE_PROJECT_ID",
    "FIREBASE_IDENTITY_URL",
];

fn combined_output(output: &Output) -> String {
    format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    )
}

fn run_publish(project: &Path) -> Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_publish_firmware"));
    command
        .current_dir(project)
        .arg("--project-dir")
        .arg(project);
    for key in PUBLISH_ENV {
        command.env_remove(key);
    }
    command.output().expect("Failed to run publish_firmware")
}

#[test]
fn test_publish_exits_with_failure_when_device_name_is_missing() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("include")).unwrap();
    fs::create_dir_all(dir.path().join("src")).unwrap();
    fs::write(
        dir.path().join("include/secret.h"),
        "#define DATABASE_URL \"http://127.0.0.1:9\"\n#define USER_EMAIL \"me@example.com\"\n",
    )
    .unwrap();
    fs::write(dir.path().join("src/main.cpp"), "void setup() {}\nvoid loop() {}\n").unwrap();

    let output = run_publish(dir.path());

    assert_eq!(output.status.code(), Some(1));
    let log = combined_output(&output);
    assert!(log.contains("DEVICE_NAME"), "output was: {}", log);
}

#[test]
fn test_publish_exits_with_failure_on_empty_project() {
    let dir = TempDir::new().unwrap();

    let output = run_publish(dir.path());

    assert_eq!(output.status.code(), Some(1));
    let log = combined_output(&output);
    assert!(log.contains("DATABASE_URL"), "output was: {}", log);
    assert!(log.contains("USER_EMAIL"), "output was: {}", log);
}

#[test]
fn test_stamp_exits_with_success_when_header_is_unwritable() {
    let dir = TempDir::new().unwrap();
    // A plain file where the include directory should be
    fs::write(dir.path().join("include"), "not a directory").unwrap();
    fs::write(dir.path().join("versioning"), "7").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_stamp_version"))
        .current_dir(dir.path())
        .arg("--project-dir")
        .arg(dir.path())
        .output()
        .expect("Failed to run stamp_version");

    assert!(output.status.success(), "output was: {}", combined_output(&output));
    assert_eq!(fs::read_to_string(dir.path().join("versioning")).unwrap(), "8");
    assert!(!dir.path().join("include/version.h").exists());
}
