mod common;

use std::fs;

use common::{broken_zip_bytes, good_zip_bytes, test_config, write_zip, zip_bytes};
use lpad_common::{InstalledPayload, LpadError, Version};
use lpad_core::Installer;

fn setup() -> (tempfile::TempDir, tempfile::TempDir, InstalledPayload, Installer) {
    let launcher = tempfile::tempdir().unwrap();
    let install_root = tempfile::tempdir().unwrap();
    let config = test_config(launcher.path(), "http://127.0.0.1:9");
    let payload = InstalledPayload::derive(install_root.path(), &config);
    let installer = Installer::new(&config);
    (launcher, install_root, payload, installer)
}

#[tokio::test]
async fn install_extracts_records_version_and_drops_archive() {
    let (launcher, _root, payload, installer) = setup();
    let staged = launcher.path().join("Payload.zip");
    fs::write(&staged, good_zip_bytes(b"#!/bin/sh\n")).unwrap();

    installer
        .install(&staged, Version::new(1, 1, 0), &payload)
        .await
        .unwrap();

    assert!(payload.executable.is_file());
    assert_eq!(
        fs::read_to_string(payload.payload_dir.join("data/level1.bin")).unwrap(),
        "level one"
    );
    assert_eq!(fs::read_to_string(&payload.version_file).unwrap(), "1.1.0");
    assert!(!staged.exists());
    assert!(!launcher.path().join(".lpad.lock").exists());
}

#[tokio::test]
async fn update_overwrites_previous_payload_files() {
    let (launcher, _root, payload, installer) = setup();
    let staged = launcher.path().join("Payload.zip");

    write_zip(&staged, &[("Game/", b""), ("Game/run.sh", b"old")]);
    installer
        .install(&staged, Version::new(1, 0, 0), &payload)
        .await
        .unwrap();

    write_zip(&staged, &[("Game/", b""), ("Game/run.sh", b"new")]);
    installer
        .install(&staged, Version::new(1, 1, 0), &payload)
        .await
        .unwrap();

    assert_eq!(fs::read_to_string(&payload.executable).unwrap(), "new");
    assert_eq!(fs::read_to_string(&payload.version_file).unwrap(), "1.1.0");
}

#[tokio::test]
async fn failed_extraction_leaves_no_payload_behind() {
    let (launcher, _root, payload, installer) = setup();
    let staged = launcher.path().join("Payload.zip");
    fs::write(&staged, broken_zip_bytes()).unwrap();

    let err = installer
        .install(&staged, Version::new(1, 0, 0), &payload)
        .await
        .unwrap_err();

    assert!(matches!(err, LpadError::Install(_)), "got {err:?}");
    assert!(!payload.payload_dir.exists());
    assert!(!payload.version_file.exists());
    assert!(!launcher.path().join(".lpad.lock").exists());
}

#[tokio::test]
async fn failed_version_write_discards_payload() {
    let (launcher, _root, payload, installer) = setup();
    let staged = launcher.path().join("Payload.zip");
    // A directory where the version file should go makes the final rename fail.
    write_zip(
        &staged,
        &[
            ("Game/", b""),
            ("Game/run.sh", b"#!/bin/sh\n"),
            ("Game/Version.txt/", b""),
            ("Game/Version.txt/keep", b"x"),
        ],
    );

    let err = installer
        .install(&staged, Version::new(1, 0, 0), &payload)
        .await
        .unwrap_err();

    assert!(matches!(err, LpadError::Install(_)), "got {err:?}");
    assert!(!payload.payload_dir.exists());
}

#[tokio::test]
async fn archive_without_payload_dir_is_rejected() {
    let (launcher, _root, payload, installer) = setup();
    let staged = launcher.path().join("Payload.zip");
    fs::write(&staged, zip_bytes(&[("Other/readme.txt", b"hello")])).unwrap();

    let err = installer
        .install(&staged, Version::new(1, 0, 0), &payload)
        .await
        .unwrap_err();

    assert!(matches!(err, LpadError::Install(_)));
    assert!(!payload.version_file.exists());
    assert!(!payload.install_root.join("Other").exists());
    assert_eq!(fs::read_dir(&payload.install_root).unwrap().count(), 0);
    assert!(staged.exists());
}

#[tokio::test]
async fn concurrent_install_is_refused_while_locked() {
    let (launcher, _root, payload, installer) = setup();
    let staged = launcher.path().join("Payload.zip");
    fs::write(&staged, good_zip_bytes(b"#!/bin/sh\n")).unwrap();
    fs::write(launcher.path().join(".lpad.lock"), "12345\n").unwrap();

    let err = installer
        .install(&staged, Version::new(1, 0, 0), &payload)
        .await
        .unwrap_err();

    assert!(matches!(err, LpadError::Install(_)));
    assert!(staged.exists());
    assert!(!payload.payload_dir.exists());
}
