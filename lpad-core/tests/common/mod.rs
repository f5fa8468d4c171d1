#![allow(dead_code)]

use std::fs::File;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use lpad_common::config::{Config, VersionSourceKind};
use lpad_common::error::Result;
use lpad_common::{InstallLocation, Version};
use lpad_net::RemoteVersionSource;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const PAYLOAD_DIR: &str = "Game";
pub const BROKEN_MARKER: &[u8] = b"BROKEN-PAYLOAD-CONTENT-0123456789";

pub fn test_config(launcher_dir: &Path, base_url: &str) -> Config {
    Config {
        launcher_dir: launcher_dir.to_path_buf(),
        version_source: VersionSourceKind::File,
        version_url: Some(format!("{base_url}/Version.txt")),
        release_api_url: None,
        archive_url: format!("{base_url}/Payload.zip"),
        payload_dir_name: PAYLOAD_DIR.to_string(),
        executable: PathBuf::from("run.sh"),
        version_file_name: "Version.txt".to_string(),
        archive_file_name: "Payload.zip".to_string(),
        location_marker_file_name: "install_location.txt".to_string(),
        max_location_attempts: 3,
    }
}

pub fn location_for(config: &Config, root: &Path) -> InstallLocation {
    InstallLocation::new(root, config.marker_path())
}

/// Builds an uncompressed zip so entry contents appear verbatim in the bytes.
pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Stored)
        .unix_permissions(0o755);
    for (name, data) in entries {
        if name.ends_with('/') {
            zip.add_directory(*name, options).unwrap();
        } else {
            zip.start_file(*name, options).unwrap();
            zip.write_all(data).unwrap();
        }
    }
    zip.finish().unwrap().into_inner()
}

pub fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
    let mut file = File::create(path).unwrap();
    file.write_all(&zip_bytes(entries)).unwrap();
}

/// A payload archive whose second file fails its checksum on extraction.
pub fn broken_zip_bytes() -> Vec<u8> {
    let mut bytes = zip_bytes(&[
        ("Game/", b""),
        ("Game/run.sh", b"#!/bin/sh\necho hi\n"),
        ("Game/data/level1.bin", BROKEN_MARKER),
    ]);
    let pos = bytes
        .windows(BROKEN_MARKER.len())
        .position(|w| w == BROKEN_MARKER)
        .expect("marker present in stored entry");
    bytes[pos + 5] ^= 0xFF;
    bytes
}

pub fn good_zip_bytes(exe_body: &[u8]) -> Vec<u8> {
    zip_bytes(&[
        ("Game/", b""),
        ("Game/run.sh", exe_body),
        ("Game/data/level1.bin", b"level one"),
    ])
}

/// Remote source returning a fixed answer and counting calls.
pub struct FixedSource {
    result: Result<Version>,
    calls: AtomicUsize,
}

impl FixedSource {
    pub fn ok(version: Version) -> Self {
        Self {
            result: Ok(version),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn err(error: lpad_common::LpadError) -> Self {
        Self {
            result: Err(error),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RemoteVersionSource for FixedSource {
    async fn fetch(&self) -> Result<Version> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}
