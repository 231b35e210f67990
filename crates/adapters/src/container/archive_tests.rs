// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::io::Read;

fn entries(bytes: &[u8]) -> Vec<(String, String)> {
    let mut archive = tar::Archive::new(bytes);
    let mut out = Vec::new();
    for entry in archive.entries().unwrap() {
        let mut entry = entry.unwrap();
        if entry.header().entry_type().is_dir() {
            continue;
        }
        let path = entry.path().unwrap().to_string_lossy().to_string();
        let mut contents = String::new();
        entry.read_to_string(&mut contents).unwrap();
        out.push((path, contents));
    }
    out.sort();
    out
}

#[test]
fn tar_directory_prefixes_entries_with_folder() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("src/main")).unwrap();
    std::fs::write(dir.path().join("build.gradle"), "plugins {}").unwrap();
    std::fs::write(dir.path().join("src/main/App.java"), "class App {}").unwrap();

    let bytes = tar_directory(dir.path(), "prog-student1").unwrap();

    assert_eq!(
        entries(&bytes),
        vec![
            ("prog-student1/build.gradle".to_string(), "plugins {}".to_string()),
            (
                "prog-student1/src/main/App.java".to_string(),
                "class App {}".to_string()
            ),
        ]
    );
}

#[test]
fn tar_directory_missing_dir_is_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(tar_directory(&dir.path().join("missing"), "x").is_err());
}

#[test]
fn tar_files_writes_in_memory_entries() {
    let bytes = tar_files([
        ("results/TEST-a.xml", b"<testsuite/>".as_slice()),
        ("results/pom.xml", b"<project/>".as_slice()),
    ])
    .unwrap();
    assert_eq!(
        entries(&bytes),
        vec![
            ("results/TEST-a.xml".to_string(), "<testsuite/>".to_string()),
            ("results/pom.xml".to_string(), "<project/>".to_string()),
        ]
    );
}
