// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tar archives exchanged with containers.

use std::io;
use std::path::Path;

/// Tar the contents of `dir` so they unpack into a folder named `folder`.
///
/// Blocking; call from `spawn_blocking` in async code.
pub fn tar_directory(dir: &Path, folder: &str) -> io::Result<Vec<u8>> {
    let mut builder = tar::Builder::new(Vec::new());
    builder.follow_symlinks(false);
    builder.append_dir_all(folder, dir)?;
    builder.into_inner()
}

/// Tar in-memory files given as `(path, contents)` pairs.
pub fn tar_files<'a, I>(files: I) -> io::Result<Vec<u8>>
where
    I: IntoIterator<Item = (&'a str, &'a [u8])>,
{
    let mut builder = tar::Builder::new(Vec::new());
    for (path, contents) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, path, contents)?;
    }
    builder.into_inner()
}

#[cfg(test)]
#[path = "archive_tests.rs"]
mod tests;
