//! Pack a directory as the build context

use crate::error::*;
use std::{
    fs::File,
    io::{Seek, SeekFrom},
    path::Path,
};
use walkdir::WalkDir;

/// Archive all files under `dir` into an uncompressed tar in an anonymous temporary file.
///
/// Entry names are relative to `dir`, i.e. `<dir>/Dockerfile` is stored as `Dockerfile`.
/// The returned file is positioned at its start, and is deleted when closed.
pub fn pack(dir: &Path) -> Result<File> {
    if !dir.is_dir() {
        return Err(Error::NotADirectory(dir.to_owned()));
    }
    let mut ar = tar::Builder::new(tempfile::tempfile()?);
    ar.follow_symlinks(false);
    let mut count = 0;
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .sort_by(|a, b| a.file_name().cmp(b.file_name()))
    {
        let entry = entry?;
        let name = entry
            .path()
            .strip_prefix(dir)
            .expect("WalkDir never yields a path outside of its root");
        let ty = entry.file_type();
        if ty.is_dir() {
            ar.append_dir(name, entry.path())?;
        } else if ty.is_file() || ty.is_symlink() {
            ar.append_path_with_name(entry.path(), name)?;
        } else {
            log::warn!("Skip special file: {}", entry.path().display());
            continue;
        }
        count += 1;
    }
    let mut file = ar.into_inner()?;
    let size = file.seek(SeekFrom::End(0))?;
    file.seek(SeekFrom::Start(0))?;
    log::info!(
        "Build context: {} entries, {} bytes from {}",
        count,
        size,
        dir.display()
    );
    Ok(file)
}
