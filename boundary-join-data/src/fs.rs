//! Capability-based filesystem helpers built on `cap-std` and `camino`.

use std::io::{self, Read};

use camino::Utf8Path;
use cap_std::fs::Metadata;
use cap_std::{ambient_authority, fs_utf8};

/// Read a whole UTF-8 text file using ambient authority.
pub fn read_to_string(path: &Utf8Path) -> io::Result<String> {
    let mut file = fs_utf8::File::open_ambient(path, ambient_authority())?;
    let mut text = String::new();
    file.read_to_string(&mut text)?;
    Ok(text)
}

/// Return whether `path` exists and is a regular file.
///
/// A missing parent directory is reported as `Ok(false)`.
pub fn file_is_file(path: &Utf8Path) -> io::Result<bool> {
    Ok(metadata(path)?.is_some_and(|meta| meta.is_file()))
}

/// Metadata for `path`, or `None` when it (or its parent) does not exist.
pub fn metadata(path: &Utf8Path) -> io::Result<Option<Metadata>> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    let Some(name) = path.file_name() else {
        return Ok(None);
    };
    let dir = match fs_utf8::Dir::open_ambient_dir(parent, ambient_authority()) {
        Ok(dir) => dir,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err),
    };
    match dir.metadata(name) {
        Ok(meta) => Ok(Some(meta)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err),
    }
}

/// Create `path` and any missing ancestors, then open it as a capability.
///
/// Absolute paths are anchored at their root; relative paths at the current
/// directory.
pub fn create_dir_all(path: &Utf8Path) -> io::Result<fs_utf8::Dir> {
    let (anchor, relative) = split_anchor(path)?;
    let base = fs_utf8::Dir::open_ambient_dir(anchor, ambient_authority())?;
    if relative.as_str().is_empty() {
        return Ok(base);
    }
    base.create_dir_all(relative)?;
    base.open_dir(relative)
}

fn split_anchor(path: &Utf8Path) -> io::Result<(&Utf8Path, &Utf8Path)> {
    if !path.has_root() {
        return Ok((Utf8Path::new("."), path));
    }
    let anchor = path
        .ancestors()
        .last()
        .ok_or_else(|| io::Error::other("absolute path has no root"))?;
    let relative = path
        .strip_prefix(anchor)
        .map_err(|_| io::Error::other("failed to strip root from absolute path"))?;
    Ok((anchor, relative))
}
