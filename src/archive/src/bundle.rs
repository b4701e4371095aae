//! gzip-compressed tar bundles of a directory tree
//!
//! Entries are stored relative to the source directory, without a root
//! prefix, and visited in sorted order. An optional `exclude` path (relative
//! to the source) is skipped with everything under it. Everything here is
//! blocking; the archiver runs it on the blocking pool.

use crate::error::{ArchiveError, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tar::{Archive, Builder};

/// Write a bundle of `source` to `writer`, returning the writer
pub fn write_bundle<W: Write>(
    source: &Path,
    exclude: Option<&Path>,
    writer: W,
    level: u32,
) -> Result<W> {
    let encoder = GzEncoder::new(writer, Compression::new(level));
    let mut tar = Builder::new(encoder);
    tar.follow_symlinks(false);

    for (path, relative, is_dir) in walk_sorted(source, exclude)? {
        let appended = if is_dir {
            tar.append_dir(&relative, &path)
        } else {
            tar.append_path_with_name(&path, &relative)
        };
        appended.map_err(|e| {
            ArchiveError::Compression(format!("Failed to add {}: {}", relative.display(), e))
        })?;
    }

    let encoder = tar
        .into_inner()
        .map_err(|e| ArchiveError::Compression(format!("Failed to finish tar stream: {}", e)))?;
    encoder
        .finish()
        .map_err(|e| ArchiveError::Compression(format!("Failed to finish gzip stream: {}", e)))
}

/// Unpack a bundle read from `reader` into `dest`
pub fn unpack_bundle<R: Read>(reader: R, dest: &Path) -> Result<()> {
    fs::create_dir_all(dest)?;
    let mut archive = Archive::new(GzDecoder::new(reader));
    archive.set_preserve_permissions(true);
    archive
        .unpack(dest)
        .map_err(|e| ArchiveError::Compression(format!("Failed to unpack bundle: {}", e)))
}

/// Total size of regular files under `path`
pub fn directory_size(path: &Path, exclude: Option<&Path>) -> Result<u64> {
    let mut total = 0u64;
    for (entry, _, is_dir) in walk_sorted(path, exclude)? {
        if !is_dir {
            total += fs::symlink_metadata(&entry)?.len();
        }
    }
    Ok(total)
}

/// Depth-first walk in sorted order: `(absolute, relative, is_dir)`
fn walk_sorted(root: &Path, exclude: Option<&Path>) -> Result<Vec<(PathBuf, PathBuf, bool)>> {
    let mut out = Vec::new();
    walk_into(root, Path::new(""), exclude, &mut out)?;
    Ok(out)
}

fn walk_into(
    dir: &Path,
    prefix: &Path,
    exclude: Option<&Path>,
    out: &mut Vec<(PathBuf, PathBuf, bool)>,
) -> Result<()> {
    let mut entries = fs::read_dir(dir)?.collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let path = entry.path();
        let relative = prefix.join(entry.file_name());
        if exclude == Some(relative.as_path()) {
            continue;
        }
        let is_dir = entry.file_type()?.is_dir();

        out.push((path.clone(), relative.clone(), is_dir));
        if is_dir {
            walk_into(&path, &relative, exclude, out)?;
        }
    }
    Ok(())
}
