//! Flash filesystem helpers: clip variant selection, listing, copying.

use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use rand::Rng;
use walkdir::WalkDir;

use crate::config::Storage;

/// Paths of one filesystem clip.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClipFiles {
    pub clip: PathBuf,
    pub packets: PathBuf,
}

/// Every `<prefix>-*.<ext>` file, sorted by name.
///
/// A missing directory yields no matches.
pub fn find_variants(prefix: &Path, extension: &str) -> io::Result<Vec<PathBuf>> {
    let dir = match prefix.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let Some(stem) = prefix.file_name().and_then(|n| n.to_str()) else {
        return Ok(Vec::new());
    };
    let head = format!("{stem}-");
    let tail = format!(".{extension}");

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut matches = Vec::new();
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if name.len() >= head.len() + tail.len() && name.starts_with(&head) && name.ends_with(&tail) {
            matches.push(dir.join(name));
        }
    }
    matches.sort();
    Ok(matches)
}

/// Pick the clip for `prefix`: a uniform choice among its variants, or
/// `<prefix>.<ext>` when there are none.
pub fn choose_variant<R: Rng + ?Sized>(
    storage: &Storage,
    prefix: &Path,
    rng: &mut R,
) -> io::Result<ClipFiles> {
    let variants = find_variants(prefix, storage.clip_extension)?;
    let clip = match variants.choose(rng) {
        Some(path) => path.clone(),
        None => prefix.with_extension(storage.clip_extension),
    };
    let packets = storage.packets_path(&clip);
    Ok(ClipFiles { clip, packets })
}

/// Human readable byte count: `512 B`, `1.5 KiB`, `2.0 MiB`.
pub fn readable_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut size = bytes as f64 / 1024.0;
    let mut unit = 0;
    while size >= 1024.0 && unit + 1 < UNITS.len() {
        size /= 1024.0;
        unit += 1;
    }
    format!("{size:.1} {}", UNITS[unit])
}

/// Deepest directory level `list_tree` descends into.
pub const MAX_TREE_DEPTH: usize = 8;

/// Recursive listing, one line per entry, indented by depth.
///
/// Directories end in `/`, files carry their readable size. Nothing below
/// `MAX_TREE_DEPTH` levels is listed.
pub fn list_tree(root: &Path) -> io::Result<String> {
    let mut out = String::new();
    let walker = WalkDir::new(root)
        .min_depth(1)
        .max_depth(MAX_TREE_DEPTH)
        .sort_by_file_name();
    for entry in walker {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy();
        let indent = "  ".repeat(entry.depth() - 1);
        if entry.file_type().is_dir() {
            let _ = writeln!(out, "{indent}{name}/");
            if entry.depth() == MAX_TREE_DEPTH {
                crate::log_warn!("max directory depth {} reached at {}", MAX_TREE_DEPTH, entry.path().display());
            }
        } else {
            let size = entry.metadata()?.len();
            let _ = writeln!(out, "{indent}{name} ({})", readable_size(size));
        }
    }
    Ok(out)
}

/// Copy `from` to `to`, refusing to overwrite and removing a partial copy.
pub fn copy_file(from: &Path, to: &Path) -> io::Result<u64> {
    let mut src = File::open(from)?;
    let mut dst = File::options().write(true).create_new(true).open(to)?;
    let copied = io::copy(&mut src, &mut dst).and_then(|n| dst.flush().map(|_| n));
    if copied.is_err() {
        drop(dst);
        let _ = fs::remove_file(to);
    }
    copied
}

/// Used and total bytes of the storage partition.
#[cfg(target_os = "espidf")]
pub fn partition_usage(storage: &Storage) -> io::Result<(u64, u64)> {
    crate::hal::storage::usage(storage.partition_label)
}

/// Used and total bytes of the storage partition.
#[cfg(not(target_os = "espidf"))]
pub fn partition_usage(_storage: &Storage) -> io::Result<(u64, u64)> {
    Err(io::Error::new(
        ErrorKind::Unsupported,
        "no storage partition on this target",
    ))
}
