//! Misc shared helpers.

use std::io;
use std::path::{Path, PathBuf};

/// Expand a leading `~` to the home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(raw.as_ref()).into_owned())
}

/// Anchor a relative path at the current directory.  Does not touch the filesystem
/// beyond asking for the cwd.
pub fn absolutize(path: &Path) -> io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// Canonicalise as far as the filesystem allows.  A path that does not exist
/// yet is resolved through its parent; failing that it is returned unchanged.
pub fn canonicalize_lossy(path: &Path) -> PathBuf {
    if let Ok(p) = path.canonicalize() {
        return p;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => match parent.canonicalize() {
            Ok(p) => p.join(name),
            Err(_) => path.to_path_buf(),
        },
        _ => path.to_path_buf(),
    }
}

/// True when `path` is `root` itself or lies somewhere below it.
pub fn is_within(path: &Path, root: &Path) -> bool {
    canonicalize_lossy(path).starts_with(canonicalize_lossy(root))
}
