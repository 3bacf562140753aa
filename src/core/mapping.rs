//! Source-to-destination path arithmetic.
//!
//! A destination keeps the source file's position relative to its root and
//! appends a suffix to the full file name: `src/a/b.c` under `src` maps to
//! `<dest>/a/b.c.ll`, never `<dest>/a/b.ll`.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use super::error::{PipelineError, PipelineResult};

/// Map `source_path` (somewhere under `source_root`) into `dest_root`,
/// appending `dest_suffix` to its file name.
///
/// # Errors
///
/// Returns [`PipelineError::NotUnderRoot`] if `source_path` is not inside
/// `source_root` or names the root itself.
pub fn map_destination(
    source_root: &Path,
    source_path: &Path,
    dest_root: &Path,
    dest_suffix: &str,
) -> PipelineResult<PathBuf> {
    let not_under_root = || PipelineError::NotUnderRoot {
        path: source_path.to_path_buf(),
        root: source_root.to_path_buf(),
    };

    let relative = source_path
        .strip_prefix(source_root)
        .map_err(|_| not_under_root())?;
    let file_name = relative.file_name().ok_or_else(not_under_root)?;

    Ok(dest_root.join(relative).with_file_name(append_suffix(file_name, dest_suffix)))
}

fn append_suffix(file_name: &OsStr, suffix: &str) -> OsString {
    let mut name = file_name.to_os_string();
    name.push(suffix);
    name
}
