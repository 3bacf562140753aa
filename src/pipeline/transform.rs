//! The generic per-level, per-file transformation step.

use std::fs;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobMatcher};
use walkdir::WalkDir;

use crate::core::{map_destination, OptLevel, PipelineError, PipelineResult};

/// Apply `transformer` to every file under the per-level source root whose
/// name matches `source_filter`, writing into a mirrored tree under the
/// per-level destination root.
///
/// For each level in `0..=3` the source and destination roots are resolved,
/// matching files are enumerated recursively in file-name order, each is
/// mapped with [`map_destination`], its parent directories are created and
/// the transformer is called with `(source, destination, level)`.
///
/// A missing source root contributes no files. Returns the number of files
/// transformed.
///
/// # Errors
///
/// Stops at the first failure: an invalid filter, a walk or I/O error, a
/// destination that already exists ([`PipelineError::DestinationExists`]),
/// or any error returned by the transformer.
pub fn transform_files<S, D, T>(
    source_root: S,
    source_filter: &str,
    dest_root: D,
    dest_suffix: &str,
    mut transformer: T,
) -> PipelineResult<usize>
where
    S: Fn(OptLevel) -> PathBuf,
    D: Fn(OptLevel) -> PathBuf,
    T: FnMut(&Path, &Path, OptLevel) -> PipelineResult<()>,
{
    let matcher = file_matcher(source_filter)?;
    let mut transformed = 0;

    for level in OptLevel::ALL {
        let src_root = source_root(level);
        let dst_root = dest_root(level);

        for source in find_sources(&src_root, &matcher)? {
            let dest = map_destination(&src_root, &source, &dst_root, dest_suffix)?;

            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
            }
            if dest.exists() {
                return Err(PipelineError::DestinationExists { path: dest });
            }

            log::trace!("[{}] {} -> {}", level, source.display(), dest.display());
            transformer(&source, &dest, level)?;
            transformed += 1;
        }
    }

    Ok(transformed)
}

fn file_matcher(pattern: &str) -> PipelineResult<GlobMatcher> {
    Glob::new(pattern)
        .map(|glob| glob.compile_matcher())
        .map_err(|source| PipelineError::Filter {
            pattern: pattern.to_string(),
            source,
        })
}

/// Files under `root` whose file name matches, sorted for reproducible runs.
/// Symlinks to files count as files.
fn find_sources(root: &Path, matcher: &GlobMatcher) -> PipelineResult<Vec<PathBuf>> {
    if !root.is_dir() {
        log::debug!("No source tree at {}", root.display());
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|source| PipelineError::Walk {
            root: root.to_path_buf(),
            source,
        })?;

        let is_file = entry.file_type().is_file()
            || (entry.path_is_symlink() && entry.path().is_file());
        if is_file && matcher.is_match(entry.file_name()) {
            files.push(entry.into_path());
        }
    }

    Ok(files)
}
