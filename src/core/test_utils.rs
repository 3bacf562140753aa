//! Test utilities for filesystem-backed tests.
//!
//! Every test gets its own scratch directory, removed when the tree is
//! dropped, so pipeline runs never touch the real workspace.

#[cfg(test)]
pub mod test {
    use std::fs;
    use std::path::{Path, PathBuf};

    use tempfile::TempDir;

    /// A scratch directory with helpers for laying out source trees.
    pub struct TestTree {
        dir: TempDir,
    }

    impl TestTree {
        pub fn new() -> Self {
            let _ = env_logger::builder().is_test(true).try_init();
            Self {
                dir: TempDir::new().expect("create scratch directory"),
            }
        }

        pub fn root(&self) -> &Path {
            self.dir.path()
        }

        /// Absolute path of `relative` inside the tree.
        pub fn path(&self, relative: &str) -> PathBuf {
            self.dir.path().join(relative)
        }

        /// Write a file, creating its parent directories.
        pub fn write(&self, relative: &str, contents: &str) {
            let path = self.path(relative);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).expect("create parent directories");
            }
            fs::write(&path, contents).expect("write test file");
        }

        /// `path` relative to the tree root, with `/` separators.
        pub fn relative(&self, path: &Path) -> String {
            path.strip_prefix(self.dir.path())
                .expect("path inside test tree")
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/")
        }
    }

    impl Default for TestTree {
        fn default() -> Self {
            Self::new()
        }
    }
}
