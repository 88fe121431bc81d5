//! Test utilities for peerfetch
//!
//! This crate provides shared testing utilities used across the peerfetch workspace.

pub mod mock;
pub mod raw;

pub use mock::{SHARED_MOCK_SERVER, get_shared_mock_server};
pub use raw::{RawResponder, refused_url};

use tempfile::TempDir;

/// Creates a temporary directory within `.tmp/` at the project root
///
/// Download tests stage files next to their destination, so keeping test
/// directories under one gitignored root makes leftovers easy to spot.
///
/// # Panics
///
/// Panics if the current directory is unknown or `.tmp/` cannot be created.
///
/// # Examples
///
/// ```rust
/// use peerfetch_testkit::temp_dir_in_workspace;
///
/// let temp = temp_dir_in_workspace();
/// let file_path = temp.path().join("seg_0.dat");
/// std::fs::write(&file_path, "segment").unwrap();
/// ```
pub fn temp_dir_in_workspace() -> TempDir {
    try_temp_dir_in_workspace().expect("Failed to create temporary directory in .tmp/")
}

/// Variant of [`temp_dir_in_workspace`] that reports failures
pub fn try_temp_dir_in_workspace() -> std::io::Result<TempDir> {
    let tmp_base = std::env::current_dir()?.join(".tmp");
    std::fs::create_dir_all(&tmp_base)?;
    TempDir::new_in(&tmp_base)
}
