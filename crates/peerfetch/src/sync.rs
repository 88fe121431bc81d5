//! Reconciling a local directory against the file set a peer serves

use crate::executor::HttpClient;
use crate::request::RequestConfig;
use peerfetch_core::{FetchError, Result};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Outcome of one directory reconciliation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Expected files already present, left untouched
    pub kept: Vec<String>,
    /// Extraneous files deleted from the directory
    pub removed: Vec<String>,
    /// Missing files fetched from the peer
    pub downloaded: Vec<String>,
    /// Extraneous files whose deletion failed; they remain on disk
    pub failed_removals: Vec<String>,
}

impl HttpClient {
    /// Makes `local_dir` hold exactly the regular files named in `expected`
    ///
    /// Files not in `expected` are deleted (best effort). Expected files
    /// already present are trusted as-is, whatever their content. Missing
    /// files are downloaded from `base` with the name appended as one path
    /// segment, in sorted name order. The first failed download aborts the
    /// sync; files fetched before it stay in place.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if a name is empty, `.`/`..`, or contains a path
    ///   separator
    /// - `InternalError` if the directory cannot be created or listed
    /// - any error of [`HttpClient::download`] for a missing file
    pub fn download_multi_files(
        &mut self,
        base: &RequestConfig,
        local_dir: impl AsRef<Path>,
        expected: &HashSet<String>,
    ) -> Result<SyncReport> {
        self.sync_dir(base, local_dir.as_ref(), expected, |path| fs::remove_file(path))
    }

    fn sync_dir<R>(
        &mut self,
        base: &RequestConfig,
        local_dir: &Path,
        expected: &HashSet<String>,
        mut remove_file: R,
    ) -> Result<SyncReport>
    where
        R: FnMut(&Path) -> io::Result<()>,
    {
        for name in expected {
            validate_file_name(name)?;
        }

        fs::create_dir_all(local_dir)
            .map_err(|e| FetchError::io("create sync directory", local_dir, e))?;
        let present = list_regular_files(local_dir)?;

        let mut report = SyncReport::default();
        for (name, path) in &present {
            if expected.contains(name) {
                report.kept.push(name.clone());
                continue;
            }
            match remove_file(path) {
                Ok(()) => {
                    debug!(path = %path.display(), "removed extraneous file");
                    report.removed.push(name.clone());
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to remove extraneous file");
                    report.failed_removals.push(name.clone());
                }
            }
        }

        let mut missing: Vec<&String> = expected.iter().filter(|n| !present.contains_key(*n)).collect();
        missing.sort();

        for name in missing {
            let config = base.join_file(name)?;
            self.download(&config, local_dir.join(name))?;
            report.downloaded.push(name.clone());
        }

        debug!(
            dir = %local_dir.display(),
            kept = report.kept.len(),
            removed = report.removed.len(),
            downloaded = report.downloaded.len(),
            "directory synced"
        );
        Ok(report)
    }
}

fn validate_file_name(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(FetchError::InvalidArgument(format!(
            "expected file name must be a plain file name, got '{}'",
            name
        )));
    }
    Ok(())
}

/// Regular files directly inside `dir`, keyed by name
///
/// Subdirectories, symlinks and names that are not valid UTF-8 are skipped.
fn list_regular_files(dir: &Path) -> Result<BTreeMap<String, PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| FetchError::io("list sync directory", dir, e))?;

    let mut files = BTreeMap::new();
    for entry in entries {
        let entry = entry.map_err(|e| FetchError::io("list sync directory", dir, e))?;
        let file_type = entry
            .file_type()
            .map_err(|e| FetchError::io("inspect directory entry", entry.path(), e))?;
        if !file_type.is_file() {
            continue;
        }
        if let Ok(name) = entry.file_name().into_string() {
            files.insert(name, entry.path());
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use peerfetch_core::ErrorKind;
    use tempfile::TempDir;

    #[test]
    fn test_validate_file_name() {
        assert!(validate_file_name("seg_0.dat").is_ok());
        assert!(validate_file_name("a b%c.idx").is_ok());

        for bad in ["", ".", "..", "dir/seg.dat", "..\\seg.dat"] {
            let err = validate_file_name(bad).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument, "name {:?}", bad);
        }
    }

    #[test]
    fn test_list_regular_files_skips_directories() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("b.dat"), b"b").unwrap();
        fs::write(temp.path().join("a.dat"), b"a").unwrap();
        fs::create_dir(temp.path().join("nested")).unwrap();

        let files = list_regular_files(temp.path()).unwrap();
        let names: Vec<&str> = files.keys().map(String::as_str).collect();
        assert_eq!(names, ["a.dat", "b.dat"]);
    }

    #[test]
    fn test_invalid_name_touches_nothing() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("snapshot");
        let base = RequestConfig::new("http://127.0.0.1:9/api/files").unwrap();
        let expected: HashSet<String> = ["ok.dat".to_string(), "../escape".to_string()].into();

        let err = HttpClient::new()
            .download_multi_files(&base, &dir, &expected)
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(!dir.exists());
    }

    #[test]
    fn test_failed_removal_is_reported_and_sync_continues() {
        let mut server = mockito::Server::new();
        let mock = server.mock("GET", "/api/files/b.dat").with_body("bbb").create();

        let temp = TempDir::new().unwrap();
        for name in ["a.dat", "locked.dat", "stale.dat"] {
            fs::write(temp.path().join(name), name).unwrap();
        }
        let base = RequestConfig::new(&format!("{}/api/files", server.url())).unwrap();
        let expected: HashSet<String> = ["a.dat".to_string(), "b.dat".to_string()].into();

        let report = HttpClient::new()
            .sync_dir(&base, temp.path(), &expected, |path| {
                if path.ends_with("locked.dat") {
                    Err(io::Error::new(io::ErrorKind::PermissionDenied, "locked"))
                } else {
                    fs::remove_file(path)
                }
            })
            .unwrap();

        mock.assert();
        assert_eq!(report.kept, ["a.dat"]);
        assert_eq!(report.removed, ["stale.dat"]);
        assert_eq!(report.failed_removals, ["locked.dat"]);
        assert_eq!(report.downloaded, ["b.dat"]);
        assert!(temp.path().join("locked.dat").exists());
        assert!(!temp.path().join("stale.dat").exists());
        assert_eq!(fs::read(temp.path().join("b.dat")).unwrap(), b"bbb");
    }

    #[test]
    fn test_all_present_makes_no_requests() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.dat"), b"local").unwrap();
        fs::write(temp.path().join("stale.dat"), b"old").unwrap();
        // Port 9 is never contacted since nothing is missing
        let base = RequestConfig::new("http://127.0.0.1:9/api/files").unwrap();
        let expected: HashSet<String> = ["a.dat".to_string()].into();

        let report = HttpClient::new()
            .download_multi_files(&base, temp.path(), &expected)
            .unwrap();

        assert_eq!(report.kept, ["a.dat"]);
        assert_eq!(report.removed, ["stale.dat"]);
        assert!(report.downloaded.is_empty());
        assert_eq!(fs::read(temp.path().join("a.dat")).unwrap(), b"local");
        assert!(!temp.path().join("stale.dat").exists());
    }
}
