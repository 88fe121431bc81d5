//! Streaming a response body into a local file
//!
//! The body is written to a hidden staging file in the destination's
//! directory and moved into place only after the received byte count agrees
//! with the advertised `Content-Length`. A failed download never leaves a
//! partial file at the destination.

use crate::executor::HttpClient;
use crate::request::{Method, RequestConfig};
use crate::sink::WriteSink;
use peerfetch_core::{FetchError, Result};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

const STAGING_PREFIX: &str = ".peerfetch-";
const STAGING_SUFFIX: &str = ".part";

impl HttpClient {
    /// Downloads `config`'s URL to `local_path`, returning the bytes written
    ///
    /// The request is always sent as GET. An existing file at `local_path` is
    /// replaced on success and removed on failure.
    ///
    /// # Errors
    ///
    /// - `DataCorruption` if the body length differs from `Content-Length`
    /// - `HttpStatusError` / `NetworkError` as for [`HttpClient::execute`]
    /// - `InternalError` if the staging file cannot be created, written or
    ///   moved into place
    pub fn download(&mut self, config: &RequestConfig, local_path: impl AsRef<Path>) -> Result<u64> {
        let local_path = local_path.as_ref();
        let config = config.clone().with_method(Method::Get);

        let parent = match local_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let mut staging = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .suffix(STAGING_SUFFIX)
            .tempfile_in(parent)
            .map_err(|e| FetchError::io("create staging file", local_path, e))?;

        let written = match self.fill_staging(&config, staging.as_file_mut(), local_path) {
            Ok(written) => written,
            Err(e) => {
                discard_staging(staging);
                remove_stale_destination(local_path);
                return Err(e);
            }
        };

        // Dropping the returned file on error removes the staging copy
        if let Err(e) = staging.persist(local_path) {
            remove_stale_destination(local_path);
            return Err(FetchError::io("move download into place", local_path, e.error));
        }

        debug!(url = %config.url(), path = %local_path.display(), bytes = written, "download committed");
        Ok(written)
    }

    fn fill_staging(&mut self, config: &RequestConfig, file: &mut File, local_path: &Path) -> Result<u64> {
        let mut sink = WriteSink::new(BufWriter::new(&mut *file));
        let outcome = self.execute_into(config, &mut sink);
        let (mut writer, written, write_error) = sink.into_parts();

        if let Some(e) = write_error {
            return Err(FetchError::io("write downloaded data", local_path, e));
        }

        // A body cut short of its advertised length surfaces as a read error
        if let Err(e) = outcome {
            let advertised = self.last_result().and_then(|r| r.content_length);
            if let (FetchError::Network { .. }, Some(expected)) = (&e, advertised)
                && expected != written
            {
                return Err(FetchError::SizeMismatch {
                    path: local_path.to_path_buf(),
                    expected,
                    actual: written,
                });
            }
            return Err(e);
        }

        writer
            .flush()
            .map_err(|e| FetchError::io("write downloaded data", local_path, e))?;
        drop(writer);

        if let Ok(expected) = self.get_content_length()
            && expected != written
        {
            return Err(FetchError::SizeMismatch {
                path: local_path.to_path_buf(),
                expected,
                actual: written,
            });
        }

        file.sync_all()
            .map_err(|e| FetchError::io("sync downloaded data", local_path, e))?;
        Ok(written)
    }
}

fn discard_staging(staging: NamedTempFile) {
    let staging_path = staging.path().to_path_buf();
    if let Err(e) = staging.close() {
        warn!(path = %staging_path.display(), error = %e, "failed to remove staging file");
    }
}

fn remove_stale_destination(local_path: &Path) {
    if !local_path.is_file() {
        return;
    }
    match fs::remove_file(local_path) {
        Ok(()) => debug!(path = %local_path.display(), "removed stale destination after failed download"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %local_path.display(), error = %e, "failed to remove stale destination"),
    }
}
