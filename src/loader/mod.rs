//! Manifest loader: one extension directory in, one `ExtensionManifest` out.

pub mod locale;
pub mod manifest;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

use crate::error::LoadError;
use crate::ir::ExtensionManifest;
use manifest::RawManifest;

pub const MANIFEST_FILE: &str = "manifest.json";

/// Limits applied to every file the loader reads.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Per-file read timeout. `Duration::ZERO` reads inline without one.
    pub read_timeout: Duration,
    /// Larger manifests are rejected as malformed.
    pub max_manifest_bytes: u64,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_millis(2000),
            max_manifest_bytes: 1_048_576,
        }
    }
}

/// Load the extension unpacked in `dir` with default limits.
pub fn load(dir: &Path) -> Result<ExtensionManifest, LoadError> {
    load_with(dir, &LoadOptions::default())
}

pub fn load_with(dir: &Path, options: &LoadOptions) -> Result<ExtensionManifest, LoadError> {
    let manifest_path = dir.join(MANIFEST_FILE);
    let bytes = read_bounded(&manifest_path, options)?;
    let raw = RawManifest::parse(&bytes, &manifest_path)?;

    let capabilities = raw.capabilities();
    let manifest_version = raw.manifest_version();

    let catalog = needs_catalog(&raw).then(|| load_catalog(dir, &raw, options)).flatten();
    let localize = |text: String| -> String {
        catalog
            .as_ref()
            .and_then(|c| c.resolve(&text))
            .unwrap_or(text)
    };

    let display_name = localize(raw.name.unwrap_or_default());
    let description = raw.description.map(localize);

    tracing::debug!(
        path = %dir.display(),
        name = %display_name,
        capabilities = capabilities.len(),
        "loaded manifest"
    );

    Ok(ExtensionManifest {
        source_path: dir.to_path_buf(),
        extension_id: None,
        display_name,
        version: raw.version.unwrap_or_default(),
        description,
        manifest_version,
        capabilities: capabilities.into_iter().collect(),
    })
}

fn needs_catalog(raw: &RawManifest) -> bool {
    [raw.name.as_deref(), raw.description.as_deref()]
        .into_iter()
        .flatten()
        .any(|t| locale::placeholder_key(t).is_some())
}

fn load_catalog(dir: &Path, raw: &RawManifest, options: &LoadOptions) -> Option<locale::Messages> {
    locale::catalog_paths(dir, raw.default_locale.as_deref())
        .into_iter()
        .find_map(|path| {
            let bytes = read_bounded(&path, options).ok()?;
            locale::Messages::parse(&bytes)
        })
}

/// Read a whole file, enforcing the size cap. The stat and the read run
/// together under one read timeout.
fn read_bounded(path: &Path, options: &LoadOptions) -> Result<Vec<u8>, LoadError> {
    let owned: PathBuf = path.to_path_buf();
    let limit = options.max_manifest_bytes;
    with_timeout(options.read_timeout, move || read_checked(&owned, limit))
        .map_err(|e| LoadError::from_io(path, &e))
}

fn read_checked(path: &Path, limit: u64) -> io::Result<Vec<u8>> {
    let metadata = std::fs::metadata(path)?;
    if !metadata.is_file() {
        return Err(io::Error::new(io::ErrorKind::NotFound, "not a regular file"));
    }
    if metadata.len() > limit {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{} bytes exceeds the {} byte limit", metadata.len(), limit),
        ));
    }
    std::fs::read(path)
}

/// Run a blocking filesystem operation with a deadline.
///
/// An operation that stalls past `timeout` is abandoned: its thread is left
/// to finish on its own and the caller gets `ErrorKind::TimedOut` at once.
/// `Duration::ZERO` runs `op` inline.
pub(crate) fn with_timeout<T, F>(timeout: Duration, op: F) -> io::Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> io::Result<T> + Send + 'static,
{
    if timeout.is_zero() {
        return op();
    }

    let (tx, rx) = mpsc::sync_channel(1);
    std::thread::Builder::new()
        .name("manifest-guard-io".into())
        .spawn(move || {
            let _ = tx.send(op());
        })?;

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => {
            Err(io::Error::new(io::ErrorKind::TimedOut, "filesystem read timed out"))
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            Err(io::Error::new(io::ErrorKind::Other, "reader thread exited"))
        }
    }
}
