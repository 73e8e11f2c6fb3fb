//! Extension discovery over one or more extension roots.
//!
//! Each immediate subdirectory of a root is one installed extension. Store
//! installs keep one subfolder per installed version; the lexicographically
//! greatest version name is treated as current. An unpacked extension with
//! `manifest.json` directly inside its directory is loaded as is.
//!
//! Results are produced lazily: a root is listed when the iterator reaches
//! it and each manifest is read when its entry is reached. Every filesystem
//! call runs under the configured read timeout. Dropping the `Discovery`
//! stops all work.

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::error::{GuardError, LoadError, Result};
use crate::ir::ExtensionManifest;
use crate::loader::{self, LoadOptions, MANIFEST_FILE};

/// Knobs for a discovery pass.
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    pub load: LoadOptions,
    /// Directory names under a root that never hold an extension.
    pub skip_dirs: Vec<String>,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            load: LoadOptions::default(),
            skip_dirs: vec!["Temp".into()],
        }
    }
}

/// An extension directory that could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedEntry {
    pub path: PathBuf,
    /// One of `not_found`, `malformed`, `permission_denied`, `timed_out`.
    pub reason: String,
    pub message: String,
}

impl SkippedEntry {
    fn new(path: PathBuf, err: &LoadError) -> Self {
        Self {
            path,
            reason: err.reason().to_string(),
            message: err.to_string(),
        }
    }
}

/// One item of a discovery pass.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanEntry {
    Extension(ExtensionManifest),
    Skipped(SkippedEntry),
}

impl ScanEntry {
    pub fn as_extension(&self) -> Option<&ExtensionManifest> {
        match self {
            Self::Extension(m) => Some(m),
            Self::Skipped(_) => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped(_))
    }
}

/// Start a discovery pass with default options.
pub fn scan(roots: &[PathBuf]) -> Result<Discovery> {
    scan_with(roots, DiscoveryOptions::default())
}

/// Start a discovery pass.
///
/// Fails immediately when `roots` is empty or any root is not an existing
/// directory. Roots resolving to the same directory (symlinks, `..`,
/// relative forms) are scanned once, under the first spelling given.
/// Nothing is read from any extension until the returned iterator is
/// advanced.
pub fn scan_with(roots: &[PathBuf], options: DiscoveryOptions) -> Result<Discovery> {
    if roots.is_empty() {
        return Err(GuardError::NoRoots);
    }

    let timeout = options.load.read_timeout;
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(roots.len());
    for root in roots {
        let canonical =
            canonical_dir(root, timeout).map_err(|_| GuardError::InvalidRoot(root.clone()))?;
        if seen.insert(canonical) {
            unique.push(root.clone());
        } else {
            tracing::debug!(root = %root.display(), "duplicate extension root, skipping");
        }
    }

    Ok(Discovery {
        roots: unique.into_iter(),
        current_root: PathBuf::new(),
        current: None,
        options,
    })
}

fn canonical_dir(root: &Path, timeout: Duration) -> io::Result<PathBuf> {
    let owned = root.to_path_buf();
    loader::with_timeout(timeout, move || {
        let canonical = std::fs::canonicalize(&owned)?;
        if canonical.is_dir() {
            Ok(canonical)
        } else {
            Err(io::Error::new(io::ErrorKind::NotFound, "not a directory"))
        }
    })
}

type RootListing = Vec<walkdir::Result<walkdir::DirEntry>>;

/// Immediate children of `root`, sorted by name, in one timed call.
fn list_root(root: &Path, timeout: Duration) -> io::Result<RootListing> {
    let owned = root.to_path_buf();
    loader::with_timeout(timeout, move || {
        Ok(WalkDir::new(owned)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .collect())
    })
}

/// Lazy, finite, single-pass sequence of `ScanEntry` values in discovery
/// order: roots in the order given, extensions by directory name.
pub struct Discovery {
    roots: std::vec::IntoIter<PathBuf>,
    current_root: PathBuf,
    current: Option<std::vec::IntoIter<walkdir::Result<walkdir::DirEntry>>>,
    options: DiscoveryOptions,
}

impl Iterator for Discovery {
    type Item = ScanEntry;

    fn next(&mut self) -> Option<ScanEntry> {
        loop {
            if let Some(entries) = self.current.as_mut() {
                match entries.next() {
                    Some(Ok(entry)) => {
                        if let Some(item) = self.visit(entry.path(), entry.file_type().is_dir()) {
                            return Some(item);
                        }
                        continue;
                    }
                    Some(Err(err)) => {
                        let path = err
                            .path()
                            .map(Path::to_path_buf)
                            .unwrap_or_else(|| self.current_root.clone());
                        let load_err = match err.io_error() {
                            Some(io) => LoadError::from_io(&path, io),
                            None => LoadError::malformed(&path, err.to_string()),
                        };
                        tracing::warn!(
                            path = %path.display(),
                            reason = load_err.reason(),
                            "unreadable directory entry, skipping"
                        );
                        return Some(ScanEntry::Skipped(SkippedEntry::new(path, &load_err)));
                    }
                    None => self.current = None,
                }
            }

            let root = self.roots.next()?;
            tracing::debug!(root = %root.display(), "scanning extension root");
            match list_root(&root, self.options.load.read_timeout) {
                Ok(listing) => {
                    self.current_root = root;
                    self.current = Some(listing.into_iter());
                }
                Err(e) => {
                    let err = LoadError::from_io(&root, &e);
                    tracing::warn!(
                        path = %root.display(),
                        reason = err.reason(),
                        "unreadable extension root, skipping"
                    );
                    return Some(ScanEntry::Skipped(SkippedEntry::new(root, &err)));
                }
            }
        }
    }
}

impl Discovery {
    /// Handle one entry directly under a root. `None` means the entry is
    /// not an extension at all and produces no item.
    fn visit(&self, ext_dir: &Path, is_dir: bool) -> Option<ScanEntry> {
        let id = ext_dir.file_name()?.to_string_lossy().into_owned();
        if !is_dir || id.starts_with('.') || self.options.skip_dirs.iter().any(|s| *s == id) {
            return None;
        }

        let result = self
            .current_version_dir(ext_dir)
            .and_then(|dir| loader::load_with(&dir, &self.options.load).map_err(|e| (dir, e)));

        Some(match result {
            Ok(manifest) => {
                tracing::debug!(id = %id, version = %manifest.version, "discovered extension");
                ScanEntry::Extension(manifest.with_extension_id(id))
            }
            Err((path, err)) => {
                tracing::warn!(
                    path = %path.display(),
                    reason = err.reason(),
                    error = %err,
                    "skipping extension"
                );
                ScanEntry::Skipped(SkippedEntry::new(path, &err))
            }
        })
    }

    /// The directory holding the manifest to load for `ext_dir`.
    fn current_version_dir(
        &self,
        ext_dir: &Path,
    ) -> std::result::Result<PathBuf, (PathBuf, LoadError)> {
        let owned = ext_dir.to_path_buf();
        let layout = loader::with_timeout(self.options.load.read_timeout, move || {
            inspect_layout(&owned)
        })
        .map_err(|e| (ext_dir.to_path_buf(), LoadError::from_io(ext_dir, &e)))?;

        match layout {
            Layout::Unpacked => Ok(ext_dir.to_path_buf()),
            Layout::Versions(names) => match select_current_version(names) {
                Some(version) => Ok(ext_dir.join(version)),
                None => Err((ext_dir.to_path_buf(), LoadError::NotFound(ext_dir.to_path_buf()))),
            },
        }
    }
}

/// How an extension directory is laid out on disk.
#[derive(Debug, PartialEq, Eq)]
enum Layout {
    /// `manifest.json` sits directly in the directory.
    Unpacked,
    /// Store install: names of the version subfolders.
    Versions(Vec<String>),
}

fn inspect_layout(dir: &Path) -> io::Result<Layout> {
    if dir.join(MANIFEST_FILE).exists() {
        return Ok(Layout::Unpacked);
    }
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.path().is_dir() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    Ok(Layout::Versions(names))
}

/// Pick the lexicographically greatest version folder name.
pub fn select_current_version<I>(names: I) -> Option<String>
where
    I: IntoIterator<Item = String>,
{
    names.into_iter().filter(|n| !n.starts_with('.')).max()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn manifest(name: &str, version: &str) -> String {
        format!(r#"{{"name":"{name}","version":"{version}","permissions":["tabs"]}}"#)
    }

    fn install(root: &Path, id: &str, version: &str, body: &str) -> PathBuf {
        let dir = root.join(id).join(version);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(MANIFEST_FILE), body).unwrap();
        dir
    }

    #[test]
    fn empty_root_list_fails_fast() {
        assert!(matches!(scan(&[]), Err(GuardError::NoRoots)));
    }

    #[test]
    fn missing_root_fails_fast() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("nope");
        match scan(&[tmp.path().to_path_buf(), missing.clone()]) {
            Err(GuardError::InvalidRoot(p)) => assert_eq!(p, missing),
            other => panic!("expected InvalidRoot, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn file_as_root_fails_fast() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("file");
        fs::write(&file, "").unwrap();
        assert!(matches!(scan(&[file]), Err(GuardError::InvalidRoot(_))));
    }

    #[test]
    fn picks_greatest_version_folder() {
        let tmp = tempfile::tempdir().unwrap();
        install(tmp.path(), "abc", "1.0.0_0", &manifest("Old", "1.0.0"));
        let current = install(tmp.path(), "abc", "2.0.0_0", &manifest("New", "2.0.0"));

        let entries: Vec<ScanEntry> = scan(&[tmp.path().to_path_buf()]).unwrap().collect();
        assert_eq!(entries.len(), 1);
        let m = entries[0].as_extension().unwrap();
        assert_eq!(m.display_name, "New");
        assert_eq!(m.source_path, current);
        assert_eq!(m.extension_id.as_deref(), Some("abc"));
    }

    #[test]
    fn version_selection_is_lexicographic() {
        let names = ["1.2.0_0", "1.10.0_0", "1.9.9_0"].map(String::from);
        assert_eq!(select_current_version(names).as_deref(), Some("1.9.9_0"));
        assert_eq!(select_current_version(Vec::<String>::new()), None);
    }

    #[test]
    fn unpacked_extension_loaded_in_place() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("dev-ext");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(MANIFEST_FILE), manifest("Dev", "0.1")).unwrap();

        let entries: Vec<ScanEntry> = scan(&[tmp.path().to_path_buf()]).unwrap().collect();
        assert_eq!(entries[0].as_extension().unwrap().source_path, dir);
    }

    #[test]
    fn malformed_entries_become_skips() {
        let tmp = tempfile::tempdir().unwrap();
        install(tmp.path(), "a", "1", &manifest("A", "1"));
        install(tmp.path(), "b", "1", "{ not json");
        install(tmp.path(), "c", "1", &manifest("C", "1"));
        install(tmp.path(), "d", "1", r#"{"version":"1"}"#);
        fs::create_dir_all(tmp.path().join("e")).unwrap();

        let entries: Vec<ScanEntry> = scan(&[tmp.path().to_path_buf()]).unwrap().collect();
        let names: Vec<&str> = entries
            .iter()
            .filter_map(|e| e.as_extension())
            .map(|m| m.display_name.as_str())
            .collect();
        assert_eq!(names, vec!["A", "C"]);

        let reasons: Vec<&str> = entries
            .iter()
            .filter_map(|e| match e {
                ScanEntry::Skipped(s) => Some(s.reason.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(reasons, vec!["malformed", "malformed", "not_found"]);
    }

    #[test]
    fn ignores_files_hidden_and_skip_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        install(tmp.path(), "a", "1", &manifest("A", "1"));
        install(tmp.path(), "Temp", "1", "garbage");
        install(tmp.path(), ".hidden", "1", "garbage");
        fs::write(tmp.path().join("Preferences"), "{}").unwrap();

        let entries: Vec<ScanEntry> = scan(&[tmp.path().to_path_buf()]).unwrap().collect();
        assert_eq!(entries.len(), 1);
        assert!(!entries[0].is_skipped());
    }

    #[test]
    fn duplicate_roots_scanned_once_in_order() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        install(first.path(), "x", "1", &manifest("X", "1"));
        install(second.path(), "y", "1", &manifest("Y", "1"));
        let roots = vec![
            second.path().to_path_buf(),
            first.path().to_path_buf(),
            second.path().to_path_buf(),
        ];

        let names: Vec<String> = scan(&roots)
            .unwrap()
            .filter_map(|e| e.as_extension().map(|m| m.display_name.clone()))
            .collect();
        assert_eq!(names, vec!["Y", "X"]);
    }

    #[cfg(unix)]
    #[test]
    fn aliased_roots_scanned_once() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("exts");
        install(&root, "abc", "1", &manifest("A", "1"));
        let alias = tmp.path().join("alias");
        std::os::unix::fs::symlink(&root, &alias).unwrap();
        let dotted = root.join("abc").join("..");

        let entries: Vec<ScanEntry> = scan(&[root.clone(), alias, dotted]).unwrap().collect();
        assert_eq!(entries.len(), 1);
        let m = entries[0].as_extension().unwrap();
        assert_eq!(m.extension_id.as_deref(), Some("abc"));
        assert!(m.source_path.starts_with(&root));
    }

    #[test]
    fn layout_inspection_distinguishes_unpacked_and_versions() {
        let tmp = tempfile::tempdir().unwrap();
        let unpacked = tmp.path().join("dev");
        fs::create_dir_all(&unpacked).unwrap();
        fs::write(unpacked.join(MANIFEST_FILE), "{}").unwrap();
        assert_eq!(inspect_layout(&unpacked).unwrap(), Layout::Unpacked);

        install(tmp.path(), "store", "2.0_0", "{}");
        fs::write(tmp.path().join("store").join("notes.txt"), "").unwrap();
        assert_eq!(
            inspect_layout(&tmp.path().join("store")).unwrap(),
            Layout::Versions(vec!["2.0_0".to_string()])
        );
    }

    #[test]
    fn root_removed_after_start_is_skipped_with_its_path() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("exts");
        install(&root, "a", "1", &manifest("A", "1"));
        let discovery = scan(&[root.clone()]).unwrap();
        fs::remove_dir_all(&root).unwrap();

        let entries: Vec<ScanEntry> = discovery.collect();
        assert_eq!(entries.len(), 1);
        match &entries[0] {
            ScanEntry::Skipped(skip) => {
                assert_eq!(skip.path, root);
                assert_eq!(skip.reason, "not_found");
            }
            other => panic!("expected a skip, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn dangling_link_under_root_is_skipped_with_its_path() {
        let tmp = tempfile::tempdir().unwrap();
        install(tmp.path(), "a", "1", &manifest("A", "1"));
        let link = tmp.path().join("gone");
        std::os::unix::fs::symlink(tmp.path().join("missing"), &link).unwrap();

        let entries: Vec<ScanEntry> = scan(&[tmp.path().to_path_buf()]).unwrap().collect();
        let skip = entries
            .iter()
            .find_map(|e| match e {
                ScanEntry::Skipped(s) => Some(s),
                _ => None,
            })
            .unwrap();
        assert_eq!(skip.path, link);
        assert!(!skip.path.as_os_str().is_empty());
    }

    #[test]
    fn manifests_read_only_when_reached() {
        let tmp = tempfile::tempdir().unwrap();
        for id in ["a", "b", "c"] {
            install(tmp.path(), id, "1", &manifest(id, "1"));
        }
        let mut discovery = scan(&[tmp.path().to_path_buf()]).unwrap();
        let first = discovery.next().unwrap();
        assert_eq!(first.as_extension().unwrap().display_name, "a");

        // Corrupt "b" after the pass started: it has not been read yet.
        fs::write(tmp.path().join("b").join("1").join(MANIFEST_FILE), "[]").unwrap();
        let second = discovery.next().unwrap();
        assert!(second.is_skipped());

        drop(discovery);
    }
}
