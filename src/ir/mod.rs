//! In-memory model of a parsed extension manifest.
//!
//! The loader produces an `ExtensionManifest`; the scorer consumes it. Both
//! manifest schema versions end up in this one shape.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::taxonomy::{self, CapabilityTier};

/// Which manifest field a capability was declared in.
///
/// Declaration order is also precedence: when one name is declared in
/// several fields the earliest variant wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityKind {
    Permission,
    HostPermission,
    OptionalPermission,
    ContentScriptMatch,
}

impl CapabilityKind {
    /// Kinds whose names are URL match patterns.
    pub fn is_host_style(self) -> bool {
        matches!(self, Self::HostPermission | Self::ContentScriptMatch)
    }
}

impl std::fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Permission => write!(f, "permission"),
            Self::HostPermission => write!(f, "host_permission"),
            Self::OptionalPermission => write!(f, "optional_permission"),
            Self::ContentScriptMatch => write!(f, "content_script_match"),
        }
    }
}

/// One declared access grant.
///
/// Identity is `(name, kind)`; `tier` is derived from those two and takes
/// no part in equality or ordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capability {
    pub name: String,
    pub kind: CapabilityKind,
    pub tier: CapabilityTier,
}

impl Capability {
    pub fn new(name: impl Into<String>, kind: CapabilityKind) -> Self {
        let name = name.into();
        let tier = taxonomy::classify(&name, kind);
        Self { name, kind, tier }
    }

    pub fn permission(name: impl Into<String>) -> Self {
        Self::new(name, CapabilityKind::Permission)
    }

    pub fn host(pattern: impl Into<String>) -> Self {
        Self::new(pattern, CapabilityKind::HostPermission)
    }

    fn key(&self) -> (&str, CapabilityKind) {
        (&self.name, self.kind)
    }
}

impl PartialEq for Capability {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Capability {}

impl Hash for Capability {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl PartialOrd for Capability {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Capability {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

/// Schema version assumed when a manifest does not declare one.
pub const DEFAULT_MANIFEST_VERSION: u8 = 2;

/// One parsed extension. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtensionManifest {
    /// Directory the manifest was read from; unique within a scan.
    pub source_path: PathBuf,
    /// Store id (the directory name under the extensions root), if known.
    pub extension_id: Option<String>,
    pub display_name: String,
    pub version: String,
    pub description: Option<String>,
    /// Schema version as declared; display only.
    pub manifest_version: u8,
    pub capabilities: BTreeSet<Capability>,
}

impl ExtensionManifest {
    pub fn new(
        source_path: impl Into<PathBuf>,
        display_name: impl Into<String>,
        version: impl Into<String>,
        capabilities: impl IntoIterator<Item = Capability>,
    ) -> Self {
        Self {
            source_path: source_path.into(),
            extension_id: None,
            display_name: display_name.into(),
            version: version.into(),
            description: None,
            manifest_version: DEFAULT_MANIFEST_VERSION,
            capabilities: capabilities.into_iter().collect(),
        }
    }

    pub fn with_extension_id(mut self, id: impl Into<String>) -> Self {
        self.extension_id = Some(id.into());
        self
    }

    /// Capabilities declared in one field.
    pub fn capabilities_of(&self, kind: CapabilityKind) -> impl Iterator<Item = &Capability> {
        self.capabilities.iter().filter(move |c| c.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_ignores_tier() {
        let a = Capability::permission("tabs");
        let mut b = Capability::permission("tabs");
        b.tier = CapabilityTier::Unknown;
        assert_eq!(a, b);
    }

    #[test]
    fn same_name_different_kind_is_distinct() {
        let set: BTreeSet<_> = [
            Capability::host("*://*/*"),
            Capability::new("*://*/*", CapabilityKind::ContentScriptMatch),
            Capability::host("*://*/*"),
        ]
        .into_iter()
        .collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn constructor_resolves_tier() {
        assert_eq!(Capability::permission("debugger").tier, CapabilityTier::Critical);
        assert_eq!(Capability::host("https://a.com/*").tier, CapabilityTier::Medium);
    }

    #[test]
    fn empty_manifest_is_valid() {
        let m = ExtensionManifest::new("/ext/a", "A", "1.0", []);
        assert!(m.capabilities.is_empty());
        assert_eq!(m.capabilities_of(CapabilityKind::Permission).count(), 0);
    }
}
