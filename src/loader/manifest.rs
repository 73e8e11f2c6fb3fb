//! On-disk `manifest.json` model.
//!
//! Schema v2 puts host patterns inside `permissions`; v3 moves them to
//! `host_permissions`. Both normalize to the same capability set here.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::LoadError;
use crate::ir::{Capability, CapabilityKind, DEFAULT_MANIFEST_VERSION};
use crate::taxonomy::HostPattern;

#[derive(Debug, Clone, Deserialize)]
pub struct RawManifest {
    pub name: Option<String>,
    pub version: Option<String>,
    #[serde(default)]
    pub manifest_version: Option<serde_json::Value>,
    pub description: Option<String>,
    pub default_locale: Option<String>,
    #[serde(default)]
    pub permissions: Vec<PermissionEntry>,
    #[serde(default)]
    pub optional_permissions: Vec<PermissionEntry>,
    #[serde(default)]
    pub host_permissions: Vec<PatternEntry>,
    #[serde(default)]
    pub optional_host_permissions: Vec<PatternEntry>,
    #[serde(default)]
    pub content_scripts: Vec<ContentScriptEntry>,
}

/// Permission list entries are usually strings. Legacy app manifests also
/// use single-key objects such as `{"fileSystem": ["write"]}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PermissionEntry {
    Name(String),
    Object(serde_json::Map<String, serde_json::Value>),
    Other(serde_json::Value),
}

impl PermissionEntry {
    fn names(&self) -> Vec<&str> {
        match self {
            Self::Name(name) => vec![name.as_str()],
            Self::Object(map) => map.keys().map(String::as_str).collect(),
            Self::Other(_) => vec![],
        }
    }
}

/// Host pattern list entry. Non-string entries are ignored, the same way
/// stray values in the permission lists are.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PatternEntry {
    Pattern(String),
    Other(serde_json::Value),
}

impl PatternEntry {
    fn as_str(&self) -> Option<&str> {
        match self {
            Self::Pattern(p) => Some(p.as_str()),
            Self::Other(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawContentScript {
    #[serde(default)]
    pub matches: Vec<PatternEntry>,
}

/// `content_scripts` entries that are not objects are ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ContentScriptEntry {
    Block(RawContentScript),
    Other(serde_json::Value),
}

impl RawManifest {
    /// Parse manifest bytes. `path` is only used for error reporting.
    pub fn parse(bytes: &[u8], path: &Path) -> Result<Self, LoadError> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| LoadError::malformed(path, format!("not UTF-8: {e}")))?;
        let text = text.trim_start_matches('\u{feff}');

        let value: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| LoadError::malformed(path, e.to_string()))?;
        if !value.is_object() {
            return Err(LoadError::malformed(path, "top level is not an object"));
        }
        let raw: RawManifest = serde_json::from_value(value)
            .map_err(|e| LoadError::malformed(path, e.to_string()))?;

        if raw.name.as_deref().map_or(true, |n| n.trim().is_empty()) {
            return Err(LoadError::malformed(path, "missing `name`"));
        }
        if raw.version.as_deref().map_or(true, |v| v.trim().is_empty()) {
            return Err(LoadError::malformed(path, "missing `version`"));
        }
        Ok(raw)
    }

    pub fn manifest_version(&self) -> u8 {
        self.manifest_version
            .as_ref()
            .and_then(|v| v.as_u64())
            .and_then(|v| u8::try_from(v).ok())
            .unwrap_or(DEFAULT_MANIFEST_VERSION)
    }

    /// Every declared grant, normalized and deduplicated by name.
    pub fn capabilities(&self) -> Vec<Capability> {
        let mut declared: Vec<(&str, CapabilityKind)> = Vec::new();

        for entry in &self.permissions {
            declared.extend(entry.names().into_iter().map(|n| (n, CapabilityKind::Permission)));
        }
        for entry in &self.optional_permissions {
            declared.extend(
                entry
                    .names()
                    .into_iter()
                    .map(|n| (n, CapabilityKind::OptionalPermission)),
            );
        }
        declared.extend(
            self.host_permissions
                .iter()
                .chain(&self.optional_host_permissions)
                .filter_map(PatternEntry::as_str)
                .map(|n| (n, CapabilityKind::HostPermission)),
        );
        for entry in &self.content_scripts {
            let ContentScriptEntry::Block(script) = entry else {
                continue;
            };
            declared.extend(
                script
                    .matches
                    .iter()
                    .filter_map(PatternEntry::as_str)
                    .map(|n| (n, CapabilityKind::ContentScriptMatch)),
            );
        }

        let mut strongest: BTreeMap<String, CapabilityKind> = BTreeMap::new();
        for (raw, kind) in declared {
            let Some((name, kind)) = normalize(raw, kind) else {
                continue;
            };
            strongest
                .entry(name)
                .and_modify(|k| *k = (*k).min(kind))
                .or_insert(kind);
        }

        strongest
            .into_iter()
            .map(|(name, kind)| Capability::new(name, kind))
            .collect()
    }
}

/// Lower-case and trim a declared string; move URL patterns found in the
/// keyword lists to `HostPermission`.
fn normalize(raw: &str, kind: CapabilityKind) -> Option<(String, CapabilityKind)> {
    let name = raw.trim().to_lowercase();
    if name.is_empty() {
        return None;
    }
    let kind = match kind {
        CapabilityKind::Permission | CapabilityKind::OptionalPermission
            if HostPattern::looks_like_pattern(&name) =>
        {
            CapabilityKind::HostPermission
        }
        other => other,
    };
    Some((name, kind))
}
