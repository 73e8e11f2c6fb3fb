//! Capability taxonomy: permission keyword and host pattern to severity tier.
//!
//! The table is built once on first use and never mutated. Lookups are
//! case-insensitive because the loader lower-cases every declared string.

pub mod host_pattern;

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::ir::CapabilityKind;
pub use host_pattern::{Breadth, HostPattern};

/// Severity bucket for a declared capability.
///
/// Variants are ordered by weight so `Ord` sorts least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CapabilityTier {
    Unknown,
    Low,
    Medium,
    High,
    Critical,
}

impl CapabilityTier {
    /// Every tier, most severe first.
    pub const ALL: [CapabilityTier; 5] = [
        Self::Critical,
        Self::High,
        Self::Medium,
        Self::Low,
        Self::Unknown,
    ];

    /// Points this tier adds to a risk score.
    pub const fn weight(self) -> u32 {
        match self {
            Self::Critical => 40,
            Self::High => 20,
            Self::Medium => 10,
            Self::Low => 5,
            Self::Unknown => 0,
        }
    }

}

impl std::fmt::Display for CapabilityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Critical => write!(f, "CRITICAL"),
            Self::High => write!(f, "HIGH"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::Low => write!(f, "LOW"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

const CRITICAL_PERMISSIONS: &[&str] = &[
    "all_urls",
    "<all_urls>",
    "webRequestBlocking",
    "debugger",
    "proxy",
    "background",
];

const HIGH_PERMISSIONS: &[&str] = &[
    "history",
    "bookmarks",
    "cookies",
    "storage",
    "unlimitedStorage",
    "downloads",
    "tabs",
    "activeTab",
    "webNavigation",
    "webRequest",
    "management",
    "privacy",
];

const MEDIUM_PERMISSIONS: &[&str] = &[
    "notifications",
    "contextMenus",
    "clipboardRead",
    "clipboardWrite",
    "geolocation",
    "identity",
    "identity.email",
    "desktopCapture",
    "pageCapture",
    "system.cpu",
    "system.memory",
    "system.storage",
];

const LOW_PERMISSIONS: &[&str] = &[
    "alarms",
    "idle",
    "power",
    "printerProvider",
    "printing",
    "printingMetrics",
    "scripting",
    "sidePanel",
    "storage.sync",
    "topSites",
    "tts",
    "ttsEngine",
    "nativeMessaging",
];

static PERMISSION_TIERS: Lazy<HashMap<String, CapabilityTier>> = Lazy::new(|| {
    let groups = [
        (CRITICAL_PERMISSIONS, CapabilityTier::Critical),
        (HIGH_PERMISSIONS, CapabilityTier::High),
        (MEDIUM_PERMISSIONS, CapabilityTier::Medium),
        (LOW_PERMISSIONS, CapabilityTier::Low),
    ];
    groups
        .iter()
        .flat_map(|(names, tier)| names.iter().map(move |n| (n.to_lowercase(), *tier)))
        .collect()
});

/// Resolve the tier of one declared capability.
///
/// Host-style kinds are judged by pattern breadth first: all URLs is
/// `Critical`, a finite host set is `Medium`. Everything else falls through
/// to the keyword table. Names missing from the table are `Unknown`, never
/// an error.
pub fn classify(name: &str, kind: CapabilityKind) -> CapabilityTier {
    if kind.is_host_style() {
        match HostPattern::parse(name).map(|p| p.breadth()) {
            Some(Breadth::AllUrls) => return CapabilityTier::Critical,
            Some(Breadth::Bounded) => return CapabilityTier::Medium,
            Some(Breadth::Unbounded) | None => {}
        }
    }
    lookup(name).unwrap_or(CapabilityTier::Unknown)
}

/// Keyword table lookup only.
pub fn lookup(name: &str) -> Option<CapabilityTier> {
    PERMISSION_TIERS.get(&name.to_lowercase()).copied()
}

/// One row of the keyword table, for listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxonomyEntry {
    pub permission: String,
    pub tier: CapabilityTier,
    pub weight: u32,
}

/// The keyword table, most severe tier first, then by name.
pub fn entries() -> Vec<TaxonomyEntry> {
    let mut rows: Vec<TaxonomyEntry> = [
        CRITICAL_PERMISSIONS,
        HIGH_PERMISSIONS,
        MEDIUM_PERMISSIONS,
        LOW_PERMISSIONS,
    ]
    .iter()
    .flat_map(|names| names.iter())
    .map(|name| {
        let tier = lookup(name).unwrap_or(CapabilityTier::Unknown);
        TaxonomyEntry {
            permission: (*name).to_string(),
            tier,
            weight: tier.weight(),
        }
    })
    .collect();
    rows.sort_by(|a, b| b.tier.cmp(&a.tier).then_with(|| a.permission.cmp(&b.permission)));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_are_fixed() {
        assert_eq!(CapabilityTier::Critical.weight(), 40);
        assert_eq!(CapabilityTier::High.weight(), 20);
        assert_eq!(CapabilityTier::Medium.weight(), 10);
        assert_eq!(CapabilityTier::Low.weight(), 5);
        assert_eq!(CapabilityTier::Unknown.weight(), 0);
    }

    #[test]
    fn ordering_follows_weight() {
        let mut tiers = CapabilityTier::ALL.to_vec();
        tiers.sort();
        let weights: Vec<u32> = tiers.iter().map(|t| t.weight()).collect();
        assert_eq!(weights, vec![0, 5, 10, 20, 40]);
    }

    #[test]
    fn keyword_lookup_ignores_case() {
        assert_eq!(
            classify("clipboardRead", CapabilityKind::Permission),
            CapabilityTier::Medium
        );
        assert_eq!(
            classify("clipboardread", CapabilityKind::Permission),
            CapabilityTier::Medium
        );
        assert_eq!(
            classify("WEBREQUESTBLOCKING", CapabilityKind::OptionalPermission),
            CapabilityTier::Critical
        );
    }

    #[test]
    fn unknown_keyword_is_zero_weight() {
        let tier = classify("someFuturePermission", CapabilityKind::Permission);
        assert_eq!(tier, CapabilityTier::Unknown);
        assert_eq!(tier.weight(), 0);
    }

    #[test]
    fn host_patterns_escalate_by_breadth() {
        assert_eq!(
            classify("*://*/*", CapabilityKind::HostPermission),
            CapabilityTier::Critical
        );
        assert_eq!(
            classify("<all_urls>", CapabilityKind::ContentScriptMatch),
            CapabilityTier::Critical
        );
        assert_eq!(
            classify("https://*.example.com/*", CapabilityKind::HostPermission),
            CapabilityTier::Medium
        );
    }

    #[test]
    fn unbounded_patterns_fall_through_to_table() {
        for raw in ["https://*/api/*", "*://*/", "ws://*/*", "file:///*"] {
            let tier = classify(raw, CapabilityKind::HostPermission);
            assert_eq!(tier, CapabilityTier::Unknown, "{raw}");
            assert_eq!(tier.weight(), 0);
        }
        assert_eq!(
            classify("file:///*", CapabilityKind::ContentScriptMatch),
            CapabilityTier::Unknown
        );
    }

    #[test]
    fn non_pattern_host_entry_falls_back_to_table() {
        assert_eq!(
            classify("tabs", CapabilityKind::HostPermission),
            CapabilityTier::High
        );
        assert_eq!(
            classify("not a pattern", CapabilityKind::HostPermission),
            CapabilityTier::Unknown
        );
    }

    #[test]
    fn pattern_under_permission_kind_uses_table() {
        // Only host-style kinds get pattern treatment.
        assert_eq!(
            classify("https://example.com/*", CapabilityKind::Permission),
            CapabilityTier::Unknown
        );
    }

    #[test]
    fn entries_cover_every_tier_in_order() {
        let rows = entries();
        assert_eq!(rows.first().map(|r| r.tier), Some(CapabilityTier::Critical));
        assert_eq!(rows.last().map(|r| r.tier), Some(CapabilityTier::Low));
        assert!(rows.iter().any(|r| r.permission == "printerProvider"));
    }
}
