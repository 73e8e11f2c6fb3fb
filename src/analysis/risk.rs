//! Saturating 0-100 risk score from declared capabilities.
//!
//! Every distinct capability adds its tier weight once; the total is
//! clamped to 100 after summation. No filesystem or network access.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::ir::{Capability, ExtensionManifest};
use crate::taxonomy::{self, CapabilityTier};

pub const MAX_SCORE: u8 = 100;

/// Result of scoring one manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub score: u8,
    pub level: RiskLevel,
    /// Count per tier; every tier is present, possibly with 0.
    pub tier_counts: BTreeMap<CapabilityTier, usize>,
    /// Most severe first, then by name, then by kind.
    pub contributing_capabilities: Vec<Capability>,
}

impl RiskAssessment {
    pub fn count(&self, tier: CapabilityTier) -> usize {
        self.tier_counts.get(&tier).copied().unwrap_or(0)
    }
}

/// Score a manifest.
pub fn score(manifest: &ExtensionManifest) -> RiskAssessment {
    score_capabilities(manifest.capabilities.iter())
}

/// Score any collection of capabilities; duplicates by `(name, kind)` count once.
pub fn score_capabilities<'a, I>(capabilities: I) -> RiskAssessment
where
    I: IntoIterator<Item = &'a Capability>,
{
    let distinct: BTreeSet<&Capability> = capabilities.into_iter().collect();

    let mut classified: Vec<Capability> = distinct
        .into_iter()
        .map(|c| Capability {
            name: c.name.clone(),
            kind: c.kind,
            tier: taxonomy::classify(&c.name, c.kind),
        })
        .collect();

    let raw: u32 = classified.iter().map(|c| c.tier.weight()).sum();
    let score = raw.min(u32::from(MAX_SCORE)) as u8;

    let mut tier_counts: BTreeMap<CapabilityTier, usize> =
        CapabilityTier::ALL.iter().map(|t| (*t, 0)).collect();
    for cap in &classified {
        *tier_counts.entry(cap.tier).or_insert(0) += 1;
    }

    classified.sort_by(|a, b| {
        b.tier
            .weight()
            .cmp(&a.tier.weight())
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.kind.cmp(&b.kind))
    });

    RiskAssessment {
        score,
        level: RiskLevel::from_score(score),
        tier_counts,
        contributing_capabilities: classified,
    }
}

/// Coarse bucket for a score, used for display and policy thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    LowMedium,
    Medium,
    High,
}

impl RiskLevel {
    pub fn from_score(score: u8) -> Self {
        match score {
            70..=u8::MAX => Self::High,
            40..=69 => Self::Medium,
            20..=39 => Self::LowMedium,
            _ => Self::Low,
        }
    }

    pub fn from_str_lenient(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "low" => Some(Self::Low),
            "low_medium" | "lowmedium" => Some(Self::LowMedium),
            "medium" | "med" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::High => "HIGH RISK",
            Self::Medium => "MEDIUM RISK",
            Self::LowMedium => "LOW-MEDIUM RISK",
            Self::Low => "LOW RISK",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::LowMedium => write!(f, "low-medium"),
            Self::Low => write!(f, "low"),
        }
    }
}
