//! ManifestGuard: offline browser extension auditor.
//!
//! Reads each installed extension's `manifest.json`, classifies every
//! declared capability into a severity tier and folds the tiers into a
//! saturating 0-100 risk score.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::path::PathBuf;
//! use manifestguard::{audit, ScanOptions};
//!
//! let options = ScanOptions {
//!     roots: vec![PathBuf::from("/home/me/.config/google-chrome/Default/Extensions")],
//!     ..ScanOptions::default()
//! };
//! let report = audit(&options).unwrap();
//! for ext in &report.extensions {
//!     println!("{}: {}/100", ext.manifest.display_name, ext.assessment.score);
//! }
//! ```

pub mod analysis;
pub mod config;
pub mod discovery;
pub mod error;
pub mod explain;
pub mod ir;
pub mod loader;
pub mod output;
pub mod platform;
pub mod policy;
pub mod taxonomy;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use analysis::{RiskAssessment, RiskLevel};
use config::{Config, DEFAULT_CONFIG_FILE};
use discovery::{ScanEntry, SkippedEntry};
use error::{GuardError, Result};
use ir::ExtensionManifest;
use output::OutputFormat;
use policy::PolicyVerdict;

/// Options for an audit invocation.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Path to config file (defaults to `.manifestguard.toml` in the
    /// working directory).
    pub config_path: Option<PathBuf>,
    /// Roots to scan; overrides `scan.roots` from the config.
    pub roots: Vec<PathBuf>,
    /// Fall back to the platform's browser profile directories when no
    /// roots are given anywhere.
    pub use_platform_roots: bool,
    /// Output format.
    pub format: OutputFormat,
    /// CLI override for the policy's fail_on level.
    pub fail_on_override: Option<RiskLevel>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            config_path: None,
            roots: Vec::new(),
            use_platform_roots: false,
            format: OutputFormat::Console,
            fail_on_override: None,
        }
    }
}

/// A manifest together with its score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessedExtension {
    pub manifest: ExtensionManifest,
    pub assessment: RiskAssessment,
}

/// Score one manifest.
pub fn assess(manifest: ExtensionManifest) -> AssessedExtension {
    let assessment = analysis::score(&manifest);
    AssessedExtension {
        manifest,
        assessment,
    }
}

/// Complete audit report. Extensions and skips are in discovery order.
#[derive(Debug)]
pub struct AuditReport {
    pub roots: Vec<PathBuf>,
    pub extensions: Vec<AssessedExtension>,
    pub skipped: Vec<SkippedEntry>,
    pub verdict: PolicyVerdict,
}

/// Run a complete audit: resolve roots, discover, score, evaluate policy.
pub fn audit(options: &ScanOptions) -> Result<AuditReport> {
    let config_path = options
        .config_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let mut config = Config::load(&config_path)?;

    if let Some(fail_on) = options.fail_on_override {
        config.policy.fail_on = fail_on;
    }

    let roots = resolve_roots(options, &config)?;
    let discovery = discovery::scan_with(&roots, config.scan.discovery_options())?;

    let mut extensions = Vec::new();
    let mut skipped = Vec::new();
    for entry in discovery {
        match entry {
            ScanEntry::Extension(manifest) => extensions.push(assess(manifest)),
            ScanEntry::Skipped(skip) => skipped.push(skip),
        }
    }

    tracing::info!(
        extensions = extensions.len(),
        skipped = skipped.len(),
        "scan complete"
    );

    let verdict = config.policy.evaluate(&extensions, skipped.len());

    Ok(AuditReport {
        roots,
        extensions,
        skipped,
        verdict,
    })
}

fn resolve_roots(options: &ScanOptions, config: &Config) -> Result<Vec<PathBuf>> {
    if !options.roots.is_empty() {
        return Ok(options.roots.clone());
    }
    if !config.scan.roots.is_empty() {
        return Ok(config.scan.roots.clone());
    }
    if options.use_platform_roots {
        let detected = platform::existing_roots();
        if !detected.is_empty() {
            return Ok(detected);
        }
    }
    Err(GuardError::NoRoots)
}

/// Render an audit report in the specified format.
pub fn render_report(report: &AuditReport, format: OutputFormat) -> Result<String> {
    output::render(report, format)
}
