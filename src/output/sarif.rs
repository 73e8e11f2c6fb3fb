use crate::error::Result;
use crate::loader::MANIFEST_FILE;
use crate::taxonomy::CapabilityTier;
use crate::AuditReport;

use serde_json::{json, Value};

/// Tiers reported as SARIF results. Lower tiers stay in console/JSON only.
const REPORTED_TIERS: [CapabilityTier; 2] = [CapabilityTier::Critical, CapabilityTier::High];

/// Render the audit as SARIF 2.1.0.
///
/// One result per CRITICAL or HIGH capability, located at the declaring
/// extension's `manifest.json`.
pub fn render(report: &AuditReport) -> Result<String> {
    let rules: Vec<Value> = REPORTED_TIERS
        .iter()
        .map(|tier| {
            json!({
                "id": rule_id(*tier),
                "name": format!("{}Capability", title_case(*tier)),
                "shortDescription": {
                    "text": format!("Extension declares a {} capability", tier),
                },
                "defaultConfiguration": { "level": tier_to_sarif_level(*tier) },
                "properties": { "weight": tier.weight() },
            })
        })
        .collect();

    let mut results: Vec<Value> = Vec::new();
    for ext in &report.extensions {
        let uri = ext.manifest.source_path.join(MANIFEST_FILE);
        for cap in &ext.assessment.contributing_capabilities {
            if !REPORTED_TIERS.contains(&cap.tier) {
                continue;
            }
            results.push(json!({
                "ruleId": rule_id(cap.tier),
                "level": tier_to_sarif_level(cap.tier),
                "message": {
                    "text": format!(
                        "'{}' {} declares {} '{}' (extension score {}/100)",
                        ext.manifest.display_name,
                        ext.manifest.version,
                        cap.kind,
                        cap.name,
                        ext.assessment.score,
                    ),
                },
                "locations": [{
                    "physicalLocation": {
                        "artifactLocation": { "uri": uri.display().to_string() },
                    },
                }],
                "properties": {
                    "extensionId": ext.manifest.extension_id,
                    "riskScore": ext.assessment.score,
                },
            }));
        }
    }

    let sarif = json!({
        "$schema": "https://docs.oasis-open.org/sarif/sarif/v2.1.0/errata01/os/schemas/sarif-schema-2.1.0.json",
        "version": "2.1.0",
        "runs": [{
            "tool": {
                "driver": {
                    "name": "ManifestGuard",
                    "version": env!("CARGO_PKG_VERSION"),
                    "semanticVersion": env!("CARGO_PKG_VERSION"),
                    "rules": rules,
                },
            },
            "results": results,
        }],
    });

    Ok(serde_json::to_string_pretty(&sarif)?)
}

fn rule_id(tier: CapabilityTier) -> String {
    format!("MANIFESTGUARD-{}", tier)
}

fn title_case(tier: CapabilityTier) -> String {
    let upper = tier.to_string();
    let mut chars = upper.chars();
    match chars.next() {
        Some(first) => first.to_string() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

fn tier_to_sarif_level(tier: CapabilityTier) -> &'static str {
    match tier {
        CapabilityTier::Critical => "error",
        CapabilityTier::High => "warning",
        CapabilityTier::Medium | CapabilityTier::Low | CapabilityTier::Unknown => "note",
    }
}
