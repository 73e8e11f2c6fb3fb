use crate::analysis::RiskLevel;
use crate::taxonomy::CapabilityTier;
use crate::{AssessedExtension, AuditReport};

/// Render the audit as plain console text, riskiest extension first.
pub fn render(report: &AuditReport) -> String {
    let mut output = String::new();

    if report.extensions.is_empty() {
        output.push_str("\n  No extensions found.\n");
    } else {
        let mut sorted: Vec<&AssessedExtension> = report.extensions.iter().collect();
        sorted.sort_by(|a, b| {
            b.assessment
                .score
                .cmp(&a.assessment.score)
                .then_with(|| a.manifest.display_name.cmp(&b.manifest.display_name))
        });

        output.push_str(&format!(
            "\n  {} extension(s) audited:\n\n",
            report.extensions.len()
        ));
        for ext in sorted {
            render_extension(&mut output, ext);
        }
    }

    if !report.skipped.is_empty() {
        output.push_str(&format!("  {} entry(ies) skipped:\n", report.skipped.len()));
        for skip in &report.skipped {
            output.push_str(&format!("    [{}] {}\n", skip.reason, skip.path.display()));
        }
        output.push('\n');
    }

    let verdict = &report.verdict;
    let status = if verdict.pass { "PASS" } else { "FAIL" };
    output.push_str(&format!(
        "  Result: {} (threshold: {}, highest score: {})\n\n",
        status,
        verdict.fail_threshold,
        verdict
            .highest_score
            .map(|s| s.to_string())
            .unwrap_or_else(|| "none".into()),
    ));

    output
}

fn render_extension(output: &mut String, ext: &AssessedExtension) {
    let a = &ext.assessment;
    let level_tag = match a.level {
        RiskLevel::High => "[HIGH]    ",
        RiskLevel::Medium => "[MEDIUM]  ",
        RiskLevel::LowMedium => "[LOW-MED] ",
        RiskLevel::Low => "[LOW]     ",
    };

    output.push_str(&format!(
        "  {} {:>3}/100  {} {}\n",
        level_tag, a.score, ext.manifest.display_name, ext.manifest.version
    ));
    if let Some(id) = &ext.manifest.extension_id {
        output.push_str(&format!("           id: {}\n", id));
    }

    if a.contributing_capabilities.is_empty() {
        output.push_str("           no special permissions requested\n");
    }
    for cap in &a.contributing_capabilities {
        let points = if cap.tier == CapabilityTier::Unknown {
            "unrated".to_string()
        } else {
            format!("{} pts", cap.tier.weight())
        };
        output.push_str(&format!(
            "           {:<8} {:<40} {} ({})\n",
            cap.tier.to_string(),
            cap.name,
            points,
            cap.kind
        ));
    }
    output.push('\n');
}
