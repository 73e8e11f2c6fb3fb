use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::discovery::SkippedEntry;
use crate::error::Result;
use crate::policy::PolicyVerdict;
use crate::{AssessedExtension, AuditReport};

#[derive(Serialize)]
struct JsonReport<'a> {
    generated_at: DateTime<Utc>,
    roots: &'a [std::path::PathBuf],
    extensions: &'a [AssessedExtension],
    skipped: &'a [SkippedEntry],
    verdict: &'a PolicyVerdict,
}

/// Render the audit as a JSON report, extensions in discovery order.
pub fn render(report: &AuditReport) -> Result<String> {
    let json = JsonReport {
        generated_at: Utc::now(),
        roots: &report.roots,
        extensions: &report.extensions,
        skipped: &report.skipped,
        verdict: &report.verdict,
    };
    Ok(serde_json::to_string_pretty(&json)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::fixtures;

    #[test]
    fn json_shape() {
        let out = render(&fixtures::report()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert!(value["generated_at"].is_string());
        assert_eq!(value["extensions"].as_array().unwrap().len(), 2);
        let spy = &value["extensions"][1];
        assert_eq!(spy["manifest"]["display_name"], "Page Spy");
        assert_eq!(spy["assessment"]["score"], 100);
        assert_eq!(spy["assessment"]["tier_counts"]["CRITICAL"], 2);
        assert_eq!(
            spy["assessment"]["contributing_capabilities"][0]["kind"],
            "host_permission"
        );
        assert_eq!(value["skipped"][0]["reason"], "malformed");
        assert_eq!(value["verdict"]["pass"], false);
    }
}
