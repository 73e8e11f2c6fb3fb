//! Explanation requests for an external text summarizer.
//!
//! The payload carries the display name and `(capability, tier)` pairs and
//! nothing else: no paths, no extension ids, no file content. Sending it
//! anywhere is the caller's business.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::analysis::RiskAssessment;
use crate::taxonomy::CapabilityTier;

/// System instruction to pair with [`ExplanationPayload::prompt`].
pub const SYSTEM_PROMPT: &str =
    "You are a helpful cybersecurity educator. Explain technical concepts in plain English.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplainedCapability {
    pub name: String,
    pub tier: CapabilityTier,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplanationPayload {
    pub display_name: String,
    /// Same order as the assessment's contributing capabilities.
    pub capabilities: Vec<ExplainedCapability>,
}

/// Build the summarizer payload for one scored extension.
pub fn build_request(assessment: &RiskAssessment, manifest_name: &str) -> ExplanationPayload {
    ExplanationPayload {
        display_name: manifest_name.to_string(),
        capabilities: assessment
            .contributing_capabilities
            .iter()
            .map(|c| ExplainedCapability {
                name: c.name.clone(),
                tier: c.tier,
            })
            .collect(),
    }
}

impl ExplanationPayload {
    /// User prompt text for a chat-style summarizer.
    pub fn prompt(&self) -> String {
        let mut out = String::new();
        out.push_str(
            "You are a cybersecurity expert explaining browser extension permissions \
             to a beginner user.\n\n",
        );
        out.push_str(&format!("Extension: {}\n\n", self.display_name));

        if self.capabilities.is_empty() {
            out.push_str("Declared capabilities: none\n");
        } else {
            out.push_str("Declared capabilities:\n");
            for cap in &self.capabilities {
                out.push_str(&format!("- {} ({})\n", cap.name, cap.tier));
            }
        }

        out.push_str(
            "\nPlease answer in these sections:\n\n\
             ## What This Extension Can Do\n\
             Explain in simple terms what access this extension has to the browser and data.\n\n\
             ## Potential Privacy Risks\n\
             List specific risks based on the capabilities, one bullet each.\n\n\
             ## Real-World Attack Scenarios\n\
             Describe 2-3 realistic ways a malicious actor could abuse these capabilities.\n\n\
             ## Should You Be Concerned?\n\
             Give a balanced assessment.\n\n\
             Keep it concise, beginner-friendly and actionable.\n",
        );
        out
    }

    /// Stable key for caching summaries: hex SHA-256 of the payload JSON.
    ///
    /// Equal payloads always produce equal keys, so an unchanged extension
    /// never needs a second summarizer call.
    pub fn cache_key(&self) -> String {
        let canonical = serde_json::to_vec(self).unwrap_or_default();
        hex::encode(Sha256::digest(&canonical))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::score;
    use crate::ir::{Capability, ExtensionManifest};

    fn assessed() -> (ExtensionManifest, RiskAssessment) {
        let m = ExtensionManifest::new(
            "/home/user/.config/google-chrome/Default/Extensions/abcdef/1.0_0",
            "Tab Saver",
            "1.0",
            [Capability::permission("tabs"), Capability::host("<all_urls>")],
        )
        .with_extension_id("abcdef");
        let a = score(&m);
        (m, a)
    }

    #[test]
    fn payload_keeps_only_names_and_tiers() {
        let (m, a) = assessed();
        let p = build_request(&a, &m.display_name);
        assert_eq!(p.display_name, "Tab Saver");
        assert_eq!(
            p.capabilities,
            vec![
                ExplainedCapability {
                    name: "<all_urls>".into(),
                    tier: CapabilityTier::Critical
                },
                ExplainedCapability {
                    name: "tabs".into(),
                    tier: CapabilityTier::High
                },
            ]
        );

        let json = serde_json::to_string(&p).unwrap();
        assert!(!json.contains("abcdef"));
        assert!(!json.contains("google-chrome"));
        assert!(!p.prompt().contains("abcdef"));
    }

    #[test]
    fn prompt_lists_capabilities_with_tiers() {
        let (m, a) = assessed();
        let prompt = build_request(&a, &m.display_name).prompt();
        assert!(prompt.contains("Extension: Tab Saver"));
        assert!(prompt.contains("- <all_urls> (CRITICAL)"));
        assert!(prompt.contains("- tabs (HIGH)"));
        assert!(prompt.contains("## Should You Be Concerned?"));
    }

    #[test]
    fn empty_assessment_prompt() {
        let m = ExtensionManifest::new("/x", "Plain", "1", []);
        let p = build_request(&score(&m), "Plain");
        assert!(p.capabilities.is_empty());
        assert!(p.prompt().contains("Declared capabilities: none"));
    }

    #[test]
    fn cache_key_is_stable_and_content_sensitive() {
        let (m, a) = assessed();
        let p1 = build_request(&a, &m.display_name);
        let p2 = build_request(&score(&m), &m.display_name);
        assert_eq!(p1.cache_key(), p2.cache_key());
        assert_eq!(p1.cache_key().len(), 64);

        let renamed = build_request(&a, "Other");
        assert_ne!(p1.cache_key(), renamed.cache_key());
    }
}
