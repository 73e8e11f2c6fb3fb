//! Risk analysis over parsed manifests.

pub mod risk;

pub use risk::{score, RiskAssessment, RiskLevel};
