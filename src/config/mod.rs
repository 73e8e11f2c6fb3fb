use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::discovery::DiscoveryOptions;
use crate::error::{GuardError, Result};
use crate::loader::LoadOptions;
use crate::policy::Policy;

pub const DEFAULT_CONFIG_FILE: &str = ".manifestguard.toml";

/// Top-level configuration from `.manifestguard.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scan: ScanSettings,
    #[serde(default)]
    pub policy: Policy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSettings {
    /// Extension roots. Empty means the caller picks (the CLI uses the
    /// platform's browser profile directories).
    #[serde(default)]
    pub roots: Vec<PathBuf>,
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    #[serde(default = "default_max_manifest_bytes")]
    pub max_manifest_bytes: u64,
    #[serde(default = "default_skip_dirs")]
    pub skip_dirs: Vec<String>,
}

fn default_read_timeout_ms() -> u64 {
    2000
}

fn default_max_manifest_bytes() -> u64 {
    1_048_576
}

fn default_skip_dirs() -> Vec<String> {
    vec!["Temp".into()]
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            read_timeout_ms: default_read_timeout_ms(),
            max_manifest_bytes: default_max_manifest_bytes(),
            skip_dirs: default_skip_dirs(),
        }
    }
}

impl ScanSettings {
    pub fn discovery_options(&self) -> DiscoveryOptions {
        DiscoveryOptions {
            load: LoadOptions {
                read_timeout: Duration::from_millis(self.read_timeout_ms),
                max_manifest_bytes: self.max_manifest_bytes,
            },
            skip_dirs: self.skip_dirs.clone(),
        }
    }
}

impl Config {
    /// Load config from a TOML file. Returns default if file doesn't exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.scan.max_manifest_bytes == 0 {
            return Err(GuardError::Config(
                "scan.max_manifest_bytes must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Generate a starter config file.
    pub fn starter_toml() -> &'static str {
        r#"# manifestguard configuration

[scan]
# Extension roots to scan. Leave empty to use the browser profile
# directories detected for this platform.
# roots = ["/home/me/.config/google-chrome/Default/Extensions"]

# Per-file read timeout in milliseconds (0 disables the timeout).
read_timeout_ms = 2000

# Manifests larger than this are reported as malformed.
max_manifest_bytes = 1048576

# Directory names under a root that never hold an extension.
skip_dirs = ["Temp"]

[policy]
# Lowest risk level that fails the scan (low, low_medium, medium, high).
fail_on = "high"

# Extension ids left out of the verdict (still reported).
# ignore_extensions = ["aapbdbdomjkkjkaonfhkkikfgjllcleb"]
"#
    }
}
