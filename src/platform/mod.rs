//! Default extension roots for the current platform.
//!
//! Only the CLI calls this; library scans always take explicit roots.

use std::path::{Path, PathBuf};

/// Candidate Chrome/Chromium extension roots for this OS, whether or not
/// they exist.
pub fn candidate_roots() -> Vec<PathBuf> {
    let Some(home) = dirs::home_dir() else {
        return Vec::new();
    };
    let local = dirs::data_local_dir().unwrap_or_else(|| home.join("AppData").join("Local"));
    roots_for(std::env::consts::OS, &home, &local)
}

/// Candidates that exist as directories.
pub fn existing_roots() -> Vec<PathBuf> {
    candidate_roots().into_iter().filter(|p| p.is_dir()).collect()
}

fn roots_for(os: &str, home: &Path, local_app_data: &Path) -> Vec<PathBuf> {
    let profile = |base: PathBuf| base.join("Default").join("Extensions");
    match os {
        "windows" => ["Chrome", "Chrome Beta", "Chrome Dev"]
            .iter()
            .map(|channel| profile(local_app_data.join("Google").join(channel).join("User Data")))
            .collect(),
        "macos" => ["Chrome", "Chrome Beta"]
            .iter()
            .map(|channel| {
                profile(
                    home.join("Library")
                        .join("Application Support")
                        .join("Google")
                        .join(channel),
                )
            })
            .collect(),
        "linux" => vec![
            profile(home.join(".config").join("google-chrome")),
            profile(home.join(".config").join("chromium")),
            profile(
                home.join(".var")
                    .join("app")
                    .join("com.google.Chrome")
                    .join("config")
                    .join("google-chrome"),
            ),
        ],
        _ => Vec::new(),
    }
}
