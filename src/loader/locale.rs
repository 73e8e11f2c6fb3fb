//! `__MSG_key__` placeholder resolution against `_locales/*/messages.json`.

use std::collections::HashMap;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

static MSG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^__MSG_(\w+)__$").unwrap());

const FALLBACK_LOCALES: &[&str] = &["en", "en_US"];

#[derive(Debug, Deserialize)]
struct Message {
    message: String,
}

/// Message catalog for one locale. Keys are case-insensitive.
#[derive(Debug, Default)]
pub struct Messages {
    entries: HashMap<String, String>,
}

impl Messages {
    /// Build a catalog from `messages.json` bytes. Entries without a
    /// `message` string are dropped.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        let raw: HashMap<String, serde_json::Value> = serde_json::from_slice(bytes).ok()?;
        let entries = raw
            .into_iter()
            .filter_map(|(key, value)| {
                let msg: Message = serde_json::from_value(value).ok()?;
                Some((key.to_lowercase(), msg.message))
            })
            .collect();
        Some(Self { entries })
    }

    /// Resolve `text` if it is a placeholder; `None` when it is a
    /// placeholder this catalog lacks or when it is plain text.
    pub fn resolve(&self, text: &str) -> Option<String> {
        let key = placeholder_key(text)?;
        self.entries.get(&key.to_lowercase()).cloned()
    }
}

pub fn placeholder_key(text: &str) -> Option<&str> {
    MSG_RE
        .captures(text.trim())
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Candidate `messages.json` paths, declared default locale first.
pub fn catalog_paths(dir: &Path, default_locale: Option<&str>) -> Vec<std::path::PathBuf> {
    let mut locales: Vec<&str> = Vec::new();
    if let Some(locale) = default_locale {
        locales.push(locale);
    }
    locales.extend(FALLBACK_LOCALES.iter().filter(|l| Some(**l) != default_locale));
    locales
        .into_iter()
        .map(|l| dir.join("_locales").join(l).join("messages.json"))
        .collect()
}
