use once_cell::sync::Lazy;
use regex::Regex;

/// `<scheme>://<host><path>`; the path is optional so that sloppy entries
/// like `https://example.com` still parse.
static MATCH_PATTERN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\*|[a-z][a-z0-9+.\-]*)://([^/\s]*)(/\S*)?$").unwrap()
});

const ALL_URLS: &str = "<all_urls>";

/// A URL match pattern split into its components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPattern {
    pub scheme: String,
    pub host: String,
    pub path: String,
}

/// How much of the web a pattern grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Breadth {
    /// Every host and every path over the web schemes.
    AllUrls,
    /// Not a finite host set, yet short of all URLs: a wildcard host with
    /// a narrower path or a non-web scheme, or a host-less scheme-wide
    /// grant such as `file:///*`. Graded by the keyword table, not by
    /// breadth.
    Unbounded,
    /// A finite set of hosts.
    Bounded,
}

impl HostPattern {
    /// Parse a match pattern. Returns `None` for anything that is not
    /// shaped like one (plain permission keywords, garbage).
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim().to_lowercase();
        if raw == ALL_URLS {
            return Some(Self {
                scheme: "*".into(),
                host: "*".into(),
                path: "/*".into(),
            });
        }
        let caps = MATCH_PATTERN_RE.captures(&raw)?;
        let scheme = caps[1].to_string();
        let host = caps[2].to_string();
        let path = caps
            .get(3)
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| "/".into());
        Some(Self { scheme, host, path })
    }

    /// Whether a string looks like a URL pattern rather than a keyword.
    pub fn looks_like_pattern(raw: &str) -> bool {
        let raw = raw.trim();
        raw.eq_ignore_ascii_case(ALL_URLS) || raw.contains("://")
    }

    fn is_web_scheme(&self) -> bool {
        matches!(self.scheme.as_str(), "*" | "http" | "https")
    }

    fn is_wildcard_host(&self) -> bool {
        // A port suffix does not narrow the host set.
        self.host == "*" || self.host.starts_with("*:")
    }

    pub fn breadth(&self) -> Breadth {
        if self.host.is_empty() {
            return Breadth::Unbounded;
        }
        if !self.is_wildcard_host() {
            return Breadth::Bounded;
        }
        if self.is_web_scheme() && self.path == "/*" {
            Breadth::AllUrls
        } else {
            Breadth::Unbounded
        }
    }
}
