use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Canonical prefix of a publicly resolvable share link.
pub const PUBLIC_PREFIX: &str = "https://t.me/";

/// Markers of private-channel (`/c/`), bot (`/b/`), deep-link (`tg://`) and
/// invite (`t.me/+`) forms. Any of these forces a privileged session.
const RESTRICTED_MARKERS: &[&str] = &["/c/", "/b/", "tg://", "t.me/+"];

// ---------------------------------------------------------------------------
// LinkKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    /// Resolvable without logging in.
    Public,
    /// Needs an authenticated session acting as the user.
    Privileged,
}

impl LinkKind {
    pub fn as_str(self) -> &'static str {
        match self {
            LinkKind::Public => "public",
            LinkKind::Privileged => "privileged",
        }
    }

    pub fn needs_session(self) -> bool {
        self == LinkKind::Privileged
    }
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Decide whether `reference` can be fetched anonymously.
///
/// Anything that is not a canonical `https://t.me/` link, or that carries a
/// restricted marker, is `Privileged`. Unrecognised input falls on the
/// privileged side: it fails closed when no session is available.
pub fn classify(reference: &str) -> LinkKind {
    if !reference.starts_with(PUBLIC_PREFIX) {
        return LinkKind::Privileged;
    }
    if RESTRICTED_MARKERS.iter().any(|m| reference.contains(m)) {
        return LinkKind::Privileged;
    }
    LinkKind::Public
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

static LINK_RE: OnceLock<Regex> = OnceLock::new();

/// A link must start the text or follow whitespace or an opening
/// delimiter, so `notat.me/...` never matches as `t.me/...`. Case folding is
/// ASCII-only on the scheme and host literals.
fn link_re() -> &'static Regex {
    LINK_RE.get_or_init(|| {
        Regex::new(
            r#"(?:^|[\s(<\["':,])(?:(?P<deep>(?i-u:tg://)[^\s<>]+)|(?P<web>(?i-u:https?://)?(?i-u:www\.)?(?i-u:t\.me|telegram\.me|telegram\.dog)/[^\s<>]+))"#,
        )
        .unwrap()
    })
}

fn trim_trailing(raw: &str) -> &str {
    raw.trim_end_matches(['.', ',', ';', ':', '!', '?', ')', ']', '"', '\''])
}

/// Pull the first share link out of free-form message text.
///
/// Alternate hosts (`telegram.me`, `telegram.dog`) and scheme-less or
/// `http://` links are rewritten to the canonical `https://t.me/` form so the
/// classifier sees one shape. `tg://` URIs are returned untouched.
pub fn extract_link(text: &str) -> Option<String> {
    let caps = link_re().captures(text)?;

    if let Some(deep) = caps.name("deep") {
        let raw = trim_trailing(deep.as_str());
        // "tg://" is five ASCII bytes; require something after it.
        return (raw.len() > 5).then(|| raw.to_string());
    }

    let raw = trim_trailing(caps.name("web")?.as_str());
    let without_scheme = match raw.find("://") {
        Some(i) => &raw[i + 3..],
        None => raw,
    };
    let path = without_scheme.find('/').map(|i| &without_scheme[i + 1..])?;
    if path.is_empty() {
        return None;
    }
    Some(format!("{PUBLIC_PREFIX}{path}"))
}
