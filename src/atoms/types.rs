// ── Atoms: Pure Data Types ─────────────────────────────────────────────────
// All plain struct/enum definitions with no logic.
// Atoms layer rule: no I/O, no side effects, no imports from engine/.

use serde::{Deserialize, Serialize};

use crate::atoms::constants::{BRAIN_VERSION, DEFAULT_LANGUAGE, DEFAULT_PERSONALITY, DEFAULT_TONE};

// ── Brain: the full persisted configuration and memory ─────────────────────

/// Everything the assistant knows, persisted as one JSON blob and
/// overwritten wholesale on every mutation. No partial updates, no
/// multi-writer coordination — concurrent tabs can clobber each other.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Brain {
    pub version: String,
    pub config: BrainConfig,
    #[serde(rename = "siteMap")]
    pub site_map: SiteMap,
    pub conversations: Vec<ConversationTurn>,
    pub analytics: Analytics,
}

impl Default for Brain {
    fn default() -> Self {
        Brain {
            version: BRAIN_VERSION.into(),
            config: BrainConfig::default(),
            site_map: SiteMap::default(),
            conversations: Vec::new(),
            analytics: Analytics::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BrainConfig {
    /// Persisted API key — lowest-priority credential source.
    #[serde(rename = "apiKey", skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub behavior: BehaviorConfig,
    pub features: FeatureFlags,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BehaviorConfig {
    pub personality: String,
    pub tone: String,
    pub language: String,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        BehaviorConfig {
            personality: DEFAULT_PERSONALITY.into(),
            tone: DEFAULT_TONE.into(),
            language: DEFAULT_LANGUAGE.into(),
        }
    }
}

/// Partial behavior update applied through the host control surface.
/// `None` fields keep their current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BehaviorUpdate {
    pub personality: Option<String>,
    pub tone: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct FeatureFlags {
    pub auto_scan: bool,
    pub deep_scan: bool,
    pub cache_results: bool,
    pub floating_widget: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        FeatureFlags { auto_scan: true, deep_scan: true, cache_results: true, floating_widget: true }
    }
}

// ── Site map ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SiteMap {
    /// ISO-8601 stamp of the last scan, `None` before the first.
    #[serde(rename = "lastScan")]
    pub last_scan: Option<String>,
    /// Discovered page paths, unique, in discovery order.
    pub pages: Vec<String>,
    /// Extracted content per path. Overwritten on rescan.
    pub content: std::collections::BTreeMap<String, PageContent>,
}

/// Content extracted from one page, at most once per page load.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PageContent {
    pub title: String,
    pub headings: Vec<String>,
    pub paragraphs: Vec<String>,
    pub links: Vec<LinkRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LinkRecord {
    pub text: String,
    pub href: String,
}

// ── Conversation memory ────────────────────────────────────────────────────

/// One completed exchange. Immutable once created; the assistant text is
/// post command-stripping.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationTurn {
    /// ISO-8601 creation stamp.
    pub timestamp: String,
    pub user: String,
    pub assistant: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Analytics {
    /// Always equals `conversations.len()`.
    pub total_queries: u64,
    /// Keyed by the lower-cased verbatim user input. Near-duplicate
    /// phrasings fragment the counter; that is recorded behavior.
    pub popular_questions: std::collections::BTreeMap<String, u64>,
    pub user_satisfaction: Vec<serde_json::Value>,
}

// ── Widget messages ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub text: String,
}

// ── Page actions ───────────────────────────────────────────────────────────

/// A directive parsed out of one model reply. Transient: executed once,
/// never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Command {
    /// Scroll the first resolvable candidate into view and flash it.
    Scroll { selectors: Vec<String> },
    /// Leave the page, or scroll to an in-page anchor for `#…` targets.
    Navigate { url: String },
    /// Flash the first resolvable candidate without scrolling.
    Highlight { selectors: Vec<String> },
}

/// Addresses "the `index`-th element matching `selector`" on the rendering
/// surface. Resolution happens in core; the surface only acts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ElementTarget {
    pub selector: String,
    pub index: usize,
}

impl ElementTarget {
    pub fn new(selector: impl Into<String>, index: usize) -> Self {
        ElementTarget { selector: selector.into(), index }
    }
}

/// Where the surface currently is.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageLocation {
    /// Full URL, e.g. `https://example.hu/szolgaltatasok`.
    pub href: String,
    /// Path component, e.g. `/szolgaltatasok`.
    pub path: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_brain_roundtrip_is_field_for_field_equal() {
        let mut brain = Brain::default();
        brain.site_map.pages = vec!["/".into(), "/kapcsolat".into()];
        brain.site_map.content.insert(
            "/".into(),
            PageContent {
                title: "Főoldal".into(),
                headings: vec!["Üdvözlünk".into()],
                paragraphs: vec!["Ez egy hosszabb bekezdés a főoldalról.".into()],
                links: vec![LinkRecord { text: "Kapcsolat".into(), href: "/kapcsolat".into() }],
            },
        );
        brain.conversations.push(ConversationTurn {
            timestamp: "2026-08-08T10:00:00Z".into(),
            user: "Hol a kapcsolat?".into(),
            assistant: "Lent találod.".into(),
        });
        brain.analytics.total_queries = 1;
        brain.analytics.popular_questions.insert("hol a kapcsolat?".into(), 1);

        let json = serde_json::to_string(&brain).unwrap();
        let back: Brain = serde_json::from_str(&json).unwrap();
        assert_eq!(brain, back);
    }

    #[test]
    fn test_partial_brain_json_fills_defaults() {
        // A bootstrap brain.json usually ships only config fields.
        let back: Brain = serde_json::from_str(
            r#"{"config":{"apiKey":"k","behavior":{"tone":"formális"}}}"#,
        )
        .unwrap();
        assert_eq!(back.version, BRAIN_VERSION);
        assert_eq!(back.config.api_key.as_deref(), Some("k"));
        assert_eq!(back.config.behavior.tone, "formális");
        assert_eq!(back.config.behavior.language, DEFAULT_LANGUAGE);
        assert!(back.config.features.auto_scan);
        assert!(back.conversations.is_empty());
    }

    #[test]
    fn test_command_serde_tagging() {
        let cmd = Command::Scroll { selectors: vec![".contact".into()] };
        let json = serde_json::to_string(&cmd).unwrap();
        assert!(json.contains(r#""action":"scroll""#));
    }
}
