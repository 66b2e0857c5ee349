// ── Engine: Credential Resolution ──────────────────────────────────────────
// The API key can arrive from several places. Instead of nested
// conditionals, precedence is an explicit ordered list of providers, each
// polled in turn; the first non-empty value wins. That makes the policy
// enumerable and testable.
//
// Order: process environment → host-supplied runtime config → persisted
// Brain → none. With no key the assistant degrades to a fixed warning
// response and never touches the network.

use log::{info, warn};

use crate::atoms::constants::ENV_API_KEYS;

pub trait CredentialProvider {
    /// Source name for logs.
    fn name(&self) -> &'static str;

    /// The key this source can offer, if any. Empty strings count as absent.
    fn resolve(&self) -> Option<String>;
}

/// `SITEPILOT_API_KEY` / `GEMINI_API_KEY` from the process environment.
pub struct EnvCredential;

impl CredentialProvider for EnvCredential {
    fn name(&self) -> &'static str {
        "environment"
    }

    fn resolve(&self) -> Option<String> {
        ENV_API_KEYS.iter().find_map(|var| std::env::var(var).ok())
    }
}

/// A key the host application passed in at construction time.
pub struct HostCredential(pub Option<String>);

impl CredentialProvider for HostCredential {
    fn name(&self) -> &'static str {
        "host config"
    }

    fn resolve(&self) -> Option<String> {
        self.0.clone()
    }
}

/// The key stored inside the persisted Brain, lowest priority.
pub struct BrainCredential(pub Option<String>);

impl CredentialProvider for BrainCredential {
    fn name(&self) -> &'static str {
        "persisted brain"
    }

    fn resolve(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Poll the providers in order; first non-empty value wins.
pub fn resolve_api_key(providers: &[&dyn CredentialProvider]) -> Option<String> {
    for provider in providers {
        match provider.resolve() {
            Some(key) if !key.trim().is_empty() => {
                info!("[config] API key resolved from {}", provider.name());
                return Some(key);
            }
            _ => {}
        }
    }
    warn!("[config] no API key found in any credential source");
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(&'static str, Option<&'static str>);

    impl CredentialProvider for Fixed {
        fn name(&self) -> &'static str {
            self.0
        }
        fn resolve(&self) -> Option<String> {
            self.1.map(String::from)
        }
    }

    #[test]
    fn test_first_non_empty_wins() {
        let first = Fixed("first", Some("key-1"));
        let second = Fixed("second", Some("key-2"));
        let key = resolve_api_key(&[&first, &second]);
        assert_eq!(key.as_deref(), Some("key-1"));
    }

    #[test]
    fn test_empty_and_missing_sources_are_skipped() {
        let missing = Fixed("missing", None);
        let blank = Fixed("blank", Some("   "));
        let real = Fixed("real", Some("key"));
        let key = resolve_api_key(&[&missing, &blank, &real]);
        assert_eq!(key.as_deref(), Some("key"));
    }

    #[test]
    fn test_no_source_yields_none() {
        let missing = Fixed("missing", None);
        assert!(resolve_api_key(&[&missing]).is_none());
        assert!(resolve_api_key(&[]).is_none());
    }
}
