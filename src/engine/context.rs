// ── Engine: Prompt Builder ─────────────────────────────────────────────────
// Deterministic prompt assembly: persona, page digest, the fixed
// command-grammar block, recent history, the user's question, and a closing
// language instruction. No truncation and no token budgeting — if the
// accumulated context exceeds the model's input limit, the provider call is
// where it fails.

use crate::atoms::constants::PROMPT_HISTORY_TURNS;
use crate::atoms::types::{BehaviorConfig, ConversationTurn};

/// The model is taught three inline commands it may embed in replies. The
/// worked examples matter: without them the model invents its own syntax.
const COMMAND_GRAMMAR: &str = "\
NAVIGÁCIÓS KÉPESSÉGEK:
- Ha a felhasználó kéri, hogy görgess egy elemhez vagy mutass meg valamit, használd a [SCROLL:selector] formátumot
- Ha a felhasználó kéri, hogy menj egy linkre, használd a [NAVIGATE:url] formátumot
- Ha a felhasználó kéri, hogy jelölj ki egy elemet, használd a [HIGHLIGHT:selector] formátumot
- Példák:
  * \"Görgess az akciókhoz\" → [SCROLL:h2:contains('Akció'), .akcio, .actions]
  * \"Mutasd meg a kapcsolat részt\" → [SCROLL:h2:contains('Kapcsolat'), .contact, #contact]
  * \"Menj a főoldalra\" → [NAVIGATE:/]";

/// Fluent assembler for one turn's prompt.
#[derive(Debug, Default)]
pub struct PromptBuilder<'a> {
    persona: &'a str,
    language: &'a str,
    site_digest: &'a str,
    history: &'a [ConversationTurn],
    user_message: &'a str,
}

impl<'a> PromptBuilder<'a> {
    pub fn new(behavior: &'a BehaviorConfig) -> Self {
        PromptBuilder {
            persona: &behavior.personality,
            language: &behavior.language,
            ..Default::default()
        }
    }

    /// Attach the page scanner's digest block (opaque text).
    pub fn site_digest(mut self, digest: &'a str) -> Self {
        self.site_digest = digest;
        self
    }

    /// Attach conversation history, oldest first. Only the most recent
    /// `PROMPT_HISTORY_TURNS` turns are rendered.
    pub fn history(mut self, turns: &'a [ConversationTurn]) -> Self {
        self.history = turns;
        self
    }

    pub fn user_message(mut self, message: &'a str) -> Self {
        self.user_message = message;
        self
    }

    pub fn build(self) -> String {
        let recent = &self.history[self.history.len().saturating_sub(PROMPT_HISTORY_TURNS)..];
        let history_block = recent
            .iter()
            .map(|t| format!("Felhasználó: {}\nAsszisztens: {}", t.user, t.assistant))
            .collect::<Vec<_>>()
            .join("\n\n");

        format!(
            "{persona}\n\n\
             WEBOLDAL INFORMÁCIÓK:\n{digest}\n\n\
             {grammar}\n\n\
             BESZÉLGETÉS TÖRTÉNET:\n{history}\n\n\
             JELENLEGI KÉRDÉS: {message}\n\n\
             Kérlek válaszolj {language} nyelven, segítőkész módon, és használd fel a weboldal \
             információit a válaszadáshoz. Ha a felhasználó navigációt kér (görgetés, oldal \
             váltás, elem megjelenítése), használd a megfelelő parancsokat. Ha nem tudod a \
             választ, segíts a felhasználónak megtalálni a megfelelő oldalt vagy információt.",
            persona = self.persona,
            digest = self.site_digest,
            grammar = COMMAND_GRAMMAR,
            history = history_block,
            message = self.user_message,
            language = self.language,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(n: usize) -> ConversationTurn {
        ConversationTurn {
            timestamp: format!("2026-08-08T10:00:0{}Z", n),
            user: format!("kérdés {}", n),
            assistant: format!("válasz {}", n),
        }
    }

    #[test]
    fn test_prompt_contains_all_blocks_in_order() {
        let behavior = BehaviorConfig::default();
        let history = vec![turn(1)];
        let prompt = PromptBuilder::new(&behavior)
            .site_digest("Oldal címe: Teszt\n")
            .history(&history)
            .user_message("Hol a kapcsolat?")
            .build();

        let persona_at = prompt.find(&behavior.personality).unwrap();
        let digest_at = prompt.find("WEBOLDAL INFORMÁCIÓK:").unwrap();
        let grammar_at = prompt.find("NAVIGÁCIÓS KÉPESSÉGEK:").unwrap();
        let history_at = prompt.find("BESZÉLGETÉS TÖRTÉNET:").unwrap();
        let question_at = prompt.find("JELENLEGI KÉRDÉS: Hol a kapcsolat?").unwrap();
        assert!(persona_at < digest_at);
        assert!(digest_at < grammar_at);
        assert!(grammar_at < history_at);
        assert!(history_at < question_at);
        assert!(prompt.contains("Kérlek válaszolj hu nyelven"));
        assert!(prompt.contains("[SCROLL:h2:contains('Kapcsolat'), .contact, #contact]"));
    }

    #[test]
    fn test_history_window_is_last_five_turns() {
        let behavior = BehaviorConfig::default();
        let history: Vec<ConversationTurn> = (0..8).map(turn).collect();
        let prompt = PromptBuilder::new(&behavior)
            .history(&history)
            .user_message("x")
            .build();
        assert!(!prompt.contains("kérdés 2"));
        assert!(prompt.contains("kérdés 3"));
        assert!(prompt.contains("kérdés 7"));
    }

    #[test]
    fn test_empty_history_renders_empty_block() {
        let behavior = BehaviorConfig::default();
        let prompt = PromptBuilder::new(&behavior).user_message("x").build();
        assert!(prompt.contains("BESZÉLGETÉS TÖRTÉNET:\n\n"));
    }
}
