// ── Atoms: Constants ───────────────────────────────────────────────────────
// All named constants for the crate live here.
// Rationale: collecting constants in one place eliminates magic strings,
// makes auditing easier, and keeps every layer's code self-documenting.

// ── Persistence ────────────────────────────────────────────────────────────
// Key under which the serialized Brain blob is stored in the key/value
// backend. Changing it orphans existing installations — treat as stable.
pub const BRAIN_KEY: &str = "assistant_brain";

/// Current Brain schema version, written into fresh default Brains.
pub const BRAIN_VERSION: &str = "1.0.0";

// ── Gemini endpoint ────────────────────────────────────────────────────────

pub const GOOGLE_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const GOOGLE_MODEL: &str = "gemini-2.0-flash";

// Fixed generation parameters — one request per user turn, no streaming.
pub const GENERATION_TEMPERATURE: f64 = 0.7;
pub const GENERATION_TOP_K: u32 = 40;
pub const GENERATION_TOP_P: f64 = 0.95;
pub const GENERATION_MAX_OUTPUT_TOKENS: u32 = 512;

// ── Credential resolution ──────────────────────────────────────────────────
// Environment variables polled first in the credential chain, in this order.
pub const ENV_API_KEYS: [&str; 2] = ["SITEPILOT_API_KEY", "GEMINI_API_KEY"];

// ── Page digest caps ───────────────────────────────────────────────────────

pub const DIGEST_MAX_HEADINGS: usize = 10;
pub const DIGEST_MAX_SECTIONS: usize = 5;
pub const DIGEST_MAX_FLAGGED: usize = 5;
/// Flagged-element text is clipped to this many characters in the digest.
pub const DIGEST_FLAGGED_TEXT_CHARS: usize = 50;

// ── Page content extraction ────────────────────────────────────────────────

pub const CONTENT_MAX_PARAGRAPHS: usize = 10;
/// Paragraphs at or under this length are treated as noise and skipped.
pub const CONTENT_MIN_PARAGRAPH_CHARS: usize = 20;

// ── Prompt assembly ────────────────────────────────────────────────────────

/// Number of most recent conversation turns rendered into the prompt.
pub const PROMPT_HISTORY_TURNS: usize = 5;

// ── Temporary highlight effect ─────────────────────────────────────────────

pub const HIGHLIGHT_DEFAULT_MS: u64 = 2000;
/// HIGHLIGHT commands hold the effect longer than scroll-triggered flashes.
pub const HIGHLIGHT_COMMAND_MS: u64 = 3000;
/// Delay between the visual revert and the transition-property revert.
pub const HIGHLIGHT_REVERT_SETTLE_MS: u64 = 300;

pub const HIGHLIGHT_OUTLINE: &str = "3px solid #007AFF";
pub const HIGHLIGHT_BACKGROUND: &str = "rgba(0, 122, 255, 0.1)";
pub const HIGHLIGHT_TRANSITION: &str = "all 0.3s ease";

// ── Canned user-facing responses (Hungarian, like the rest of the persona) ─

pub const MSG_MISSING_KEY: &str =
    "Sajnos nem találom az API kulcsot. Ellenőrizd a konzolt további információkért.";
pub const MSG_OVERLOADED: &str =
    "A Gemini modell jelenleg túlterhelt. Kérlek próbáld újra néhány másodperc múlva.";
pub const MSG_RATE_LIMITED: &str =
    "Elértük az API kérések limitjét. Kérlek próbáld újra később.";
pub const MSG_AUTH_FAILED: &str =
    "API kulcs hitelesítési hiba. Ellenőrizd, hogy az API kulcs érvényes-e.";
pub const MSG_GENERIC_FAILURE: &str =
    "Sajnos most nem tudok válaszolni. Ellenőrizd az API kulcsot és az internetkapcsolatot. Részletek a konzolban.";

pub const MSG_WELCOME: &str =
    "Szia! Segíthetek navigálni ezen a weboldalon. Kérdezz bármit!";

// ── Default behavior ───────────────────────────────────────────────────────

pub const DEFAULT_PERSONALITY: &str =
    "Segítőkész asszisztens vagyok, aki ismeri ezt a weboldalt és segítek a felhasználóknak navigálni.";
pub const DEFAULT_TONE: &str = "barátságos";
pub const DEFAULT_LANGUAGE: &str = "hu";
