// sitepilot — embeddable website assistant engine
//
// A chat assistant grounded in the page the visitor is looking at. The
// engine scans the hosting document into a text digest, sends it with the
// user's question to Google Gemini, and translates the bracketed commands
// in the reply ([SCROLL:…], [NAVIGATE:…], [HIGHLIGHT:…]) into actions on an
// injected page surface. Configuration, site map, and conversation memory
// persist as a single Brain blob in a pluggable key/value store.
//
// Layering:
//   atoms/   — pure constants, data types, errors (no I/O)
//   engine/  — scanner, prompt builder, provider, command processor,
//              brain store, assistant orchestrator

pub mod atoms;
pub mod engine;

pub use atoms::error::{AssistError, AssistResult};
pub use atoms::types::{
    Analytics, BehaviorConfig, BehaviorUpdate, Brain, ChatMessage, Command, ConversationTurn,
    ElementTarget, FeatureFlags, LinkRecord, MessageRole, PageContent, PageLocation, SiteMap,
};
pub use engine::assistant::{Assistant, AssistantConfig, PanelState, RequestPhase};
pub use engine::brain::{BrainStore, MemoryStorage, SqliteStorage, Storage};
pub use engine::providers::{GoogleProvider, ProviderError, ResponseProvider};
pub use engine::surface::PageSurface;
