// ── Engine: Assistant ──────────────────────────────────────────────────────
// The widget controller. Owns the Brain for its process lifetime, the
// open/closed panel state machine, the message list, and the send pipeline:
//
//   user text → prompt (digest + history) → provider → command processing
//             → message list → conversation log → persisted Brain
//
// The host constructs the instance explicitly and keeps the reference —
// there is no global. Every failure is absorbed into a canned reply or a
// log line; nothing here can take the hosting page down.

use std::sync::Arc;

use log::{info, warn};
use parking_lot::Mutex;

use crate::atoms::constants::{ENV_API_KEYS, MSG_MISSING_KEY, MSG_WELCOME};
use crate::atoms::types::{
    Analytics, BehaviorUpdate, Brain, ChatMessage, MessageRole,
};
use crate::engine::brain::{record_turn, BrainStore, Storage};
use crate::engine::commands;
use crate::engine::config::{
    resolve_api_key, BrainCredential, CredentialProvider, EnvCredential, HostCredential,
};
use crate::engine::context::PromptBuilder;
use crate::engine::providers::{fallback_message, GoogleProvider, ResponseProvider};
use crate::engine::scanner;
use crate::engine::surface::PageSurface;

// ── Host-supplied construction config ──────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct AssistantConfig {
    /// Runtime-supplied API key; second in the credential chain.
    pub api_key: Option<String>,
    /// Optional URL of a hosted default Brain (the original setup ships a
    /// `brain.json` next to the embedding script). Fetched once, only when
    /// nothing is persisted yet.
    pub bootstrap_url: Option<String>,
}

// ── Widget state machine ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelState {
    Closed,
    Open,
}

/// Orthogonal sub-state per pending request. Entering `AwaitingResponse`
/// disables the send control and shows the typing indicator; settling
/// re-enables and hides. This is a cooperative-UI guarantee, not a lock —
/// a programmatic second send is not rejected, and the later settle wins
/// the message list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestPhase {
    Idle,
    AwaitingResponse,
}

struct WidgetState {
    panel: PanelState,
    phase: RequestPhase,
    send_enabled: bool,
    typing: bool,
    messages: Vec<ChatMessage>,
}

// ── Assistant ──────────────────────────────────────────────────────────────

pub struct Assistant {
    surface: Arc<dyn PageSurface>,
    store: BrainStore,
    brain: Mutex<Brain>,
    provider: Mutex<Option<Arc<dyn ResponseProvider>>>,
    state: Mutex<WidgetState>,
}

impl Assistant {
    /// Load the Brain, resolve credentials, and (when `autoScan` is on)
    /// run the initial site scan.
    pub async fn new(
        config: AssistantConfig,
        storage: Arc<dyn Storage>,
        surface: Arc<dyn PageSurface>,
    ) -> Self {
        let store = BrainStore::new(storage);
        let mut brain = store.load(config.bootstrap_url.as_deref()).await;

        let host_key = HostCredential(config.api_key.clone());
        let persisted_key = BrainCredential(brain.config.api_key.clone());
        let chain: [&dyn CredentialProvider; 3] = [&EnvCredential, &host_key, &persisted_key];
        let provider: Option<Arc<dyn ResponseProvider>> = resolve_api_key(&chain)
            .map(|key| Arc::new(GoogleProvider::new(key)) as Arc<dyn ResponseProvider>);

        if brain.config.features.auto_scan {
            let count = scanner::scan_site(surface.as_ref(), &mut brain);
            store.save(&brain);
            info!("[assistant] initial site scan, {} pages known", count);
        }

        info!(
            "[assistant] initialized, api key {}",
            if provider.is_some() { "configured" } else { "missing" }
        );

        Assistant {
            surface,
            store,
            brain: Mutex::new(brain),
            provider: Mutex::new(provider),
            state: Mutex::new(WidgetState {
                panel: PanelState::Closed,
                phase: RequestPhase::Idle,
                send_enabled: true,
                typing: false,
                messages: vec![ChatMessage { role: MessageRole::Assistant, text: MSG_WELCOME.into() }],
            }),
        }
    }

    /// Swap the response backend. Hosts use this to route through a proxy;
    /// tests use it to script replies.
    pub fn with_provider(self, provider: Arc<dyn ResponseProvider>) -> Self {
        *self.provider.lock() = Some(provider);
        self
    }

    // ── Panel state machine ────────────────────────────────────────────

    pub fn toggle(&self) -> PanelState {
        let mut state = self.state.lock();
        state.panel = match state.panel {
            PanelState::Closed => PanelState::Open,
            PanelState::Open => PanelState::Closed,
        };
        state.panel
    }

    pub fn open(&self) {
        self.state.lock().panel = PanelState::Open;
    }

    pub fn close(&self) {
        self.state.lock().panel = PanelState::Closed;
    }

    /// Escape is only observed while the panel is open.
    pub fn handle_escape(&self) {
        let mut state = self.state.lock();
        if state.panel == PanelState::Open {
            state.panel = PanelState::Closed;
        }
    }

    pub fn panel(&self) -> PanelState {
        self.state.lock().panel
    }

    pub fn phase(&self) -> RequestPhase {
        self.state.lock().phase
    }

    pub fn send_enabled(&self) -> bool {
        self.state.lock().send_enabled
    }

    pub fn is_typing(&self) -> bool {
        self.state.lock().typing
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.state.lock().messages.clone()
    }

    // ── Send pipeline ──────────────────────────────────────────────────

    /// One full user turn. Returns the displayed assistant text, or `None`
    /// for blank input. Closing the panel mid-flight does not cancel the
    /// request; the settled reply still lands in the message list.
    pub async fn send(&self, input: &str) -> Option<String> {
        let message = input.trim();
        if message.is_empty() {
            return None;
        }

        {
            let mut state = self.state.lock();
            state.messages.push(ChatMessage { role: MessageRole::User, text: message.into() });
            state.phase = RequestPhase::AwaitingResponse;
            state.send_enabled = false;
            state.typing = true;
        }

        let prompt = {
            let brain = self.brain.lock();
            let digest = scanner::digest(self.surface.as_ref(), &brain);
            PromptBuilder::new(&brain.config.behavior)
                .site_digest(&digest)
                .history(&brain.conversations)
                .user_message(message)
                .build()
        };

        let provider = self.provider.lock().clone();
        let raw = match provider {
            None => {
                warn!("[assistant] no API key, answering with the canned notice");
                MSG_MISSING_KEY.to_string()
            }
            Some(provider) => match provider.generate(&prompt).await {
                Ok(text) => text,
                Err(e) => {
                    warn!("[assistant] provider failure: {}", e);
                    fallback_message(&e).to_string()
                }
            },
        };

        let parsed = commands::parse_reply(&raw);
        commands::execute(&self.surface, &parsed.commands).await;
        let display = parsed.display_text;

        {
            let mut state = self.state.lock();
            state.messages.push(ChatMessage { role: MessageRole::Assistant, text: display.clone() });
            state.phase = RequestPhase::Idle;
            state.send_enabled = true;
            state.typing = false;
        }

        {
            let mut brain = self.brain.lock();
            record_turn(&mut brain, message, &display);
            self.store.save(&brain);
        }

        Some(display)
    }

    // ── Host control surface ───────────────────────────────────────────

    /// Merge a partial behavior update into the Brain and persist.
    pub fn update_behavior(&self, update: BehaviorUpdate) {
        let mut brain = self.brain.lock();
        if let Some(personality) = update.personality {
            brain.config.behavior.personality = personality;
        }
        if let Some(tone) = update.tone {
            brain.config.behavior.tone = tone;
        }
        if let Some(language) = update.language {
            brain.config.behavior.language = language;
        }
        self.store.save(&brain);
    }

    /// Set the API key at runtime: persisted into the Brain and swapped
    /// into the live provider. Empty keys are ignored with a warning.
    pub fn set_api_key(&self, key: &str) {
        if key.trim().is_empty() {
            warn!("[assistant] ignoring empty API key");
            return;
        }
        {
            let mut brain = self.brain.lock();
            brain.config.api_key = Some(key.to_string());
            self.store.save(&brain);
        }
        *self.provider.lock() = Some(Arc::new(GoogleProvider::new(key)));
        info!("[assistant] API key set at runtime");
    }

    /// Setup help for configuring the key through the environment instead
    /// of persisting it.
    pub fn key_setup_instructions(&self) -> String {
        format!(
            "Állítsd be a(z) {} környezeti változót az API kulcsra, majd indítsd újra az alkalmazást.",
            ENV_API_KEYS[0]
        )
    }

    pub fn analytics(&self) -> Analytics {
        self.brain.lock().analytics.clone()
    }

    /// Manual rescan trigger; returns the number of known pages.
    pub fn rescan(&self) -> usize {
        let mut brain = self.brain.lock();
        let count = scanner::scan_site(self.surface.as_ref(), &mut brain);
        self.store.save(&brain);
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::types::{ElementTarget, PageLocation};
    use crate::engine::brain::MemoryStorage;
    use crate::engine::providers::ProviderError;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticPage;

    impl PageSurface for StaticPage {
        fn document_html(&self) -> String {
            r#"<html><head><title>Teszt</title></head>
               <body><h2 id="kapcsolat">Kapcsolat</h2><a href="/arak">Árak</a></body></html>"#
                .into()
        }
        fn location(&self) -> PageLocation {
            PageLocation { href: "https://example.hu/".into(), path: "/".into() }
        }
        fn scroll_into_view(&self, _t: &ElementTarget) {}
        fn read_inline_style(&self, _t: &ElementTarget, _p: &str) -> Option<String> {
            None
        }
        fn write_inline_style(&self, _t: &ElementTarget, _p: &str, _v: Option<&str>) {}
        fn goto(&self, _path: &str) {}
        fn open_external(&self, _url: &str) {}
    }

    struct Scripted {
        replies: Mutex<VecDeque<Result<String, ProviderError>>>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(replies: Vec<Result<String, ProviderError>>) -> Arc<Self> {
            Arc::new(Scripted { replies: Mutex::new(replies.into()), calls: AtomicUsize::new(0) })
        }
    }

    #[async_trait]
    impl ResponseProvider for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }
        async fn generate(&self, _prompt: &str) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.replies.lock().pop_front().expect("script exhausted")
        }
    }

    async fn assistant() -> Assistant {
        // Clear any ambient key so construction never resolves a real
        // provider out of the test environment.
        std::env::remove_var("SITEPILOT_API_KEY");
        std::env::remove_var("GEMINI_API_KEY");
        Assistant::new(
            AssistantConfig::default(),
            Arc::new(MemoryStorage::new()),
            Arc::new(StaticPage),
        )
        .await
    }

    #[tokio::test]
    async fn test_panel_state_machine() {
        let a = assistant().await;
        assert_eq!(a.panel(), PanelState::Closed);
        // Escape while closed is not observed.
        a.handle_escape();
        assert_eq!(a.panel(), PanelState::Closed);

        assert_eq!(a.toggle(), PanelState::Open);
        a.handle_escape();
        assert_eq!(a.panel(), PanelState::Closed);

        a.open();
        a.close();
        assert_eq!(a.panel(), PanelState::Closed);
    }

    #[tokio::test]
    async fn test_missing_key_send_is_local_and_counted() {
        let a = assistant().await;
        let reply = a.send("Hol a kapcsolat?").await.unwrap();
        assert_eq!(reply, MSG_MISSING_KEY);

        let analytics = a.analytics();
        assert_eq!(analytics.total_queries, 1);
        assert_eq!(analytics.popular_questions.get("hol a kapcsolat?"), Some(&1));
    }

    #[tokio::test]
    async fn test_blank_input_is_a_no_op() {
        let a = assistant().await;
        assert!(a.send("   ").await.is_none());
        assert_eq!(a.analytics().total_queries, 0);
        // Only the welcome message is present.
        assert_eq!(a.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_send_pipeline_strips_commands_and_records() {
        let provider = Scripted::new(vec![Ok("Nézd meg itt: [HIGHLIGHT:#kapcsolat] fent.".into())]);
        let a = assistant().await.with_provider(provider.clone());

        let reply = a.send("Mutasd a kapcsolatot").await.unwrap();
        assert_eq!(reply, "Nézd meg itt:  fent.");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

        let messages = a.messages();
        assert_eq!(messages.last().unwrap().text, reply);
        assert_eq!(a.analytics().total_queries, 1);
        assert_eq!(a.phase(), RequestPhase::Idle);
        assert!(a.send_enabled());
        assert!(!a.is_typing());
    }

    #[tokio::test]
    async fn test_provider_error_maps_to_canned_message() {
        let provider = Scripted::new(vec![Err(ProviderError::RateLimited("quota".into()))]);
        let a = assistant().await.with_provider(provider);
        let reply = a.send("Szia").await.unwrap();
        assert_eq!(reply, crate::atoms::constants::MSG_RATE_LIMITED);
    }

    #[tokio::test]
    async fn test_auto_scan_populates_site_map_on_new() {
        let a = assistant().await;
        let brain = a.brain.lock();
        assert_eq!(brain.site_map.pages, vec!["/", "/arak"]);
        assert!(brain.site_map.last_scan.is_some());
    }

    #[tokio::test]
    async fn test_update_behavior_merges_partially() {
        let a = assistant().await;
        a.update_behavior(BehaviorUpdate { tone: Some("formális".into()), ..Default::default() });
        let brain = a.brain.lock();
        assert_eq!(brain.config.behavior.tone, "formális");
        assert_eq!(brain.config.behavior.language, "hu");
    }

    #[tokio::test]
    async fn test_set_api_key_ignores_empty_and_persists_real() {
        let a = assistant().await;
        a.set_api_key("  ");
        assert!(a.provider.lock().is_none());

        a.set_api_key("uj-kulcs");
        assert!(a.provider.lock().is_some());
        assert_eq!(a.brain.lock().config.api_key.as_deref(), Some("uj-kulcs"));
    }
}
