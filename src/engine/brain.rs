// ── Engine: Brain Store ────────────────────────────────────────────────────
// Load/save of the single persisted Brain blob through a pluggable
// key/value backend, plus the bootstrap fetch of a hosted default
// configuration.
//
// Persistence model: the whole Brain is serialized to JSON and overwritten
// under one key after every conversation turn, behavior update, or site
// scan. There is no partial update and no multi-writer coordination;
// concurrent widget instances on the same store can clobber each other's
// history. A malformed blob is not an error — the store falls back to the
// runtime default, losing prior history (logged only).

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use log::{info, warn};
use parking_lot::Mutex;
use rusqlite::{params, Connection};

use crate::atoms::constants::BRAIN_KEY;
use crate::atoms::error::AssistResult;
use crate::atoms::types::Brain;

// ── Storage backends ───────────────────────────────────────────────────────

/// The browser-scoped key/value store abstraction. One string value per
/// key, overwritten wholesale.
pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> AssistResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> AssistResult<()>;
}

/// Default backend: a two-column KV table in a WAL-mode SQLite database
/// under the user data dir.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

fn default_db_path() -> PathBuf {
    let base = dirs::data_dir().unwrap_or_default();
    let dir = base.join("sitepilot");
    std::fs::create_dir_all(&dir).ok();
    dir.join("assistant.db")
}

impl SqliteStorage {
    /// Open (or create) the store at the default location.
    pub fn open() -> AssistResult<Self> {
        Self::open_at(default_db_path())
    }

    pub fn open_at(path: PathBuf) -> AssistResult<Self> {
        info!("[brain] opening storage at {:?}", path);
        let conn = Connection::open(&path)?;
        Self::init(conn)
    }

    /// Purely in-process store, nothing written to disk.
    pub fn open_in_memory() -> AssistResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> AssistResult<Self> {
        conn.execute_batch("PRAGMA journal_mode=WAL;").ok();
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS assistant_config (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;
        Ok(SqliteStorage { conn: Mutex::new(conn) })
    }
}

impl Storage for SqliteStorage {
    fn get(&self, key: &str) -> AssistResult<Option<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT value FROM assistant_config WHERE key = ?1")?;
        let mut rows = stmt.query(params![key])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &str) -> AssistResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO assistant_config (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }
}

/// Volatile backend for hosts that embed the widget without persistence.
#[derive(Default)]
pub struct MemoryStorage {
    map: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> AssistResult<Option<String>> {
        Ok(self.map.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> AssistResult<()> {
        self.map.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// ── Brain store ────────────────────────────────────────────────────────────

pub struct BrainStore {
    storage: Arc<dyn Storage>,
}

impl BrainStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        BrainStore { storage }
    }

    /// Resolve the starting Brain:
    ///   1. the persisted blob (parse failure → default, history lost),
    ///   2. else a bootstrap JSON fetched once from `bootstrap_url`,
    ///   3. else the runtime default.
    /// Partial JSON from either source is filled with default fields.
    pub async fn load(&self, bootstrap_url: Option<&str>) -> Brain {
        match self.storage.get(BRAIN_KEY) {
            Ok(Some(blob)) => match serde_json::from_str::<Brain>(&blob) {
                Ok(brain) => return brain,
                Err(e) => warn!("[brain] persisted blob unreadable, starting fresh: {}", e),
            },
            Ok(None) => {}
            Err(e) => warn!("[brain] storage read failed: {}", e),
        }

        if let Some(url) = bootstrap_url {
            match fetch_bootstrap(url).await {
                Ok(brain) => {
                    info!("[brain] bootstrap configuration loaded from {}", url);
                    return brain;
                }
                Err(e) => warn!("[brain] bootstrap fetch failed: {}", e),
            }
        }

        Brain::default()
    }

    /// Overwrite the whole persisted blob. Failures are logged, never
    /// propagated; persistence stays best-effort.
    pub fn save(&self, brain: &Brain) {
        let blob = match serde_json::to_string(brain) {
            Ok(b) => b,
            Err(e) => {
                warn!("[brain] serialization failed: {}", e);
                return;
            }
        };
        if let Err(e) = self.storage.set(BRAIN_KEY, &blob) {
            warn!("[brain] save failed: {}", e);
        }
    }
}

async fn fetch_bootstrap(url: &str) -> AssistResult<Brain> {
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(10))
        .build()?;
    let response = client.get(url).send().await?.error_for_status()?;
    Ok(response.json::<Brain>().await?)
}

// ── Conversation log mutation ──────────────────────────────────────────────

/// Append one completed exchange and update the analytics counters.
/// Keeps `total_queries == conversations.len()`; the popular-question key
/// is the lower-cased verbatim input.
pub fn record_turn(brain: &mut Brain, user: &str, assistant: &str) {
    brain.conversations.push(crate::atoms::types::ConversationTurn {
        timestamp: chrono::Utc::now().to_rfc3339(),
        user: user.to_string(),
        assistant: assistant.to_string(),
    });
    brain.analytics.total_queries += 1;
    *brain.analytics.popular_questions.entry(user.to_lowercase()).or_insert(0) += 1;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_save_roundtrip() {
        let store = BrainStore::new(Arc::new(MemoryStorage::new()));
        let mut brain = store.load(None).await;
        assert_eq!(brain, Brain::default());

        record_turn(&mut brain, "Hol az árlista?", "Itt: [NAVIGATE:/arak]");
        store.save(&brain);

        let reloaded = store.load(None).await;
        assert_eq!(reloaded, brain);
    }

    #[tokio::test]
    async fn test_malformed_blob_falls_back_to_default() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(BRAIN_KEY, "{ not json").unwrap();
        let store = BrainStore::new(storage);
        assert_eq!(store.load(None).await, Brain::default());
    }

    #[test]
    fn test_sqlite_storage_overwrites_wholesale() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        storage.set(BRAIN_KEY, "first").unwrap();
        storage.set(BRAIN_KEY, "second").unwrap();
        assert_eq!(storage.get(BRAIN_KEY).unwrap().as_deref(), Some("second"));
        assert_eq!(storage.get("other").unwrap(), None);
    }

    #[test]
    fn test_record_turn_keeps_counters_aligned() {
        let mut brain = Brain::default();
        record_turn(&mut brain, "Mennyibe kerül?", "1000 Ft.");
        record_turn(&mut brain, "MENNYIBE kerül?", "1000 Ft.");
        assert_eq!(brain.analytics.total_queries, 2);
        assert_eq!(brain.conversations.len(), 2);
        // Lower-cased verbatim key: both phrasings collapse here, but only
        // because they differ solely in case.
        assert_eq!(brain.analytics.popular_questions.get("mennyibe kerül?"), Some(&2));
    }
}
