//! In-process conversation state. Turn history plus accumulated
//! ingredient/restriction sets per conversation id, with mutations
//! serialized per id so two writers to the same conversation cannot
//! interleave their read-modify-write.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use souschef_schema::{ChatRole, ConversationId, Turn, TurnView};
use tokio::sync::{Mutex, RwLock};

/// Everything the store knows about one conversation. Accumulated sets
/// are union-only: they never shrink until `clear` drops the whole
/// state. Sorted sets keep summaries deterministic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationState {
    pub id: ConversationId,
    pub turns: Vec<Turn>,
    pub ingredients: BTreeSet<String>,
    pub restrictions: BTreeSet<String>,
    pub preferences: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConversationState {
    fn new(id: ConversationId) -> Self {
        let now = Utc::now();
        Self {
            id,
            turns: Vec::new(),
            ingredients: BTreeSet::new(),
            restrictions: BTreeSet::new(),
            preferences: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    fn touch(&mut self) {
        // Non-decreasing even when the clock reads the same instant twice.
        self.updated_at = Utc::now().max(self.updated_at);
    }
}

/// Process-local store of all active conversations. The outer map is
/// read-locked on the hot path; each conversation sits behind its own
/// mutex, so writers to different ids never block one another.
#[derive(Default)]
pub struct ConversationStore {
    inner: RwLock<HashMap<ConversationId, Arc<Mutex<ConversationState>>>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a fresh conversation and returns its id.
    pub async fn create(&self) -> ConversationId {
        let id = ConversationId::generate();
        let state = Arc::new(Mutex::new(ConversationState::new(id.clone())));
        self.inner.write().await.insert(id.clone(), state);
        tracing::debug!(conversation = %id, "conversation created");
        id
    }

    /// Point-in-time snapshot of a conversation, or None if absent.
    pub async fn get(&self, id: &ConversationId) -> Option<ConversationState> {
        let entry = self.entry(id).await?;
        let state = entry.lock().await.clone();
        Some(state)
    }

    /// Appends a turn and unions any supplied ingredients/restrictions
    /// into the accumulated sets. An unknown id is not an error: the
    /// conversation is created under that id on the spot.
    pub async fn add_turn(
        &self,
        id: &ConversationId,
        role: ChatRole,
        content: &str,
        ingredients: &[String],
        restrictions: &[String],
    ) {
        let entry = self.entry_or_create(id).await;
        let mut state = entry.lock().await;
        state.turns.push(Turn {
            role,
            content: content.to_string(),
            at: Utc::now(),
        });
        state.ingredients.extend(ingredients.iter().cloned());
        state.restrictions.extend(restrictions.iter().cloned());
        state.touch();
    }

    /// The most recent `limit` turns in original order, as an owned
    /// snapshot. Empty for an unknown id.
    pub async fn recent_context(&self, id: &ConversationId, limit: usize) -> Vec<TurnView> {
        let Some(entry) = self.entry(id).await else {
            return Vec::new();
        };
        let state = entry.lock().await;
        let skip = state.turns.len().saturating_sub(limit);
        state.turns[skip..].iter().map(TurnView::from).collect()
    }

    /// One-line text recap for prompt assembly. The round count is
    /// `turns / 2`, a rough proxy that undercounts dangling user turns.
    pub async fn summary(&self, id: &ConversationId) -> Option<String> {
        let entry = self.entry(id).await?;
        let state = entry.lock().await;
        let join = |set: &BTreeSet<String>| {
            if set.is_empty() {
                "无".to_string()
            } else {
                set.iter().cloned().collect::<Vec<_>>().join("、")
            }
        };
        Some(format!(
            "已进行{}轮对话；累计食材：{}；饮食限制：{}",
            state.turns.len() / 2,
            join(&state.ingredients),
            join(&state.restrictions),
        ))
    }

    /// Merges keys into the preference map, last write per key wins.
    /// No-op for an unknown id.
    pub async fn update_preferences(
        &self,
        id: &ConversationId,
        mapping: HashMap<String, String>,
    ) {
        let Some(entry) = self.entry(id).await else {
            return;
        };
        let mut state = entry.lock().await;
        state.preferences.extend(mapping);
        state.touch();
    }

    /// Drops all state for the id. Idempotent.
    pub async fn clear(&self, id: &ConversationId) {
        if self.inner.write().await.remove(id).is_some() {
            tracing::debug!(conversation = %id, "conversation cleared");
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    async fn entry(&self, id: &ConversationId) -> Option<Arc<Mutex<ConversationState>>> {
        self.inner.read().await.get(id).cloned()
    }

    async fn entry_or_create(&self, id: &ConversationId) -> Arc<Mutex<ConversationState>> {
        if let Some(entry) = self.entry(id).await {
            return entry;
        }
        let mut map = self.inner.write().await;
        // Re-check under the write lock: another task may have raced us.
        Arc::clone(map.entry(id.clone()).or_insert_with(|| {
            tracing::debug!(conversation = %id, "conversation auto-created on add_turn");
            Arc::new(Mutex::new(ConversationState::new(id.clone())))
        }))
    }
}
