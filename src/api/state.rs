use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::engine::Conversation;
use crate::services::providers::CatalogProvider;

/// A conversation behind its own lock, so one session's in-flight turn
/// never blocks the others
pub type SharedConversation = Arc<Mutex<Conversation>>;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Active sessions, keyed by session ID
    pub sessions: Arc<RwLock<HashMap<Uuid, SharedConversation>>>,
    pub provider: Arc<dyn CatalogProvider>,
    /// Titles per response
    pub recommendation_count: usize,
}

impl AppState {
    pub fn new(provider: Arc<dyn CatalogProvider>, recommendation_count: usize) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            provider,
            recommendation_count,
        }
    }

    /// Fetch or create the conversation for a session. The sessions map is
    /// locked only for the lookup itself; callers lock the returned
    /// conversation for the duration of the turn.
    pub async fn conversation(&self, id: Uuid) -> SharedConversation {
        let mut sessions = self.sessions.write().await;
        Arc::clone(sessions.entry(id).or_insert_with(|| {
            Arc::new(Mutex::new(Conversation::new(
                Arc::clone(&self.provider),
                self.recommendation_count,
            )))
        }))
    }

    /// Look up an existing session without creating one
    pub async fn existing_conversation(&self, id: Uuid) -> Option<SharedConversation> {
        let sessions = self.sessions.read().await;
        sessions.get(&id).map(Arc::clone)
    }
}
