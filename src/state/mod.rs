//! Shared application state and the pure rules that govern it.

pub mod lifecycle;
pub mod rooms;
pub mod scoring;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, RwLock, watch};
use uuid::Uuid;

use crate::{config::AppConfig, dao::quiz_store::QuizStore, error::ServiceError};

pub use self::rooms::{ClientConnection, RoomRegistry};

/// Cheaply cloneable handle to the application state.
pub type SharedState = Arc<AppState>;

/// Central application state: configuration, storage handle, realtime rooms,
/// issued tokens and per-question submission gates.
pub struct AppState {
    config: AppConfig,
    store: RwLock<Option<Arc<dyn QuizStore>>>,
    degraded: watch::Sender<bool>,
    rooms: RoomRegistry,
    /// Opaque bearer token -> user id.
    tokens: DashMap<String, Uuid>,
    /// Serializes the check-count-insert sequence of answer submission per
    /// question, so arrival positions stay dense and duplicates are caught
    /// before they reach the store.
    answer_gates: DashMap<Uuid, Arc<Mutex<()>>>,
    /// Serializes the total-score recompute per session; two questions can be
    /// open at once, so the question gate alone does not cover the total.
    score_gates: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl AppState {
    /// Construct the state wrapped in an [`Arc`].
    ///
    /// The application starts in degraded mode until a storage backend is
    /// installed.
    pub fn new(config: AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            config,
            store: RwLock::new(None),
            degraded: degraded_tx,
            rooms: RoomRegistry::new(),
            tokens: DashMap::new(),
            answer_gates: DashMap::new(),
            score_gates: DashMap::new(),
        })
    }

    /// Construct the state with a storage backend already installed.
    pub async fn with_store(config: AppConfig, store: Arc<dyn QuizStore>) -> SharedState {
        let state = Self::new(config);
        state.install_store(store).await;
        state
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Obtain a handle to the current store, if one is installed.
    pub async fn store(&self) -> Option<Arc<dyn QuizStore>> {
        let guard = self.store.read().await;
        guard.as_ref().cloned()
    }

    /// Obtain the current store or fail with [`ServiceError::Degraded`].
    pub async fn require_store(&self) -> Result<Arc<dyn QuizStore>, ServiceError> {
        self.store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a storage backend and leave degraded mode.
    pub async fn install_store(&self, store: Arc<dyn QuizStore>) {
        {
            let mut guard = self.store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false).await;
    }

    /// Remove the current storage backend and enter degraded mode.
    pub async fn clear_store(&self) {
        {
            let mut guard = self.store.write().await;
            guard.take();
        }
        self.update_degraded(true).await;
    }

    /// Current degraded flag.
    pub async fn is_degraded(&self) -> bool {
        let guard = self.store.read().await;
        guard.is_none()
    }

    /// Broadcast the degraded flag when the value changes.
    pub async fn update_degraded(&self, value: bool) {
        if *self.degraded.borrow() == value {
            return;
        }
        let _ = self.degraded.send(value);
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Registry of live WebSocket connections grouped by quiz.
    pub fn rooms(&self) -> &RoomRegistry {
        &self.rooms
    }

    /// Issue an opaque bearer token for a user.
    pub fn issue_token(&self, user_id: Uuid) -> String {
        let token = Uuid::new_v4().simple().to_string();
        self.tokens.insert(token.clone(), user_id);
        token
    }

    /// Resolve a bearer token to the user it was issued for.
    pub fn resolve_token(&self, token: &str) -> Option<Uuid> {
        self.tokens.get(token).map(|entry| *entry.value())
    }

    /// Per-question gate serializing answer submission.
    pub fn answer_gate(&self, question_id: Uuid) -> Arc<Mutex<()>> {
        self.answer_gates
            .entry(question_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Per-session gate serializing the total-score recompute.
    pub fn score_gate(&self, session_id: Uuid) -> Arc<Mutex<()>> {
        self.score_gates
            .entry(session_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
