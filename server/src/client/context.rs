use std::sync::{Arc, Mutex, MutexGuard};

use uuid::Uuid;

use super::cache::QueryCache;
use crate::session::Session;
use crate::user::profile_path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub level: ToastLevel,
    pub message: String,
}

/// A destructive action waiting behind the confirmation modal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingAction {
    DeleteAccount,
    DeletePost(Uuid),
    AdminDeleteUser(Uuid),
    AdminDeletePost(Uuid),
}

#[derive(Debug, Default)]
struct UiState {
    session: Option<Session>,
    toasts: Vec<Toast>,
    location: String,
    modal: Option<PendingAction>,
    open_post: Option<Uuid>,
}

/// Everything a page handler shares: the query cache, the session and UI state
#[derive(Debug, Clone, Default)]
pub struct ClientContext {
    pub cache: QueryCache,
    ui: Arc<Mutex<UiState>>,
}

impl ClientContext {
    pub fn new(location: &str) -> Self {
        let context = Self::default();
        context.navigate(location);
        context
    }

    fn ui(&self) -> MutexGuard<'_, UiState> {
        self.ui
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn session(&self) -> Option<Session> {
        self.ui().session.clone()
    }

    pub fn set_session(&self, session: Option<Session>) {
        self.ui().session = session;
    }

    pub fn location(&self) -> String {
        self.ui().location.clone()
    }

    pub fn navigate(&self, to: &str) {
        self.ui().location = to.to_string();
    }

    /// Whether the page being shown is the signed-in user's own profile
    pub fn viewing_own_profile(&self) -> bool {
        let ui = self.ui();
        ui.session
            .as_ref()
            .is_some_and(|session| ui.location == profile_path(&session.username))
    }

    pub fn push_toast(&self, level: ToastLevel, message: impl Into<String>) {
        self.ui().toasts.push(Toast {
            level,
            message: message.into(),
        });
    }

    pub fn toasts(&self) -> Vec<Toast> {
        self.ui().toasts.clone()
    }

    /// Drain the toast queue once it has been shown
    pub fn take_toasts(&self) -> Vec<Toast> {
        std::mem::take(&mut self.ui().toasts)
    }

    pub fn modal(&self) -> Option<PendingAction> {
        self.ui().modal
    }

    pub(crate) fn open_modal(&self, action: PendingAction) {
        self.ui().modal = Some(action);
    }

    pub(crate) fn close_modal(&self) -> Option<PendingAction> {
        self.ui().modal.take()
    }

    pub fn open_post(&self) -> Option<Uuid> {
        self.ui().open_post
    }

    pub fn show_post(&self, post: Uuid) {
        self.ui().open_post = Some(post);
    }

    pub fn dismiss_post(&self) {
        self.ui().open_post = None;
    }
}
