//! Session lifecycle
//!
//! unknown -> (checking) -> authenticated | anonymous

use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::Failure;
use crate::client::BudgetApiClient;
use crate::models::{LoginCredentials, RegisterData, User};
use crate::Result;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionStatus {
    Unknown,
    Checking,
    Authenticated(User),
    Anonymous,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub loading: bool,
    pub error: Option<String>,
    /// The last failure was a 401; the stored token is gone.
    pub session_expired: bool,
}

impl SessionSnapshot {
    pub fn user(&self) -> Option<&User> {
        match &self.status {
            SessionStatus::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user().is_some()
    }
}

pub struct SessionState {
    client: Arc<BudgetApiClient>,
    inner: RwLock<SessionSnapshot>,
}

impl SessionState {
    pub fn new(client: Arc<BudgetApiClient>) -> Self {
        Self {
            client,
            inner: RwLock::new(SessionSnapshot {
                status: SessionStatus::Unknown,
                loading: true,
                error: None,
                session_expired: false,
            }),
        }
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.inner.read().await.clone()
    }

    /// Resolve the initial state from whatever token is already stored.
    ///
    /// A failed user fetch leaves an error but does not clear the token
    /// here; a 401 has already cleared it inside the client.
    pub async fn initialize(&self) {
        let has_token = match self.client.is_authenticated().await {
            Ok(has_token) => has_token,
            Err(e) => {
                warn!("Could not read stored token: {}", e);
                false
            }
        };

        if !has_token {
            self.finish(SessionStatus::Anonymous, None).await;
            return;
        }

        self.inner.write().await.status = SessionStatus::Checking;

        match self.client.get_current_user().await {
            Ok(user) => {
                info!(user_id = user.id, "Session restored");
                self.finish(SessionStatus::Authenticated(user), None).await;
            }
            Err(e) => {
                warn!("Failed to get current user: {}", e);
                let mut state = self.inner.write().await;
                state.status = SessionStatus::Anonymous;
                state.loading = false;
                state.error = Some("Failed to authenticate".to_string());
                state.session_expired = e.is_unauthorized();
            }
        }
    }

    /// Log in, then load the user. Returns whether both steps succeeded.
    pub async fn login(&self, credentials: &LoginCredentials) -> bool {
        self.begin().await;

        let outcome = async {
            self.client.login(credentials).await?;
            self.client.get_current_user().await
        }
        .await;

        self.settle(outcome, "Login failed").await
    }

    /// Register, log in with the same credentials, then load the user.
    /// The first failing step ends the chain.
    pub async fn register(&self, data: &RegisterData) -> bool {
        self.begin().await;

        let outcome = async {
            self.client.register(data).await?;
            self.client.login(&data.credentials()).await?;
            self.client.get_current_user().await
        }
        .await;

        self.settle(outcome, "Registration failed").await
    }

    pub async fn logout(&self) {
        if let Err(e) = self.client.logout().await {
            warn!("Failed to clear stored token: {}", e);
        }
        self.finish(SessionStatus::Anonymous, None).await;
    }

    async fn begin(&self) {
        let mut state = self.inner.write().await;
        state.loading = true;
        state.error = None;
        state.session_expired = false;
    }

    async fn settle(&self, outcome: Result<User>, fallback: &str) -> bool {
        match outcome {
            Ok(user) => {
                info!(user_id = user.id, email = %user.email, "Authenticated");
                self.finish(SessionStatus::Authenticated(user), None).await;
                true
            }
            Err(e) => {
                let failure = Failure::from_error(&e, fallback);
                let mut state = self.inner.write().await;
                state.loading = false;
                state.error = Some(failure.message);
                state.session_expired = failure.session_expired;
                if failure.session_expired {
                    state.status = SessionStatus::Anonymous;
                }
                false
            }
        }
    }

    async fn finish(&self, status: SessionStatus, error: Option<String>) {
        let mut state = self.inner.write().await;
        state.status = status;
        state.loading = false;
        state.error = error;
        state.session_expired = false;
    }
}
