//! Budget profile state

use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use super::Failure;
use crate::client::BudgetApiClient;
use crate::models::BudgetProfile;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProfileSnapshot {
    /// `None` with no error means the user has not created a profile yet.
    pub profile: Option<BudgetProfile>,
    pub loading: bool,
    pub error: Option<String>,
    pub session_expired: bool,
}

impl ProfileSnapshot {
    pub fn needs_setup(&self) -> bool {
        !self.loading && self.profile.is_none() && self.error.is_none()
    }
}

pub struct ProfileState {
    client: Arc<BudgetApiClient>,
    inner: RwLock<ProfileSnapshot>,
}

impl ProfileState {
    pub fn new(client: Arc<BudgetApiClient>) -> Self {
        Self {
            client,
            inner: RwLock::new(ProfileSnapshot::default()),
        }
    }

    /// Construct and fetch immediately.
    pub async fn load(client: Arc<BudgetApiClient>) -> Self {
        let state = Self::new(client);
        state.fetch().await;
        state
    }

    pub async fn snapshot(&self) -> ProfileSnapshot {
        self.inner.read().await.clone()
    }

    /// Fetch the stored profile. A 404 leaves "no profile", not an error.
    pub async fn fetch(&self) {
        self.begin().await;

        let result = self.client.get_budget_profile().await;

        let mut state = self.inner.write().await;
        state.loading = false;
        match result {
            Ok(profile) => state.profile = Some(profile),
            Err(e) if e.is_not_found() => {
                info!("No budget profile yet");
                state.profile = None;
            }
            Err(e) => {
                let failure = Failure::from_error(&e, "Failed to fetch budget profile");
                state.error = Some(failure.message);
                state.session_expired = failure.session_expired;
            }
        }
    }

    pub async fn refetch(&self) {
        self.fetch().await
    }

    /// Upsert the profile and hold the server's echo of it.
    pub async fn save(&self, profile: &BudgetProfile) -> bool {
        self.begin().await;

        let result = self.client.create_or_update_budget_profile(profile).await;

        let mut state = self.inner.write().await;
        state.loading = false;
        match result {
            Ok(saved) => {
                info!(profile_id = ?saved.id, "Budget profile saved");
                state.profile = Some(saved);
                true
            }
            Err(e) => {
                let failure = Failure::from_error(&e, "Failed to save budget profile");
                state.error = Some(failure.message);
                state.session_expired = failure.session_expired;
                false
            }
        }
    }

    async fn begin(&self) {
        let mut state = self.inner.write().await;
        state.loading = true;
        state.error = None;
        state.session_expired = false;
    }
}
