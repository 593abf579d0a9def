//! Budget API client
//!
//! One façade over the auth, budget and optimization endpoints.
//! Uses a long-lived reqwest::Client for connection pooling.
//!
//! Every request carries `Authorization: Bearer <token>` when a token is
//! stored. Any 401 clears the stored token and surfaces as
//! `ClientError::Unauthorized`; deciding where to navigate is left to the caller.
//! No retries, no caching.

use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::models::{
    AuthResponse, BudgetProfile, HistoryEntry, LoginCredentials, OptimizationRequest,
    OptimizationResponse, RegisterData, ScenarioRequest, User,
};
use crate::token::{fingerprint, TokenStore};
use crate::Result;

const REGISTER_PATH: &str = "/api/auth/register";
const LOGIN_PATH: &str = "/api/auth/login";
const ME_PATH: &str = "/api/auth/me";
const BUDGET_PATH: &str = "/api/budget/";
const HISTORY_PATH: &str = "/api/budget/history";
const OPTIMIZE_PATH: &str = "/api/optimize/";
const SCENARIO_PATH: &str = "/api/optimize/scenario";
const RECOMMENDATIONS_PATH: &str = "/api/optimize/recommendations";

/// Reusable budget API client (connection-pooled)
pub struct BudgetApiClient {
    client: Client,
    config: ClientConfig,
    tokens: Arc<dyn TokenStore>,
}

impl BudgetApiClient {
    pub fn new(config: ClientConfig, tokens: Arc<dyn TokenStore>) -> Result<Self> {
        let mut builder = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8);

        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder.build()?;

        Ok(Self {
            client,
            config,
            tokens,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    pub fn token_store(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    // =============================
    // Auth
    // =============================

    pub async fn register(&self, data: &RegisterData) -> Result<User> {
        info!(email = %data.email, "Registering account");
        self.post_json(REGISTER_PATH, data).await
    }

    /// Log in and store the returned bearer token.
    pub async fn login(&self, credentials: &LoginCredentials) -> Result<AuthResponse> {
        info!(email = %credentials.email, "Logging in");

        let auth: AuthResponse = self.post_json(LOGIN_PATH, credentials).await?;
        self.tokens.set(&auth.access_token).await?;

        debug!(token = %fingerprint(&auth.access_token), "Session token stored");
        Ok(auth)
    }

    pub async fn get_current_user(&self) -> Result<User> {
        self.get_json(ME_PATH).await
    }

    /// Drop the stored token. Calling it again is a no-op.
    pub async fn logout(&self) -> Result<()> {
        self.tokens.clear().await?;
        info!("Logged out");
        Ok(())
    }

    pub async fn is_authenticated(&self) -> Result<bool> {
        Ok(self.tokens.get().await?.is_some())
    }

    // =============================
    // Budget
    // =============================

    /// Fetch the caller's profile. `ClientError::NotFound` means no profile yet.
    pub async fn get_budget_profile(&self) -> Result<BudgetProfile> {
        self.get_json(BUDGET_PATH).await
    }

    /// Upsert: creates the profile on first save, replaces it afterwards.
    pub async fn create_or_update_budget_profile(&self, profile: &BudgetProfile) -> Result<BudgetProfile> {
        info!(
            fixed = profile.fixed_expenses.len(),
            variable = profile.variable_expenses.len(),
            goals = profile.financial_goals.len(),
            "Saving budget profile"
        );
        self.post_json(BUDGET_PATH, profile).await
    }

    pub async fn get_optimization_history(&self) -> Result<Vec<OptimizationResponse>> {
        let entries: Vec<HistoryEntry> = self.get_json(HISTORY_PATH).await?;
        Ok(entries.into_iter().map(|entry| entry.result_json).collect())
    }

    // =============================
    // Optimization
    // =============================

    pub async fn run_optimization(&self, request: &OptimizationRequest) -> Result<OptimizationResponse> {
        info!(mode = %request.optimization_mode.as_wire(), goal_id = ?request.goal_id, "Running optimization");

        let response: OptimizationResponse = self.post_json(OPTIMIZE_PATH, request).await?;

        info!(status = response.status(), "Optimization finished");
        Ok(response)
    }

    pub async fn run_scenario_analysis(&self, request: &ScenarioRequest) -> Result<OptimizationResponse> {
        info!(mode = %request.optimization_mode.as_wire(), "Running scenario analysis");
        self.post_json(SCENARIO_PATH, request).await
    }

    pub async fn get_recommendations(&self) -> Result<Vec<String>> {
        self.get_json(RECOMMENDATIONS_PATH).await
    }

    // =============================
    // Transport
    // =============================

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let request = self.client.get(self.config.url(path));
        let response = self.execute(request, "GET", path).await?;
        decode(response, path).await
    }

    async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<T> {
        let request = self.client.post(self.config.url(path)).json(body);
        let response = self.execute(request, "POST", path).await?;
        decode(response, path).await
    }

    /// Attach the bearer token, send, and map non-2xx statuses to errors.
    async fn execute(&self, request: RequestBuilder, method: &str, path: &str) -> Result<Response> {
        let request = match self.tokens.get().await? {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        debug!("{} {}", method, path);

        let response = request.send().await.map_err(|e| {
            error!("{} {} failed: {}", method, path, e);
            ClientError::Http(e)
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let err = ClientError::from_status(status, &body);

        if err.is_unauthorized() {
            warn!("{} {} returned 401, clearing session token", method, path);
            if let Err(e) = self.tokens.clear().await {
                warn!("Failed to clear session token: {}", e);
            }
        } else if err.is_not_found() {
            debug!("{} {} returned 404", method, path);
        } else {
            error!("{} {} returned {}: {}", method, path, status, err);
        }

        Err(err)
    }
}

async fn decode<T: DeserializeOwned>(response: Response, path: &str) -> Result<T> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| {
        error!("Failed to parse response from {}: {}", path, e);
        ClientError::InvalidResponse(format!("{}: {}", path, e))
    })
}
