//! Optimization state
//!
//! Each run is one round trip whose result replaces the held one. Nothing is
//! chained automatically; callers sequence follow-ups on the returned value.

use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use super::Failure;
use crate::client::BudgetApiClient;
use crate::models::{OptimizationRequest, OptimizationResponse, ScenarioRequest};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct OptimizationSnapshot {
    pub result: Option<OptimizationResponse>,
    /// Latest what-if result, kept apart from `result`.
    pub scenario: Option<OptimizationResponse>,
    pub history: Vec<OptimizationResponse>,
    pub loading: bool,
    pub error: Option<String>,
    pub session_expired: bool,
}

pub struct OptimizationState {
    client: Arc<BudgetApiClient>,
    inner: RwLock<OptimizationSnapshot>,
}

impl OptimizationState {
    pub fn new(client: Arc<BudgetApiClient>) -> Self {
        Self {
            client,
            inner: RwLock::new(OptimizationSnapshot::default()),
        }
    }

    pub async fn snapshot(&self) -> OptimizationSnapshot {
        self.inner.read().await.clone()
    }

    /// Run against the stored profile. Returns `None` on failure.
    pub async fn run(&self, request: &OptimizationRequest) -> Option<OptimizationResponse> {
        self.begin().await;

        let result = self.client.run_optimization(request).await;

        let mut state = self.inner.write().await;
        state.loading = false;
        match result {
            Ok(response) => {
                state.result = Some(response.clone());
                Some(response)
            }
            Err(e) => {
                state.fail(Failure::from_error(&e, "Optimization failed"));
                None
            }
        }
    }

    /// What-if analysis on ad hoc inputs. Leaves `result` untouched.
    pub async fn explore(&self, request: &ScenarioRequest) -> Option<OptimizationResponse> {
        self.begin().await;

        let result = self.client.run_scenario_analysis(request).await;

        let mut state = self.inner.write().await;
        state.loading = false;
        match result {
            Ok(response) => {
                state.scenario = Some(response.clone());
                Some(response)
            }
            Err(e) => {
                state.fail(Failure::from_error(&e, "Scenario analysis failed"));
                None
            }
        }
    }

    pub async fn load_history(&self) -> bool {
        self.begin().await;

        let result = self.client.get_optimization_history().await;

        let mut state = self.inner.write().await;
        state.loading = false;
        match result {
            Ok(history) => {
                info!(runs = history.len(), "Optimization history loaded");
                state.history = history;
                true
            }
            Err(e) => {
                state.fail(Failure::from_error(&e, "Failed to load optimization history"));
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

impl OptimizationSnapshot {
    fn fail(&mut self, failure: Failure) {
        self.error = Some(failure.message);
        self.session_expired = failure.session_expired;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BudgetProfile, FixedExpense, OptimizationMode, VariableExpense};
    use crate::testing::FakeBudgetServer;
    use std::collections::BTreeMap;

    async fn with_profile(server: &FakeBudgetServer, income: f64) -> Arc<BudgetApiClient> {
        let client = server.client();
        client.register(&server.register_data("ana@example.com")).await.unwrap();
        client.login(&server.credentials("ana@example.com")).await.unwrap();

        let mut profile = BudgetProfile::new(income);
        profile.fixed_expenses.push(FixedExpense::new("Rent/Mortgage", 1500.0));
        profile.variable_expenses.push(VariableExpense::new("Groceries", 200.0, 600.0));
        client.create_or_update_budget_profile(&profile).await.unwrap();
        Arc::new(client)
    }

    #[tokio::test]
    async fn test_run_replaces_result() {
        let server = FakeBudgetServer::start().await;
        let state = OptimizationState::new(with_profile(&server, 5000.0).await);

        let first = state
            .run(&OptimizationRequest::new(OptimizationMode::MaxSavings))
            .await
            .unwrap();
        assert!(first.is_optimal());

        let infeasible = OptimizationResponse::Infeasible {
            message: Some("Fixed expenses exceed income".to_string()),
        };
        server.respond_to_optimize_with(infeasible.clone()).await;

        let second = state
            .run(&OptimizationRequest::new(OptimizationMode::Balanced))
            .await
            .unwrap();
        assert_eq!(second, infeasible);

        let snapshot = state.snapshot().await;
        assert_eq!(snapshot.result, Some(infeasible));
        assert!(snapshot.error.is_none());
    }

    #[tokio::test]
    async fn test_run_without_profile_reports_detail() {
        let server = FakeBudgetServer::start().await;
        let client = server.client();
        client.register(&server.register_data("bo@example.com")).await.unwrap();
        client.login(&server.credentials("bo@example.com")).await.unwrap();

        let state = OptimizationState::new(Arc::new(client));
        let result = state
            .run(&OptimizationRequest::new(OptimizationMode::default()))
            .await;

        assert!(result.is_none());
        let snapshot = state.snapshot().await;
        assert_eq!(
            snapshot.error.as_deref(),
            Some("Budget profile not found. Please create one first.")
        );
        assert!(snapshot.result.is_none());
    }

    #[tokio::test]
    async fn test_scenario_does_not_touch_result() {
        let server = FakeBudgetServer::start().await;
        let client = with_profile(&server, 5000.0).await;
        let state = OptimizationState::new(client.clone());

        let scenario = ScenarioRequest {
            monthly_income: 1000.0,
            fixed_expenses: BTreeMap::from([("Rent/Mortgage".to_string(), 1500.0)]),
            variable_categories: BTreeMap::new(),
            savings_goal: 0.0,
            months_to_goal: 12,
            optimization_mode: OptimizationMode::MaxSavings,
        };

        let outcome = state.explore(&scenario).await.unwrap();
        assert!(!outcome.is_optimal());

        let snapshot = state.snapshot().await;
        assert!(snapshot.result.is_none());
        assert_eq!(snapshot.scenario, Some(outcome));

        let stored = client.get_budget_profile().await.unwrap();
        assert_eq!(stored.monthly_income, 5000.0);
    }

    #[tokio::test]
    async fn test_history_collects_successful_runs() {
        let server = FakeBudgetServer::start().await;
        let state = OptimizationState::new(with_profile(&server, 5000.0).await);

        for mode in OptimizationMode::ALL {
            state.run(&OptimizationRequest::new(mode)).await.unwrap();
        }

        assert!(state.load_history().await);
        assert_eq!(state.snapshot().await.history.len(), 3);
    }

    #[tokio::test]
    async fn test_history_without_profile_reports_detail() {
        let server = FakeBudgetServer::start().await;
        let client = server.client();
        client.register(&server.register_data("bo@example.com")).await.unwrap();
        client.login(&server.credentials("bo@example.com")).await.unwrap();

        let state = OptimizationState::new(Arc::new(client));
        assert!(!state.load_history().await);

        let snapshot = state.snapshot().await;
        assert_eq!(snapshot.error.as_deref(), Some("Budget profile not found"));
        assert!(!snapshot.session_expired);
        assert!(snapshot.history.is_empty());
        assert!(!snapshot.loading);
    }
}
