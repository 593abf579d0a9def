//! Dashboard view model
//!
//! Turns profile and optimization snapshots into what the dashboard shows.
//! Only an `Optimal` result can produce numbers; infeasible and error
//! outcomes carry a message and nothing else.

use std::sync::Arc;
use tracing::warn;

use super::Route;
use crate::client::BudgetApiClient;
use crate::models::{BudgetProfile, OptimalPlan, OptimizationMode, OptimizationRequest, OptimizationResponse};
use crate::state::{OptimizationSnapshot, OptimizationState, ProfileSnapshot};

pub const FIXED_SLICE: &str = "Fixed Expenses";
pub const SAVINGS_SLICE: &str = "Savings";

#[derive(Debug, Clone, PartialEq)]
pub struct AllocationSlice {
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionPoint {
    pub label: String,
    pub savings: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GoalProgress {
    pub name: String,
    pub progress: f64,
    pub current: f64,
    pub target: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSummary {
    pub mode: OptimizationMode,
    pub monthly_income: f64,
    pub total_spending: f64,
    pub monthly_savings: f64,
    pub months_to_goal: Option<f64>,
    pub allocation: Vec<AllocationSlice>,
    pub projection: Vec<ProjectionPoint>,
    pub goals: Vec<GoalProgress>,
    pub recommendations: Vec<String>,
}

impl DashboardSummary {
    pub fn build(
        mode: OptimizationMode,
        profile: &BudgetProfile,
        plan: &OptimalPlan,
        recommendations: &[String],
    ) -> Self {
        let mut allocation: Vec<AllocationSlice> = plan
            .spending_allocation
            .iter()
            .map(|(name, value)| AllocationSlice {
                name: name.clone(),
                value: *value,
            })
            .collect();

        let fixed = plan.fixed_total();
        if fixed > 0.0 {
            allocation.push(AllocationSlice {
                name: FIXED_SLICE.to_string(),
                value: fixed,
            });
        }
        if plan.monthly_savings > 0.0 {
            allocation.push(AllocationSlice {
                name: SAVINGS_SLICE.to_string(),
                value: plan.monthly_savings,
            });
        }

        let projection = plan
            .projected_savings
            .iter()
            .enumerate()
            .map(|(i, savings)| ProjectionPoint {
                label: format!("Month {}", i + 1),
                savings: *savings,
            })
            .collect();

        let goals = profile
            .financial_goals
            .iter()
            .map(|goal| GoalProgress {
                name: goal.name.clone(),
                progress: goal.progress_percent(),
                current: goal.current_amount,
                target: goal.target_amount,
            })
            .collect();

        Self {
            mode,
            monthly_income: profile.monthly_income,
            total_spending: plan.total_monthly_spending,
            monthly_savings: plan.monthly_savings,
            months_to_goal: plan.months_to_goal,
            allocation,
            projection,
            goals,
            recommendations: recommendations.to_vec(),
        }
    }

    /// Months to goal with one decimal, or "N/A".
    pub fn months_to_goal_label(&self) -> String {
        self.months_to_goal
            .map(|m| format!("{:.1}", m))
            .unwrap_or_else(|| "N/A".to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DashboardView {
    Redirect(Route),
    Loading,
    Optimizing,
    Empty,
    Infeasible { message: String },
    Failed { message: String },
    Ready(DashboardSummary),
}

pub struct Dashboard {
    client: Arc<BudgetApiClient>,
    mode: OptimizationMode,
    recommendations: Vec<String>,
}

impl Dashboard {
    pub fn new(client: Arc<BudgetApiClient>) -> Self {
        Self {
            client,
            mode: OptimizationMode::default(),
            recommendations: vec![],
        }
    }

    pub fn mode(&self) -> OptimizationMode {
        self.mode
    }

    pub fn select_mode(&mut self, mode: OptimizationMode) {
        self.mode = mode;
    }

    pub fn recommendations(&self) -> &[String] {
        &self.recommendations
    }

    /// Run with the selected mode; recommendations follow only a successful run.
    pub async fn optimize(&mut self, optimization: &OptimizationState) -> Option<OptimizationResponse> {
        let result = optimization.run(&OptimizationRequest::new(self.mode)).await;
        if result.is_some() {
            self.refresh_recommendations().await;
        }
        result
    }

    /// Failures are logged and leave the previous list in place.
    pub async fn refresh_recommendations(&mut self) {
        match self.client.get_recommendations().await {
            Ok(recommendations) => self.recommendations = recommendations,
            Err(e) => warn!("Failed to fetch recommendations: {}", e),
        }
    }

    pub fn view(&self, profile: &ProfileSnapshot, optimization: &OptimizationSnapshot) -> DashboardView {
        if profile.session_expired || optimization.session_expired {
            return DashboardView::Redirect(Route::Login);
        }
        if profile.loading {
            return DashboardView::Loading;
        }
        let Some(budget) = profile.profile.as_ref() else {
            return match &profile.error {
                Some(message) => DashboardView::Failed {
                    message: message.clone(),
                },
                None => DashboardView::Redirect(Route::BudgetSetup),
            };
        };
        if optimization.loading {
            return DashboardView::Optimizing;
        }

        match &optimization.result {
            None => match &optimization.error {
                Some(message) => DashboardView::Failed {
                    message: message.clone(),
                },
                None => DashboardView::Empty,
            },
            Some(OptimizationResponse::Infeasible { message }) => DashboardView::Infeasible {
                message: message.clone().unwrap_or_default(),
            },
            Some(OptimizationResponse::Error { message }) => DashboardView::Failed {
                message: message.clone().unwrap_or_else(|| "Optimization failed".to_string()),
            },
            Some(OptimizationResponse::Optimal(plan)) => DashboardView::Ready(DashboardSummary::build(
                self.mode,
                budget,
                plan,
                &self.recommendations,
            )),
        }
    }
}
