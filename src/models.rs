//! Data contract shared with the budget API

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

//
// ================= Auth =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
}

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegisterData {
    pub email: String,
    pub password: String,
}

impl RegisterData {
    /// Credentials for the automatic login that follows registration.
    pub fn credentials(&self) -> LoginCredentials {
        LoginCredentials {
            email: self.email.clone(),
            password: self.password.clone(),
        }
    }
}

impl fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl fmt::Debug for RegisterData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterData")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: String,
}

//
// ================= Budget Profile =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FixedExpense {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_id: Option<i64>,
    pub category: String,
    #[serde(deserialize_with = "amount::deserialize")]
    pub amount: f64,
}

impl FixedExpense {
    pub fn new(category: impl Into<String>, amount: f64) -> Self {
        Self {
            id: None,
            profile_id: None,
            category: category.into(),
            amount,
        }
    }
}

/// A flexible spending category. `min_amount <= max_amount` is expected by
/// the optimizer but is not checked here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VariableExpense {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_id: Option<i64>,
    pub category: String,
    #[serde(deserialize_with = "amount::deserialize")]
    pub min_amount: f64,
    #[serde(deserialize_with = "amount::deserialize")]
    pub max_amount: f64,
}

impl VariableExpense {
    pub fn new(category: impl Into<String>, min_amount: f64, max_amount: f64) -> Self {
        Self {
            id: None,
            profile_id: None,
            category: category.into(),
            min_amount,
            max_amount,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinancialGoal {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_id: Option<i64>,
    pub name: String,
    #[serde(deserialize_with = "amount::deserialize")]
    pub target_amount: f64,
    #[serde(default, deserialize_with = "amount::deserialize")]
    pub current_amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<NaiveDate>,
    /// 1 to 10
    pub priority: u8,
}

impl FinancialGoal {
    pub fn new(name: impl Into<String>, target_amount: f64, current_amount: f64, priority: u8) -> Self {
        Self {
            id: None,
            profile_id: None,
            name: name.into(),
            target_amount,
            current_amount,
            deadline: None,
            priority,
        }
    }

    pub fn remaining(&self) -> f64 {
        (self.target_amount - self.current_amount).max(0.0)
    }

    /// Percent of the target already saved. A zero target reports 0.
    pub fn progress_percent(&self) -> f64 {
        if self.target_amount > 0.0 {
            self.current_amount / self.target_amount * 100.0
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BudgetProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(deserialize_with = "amount::deserialize")]
    pub monthly_income: f64,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "timestamp::option")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "timestamp::option")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub fixed_expenses: Vec<FixedExpense>,
    #[serde(default)]
    pub variable_expenses: Vec<VariableExpense>,
    #[serde(default)]
    pub financial_goals: Vec<FinancialGoal>,
}

impl BudgetProfile {
    pub fn new(monthly_income: f64) -> Self {
        Self {
            id: None,
            user_id: None,
            monthly_income,
            created_at: None,
            updated_at: None,
            fixed_expenses: vec![],
            variable_expenses: vec![],
            financial_goals: vec![],
        }
    }

    /// Copy with every server-assigned id and timestamp removed.
    pub fn without_server_fields(&self) -> Self {
        Self {
            id: None,
            user_id: None,
            monthly_income: self.monthly_income,
            created_at: None,
            updated_at: None,
            fixed_expenses: self
                .fixed_expenses
                .iter()
                .map(|e| FixedExpense::new(e.category.clone(), e.amount))
                .collect(),
            variable_expenses: self
                .variable_expenses
                .iter()
                .map(|e| VariableExpense::new(e.category.clone(), e.min_amount, e.max_amount))
                .collect(),
            financial_goals: self
                .financial_goals
                .iter()
                .map(|g| FinancialGoal {
                    id: None,
                    profile_id: None,
                    ..g.clone()
                })
                .collect(),
        }
    }

    pub fn total_fixed_expenses(&self) -> f64 {
        self.fixed_expenses.iter().map(|e| e.amount).sum()
    }

    /// The goal the optimizer targets by default: the largest `priority` value.
    /// Ties keep the earliest goal in the list.
    pub fn top_priority_goal(&self) -> Option<&FinancialGoal> {
        self.financial_goals
            .iter()
            .reduce(|best, goal| if goal.priority > best.priority { goal } else { best })
    }
}

//
// ================= Optimization =================
//

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationMode {
    #[default]
    MaxSavings,
    Balanced,
    FastestGoal,
}

impl OptimizationMode {
    pub const ALL: [OptimizationMode; 3] = [
        OptimizationMode::MaxSavings,
        OptimizationMode::Balanced,
        OptimizationMode::FastestGoal,
    ];

    pub fn as_wire(&self) -> &'static str {
        match self {
            OptimizationMode::MaxSavings => "max_savings",
            OptimizationMode::Balanced => "balanced",
            OptimizationMode::FastestGoal => "fastest_goal",
        }
    }
}

impl fmt::Display for OptimizationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OptimizationMode::MaxSavings => "Maximize Savings",
            OptimizationMode::Balanced => "Balanced",
            OptimizationMode::FastestGoal => "Fastest Goal",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for OptimizationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "max_savings" => Ok(OptimizationMode::MaxSavings),
            "balanced" => Ok(OptimizationMode::Balanced),
            "fastest_goal" => Ok(OptimizationMode::FastestGoal),
            other => Err(format!(
                "unknown optimization mode '{}' (expected max_savings, balanced or fastest_goal)",
                other
            )),
        }
    }
}

/// Runs against the caller's stored profile; carries no profile data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OptimizationRequest {
    pub optimization_mode: OptimizationMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal_id: Option<i64>,
}

impl OptimizationRequest {
    pub fn new(mode: OptimizationMode) -> Self {
        Self {
            optimization_mode: mode,
            goal_id: None,
        }
    }

    pub fn for_goal(mode: OptimizationMode, goal_id: i64) -> Self {
        Self {
            optimization_mode: mode,
            goal_id: Some(goal_id),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IncomeAllocation {
    pub fixed_expenses: f64,
    pub variable_expenses: f64,
    pub savings: f64,
}

/// Payload of an `optimal` result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OptimalPlan {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(deserialize_with = "amount::deserialize")]
    pub monthly_savings: f64,
    #[serde(default)]
    pub spending_allocation: BTreeMap<String, f64>,
    #[serde(deserialize_with = "amount::deserialize")]
    pub total_monthly_spending: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub months_to_goal: Option<f64>,
    #[serde(default)]
    pub projected_savings: Vec<f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fixed_expenses: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "amount::deserialize_option")]
    pub total_fixed_expenses: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub income_allocation: Option<IncomeAllocation>,
}

impl OptimalPlan {
    /// Fixed spending, from the explicit total or the itemized map.
    pub fn fixed_total(&self) -> f64 {
        self.total_fixed_expenses
            .or_else(|| self.income_allocation.as_ref().map(|a| a.fixed_expenses))
            .unwrap_or_else(|| self.fixed_expenses.values().sum())
    }
}

/// Outcome of an optimization run, discriminated by `status` on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum OptimizationResponse {
    Optimal(OptimalPlan),
    Infeasible {
        #[serde(default)]
        message: Option<String>,
    },
    Error {
        #[serde(default)]
        message: Option<String>,
    },
}

impl OptimizationResponse {
    pub fn as_optimal(&self) -> Option<&OptimalPlan> {
        match self {
            OptimizationResponse::Optimal(plan) => Some(plan),
            _ => None,
        }
    }

    pub fn is_optimal(&self) -> bool {
        matches!(self, OptimizationResponse::Optimal(_))
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            OptimizationResponse::Optimal(plan) => plan.message.as_deref(),
            OptimizationResponse::Infeasible { message } | OptimizationResponse::Error { message } => {
                message.as_deref()
            }
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            OptimizationResponse::Optimal(_) => "optimal",
            OptimizationResponse::Infeasible { .. } => "infeasible",
            OptimizationResponse::Error { .. } => "error",
        }
    }
}

/// Self-contained what-if query; does not touch the stored profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScenarioRequest {
    pub monthly_income: f64,
    pub fixed_expenses: BTreeMap<String, f64>,
    /// category -> (min, max), sent as a two-element array
    pub variable_categories: BTreeMap<String, (f64, f64)>,
    #[serde(default)]
    pub savings_goal: f64,
    #[serde(default = "default_months_to_goal")]
    pub months_to_goal: u32,
    #[serde(default)]
    pub optimization_mode: OptimizationMode,
}

pub const DEFAULT_MONTHS_TO_GOAL: u32 = 12;

fn default_months_to_goal() -> u32 {
    DEFAULT_MONTHS_TO_GOAL
}

impl ScenarioRequest {
    /// Snapshot a profile into a what-if query, targeting the top-priority goal.
    pub fn from_profile(profile: &BudgetProfile, mode: OptimizationMode, today: NaiveDate) -> Self {
        let fixed_expenses = profile
            .fixed_expenses
            .iter()
            .map(|e| (e.category.clone(), e.amount))
            .collect();

        let variable_categories = profile
            .variable_expenses
            .iter()
            .map(|e| (e.category.clone(), (e.min_amount, e.max_amount)))
            .collect();

        let (savings_goal, months_to_goal) = match profile.top_priority_goal() {
            Some(goal) => {
                let months = goal
                    .deadline
                    .map(|deadline| months_between(today, deadline))
                    .unwrap_or(DEFAULT_MONTHS_TO_GOAL);
                (goal.remaining(), months)
            }
            None => (0.0, DEFAULT_MONTHS_TO_GOAL),
        };

        Self {
            monthly_income: profile.monthly_income,
            fixed_expenses,
            variable_categories,
            savings_goal,
            months_to_goal,
            optimization_mode: mode,
        }
    }
}

/// Whole calendar months from `from` to `to`, never less than 1.
fn months_between(from: NaiveDate, to: NaiveDate) -> u32 {
    let diff = (to.year() - from.year()) * 12 + (to.month() as i32 - from.month() as i32);
    diff.max(1) as u32
}

/// One row of `/api/budget/history`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_id: Option<i64>,
    pub result_json: OptimizationResponse,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "timestamp::option")]
    pub created_at: Option<DateTime<Utc>>,
}

//
// ================= Wire Helpers =================
//

/// Money fields arrive as JSON numbers or, from decimal columns, as strings.
pub(crate) mod amount {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    fn resolve<E: Error>(raw: Raw) -> Result<f64, E> {
        match raw {
            Raw::Number(n) => Ok(n),
            Raw::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|e| E::custom(format!("invalid amount '{}': {}", s, e))),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        resolve(Raw::deserialize(deserializer)?)
    }

    pub fn deserialize_option<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<f64>, D::Error> {
        Option::<Raw>::deserialize(deserializer)?
            .map(resolve::<D::Error>)
            .transpose()
    }
}

/// Timestamps in RFC 3339, or naive ISO-8601 which is taken as UTC.
pub(crate) mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
            .ok()
            .map(|naive| naive.and_utc())
    }

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| D::Error::custom(format!("invalid timestamp '{}'", raw)))
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(dt) => serializer.serialize_some(&dt.to_rfc3339()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                Some(raw) => parse(&raw)
                    .map(Some)
                    .ok_or_else(|| D::Error::custom(format!("invalid timestamp '{}'", raw))),
                None => Ok(None),
            }
        }
    }
}
