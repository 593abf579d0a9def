//! Multi-step budget setup form
//!
//! Income, fixed expenses, variable expenses, then goals. Entries are
//! submitted verbatim; the server owns validation.

use chrono::NaiveDate;
use std::fmt;

use super::Route;
use crate::models::{BudgetProfile, FinancialGoal, FixedExpense, VariableExpense};
use crate::state::ProfileState;

pub const SAVE_FAILED: &str = "Failed to save budget profile";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FormStep {
    Income = 1,
    FixedExpenses = 2,
    VariableExpenses = 3,
    Goals = 4,
}

impl FormStep {
    pub const COUNT: u8 = 4;

    pub fn number(&self) -> u8 {
        *self as u8
    }

    fn from_number(n: u8) -> Self {
        match n {
            0 | 1 => FormStep::Income,
            2 => FormStep::FixedExpenses,
            3 => FormStep::VariableExpenses,
            _ => FormStep::Goals,
        }
    }
}

impl fmt::Display for FormStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FormStep::Income => "Monthly Income",
            FormStep::FixedExpenses => "Fixed Expenses",
            FormStep::VariableExpenses => "Variable Expenses",
            FormStep::Goals => "Financial Goals",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BudgetForm {
    step: FormStep,
    pub monthly_income: f64,
    pub fixed_expenses: Vec<FixedExpense>,
    pub variable_expenses: Vec<VariableExpense>,
    pub financial_goals: Vec<FinancialGoal>,
    submitting: bool,
    error: Option<String>,
}

impl Default for BudgetForm {
    fn default() -> Self {
        Self {
            step: FormStep::Income,
            monthly_income: 5000.0,
            fixed_expenses: vec![
                FixedExpense::new("Rent/Mortgage", 1500.0),
                FixedExpense::new("Insurance", 200.0),
                FixedExpense::new("Subscriptions", 50.0),
            ],
            variable_expenses: vec![
                VariableExpense::new("Groceries", 200.0, 600.0),
                VariableExpense::new("Dining Out", 0.0, 400.0),
                VariableExpense::new("Entertainment", 50.0, 300.0),
                VariableExpense::new("Shopping", 0.0, 500.0),
                VariableExpense::new("Transportation", 50.0, 300.0),
                VariableExpense::new("Health/Fitness", 0.0, 200.0),
            ],
            financial_goals: vec![FinancialGoal::new("Emergency Fund", 10000.0, 0.0, 1)],
            submitting: false,
            error: None,
        }
    }
}

impl BudgetForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing profile, for editing.
    pub fn from_profile(profile: &BudgetProfile) -> Self {
        let clean = profile.without_server_fields();
        Self {
            monthly_income: clean.monthly_income,
            fixed_expenses: clean.fixed_expenses,
            variable_expenses: clean.variable_expenses,
            financial_goals: clean.financial_goals,
            ..Self::default()
        }
    }

    // =============================
    // Navigation
    // =============================

    pub fn step(&self) -> FormStep {
        self.step
    }

    pub fn next(&mut self) -> FormStep {
        self.step = FormStep::from_number((self.step.number() + 1).min(FormStep::COUNT));
        self.step
    }

    pub fn previous(&mut self) -> FormStep {
        self.step = FormStep::from_number(self.step.number().saturating_sub(1).max(1));
        self.step
    }

    pub fn is_last_step(&self) -> bool {
        self.step == FormStep::Goals
    }

    /// Completion in percent, for a progress bar.
    pub fn progress(&self) -> f64 {
        f64::from(self.step.number()) / f64::from(FormStep::COUNT) * 100.0
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    // =============================
    // Entries
    // =============================

    pub fn add_fixed_expense(&mut self) -> &mut FixedExpense {
        self.fixed_expenses.push(FixedExpense::new("", 0.0));
        let last = self.fixed_expenses.len() - 1;
        &mut self.fixed_expenses[last]
    }

    pub fn fixed_expense_mut(&mut self, index: usize) -> Option<&mut FixedExpense> {
        self.fixed_expenses.get_mut(index)
    }

    pub fn remove_fixed_expense(&mut self, index: usize) -> Option<FixedExpense> {
        (index < self.fixed_expenses.len()).then(|| self.fixed_expenses.remove(index))
    }

    pub fn add_variable_expense(&mut self) -> &mut VariableExpense {
        self.variable_expenses.push(VariableExpense::new("", 0.0, 0.0));
        let last = self.variable_expenses.len() - 1;
        &mut self.variable_expenses[last]
    }

    pub fn variable_expense_mut(&mut self, index: usize) -> Option<&mut VariableExpense> {
        self.variable_expenses.get_mut(index)
    }

    pub fn remove_variable_expense(&mut self, index: usize) -> Option<VariableExpense> {
        (index < self.variable_expenses.len()).then(|| self.variable_expenses.remove(index))
    }

    pub fn add_goal(&mut self) -> &mut FinancialGoal {
        self.financial_goals.push(FinancialGoal::new("", 0.0, 0.0, 1));
        let last = self.financial_goals.len() - 1;
        &mut self.financial_goals[last]
    }

    pub fn goal_mut(&mut self, index: usize) -> Option<&mut FinancialGoal> {
        self.financial_goals.get_mut(index)
    }

    pub fn remove_goal(&mut self, index: usize) -> Option<FinancialGoal> {
        (index < self.financial_goals.len()).then(|| self.financial_goals.remove(index))
    }

    /// Set a goal deadline from date-input text. Empty text clears it.
    pub fn set_goal_deadline(&mut self, index: usize, raw: &str) -> Result<(), String> {
        let deadline = match raw.trim() {
            "" => None,
            text => Some(
                NaiveDate::parse_from_str(text, "%Y-%m-%d")
                    .map_err(|e| format!("invalid deadline '{}': {}", text, e))?,
            ),
        };

        let goal = self
            .financial_goals
            .get_mut(index)
            .ok_or_else(|| format!("no goal at position {}", index))?;
        goal.deadline = deadline;
        Ok(())
    }

    // =============================
    // Submit
    // =============================

    pub fn to_profile(&self) -> BudgetProfile {
        BudgetProfile {
            fixed_expenses: self.fixed_expenses.clone(),
            variable_expenses: self.variable_expenses.clone(),
            financial_goals: self.financial_goals.clone(),
            ..BudgetProfile::new(self.monthly_income)
        }
    }

    /// Save through the profile state. On success returns where to go next.
    pub async fn submit(&mut self, profiles: &ProfileState) -> Option<Route> {
        self.submitting = true;
        self.error = None;

        let saved = profiles.save(&self.to_profile()).await;
        self.submitting = false;

        if saved {
            Some(Route::Dashboard)
        } else {
            self.error = Some(SAVE_FAILED.to_string());
            None
        }
    }
}
