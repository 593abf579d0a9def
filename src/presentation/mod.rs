//! Presentation model
//!
//! Renderer-agnostic form and dashboard logic on top of the state objects.
//! Drawing is left to whatever front end consumes these types.

pub mod dashboard;
pub mod form;

pub use dashboard::{Dashboard, DashboardSummary, DashboardView};
pub use form::{BudgetForm, FormStep};

use crate::state::SessionSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    BudgetSetup,
    Dashboard,
}

impl Route {
    /// Where an authenticated-only screen should go given the session.
    /// `None` means stay put (the session is still resolving or is fine).
    pub fn after_session(session: &SessionSnapshot) -> Option<Route> {
        use crate::state::SessionStatus;

        match session.status {
            SessionStatus::Anonymous => Some(Route::Login),
            SessionStatus::Unknown | SessionStatus::Checking | SessionStatus::Authenticated(_) => None,
        }
    }
}
