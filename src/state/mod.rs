//! Client-side state
//!
//! Session, budget profile and optimization state. Each object owns the last
//! snapshot it fetched and replaces it wholesale on success. Failures are
//! caught here and reduced to one display string; they never propagate.
//!
//! Operations take `&self`, so overlapping calls are allowed. Nothing
//! deduplicates them: the last response to arrive wins.

use crate::error::ClientError;
use tracing::error;

pub mod optimization;
pub mod profile;
pub mod session;

pub use optimization::{OptimizationSnapshot, OptimizationState};
pub use profile::{ProfileSnapshot, ProfileState};
pub use session::{SessionSnapshot, SessionState, SessionStatus};

/// A failure reduced for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Failure {
    pub message: String,
    /// The server rejected the session; the caller should route to login.
    pub session_expired: bool,
}

impl Failure {
    pub fn from_error(err: &ClientError, fallback: &str) -> Self {
        error!("{}: {}", fallback, err);
        Self {
            message: err.user_message(fallback),
            session_expired: err.is_unauthorized(),
        }
    }
}
