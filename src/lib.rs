//! Budget Optimizer Client
//!
//! Client side of a personal budgeting service:
//! - Typed data contract for profiles, goals and optimization results
//! - Authenticated REST client with explicit bearer-token storage
//! - Session, budget profile and optimization state holders
//! - Renderer-agnostic setup form and dashboard view model
//!
//! The optimizer itself runs on the server and is reached only through
//! its request/response contract.
//!
//! FLOW:
//! PRESENTATION → STATE → CLIENT → HTTP → STATE SNAPSHOT → PRESENTATION

pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod presentation;
pub mod state;
pub mod token;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{ClientError, Result};

// Re-export common types
pub use client::BudgetApiClient;
pub use config::ClientConfig;
pub use models::*;
pub use token::{FileTokenStore, InMemoryTokenStore, TokenStore};
