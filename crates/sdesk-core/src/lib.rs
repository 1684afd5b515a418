//! Client library for the sdesk service-desk backend.
//!
//! Session persistence, the refreshing HTTP client, login/logout, role
//! policy and navigation. Shared by the `sdesk` CLI and the TUI.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod forms;
pub mod logging;
pub mod models;
pub mod policy;
pub mod session;
pub mod views;

pub use api::ApiClient;
pub use auth::AuthContext;
pub use config::Config;
pub use error::ApiError;
pub use session::{Principal, Role, Session, SessionStore};
