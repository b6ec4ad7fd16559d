//! School Service
//!
//! Login, bearer verification and per-operation role checks for the school
//! management API.

pub mod config;
pub mod http;
pub mod policies;
pub mod repository;
pub mod service;

pub use config::ServiceConfig;
pub use http::{router, ApiError, AppState};
pub use policies::Operation;
pub use repository::{InMemoryUserStore, NewUser};
pub use service::{AccessToken, AuthService};
