//! Business logic services layer

pub mod auth_service;
pub mod event_service;

pub use auth_service::{AuthService, BootstrapOutcome};
pub use event_service::EventService;
