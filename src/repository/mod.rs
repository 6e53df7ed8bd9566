//! Database repository layer

pub mod event_repo;
pub mod user_repo;

pub use event_repo::*;
pub use user_repo::*;
