pub mod card_client;
pub mod config;
pub mod http_client;
pub mod services;

pub use services::join::{FailureReason, JoinFailure, JoinOutcome, JoinTarget, NetworkJoin};
pub use services::status::{CardStatusResolver, ConnectionTestState, StatusResolver};
