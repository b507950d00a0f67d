//! Typed access to the bot service through the gateway: request wrappers,
//! response normalization, outcome classification and a polled query cache.

pub mod api;
pub mod cache;
pub mod dashboard;
pub mod outcome;
pub mod phone;
pub mod probe;
pub mod transform;

pub use api::{ApiClient, ClientError};
pub use dashboard::Dashboard;
