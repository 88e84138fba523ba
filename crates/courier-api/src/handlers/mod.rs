//! Request handlers for the courier API.

pub mod health;
pub mod messages;
pub mod worker_pool;

pub use health::health_check;
pub use messages::list_sent_messages;
pub use worker_pool::{control_worker_pool, worker_pool_status};
