//! Core domain types for the courier message-dispatch service.
//!
//! Provides the message model and its state machine, the pure message
//! validator, the clock abstraction, and the PostgreSQL repository layer.
//! The dispatch engine and the HTTP surface both build on these types.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod models;
pub mod storage;
pub mod time;
pub mod validate;

pub use error::{CoreError, Result};
pub use models::{Message, MessageId, MessageStatus};
pub use time::{Clock, RealClock};
pub use validate::{MessageValidator, ValidationError, MAX_CONTENT_CHARS, MIN_CONTENT_CHARS};
