//! Message model and strongly-typed identifiers.
//!
//! Defines the persisted message record, its status state machine, and the
//! newtype id wrapper with database serialization support.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

type PgDb = sqlx::Postgres;
type PgValueRef<'r> = sqlx::postgres::PgValueRef<'r>;
type PgTypeInfo = sqlx::postgres::PgTypeInfo;
type PgArgumentBuffer = sqlx::postgres::PgArgumentBuffer;
type EncodeResult =
    Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync + 'static>>;
type BoxDynError = sqlx::error::BoxDynError;

/// Strongly-typed message identifier.
///
/// Wraps a UUID assigned by the store at insertion. The id follows the
/// message through its entire lifecycle and appears in every log line that
/// touches the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub Uuid);

impl MessageId {
    /// Creates a new random message ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for MessageId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl sqlx::Type<PgDb> for MessageId {
    fn type_info() -> PgTypeInfo {
        <Uuid as sqlx::Type<PgDb>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, PgDb> for MessageId {
    fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
        let uuid = <Uuid as sqlx::Decode<PgDb>>::decode(value)?;
        Ok(Self(uuid))
    }
}

impl sqlx::Encode<'_, PgDb> for MessageId {
    fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> EncodeResult {
        <Uuid as sqlx::Encode<PgDb>>::encode_by_ref(&self.0, buf)
    }
}

/// Delivery status of a message record.
///
/// The only legal transitions are `unsent -> processing` and
/// `processing -> sent | failed`. `sent` and `failed` are terminal. The
/// repository enforces the edges with status guards on its updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    /// Waiting in the queue; eligible for claiming.
    Unsent,

    /// Claimed by a worker. Prevents concurrent dispatch of the same record.
    Processing,

    /// Dispatched and acknowledged by the webhook. Terminal.
    Sent,

    /// Rejected by validation or the webhook. Terminal; never retried.
    Failed,
}

impl MessageStatus {
    /// Returns true for states with no outgoing transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Sent | Self::Failed)
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsent => write!(f, "unsent"),
            Self::Processing => write!(f, "processing"),
            Self::Sent => write!(f, "sent"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for MessageStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unsent" => Ok(Self::Unsent),
            "processing" => Ok(Self::Processing),
            "sent" => Ok(Self::Sent),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("invalid message status: {s}")),
        }
    }
}

impl sqlx::Type<PgDb> for MessageStatus {
    fn type_info() -> PgTypeInfo {
        <&str as sqlx::Type<PgDb>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, PgDb> for MessageStatus {
    fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
        let s = <&str as sqlx::Decode<PgDb>>::decode(value)?;
        s.parse().map_err(Into::into)
    }
}

/// Persisted unit of work for the dispatch engine.
///
/// A record enters the store as `unsent`, is claimed into `processing` by
/// exactly one worker, and ends in one of the terminal states. `sent_at` and
/// `webhook_message_id` are populated only on the `sent` transition;
/// `failure_reason` only on `failed`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    /// Unique identifier, assigned by the store.
    pub id: MessageId,

    /// Text payload. The validator bounds its length before dispatch.
    pub content: String,

    /// Destination address. Free-form; not interpreted by the engine.
    pub recipient: String,

    /// Current position in the state machine.
    pub status: MessageStatus,

    /// Advisory reason recorded on the `failed` transition.
    pub failure_reason: Option<String>,

    /// Identifier returned by the webhook on acceptance.
    pub webhook_message_id: Option<String>,

    /// When the record was inserted. Claim order is ascending on this field.
    pub created_at: DateTime<Utc>,

    /// When the record reached `sent`; absent otherwise.
    pub sent_at: Option<DateTime<Utc>>,
}
