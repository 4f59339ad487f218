use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::{queue::RawMessage, types::MessageDirection};

pub const EVENT_TYPE_MESSAGE_RECEIVED: &str = "message.received";
pub const EVENT_TYPE_MESSAGE_SENT: &str = "message.sent";
pub const EVENT_TYPE_CONVERSATION_WINDOW: &str = "conversation.window";

/// Deterministic decode failures; the consumer acks these instead of
/// letting the queue redeliver them.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown event type: {0:?}")]
    UnknownEventType(Option<String>),
    #[error("invalid field `{field}`: {message}")]
    Field {
        field: &'static str,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Message(MessageDirection, MessageEvent),
    ConversationWindow(WindowEvent),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessageEvent {
    pub correlation_id: String,
    pub project_uuid: Uuid,
    pub contact_urn: String,
    pub channel_uuid: Option<Uuid>,
    pub message: MessagePayload,
    /// Naive UTC instant of the message; falls back to "now" when the
    /// payload timestamp is absent or unparsable.
    pub timestamp: NaiveDateTime,
    pub key: Option<String>,
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessagePayload {
    pub id: Option<String>,
    pub text: String,
    pub source: Option<String>,
    pub contact_name: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowEvent {
    pub correlation_id: String,
    pub project_uuid: Uuid,
    pub contact_urn: String,
    pub channel_uuid: Option<Uuid>,
    pub external_id: Option<String>,
    pub start_date: Option<NaiveDateTime>,
    pub end_date: Option<NaiveDateTime>,
    pub has_chats_room: bool,
    pub contact_name: Option<String>,
}

impl Event {
    /// Decodes a raw queue message into a typed event, keyed on the
    /// `event_type` message attribute with the top-level body field as a
    /// fallback.
    pub fn decode(raw: &RawMessage) -> Result<Self, DecodeError> {
        let body: Value = serde_json::from_str(&raw.body)?;
        let event_type = raw
            .event_type
            .clone()
            .or_else(|| string_field(&body, "event_type"));

        match event_type.as_deref() {
            Some(EVENT_TYPE_MESSAGE_RECEIVED) => Ok(Event::Message(
                MessageDirection::Incoming,
                MessageEvent::from_body(&body)?,
            )),
            Some(EVENT_TYPE_MESSAGE_SENT) => Ok(Event::Message(
                MessageDirection::Outgoing,
                MessageEvent::from_body(&body)?,
            )),
            Some(EVENT_TYPE_CONVERSATION_WINDOW) => {
                Ok(Event::ConversationWindow(WindowEvent::from_body(&body)?))
            }
            other => Err(DecodeError::UnknownEventType(other.map(str::to_string))),
        }
    }
}

impl MessageEvent {
    fn from_body(body: &Value) -> Result<Self, DecodeError> {
        let data = body.get("data").cloned().unwrap_or_default();
        let message = data.get("message").cloned().unwrap_or_default();

        let created_at = string_field(&message, "created_at");
        let timestamp = created_at
            .as_deref()
            .and_then(parse_timestamp)
            .unwrap_or_else(|| Utc::now().naive_utc());

        Ok(Self {
            correlation_id: string_field(body, "correlation_id").unwrap_or_default(),
            project_uuid: uuid_field(&data, "project_uuid")?,
            contact_urn: string_field(&data, "contact_urn").unwrap_or_default(),
            channel_uuid: optional_uuid_field(&data, "channel_uuid")?,
            message: MessagePayload {
                id: string_field(&message, "message_id").or_else(|| string_field(&message, "id")),
                text: string_field(&message, "text").unwrap_or_default(),
                source: string_field(&message, "source"),
                contact_name: string_field(&message, "contact_name"),
                created_at,
            },
            timestamp,
            key: string_field(body, "key").or_else(|| string_field(&data, "key")),
            value: scalar_field(body, "value").or_else(|| scalar_field(&data, "value")),
        })
    }
}

impl WindowEvent {
    fn from_body(body: &Value) -> Result<Self, DecodeError> {
        let data = body.get("data").cloned().unwrap_or_default();

        let start_date = string_field(&data, "start")
            .or_else(|| string_field(&data, "start_date"))
            .as_deref()
            .and_then(parse_timestamp);
        let end_date = string_field(&data, "end")
            .or_else(|| string_field(&data, "end_date"))
            .as_deref()
            .and_then(parse_timestamp);

        Ok(Self {
            correlation_id: string_field(body, "correlation_id").unwrap_or_default(),
            project_uuid: uuid_field(&data, "project_uuid")?,
            contact_urn: string_field(&data, "contact_urn").unwrap_or_default(),
            channel_uuid: optional_uuid_field(&data, "channel_uuid")?,
            external_id: string_field(&data, "external_id").or_else(|| string_field(&data, "id")),
            start_date,
            end_date,
            has_chats_room: data
                .get("has_chats_room")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            contact_name: string_field(&data, "name")
                .or_else(|| string_field(&data, "contact_name")),
        })
    }
}

/// Lenient ISO-8601 handling: `Z` is normalized to `+00:00`, offsets are
/// converted away, and naive timestamps pass through as UTC.
fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let normalized = raw.replace('Z', "+00:00");
    if let Ok(parsed) = DateTime::parse_from_rfc3339(&normalized) {
        return Some(parsed.with_timezone(&Utc).naive_utc());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok()
}

fn string_field(value: &Value, field: &str) -> Option<String> {
    value
        .get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Like [`string_field`], but also accepts numeric and boolean scalars,
/// rendering them as strings (CSAT/NPS values arrive in either form).
fn scalar_field(value: &Value, field: &str) -> Option<String> {
    match value.get(field)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn uuid_field(value: &Value, field: &'static str) -> Result<Uuid, DecodeError> {
    let raw = string_field(value, field).ok_or(DecodeError::Field {
        field,
        message: "missing".to_string(),
    })?;
    raw.parse().map_err(|e| DecodeError::Field {
        field,
        message: format!("{e}"),
    })
}

fn optional_uuid_field(value: &Value, field: &'static str) -> Result<Option<Uuid>, DecodeError> {
    match string_field(value, field) {
        None => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|e| DecodeError::Field {
                field,
                message: format!("{e}"),
            }),
    }
}
