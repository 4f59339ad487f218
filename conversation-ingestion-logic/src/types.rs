use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Conversation lifecycle state, stored as a smallint in the durable store
/// and as `resolution_status` on hot-store items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Resolved = 0,
    Unresolved = 1,
    InProgress = 2,
    Unclassified = 3,
    HasChatRoom = 4,
}

impl Resolution {
    pub fn from_i16(value: i16) -> Option<Self> {
        match value {
            0 => Some(Self::Resolved),
            1 => Some(Self::Unresolved),
            2 => Some(Self::InProgress),
            3 => Some(Self::Unclassified),
            4 => Some(Self::HasChatRoom),
            _ => None,
        }
    }

    pub fn as_i16(self) -> i16 {
        self as i16
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Resolved => "Resolved",
            Self::Unresolved => "Unresolved",
            Self::InProgress => "In Progress",
            Self::Unclassified => "Unclassified",
            Self::HasChatRoom => "Has Chat Room",
        }
    }

    /// Display label for a raw column value, for log fields.
    pub fn label_of(value: i16) -> &'static str {
        Self::from_i16(value).map_or("Unknown", Self::label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageDirection {
    Incoming,
    Outgoing,
}

impl MessageDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Incoming => "incoming",
            Self::Outgoing => "outgoing",
        }
    }
}

/// Identity of a single logical conversation: the hot-store partition and
/// the registry lookup tuple are both derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationScope {
    pub project_uuid: Uuid,
    pub contact_urn: String,
    pub channel_uuid: Uuid,
}

impl ConversationScope {
    pub fn new(project_uuid: Uuid, contact_urn: impl Into<String>, channel_uuid: Uuid) -> Self {
        Self {
            project_uuid,
            contact_urn: contact_urn.into(),
            channel_uuid,
        }
    }

    pub fn partition_key(&self) -> String {
        format!(
            "{}#{}#{}",
            self.project_uuid, self.contact_urn, self.channel_uuid
        )
    }
}

/// One archived message, both the hot-store read shape and the JSON element
/// stored in `conversation_messages.messages`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivedMessage {
    pub text: String,
    pub source: String,
    pub created_at: String,
}

/// Per-channel resolution tallies for one day, the unit of the billing
/// rollup. Computed on demand, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChannelResolutionCount {
    pub channel_uuid: Uuid,
    pub resolved: u64,
    pub unresolved: u64,
    pub has_chats_rooms: u64,
    pub unclassified: u64,
}

impl ChannelResolutionCount {
    pub fn empty(channel_uuid: Uuid) -> Self {
        Self {
            channel_uuid,
            ..Default::default()
        }
    }
}
