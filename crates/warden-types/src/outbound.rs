use serde::{Deserialize, Serialize};

/// Frames sent back to the platform adapter over the gateway.
///
/// The core is fire-and-forget past this point: the adapter owns message
/// posting, embed rendering and the actual moderation SDK calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OutboundFrame {
    /// Post a reply into a channel.
    Reply {
        channel_id: String,
        payload: ReplyPayload,
    },

    /// Post a message the core wants to track reactions on (giveaways,
    /// polls). The adapter must tag the posted message with `message_ref`
    /// so later reaction events carry it back.
    TrackedPost {
        channel_id: String,
        message_ref: String,
        payload: ReplyPayload,
    },

    /// Replace the content of a previously tracked message.
    EditTracked {
        channel_id: String,
        message_ref: String,
        payload: ReplyPayload,
    },

    /// Ask the adapter to perform a moderation action. One-line SDK glue
    /// on the adapter side; the decision logic lives here.
    Moderation {
        action: ModerationAction,
        subject_id: String,
        reason: String,
    },
}

/// What a reply looks like before the adapter renders it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplyPayload {
    pub content: String,

    /// Optional embed block; `None` renders as plain text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embed: Option<Embed>,

    /// Optional interactive component (a single button), identified by a
    /// namespaced `action-payload` custom id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component_id: Option<String>,

    /// Visible only to the triggering subject.
    #[serde(default)]
    pub ephemeral: bool,
}

impl ReplyPayload {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn ephemeral(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: true,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embed {
    pub title: String,
    pub description: String,
    pub color: EmbedColor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmbedColor {
    Blue,
    Green,
    Red,
    Gold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationAction {
    Ban,
}
