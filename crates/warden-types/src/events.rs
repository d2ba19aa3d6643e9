use serde::{Deserialize, Serialize};

/// Events delivered by the platform adapter over the gateway.
///
/// This is a closed set: anything the adapter sends that does not
/// deserialize into one of these variants is dropped at the connection
/// layer, and variants with no handler are silently ignored by the
/// dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum InboundEvent {
    /// A slash-command invocation, already parsed into a closed enum.
    Command {
        channel_id: String,
        subject_id: String,
        scope_id: String,
        command: Command,
    },

    /// A button or other interactive-component trigger. The custom id is
    /// namespaced `action-payload` and parsed via [`ComponentAction::parse`].
    Component {
        channel_id: String,
        subject_id: String,
        message_ref: String,
        custom_id: String,
    },

    /// A form (modal) submission keyed by its custom id.
    ModalSubmit {
        channel_id: String,
        subject_id: String,
        custom_id: String,
        fields: std::collections::BTreeMap<String, String>,
    },

    /// A plain message — feeds leveling XP and AFK tracking.
    Message {
        channel_id: String,
        subject_id: String,
        scope_id: String,
        content: String,
        mentions: Vec<String>,
    },

    /// A reaction was added to a message the core may be tracking
    /// (giveaway entries, poll votes).
    ReactionAdd {
        channel_id: String,
        message_ref: String,
        subject_id: String,
        emoji: String,
    },

    /// A reaction was removed.
    ReactionRemove {
        channel_id: String,
        message_ref: String,
        subject_id: String,
        emoji: String,
    },
}

impl InboundEvent {
    /// The channel a generic failure reply for this event should target.
    pub fn channel_id(&self) -> &str {
        match self {
            Self::Command { channel_id, .. }
            | Self::Component { channel_id, .. }
            | Self::ModalSubmit { channel_id, .. }
            | Self::Message { channel_id, .. }
            | Self::ReactionAdd { channel_id, .. }
            | Self::ReactionRemove { channel_id, .. } => channel_id,
        }
    }
}

/// Supported slash commands, one variant per command with its required
/// options. The platform adapter maps the SDK's command payload into this
/// enum, so dispatch is an exhaustive match rather than string comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "name", content = "options", rename_all = "snake_case")]
pub enum Command {
    /// Look up a channel by name and report its subscriber count.
    Subscribers { channel: String },

    /// Random pick from the fixed joke list.
    Joke,

    /// A random post from the configured social feed.
    Meme,

    /// Current up/down snapshot of the configured services.
    Status,

    /// Mark the invoking subject away, with an optional note.
    Afk { note: Option<String> },

    /// The invoking subject's level and XP in this scope.
    Rank,

    /// Append a warning to a subject's record.
    Warn { target: String, reason: String },

    /// List a subject's warnings.
    Warnings { target: String },

    /// Clear a subject's warnings and re-arm the threshold guard.
    ClearWarnings { target: String },

    /// Start a giveaway in the invoking channel.
    GiveawayStart {
        duration_secs: u64,
        winner_count: u32,
        prize: String,
    },

    /// Draw fresh winners from a concluded-or-running giveaway's
    /// participant set without modifying it.
    GiveawayReroll { giveaway_id: String },

    /// Start a timed reaction poll.
    Poll { question: String, duration_secs: u64 },
}

/// Interactive-component triggers, parsed from a namespaced custom id of
/// the form `action-payload`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentAction {
    /// `reload-{channel_id}`: refresh a subscriber count.
    Reload { channel_id: String },
}

impl ComponentAction {
    /// Parse a custom id. `None` means the id belongs to no action we
    /// handle; the dispatcher ignores it silently.
    pub fn parse(custom_id: &str) -> Option<Self> {
        let (action, payload) = custom_id.split_once('-')?;
        match action {
            "reload" => Some(Self::Reload {
                channel_id: payload.to_string(),
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_reload_component_id() {
        assert_eq!(
            ComponentAction::parse("reload-UCabc123"),
            Some(ComponentAction::Reload {
                channel_id: "UCabc123".into()
            })
        );
    }

    #[test]
    fn unknown_component_ids_are_none() {
        assert_eq!(ComponentAction::parse("dismiss-xyz"), None);
        assert_eq!(ComponentAction::parse("no_separator"), None);
    }

    #[test]
    fn command_event_round_trips_through_json() {
        let event = InboundEvent::Command {
            channel_id: "c1".into(),
            subject_id: "u1".into(),
            scope_id: "g1".into(),
            command: Command::Subscribers {
                channel: "SomeChannel".into(),
            },
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: InboundEvent = serde_json::from_str(&json).unwrap();
        match back {
            InboundEvent::Command {
                command: Command::Subscribers { channel },
                ..
            } => assert_eq!(channel, "SomeChannel"),
            other => panic!("unexpected variant: {:?}", other),
        }
    }
}
