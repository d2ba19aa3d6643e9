use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use chrono::Utc;
use tracing::info;

use warden_core::ScheduledAction;
use warden_types::error::CoreError;
use warden_types::outbound::{Embed, EmbedColor, ReplyPayload};

use crate::dispatcher::Dispatcher;

pub const YES_EMOJI: &str = "👍";
pub const NO_EMOJI: &str = "👎";

/// A running poll. In-memory only: unlike giveaways, a poll that does not
/// survive a restart is an accepted loss — there is no persisted record to
/// re-arm from.
#[derive(Debug, Clone)]
pub struct PollRecord {
    pub channel_id: String,
    pub question: String,
    /// emoji -> voters. A subject's reaction add/remove toggles set
    /// membership, so double votes collapse.
    pub votes: BTreeMap<String, BTreeSet<String>>,
}

impl Dispatcher {
    pub(crate) fn cmd_poll(
        &self,
        channel_id: &str,
        question: &str,
        duration_secs: u64,
    ) -> Result<(), CoreError> {
        if duration_secs == 0 {
            self.inner.sink.reply(
                channel_id,
                ReplyPayload::ephemeral("Poll duration must be positive."),
            );
            return Ok(());
        }

        let message_ref = format!("poll-{}-{}", channel_id, Utc::now().timestamp_millis());

        self.inner.polls.lock().unwrap().insert(
            message_ref.clone(),
            PollRecord {
                channel_id: channel_id.to_string(),
                question: question.to_string(),
                votes: BTreeMap::new(),
            },
        );

        self.inner.sink.tracked_post(
            channel_id,
            &message_ref,
            ReplyPayload {
                content: String::new(),
                embed: Some(Embed {
                    title: format!("Poll: {question}"),
                    description: format!("Vote with {YES_EMOJI} or {NO_EMOJI}."),
                    color: EmbedColor::Blue,
                }),
                component_id: None,
                ephemeral: false,
            },
        );

        let this = self.clone();
        let timer_ref = message_ref.clone();
        let action = ScheduledAction::arm(Duration::from_secs(duration_secs), async move {
            this.conclude_poll(&timer_ref);
        });
        self.inner.timers.lock().unwrap().insert(message_ref, action);
        Ok(())
    }

    /// Record or withdraw a poll vote. Returns false if the message
    /// tracks no poll.
    pub(crate) fn poll_vote(
        &self,
        message_ref: &str,
        subject_id: &str,
        emoji: &str,
        added: bool,
    ) -> bool {
        if emoji != YES_EMOJI && emoji != NO_EMOJI {
            return false;
        }
        let mut polls = self.inner.polls.lock().unwrap();
        let Some(poll) = polls.get_mut(message_ref) else {
            return false;
        };
        let voters = poll.votes.entry(emoji.to_string()).or_default();
        if added {
            voters.insert(subject_id.to_string());
        } else {
            voters.remove(subject_id);
        }
        true
    }

    fn conclude_poll(&self, message_ref: &str) {
        self.inner.timers.lock().unwrap().remove(message_ref);

        let Some(poll) = self.inner.polls.lock().unwrap().remove(message_ref) else {
            return;
        };

        let count = |emoji: &str| poll.votes.get(emoji).map_or(0, BTreeSet::len);
        let yes = count(YES_EMOJI);
        let no = count(NO_EMOJI);

        info!("poll {:?} closed: {} yes / {} no", poll.question, yes, no);
        self.inner.sink.reply(
            &poll.channel_id,
            ReplyPayload::text(format!(
                "Poll **{}** closed: {YES_EMOJI} {yes} — {NO_EMOJI} {no}",
                poll.question
            )),
        );
    }
}
