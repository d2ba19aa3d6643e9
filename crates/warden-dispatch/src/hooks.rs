use chrono::Utc;
use tracing::debug;

use warden_types::error::CoreError;
use warden_types::outbound::ReplyPayload;

use crate::dispatcher::Dispatcher;
use crate::giveaway::ENTRY_EMOJI;

impl Dispatcher {
    /// Plain-message hooks: AFK bookkeeping, then leveling XP.
    pub(crate) async fn handle_message(
        &self,
        channel_id: &str,
        subject_id: &str,
        scope_id: &str,
        _content: &str,
        mentions: &[String],
    ) -> Result<(), CoreError> {
        // Speaking clears your own AFK marker.
        if let Some(record) = self.inner.afk.clear(subject_id) {
            let away_for = Utc::now() - record.since;
            self.inner.sink.reply(
                channel_id,
                ReplyPayload::text(format!(
                    "Welcome back <@{subject_id}>! You were away for {} minute(s).",
                    away_for.num_minutes().max(0)
                )),
            );
        }

        // Surface notes for mentioned subjects who are away.
        for mentioned in mentions {
            if let Some(record) = self.inner.afk.get(mentioned) {
                self.inner.sink.reply(
                    channel_id,
                    ReplyPayload::text(format!("<@{mentioned}> is AFK: {}", record.note)),
                );
            }
        }

        // XP, throttled per subject so spam doesn't farm levels. The
        // check-and-start is one step, so two messages handled in
        // parallel can't both grant.
        if self
            .inner
            .cooldowns
            .try_start(subject_id, "xp", self.inner.config.xp_cooldown)
        {
            let grant =
                self.inner
                    .levels
                    .grant_xp(subject_id, scope_id, self.inner.config.xp_per_message);
            if grant.leveled_up {
                self.inner.sink.reply(
                    channel_id,
                    ReplyPayload::text(format!(
                        "<@{subject_id}> reached level {}!",
                        grant.level
                    )),
                );
            }
        }

        Ok(())
    }

    /// Reaction hooks: giveaway entries and poll votes. Reactions on
    /// anything else are silently ignored.
    pub(crate) fn handle_reaction(
        &self,
        message_ref: &str,
        subject_id: &str,
        emoji: &str,
        added: bool,
    ) {
        if emoji == ENTRY_EMOJI {
            let changed = if added {
                self.inner.giveaways.add_participant(message_ref, subject_id)
            } else {
                self.inner
                    .giveaways
                    .remove_participant(message_ref, subject_id)
            };
            if changed {
                return;
            }
        }

        if self.poll_vote(message_ref, subject_id, emoji, added) {
            return;
        }

        debug!("ignoring reaction {} on {}", emoji, message_ref);
    }
}
