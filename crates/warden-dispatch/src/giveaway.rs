use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use warden_core::ScheduledAction;
use warden_types::error::CoreError;
use warden_types::outbound::{Embed, EmbedColor, ReplyPayload};

use crate::dispatcher::Dispatcher;

/// Reaction that enters a giveaway.
pub const ENTRY_EMOJI: &str = "🎉";

impl Dispatcher {
    pub(crate) fn cmd_giveaway_start(
        &self,
        channel_id: &str,
        subject_id: &str,
        duration_secs: u64,
        winner_count: u32,
        prize: &str,
    ) -> Result<(), CoreError> {
        if duration_secs == 0 || winner_count == 0 {
            self.inner.sink.reply(
                channel_id,
                ReplyPayload::ephemeral("Duration and winner count must both be positive."),
            );
            return Ok(());
        }

        // The wire allows any u64; anything chrono can't represent (or
        // that overflows the calendar) is rejected, never a panic.
        let Some(ends_at) = i64::try_from(duration_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .and_then(|span| Utc::now().checked_add_signed(span))
        else {
            self.inner.sink.reply(
                channel_id,
                ReplyPayload::ephemeral("That duration is too long."),
            );
            return Ok(());
        };
        let (id, record) =
            self.inner
                .giveaways
                .create(channel_id, subject_id, prize, winner_count, ends_at);

        self.inner.sink.tracked_post(
            channel_id,
            &record.message_ref,
            ReplyPayload {
                content: String::new(),
                embed: Some(Embed {
                    title: format!("Giveaway: {prize}"),
                    description: format!(
                        "React with {ENTRY_EMOJI} to enter! {} winner(s), ends {}.",
                        winner_count,
                        ends_at.format("%Y-%m-%d %H:%M UTC")
                    ),
                    color: EmbedColor::Gold,
                }),
                component_id: None,
                ephemeral: false,
            },
        );

        info!("giveaway {} started, ends {}", id, ends_at);
        self.arm_giveaway(id, Duration::from_secs(duration_secs));
        Ok(())
    }

    pub(crate) fn cmd_giveaway_reroll(
        &self,
        channel_id: &str,
        giveaway_id: &str,
    ) -> Result<(), CoreError> {
        let Some(record) = self.inner.giveaways.get(giveaway_id) else {
            self.inner.sink.reply(
                channel_id,
                ReplyPayload::ephemeral("No giveaway with that id."),
            );
            return Ok(());
        };

        let winners = self
            .inner
            .giveaways
            .draw_winners(giveaway_id, record.winner_count as usize);
        if winners.is_empty() {
            self.inner
                .sink
                .reply(channel_id, ReplyPayload::text("Nobody has entered yet."));
            return Ok(());
        }

        self.inner.sink.reply(
            channel_id,
            ReplyPayload::text(format!(
                "Reroll for **{}**: {}",
                record.prize,
                mention_list(&winners)
            )),
        );
        Ok(())
    }

    /// Arm the conclusion timer for a giveaway. The delay is zero when a
    /// loaded record is already past due.
    pub(crate) fn arm_giveaway(&self, id: String, delay: Duration) {
        let this = self.clone();
        let timer_id = id.clone();
        let action = ScheduledAction::arm(delay, async move {
            this.conclude_giveaway(&timer_id).await;
        });
        self.inner.timers.lock().unwrap().insert(id, action);
    }

    async fn conclude_giveaway(&self, id: &str) {
        // Drop our own timer handle; the action has fired.
        self.inner.timers.lock().unwrap().remove(id);

        let Some(record) = self.inner.giveaways.get(id) else {
            warn!("giveaway {} vanished before its conclusion", id);
            return;
        };

        let winners = self
            .inner
            .giveaways
            .draw_winners(id, record.winner_count as usize);

        let announcement = if winners.is_empty() {
            format!("The giveaway for **{}** ended with no entries.", record.prize)
        } else {
            format!(
                "The giveaway for **{}** is over! Winner(s): {}",
                record.prize,
                mention_list(&winners)
            )
        };

        self.inner
            .sink
            .reply(&record.channel_id, ReplyPayload::text(announcement));

        // Terminal: the record is only deleted after the announcement is
        // on its way, so a crash before this point leaves a past-due
        // record that concludes on next load instead of a lost giveaway.
        self.inner.giveaways.conclude(id);
        info!("giveaway {} concluded with {} winner(s)", id, winners.len());
    }

    /// Re-arm every persisted giveaway after a restart. Past-due records
    /// conclude immediately; the rest run out their remaining delay.
    pub fn restore_scheduled(&self) {
        let now = Utc::now();
        for (id, record) in self.inner.giveaways.all() {
            let remaining = (record.ends_at - now)
                .to_std()
                .unwrap_or(Duration::ZERO);
            info!(
                "re-arming giveaway {} ({}s remaining)",
                id,
                remaining.as_secs()
            );
            self.arm_giveaway(id, remaining);
        }
    }
}

fn mention_list(subjects: &[String]) -> String {
    subjects
        .iter()
        .map(|id| format!("<@{id}>"))
        .collect::<Vec<_>>()
        .join(", ")
}
