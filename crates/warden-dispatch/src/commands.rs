use rand::seq::IndexedRandom;
use tracing::info;

use warden_store::warnings::BAN_THRESHOLD;
use warden_types::error::CoreError;
use warden_types::events::ComponentAction;
use warden_types::outbound::{Embed, EmbedColor, ModerationAction, ReplyPayload};
use warden_types::records::ServiceState;

use crate::dispatcher::Dispatcher;

const JOKES: &[&str] = &[
    "Why don't scientists trust atoms? Because they make up everything!",
    "Why did the computer get cold? Because it forgot to close its Windows!",
    "Why do Java developers wear glasses? Because they don't C#!",
];

impl Dispatcher {
    pub(crate) async fn cmd_subscribers(
        &self,
        channel_id: &str,
        channel_name: &str,
    ) -> Result<(), CoreError> {
        let Some(channel) = self.inner.upstream.lookup_channel(channel_name).await? else {
            self.inner
                .sink
                .reply(channel_id, ReplyPayload::ephemeral("Channel not found."));
            return Ok(());
        };

        let count = self
            .inner
            .upstream
            .subscriber_count(&channel.channel_id)
            .await?;

        self.inner.sink.reply(
            channel_id,
            ReplyPayload {
                content: String::new(),
                embed: Some(Embed {
                    title: channel.title,
                    description: format!("Subscribers: **{count}**"),
                    color: EmbedColor::Blue,
                }),
                component_id: Some(format!("reload-{}", channel.channel_id)),
                ephemeral: false,
            },
        );
        Ok(())
    }

    /// The reload button under a subscriber embed. Per-subject cooldown so
    /// nobody hammers the estimation API through us.
    pub(crate) async fn handle_component(
        &self,
        channel_id: &str,
        subject_id: &str,
        message_ref: &str,
        action: ComponentAction,
    ) -> Result<(), CoreError> {
        match action {
            ComponentAction::Reload { channel_id: target_channel } => {
                if !self.inner.cooldowns.try_start(
                    subject_id,
                    "reload",
                    self.inner.config.reload_cooldown,
                ) {
                    self.inner.sink.reply(
                        channel_id,
                        ReplyPayload::ephemeral(format!(
                            "You are clicking too fast! Please wait {} seconds.",
                            self.inner.config.reload_cooldown.as_secs()
                        )),
                    );
                    return Ok(());
                }

                let count = self.inner.upstream.subscriber_count(&target_channel).await?;
                self.inner.sink.edit_tracked(
                    channel_id,
                    message_ref,
                    ReplyPayload {
                        content: String::new(),
                        embed: Some(Embed {
                            title: "Updated Subscriber Count".to_string(),
                            description: format!("Subscribers: **{count}**"),
                            color: EmbedColor::Green,
                        }),
                        component_id: Some(format!("reload-{target_channel}")),
                        ephemeral: false,
                    },
                );
                Ok(())
            }
        }
    }

    pub(crate) fn cmd_joke(&self, channel_id: &str) -> Result<(), CoreError> {
        let joke = JOKES
            .choose(&mut rand::rng())
            .copied()
            .unwrap_or(JOKES[0]);
        self.inner.sink.reply(channel_id, ReplyPayload::text(joke));
        Ok(())
    }

    pub(crate) async fn cmd_meme(&self, channel_id: &str) -> Result<(), CoreError> {
        let post = self.inner.upstream.random_post().await?;
        self.inner.sink.reply(
            channel_id,
            ReplyPayload {
                content: String::new(),
                embed: Some(Embed {
                    title: post.title,
                    description: post.url,
                    color: EmbedColor::Blue,
                }),
                component_id: None,
                ephemeral: false,
            },
        );
        Ok(())
    }

    pub(crate) async fn cmd_status(&self, channel_id: &str) -> Result<(), CoreError> {
        let snapshot = self.inner.status.current().await?;

        let mut lines = Vec::with_capacity(snapshot.services.len());
        for status in &snapshot.services {
            let marker = match status.state {
                ServiceState::Up => "up",
                ServiceState::Down => "down",
                ServiceState::Unknown => "unknown",
                ServiceState::Fixed => "back up",
            };
            lines.push(format!("{}: {}", status.service, marker));
        }

        self.inner.sink.reply(
            channel_id,
            ReplyPayload {
                content: String::new(),
                embed: Some(Embed {
                    title: "Service status".to_string(),
                    description: lines.join("\n"),
                    color: EmbedColor::Blue,
                }),
                component_id: None,
                ephemeral: false,
            },
        );
        Ok(())
    }

    pub(crate) fn cmd_afk(
        &self,
        channel_id: &str,
        subject_id: &str,
        note: Option<String>,
    ) -> Result<(), CoreError> {
        self.inner.afk.set(subject_id, note);
        self.inner.sink.reply(
            channel_id,
            ReplyPayload::ephemeral("You're marked AFK. I'll clear it when you're back."),
        );
        Ok(())
    }

    pub(crate) fn cmd_rank(
        &self,
        channel_id: &str,
        subject_id: &str,
        scope_id: &str,
    ) -> Result<(), CoreError> {
        let record = self.inner.levels.get(subject_id, scope_id);
        let needed = warden_types::records::required_xp(record.level);
        self.inner.sink.reply(
            channel_id,
            ReplyPayload::text(format!(
                "Level {} — {}/{} XP",
                record.level, record.xp, needed
            )),
        );
        Ok(())
    }

    pub(crate) fn cmd_warn(
        &self,
        channel_id: &str,
        target: &str,
        reason: &str,
    ) -> Result<(), CoreError> {
        let outcome = self.inner.warnings.add(target, reason);
        self.inner.sink.reply(
            channel_id,
            ReplyPayload::text(format!(
                "<@{target}> warned ({}/{BAN_THRESHOLD}): {reason}",
                outcome.total
            )),
        );

        if outcome.ban_triggered {
            info!("warning threshold crossed for {}", target);
            self.inner.sink.moderation(
                ModerationAction::Ban,
                target,
                "Reached the warning threshold",
            );
            self.inner.sink.reply(
                channel_id,
                ReplyPayload::text(format!(
                    "<@{target}> reached {BAN_THRESHOLD} warnings and has been banned."
                )),
            );
        }
        Ok(())
    }

    pub(crate) fn cmd_warnings(&self, channel_id: &str, target: &str) -> Result<(), CoreError> {
        let entries = self.inner.warnings.list(target);
        if entries.is_empty() {
            self.inner
                .sink
                .reply(channel_id, ReplyPayload::text(format!("<@{target}> has no warnings.")));
            return Ok(());
        }

        let lines: Vec<String> = entries
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                format!(
                    "{}. {} ({})",
                    i + 1,
                    entry.reason,
                    entry.warned_at.format("%Y-%m-%d %H:%M UTC")
                )
            })
            .collect();

        self.inner.sink.reply(
            channel_id,
            ReplyPayload {
                content: String::new(),
                embed: Some(Embed {
                    title: format!("Warnings for {target}"),
                    description: lines.join("\n"),
                    color: EmbedColor::Gold,
                }),
                component_id: None,
                ephemeral: false,
            },
        );
        Ok(())
    }

    pub(crate) fn cmd_clear_warnings(
        &self,
        channel_id: &str,
        target: &str,
    ) -> Result<(), CoreError> {
        let cleared = self.inner.warnings.clear(target);
        self.inner.sink.reply(
            channel_id,
            ReplyPayload::text(format!("Cleared {cleared} warning(s) for <@{target}>.")),
        );
        Ok(())
    }
}
