use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, warn};

use warden_core::ScheduledAction;
use warden_store::{AfkStore, CooldownStore, GiveawayStore, LevelStore, WarningStore};
use warden_types::error::CoreError;
use warden_types::events::{Command, ComponentAction, InboundEvent};
use warden_types::outbound::ReplyPayload;
use warden_upstream::{StatusAggregator, UpstreamClient};

use crate::poll::PollRecord;
use crate::sink::ReplySink;

/// Shown when a handler fails for any reason past the boundary.
const GENERIC_FAILURE: &str = "Something went wrong handling that. Try again in a moment.";

/// Tunables handed in from the startup config loader.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// XP granted per counted message.
    pub xp_per_message: u64,
    /// Minimum gap between counted messages per subject.
    pub xp_cooldown: Duration,
    /// Gap enforced on the subscriber-count reload button.
    pub reload_cooldown: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            xp_per_message: 15,
            xp_cooldown: Duration::from_secs(60),
            reload_cooldown: Duration::from_millis(5000),
        }
    }
}

/// Routes inbound platform events to their handler chains.
///
/// Every event is handled on its own spawned task, so a slow handler
/// never blocks the arrival of the next event. Handler failures are
/// caught here at the boundary, logged, and turned into one generic
/// failure reply — they never reach the process's top level.
#[derive(Clone)]
pub struct Dispatcher {
    pub(crate) inner: Arc<DispatcherInner>,
}

pub(crate) struct DispatcherInner {
    pub(crate) sink: ReplySink,
    pub(crate) cooldowns: CooldownStore,
    pub(crate) afk: AfkStore,
    pub(crate) levels: LevelStore,
    pub(crate) warnings: WarningStore,
    pub(crate) giveaways: GiveawayStore,
    pub(crate) polls: Mutex<HashMap<String, PollRecord>>,
    /// Pending conclusion timers, keyed by giveaway id or poll message
    /// ref. Entries drop when their action fires or is withdrawn.
    pub(crate) timers: Mutex<HashMap<String, ScheduledAction>>,
    pub(crate) upstream: UpstreamClient,
    pub(crate) status: StatusAggregator,
    pub(crate) config: DispatchConfig,
}

/// Everything the dispatcher needs, constructed at startup and injected —
/// no ambient globals, so tests can build an isolated instance.
pub struct DispatcherParts {
    pub sink: ReplySink,
    pub cooldowns: CooldownStore,
    pub afk: AfkStore,
    pub levels: LevelStore,
    pub warnings: WarningStore,
    pub giveaways: GiveawayStore,
    pub upstream: UpstreamClient,
    pub status: StatusAggregator,
    pub config: DispatchConfig,
}

impl Dispatcher {
    pub fn new(parts: DispatcherParts) -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                sink: parts.sink,
                cooldowns: parts.cooldowns,
                afk: parts.afk,
                levels: parts.levels,
                warnings: parts.warnings,
                giveaways: parts.giveaways,
                polls: Mutex::new(HashMap::new()),
                timers: Mutex::new(HashMap::new()),
                upstream: parts.upstream,
                status: parts.status,
                config: parts.config,
            }),
        }
    }

    /// The outbound seam, for the gateway connection to subscribe to.
    pub fn sink(&self) -> &ReplySink {
        &self.inner.sink
    }

    /// Hand an event to its handler chain without waiting for it.
    pub fn dispatch(&self, event: InboundEvent) {
        let this = self.clone();
        tokio::spawn(async move {
            let channel_id = event.channel_id().to_string();
            if let Err(e) = this.handle(event).await {
                warn!("handler failed: {}", e);
                this.inner
                    .sink
                    .reply(&channel_id, ReplyPayload::ephemeral(GENERIC_FAILURE));
            }
        });
    }

    async fn handle(&self, event: InboundEvent) -> Result<(), CoreError> {
        match event {
            InboundEvent::Command {
                channel_id,
                subject_id,
                scope_id,
                command,
            } => {
                self.handle_command(&channel_id, &subject_id, &scope_id, command)
                    .await
            }

            InboundEvent::Component {
                channel_id,
                subject_id,
                message_ref,
                custom_id,
            } => match ComponentAction::parse(&custom_id) {
                Some(action) => {
                    self.handle_component(&channel_id, &subject_id, &message_ref, action)
                        .await
                }
                None => {
                    debug!("ignoring component id {:?}", custom_id);
                    Ok(())
                }
            },

            // No modal-backed feature right now; part of the closed set so
            // the adapter can forward everything.
            InboundEvent::ModalSubmit { custom_id, .. } => {
                debug!("ignoring modal submission {:?}", custom_id);
                Ok(())
            }

            InboundEvent::Message {
                channel_id,
                subject_id,
                scope_id,
                content,
                mentions,
            } => {
                self.handle_message(&channel_id, &subject_id, &scope_id, &content, &mentions)
                    .await
            }

            InboundEvent::ReactionAdd {
                message_ref,
                subject_id,
                emoji,
                ..
            } => {
                self.handle_reaction(&message_ref, &subject_id, &emoji, true);
                Ok(())
            }

            InboundEvent::ReactionRemove {
                message_ref,
                subject_id,
                emoji,
                ..
            } => {
                self.handle_reaction(&message_ref, &subject_id, &emoji, false);
                Ok(())
            }
        }
    }

    async fn handle_command(
        &self,
        channel_id: &str,
        subject_id: &str,
        scope_id: &str,
        command: Command,
    ) -> Result<(), CoreError> {
        match command {
            Command::Subscribers { channel } => {
                self.cmd_subscribers(channel_id, &channel).await
            }
            Command::Joke => self.cmd_joke(channel_id),
            Command::Meme => self.cmd_meme(channel_id).await,
            Command::Status => self.cmd_status(channel_id).await,
            Command::Afk { note } => self.cmd_afk(channel_id, subject_id, note),
            Command::Rank => self.cmd_rank(channel_id, subject_id, scope_id),
            Command::Warn { target, reason } => self.cmd_warn(channel_id, &target, &reason),
            Command::Warnings { target } => self.cmd_warnings(channel_id, &target),
            Command::ClearWarnings { target } => self.cmd_clear_warnings(channel_id, &target),
            Command::GiveawayStart {
                duration_secs,
                winner_count,
                prize,
            } => self.cmd_giveaway_start(channel_id, subject_id, duration_secs, winner_count, &prize),
            Command::GiveawayReroll { giveaway_id } => {
                self.cmd_giveaway_reroll(channel_id, &giveaway_id)
            }
            Command::Poll {
                question,
                duration_secs,
            } => self.cmd_poll(channel_id, &question, duration_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::path::PathBuf;
    use tokio::sync::broadcast;
    use warden_core::ConcurrencyGate;
    use warden_types::outbound::{ModerationAction, OutboundFrame};
    use warden_upstream::UpstreamConfig;

    fn scratch(name: &str, kind: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!(
            "warden-dispatch-{name}-{kind}-{}.json",
            std::process::id()
        ));
        std::fs::remove_file(&path).ok();
        path
    }

    /// A dispatcher over fresh stores. The upstream base URLs point at a
    /// closed port, so any command that does reach for the network gets a
    /// fast refused connection and the generic failure reply.
    fn test_dispatcher(name: &str) -> (Dispatcher, broadcast::Receiver<OutboundFrame>) {
        test_dispatcher_with(name, DispatchConfig::default())
    }

    fn test_dispatcher_with(
        name: &str,
        config: DispatchConfig,
    ) -> (Dispatcher, broadcast::Receiver<OutboundFrame>) {
        let gate = ConcurrencyGate::new(3);
        let upstream = UpstreamClient::new(
            gate,
            UpstreamConfig {
                youtube_api_base: "http://127.0.0.1:1".into(),
                youtube_api_key: "test".into(),
                subscriber_api_base: "http://127.0.0.1:1".into(),
                feed_api_base: "http://127.0.0.1:1".into(),
            },
        );
        let status = StatusAggregator::new(upstream.clone(), Vec::new());
        let sink = ReplySink::new();
        let rx = sink.subscribe();

        let dispatcher = Dispatcher::new(DispatcherParts {
            sink,
            cooldowns: CooldownStore::new(),
            afk: AfkStore::new(),
            levels: LevelStore::load(scratch(name, "levels")),
            warnings: WarningStore::load(scratch(name, "warnings")),
            giveaways: GiveawayStore::load(scratch(name, "giveaways")),
            upstream,
            status,
            config,
        });
        (dispatcher, rx)
    }

    fn command(command: Command) -> InboundEvent {
        InboundEvent::Command {
            channel_id: "c1".into(),
            subject_id: "mod1".into(),
            scope_id: "g1".into(),
            command,
        }
    }

    #[tokio::test]
    async fn warn_threshold_requests_one_ban() {
        let (dispatcher, mut rx) = test_dispatcher("warn");

        for _ in 0..5 {
            dispatcher.dispatch(command(Command::Warn {
                target: "u1".into(),
                reason: "spam".into(),
            }));
        }

        let mut bans = 0;
        let mut replies = 0;
        // 5 warn acks + 1 ban frame + 1 ban announcement.
        for _ in 0..7 {
            match rx.recv().await.unwrap() {
                OutboundFrame::Moderation { action, subject_id, .. } => {
                    assert_eq!(action, ModerationAction::Ban);
                    assert_eq!(subject_id, "u1");
                    bans += 1;
                }
                OutboundFrame::Reply { .. } => replies += 1,
                other => panic!("unexpected frame: {:?}", other),
            }
        }
        assert_eq!(bans, 1, "the ban must fire exactly once");
        assert_eq!(replies, 6);
    }

    #[tokio::test(start_paused = true)]
    async fn giveaway_runs_end_to_end() {
        let (dispatcher, mut rx) = test_dispatcher("giveaway");

        dispatcher.dispatch(command(Command::GiveawayStart {
            duration_secs: 60,
            winner_count: 1,
            prize: "sticker".into(),
        }));

        let message_ref = match rx.recv().await.unwrap() {
            OutboundFrame::TrackedPost { message_ref, .. } => message_ref,
            other => panic!("expected the giveaway post, got {:?}", other),
        };

        dispatcher.dispatch(InboundEvent::ReactionAdd {
            channel_id: "c1".into(),
            message_ref: message_ref.clone(),
            subject_id: "u7".into(),
            emoji: "🎉".into(),
        });
        tokio::task::yield_now().await;

        // Blocking on recv idles the runtime, which advances the paused
        // clock past the 60s deadline and fires the conclusion.
        match rx.recv().await.unwrap() {
            OutboundFrame::Reply { channel_id, payload } => {
                assert_eq!(channel_id, "c1");
                assert!(payload.content.contains("u7"), "winner must be announced");
            }
            other => panic!("expected the conclusion, got {:?}", other),
        }

        assert!(
            dispatcher.inner.giveaways.all().is_empty(),
            "conclusion must delete the record"
        );
    }

    #[tokio::test]
    async fn absurd_giveaway_durations_are_rejected() {
        let (dispatcher, mut rx) = test_dispatcher("absurd");

        // Beyond what chrono can represent, and beyond i64 entirely.
        for duration_secs in [10_000_000_000_000_000, u64::MAX] {
            dispatcher.dispatch(command(Command::GiveawayStart {
                duration_secs,
                winner_count: 1,
                prize: "sticker".into(),
            }));
            match rx.recv().await.unwrap() {
                OutboundFrame::Reply { payload, .. } => {
                    assert!(payload.ephemeral);
                    assert!(payload.content.contains("duration"));
                }
                other => panic!("expected a rejection reply, got {:?}", other),
            }
        }
        assert!(dispatcher.inner.giveaways.all().is_empty());
    }

    #[tokio::test]
    async fn reload_notice_reflects_the_configured_window() {
        let (dispatcher, mut rx) = test_dispatcher_with(
            "reload-window",
            DispatchConfig {
                reload_cooldown: Duration::from_secs(7),
                ..DispatchConfig::default()
            },
        );

        let press = || InboundEvent::Component {
            channel_id: "c1".into(),
            subject_id: "u1".into(),
            message_ref: "m1".into(),
            custom_id: "reload-UC123".into(),
        };

        // First press starts the cooldown, then fails against the closed
        // upstream port and comes back as the generic failure reply.
        dispatcher.dispatch(press());
        match rx.recv().await.unwrap() {
            OutboundFrame::Reply { .. } => {}
            other => panic!("unexpected frame: {:?}", other),
        }

        dispatcher.dispatch(press());
        match rx.recv().await.unwrap() {
            OutboundFrame::Reply { payload, .. } => {
                assert!(payload.content.contains("wait 7 seconds"));
            }
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn restore_concludes_past_due_giveaways() {
        let (dispatcher, mut rx) = test_dispatcher("restore");

        let past = Utc::now() - chrono::Duration::seconds(30);
        let (_, record) =
            dispatcher
                .inner
                .giveaways
                .create("c1", "u0", "mug", 1, past);
        dispatcher
            .inner
            .giveaways
            .add_participant(&record.message_ref, "u3");

        dispatcher.restore_scheduled();

        match rx.recv().await.unwrap() {
            OutboundFrame::Reply { payload, .. } => {
                assert!(payload.content.contains("u3"));
            }
            other => panic!("expected the conclusion, got {:?}", other),
        }
        assert!(dispatcher.inner.giveaways.all().is_empty());
    }

    #[tokio::test]
    async fn xp_is_throttled_per_subject() {
        let (dispatcher, _rx) = test_dispatcher("xp");

        let message = || InboundEvent::Message {
            channel_id: "c1".into(),
            subject_id: "u1".into(),
            scope_id: "g1".into(),
            content: "hi".into(),
            mentions: Vec::new(),
        };

        dispatcher.dispatch(message());
        tokio::task::yield_now().await;
        dispatcher.dispatch(message());
        tokio::task::yield_now().await;

        // Second message lands inside the xp cooldown.
        assert_eq!(dispatcher.inner.levels.get("u1", "g1").xp, 15);
    }

    #[tokio::test]
    async fn afk_round_trip_via_events() {
        let (dispatcher, mut rx) = test_dispatcher("afk");

        dispatcher.dispatch(command(Command::Afk {
            note: Some("lunch".into()),
        }));
        match rx.recv().await.unwrap() {
            OutboundFrame::Reply { payload, .. } => assert!(payload.ephemeral),
            other => panic!("unexpected frame: {:?}", other),
        }

        // A message from someone else surfaces the note.
        dispatcher.dispatch(InboundEvent::Message {
            channel_id: "c1".into(),
            subject_id: "u2".into(),
            scope_id: "g1".into(),
            content: "where is mod1?".into(),
            mentions: vec!["mod1".into()],
        });
        match rx.recv().await.unwrap() {
            OutboundFrame::Reply { payload, .. } => {
                assert!(payload.content.contains("lunch"));
            }
            other => panic!("unexpected frame: {:?}", other),
        }

        // Speaking clears the marker.
        dispatcher.dispatch(InboundEvent::Message {
            channel_id: "c1".into(),
            subject_id: "mod1".into(),
            scope_id: "g1".into(),
            content: "back".into(),
            mentions: Vec::new(),
        });
        match rx.recv().await.unwrap() {
            OutboundFrame::Reply { payload, .. } => {
                assert!(payload.content.contains("Welcome back"));
            }
            other => panic!("unexpected frame: {:?}", other),
        }
        assert!(dispatcher.inner.afk.get("mod1").is_none());
    }

    #[tokio::test]
    async fn unknown_component_ids_are_ignored() {
        let (dispatcher, mut rx) = test_dispatcher("component");

        dispatcher.dispatch(InboundEvent::Component {
            channel_id: "c1".into(),
            subject_id: "u1".into(),
            message_ref: "m1".into(),
            custom_id: "dismiss-something".into(),
        });
        tokio::task::yield_now().await;

        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn poll_tallies_and_concludes() {
        let (dispatcher, mut rx) = test_dispatcher("poll");

        dispatcher.dispatch(command(Command::Poll {
            question: "pizza friday?".into(),
            duration_secs: 30,
        }));

        let message_ref = match rx.recv().await.unwrap() {
            OutboundFrame::TrackedPost { message_ref, .. } => message_ref,
            other => panic!("expected the poll post, got {:?}", other),
        };

        for (subject, emoji) in [("u1", "👍"), ("u2", "👍"), ("u3", "👎")] {
            dispatcher.dispatch(InboundEvent::ReactionAdd {
                channel_id: "c1".into(),
                message_ref: message_ref.clone(),
                subject_id: subject.into(),
                emoji: emoji.into(),
            });
        }
        tokio::task::yield_now().await;

        match rx.recv().await.unwrap() {
            OutboundFrame::Reply { payload, .. } => {
                assert!(payload.content.contains("2"));
                assert!(payload.content.contains("1"));
            }
            other => panic!("expected the poll result, got {:?}", other),
        }
    }
}
