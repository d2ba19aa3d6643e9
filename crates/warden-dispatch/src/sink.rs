use tokio::sync::broadcast;

use warden_types::outbound::{ModerationAction, OutboundFrame, ReplyPayload};

/// The platform seam: every reply, tracked post and moderation request
/// leaves the core through here, fire-and-forget.
///
/// Backed by a broadcast channel so each connected platform adapter gets
/// every frame. With no adapter connected, frames are dropped — the core
/// never blocks on the sink.
#[derive(Clone)]
pub struct ReplySink {
    tx: broadcast::Sender<OutboundFrame>,
}

impl ReplySink {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(256);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OutboundFrame> {
        self.tx.subscribe()
    }

    pub fn reply(&self, channel_id: &str, payload: ReplyPayload) {
        self.send(OutboundFrame::Reply {
            channel_id: channel_id.to_string(),
            payload,
        });
    }

    pub fn tracked_post(&self, channel_id: &str, message_ref: &str, payload: ReplyPayload) {
        self.send(OutboundFrame::TrackedPost {
            channel_id: channel_id.to_string(),
            message_ref: message_ref.to_string(),
            payload,
        });
    }

    pub fn edit_tracked(&self, channel_id: &str, message_ref: &str, payload: ReplyPayload) {
        self.send(OutboundFrame::EditTracked {
            channel_id: channel_id.to_string(),
            message_ref: message_ref.to_string(),
            payload,
        });
    }

    pub fn moderation(&self, action: ModerationAction, subject_id: &str, reason: &str) {
        self.send(OutboundFrame::Moderation {
            action,
            subject_id: subject_id.to_string(),
            reason: reason.to_string(),
        });
    }

    fn send(&self, frame: OutboundFrame) {
        let _ = self.tx.send(frame);
    }
}

impl Default for ReplySink {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_frames() {
        let sink = ReplySink::new();
        let mut rx = sink.subscribe();

        sink.reply("c1", ReplyPayload::text("hello"));

        match rx.recv().await.unwrap() {
            OutboundFrame::Reply { channel_id, payload } => {
                assert_eq!(channel_id, "c1");
                assert_eq!(payload.content, "hello");
            }
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    #[tokio::test]
    async fn sending_with_no_subscriber_is_a_noop() {
        let sink = ReplySink::new();
        sink.reply("c1", ReplyPayload::text("dropped"));
    }
}
