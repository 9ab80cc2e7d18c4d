//! Live-update event types pushed to WebSocket subscribers

use serde::Serialize;

use crate::db::models::PollWithOptions;

/// State change broadcast to every connected subscriber.
///
/// Each variant except `PollDeleted` carries the complete current poll, so
/// clients overwrite their copy instead of merging deltas.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PollEvent {
    PollCreated { poll: PollWithOptions },
    VoteUpdate { poll: PollWithOptions },
    LikeUpdate { poll: PollWithOptions },
    PollDeleted { poll_id: i32 },
}

impl PollEvent {
    /// Wire name of the event, as found in the `event` field.
    pub fn kind(&self) -> &'static str {
        match self {
            PollEvent::PollCreated { .. } => "poll_created",
            PollEvent::VoteUpdate { .. } => "vote_update",
            PollEvent::LikeUpdate { .. } => "like_update",
            PollEvent::PollDeleted { .. } => "poll_deleted",
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
