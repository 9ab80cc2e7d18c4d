use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Poll {
    pub id: i32,
    pub question: String,
    pub likes: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PollOption {
    pub id: i32,
    pub poll_id: i32,
    pub text: String,
    pub votes: i32,
}

/// Public representation of a poll, shared by REST responses and live events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollWithOptions {
    pub id: i32,
    pub question: String,
    pub likes: i32,
    pub options: Vec<OptionView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionView {
    pub id: i32,
    pub text: String,
    pub votes: i32,
}

impl PollWithOptions {
    pub fn from_rows(poll: Poll, options: Vec<PollOption>) -> Self {
        PollWithOptions {
            id: poll.id,
            question: poll.question,
            likes: poll.likes,
            options: options.into_iter().map(OptionView::from).collect(),
        }
    }
}

impl From<PollOption> for OptionView {
    fn from(option: PollOption) -> Self {
        OptionView {
            id: option.id,
            text: option.text,
            votes: option.votes,
        }
    }
}
