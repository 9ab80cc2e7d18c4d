use crate::db::{self, DbPool, PollWithOptions};
use crate::error::PollError;
use crate::startup::AppState;
use axum::{
    extract::{Extension, Json, Path},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

// Request DTOs
#[derive(Debug, Deserialize)]
pub struct CreatePollRequest {
    pub question: String,
    pub options: Vec<CreateOptionRequest>,
}

#[derive(Debug, Deserialize)]
pub struct CreateOptionRequest {
    pub text: String,
}

impl CreatePollRequest {
    /// Trimmed question and option texts, or `InvalidRequest`.
    pub fn validate(self) -> Result<(String, Vec<String>), PollError> {
        let question = self.question.trim().to_string();
        if question.is_empty() {
            return Err(PollError::InvalidRequest("question must not be empty".into()));
        }

        if self.options.len() < 2 {
            return Err(PollError::InvalidRequest(
                "a poll needs at least two options".into(),
            ));
        }

        let options: Vec<String> = self
            .options
            .into_iter()
            .map(|o| o.text.trim().to_string())
            .collect();
        if options.iter().any(|text| text.is_empty()) {
            return Err(PollError::InvalidRequest("option text must not be empty".into()));
        }

        Ok((question, options))
    }
}

async fn load_poll(pool: &DbPool, poll_id: i32) -> Result<PollWithOptions, PollError> {
    db::get_poll_with_options(pool, poll_id)
        .await?
        .ok_or(PollError::PollNotFound)
}

// An option update matched no row: either the poll or the option is missing.
async fn missing_option_error(pool: &DbPool, poll_id: i32) -> PollError {
    match db::get_poll(pool, poll_id).await {
        Ok(Some(_)) => PollError::OptionNotFound,
        Ok(None) => PollError::PollNotFound,
        Err(e) => e.into(),
    }
}

/// Create a poll with its options
pub async fn create_poll(
    Extension(app_state): Extension<AppState>,
    Json(payload): Json<CreatePollRequest>,
) -> Result<impl IntoResponse, PollError> {
    let (question, options) = payload.validate()?;

    let poll = db::create_poll(&app_state.db, &question, &options).await?;
    info!(poll_id = poll.id, options = poll.options.len(), "poll created");

    app_state.hub.poll_created(poll.clone()).await;

    Ok((StatusCode::CREATED, Json(poll)))
}

/// Get all polls
pub async fn list_polls(
    Extension(app_state): Extension<AppState>,
) -> Result<impl IntoResponse, PollError> {
    let polls = db::list_polls(&app_state.db).await?;
    Ok((StatusCode::OK, Json(polls)))
}

pub async fn get_poll(
    Extension(app_state): Extension<AppState>,
    Path(poll_id): Path<i32>,
) -> Result<impl IntoResponse, PollError> {
    let poll = load_poll(&app_state.db, poll_id).await?;
    Ok((StatusCode::OK, Json(poll)))
}

pub async fn vote_option(
    Extension(app_state): Extension<AppState>,
    Path((poll_id, option_id)): Path<(i32, i32)>,
) -> Result<impl IntoResponse, PollError> {
    let Some(poll) = db::cast_vote(&app_state.db, poll_id, option_id).await? else {
        return Err(missing_option_error(&app_state.db, poll_id).await);
    };
    app_state.hub.vote_updated(poll.clone()).await;

    Ok((StatusCode::OK, Json(poll)))
}

pub async fn retract_vote(
    Extension(app_state): Extension<AppState>,
    Path((poll_id, option_id)): Path<(i32, i32)>,
) -> Result<impl IntoResponse, PollError> {
    let Some(poll) = db::retract_vote(&app_state.db, poll_id, option_id).await? else {
        return Err(missing_option_error(&app_state.db, poll_id).await);
    };
    app_state.hub.vote_updated(poll.clone()).await;

    Ok((StatusCode::OK, Json(poll)))
}

pub async fn like_poll(
    Extension(app_state): Extension<AppState>,
    Path(poll_id): Path<i32>,
) -> Result<impl IntoResponse, PollError> {
    let Some(poll) = db::add_like(&app_state.db, poll_id).await? else {
        return Err(PollError::PollNotFound);
    };
    app_state.hub.like_updated(poll.clone()).await;

    Ok((StatusCode::OK, Json(poll)))
}

pub async fn unlike_poll(
    Extension(app_state): Extension<AppState>,
    Path(poll_id): Path<i32>,
) -> Result<impl IntoResponse, PollError> {
    let Some(poll) = db::remove_like(&app_state.db, poll_id).await? else {
        return Err(PollError::PollNotFound);
    };
    app_state.hub.like_updated(poll.clone()).await;

    Ok((StatusCode::OK, Json(poll)))
}

/// Delete a poll and, by cascade, its options
pub async fn delete_poll(
    Extension(app_state): Extension<AppState>,
    Path(poll_id): Path<i32>,
) -> Result<impl IntoResponse, PollError> {
    if !db::delete_poll(&app_state.db, poll_id).await? {
        return Err(PollError::PollNotFound);
    }
    info!(poll_id, "poll deleted");

    app_state.hub.poll_deleted(poll_id).await;

    Ok((StatusCode::OK, Json(json!({ "detail": "Poll deleted" }))))
}
