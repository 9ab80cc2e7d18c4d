use std::collections::HashMap;

use crate::db::connection::DbPool;
use crate::db::models::{Poll, PollOption, PollWithOptions};
use sqlx::{Error, PgConnection};

/// Insert a poll and its options in one transaction.
pub async fn create_poll(
    pool: &DbPool,
    question: &str,
    option_texts: &[String],
) -> Result<PollWithOptions, Error> {
    let mut tx = pool.begin().await?;

    let poll = sqlx::query_as::<_, Poll>(
        "INSERT INTO polls (question) VALUES ($1) RETURNING id, question, likes, created_at",
    )
    .bind(question)
    .fetch_one(&mut *tx)
    .await?;

    let mut options = Vec::with_capacity(option_texts.len());
    for text in option_texts {
        let option = sqlx::query_as::<_, PollOption>(
            "INSERT INTO options (poll_id, text) VALUES ($1, $2) RETURNING id, poll_id, text, votes",
        )
        .bind(poll.id)
        .bind(text)
        .fetch_one(&mut *tx)
        .await?;
        options.push(option);
    }

    tx.commit().await?;
    Ok(PollWithOptions::from_rows(poll, options))
}

pub async fn get_poll(pool: &DbPool, poll_id: i32) -> Result<Option<Poll>, Error> {
    let row = sqlx::query_as::<_, Poll>(
        "SELECT id, question, likes, created_at FROM polls WHERE id = $1",
    )
    .bind(poll_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

pub async fn get_poll_options(pool: &DbPool, poll_id: i32) -> Result<Vec<PollOption>, Error> {
    let rows = sqlx::query_as::<_, PollOption>(
        "SELECT id, poll_id, text, votes FROM options WHERE poll_id = $1 ORDER BY id",
    )
    .bind(poll_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Current full state of one poll, `None` if it does not exist.
pub async fn get_poll_with_options(
    pool: &DbPool,
    poll_id: i32,
) -> Result<Option<PollWithOptions>, Error> {
    let Some(poll) = get_poll(pool, poll_id).await? else {
        return Ok(None);
    };
    let options = get_poll_options(pool, poll_id).await?;

    Ok(Some(PollWithOptions::from_rows(poll, options)))
}

/// Same as [`get_poll_with_options`], but on a caller-held connection so a
/// mutation can read back its own result inside its transaction.
pub async fn fetch_poll_with_options(
    conn: &mut PgConnection,
    poll_id: i32,
) -> Result<Option<PollWithOptions>, Error> {
    let poll = sqlx::query_as::<_, Poll>(
        "SELECT id, question, likes, created_at FROM polls WHERE id = $1",
    )
    .bind(poll_id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(poll) = poll else {
        return Ok(None);
    };

    let options = sqlx::query_as::<_, PollOption>(
        "SELECT id, poll_id, text, votes FROM options WHERE poll_id = $1 ORDER BY id",
    )
    .bind(poll_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(Some(PollWithOptions::from_rows(poll, options)))
}

/// All polls, newest first, each with its options ordered by id.
pub async fn list_polls(pool: &DbPool) -> Result<Vec<PollWithOptions>, Error> {
    let polls = sqlx::query_as::<_, Poll>(
        "SELECT id, question, likes, created_at FROM polls ORDER BY created_at DESC, id DESC",
    )
    .fetch_all(pool)
    .await?;

    let options = sqlx::query_as::<_, PollOption>(
        "SELECT id, poll_id, text, votes FROM options ORDER BY poll_id, id",
    )
    .fetch_all(pool)
    .await?;

    let mut by_poll: HashMap<i32, Vec<PollOption>> = HashMap::new();
    for option in options {
        by_poll.entry(option.poll_id).or_default().push(option);
    }

    Ok(polls
        .into_iter()
        .map(|poll| {
            let options = by_poll.remove(&poll.id).unwrap_or_default();
            PollWithOptions::from_rows(poll, options)
        })
        .collect())
}

/// Returns false if the poll does not exist.
pub async fn delete_poll(pool: &DbPool, poll_id: i32) -> Result<bool, Error> {
    let result = sqlx::query("DELETE FROM polls WHERE id = $1")
        .bind(poll_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// New poll state, or `None` if the poll does not exist.
pub async fn add_like(pool: &DbPool, poll_id: i32) -> Result<Option<PollWithOptions>, Error> {
    update_likes(pool, poll_id, "UPDATE polls SET likes = likes + 1 WHERE id = $1").await
}

/// Likes never drop below zero.
pub async fn remove_like(pool: &DbPool, poll_id: i32) -> Result<Option<PollWithOptions>, Error> {
    update_likes(
        pool,
        poll_id,
        "UPDATE polls SET likes = GREATEST(likes - 1, 0) WHERE id = $1",
    )
    .await
}

// The UPDATE holds the poll row lock until commit, so the read-back cannot
// race a concurrent delete.
async fn update_likes(
    pool: &DbPool,
    poll_id: i32,
    statement: &'static str,
) -> Result<Option<PollWithOptions>, Error> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query(statement).bind(poll_id).execute(&mut *tx).await?;
    if result.rows_affected() == 0 {
        tx.rollback().await?;
        return Ok(None);
    }

    let poll = fetch_poll_with_options(&mut *tx, poll_id).await?;
    tx.commit().await?;
    Ok(poll)
}
