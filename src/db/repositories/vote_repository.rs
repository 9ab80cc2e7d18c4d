use crate::db::connection::DbPool;
use crate::db::models::PollWithOptions;
use crate::db::repositories::poll_repository::fetch_poll_with_options;
use sqlx::Error;

/// New poll state, or `None` if `option_id` does not belong to `poll_id`.
pub async fn cast_vote(
    pool: &DbPool,
    poll_id: i32,
    option_id: i32,
) -> Result<Option<PollWithOptions>, Error> {
    update_votes(
        pool,
        poll_id,
        option_id,
        "UPDATE options SET votes = votes + 1 WHERE id = $1 AND poll_id = $2",
    )
    .await
}

/// Votes never drop below zero.
pub async fn retract_vote(
    pool: &DbPool,
    poll_id: i32,
    option_id: i32,
) -> Result<Option<PollWithOptions>, Error> {
    update_votes(
        pool,
        poll_id,
        option_id,
        "UPDATE options SET votes = GREATEST(votes - 1, 0) WHERE id = $1 AND poll_id = $2",
    )
    .await
}

// Update and read-back share one transaction: a concurrent poll delete
// cascades into the locked option row and waits for this commit, so a vote
// that was applied is always returned.
async fn update_votes(
    pool: &DbPool,
    poll_id: i32,
    option_id: i32,
    statement: &'static str,
) -> Result<Option<PollWithOptions>, Error> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query(statement)
        .bind(option_id)
        .bind(poll_id)
        .execute(&mut *tx)
        .await?;
    if result.rows_affected() == 0 {
        tx.rollback().await?;
        return Ok(None);
    }

    let poll = fetch_poll_with_options(&mut *tx, poll_id).await?;
    tx.commit().await?;
    Ok(poll)
}
