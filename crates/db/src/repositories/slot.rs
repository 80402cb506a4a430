use crate::models::DbSlot;
use chrono::{NaiveDate, NaiveTime, Utc};
use eyre::Result;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

pub async fn create_slot(
    pool: &Pool<Postgres>,
    slot_date: NaiveDate,
    start_time: NaiveTime,
    end_time: NaiveTime,
) -> Result<DbSlot> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    tracing::debug!(
        "Creating slot: id={}, date={}, start={}, end={}",
        id,
        slot_date,
        start_time,
        end_time
    );

    let slot = sqlx::query_as::<_, DbSlot>(
        r#"
        INSERT INTO slots (id, slot_date, start_time, end_time, status, created_at)
        VALUES ($1, $2, $3, $4, 'open', $5)
        RETURNING id, slot_date, start_time, end_time, status, created_at
        "#,
    )
    .bind(id)
    .bind(slot_date)
    .bind(start_time)
    .bind(end_time)
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(slot)
}

pub async fn get_slot_by_id(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<DbSlot>> {
    let slot = sqlx::query_as::<_, DbSlot>(
        r#"
        SELECT id, slot_date, start_time, end_time, status, created_at
        FROM slots
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(slot)
}

pub async fn find_slot_at(
    pool: &Pool<Postgres>,
    slot_date: NaiveDate,
    start_time: NaiveTime,
) -> Result<Option<DbSlot>> {
    let slot = sqlx::query_as::<_, DbSlot>(
        r#"
        SELECT id, slot_date, start_time, end_time, status, created_at
        FROM slots
        WHERE slot_date = $1 AND start_time = $2
        "#,
    )
    .bind(slot_date)
    .bind(start_time)
    .fetch_optional(pool)
    .await?;

    Ok(slot)
}

pub async fn list_slots_in_range(
    pool: &Pool<Postgres>,
    from: NaiveDate,
    to: NaiveDate,
    only_open: bool,
) -> Result<Vec<DbSlot>> {
    let slots = if only_open {
        sqlx::query_as::<_, DbSlot>(
            r#"
            SELECT id, slot_date, start_time, end_time, status, created_at
            FROM slots
            WHERE slot_date BETWEEN $1 AND $2 AND status = 'open'
            ORDER BY slot_date ASC, start_time ASC
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(pool)
        .await?
    } else {
        sqlx::query_as::<_, DbSlot>(
            r#"
            SELECT id, slot_date, start_time, end_time, status, created_at
            FROM slots
            WHERE slot_date BETWEEN $1 AND $2
            ORDER BY slot_date ASC, start_time ASC
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(pool)
        .await?
    };

    Ok(slots)
}

/// Atomically claims an open slot. The conditional UPDATE guarantees that
/// of any number of concurrent callers, exactly one sees a row returned;
/// the rest get `None`.
pub async fn reserve_slot(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<DbSlot>> {
    tracing::debug!("Reserving slot: id={}", id);

    let slot = sqlx::query_as::<_, DbSlot>(
        r#"
        UPDATE slots
        SET status = 'held'
        WHERE id = $1 AND status = 'open'
        RETURNING id, slot_date, start_time, end_time, status, created_at
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(slot)
}

pub async fn mark_slot_booked(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<DbSlot>> {
    let slot = sqlx::query_as::<_, DbSlot>(
        r#"
        UPDATE slots
        SET status = 'booked'
        WHERE id = $1 AND status = 'held'
        RETURNING id, slot_date, start_time, end_time, status, created_at
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(slot)
}

pub async fn release_slot(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<DbSlot>> {
    tracing::debug!("Releasing slot: id={}", id);

    let slot = sqlx::query_as::<_, DbSlot>(
        r#"
        UPDATE slots
        SET status = 'open'
        WHERE id = $1 AND status IN ('held', 'booked')
        RETURNING id, slot_date, start_time, end_time, status, created_at
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(slot)
}
