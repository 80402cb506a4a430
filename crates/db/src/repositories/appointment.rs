use crate::models::{DbAppointment, DbAppointmentDetail, DbDailyCount, DbStatusCount};
use chrono::{NaiveDate, Utc};
use eyre::Result;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

pub async fn create_appointment(
    pool: &Pool<Postgres>,
    slot_id: Uuid,
    customer_name: &str,
    email: &str,
    phone: &str,
    notes: Option<&str>,
) -> Result<DbAppointment> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    tracing::debug!(
        "Creating appointment: id={}, slot_id={}, customer={}",
        id,
        slot_id,
        customer_name
    );

    let appointment = sqlx::query_as::<_, DbAppointment>(
        r#"
        INSERT INTO appointments
            (id, slot_id, customer_name, email, phone, status, notes, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, 'pending', $6, $7, $7)
        RETURNING id, slot_id, customer_name, email, phone, status, notes, created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(slot_id)
    .bind(customer_name)
    .bind(email)
    .bind(phone)
    .bind(notes)
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(appointment)
}

pub async fn get_appointment_by_id(
    pool: &Pool<Postgres>,
    id: Uuid,
) -> Result<Option<DbAppointment>> {
    let appointment = sqlx::query_as::<_, DbAppointment>(
        r#"
        SELECT id, slot_id, customer_name, email, phone, status, notes, created_at, updated_at
        FROM appointments
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(appointment)
}

pub async fn update_appointment_status(
    pool: &Pool<Postgres>,
    id: Uuid,
    status: &str,
) -> Result<DbAppointment> {
    tracing::debug!("Updating appointment status: id={}, status={}", id, status);

    let appointment = sqlx::query_as::<_, DbAppointment>(
        r#"
        UPDATE appointments
        SET status = $2, updated_at = NOW()
        WHERE id = $1
        RETURNING id, slot_id, customer_name, email, phone, status, notes, created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(status)
    .fetch_one(pool)
    .await?;

    Ok(appointment)
}

pub async fn update_appointment_notes(
    pool: &Pool<Postgres>,
    id: Uuid,
    notes: &str,
) -> Result<DbAppointment> {
    let appointment = sqlx::query_as::<_, DbAppointment>(
        r#"
        UPDATE appointments
        SET notes = $2, updated_at = NOW()
        WHERE id = $1
        RETURNING id, slot_id, customer_name, email, phone, status, notes, created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(notes)
    .fetch_one(pool)
    .await?;

    Ok(appointment)
}

pub async fn list_appointments_by_email(
    pool: &Pool<Postgres>,
    email: &str,
) -> Result<Vec<DbAppointmentDetail>> {
    let appointments = sqlx::query_as::<_, DbAppointmentDetail>(
        r#"
        SELECT a.id, a.slot_id, a.customer_name, a.email, a.phone, a.status, a.notes,
               s.slot_date, s.start_time, s.end_time, a.created_at
        FROM appointments a
        JOIN slots s ON s.id = a.slot_id
        WHERE a.email = $1
        ORDER BY s.slot_date ASC, s.start_time ASC
        "#,
    )
    .bind(email)
    .fetch_all(pool)
    .await?;

    Ok(appointments)
}

pub async fn list_appointments_in_range(
    pool: &Pool<Postgres>,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<DbAppointmentDetail>> {
    let appointments = sqlx::query_as::<_, DbAppointmentDetail>(
        r#"
        SELECT a.id, a.slot_id, a.customer_name, a.email, a.phone, a.status, a.notes,
               s.slot_date, s.start_time, s.end_time, a.created_at
        FROM appointments a
        JOIN slots s ON s.id = a.slot_id
        WHERE s.slot_date BETWEEN $1 AND $2
        ORDER BY s.slot_date ASC, s.start_time ASC
        "#,
    )
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await?;

    Ok(appointments)
}

/// Non-cancelled appointment currently holding a slot, if any.
pub async fn active_appointment_for_slot(
    pool: &Pool<Postgres>,
    slot_id: Uuid,
) -> Result<Option<DbAppointment>> {
    let appointment = sqlx::query_as::<_, DbAppointment>(
        r#"
        SELECT id, slot_id, customer_name, email, phone, status, notes, created_at, updated_at
        FROM appointments
        WHERE slot_id = $1 AND status != 'cancelled'
        "#,
    )
    .bind(slot_id)
    .fetch_optional(pool)
    .await?;

    Ok(appointment)
}

pub async fn count_appointments_by_status(pool: &Pool<Postgres>) -> Result<Vec<DbStatusCount>> {
    let counts = sqlx::query_as::<_, DbStatusCount>(
        r#"
        SELECT status, COUNT(*) AS count
        FROM appointments
        GROUP BY status
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(counts)
}

pub async fn count_appointments_per_day(
    pool: &Pool<Postgres>,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<DbDailyCount>> {
    let counts = sqlx::query_as::<_, DbDailyCount>(
        r#"
        SELECT s.slot_date, COUNT(*) AS count
        FROM appointments a
        JOIN slots s ON s.id = a.slot_id
        WHERE s.slot_date BETWEEN $1 AND $2 AND a.status != 'cancelled'
        GROUP BY s.slot_date
        ORDER BY s.slot_date ASC
        "#,
    )
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await?;

    Ok(counts)
}
