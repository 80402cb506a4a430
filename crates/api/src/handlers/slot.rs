use axum::{
    extract::{Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use std::str::FromStr;
use std::sync::Arc;

use slotbook_core::{
    errors::BookingError,
    models::slot::{CreateSlotRequest, ListSlotsResponse, SlotResponse, SlotStatus},
};
use slotbook_db::models::DbSlot;

use crate::{middleware::error_handling::AppError, ApiState};

/// Query parameters for the slot listing endpoint
///
/// Either `date` (a single day) or both `start_date` and `end_date` must be
/// provided. By default only open slots are returned; the admin view passes
/// `include_unavailable=true` to see held and booked slots as well.
#[derive(Debug, Deserialize)]
pub struct ListSlotsQuery {
    /// Single day to list slots for
    pub date: Option<NaiveDate>,

    /// Start of the date range (inclusive)
    pub start_date: Option<NaiveDate>,

    /// End of the date range (inclusive)
    pub end_date: Option<NaiveDate>,

    /// Include held and booked slots in the listing
    pub include_unavailable: Option<bool>,
}

fn to_slot_response(slot: DbSlot) -> Result<SlotResponse, BookingError> {
    Ok(SlotResponse {
        id: slot.id,
        date: slot.slot_date,
        start_time: slot.start_time,
        end_time: slot.end_time,
        status: SlotStatus::from_str(&slot.status)?,
    })
}

#[axum::debug_handler]
pub async fn create_slot(
    State(state): State<Arc<ApiState>>,
    Json(payload): Json<CreateSlotRequest>,
) -> Result<Json<SlotResponse>, AppError> {
    if payload.end_time <= payload.start_time {
        return Err(AppError(BookingError::Validation(
            "Slot end time must be after its start time".to_string(),
        )));
    }

    // Slots are unique per (date, start_time)
    let existing = slotbook_db::repositories::slot::find_slot_at(
        &state.db_pool,
        payload.date,
        payload.start_time,
    )
    .await
    .map_err(BookingError::Database)?;

    if existing.is_some() {
        return Err(AppError(BookingError::Validation(format!(
            "A slot already exists at {} {}",
            payload.date, payload.start_time
        ))));
    }

    // The duplicate check above races with concurrent inserts; the unique
    // constraint is the authority
    let db_slot = match slotbook_db::repositories::slot::create_slot(
        &state.db_pool,
        payload.date,
        payload.start_time,
        payload.end_time,
    )
    .await
    {
        Ok(slot) => slot,
        Err(err) if slotbook_db::is_unique_violation(&err, "unique_slot_start") => {
            return Err(AppError(BookingError::Validation(format!(
                "A slot already exists at {} {}",
                payload.date, payload.start_time
            ))));
        }
        Err(err) => return Err(AppError(BookingError::Database(err))),
    };

    Ok(Json(to_slot_response(db_slot)?))
}

#[axum::debug_handler]
pub async fn list_slots(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<ListSlotsQuery>,
) -> Result<Json<ListSlotsResponse>, AppError> {
    let (from, to) = match (query.date, query.start_date, query.end_date) {
        (Some(date), _, _) => (date, date),
        (None, Some(start), Some(end)) => (start, end),
        _ => {
            return Err(AppError(BookingError::Validation(
                "Provide either date or both start_date and end_date".to_string(),
            )))
        }
    };

    if to < from {
        return Err(AppError(BookingError::Validation(
            "end_date must not be before start_date".to_string(),
        )));
    }

    let only_open = !query.include_unavailable.unwrap_or(false);

    let db_slots =
        slotbook_db::repositories::slot::list_slots_in_range(&state.db_pool, from, to, only_open)
            .await
            .map_err(BookingError::Database)?;

    let slots = db_slots
        .into_iter()
        .map(to_slot_response)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(ListSlotsResponse { slots }))
}
