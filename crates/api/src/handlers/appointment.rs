//! # Appointment Handlers
//!
//! This module implements the appointment lifecycle, including the booking
//! coordinator that keeps the slot inventory and the appointment ledger
//! consistent with each other.
//!
//! ## Booking Coordination
//!
//! Booking is a two-step logical transaction over independent tables:
//!
//! 1. The slot is claimed with an atomic conditional update
//!    (`open -> held`). Of any number of concurrent booking attempts on the
//!    same slot, exactly one succeeds; the rest receive `SlotUnavailable`.
//! 2. The appointment record is written and the slot is moved `held ->
//!    booked`.
//!
//! If step 2 fails, the reservation from step 1 is compensated by releasing
//! the slot back to `open`. If the compensation itself fails, the caller
//! receives an `Inconsistent` error so the partial state is never silent.
//!
//! Cancellation is the reverse: a validated status transition to `cancelled`
//! followed by a slot release.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use slotbook_core::{
    errors::BookingError,
    models::appointment::{
        AppointmentDetailResponse, AppointmentResponse, AppointmentStatus,
        CancelAppointmentResponse, CreateAppointmentRequest, ListAppointmentsResponse,
        UpdateNotesRequest, UpdateStatusRequest,
    },
};
use slotbook_db::models::{DbAppointment, DbAppointmentDetail};

use crate::{middleware::error_handling::AppError, ApiState};

/// Query parameters for the appointment listing endpoint
///
/// Either `email` (the customer's own appointments) or both `start_date`
/// and `end_date` (the admin view) must be provided.
#[derive(Debug, Deserialize)]
pub struct ListAppointmentsQuery {
    /// Customer email to list appointments for
    pub email: Option<String>,

    /// Start of the date range (inclusive)
    pub start_date: Option<NaiveDate>,

    /// End of the date range (inclusive)
    pub end_date: Option<NaiveDate>,
}

fn to_appointment_response(appointment: DbAppointment) -> Result<AppointmentResponse, BookingError> {
    Ok(AppointmentResponse {
        id: appointment.id,
        slot_id: appointment.slot_id,
        customer_name: appointment.customer_name,
        email: appointment.email,
        phone: appointment.phone,
        status: AppointmentStatus::from_str(&appointment.status)?,
        notes: appointment.notes,
        created_at: appointment.created_at,
    })
}

fn to_detail_response(
    detail: DbAppointmentDetail,
) -> Result<AppointmentDetailResponse, BookingError> {
    Ok(AppointmentDetailResponse {
        id: detail.id,
        slot_id: detail.slot_id,
        customer_name: detail.customer_name,
        email: detail.email,
        phone: detail.phone,
        status: AppointmentStatus::from_str(&detail.status)?,
        notes: detail.notes,
        date: detail.slot_date,
        start_time: detail.start_time,
        end_time: detail.end_time,
        created_at: detail.created_at,
    })
}

/// Books an appointment on an open slot.
///
/// Contact info is validated before any slot is touched, so a rejected form
/// never holds a reservation.
#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<Arc<ApiState>>,
    Json(payload): Json<CreateAppointmentRequest>,
) -> Result<Json<AppointmentResponse>, AppError> {
    payload.customer_info().validate()?;

    // Claim the slot. Exactly one concurrent caller wins.
    let reserved =
        slotbook_db::repositories::slot::reserve_slot(&state.db_pool, payload.slot_id)
            .await
            .map_err(BookingError::Database)?;

    let slot = match reserved {
        Some(slot) => slot,
        None => {
            // Distinguish a missing slot from one that is held or booked
            let slot =
                slotbook_db::repositories::slot::get_slot_by_id(&state.db_pool, payload.slot_id)
                    .await
                    .map_err(BookingError::Database)?;

            return match slot {
                Some(slot) => Err(AppError(BookingError::SlotUnavailable(format!(
                    "Slot at {} {} is already taken",
                    slot.slot_date, slot.start_time
                )))),
                None => Err(AppError(BookingError::NotFound(format!(
                    "Slot with ID {} not found",
                    payload.slot_id
                )))),
            };
        }
    };

    // Write the appointment record; compensate the reservation on failure
    let appointment = match slotbook_db::repositories::appointment::create_appointment(
        &state.db_pool,
        slot.id,
        &payload.name,
        &payload.email,
        &payload.phone,
        payload.notes.as_deref(),
    )
    .await
    {
        Ok(appointment) => appointment,
        Err(err) => {
            tracing::warn!(
                "Appointment creation failed for slot {}, releasing reservation: {}",
                slot.id,
                err
            );
            if let Err(release_err) =
                slotbook_db::repositories::slot::release_slot(&state.db_pool, slot.id).await
            {
                tracing::error!(
                    "Failed to release slot {} after booking failure: {}",
                    slot.id,
                    release_err
                );
                return Err(AppError(BookingError::Inconsistent(format!(
                    "Slot {} is held without an appointment; retry the release",
                    slot.id
                ))));
            }
            return Err(AppError(BookingError::Database(err)));
        }
    };

    // Finalize the slot state
    let booked = slotbook_db::repositories::slot::mark_slot_booked(&state.db_pool, slot.id)
        .await
        .map_err(BookingError::Database)?;

    if booked.is_none() {
        tracing::error!(
            "Slot {} left 'held' state during booking of appointment {}",
            slot.id,
            appointment.id
        );
        return Err(AppError(BookingError::Inconsistent(format!(
            "Slot {} was not finalized for appointment {}; retry the booking finalization",
            slot.id, appointment.id
        ))));
    }

    Ok(Json(to_appointment_response(appointment)?))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<AppointmentDetailResponse>, AppError> {
    let appointment =
        slotbook_db::repositories::appointment::get_appointment_by_id(&state.db_pool, id)
            .await
            .map_err(BookingError::Database)?
            .ok_or_else(|| {
                BookingError::NotFound(format!("Appointment with ID {} not found", id))
            })?;

    let slot =
        slotbook_db::repositories::slot::get_slot_by_id(&state.db_pool, appointment.slot_id)
            .await
            .map_err(BookingError::Database)?
            .ok_or_else(|| {
                BookingError::NotFound(format!("Slot with ID {} not found", appointment.slot_id))
            })?;

    Ok(Json(AppointmentDetailResponse {
        id: appointment.id,
        slot_id: appointment.slot_id,
        customer_name: appointment.customer_name,
        email: appointment.email,
        phone: appointment.phone,
        status: AppointmentStatus::from_str(&appointment.status)?,
        notes: appointment.notes,
        date: slot.slot_date,
        start_time: slot.start_time,
        end_time: slot.end_time,
        created_at: appointment.created_at,
    }))
}

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<ListAppointmentsQuery>,
) -> Result<Json<ListAppointmentsResponse>, AppError> {
    let details = match (&query.email, query.start_date, query.end_date) {
        (Some(email), _, _) => {
            slotbook_db::repositories::appointment::list_appointments_by_email(
                &state.db_pool,
                email,
            )
            .await
            .map_err(BookingError::Database)?
        }
        (None, Some(start), Some(end)) => {
            if end < start {
                return Err(AppError(BookingError::Validation(
                    "end_date must not be before start_date".to_string(),
                )));
            }
            slotbook_db::repositories::appointment::list_appointments_in_range(
                &state.db_pool,
                start,
                end,
            )
            .await
            .map_err(BookingError::Database)?
        }
        _ => {
            return Err(AppError(BookingError::Validation(
                "Provide either email or both start_date and end_date".to_string(),
            )))
        }
    };

    let appointments = details
        .into_iter()
        .map(to_detail_response)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(ListAppointmentsResponse { appointments }))
}

/// Releases a cancelled appointment's slot, reporting `Inconsistent` when
/// the release fails so the half-cancelled state is never silent.
async fn release_cancelled_slot(
    state: &ApiState,
    appointment_id: Uuid,
    slot_id: Uuid,
) -> Result<bool, AppError> {
    match slotbook_db::repositories::slot::release_slot(&state.db_pool, slot_id).await {
        Ok(released) => Ok(released.is_some()),
        Err(err) => {
            tracing::error!(
                "Appointment {} cancelled but slot {} was not released: {}",
                appointment_id,
                slot_id,
                err
            );
            Err(AppError(BookingError::Inconsistent(format!(
                "Appointment {} is cancelled but slot {} remains blocked; retry the cancellation",
                appointment_id, slot_id
            ))))
        }
    }
}

/// Applies a validated status transition and, for cancellations, releases
/// the underlying slot. Returns the updated record and whether a slot was
/// freed.
///
/// Cancelling an already-cancelled appointment is not rejected: it is the
/// compensating retry for a cancellation whose slot release failed. The
/// retry only touches the slot when no other appointment holds it, so a
/// slot rebooked in the meantime is left alone.
async fn transition_appointment(
    state: &ApiState,
    id: Uuid,
    new_status: AppointmentStatus,
) -> Result<(DbAppointment, bool), AppError> {
    let appointment =
        slotbook_db::repositories::appointment::get_appointment_by_id(&state.db_pool, id)
            .await
            .map_err(BookingError::Database)?
            .ok_or_else(|| {
                BookingError::NotFound(format!("Appointment with ID {} not found", id))
            })?;

    let current = AppointmentStatus::from_str(&appointment.status)?;

    if current == AppointmentStatus::Cancelled && new_status == AppointmentStatus::Cancelled {
        let holder = slotbook_db::repositories::appointment::active_appointment_for_slot(
            &state.db_pool,
            appointment.slot_id,
        )
        .await
        .map_err(BookingError::Database)?;

        let slot_released = if holder.is_none() {
            release_cancelled_slot(state, id, appointment.slot_id).await?
        } else {
            false
        };

        return Ok((appointment, slot_released));
    }

    current.transition_to(new_status)?;

    let updated = slotbook_db::repositories::appointment::update_appointment_status(
        &state.db_pool,
        id,
        new_status.as_str(),
    )
    .await
    .map_err(BookingError::Database)?;

    // Cancellation frees the slot for rebooking
    let slot_released = if new_status == AppointmentStatus::Cancelled {
        release_cancelled_slot(state, id, appointment.slot_id).await?
    } else {
        false
    };

    Ok((updated, slot_released))
}

#[axum::debug_handler]
pub async fn update_status(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<AppointmentResponse>, AppError> {
    let (updated, _) = transition_appointment(&state, id, payload.status).await?;
    Ok(Json(to_appointment_response(updated)?))
}

/// Updates the audit notes on an appointment. Unlike status, notes stay
/// mutable in the terminal states.
#[axum::debug_handler]
pub async fn update_notes(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateNotesRequest>,
) -> Result<Json<AppointmentResponse>, AppError> {
    slotbook_db::repositories::appointment::get_appointment_by_id(&state.db_pool, id)
        .await
        .map_err(BookingError::Database)?
        .ok_or_else(|| BookingError::NotFound(format!("Appointment with ID {} not found", id)))?;

    let updated = slotbook_db::repositories::appointment::update_appointment_notes(
        &state.db_pool,
        id,
        &payload.notes,
    )
    .await
    .map_err(BookingError::Database)?;

    Ok(Json(to_appointment_response(updated)?))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<CancelAppointmentResponse>, AppError> {
    let (updated, slot_released) =
        transition_appointment(&state, id, AppointmentStatus::Cancelled).await?;

    Ok(Json(CancelAppointmentResponse {
        id: updated.id,
        status: AppointmentStatus::from_str(&updated.status)?,
        slot_released,
    }))
}
