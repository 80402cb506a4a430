use mockall::predicate;
use slotbook_core::{
    errors::BookingError,
    models::appointment::{AppointmentResponse, AppointmentStatus, CreateAppointmentRequest},
};
use slotbook_api::middleware::error_handling::AppError;
use std::str::FromStr;
use uuid::Uuid;

use super::test_utils::{sample_appointment, sample_slot, TestContext};

// Test wrapper that mirrors the booking coordinator against the mocks:
// validate, reserve, create, finalize, with compensation on failure.
async fn book_appointment_wrapper(
    ctx: &mut TestContext,
    request: CreateAppointmentRequest,
) -> Result<AppointmentResponse, AppError> {
    request.customer_info().validate()?;

    let reserved = ctx.slot_repo.reserve_slot(request.slot_id).await?;
    let slot = match reserved {
        Some(slot) => slot,
        None => {
            return match ctx.slot_repo.get_slot_by_id(request.slot_id).await? {
                Some(slot) => Err(AppError(BookingError::SlotUnavailable(format!(
                    "Slot at {} {} is already taken",
                    slot.slot_date, slot.start_time
                )))),
                None => Err(AppError(BookingError::NotFound(format!(
                    "Slot with ID {} not found",
                    request.slot_id
                )))),
            };
        }
    };

    // Static references for mockall
    let name: &'static str = Box::leak(request.name.clone().into_boxed_str());
    let email: &'static str = Box::leak(request.email.clone().into_boxed_str());
    let phone: &'static str = Box::leak(request.phone.clone().into_boxed_str());
    let notes: Option<&'static str> = request
        .notes
        .clone()
        .map(|n| Box::leak(n.into_boxed_str()) as &'static str);

    let appointment = match ctx
        .appointment_repo
        .create_appointment(slot.id, name, email, phone, notes)
        .await
    {
        Ok(appointment) => appointment,
        Err(err) => {
            ctx.slot_repo.release_slot(slot.id).await?;
            return Err(AppError(BookingError::Database(err)));
        }
    };

    if ctx.slot_repo.mark_slot_booked(slot.id).await?.is_none() {
        return Err(AppError(BookingError::Inconsistent(format!(
            "Slot {} was not finalized",
            slot.id
        ))));
    }

    Ok(AppointmentResponse {
        id: appointment.id,
        slot_id: appointment.slot_id,
        customer_name: appointment.customer_name,
        email: appointment.email,
        phone: appointment.phone,
        status: AppointmentStatus::from_str(&appointment.status).map_err(AppError)?,
        notes: appointment.notes,
        created_at: appointment.created_at,
    })
}

fn booking_request(slot_id: Uuid) -> CreateAppointmentRequest {
    CreateAppointmentRequest {
        slot_id,
        name: "John Doe".to_string(),
        email: "john@example.com".to_string(),
        phone: "555-123-4567".to_string(),
        notes: None,
    }
}

#[tokio::test]
async fn test_booking_open_slot_succeeds() {
    let mut ctx = TestContext::new();
    let slot_id = Uuid::new_v4();
    let appointment_id = Uuid::new_v4();

    let held = sample_slot(slot_id, "held");
    ctx.slot_repo
        .expect_reserve_slot()
        .with(predicate::eq(slot_id))
        .times(1)
        .returning(move |_| Ok(Some(held.clone())));

    let created = sample_appointment(appointment_id, slot_id, "pending");
    ctx.appointment_repo
        .expect_create_appointment()
        .times(1)
        .returning(move |_, _, _, _, _| Ok(created.clone()));

    let booked = sample_slot(slot_id, "booked");
    ctx.slot_repo
        .expect_mark_slot_booked()
        .with(predicate::eq(slot_id))
        .times(1)
        .returning(move |_| Ok(Some(booked.clone())));

    let response = book_appointment_wrapper(&mut ctx, booking_request(slot_id))
        .await
        .unwrap();

    assert_eq!(response.slot_id, slot_id);
    assert_eq!(response.status, AppointmentStatus::Pending);
    assert_eq!(response.customer_name, "John Doe");
}

#[tokio::test]
async fn test_booking_taken_slot_returns_slot_unavailable() {
    let mut ctx = TestContext::new();
    let slot_id = Uuid::new_v4();

    // The atomic reserve loses; the slot exists but is already booked
    ctx.slot_repo
        .expect_reserve_slot()
        .with(predicate::eq(slot_id))
        .times(1)
        .returning(|_| Ok(None));

    let booked = sample_slot(slot_id, "booked");
    ctx.slot_repo
        .expect_get_slot_by_id()
        .with(predicate::eq(slot_id))
        .times(1)
        .returning(move |_| Ok(Some(booked.clone())));

    let err = book_appointment_wrapper(&mut ctx, booking_request(slot_id))
        .await
        .unwrap_err();

    assert!(matches!(err.0, BookingError::SlotUnavailable(_)));
}

#[tokio::test]
async fn test_booking_unknown_slot_returns_not_found() {
    let mut ctx = TestContext::new();
    let slot_id = Uuid::new_v4();

    ctx.slot_repo
        .expect_reserve_slot()
        .with(predicate::eq(slot_id))
        .times(1)
        .returning(|_| Ok(None));

    ctx.slot_repo
        .expect_get_slot_by_id()
        .with(predicate::eq(slot_id))
        .times(1)
        .returning(|_| Ok(None));

    let err = book_appointment_wrapper(&mut ctx, booking_request(slot_id))
        .await
        .unwrap_err();

    assert!(matches!(err.0, BookingError::NotFound(_)));
}

#[tokio::test]
async fn test_failed_appointment_creation_releases_slot() {
    let mut ctx = TestContext::new();
    let slot_id = Uuid::new_v4();

    let held = sample_slot(slot_id, "held");
    ctx.slot_repo
        .expect_reserve_slot()
        .with(predicate::eq(slot_id))
        .times(1)
        .returning(move |_| Ok(Some(held.clone())));

    ctx.appointment_repo
        .expect_create_appointment()
        .times(1)
        .returning(|_, _, _, _, _| Err(eyre::eyre!("insert failed")));

    // Compensation must release the reservation
    let released = sample_slot(slot_id, "open");
    ctx.slot_repo
        .expect_release_slot()
        .with(predicate::eq(slot_id))
        .times(1)
        .returning(move |_| Ok(Some(released.clone())));

    let err = book_appointment_wrapper(&mut ctx, booking_request(slot_id))
        .await
        .unwrap_err();

    assert!(matches!(err.0, BookingError::Database(_)));
}

#[tokio::test]
async fn test_invalid_contact_info_never_reserves() {
    let mut ctx = TestContext::new();
    let slot_id = Uuid::new_v4();

    // No slot_repo expectations: reserve must not be called
    ctx.slot_repo.expect_reserve_slot().times(0);

    let mut request = booking_request(slot_id);
    request.email = "not-an-email".to_string();

    let err = book_appointment_wrapper(&mut ctx, request)
        .await
        .unwrap_err();

    assert!(matches!(err.0, BookingError::Validation(_)));
}

#[tokio::test]
async fn test_unfinalized_slot_reports_inconsistent() {
    let mut ctx = TestContext::new();
    let slot_id = Uuid::new_v4();
    let appointment_id = Uuid::new_v4();

    let held = sample_slot(slot_id, "held");
    ctx.slot_repo
        .expect_reserve_slot()
        .with(predicate::eq(slot_id))
        .times(1)
        .returning(move |_| Ok(Some(held.clone())));

    let created = sample_appointment(appointment_id, slot_id, "pending");
    ctx.appointment_repo
        .expect_create_appointment()
        .times(1)
        .returning(move |_, _, _, _, _| Ok(created.clone()));

    // Slot no longer 'held' when finalizing
    ctx.slot_repo
        .expect_mark_slot_booked()
        .with(predicate::eq(slot_id))
        .times(1)
        .returning(|_| Ok(None));

    let err = book_appointment_wrapper(&mut ctx, booking_request(slot_id))
        .await
        .unwrap_err();

    assert!(matches!(err.0, BookingError::Inconsistent(_)));
}
