use chrono::{NaiveDate, NaiveTime};
use mockall::predicate;
use slotbook_core::{
    errors::BookingError,
    models::slot::{CreateSlotRequest, SlotResponse, SlotStatus},
};
use slotbook_api::middleware::error_handling::AppError;
use std::str::FromStr;
use uuid::Uuid;

use super::test_utils::{sample_slot, TestContext};

// Test wrapper mirroring the slot creation handler: time-range validation,
// duplicate guard, insert.
async fn create_slot_wrapper(
    ctx: &mut TestContext,
    request: CreateSlotRequest,
) -> Result<SlotResponse, AppError> {
    if request.end_time <= request.start_time {
        return Err(AppError(BookingError::Validation(
            "Slot end time must be after its start time".to_string(),
        )));
    }

    let existing = ctx
        .slot_repo
        .find_slot_at(request.date, request.start_time)
        .await?;
    if existing.is_some() {
        return Err(AppError(BookingError::Validation(format!(
            "A slot already exists at {} {}",
            request.date, request.start_time
        ))));
    }

    let slot = match ctx
        .slot_repo
        .create_slot(request.date, request.start_time, request.end_time)
        .await
    {
        Ok(slot) => slot,
        Err(err) if slotbook_db::is_unique_violation(&err, "unique_slot_start") => {
            return Err(AppError(BookingError::Validation(format!(
                "A slot already exists at {} {}",
                request.date, request.start_time
            ))));
        }
        Err(err) => return Err(AppError(BookingError::Database(err))),
    };

    Ok(SlotResponse {
        id: slot.id,
        date: slot.slot_date,
        start_time: slot.start_time,
        end_time: slot.end_time,
        status: SlotStatus::from_str(&slot.status).map_err(AppError)?,
    })
}

fn slot_request() -> CreateSlotRequest {
    CreateSlotRequest {
        date: NaiveDate::from_ymd_opt(2025, 2, 12).unwrap(),
        start_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
        end_time: NaiveTime::from_hms_opt(10, 30, 0).unwrap(),
    }
}

#[tokio::test]
async fn test_create_slot_succeeds() {
    let mut ctx = TestContext::new();
    let request = slot_request();

    ctx.slot_repo
        .expect_find_slot_at()
        .with(predicate::eq(request.date), predicate::eq(request.start_time))
        .times(1)
        .returning(|_, _| Ok(None));

    let created = sample_slot(Uuid::new_v4(), "open");
    ctx.slot_repo
        .expect_create_slot()
        .times(1)
        .returning(move |_, _, _| Ok(created.clone()));

    let response = create_slot_wrapper(&mut ctx, request).await.unwrap();

    assert_eq!(response.status, SlotStatus::Open);
    assert_eq!(
        response.start_time,
        NaiveTime::from_hms_opt(10, 0, 0).unwrap()
    );
}

#[tokio::test]
async fn test_create_slot_rejects_inverted_time_range() {
    let mut ctx = TestContext::new();

    // Duplicate lookup and insert must not happen
    ctx.slot_repo.expect_find_slot_at().times(0);
    ctx.slot_repo.expect_create_slot().times(0);

    let mut request = slot_request();
    request.end_time = NaiveTime::from_hms_opt(9, 0, 0).unwrap();

    let err = create_slot_wrapper(&mut ctx, request).await.unwrap_err();

    assert!(matches!(err.0, BookingError::Validation(_)));
}

#[tokio::test]
async fn test_create_slot_rejects_duplicate_start() {
    let mut ctx = TestContext::new();
    let request = slot_request();

    let existing = sample_slot(Uuid::new_v4(), "open");
    ctx.slot_repo
        .expect_find_slot_at()
        .with(predicate::eq(request.date), predicate::eq(request.start_time))
        .times(1)
        .returning(move |_, _| Ok(Some(existing.clone())));

    ctx.slot_repo.expect_create_slot().times(0);

    let err = create_slot_wrapper(&mut ctx, request).await.unwrap_err();

    assert!(matches!(err.0, BookingError::Validation(_)));
}

// Stands in for the Postgres error raised when two inserts race past the
// duplicate check and hit the unique constraint.
#[derive(Debug)]
struct DuplicateSlotError;

impl std::fmt::Display for DuplicateSlotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "duplicate key value violates unique constraint \"unique_slot_start\""
        )
    }
}

impl std::error::Error for DuplicateSlotError {}

impl sqlx::error::DatabaseError for DuplicateSlotError {
    fn message(&self) -> &str {
        "duplicate key value violates unique constraint \"unique_slot_start\""
    }

    fn kind(&self) -> sqlx::error::ErrorKind {
        sqlx::error::ErrorKind::UniqueViolation
    }

    fn constraint(&self) -> Option<&str> {
        Some("unique_slot_start")
    }

    fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self
    }

    fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
        self
    }

    fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
        self
    }
}

#[tokio::test]
async fn test_duplicate_insert_race_maps_to_validation() {
    let mut ctx = TestContext::new();
    let request = slot_request();

    // The duplicate check sees nothing, but a concurrent insert wins the race
    ctx.slot_repo
        .expect_find_slot_at()
        .times(1)
        .returning(|_, _| Ok(None));

    ctx.slot_repo.expect_create_slot().times(1).returning(|_, _, _| {
        Err(eyre::Report::new(sqlx::Error::Database(Box::new(
            DuplicateSlotError,
        ))))
    });

    let err = create_slot_wrapper(&mut ctx, request).await.unwrap_err();

    assert!(matches!(err.0, BookingError::Validation(_)));
}

#[tokio::test]
async fn test_non_duplicate_insert_error_stays_database_error() {
    let mut ctx = TestContext::new();
    let request = slot_request();

    ctx.slot_repo
        .expect_find_slot_at()
        .times(1)
        .returning(|_, _| Ok(None));

    ctx.slot_repo
        .expect_create_slot()
        .times(1)
        .returning(|_, _, _| Err(eyre::eyre!("connection reset")));

    let err = create_slot_wrapper(&mut ctx, request).await.unwrap_err();

    assert!(matches!(err.0, BookingError::Database(_)));
}

#[tokio::test]
async fn test_list_open_slots_excludes_taken_slots() {
    let mut ctx = TestContext::new();
    let date = NaiveDate::from_ymd_opt(2025, 2, 12).unwrap();

    // Repository filters on status; only open slots come back
    let open = sample_slot(Uuid::new_v4(), "open");
    ctx.slot_repo
        .expect_list_slots_in_range()
        .with(
            predicate::eq(date),
            predicate::eq(date),
            predicate::eq(true),
        )
        .times(1)
        .returning(move |_, _, _| Ok(vec![open.clone()]));

    let slots = ctx
        .slot_repo
        .list_slots_in_range(date, date, true)
        .await
        .unwrap();

    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].status, "open");
}

#[tokio::test]
async fn test_released_slot_shows_up_open_again() {
    let mut ctx = TestContext::new();
    let slot_id = Uuid::new_v4();

    let released = sample_slot(slot_id, "open");
    ctx.slot_repo
        .expect_release_slot()
        .with(predicate::eq(slot_id))
        .times(1)
        .returning(move |_| Ok(Some(released.clone())));

    let date = NaiveDate::from_ymd_opt(2025, 2, 12).unwrap();
    let open_again = sample_slot(slot_id, "open");
    ctx.slot_repo
        .expect_list_slots_in_range()
        .times(1)
        .returning(move |_, _, _| Ok(vec![open_again.clone()]));

    let slot = ctx.slot_repo.release_slot(slot_id).await.unwrap().unwrap();
    assert_eq!(slot.status, "open");

    let listed = ctx
        .slot_repo
        .list_slots_in_range(date, date, true)
        .await
        .unwrap();
    assert!(listed.iter().any(|s| s.id == slot_id));
}
