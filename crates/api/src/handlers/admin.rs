use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{Duration, NaiveDate, Utc};
use serde::Deserialize;
use std::sync::Arc;

use slotbook_core::{
    errors::BookingError,
    models::stats::{DailyCount, StatsResponse, StatusCounts},
};

use crate::{middleware::error_handling::AppError, ApiState};

/// Query parameters for the admin stats endpoint
///
/// The daily chart defaults to the seven days ending today when no range
/// is given.
#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    /// Start of the chart range (inclusive)
    pub start_date: Option<NaiveDate>,

    /// End of the chart range (inclusive)
    pub end_date: Option<NaiveDate>,
}

#[axum::debug_handler]
pub async fn get_stats(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<StatsResponse>, AppError> {
    let today = Utc::now().date_naive();
    let to = query.end_date.unwrap_or(today);
    let from = query.start_date.unwrap_or(to - Duration::days(6));

    if to < from {
        return Err(AppError(BookingError::Validation(
            "end_date must not be before start_date".to_string(),
        )));
    }

    let status_counts =
        slotbook_db::repositories::appointment::count_appointments_by_status(&state.db_pool)
            .await
            .map_err(BookingError::Database)?;

    let mut counts = StatusCounts {
        total: 0,
        pending: 0,
        confirmed: 0,
        cancelled: 0,
        completed: 0,
    };
    for row in status_counts {
        counts.total += row.count;
        match row.status.as_str() {
            "pending" => counts.pending = row.count,
            "confirmed" => counts.confirmed = row.count,
            "cancelled" => counts.cancelled = row.count,
            "completed" => counts.completed = row.count,
            other => {
                tracing::warn!("Unexpected appointment status in stats: {}", other);
            }
        }
    }

    let daily =
        slotbook_db::repositories::appointment::count_appointments_per_day(&state.db_pool, from, to)
            .await
            .map_err(BookingError::Database)?
            .into_iter()
            .map(|row| DailyCount {
                date: row.slot_date,
                count: row.count,
            })
            .collect();

    Ok(Json(StatsResponse { counts, daily }))
}
