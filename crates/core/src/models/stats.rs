use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Aggregate counts for the admin dashboard cards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusCounts {
    pub total: i64,
    pub pending: i64,
    pub confirmed: i64,
    pub cancelled: i64,
    pub completed: i64,
}

/// Number of appointments booked on a given day, for the dashboard chart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    pub counts: StatusCounts,
    pub daily: Vec<DailyCount>,
}
