use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::errors::{BookingError, BookingResult};

/// Lifecycle status of an appointment.
///
/// Allowed transitions:
/// pending -> confirmed, pending -> cancelled,
/// confirmed -> cancelled, confirmed -> completed.
/// `cancelled` and `completed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Completed => "completed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Cancelled | AppointmentStatus::Completed
        )
    }

    pub fn can_transition_to(&self, next: AppointmentStatus) -> bool {
        use AppointmentStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed) | (Pending, Cancelled) | (Confirmed, Cancelled) | (Confirmed, Completed)
        )
    }

    /// Validates a transition, returning the new status or `InvalidTransition`.
    pub fn transition_to(&self, next: AppointmentStatus) -> BookingResult<AppointmentStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(BookingError::InvalidTransition(format!(
                "{} -> {}",
                self, next
            )))
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(AppointmentStatus::Pending),
            "confirmed" => Ok(AppointmentStatus::Confirmed),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            "completed" => Ok(AppointmentStatus::Completed),
            other => Err(BookingError::Validation(format!(
                "Unknown appointment status: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub slot_id: Uuid,
    pub customer_name: String,
    pub email: String,
    pub phone: String,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Contact details captured by the booking form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub name: String,
    pub email: String,
    pub phone: String,
}

impl CustomerInfo {
    /// Checks that the booking form fields are plausible before any slot
    /// is reserved, so validation failures never hold a slot.
    pub fn validate(&self) -> BookingResult<()> {
        if self.name.trim().is_empty() {
            return Err(BookingError::Validation(
                "Customer name must not be empty".to_string(),
            ));
        }

        let email = self.email.trim();
        let at = email.find('@');
        let valid_email = match at {
            Some(pos) => pos > 0 && email[pos + 1..].contains('.') && !email.ends_with('.'),
            None => false,
        };
        if !valid_email {
            return Err(BookingError::Validation(format!(
                "Invalid email address: {}",
                self.email
            )));
        }

        let phone = self.phone.trim();
        let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();
        let valid_phone = digits >= 7
            && phone
                .chars()
                .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')'));
        if !valid_phone {
            return Err(BookingError::Validation(format!(
                "Invalid phone number: {}",
                self.phone
            )));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppointmentRequest {
    pub slot_id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub notes: Option<String>,
}

impl CreateAppointmentRequest {
    pub fn customer_info(&self) -> CustomerInfo {
        CustomerInfo {
            name: self.name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: AppointmentStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateNotesRequest {
    pub notes: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentResponse {
    pub id: Uuid,
    pub slot_id: Uuid,
    pub customer_name: String,
    pub email: String,
    pub phone: String,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Appointment joined with its slot's window, as shown in the
/// customer and admin listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentDetailResponse {
    pub id: Uuid,
    pub slot_id: Uuid,
    pub customer_name: String,
    pub email: String,
    pub phone: String,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListAppointmentsResponse {
    pub appointments: Vec<AppointmentDetailResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelAppointmentResponse {
    pub id: Uuid,
    pub status: AppointmentStatus,
    pub slot_released: bool,
}
