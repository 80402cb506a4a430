use chrono::{NaiveDate, NaiveTime};
use mockall::mock;
use uuid::Uuid;

use crate::models::{DbAppointment, DbAppointmentDetail, DbDailyCount, DbSlot, DbStatusCount};

// Mock repositories for testing
mock! {
    pub SlotRepo {
        pub async fn create_slot(
            &self,
            slot_date: NaiveDate,
            start_time: NaiveTime,
            end_time: NaiveTime,
        ) -> eyre::Result<DbSlot>;

        pub async fn get_slot_by_id(
            &self,
            id: Uuid,
        ) -> eyre::Result<Option<DbSlot>>;

        pub async fn find_slot_at(
            &self,
            slot_date: NaiveDate,
            start_time: NaiveTime,
        ) -> eyre::Result<Option<DbSlot>>;

        pub async fn list_slots_in_range(
            &self,
            from: NaiveDate,
            to: NaiveDate,
            only_open: bool,
        ) -> eyre::Result<Vec<DbSlot>>;

        pub async fn reserve_slot(
            &self,
            id: Uuid,
        ) -> eyre::Result<Option<DbSlot>>;

        pub async fn mark_slot_booked(
            &self,
            id: Uuid,
        ) -> eyre::Result<Option<DbSlot>>;

        pub async fn release_slot(
            &self,
            id: Uuid,
        ) -> eyre::Result<Option<DbSlot>>;
    }
}

mock! {
    pub AppointmentRepo {
        pub async fn create_appointment(
            &self,
            slot_id: Uuid,
            customer_name: &'static str,
            email: &'static str,
            phone: &'static str,
            notes: Option<&'static str>,
        ) -> eyre::Result<DbAppointment>;

        pub async fn get_appointment_by_id(
            &self,
            id: Uuid,
        ) -> eyre::Result<Option<DbAppointment>>;

        pub async fn update_appointment_status(
            &self,
            id: Uuid,
            status: &'static str,
        ) -> eyre::Result<DbAppointment>;

        pub async fn update_appointment_notes(
            &self,
            id: Uuid,
            notes: &'static str,
        ) -> eyre::Result<DbAppointment>;

        pub async fn list_appointments_by_email(
            &self,
            email: &'static str,
        ) -> eyre::Result<Vec<DbAppointmentDetail>>;

        pub async fn list_appointments_in_range(
            &self,
            from: NaiveDate,
            to: NaiveDate,
        ) -> eyre::Result<Vec<DbAppointmentDetail>>;

        pub async fn active_appointment_for_slot(
            &self,
            slot_id: Uuid,
        ) -> eyre::Result<Option<DbAppointment>>;

        pub async fn count_appointments_by_status(
            &self,
        ) -> eyre::Result<Vec<DbStatusCount>>;

        pub async fn count_appointments_per_day(
            &self,
            from: NaiveDate,
            to: NaiveDate,
        ) -> eyre::Result<Vec<DbDailyCount>>;
    }
}
