//! # SlotBook Core
//!
//! Domain types shared by the SlotBook appointment-booking service:
//! slot and appointment models, the appointment status state machine,
//! request/response types for the API, and the typed error enum.
//!
//! This crate is free of I/O. Persistence lives in `slotbook-db` and the
//! HTTP surface in `slotbook-api`.

pub mod errors;
pub mod models;
