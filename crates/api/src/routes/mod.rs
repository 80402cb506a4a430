pub mod admin;
pub mod appointment;
pub mod health;
pub mod slot;
