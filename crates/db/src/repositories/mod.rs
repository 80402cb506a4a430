pub mod appointment;
pub mod slot;
