//! API route modules.

pub mod bots;
pub mod emotion;
pub mod meetings;
pub mod processing;
