pub mod clock;
pub mod error;
pub mod models;
pub mod schedule;
pub mod status;
