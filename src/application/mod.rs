pub mod accounts;
pub mod bootstrap;
pub mod commands;
pub mod error;
pub mod reports;
pub mod task_updates;
