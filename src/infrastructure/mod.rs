pub mod avatar_storage;
pub mod config;
pub mod error;
pub mod ids;
pub mod logging;
pub mod password;
pub mod session_repository;
pub mod storage;
pub mod task_cache;
pub mod task_store;
pub mod user_store;
