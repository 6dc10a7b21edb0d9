pub mod api_client;
pub mod dashboard;
pub mod session;
