//! PostgreSQL dump/restore wrapper with retention cleanup and a web admin page.

pub mod core;
pub mod server;
pub mod utils;
