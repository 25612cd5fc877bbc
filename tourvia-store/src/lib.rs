pub mod app_config;
pub mod database;
pub mod memory;
pub mod pg;

pub use app_config::{BusinessRules, Config};
pub use database::Database;
