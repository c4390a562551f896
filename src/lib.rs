pub mod config;
pub mod database;
pub mod feedback;
pub mod forms;
pub mod latex;
pub mod matching;
pub mod models;
pub mod scrape;
pub mod web;

pub use config::AppConfig;
pub use database::Database;
pub use web::{build_rocket, start_web_server};
