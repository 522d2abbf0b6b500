pub mod analyze;
pub mod config;
pub mod dispatch;
pub mod schema;
pub mod shared;
pub mod summarize;
