//! PostgreSQL persistence for turfquote: connection config, pool setup,
//! embedded migrations, and the `users` table.

pub mod config;
pub mod models;
pub mod pool;
pub mod queries;
