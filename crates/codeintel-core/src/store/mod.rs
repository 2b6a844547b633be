//! SQLite persistence: schema, connections, and per-table queries.

pub mod commits;
pub mod database;
pub mod events;
pub mod repos;
pub mod schema;
pub mod uploads;
