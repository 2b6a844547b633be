//! Query engines layered over the store.

pub mod closest;
pub mod cursor;
pub mod guards;
pub mod lifecycle;
pub mod locations;
pub mod uploads;
pub mod usage;
