//! SQLite persistence for dispatch and settlement state.

pub mod chefs;
pub mod db;
pub mod deliveries;
pub mod drivers;
pub mod orders;
pub mod transfers;

pub use db::{init_database, Database};
