//! Shared library surface for the courier server and its tests.

pub mod api;
pub mod config;
pub mod dispatch;
pub mod payments;
pub mod persistence;
pub mod settlement;
pub mod state;
pub mod tracking;
