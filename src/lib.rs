//! Notification worker library.
//!
//! Turns bus events into deduplicated, persisted notifications and pushes
//! new ones to the recipient in real time.

pub mod api;
pub mod bus;
pub mod config;
pub mod dispatch;
pub mod errors;
pub mod models;
pub mod notification;
pub mod store;
pub mod worker;
