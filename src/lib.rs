//! `FormWarden` - monitored form sessions
//!
//! Wraps an embedded form in a session that counts integrity violations,
//! warns once, and locks the form when a violation threshold or time
//! limit is reached. Every state change is written to a bounded event log
//! that instructors can report on.

pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod instructor;
pub mod observability;
pub mod report;
pub mod session;
pub mod store;
