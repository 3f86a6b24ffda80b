//! Terminal client for a project management API
//!
//! Polls the activity feed, manages project risks/issues and records
//! expenditures. The binary in `main.rs` wires these together behind a CLI.

pub mod api;
pub mod cli;
pub mod config;
pub mod models;
pub mod poller;
pub mod tui;
