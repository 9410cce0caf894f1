//! pushgate CLI library
//!
//! Drives the delivery core from JSON-lines event files and inspects the
//! undelivered message store.

pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
