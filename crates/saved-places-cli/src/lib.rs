//! Saved places importer: command-line front end.
//!
//! Wires the core reconciliation engine to a Chromium session, a terminal
//! prompt and the tracing subscriber.

pub mod app;
pub mod browser;
pub mod cli;
pub mod config;
pub mod doctor;
pub mod operator;
pub mod report;
