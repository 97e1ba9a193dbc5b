//! Recurrence indicators for basic materials requisitioned across
//! construction sites.
//!
//! The [`analysis`] engine is pure and infallible: it reads a typed
//! [`models::Ledger`] and returns freshly built tables. [`ledger`] turns
//! exports into that ledger, and [`report`] renders the results.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod ledger;
pub mod models;
pub mod report;
