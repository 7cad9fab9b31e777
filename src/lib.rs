//! Pawnshop Server Library
//!
//! Loan lifecycle rules and the scheduled engine that applies them: overdue
//! detection, confiscation of collateral, late fees and customer notifications.

pub mod app_state;
pub mod clock;
pub mod collateral;
pub mod config;
pub mod customer;
pub mod db;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod loan;
pub mod notification;
pub mod routes;
