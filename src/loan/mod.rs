//! Loan domain module
//!
//! Contains the loan model, the lifecycle state machine and the loan store.

mod model;
pub mod state;
mod store;

pub use model::*;
pub use state::Transition;
pub use store::{LoanCursor, LoanStore, PgLoanStore};
