//! Collateral domain module
//!
//! Pawned items held against loans. The engine only ever changes an item's status.

mod model;
mod store;

pub use model::*;
pub use store::{ItemStore, PgItemStore};
