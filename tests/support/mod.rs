//! Shared test support utilities.

pub mod bodies;
pub mod records;
