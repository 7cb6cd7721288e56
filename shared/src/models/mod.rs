//! Domain models for the Pharmacy Stock Management Backend

mod lot;
mod supplier;

pub use lot::*;
pub use supplier::*;
