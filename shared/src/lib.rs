//! Shared types and domain logic for the Pharmacy Stock Management Backend
//!
//! This crate contains the pure parts of the stock ledger: invoice
//! normalization, pack/unit arithmetic, supplier ledger math, and the
//! types shared between backend services.

pub mod invoice;
pub mod models;
pub mod stockmath;
pub mod types;

pub use invoice::*;
pub use models::*;
pub use stockmath::*;
pub use types::*;
