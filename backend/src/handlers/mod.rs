//! HTTP request handlers

pub mod audit;
pub mod health;
pub mod inventory;
pub mod medicine;
pub mod purchase;
pub mod returns;
pub mod sale;
pub mod stock_lot;
pub mod supplier;

pub use audit::*;
pub use health::*;
pub use inventory::*;
pub use medicine::*;
pub use purchase::*;
pub use returns::*;
pub use sale::*;
pub use stock_lot::*;
pub use supplier::*;
