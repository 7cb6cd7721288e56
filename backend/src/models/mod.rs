//! Domain vocabulary shared with other consumers of the API

pub use shared::models::*;
pub use shared::types::*;
