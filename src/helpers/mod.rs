pub(crate) mod json;
pub mod money;

pub use json::*;
