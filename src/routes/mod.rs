pub mod batch;
pub mod calculate;
pub mod chat;
pub mod health_checks;

pub use batch::*;
pub use calculate::*;
pub use chat::*;
pub use health_checks::*;
