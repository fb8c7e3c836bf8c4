mod calculate;
mod chat;
mod storage_event;

pub use calculate::*;
pub use chat::*;
pub use storage_event::*;
