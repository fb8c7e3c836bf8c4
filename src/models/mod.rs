mod instance;
mod priced;
mod requirement;

pub use instance::*;
pub use priced::*;
pub use requirement::*;
