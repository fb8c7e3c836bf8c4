pub mod batch;
pub mod chat;
pub mod cost;
mod errors;
pub mod extractor;
pub mod matcher;
pub mod pipeline;

pub use batch::{BatchOutcome, BatchService};
pub use chat::ChatService;
pub use cost::CostCalculator;
pub use errors::PipelineError;
pub use extractor::{Extraction, ExtractionError, Rejection, RejectionReason, RequirementExtractor};
pub use matcher::find_best_matches;
pub use pipeline::PricingPipeline;
