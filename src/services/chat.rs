use super::errors::PipelineError;
use super::extractor::RequirementExtractor;
use super::pipeline::PricingPipeline;
use crate::models::PricedInstance;
use std::sync::Arc;

pub const MISSING_QUERY_MESSAGE: &str = "Missing 'query' parameter";

/// Free-text estimate: model extraction followed by pricing. Without an
/// extractor every estimate fails as an internal error; the rest of the
/// service keeps working.
pub struct ChatService {
    extractor: Option<RequirementExtractor>,
    pipeline: Arc<PricingPipeline>,
}

impl ChatService {
    pub fn new(extractor: Option<RequirementExtractor>, pipeline: Arc<PricingPipeline>) -> Self {
        if extractor.is_none() {
            tracing::warn!("No AI provider configured, chat estimates are disabled");
        }
        Self {
            extractor,
            pipeline,
        }
    }

    #[tracing::instrument(name = "Chat estimate.", skip(self))]
    pub async fn estimate(&self, query: &str) -> Result<Vec<PricedInstance>, PipelineError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(PipelineError::InvalidInput(MISSING_QUERY_MESSAGE.to_string()));
        }

        let extractor = self.extractor.as_ref().ok_or_else(|| {
            PipelineError::Internal("no AI provider configured".to_string())
        })?;

        let extraction = extractor.extract(query).await?;
        for rejection in &extraction.rejections {
            tracing::warn!(reason = %rejection.reason, raw = %rejection.raw, "Dropped requirement");
        }

        self.pipeline.calculate(&extraction.requirements).await
    }
}
