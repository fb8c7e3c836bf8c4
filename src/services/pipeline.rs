use super::cost::CostCalculator;
use super::errors::PipelineError;
use super::matcher::find_best_matches;
use crate::connectors::{InstanceCatalog, PriceCatalog};
use crate::models::{PricedInstance, Requirement};
use std::sync::Arc;

/// Matching followed by pricing over a fresh catalog snapshot.
pub struct PricingPipeline {
    catalog: Arc<dyn InstanceCatalog>,
    costs: CostCalculator,
}

impl PricingPipeline {
    pub fn new(catalog: Arc<dyn InstanceCatalog>, prices: Arc<dyn PriceCatalog>) -> Self {
        Self {
            catalog,
            costs: CostCalculator::new(prices),
        }
    }

    #[tracing::instrument(name = "Calculate pricing.", skip_all, fields(requirements = requirements.len()))]
    pub async fn calculate(
        &self,
        requirements: &[Requirement],
    ) -> Result<Vec<PricedInstance>, PipelineError> {
        if requirements.is_empty() {
            tracing::warn!("No requirements to price");
            return Ok(Vec::new());
        }

        let catalog = self
            .catalog
            .list_instance_types()
            .await
            .map_err(PipelineError::Catalog)?;
        tracing::debug!(instance_types = catalog.len(), "Instance catalog loaded");

        let matched = find_best_matches(requirements, &catalog);

        let mut priced = Vec::with_capacity(matched.len());
        for instance in matched {
            priced.push(self.costs.price(instance).await);
        }

        tracing::info!(priced = priced.len(), "Pricing complete");
        Ok(priced)
    }
}
