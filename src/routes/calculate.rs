use crate::forms::CalculateForm;
use crate::services::{PipelineError, PricingPipeline};
use actix_web::{post, web, HttpResponse, Result};
use serde_valid::Validate;

#[tracing::instrument(name = "Calculate cost.", skip_all, fields(requirements = form.requirements.len()))]
#[post("/calculate")]
pub async fn calculate_handler(
    form: web::Json<CalculateForm>,
    pipeline: web::Data<PricingPipeline>,
) -> Result<HttpResponse, PipelineError> {
    if let Err(errors) = form.validate() {
        return Err(PipelineError::InvalidInput(errors.to_string()));
    }

    let priced = pipeline.calculate(&form.requirements).await?;
    Ok(HttpResponse::Ok().json(priced))
}
