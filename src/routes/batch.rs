use crate::forms::StorageEvent;
use crate::services::{BatchService, PipelineError};
use actix_web::{post, web, HttpResponse, Result};
use serde::Serialize;
use serde_valid::Validate;

#[derive(Debug, Serialize)]
pub struct BatchStored {
    pub message: String,
    pub bucket: String,
    pub key: String,
}

#[tracing::instrument(name = "Batch price sheet.", skip_all)]
#[post("/batch")]
pub async fn batch_handler(
    event: web::Json<StorageEvent>,
    batch: web::Data<BatchService>,
) -> Result<HttpResponse, PipelineError> {
    if let Err(errors) = event.validate() {
        return Err(PipelineError::InvalidInput(errors.to_string()));
    }
    let (bucket, key) = event
        .location()
        .ok_or_else(|| PipelineError::InvalidInput("Invalid object key".to_string()))?;

    let outcome = batch.process(&bucket, &key).await?;
    Ok(HttpResponse::Ok().json(BatchStored {
        message: outcome.message(),
        bucket: outcome.bucket,
        key: outcome.key,
    }))
}
