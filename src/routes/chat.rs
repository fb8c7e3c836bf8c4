use crate::forms::ChatForm;
use crate::models::PricedInstance;
use crate::services::{ChatService, PipelineError};
use actix_web::{post, web, HttpResponse, Result};
use serde::Serialize;
use serde_valid::Validate;

#[derive(Debug, Serialize)]
pub struct CostEstimate {
    pub cost_estimate: Vec<PricedInstance>,
}

#[tracing::instrument(name = "Chat cost estimate.", skip(chat))]
#[post("/chat")]
pub async fn chat_handler(
    form: web::Json<ChatForm>,
    chat: web::Data<ChatService>,
) -> Result<HttpResponse, PipelineError> {
    if let Err(errors) = form.validate() {
        return Err(PipelineError::InvalidInput(errors.to_string()));
    }

    let cost_estimate = chat.estimate(form.text().unwrap_or_default()).await?;
    Ok(HttpResponse::Ok().json(CostEstimate { cost_estimate }))
}
