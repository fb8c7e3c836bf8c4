use crate::configuration::Settings;
use crate::connectors::{self, AiProvider, ConnectorError, InstanceCatalog, ObjectStore, PriceCatalog};
use crate::helpers::JsonError;
use crate::routes;
use crate::services::{BatchService, ChatService, PricingPipeline, RequirementExtractor};
use actix_cors::Cors;
use actix_web::{dev::Server, error, web, App, HttpServer};
use chrono::FixedOffset;
use std::net::TcpListener;
use std::sync::Arc;
use tracing_actix_web::TracingLogger;

/// Process-wide services, built once and shared by every worker.
#[derive(Clone)]
pub struct AppServices {
    pub pipeline: Arc<PricingPipeline>,
    pub chat: Arc<ChatService>,
    pub batch: Arc<BatchService>,
}

impl AppServices {
    pub fn new(
        ai: Option<Arc<dyn AiProvider>>,
        catalog: Arc<dyn InstanceCatalog>,
        prices: Arc<dyn PriceCatalog>,
        store: Arc<dyn ObjectStore>,
        output_bucket: impl Into<String>,
        utc_offset: FixedOffset,
    ) -> Self {
        let pipeline = Arc::new(PricingPipeline::new(catalog, prices));
        let chat = Arc::new(ChatService::new(
            ai.map(RequirementExtractor::new),
            pipeline.clone(),
        ));
        let batch = Arc::new(BatchService::new(
            store,
            pipeline.clone(),
            output_bucket,
            utc_offset,
        ));

        Self {
            pipeline,
            chat,
            batch,
        }
    }

    /// A provider that cannot be built only disables chat; calculation and
    /// batch pricing never call the model.
    pub fn from_settings(settings: &Settings) -> Result<Self, ConnectorError> {
        let ai = connectors::init_ai(&settings.ai)
            .map_err(|err| tracing::warn!(error = %err, "AI provider unavailable"))
            .ok();

        Ok(Self::new(
            ai,
            connectors::init_catalog(&settings.catalog)?,
            connectors::init_prices(&settings.pricing)?,
            connectors::init_object_store(&settings.storage),
            settings.storage.output_bucket.clone(),
            BatchService::offset_from_minutes(settings.batch.utc_offset_minutes),
        ))
    }
}

pub async fn run(listener: TcpListener, services: AppServices) -> Result<Server, std::io::Error> {
    let pipeline = web::Data::from(services.pipeline);
    let chat = web::Data::from(services.chat);
    let batch = web::Data::from(services.batch);

    let json_config = web::JsonConfig::default().error_handler(|err, _req| {
        let message = match &err {
            error::JsonPayloadError::Deserialize(err) => format!("Invalid request body: {}", err),
            other => format!("Invalid request body: {}", other),
        };
        tracing::warn!(error = %message, "Rejected request body");
        error::InternalError::from_response(err, JsonError::bad_request(message)).into()
    });

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .wrap(Cors::permissive())
            .app_data(json_config.clone())
            .app_data(pipeline.clone())
            .app_data(chat.clone())
            .app_data(batch.clone())
            .service(web::scope("/health_check").service(routes::health_check))
            .service(routes::chat_handler)
            .service(routes::calculate_handler)
            .service(routes::batch_handler)
    })
    .listen(listener)?
    .run();

    Ok(server)
}
