use cloudcost::configuration::get_configuration;
use cloudcost::startup::{run, AppServices};
use cloudcost::telemetry::{get_subscriber, init_subscriber};
use std::net::TcpListener;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let subscriber = get_subscriber("cloudcost".into(), "info".into(), std::io::stdout);
    init_subscriber(subscriber);

    let settings = get_configuration().expect("Failed to read configuration.");

    tracing::info!(
        ai_provider = %settings.ai.provider,
        catalog = ?settings.catalog.source,
        pricing = ?settings.pricing.source,
        "Building services"
    );
    let services = AppServices::from_settings(&settings)
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err))?;

    let address = format!("{}:{}", settings.app_host, settings.app_port);
    tracing::info!("Start server at {:?}", &address);
    let listener = TcpListener::bind(&address)
        .unwrap_or_else(|err| panic!("failed to bind to {}: {}", address, err));

    run(listener, services).await?.await
}
