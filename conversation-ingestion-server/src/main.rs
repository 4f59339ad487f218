use blockscout_service_launcher::launcher::ConfigSettings;
use conversation_ingestion_logic::settings::IngestionSettings;
use conversation_ingestion_server::Settings;

const SERVICE_NAME: &str = "conversation_ingestion";

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let settings = Settings::build().expect("failed to read config");
    // missing queue URL is fatal at startup
    let ingestion = IngestionSettings::from_env()?;

    blockscout_service_launcher::tracing::init_logs(
        SERVICE_NAME,
        &settings.tracing,
        &settings.jaeger,
    )?;

    conversation_ingestion_server::run(settings, ingestion).await
}
