use blockscout_service_launcher::{
    database::{DatabaseConnectSettings, DatabaseSettings},
    launcher::ConfigSettings,
    tracing::{JaegerSettings, TracingSettings},
};
use serde::Deserialize;

/// Launcher-level settings (tracing, database) read through the standard
/// `CONVERSATION_INGESTION__`-prefixed environment. The ingestion
/// subsystems themselves are configured from the deployment's flat
/// environment keys via `IngestionSettings::from_env`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub tracing: TracingSettings,
    #[serde(default)]
    pub jaeger: JaegerSettings,
    pub database: DatabaseSettings,
}

impl ConfigSettings for Settings {
    const SERVICE_NAME: &'static str = "CONVERSATION_INGESTION";
}

impl Settings {
    pub fn default(database_url: String) -> Self {
        Self {
            tracing: Default::default(),
            jaeger: Default::default(),
            database: DatabaseSettings {
                connect: DatabaseConnectSettings::Url(database_url),
                connect_options: Default::default(),
                create_database: Default::default(),
                run_migrations: Default::default(),
            },
        }
    }
}
