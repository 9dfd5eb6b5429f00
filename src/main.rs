use insultd::application::config::{AppConfig, StoreConfig};
use insultd::application::service::InsultService;
use insultd::domain::ports::{DocumentStore, MetricSink};
use insultd::infrastructure::metrics::{LogSink, StatsdSink};
use insultd::infrastructure::storage::{CouchDbStore, MemoryStore};
use insultd::interface::http;
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn build_store(config: &AppConfig) -> Result<Arc<dyn DocumentStore>, String> {
    match &config.store {
        StoreConfig::CouchDb { url, database } => {
            let store =
                CouchDbStore::new(url.clone(), database.clone()).map_err(|err| err.to_string())?;
            // Views and the increment_score update function are part of
            // the store contract; install them before taking traffic.
            store.ensure_setup().map_err(|err| err.to_string())?;
            Ok(Arc::new(store))
        }
        StoreConfig::Memory => Ok(Arc::new(MemoryStore::new())),
    }
}

fn build_sinks(config: &AppConfig) -> Result<Vec<Arc<dyn MetricSink>>, String> {
    let mut sinks: Vec<Arc<dyn MetricSink>> = Vec::new();
    if let Some(addr) = &config.statsd_addr {
        sinks.push(Arc::new(
            StatsdSink::new(addr.clone()).map_err(|err| err.to_string())?,
        ));
    }
    if config.metrics_log {
        sinks.push(Arc::new(LogSink::new()));
    }
    Ok(sinks)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(%err, "invalid configuration");
            process::exit(1);
        }
    };
    config.log();

    let store = match build_store(&config) {
        Ok(store) => store,
        Err(err) => {
            tracing::error!(%err, "failed to initialize document store");
            process::exit(1);
        }
    };

    let sinks = match build_sinks(&config) {
        Ok(sinks) => sinks,
        Err(err) => {
            tracing::error!(%err, "failed to initialize metric sinks");
            process::exit(1);
        }
    };

    let service = InsultService::new(store, sinks, config.page_size);

    if let Err(err) = http::serve(config.addr.clone(), service).await {
        tracing::error!(%err, "server error");
        process::exit(1);
    }
}
