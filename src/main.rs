use std::sync::Arc;

use legis_crawlers::db::establish_connection_pool;
use legis_crawlers::models::config::ServerConfig;
use legis_crawlers::processing::orchestrator::CollectionOrchestrator;
use legis_crawlers::repository::DieselRepository;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = match ServerConfig::load() {
        Ok(config) => config,
        Err(e) => {
            log::error!("{e}");
            std::process::exit(1);
        }
    };

    let mut orchestrator = match CollectionOrchestrator::from_config(&config) {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            log::error!("{e}");
            std::process::exit(1);
        }
    };

    match config.database_url.as_deref() {
        Some(database_url) => match establish_connection_pool(database_url) {
            Ok(pool) => {
                orchestrator = orchestrator.with_gateway(Arc::new(DieselRepository::new(pool)));
            }
            Err(e) => {
                log::error!("Failed to establish database connection: {e}");
                std::process::exit(1);
            }
        },
        None => log::info!("No database configured; results will not be persisted"),
    }

    let collection = &config.collection;
    let summary = match orchestrator
        .run(
            collection.days_back,
            collection.limit_per_source,
            collection.include_municipal,
            collection.max_workers,
        )
        .await
    {
        Ok(summary) => summary,
        Err(e) => {
            log::error!("Collection failed: {e}");
            std::process::exit(1);
        }
    };

    match serde_json::to_string_pretty(&summary) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            log::error!("Failed to serialize summary: {e}");
            std::process::exit(1);
        }
    }
}
