pub mod collectors;
pub mod config;
pub mod database;
pub mod http;
pub mod models;
pub mod renderer;

mod utils;

use crate::collectors::W1Collector;
use crate::config::AppConfig;
use crate::database::SensorDb;
use crate::http::HttpState;
use anyhow::Context;
use chrono::{Local, Utc};
use log::{debug, error, info};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    info!("Starting application");

    debug!("Loading sensor database");
    let mut db = SensorDb::load(&config.sensor.config, config.archive.clone())
        .context("Failed to load sensor database")?;
    db.initialize(&Local::now());

    let w1 = W1Collector::new(&config.w1.root, &db);
    let db = Arc::new(RwLock::new(db));
    let state = HttpState::new(
        Arc::clone(&db),
        config.http.host_name(),
        config.http.max_response,
    )
    .with_static_root(&config.http.static_root);

    let result = tokio::select! {
        result = main_loop(Arc::clone(&db), w1) => result,
        result = http::serve(&config.http.address, config.http.port, state) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, shutting down");
            Ok(())
        }
    };

    db.write().await.shutdown();

    match result {
        Ok(_) => info!("Application completed successfully"),
        Err(e) => {
            error!("Application error: {e:#}");
            // Print chain of error causes
            for cause in e.chain().skip(1) {
                error!("Caused by: {cause}");
            }
            return Err(e).context("Application failed to run");
        }
    }

    Ok(())
}

async fn main_loop(db: Arc<RwLock<SensorDb>>, mut w1: W1Collector) -> anyhow::Result<()> {
    let mut interval = tokio::time::interval(Duration::from_secs(1));
    loop {
        interval.tick().await; // Wait for the next tick
        let now = Utc::now().timestamp();

        if w1.is_due(now) {
            let devices = W1Collector::devices(&mut *db.write().await);
            // The bus is slow: read it without holding the database.
            let readings = w1.read_devices(&devices);
            let published = w1.publish(&mut *db.write().await, &readings, now);
            debug!("Published {} 1-Wire readings", published);
        }

        db.write().await.background(&Local::now());
    }
}
