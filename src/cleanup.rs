// src/cleanup.rs

use std::time::Duration;

use chrono::Utc;
use sqlx::PgPool;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::{config::Config, db};

/// Periodically archives expired orders. Returns `None` when disabled.
pub fn spawn(pool: PgPool, config: &Config) -> Option<JoinHandle<()>> {
    if config.cleanup_interval_secs == 0 {
        info!("order cleanup task disabled");
        return None;
    }

    let period = Duration::from_secs(config.cleanup_interval_secs);
    let retention = config.order_retention();
    info!(period_secs = config.cleanup_interval_secs, "starting order cleanup task");

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match db::orders::archive_all_expired(&pool, retention, Utc::now()).await {
                Ok(0) => debug!("no expired orders"),
                Ok(n) => info!(archived = n, "cleanup pass finished"),
                Err(e) => error!(error = %e, "cleanup pass failed"),
            }
        }
    }))
}
