// src/main.rs

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use wedine_api::{app, cleanup, config::Config, db, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment from .env if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;

    let pool = db::connect(&config).await?;
    db::migrate(&pool).await?;

    let _cleanup = cleanup::spawn(pool.clone(), &config);

    let port = config.port;
    let state = AppState::new(pool, config);

    let addr = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "WeDine API listening");

    axum::serve(listener, app(state).into_make_service()).await?;
    Ok(())
}
