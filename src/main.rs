use std::sync::Arc;

use anyhow::anyhow;
use axum::middleware;
use log::info;
use tower_http::cors::CorsLayer;

use meetserver::auth;
use meetserver::config::AppConfig;
use meetserver::core::{CoreClient, IdentityApi};
use meetserver::health;
use meetserver::meeting;
use meetserver::meeting::service::MeetingService;
use meetserver::meeting::store::{MeetingRepository, PgMeetingStore};
use meetserver::shared::state::AppState;
use meetserver::shared::utils::{create_conn, run_migrations};
use meetserver::video::TwilioVideoClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env()?;

    let pool = create_conn()?;
    run_migrations(&pool).map_err(|e| anyhow!("failed to run migrations: {e}"))?;

    let core: Arc<dyn IdentityApi> = Arc::new(CoreClient::new(config.core_api.clone())?);
    let video = Arc::new(TwilioVideoClient::new(config.video.clone())?);
    let store: Arc<dyn MeetingRepository> = Arc::new(PgMeetingStore::new(pool));
    let meetings = Arc::new(MeetingService::new(store, core.clone(), video));

    let state = Arc::new(AppState {
        config,
        core,
        meetings,
    });

    let protected = meeting::configure().layer(middleware::from_fn_with_state(
        state.clone(),
        auth::require_auth,
    ));

    let app = health::configure()
        .merge(protected)
        .layer(CorsLayer::permissive())
        .with_state(state.clone());

    let addr = format!(
        "{}:{}",
        state.config.server.host, state.config.server.port
    );
    info!("Meeting server listening on {addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
