use ridehail::config::AppConfig;
use ridehail::db::init_pool;
use ridehail::error::AppError;
use ridehail::routes::create_router;
use ridehail::services::{
    ledger::LedgerStore, live::ChangeFeed, profiles::ProfileService, rides::RideRequestService,
};
use ridehail::state::AppState;
use tokio::net::TcpListener;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_logging();

    let config = AppConfig::from_env()?;
    let db = init_pool(&config.database_url).await?;

    if let Err(err) = sqlx::migrate!("./migrations").run(&db).await {
        error!("migration failed: {err:?}");
        return Err(AppError::Other(err.into()));
    }

    let ledger = LedgerStore::new(db.clone(), ChangeFeed::new());
    let rides = RideRequestService::new(ledger);
    let profiles = ProfileService::new(db.clone());

    let state = AppState::new(rides, profiles);
    let app = create_router(state);

    let listener = TcpListener::bind(config.listen_addr).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);
    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,ridehail=debug".into());

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
