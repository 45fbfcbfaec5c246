use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use autopost::AppState;
use autopost::config::Config;
use autopost::routes::build_routes;
use autopost::scheduler::PostScheduler;
use autopost::services::threads::{ThreadsClient, ThreadsPublisher};
use autopost::store::PgStore;
use autopost::worker::run_periodic_post_worker;

fn init_logging() {
    // Default to `info,sqlx::query=warn` if RUST_LOG is not set
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx::query=warn"));

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let fmt_layer = if json {
        fmt::layer().json().boxed()
    } else {
        fmt::layer().with_target(true).boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    init_logging();

    let config = Config::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;

    let store = Arc::new(PgStore::new(pool.clone()));
    let client = ThreadsClient::new(&config.threads_api_base, config.publish_settle);
    let publisher = Arc::new(ThreadsPublisher::new(client, store.clone()));
    let scheduler = Arc::new(PostScheduler::new(
        store.clone(),
        publisher.clone(),
        config.retry_policy(),
        config.scheduler_options(),
    ));

    if config.enable_cron_worker {
        let pool = pool.clone();
        let scheduler = scheduler.clone();
        let schedule = config.cron_schedule.clone();
        tokio::spawn(async move {
            if let Err(e) = run_periodic_post_worker(pool, scheduler, schedule).await {
                tracing::error!(error = %e, "periodic post worker stopped");
            }
        });
    } else {
        tracing::info!("cron worker disabled, cycles run only via POST /periodic-posts/execute");
    }

    let state = Arc::new(AppState {
        db: pool,
        store,
        publisher,
        scheduler,
        service_token: config.service_token.clone(),
    });

    let app = build_routes()
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
