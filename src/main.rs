use condexer::datasource::HttpEventSource;
use condexer::orchestration::Indexer;
use condexer::{api, config::Config, db::init_db, Repository};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize database and dependencies
    let pool = match init_db(&config.database_path).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to initialize database: {}", e);
            std::process::exit(1);
        }
    };

    let repo = Arc::new(Repository::new(pool));
    let source = Arc::new(HttpEventSource::new(config.event_feed_url.clone()));
    let indexer = match Indexer::from_repository(source, repo.clone()).await {
        Ok(indexer) => Arc::new(indexer),
        Err(e) => {
            eprintln!("Failed to restore ledger: {}", e);
            std::process::exit(1);
        }
    };

    // Background sync loop; a rejected event halts ingestion while the
    // query surface keeps serving the last consistent state.
    let sync_interval = Duration::from_millis(config.sync_interval_ms);
    let sync_batch_size = config.sync_batch_size;
    let sync_indexer = indexer.clone();
    tokio::spawn(async move {
        let err = sync_indexer.run(sync_interval, sync_batch_size).await;
        tracing::error!("ingestion halted: {}", err);
    });

    // Create router
    let app = api::create_router(api::AppState { repo });

    // Bind to address
    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Server listening on {}", addr);

    // Run server
    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}
