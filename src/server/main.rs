use tracing::info;

use stockroom::config::init_config;
use stockroom::server::database::Database;
use stockroom::server::handlers::AppState;
use stockroom::server::logging::init_tracing;
use stockroom::server::routes::build_router;
use stockroom::server::AuthState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load and validate configuration before anything else
    let config = init_config()?;

    // Initialize logging
    init_tracing(&config.logging);

    // Open the store and make sure the schema exists
    let db = Database::connect(&config.database.url).await?;
    db.migrate().await?;

    let state = AppState {
        db,
        auth: AuthState::from_config(&config.auth)?,
    };
    let app = build_router(state);

    // Define server address
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Stockroom listening on http://{}", addr);

    // Start server
    axum::serve(listener, app).await?;

    Ok(())
}
