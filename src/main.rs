use assessment_backend::{
    config::{get_config, init_config},
    database::pool::create_pool,
    routes, AppState,
};
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    init_config()?;
    let config = get_config();

    let pool = create_pool().await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let app_state = AppState::new(pool);

    let base_routes = Router::new().route("/health", get(routes::health::health));

    let integration_api = Router::new()
        .route(
            "/api/integration/quizzes/generate",
            post(routes::quiz::generate_quiz),
        )
        .route(
            "/api/integration/bank/questions",
            post(routes::quiz::ingest_bank_questions),
        )
        .layer(axum::middleware::from_fn_with_state(
            assessment_backend::middleware::rate_limit::new_rps_state(config.integration_rps),
            assessment_backend::middleware::rate_limit::rps_middleware,
        ));

    let app = base_routes
        .merge(integration_api)
        .with_state(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
