use axum::http::{header, HeaderValue, Method};
use axum::middleware::Next;
use axum::routing::{get, post};
use axum::{extract::Request, Router};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use millwright::config::AppState;
use millwright::handlers::{closeout, health, reports, sync};

pub fn create_app(state: AppState) -> Router {
    let cors_origins: Vec<HeaderValue> = std::env::var("CORS_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:3000".to_string())
        .split(',')
        .filter_map(|origin| match origin.trim().parse() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!("Invalid CORS origin '{}': {}", origin, e);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(cors_origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT]);

    Router::new()
        .nest(
            "/api/sync",
            Router::new()
                .route("/sales-orders", post(sync::sync_sales_orders))
                .route("/sales-orders/purge", post(sync::purge_sales_orders))
                .route("/work-orders", post(sync::sync_work_orders))
                .route("/work-orders/purge", post(sync::purge_work_orders)),
        )
        .nest(
            "/api/closeout",
            Router::new()
                .route("/import", post(closeout::import))
                .route("/enrich", post(closeout::enrich))
                .route("/projects", get(closeout::list_projects)),
        )
        .nest(
            "/api/reports",
            Router::new()
                .route("/profitability", get(reports::profitability))
                .route("/variance", get(reports::variance)),
        )
        .route("/api/health", get(health::health))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
        .layer(axum::middleware::from_fn(
            |req: Request, next: Next| async move {
                tracing::info!("{} {}", req.method(), req.uri());
                let response = next.run(req).await;
                tracing::info!("Response status: {}", response.status());
                response
            },
        ))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "millwright=info,tower_http=info,sqlx=warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let state = AppState::from_env().await?;

    sqlx::migrate!().run(&state.db_pool).await?;

    let app = create_app(state);
    let addr = millwright::config::server_address_from_env();

    tracing::info!("Starting millwright server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
