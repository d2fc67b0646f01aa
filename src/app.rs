use std::net::SocketAddr;

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    middleware,
    routing::get,
    Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::TraceLayer,
};

use crate::{
    auth,
    config::AppConfig,
    error::{expose_error_details, not_found, ApiResponse},
    listings,
    rate_limit::{self, RateLimiter},
    state::AppState,
    users,
};

#[derive(serde::Serialize)]
struct Health {
    status: &'static str,
}

async fn health() -> ApiResponse<Health> {
    ApiResponse::with_message("Server is running", Health { status: "ok" })
}

fn cors(config: &AppConfig) -> anyhow::Result<CorsLayer> {
    let Some(origin) = &config.client_url else {
        return Ok(CorsLayer::permissive());
    };
    let origin: HeaderValue = origin
        .parse()
        .with_context(|| format!("invalid CLIENT_URL {origin:?}"))?;
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ])
        .max_age(std::time::Duration::from_secs(600)))
}

pub fn build_app(state: AppState) -> anyhow::Result<Router> {
    let limiter = RateLimiter::new(&state.config.rate_limit);
    let cors = cors(&state.config)?;
    let config = state.config.clone();

    let api = Router::new()
        .merge(auth::router(state.clone()))
        .merge(users::router(state.clone()))
        .merge(listings::router(state.clone()))
        .route("/health", get(health));

    Ok(Router::new()
        .nest("/api", api)
        .fallback(not_found)
        .with_state(state)
        .layer(middleware::from_fn_with_state(limiter, rate_limit::enforce))
        .layer(middleware::from_fn_with_state(config.clone(), expose_error_details))
        .layer(DefaultBodyLimit::max(config.body_limit_bytes))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        ))
}

pub async fn serve(app: Router, addr: SocketAddr) -> anyhow::Result<()> {
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        return;
    }
    tracing::info!("shutdown signal received");
}
