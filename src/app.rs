use axum::{middleware, routing::get, Router};
use tower_http::{cors::CorsLayer, services::ServeDir, timeout::TimeoutLayer, trace::TraceLayer};

use crate::auth::gate::{require_api_session, require_page_session};
use crate::state::AppState;
use crate::{auth, events, guests, pages};

pub fn build_app(state: AppState) -> Router {
    let api = Router::new()
        .merge(auth::protected_router())
        .merge(events::router())
        .merge(guests::router())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_api_session));

    let browser = pages::protected_pages()
        .route_layer(middleware::from_fn_with_state(state.clone(), require_page_session));

    Router::new()
        .merge(auth::router())
        .merge(pages::public_pages())
        .merge(api)
        .merge(browser)
        .route("/health", get(|| async { "ok" }))
        .nest_service("/static", ServeDir::new(&state.config.static_dir))
        .layer(TimeoutLayer::new(state.config.request_timeout))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    // path only: query strings may carry return_to targets
                    let path = req.uri().path().to_owned();
                    tracing::info_span!("http_request", %method, %path, status = tracing::field::Empty)
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
        )
}

pub async fn serve(app: Router, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
