use std::sync::Arc;

use crate::config::ServerConfig;
use crate::error::Result;
use axum::{middleware, Router};
use futures::FutureExt;
use greenlight_app::{
    rate_limit::rate_limit,
    state::{AppConfig, AppState},
};
use greenlight_dal::movie::SqlMovieRepository;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

pub async fn run(args: ServerConfig) -> Result<()> {
    let state = build_state(&args).await?;
    run_with_state(args, state).await
}

pub async fn run_with_state(args: ServerConfig, state: AppState) -> Result<()> {
    run_graceful_with_state(args, state, shutdown_signal()).await
}

pub async fn run_graceful_with_state<S>(
    args: ServerConfig,
    state: AppState,
    shutdown_signal: S,
) -> Result<()>
where
    S: std::future::Future<Output = ()> + Send + 'static,
{
    let mut app = main_router(state);

    if !args.no_cors {
        app = app.layer(tower_http::cors::CorsLayer::very_permissive());
    }

    let ip: std::net::IpAddr = args.listen_address.parse()?;
    let addr = std::net::SocketAddr::from((ip, args.port));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(
        addr = %listener.local_addr()?,
        env = %args.environment,
        "Starting server"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c().map(|_| ());

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = ctrl_c => {},
                    _ = terminate.recv() => {},
                }
            }
            Err(_) => ctrl_c.await,
        }
    }
    #[cfg(not(unix))]
    ctrl_c.await;

    info!("Shutting down server");
}

pub fn main_router(state: AppState) -> Router<()> {
    greenlight_app::rest_api::router()
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

pub async fn build_state(config: &ServerConfig) -> Result<AppState> {
    let app_config: AppConfig = config.into();

    let pool = greenlight_dal::new_pool(&config.backend).await?;
    debug!(
        max_connections = config.backend.db_max_open_conns,
        "Database pool ready"
    );
    let movies = SqlMovieRepository::new(pool).with_timeout(config.backend.query_timeout);

    Ok(AppState::new(app_config, Arc::new(movies)))
}
