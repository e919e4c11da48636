use crate::config::ServerConfig;
use crate::error::Result;
use axum::http::StatusCode;
use axum::response::Redirect;
use axum::{response::IntoResponse, routing::get, Router};
use futures::FutureExt;
use movies_app::state::{AppConfig, AppState};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{debug, info};

pub async fn run(args: ServerConfig) -> Result<()> {
    let state = build_state(&args).await?;
    run_with_state(args, state).await
}

pub async fn run_with_state(args: ServerConfig, state: AppState) -> Result<()> {
    let shutdown = tokio::signal::ctrl_c().map(|_| ());
    run_graceful_with_state(args, state, shutdown).await
}

pub async fn run_graceful_with_state<S>(
    args: ServerConfig,
    state: AppState,
    shutdown_signal: S,
) -> Result<()>
where
    S: std::future::Future<Output = ()> + Send + 'static,
{
    let mut app = main_router(&args, state);

    if args.cors {
        app = app.layer(tower_http::cors::CorsLayer::very_permissive());
    }

    let ip: std::net::IpAddr = args.listen_address.parse()?;
    let addr = std::net::SocketAddr::from((ip, args.port));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server stopped");
    Ok(())
}

pub fn main_router(args: &ServerConfig, state: AppState) -> Router<()> {
    let mut router = Router::new()
        .merge(movies_app::movies::router(&state))
        .merge(movies_app::hello_world::router())
        .layer(tower_cookies::CookieManagerLayer::new())
        .with_state(state)
        .route("/", get(root))
        .route("/health", get(health));

    if let Some(static_dir) = &args.static_dir {
        debug!("Serving static files from {}", static_dir.display());
        router = router.fallback_service(ServeDir::new(static_dir));
    }

    router.layer(TraceLayer::new_for_http())
}

async fn root() -> impl IntoResponse {
    Redirect::to("/Movies")
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

pub async fn build_state(config: &ServerConfig) -> Result<AppState> {
    let data_dir = config.data_dir();
    if !data_dir.is_dir() {
        tokio::fs::create_dir_all(&data_dir).await?;
        info!("Created data directory {}", data_dir.display());
    }

    let pool = movies_dal::new_pool(&config.database_url()).await?;
    movies_dal::migrate(&pool).await?;

    let app_config = AppConfig::try_from(config)?;
    Ok(AppState::with_key(app_config, pool, config.token_key()?))
}
