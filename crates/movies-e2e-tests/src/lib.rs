use anyhow::{Result, anyhow};
use movies_server::config::{Parser, ServerConfig};
use rand::Rng as _;
use reqwest::Url;
use tempfile::TempDir;
use tokio::sync::oneshot;
use tracing::{debug, error};

/// Form field carrying the anti-forgery token.
pub const TOKEN_FIELD: &str = "__RequestVerificationToken";

fn random_port() -> Result<u16> {
    let mut rng = rand::rng();

    let mut retries = 3;
    while retries > 0 {
        let port: u16 = rng.random_range(3030..4030);
        let addr: std::net::SocketAddr = format!("127.0.0.1:{}", port).parse()?;
        match std::net::TcpStream::connect_timeout(&addr, std::time::Duration::from_millis(100)) {
            Err(e) if e.kind() == std::io::ErrorKind::ConnectionRefused => return Ok(port),
            Err(_) => retries -= 1,
            Ok(_) => retries -= 1,
        }
    }

    Err(anyhow!("Could not find a free port"))
}

pub struct ConfigGuard {
    #[allow(dead_code)]
    data_dir: TempDir,
}

pub fn test_config(test_name: &str) -> Result<(ServerConfig, ConfigGuard)> {
    let tmp_data_dir = TempDir::with_prefix(format!("{}_", test_name))?;
    let data_dir = tmp_data_dir.path().to_string_lossy().to_string();
    let port = random_port()?.to_string();
    let args = &[
        "movies-e2e-tests",
        "--data-dir",
        &data_dir,
        "--port",
        &port,
        "--listen-address",
        "127.0.0.1",
    ];
    let config = ServerConfig::try_parse_from(args)?;
    Ok((
        config,
        ConfigGuard {
            data_dir: tmp_data_dir,
        },
    ))
}

pub fn base_url(config: &ServerConfig) -> Result<Url> {
    Ok(Url::parse(&format!("http://localhost:{}/", config.port))?)
}

/// Test config with fresh database, migrated and seeded.
pub async fn prepare_env(test_name: &str) -> Result<(ServerConfig, ConfigGuard)> {
    let (config, guard) = test_config(test_name)?;
    let pool = movies_dal::new_pool(&config.database_url()).await?;
    movies_dal::migrate(&pool).await?;
    pool.close().await;
    Ok((config, guard))
}

/// Stops the server when dropped.
pub struct ServerGuard {
    #[allow(dead_code)]
    shutdown: oneshot::Sender<()>,
}

pub async fn spawn_server(config: ServerConfig) -> Result<ServerGuard> {
    let state = movies_server::run::build_state(&config).await?;
    let port = config.port;
    let (shutdown, shutdown_rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        let signal = async move {
            let _ = shutdown_rx.await;
        };
        if let Err(e) = movies_server::run::run_graceful_with_state(config, state, signal).await {
            error!("Server error: {e}");
        }
    });

    let addr: std::net::SocketAddr = format!("127.0.0.1:{}", port).parse()?;
    for _ in 0..50 {
        if tokio::net::TcpStream::connect(addr).await.is_ok() {
            debug!("Server is up on port {port}");
            return Ok(ServerGuard { shutdown });
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    Err(anyhow!("Server did not start on port {port}"))
}

/// Client keeping cookies and not following redirects.
pub fn client() -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::none())
        .build()?;
    Ok(client)
}

/// Fetches a form view and returns its anti-forgery token.
pub async fn fetch_token(client: &reqwest::Client, url: Url) -> Result<String> {
    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        return Err(anyhow!("Form request failed with {}", response.status()));
    }
    let view: serde_json::Value = response.json().await?;
    view["antiforgery_token"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| anyhow!("No token in view"))
}
