use std::{path::PathBuf, time::Duration};

use crate::error::{Error, Result};
use anyhow::Context as _;
pub use clap::Parser;
use movies_app::state::AppConfig;
use tower_cookies::Key;

#[derive(Debug, Clone, clap::Parser)]
pub struct ServerConfig {
    #[arg(
        short,
        long,
        default_value_t = 3000,
        env = "MOVIES_LISTEN_PORT",
        help = "Port to listen on"
    )]
    pub port: u16,
    #[arg(
        short,
        long,
        default_value = "127.0.0.1",
        env = "MOVIES_LISTEN_ADDRESS",
        help = "Address to listen on"
    )]
    pub listen_address: String,

    #[arg(
        long,
        env = "MOVIES_DATABASE_URL",
        help = "Database URL e.g. sqlite://file.db, default is sqlite://[data-dir]/movies.db, where data-dir is set by --data-dir"
    )]
    database_url: Option<String>,

    #[arg(
        long,
        env = "MOVIES_DATA_DIR",
        help = "Data directory (database), default is system default like ~/.local/share/movies",
        default_value_t = default_data_dir()
    )]
    data_dir: String,

    #[arg(
        long,
        env = "MOVIES_STATIC_DIR",
        help = "Directory with static files (front end), served for paths not handled by controllers"
    )]
    pub static_dir: Option<PathBuf>,

    #[arg(
        long,
        env = "MOVIES_TOKEN_EXPIRY",
        default_value = "1h",
        help = "Anti-forgery token lifetime in human friendly format (e.g. 1d, 1h, 1m, 1s - or combined), renewed with each form",
        value_parser = humantime::parse_duration
    )]
    pub token_expiry: Duration,

    #[arg(
        long,
        env = "MOVIES_TOKEN_COOKIE",
        default_value = "movies_antiforgery",
        help = "Name of anti-forgery cookie"
    )]
    pub token_cookie: String,

    #[arg(
        long,
        env = "MOVIES_TOKEN_SECRET",
        help = "Secret (at least 64 bytes) signing anti-forgery cookies, random on each start if not set"
    )]
    token_secret: Option<String>,

    #[arg(long, env = "MOVIES_SECURE_COOKIE", help = "Send anti-forgery cookie only over HTTPS")]
    pub secure_cookie: bool,

    #[arg(
        long,
        env = "MOVIES_FORM_LIMIT_KB",
        default_value = "64",
        help = "Maximum size of submitted form in KB"
    )]
    pub form_limit_kb: usize,

    #[arg(long, env = "MOVIES_CORS", help = "Enable permissive CORS")]
    pub cors: bool,
}

fn default_data_dir() -> String {
    dirs::data_dir()
        .map(|p| p.join("movies"))
        .unwrap_or_else(|| PathBuf::from("movies"))
        .to_string_lossy()
        .to_string()
}

impl ServerConfig {
    pub fn load() -> Result<Self> {
        ServerConfig::try_parse().map_err(|e| e.into())
    }

    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }

    pub fn database_url(&self) -> String {
        self.database_url
            .clone()
            .unwrap_or_else(|| format!("sqlite://{}/movies.db", self.data_dir))
    }

    /// Key signing anti-forgery cookies.
    pub fn token_key(&self) -> Result<Key> {
        match &self.token_secret {
            Some(secret) => Key::try_from(secret.as_bytes())
                .context("Token secret must have at least 64 bytes"),
            None => Ok(Key::generate()),
        }
    }
}

impl TryFrom<&ServerConfig> for AppConfig {
    type Error = Error;

    fn try_from(config: &ServerConfig) -> Result<Self> {
        Ok(AppConfig {
            form_size_limit: config.form_limit_kb * 1024,
            token_cookie: config.token_cookie.clone(),
            secure_cookie: config.secure_cookie,
            token_max_age: time::Duration::try_from(config.token_expiry)?,
        })
    }
}
