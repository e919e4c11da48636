use std::sync::Arc;

use movies_dal::Pool;
use tower_cookies::Key;

use crate::antiforgery::AntiForgeryTokens;

#[derive(Clone)]
pub struct AppState {
    state: Arc<AppStateInner>,
}

impl AppState {
    /// State with a random signing key, tokens do not survive restart.
    pub fn new(app_config: AppConfig, pool: Pool) -> Self {
        Self::with_key(app_config, pool, Key::generate())
    }

    pub fn with_key(app_config: AppConfig, pool: Pool, key: Key) -> Self {
        let antiforgery = AntiForgeryTokens::new(key, &app_config);
        AppState {
            state: Arc::new(AppStateInner {
                app_config,
                pool,
                antiforgery,
            }),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.state.app_config
    }

    pub fn pool(&self) -> &Pool {
        &self.state.pool
    }

    pub fn antiforgery(&self) -> &AntiForgeryTokens {
        &self.state.antiforgery
    }
}

struct AppStateInner {
    pool: Pool,
    app_config: AppConfig,
    antiforgery: AntiForgeryTokens,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Maximum size of a form body, that is buffered for anti-forgery check
    pub form_size_limit: usize,
    pub token_cookie: String,
    pub secure_cookie: bool,
    pub token_max_age: time::Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            form_size_limit: 64 * 1024,
            token_cookie: "movies_antiforgery".to_string(),
            secure_cookie: false,
            token_max_age: time::Duration::hours(1),
        }
    }
}
