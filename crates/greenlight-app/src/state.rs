use std::sync::Arc;

use greenlight_dal::movie::MovieRepository;

use crate::rate_limit::TokenBucket;

#[derive(Clone)]
pub struct AppState {
    state: Arc<AppStateInner>,
}

impl AppState {
    pub fn new(app_config: AppConfig, movies: Arc<dyn MovieRepository>) -> Self {
        let limiter = app_config
            .limiter
            .map(|limits| TokenBucket::new(limits.rps, limits.burst));
        AppState {
            state: Arc::new(AppStateInner {
                movies,
                app_config,
                limiter,
            }),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.state.app_config
    }

    pub fn movies(&self) -> &Arc<dyn MovieRepository> {
        &self.state.movies
    }

    pub fn limiter(&self) -> Option<&TokenBucket> {
        self.state.limiter.as_ref()
    }
}

struct AppStateInner {
    movies: Arc<dyn MovieRepository>,
    app_config: AppConfig,
    limiter: Option<TokenBucket>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Deployment environment name, reported by healthcheck
    pub environment: String,
    /// `None` disables rate limiting
    pub limiter: Option<LimiterConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            environment: "development".to_string(),
            limiter: Some(LimiterConfig::default()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LimiterConfig {
    pub rps: f64,
    pub burst: u32,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        LimiterConfig { rps: 2.0, burst: 4 }
    }
}

/// Empty validation context for `axum_valid::Garde` extractors
impl axum::extract::FromRef<AppState> for () {
    fn from_ref(_: &AppState) -> Self {}
}
