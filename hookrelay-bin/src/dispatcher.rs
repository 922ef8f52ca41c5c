use crate::options::Config;
use anyhow::{Context, Result};
use hookrelay_lib::{DEFAULT_BASE_URL, Dispatcher, DispatcherBuilder, RateLimitConfig};
use std::time::Duration;
use url::Url;

/// Creates a dispatcher according to the command-line config
pub(crate) fn create(cfg: &Config) -> Result<Dispatcher> {
    let base_url = match &cfg.base_url {
        Some(base_url) => base_url.clone(),
        None => Url::parse(DEFAULT_BASE_URL)?,
    };
    let rate_limit = RateLimitConfig::from_options(Some(cfg.max_retries), Some(cfg.max_wait));

    DispatcherBuilder::builder()
        .base_url(base_url)
        .user_agent(cfg.user_agent.clone())
        .timeout(Duration::from_secs(cfg.timeout))
        .rate_limit(rate_limit)
        .build()
        .dispatcher()
        .context("Failed to create dispatcher")
}
