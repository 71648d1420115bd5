use serde::Deserialize;
use std::time::Duration;

/// Placeholder shipped in sample `.env` files; treated the same as no key at all.
const PLACEHOLDER_API_KEY: &str = "your_openai_api_key_here";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Postgres connection string. `None` runs the service on the in-memory store.
    pub database_url: Option<String>,
    pub port: u16,
    /// OpenAI-compatible API key. `None` selects the rule-based fallback classifier.
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub openai_model: String,
    pub ai_timeout_secs: u64,
    pub max_leads_per_upload: usize,
    pub scoring_concurrency: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            port: 8000,
            openai_api_key: None,
            openai_base_url: "https://api.openai.com/v1".to_string(),
            openai_model: "gpt-3.5-turbo".to_string(),
            ai_timeout_secs: 30,
            max_leads_per_upload: 1000,
            scoring_concurrency: 4,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let config = Self {
            database_url: std::env::var("DB_URL")
                .or_else(|_| std::env::var("DATABASE_URL"))
                .ok()
                .filter(|url| !url.trim().is_empty())
                .map(|url| {
                    if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
                        anyhow::bail!("DATABASE_URL must start with postgresql:// or postgres://");
                    }
                    Ok(url)
                })
                .transpose()?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| defaults.port.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            openai_api_key: usable_api_key(std::env::var("OPENAI_API_KEY").ok()),
            openai_base_url: std::env::var("OPENAI_BASE_URL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(|url| {
                    if !url.starts_with("http://") && !url.starts_with("https://") {
                        anyhow::bail!("OPENAI_BASE_URL must start with http:// or https://");
                    }
                    Ok(url)
                })
                .transpose()?
                .unwrap_or(defaults.openai_base_url),
            openai_model: std::env::var("OPENAI_MODEL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.openai_model),
            ai_timeout_secs: parse_positive("AI_TIMEOUT_SECS", defaults.ai_timeout_secs)?,
            max_leads_per_upload: parse_positive(
                "MAX_LEADS_PER_UPLOAD",
                defaults.max_leads_per_upload,
            )?,
            scoring_concurrency: parse_positive(
                "SCORING_CONCURRENCY",
                defaults.scoring_concurrency,
            )?,
        };

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        match config.database_url {
            Some(ref url) => tracing::debug!("Database URL: {}", redact_database_url(url)),
            None => tracing::warn!("DATABASE_URL not set, using in-memory storage"),
        }
        if config.ai_enabled() {
            tracing::info!(
                "AI scoring enabled: model {} at {}",
                config.openai_model,
                config.openai_base_url
            );
        } else {
            tracing::info!("OPENAI_API_KEY not configured, AI scoring uses rule-based fallback");
        }
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }

    /// Whether a usable AI credential is configured.
    pub fn ai_enabled(&self) -> bool {
        self.openai_api_key.is_some()
    }

    pub fn ai_timeout(&self) -> Duration {
        Duration::from_secs(self.ai_timeout_secs)
    }
}

/// Drops blank keys and the sample placeholder.
pub fn usable_api_key(raw: Option<String>) -> Option<String> {
    raw.map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty() && key != PLACEHOLDER_API_KEY)
}

/// Scheme and host of a connection string, without credentials, path or query.
pub fn redact_database_url(url: &str) -> String {
    let (scheme, rest) = url.split_once("://").unwrap_or(("", url));
    let authority = rest.split(['/', '?']).next().unwrap_or_default();
    let host = authority.rsplit_once('@').map_or(authority, |(_, host)| host);
    if scheme.is_empty() {
        host.to_string()
    } else {
        format!("{}://{}", scheme, host)
    }
}

fn parse_positive<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr + PartialOrd + Default + Copy,
{
    let value = match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|_| anyhow::anyhow!("{} must be a positive number", name))?,
        _ => default,
    };
    if value <= T::default() {
        anyhow::bail!("{} must be greater than zero", name);
    }
    Ok(value)
}
