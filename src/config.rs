use std::time::Duration;

/// Log output format, selected with `LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Application configuration, parsed from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    /// Base URL of the Open-Meteo geocoding API.
    pub geocoding_api_url: String,
    /// Base URL of the Open-Meteo forecast API.
    pub forecast_api_url: String,
    /// Per-call timeout for provider requests and pool acquisition.
    pub upstream_timeout: Duration,
    /// Overall request deadline enforced by the router.
    pub request_timeout: Duration,
    pub log_format: LogFormat,
}

fn secs_var(name: &str, default: u64) -> Duration {
    let secs = std::env::var(name)
        .ok()
        .map(|v| {
            v.parse::<u64>()
                .unwrap_or_else(|_| panic!("{} must be a whole number of seconds", name))
        })
        .unwrap_or(default);
    Duration::from_secs(secs)
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .expect("PORT must be a valid u16"),
            geocoding_api_url: std::env::var("GEOCODING_API_URL")
                .unwrap_or_else(|_| "https://geocoding-api.open-meteo.com".to_string()),
            forecast_api_url: std::env::var("FORECAST_API_URL")
                .unwrap_or_else(|_| "https://api.open-meteo.com".to_string()),
            upstream_timeout: secs_var("UPSTREAM_TIMEOUT_SECS", 5),
            request_timeout: secs_var("REQUEST_TIMEOUT_SECS", 15),
            log_format: match std::env::var("LOG_FORMAT").as_deref() {
                Ok("json") => LogFormat::Json,
                _ => LogFormat::Text,
            },
        }
    }
}
