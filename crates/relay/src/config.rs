/// Relay configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development; override via
/// environment variables in production.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// Minutes an issued access code stays valid (default: `30`).
    pub code_ttl_mins: i64,
    /// Minutes a pending request may wait for an operator before the sweep
    /// removes it (default: `10`).
    pub pending_timeout_mins: i64,
    /// Seconds between sweep runs (default: `300`).
    pub sweep_interval_secs: u64,
}

impl RelayConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                 |
    /// |------------------------|-------------------------|
    /// | `HOST`                 | `0.0.0.0`               |
    /// | `PORT`                 | `8000`                  |
    /// | `CORS_ORIGINS`         | `http://localhost:8000` |
    /// | `CODE_TTL_MINS`        | `30`                    |
    /// | `PENDING_TIMEOUT_MINS` | `10`                    |
    /// | `SWEEP_INTERVAL_SECS`  | `300`                   |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "8000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:8000".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let code_ttl_mins: i64 = std::env::var("CODE_TTL_MINS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("CODE_TTL_MINS must be a valid i64");

        let pending_timeout_mins: i64 = std::env::var("PENDING_TIMEOUT_MINS")
            .unwrap_or_else(|_| "10".into())
            .parse()
            .expect("PENDING_TIMEOUT_MINS must be a valid i64");

        let sweep_interval_secs: u64 = std::env::var("SWEEP_INTERVAL_SECS")
            .unwrap_or_else(|_| "300".into())
            .parse()
            .expect("SWEEP_INTERVAL_SECS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            code_ttl_mins,
            pending_timeout_mins,
            sweep_interval_secs,
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8000,
            cors_origins: vec!["http://localhost:8000".into()],
            code_ttl_mins: 30,
            pending_timeout_mins: 10,
            sweep_interval_secs: 300,
        }
    }
}
