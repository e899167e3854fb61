use clap::Parser;
use std::net::SocketAddr;

/// Settings of the dashboard web server
#[derive(Parser, Clone, Debug)]
#[command(name = "provider-dashboard", version, about = "Provider status dashboards over uploaded spreadsheets")]
pub struct ServerConfig {
    /// Address to bind to
    #[arg(long, env = "DASHBOARD_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "DASHBOARD_PORT", default_value_t = 3000)]
    pub port: u16,

    /// Largest accepted upload, in megabytes
    #[arg(long, env = "DASHBOARD_MAX_UPLOAD_MB", default_value_t = 25)]
    pub max_upload_mb: usize,

    /// Idle minutes after which a session and its workbook are dropped
    #[arg(long, env = "DASHBOARD_SESSION_TTL_MINUTES", default_value_t = 60)]
    pub session_ttl_minutes: i64,

    /// Width of rendered charts in pixels
    #[arg(long, env = "DASHBOARD_CHART_WIDTH", default_value_t = 800)]
    pub chart_width: u32,

    /// Height of rendered charts in pixels
    #[arg(long, env = "DASHBOARD_CHART_HEIGHT", default_value_t = 600)]
    pub chart_height: u32,

    /// Directory served under /static
    #[arg(long, env = "DASHBOARD_STATIC_DIR", default_value = "static")]
    pub static_dir: String,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, env = "DASHBOARD_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
            max_upload_mb: 25,
            session_ttl_minutes: 60,
            chart_width: 800,
            chart_height: 600,
            static_dir: "static".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.session_ttl_minutes.max(1))
    }
}

/// Initialise `env_logger`; `RUST_LOG` wins over `default_level`
pub fn init_logging(default_level: &str) {
    let env = env_logger::Env::default().default_filter_or(default_level);
    // try_init fails when a logger is already installed
    let _ = env_logger::Builder::from_env(env).try_init();
}
