use std::path::PathBuf;
use std::time::Duration;

/// Server settings, read from `INNKEEPER_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    pub bind: String,
    pub data_dir: PathBuf,
    pub password: String,
    pub max_connections: usize,
    /// WAL appends between compactions.
    pub compact_threshold: u64,
    pub metrics_port: Option<u16>,
    /// `None` disables the periodic sweeper.
    pub sweep_interval: Option<Duration>,
    pub tls_cert: Option<PathBuf>,
    pub tls_key: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 5433,
            bind: "0.0.0.0".into(),
            data_dir: PathBuf::from("./data"),
            password: "innkeeper".into(),
            max_connections: 256,
            compact_threshold: 1000,
            metrics_port: None,
            sweep_interval: Some(Duration::from_secs(60)),
            tls_cert: None,
            tls_key: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unset or unparsable values fall back to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let lookup = &lookup;

        let sweep_interval = match parsed::<u64>(lookup, "INNKEEPER_SWEEP_INTERVAL_SECS") {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => defaults.sweep_interval,
        };

        Self {
            port: parsed(lookup, "INNKEEPER_PORT").unwrap_or(defaults.port),
            bind: lookup("INNKEEPER_BIND").unwrap_or(defaults.bind),
            data_dir: lookup("INNKEEPER_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            password: lookup("INNKEEPER_PASSWORD").unwrap_or(defaults.password),
            max_connections: parsed(lookup, "INNKEEPER_MAX_CONNECTIONS").unwrap_or(defaults.max_connections),
            compact_threshold: parsed(lookup, "INNKEEPER_COMPACT_THRESHOLD")
                .unwrap_or(defaults.compact_threshold),
            metrics_port: parsed(lookup, "INNKEEPER_METRICS_PORT"),
            sweep_interval,
            tls_cert: lookup("INNKEEPER_TLS_CERT").map(PathBuf::from),
            tls_key: lookup("INNKEEPER_TLS_KEY").map(PathBuf::from),
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

fn parsed<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|s| s.trim().parse().ok())
}
