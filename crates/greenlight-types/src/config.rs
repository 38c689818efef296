use clap::Parser;
use std::{fs, path::PathBuf, time::Duration};

#[derive(Debug, Clone, Parser)]
pub struct BackendConfig {
    #[arg(
        long,
        env = "GREENLIGHT_DATABASE_URL",
        help = "Database URL e.g. sqlite://file.db or similar, default is sqlite://[data-dir]/greenlight.db, where data-dir is set by --data-dir"
    )]
    database_url: Option<String>,

    #[arg(
        long,
        env = "GREENLIGHT_DATA_DIR",
        help = "Data directory (database etc.), default is system default like ~/.local/share/greenlight",
        default_value_t = default_data_dir()
    )]
    data_dir: String,

    #[arg(
        long,
        env = "GREENLIGHT_DB_MAX_OPEN_CONNS",
        default_value_t = 25,
        help = "Maximum number of open database connections"
    )]
    pub db_max_open_conns: u32,

    #[arg(
        long,
        env = "GREENLIGHT_DB_MAX_LIFETIME",
        default_value = "1h",
        help = "Maximum lifetime of a database connection (e.g. 1h, 30m)",
        value_parser = humantime::parse_duration
    )]
    pub db_max_lifetime: Duration,

    #[arg(
        long,
        env = "GREENLIGHT_DB_MAX_IDLE_TIME",
        default_value = "10m",
        help = "Idle database connections are closed after this time",
        value_parser = humantime::parse_duration
    )]
    pub db_max_idle_time: Duration,

    #[arg(
        long,
        env = "GREENLIGHT_QUERY_TIMEOUT",
        default_value = "3s",
        help = "Deadline for a single database operation",
        value_parser = humantime::parse_duration
    )]
    pub query_timeout: Duration,
}

fn default_data_dir() -> String {
    let dir = dirs::data_dir()
        .map(|p| p.join("greenlight"))
        .unwrap_or_else(|| PathBuf::from("greenlight"));

    if !fs::exists(&dir).expect("Failed to check if data directory exists") {
        fs::create_dir_all(&dir).expect("Failed to create data directory");
    } else if !dir.is_dir() {
        panic!("Data directory is not a directory",)
    }

    dir.to_string_lossy().to_string()
}

impl BackendConfig {
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }

    pub fn database_url(&self) -> String {
        self.database_url
            .clone()
            .unwrap_or_else(|| format!("sqlite://{}/greenlight.db", self.data_dir))
    }
}
