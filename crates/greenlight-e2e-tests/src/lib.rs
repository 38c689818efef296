use std::time::Duration;

use anyhow::{Result, anyhow};
use greenlight_server::config::{Parser, ServerConfig};
use rand::Rng as _;
use reqwest::Url;
use tempfile::TempDir;
use tracing::{debug, info};

pub mod rest;

fn random_port() -> Result<u16> {
    let mut rng = rand::rng();

    let mut retries = 3;
    while retries > 0 {
        let port: u16 = rng.random_range(4030..5030);
        let addr: std::net::SocketAddr = format!("127.0.0.1:{}", port).parse()?;
        match std::net::TcpStream::connect_timeout(&addr, Duration::from_millis(100)) {
            Err(e) if e.kind() == std::io::ErrorKind::ConnectionRefused => return Ok(port),
            Err(_) => retries -= 1,
            Ok(_) => retries -= 1,
        }
    }

    Err(anyhow!("Could not find a free port"))
}

pub struct ConfigGuard {
    #[allow(dead_code)]
    data_dir: TempDir,
}

/// Config with a fresh data directory (and so a fresh database) and random port.
///
/// Rate limiting is off unless `extra_args` sets limiter options without `--no-limiter`.
pub fn test_config(test_name: &str, extra_args: &[&str]) -> Result<(ServerConfig, ConfigGuard)> {
    let tmp_data_dir = TempDir::with_prefix(format!("{}_", test_name))?;
    let data_dir = tmp_data_dir.path().to_string_lossy().to_string();
    let port = random_port()?.to_string();
    let mut args = vec![
        "greenlight-e2e-tests",
        "--data-dir",
        &data_dir,
        "--port",
        &port,
        "--env",
        "testing",
    ];
    if extra_args.is_empty() {
        args.push("--no-limiter");
    } else {
        args.extend_from_slice(extra_args);
    }
    let config = ServerConfig::try_parse_from(args)?;
    Ok((
        config,
        ConfigGuard {
            data_dir: tmp_data_dir,
        },
    ))
}

pub fn base_url(config: &ServerConfig) -> Result<Url> {
    let url = format!("http://{}:{}/", config.listen_address, config.port);
    Ok(Url::parse(&url)?)
}

/// Starts server in background and waits until it answers healthcheck
pub async fn launch_server(config: ServerConfig) -> Result<(reqwest::Client, Url)> {
    let base_url = base_url(&config)?;
    tokio::spawn(async move {
        if let Err(e) = greenlight_server::run::run(config).await {
            tracing::error!("Server failed: {e}");
        }
    });

    let client = reqwest::Client::new();
    let health_url = base_url.join("v1/healthcheck")?;
    for _ in 0..100 {
        match client.get(health_url.clone()).send().await {
            Ok(response) if response.status().is_success() => {
                info!("Server ready at {}", base_url);
                return Ok((client, base_url));
            }
            Ok(response) => debug!("Server not ready: {}", response.status()),
            Err(e) => debug!("Server not ready: {e}"),
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    Err(anyhow!("Server did not start at {}", base_url))
}

pub async fn prepare_env(test_name: &str) -> Result<(reqwest::Client, Url, ConfigGuard)> {
    let (config, guard) = test_config(test_name, &[])?;
    let (client, base_url) = launch_server(config).await?;
    Ok((client, base_url, guard))
}
