/// Wallet Metadata Mock Server
///
/// Serves the wallet metadata API from memory, optionally seeded from a
/// JSON file, with fault injection for exercising retry paths.

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use metadata_mock::{run_server, MemoryStore};

#[derive(Debug)]
struct Config {
    server_host: String,
    server_port: u16,
    seed_file: Option<PathBuf>,
}

impl Config {
    fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .context("Invalid SERVER_PORT")?;

        let seed_file = env::var("SEED_FILE").ok().map(PathBuf::from);

        Ok(Self {
            server_host,
            server_port,
            seed_file,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting wallet metadata mock...");

    let config = Config::from_env().context("Failed to load configuration")?;

    let store = match &config.seed_file {
        Some(path) => MemoryStore::from_seed_file(path)?,
        None => {
            log::info!("No SEED_FILE set, starting empty");
            MemoryStore::new()
        }
    };

    run_server(Arc::new(store), config.server_host, config.server_port)
        .await
        .context("Server error")?;

    Ok(())
}
