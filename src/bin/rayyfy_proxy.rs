// Rayyfy proxy - HTTP front for the song catalog

use anyhow::Result;
use clap::Parser;
use rayyfy::catalog::CatalogClient;
use rayyfy::config::Config;
use rayyfy::proxy::{self, ProxyState};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "rayyfy-proxy")]
#[command(about = "HTTP proxy in front of the Rayyfy song catalog", version)]
struct Args {
    /// Address to bind, overrides the config file
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on, overrides the config file and PORT
    #[arg(long)]
    port: Option<u16>,

    /// Catalog base URL, overrides the config file and RAYYFY_CATALOG_URL
    #[arg(long)]
    catalog_url: Option<String>,

    /// Use this config file instead of the default location
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rayyfy=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => {
            let mut config = Config::load_from(path)?;
            config.apply_env_overrides();
            config
        }
        None => Config::load()?,
    };
    if let Some(host) = args.host {
        config.proxy.host = host;
    }
    if let Some(port) = args.port {
        config.proxy.port = port;
    }
    if let Some(url) = args.catalog_url {
        config.catalog.base_url = url;
    }

    let addr = SocketAddr::new(config.proxy.host.parse::<IpAddr>()?, config.proxy.port);
    info!("Starting Rayyfy proxy");
    info!("Host: {}", config.proxy.host);
    info!("Port: {}", config.proxy.port);

    let state = ProxyState {
        catalog: CatalogClient::new(&config.catalog)?,
        search_limit: config.catalog.search_limit,
    };
    proxy::serve(state, addr).await
}
