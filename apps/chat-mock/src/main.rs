use std::net::SocketAddr;

use anyhow::{Context, Result};
use chat_mock_service::config::{Config, normalize_sdk_host};
use clap::Parser;

/// Local stand-in for the hosted chat, assistant and phone number APIs.
#[derive(Parser, Debug)]
struct Args {
    /// Address to listen on. Overrides CHAT_MOCK_BIND_ADDR.
    #[arg(long)]
    bind_addr: Option<SocketAddr>,

    /// Host baked into the served chat SDK script. Overrides CHAT_MOCK_SDK_HOST.
    #[arg(long)]
    sdk_host: Option<String>,

    /// Seed for synthesized ids so runs are reproducible. Overrides CHAT_MOCK_ID_SEED.
    #[arg(long)]
    id_seed: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = Config::from_env().context("load chat mock config")?;
    if let Some(bind_addr) = args.bind_addr {
        config.bind_addr = bind_addr;
    }
    if let Some(sdk_host) = args.sdk_host {
        config.sdk_host = normalize_sdk_host(&sdk_host)?;
    }
    if args.id_seed.is_some() {
        config.id_seed = args.id_seed;
    }

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if config.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    chat_mock_service::serve(config).await
}
