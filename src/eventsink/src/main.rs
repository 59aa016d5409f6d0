use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tokio::net::TcpListener;

use eventsink::config::Config;
use eventsink::store::RecordStore;

/// eventsink records every request POSTed to it so tests can assert on
/// delivered events. GET /count reports how many were captured, GET on any
/// other path returns them all as a multipart body, and DELETE clears them.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to an optional configuration file
    #[arg(short, long, env)]
    pub config: Option<String>,

    /// Address to listen on. Overrides the configuration file
    #[arg(short, long, env)]
    pub address: Option<String>,

    /// Log level
    #[arg(short, long, default_value_t = tracing::Level::INFO, env = "DEBUG_LEVEL")]
    pub log_level: tracing::Level,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Json, env = "DEBUG_ENCODING")]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Json,
    Console,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let subscriber = tracing_subscriber::fmt().with_max_level(args.log_level);

    match args.log_format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Console => subscriber.init(),
    }

    let config = match args.config.as_deref() {
        Some(path) => Config::parse(path)
            .with_context(|| format!("failed to load configuration from {}", path))?,
        None => Config::default(),
    };

    let listen_addr: SocketAddr = config
        .listen_address(args.address.as_deref())
        .parse()
        .context("invalid listen address")?;

    let tls = config
        .server
        .tls
        .as_ref()
        .map(eventsink::tls::tls_acceptor)
        .transpose()?;

    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", listen_addr))?;

    let store = Arc::new(RecordStore::new());

    eventsink::server::serve(listener, store, tls, eventsink::server::shutdown_signal()).await?;

    Ok(())
}
