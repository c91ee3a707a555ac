//! Demo HTTP service that logs every request to stdout and to a TCP log
//! collector.

use std::{
    net::SocketAddr,
    path::PathBuf,
    sync::Arc,
    thread::{self, JoinHandle},
};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use relaylog::{
    AppConfig, ConnectionEvent, ConsoleSinkBuilder, HealthReporter, LogEmitter, LogEvent,
    ProcessSampler, StreamSink, health, http,
};

/// Command-line flags. They override the config file and environment.
#[derive(Debug, Parser)]
#[command(name = "relaylog-demo", version, about)]
struct Args {
    /// INI file with service, collector, http, and health settings.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Port for the HTTP listener.
    #[arg(long)]
    port: Option<u16>,
    /// Log to the console only.
    #[arg(long)]
    no_collector: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_diagnostics();
    health::mark_process_start();

    let mut config = AppConfig::load(args.config.as_deref()).context("loading configuration")?;
    if let Some(port) = args.port {
        config.http_port = port;
    }
    if args.no_collector {
        config.collector.enabled = false;
    }

    let emitter = LogEmitter::new(config.service.as_str());
    emitter.set_level(config.level);
    let console = Arc::new(ConsoleSinkBuilder::stdout().build()?);
    emitter.add_sink(console.clone());

    let collector = if config.collector.enabled {
        let sink = Arc::new(config.stream_sink_builder().build()?);
        let observer = watch_connection(&sink)?;
        emitter.add_sink(sink.clone());
        Some((sink, observer))
    } else {
        info!("Log collector disabled; logging to the console only");
        None
    };

    let health = HealthReporter::spawn(
        emitter.clone(),
        config.health_interval,
        ProcessSampler::new(),
        config.environment.clone(),
    )
    .context("starting health reporter")?;

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.http_port))
        .await
        .with_context(|| format!("binding HTTP port {}", config.http_port))?;
    let port = listener.local_addr()?.port();
    emitter.log(LogEvent::system_start(port));

    let app = http::router(emitter.clone());
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("serving HTTP")?;

    health.stop();
    emitter.flush();
    if let Some((sink, observer)) = collector {
        sink.close();
        if observer.join().is_err() {
            warn!("connection observer panicked");
        }
    }
    console.close();
    Ok(())
}

/// Internal diagnostics go to stderr so they never interleave with the JSON
/// records on stdout. `log` records from the library are captured too.
fn init_diagnostics() {
    let filter = EnvFilter::try_from_env("RELAYLOG_DIAGNOSTICS")
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Report collector connection changes until the sink is closed.
fn watch_connection(sink: &StreamSink) -> Result<JoinHandle<()>> {
    let events = sink.subscribe();
    let target = sink.transport().to_string();
    let handle = thread::Builder::new()
        .name("relaylog-observer".into())
        .spawn(move || {
            for event in events {
                match event {
                    ConnectionEvent::Connecting => {}
                    ConnectionEvent::Connected { peer } => {
                        info!("Connected to log collector at {target} ({peer})");
                    }
                    ConnectionEvent::Error { message } => {
                        warn!("Log collector transport error: {message}");
                    }
                    ConnectionEvent::Disconnected => info!("Disconnected from log collector"),
                }
            }
        })
        .context("starting connection observer")?;
    Ok(handle)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
}
