use std::sync::Arc;

use tokio::signal::unix::signal;
use tokio::signal::unix::SignalKind;
use tokio::sync::watch;
use tracing::error;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;
use vm_broker::metrics;
use vm_broker::network;
use vm_broker::BackendBinding;
use vm_broker::Broker;
use vm_broker::BrokerConfig;
use vm_broker::ConfiguredLoader;
use vm_broker::Error;
use vm_broker::LogConfig;
use vm_broker::NetworkError;
use vm_broker::Result;

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<()> {
    let settings = BrokerConfig::new()?.validate()?;

    // Initializing Logs
    let _guard = init_observability(&settings.log)?;

    // Initializing Shutdown Signal
    let (graceful_tx, graceful_rx) = watch::channel(());

    if settings.monitoring.prometheus_enabled {
        let port = settings.monitoring.prometheus_port;
        let shutdown = graceful_rx.clone();
        tokio::spawn(async move {
            metrics::start_server(port, shutdown).await;
        });
    }

    // Backend is loaded lazily on the first CreateInstance
    let backend = BackendBinding::new(ConfiguredLoader::new(settings.backend.clone()));
    let broker = Arc::new(Broker::new(backend, settings.session.clone()));

    let listener = network::bind(&settings.server).await?;

    info!("Broker started. Waiting for CTRL+C signal...");
    tokio::spawn(async {
        if let Err(e) = graceful_shutdown(graceful_tx).await {
            error!("Failed to shutdown: {:?}", e);
        }
    });

    if let Err(e) = network::serve(listener, broker, settings.server.clone(), graceful_rx).await {
        error!("broker stops: {:?}", e);
    }

    info!("Exiting program.");
    Ok(())
}

async fn graceful_shutdown(graceful_tx: watch::Sender<()>) -> Result<()> {
    let mut sigint = signal(SignalKind::interrupt()).map_err(NetworkError::Io)?;
    let mut sigterm = signal(SignalKind::terminate()).map_err(NetworkError::Io)?;
    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT detected.");
        },
        _ = sigterm.recv() => {
            info!("SIGTERM detected.");
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C detected.");
        },
    }

    graceful_tx.send(()).map_err(|e| {
        error!("Failed to send shutdown signal: {}", e);
        NetworkError::SignalSendFailed(format!("Failed to send shutdown signal: {}", e))
    })?;

    info!("Shutdown completed");
    Ok(())
}

fn init_observability(log: &LogConfig) -> Result<WorkerGuard> {
    std::fs::create_dir_all(&log.log_dir)
        .map_err(|e| Error::Fatal(format!("cannot create log dir {:?}: {}", log.log_dir, e)))?;
    let log_file = tracing_appender::rolling::never(&log.log_dir, &log.file_name);

    let (non_blocking, guard) = tracing_appender::non_blocking(log_file);
    let base_subscriber = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::from_default_env());
    tracing_subscriber::registry().with(base_subscriber).init();

    Ok(guard)
}
