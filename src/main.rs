//! Courier event forwarding service.
//!
//! Reads newline-delimited JSON events from stdin and forwards each one to
//! the configured collector through a bounded HTTP transport. On end of
//! input or a shutdown signal, waits for in-flight deliveries to settle.

mod config;

use anyhow::{Context, Result};
use courier_core::{DeliveryError, ErrorCategory, Event};
use courier_transport::{HttpTransport, Transport};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{debug, error, info, warn};

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;

    info!("Starting courier event forwarder");

    let config = Config::load()?;
    info!(
        store_url = %config.store_url,
        buffer_capacity = config.buffer_capacity,
        timeout_seconds = config.timeout_seconds,
        "Configuration loaded"
    );

    let transport =
        HttpTransport::new(config.transport_options()?).context("Failed to build transport")?;

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            shutdown_signal().await;
            shutdown.cancel();
        }
    });

    let outcomes = TaskTracker::new();
    let stats = forward_events(&transport, tokio::io::stdin(), &outcomes, shutdown).await?;
    info!(
        submitted = stats.submitted,
        dropped = stats.dropped,
        invalid = stats.invalid,
        "Input finished, draining in-flight deliveries"
    );

    outcomes.close();
    if transport.close(Some(config.shutdown_timeout())).await {
        outcomes.wait().await;
        info!("All deliveries settled");
    } else {
        warn!(
            in_flight = transport.buffer().in_flight(),
            "Shutdown timeout expired with deliveries still in flight"
        );
    }

    info!("Courier shutdown complete");
    Ok(())
}

/// Counts of what happened to each input line.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct ForwardStats {
    /// Events admitted for delivery.
    submitted: usize,
    /// Events refused because the buffer was full.
    dropped: usize,
    /// Lines that were not valid JSON.
    invalid: usize,
}

/// Forwards every JSON line from `input` until end of input or cancellation.
///
/// Outcome logging runs on `outcomes` so the caller can wait for it after
/// the transport drains.
async fn forward_events<T, R>(
    transport: &T,
    input: R,
    outcomes: &TaskTracker,
    shutdown: CancellationToken,
) -> Result<ForwardStats>
where
    T: Transport,
    R: AsyncRead + Unpin,
{
    let mut stats = ForwardStats::default();
    let mut lines = BufReader::new(input).lines();
    let mut line_number = 0usize;

    loop {
        let line = tokio::select! {
            biased;
            () = shutdown.cancelled() => {
                info!("Shutdown requested, no longer reading input");
                break;
            },
            line = lines.next_line() => line.context("Failed to read input")?,
        };
        let Some(line) = line else { break };
        line_number += 1;

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let payload: serde_json::Value = match serde_json::from_str(line) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(line = line_number, error = %e, "Skipping invalid JSON line");
                stats.invalid += 1;
                continue;
            },
        };

        let event = Event::new(payload);
        let event_id = event.id();
        match transport.send(event) {
            Ok(handle) => {
                stats.submitted += 1;
                outcomes.spawn(async move {
                    match handle.await {
                        Ok(response) => {
                            debug!(%event_id, status = %response.status, "Event delivered");
                        },
                        Err(e) => {
                            warn!(
                                %event_id,
                                category = %ErrorCategory::from(&e),
                                error = %e,
                                "Event delivery failed"
                            );
                        },
                    }
                });
            },
            Err(e @ DeliveryError::BufferFull { .. }) => {
                warn!(%event_id, error = %e, "Dropping event");
                stats.dropped += 1;
            },
            Err(e) => return Err(e).context("Transport refused event"),
        }
    }

    Ok(stats)
}

/// Initializes tracing with environment-based configuration.
fn init_tracing() -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info,courier=debug"))
        .context("Invalid RUST_LOG environment variable")?;

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry().with(filter).with(fmt_layer).init();
    Ok(())
}

/// Waits for shutdown signal (CTRL+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received CTRL+C signal");
        },
        () = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
