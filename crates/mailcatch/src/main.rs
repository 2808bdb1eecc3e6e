//! Mailcatch capture service.
//!
//! Background process that owns the SMTP listener and stays synchronized
//! with the desktop UI over the loopback exchange protocol. This binary is
//! wiring only: configuration flows into the lifecycle coordinator and the
//! event listener, and bus events flow out to the UI process.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod config;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mailcatch_core::{Event, EventBus};
use mailcatch_ipc::{Client, EventSink, LOCALHOST, Listener};
use mailcatch_smtp::{CaptureSmtpServer, SmtpServerCoordinator};

use config::Config;

/// Republishes events received from the UI process onto the local bus.
struct BusSink {
    bus: EventBus,
}

impl EventSink for BusSink {
    fn accept(&self, event: Event) -> impl Future<Output = Option<Event>> + Send {
        async move {
            self.bus.publish(event);
            None
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "mailcatch=debug,mailcatch_ipc=debug,mailcatch_smtp=debug".into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("loading configuration")?;
    info!(
        smtp = %config.smtp.socket_addr(),
        enabled = config.smtp_enabled,
        "starting Mailcatch service"
    );

    let bus = EventBus::default();

    // The capture pipeline attaches to this channel; until it does,
    // accepted SMTP connections are logged and dropped.
    let (connections_tx, mut connections_rx) = mpsc::channel::<(TcpStream, SocketAddr)>(32);
    tokio::spawn(async move {
        while let Some((_stream, peer)) = connections_rx.recv().await {
            debug!(%peer, "SMTP connection accepted");
        }
    });

    let server = CaptureSmtpServer::new(connections_tx);
    let (coordinator, handle) =
        SmtpServerCoordinator::new(server, bus.clone(), config.smtp, config.smtp_enabled);
    let coordinator_task = tokio::spawn(coordinator.run());

    tokio::spawn(forward_to_ui(bus.clone(), config.ui_port));

    let listener = Listener::bind(LOCALHOST, config.ipc_port)
        .await
        .with_context(|| format!("binding event listener on port {}", config.ipc_port))?;
    info!(port = config.ipc_port, "event listener bound");

    let sink = Arc::new(BusSink { bus });
    let listener_task = tokio::spawn(async move {
        if let Err(e) = listener.serve(sink).await {
            warn!(error = %e, "event listener stopped");
        }
    });

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    info!("shutting down");

    handle.shutdown().await;
    let _ = coordinator_task.await;
    listener_task.abort();
    Ok(())
}

/// Forwards service-side happenings to the UI process, if one is listening.
async fn forward_to_ui(bus: EventBus, ui_port: u16) {
    let client = Client::new(LOCALHOST, ui_port);
    let mut events = bus.subscribe();
    loop {
        match events.recv().await {
            Ok(
                event @ (Event::NewMessage { .. }
                | Event::SmtpServerBound { .. }
                | Event::SmtpServerBindFailed),
            ) => match client.publish(&event).await {
                Ok(sent) => debug!(kind = event.kind(), sent, "forwarded event to UI"),
                Err(e) => warn!(error = %e, kind = event.kind(), "failed to forward event to UI"),
            },
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "UI forwarder lagged behind the event bus");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
