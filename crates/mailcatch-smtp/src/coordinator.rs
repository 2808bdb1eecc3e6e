//! SMTP listener lifecycle coordination.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use mailcatch_core::{Event, EventBus, SmtpSettings};

use crate::server::SmtpServer;

/// Retry budget for bind attempts.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total bind attempts before giving up; the failing attempt counts.
    pub attempts: u32,
    /// Delay before the first attempt and between retries.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            delay: Duration::from_millis(500),
        }
    }
}

/// Listener lifecycle states.
///
/// Owned exclusively by the coordinator; the outside world observes
/// transitions only through published events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BindState {
    Stopped,
    Starting,
    Listening,
    Failed,
}

/// Input messages processed synchronously into state transitions.
#[derive(Debug)]
enum Command {
    SetEnabled(bool),
    Shutdown,
}

/// Result of one bind attempt sequence, tagged with its generation so
/// outcomes from superseded attempts can be discarded.
#[derive(Debug)]
struct BindOutcome {
    generation: u64,
    outcome: Outcome,
}

#[derive(Debug)]
enum Outcome {
    Bound(SocketAddr),
    Failed,
}

/// Sends lifecycle commands to a running [`SmtpServerCoordinator`].
#[derive(Debug, Clone)]
pub struct CoordinatorHandle {
    commands: mpsc::Sender<Command>,
}

impl CoordinatorHandle {
    /// Toggles the declarative "enabled" intent.
    ///
    /// Enabling while stopped or failed starts the listener; disabling
    /// while starting or listening stops it, including cancelling an
    /// in-flight retry sequence. A no-op toggle is ignored.
    pub async fn set_enabled(&self, enabled: bool) {
        let _ = self.commands.send(Command::SetEnabled(enabled)).await;
    }

    /// Stops the coordinator and releases the listener.
    pub async fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown).await;
    }
}

/// Owns the SMTP listener's lifecycle.
///
/// Consumes `ClientReady`, `ClientExit`, and `SettingsUpdated` events from
/// the bus plus commands from its handle; publishes `SmtpServerBound` and
/// `SmtpServerBindFailed` back onto the bus. Bind attempts run on a
/// cancellable background task so notification handlers return
/// immediately.
#[derive(Debug)]
pub struct SmtpServerCoordinator<S> {
    server: Arc<S>,
    bus: EventBus,
    settings: SmtpSettings,
    enabled: bool,
    policy: RetryPolicy,
    state: BindState,
    generation: u64,
    attempt: Option<JoinHandle<()>>,
    events: broadcast::Receiver<Event>,
    commands: mpsc::Receiver<Command>,
    outcomes_tx: mpsc::Sender<BindOutcome>,
    outcomes_rx: mpsc::Receiver<BindOutcome>,
}

impl<S> SmtpServerCoordinator<S>
where
    S: SmtpServer,
{
    /// Creates a coordinator with the default retry policy.
    #[must_use]
    pub fn new(
        server: S,
        bus: EventBus,
        settings: SmtpSettings,
        enabled: bool,
    ) -> (Self, CoordinatorHandle) {
        Self::with_policy(server, bus, settings, enabled, RetryPolicy::default())
    }

    /// Creates a coordinator with an explicit retry policy.
    #[must_use]
    pub fn with_policy(
        server: S,
        bus: EventBus,
        settings: SmtpSettings,
        enabled: bool,
        policy: RetryPolicy,
    ) -> (Self, CoordinatorHandle) {
        let (commands_tx, commands) = mpsc::channel(16);
        let (outcomes_tx, outcomes_rx) = mpsc::channel(4);
        // Subscribe at construction so notifications published before the
        // coordinator task first polls are not lost.
        let events = bus.subscribe();
        let coordinator = Self {
            server: Arc::new(server),
            bus,
            events,
            settings,
            enabled,
            policy,
            state: BindState::Stopped,
            generation: 0,
            attempt: None,
            commands,
            outcomes_tx,
            outcomes_rx,
        };
        let handle = CoordinatorHandle {
            commands: commands_tx,
        };
        (coordinator, handle)
    }

    /// Runs the coordinator until shutdown, then releases the listener.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::SetEnabled(enabled)) => self.set_enabled(enabled).await,
                    Some(Command::Shutdown) | None => break,
                },
                Some(outcome) = self.outcomes_rx.recv() => self.handle_outcome(outcome),
                event = self.events.recv() => match event {
                    Ok(Event::ClientReady) => self.handle_ready(),
                    Ok(Event::ClientExit) => self.stop_listening().await,
                    Ok(Event::SettingsUpdated { previous, new }) => {
                        self.handle_settings(previous, new).await;
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "coordinator lagged behind the event bus");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
        self.stop_listening().await;
    }

    fn handle_ready(&mut self) {
        if self.enabled && matches!(self.state, BindState::Stopped | BindState::Failed) {
            self.start_listening();
        }
    }

    async fn handle_settings(&mut self, previous: SmtpSettings, new: SmtpSettings) {
        self.settings = new;
        if !self.enabled || previous == new {
            return;
        }
        tracing::info!(ip = %new.ip, port = new.port, "SMTP settings changed, rebinding listener");
        self.stop_listening().await;
        self.start_listening();
    }

    async fn set_enabled(&mut self, enabled: bool) {
        if enabled == self.enabled {
            return;
        }
        self.enabled = enabled;
        if enabled {
            if matches!(self.state, BindState::Stopped | BindState::Failed) {
                self.start_listening();
            }
        } else if matches!(self.state, BindState::Starting | BindState::Listening) {
            self.stop_listening().await;
        }
    }

    fn handle_outcome(&mut self, outcome: BindOutcome) {
        if outcome.generation != self.generation {
            // a cancelled attempt resolved after being superseded
            return;
        }
        match outcome.outcome {
            Outcome::Bound(addr) => {
                self.state = BindState::Listening;
                tracing::info!(%addr, "SMTP listener bound");
                self.bus.publish(Event::SmtpServerBound {
                    ip: addr.ip(),
                    port: addr.port(),
                });
            }
            Outcome::Failed => {
                self.state = BindState::Failed;
                self.bus.publish(Event::SmtpServerBindFailed);
            }
        }
    }

    /// Kicks off a delayed, cancellable bind attempt sequence.
    fn start_listening(&mut self) {
        self.cancel_attempt();
        self.state = BindState::Starting;

        let server = Arc::clone(&self.server);
        let addr = self.settings.socket_addr();
        let policy = self.policy;
        let generation = self.generation;
        let outcomes = self.outcomes_tx.clone();

        self.attempt = Some(tokio::spawn(async move {
            tokio::time::sleep(policy.delay).await;
            for attempt in 1..=policy.attempts {
                match server.start(addr).await {
                    Ok(bound) => {
                        let _ = outcomes
                            .send(BindOutcome {
                                generation,
                                outcome: Outcome::Bound(bound),
                            })
                            .await;
                        return;
                    }
                    Err(e) => {
                        tracing::warn!(
                            error = %e,
                            attempt,
                            max_attempts = policy.attempts,
                            %addr,
                            "failed to bind SMTP listener; the port may already be in use by another process"
                        );
                    }
                }
                if attempt < policy.attempts {
                    tokio::time::sleep(policy.delay).await;
                }
            }
            let _ = outcomes
                .send(BindOutcome {
                    generation,
                    outcome: Outcome::Failed,
                })
                .await;
        }));
    }

    /// Cancels any in-flight retry sequence and releases the listener.
    async fn stop_listening(&mut self) {
        self.cancel_attempt();
        self.server.stop().await;
        if self.state != BindState::Stopped {
            tracing::info!("SMTP listener stopped");
        }
        self.state = BindState::Stopped;
    }

    /// Cancels the retry task if one is outstanding; safe when none is.
    ///
    /// Bumping the generation discards any outcome the cancelled task
    /// already managed to send.
    fn cancel_attempt(&mut self) {
        self.generation += 1;
        if let Some(attempt) = self.attempt.take() {
            attempt.abort();
        }
    }
}
