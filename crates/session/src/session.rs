use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use vigil_core::common::time::{RealTimeProvider, TimeProvider};
use vigil_core::config::SessionConfig;
use vigil_core::session::entity::SessionState;
use vigil_core::session::error::SessionError;
use vigil_core::session::port::SessionHandler;
use vigil_core::transport::error::TransportError;
use vigil_core::transport::port::Transport;

use crate::decoder::PacketDecoder;
use crate::drainer::Drainer;
use crate::listener::Listener;
use crate::queue::PacketQueue;

/// Lifecycle bookkeeping, guarded by one lock so transitions are serialized.
struct Control {
    state: SessionState,
    // incremented by every subscribe; loops carry the value they were started with
    period: u64,
    cancel: Option<CancellationToken>,
    tasks: Vec<JoinHandle<()>>,
    disposed: bool,
}

pub(crate) struct SessionInner {
    pub(crate) name: String,
    pub(crate) config: SessionConfig,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) handler: Arc<dyn SessionHandler>,
    pub(crate) clock: Arc<dyn TimeProvider>,
    pub(crate) decoder: Arc<PacketDecoder>,
    pub(crate) queue: Arc<PacketQueue>,
    // held by a drainer from pop until its handler call returns
    pub(crate) turn: Arc<Mutex<()>>,
    // cancelled on dispose
    pub(crate) lifetime: CancellationToken,
    control: Mutex<Control>,
}

impl SessionInner {
    /// # Summary
    /// Ends the given subscription period if it is still the current one.
    ///
    /// # Logic
    /// 1. A stale period (already replaced or unsubscribed) is ignored.
    /// 2. Otherwise the period is cancelled and `Unsubscribed` is announced.
    pub(crate) async fn end_period(&self, period: u64) -> bool {
        let mut control = self.control.lock().await;
        if control.period != period || control.state != SessionState::Subscribed {
            return false;
        }
        if let Some(cancel) = control.cancel.take() {
            cancel.cancel();
        }
        control.state = SessionState::Unsubscribed;
        info!(session = %self.name, period, "Session unsubscribed");
        self.handler.handle_state_changed(SessionState::Unsubscribed).await;
        true
    }

    async fn fault(&self, period: u64, cause: TransportError) {
        error!(session = %self.name, period, error = %cause, "Listener failed");
        let mut control = self.control.lock().await;
        if control.period != period || control.state != SessionState::Subscribed {
            warn!(session = %self.name, period, "Ignoring failure of a stale subscription");
            return;
        }
        if let Some(cancel) = control.cancel.take() {
            cancel.cancel();
        }
        control.state = SessionState::Unsubscribed;
        self.handler.handle_fault(&SessionError::Transport(cause)).await;
        self.handler.handle_state_changed(SessionState::Unsubscribed).await;
    }
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        self.lifetime.cancel();
        self.queue.shutdown();
        let control = self.control.get_mut();
        if let Some(cancel) = control.cancel.take() {
            cancel.cancel();
        }
    }
}

/// # Summary
/// Façade over one monitored algorithm: owns the lifecycle, the queue and both loops.
///
/// # Invariants
/// - State transitions are serialized and each one is announced to the handler.
/// - At most one listener/drainer pair belongs to the current period.
/// - The handler must not call back into `subscribe`, `unsubscribe` or `dispose` from
///   `handle_state_changed`.
#[derive(Clone)]
pub struct Session {
    pub(crate) inner: Arc<SessionInner>,
}

impl Session {
    /// # Summary
    /// Creates an unsubscribed session using the wall clock.
    ///
    /// # Arguments
    /// * `config`: connection and lifecycle settings; validated here.
    /// * `transport`: source of raw packets.
    /// * `handler`: receiver of everything the session delivers.
    pub fn new(
        config: SessionConfig,
        transport: Arc<dyn Transport>,
        handler: Arc<dyn SessionHandler>,
    ) -> Result<Self, SessionError> {
        Self::with_clock(config, transport, handler, Arc::new(RealTimeProvider))
    }

    /// Same as [`Session::new`] with an explicit clock for log timestamps.
    pub fn with_clock(
        config: SessionConfig,
        transport: Arc<dyn Transport>,
        handler: Arc<dyn SessionHandler>,
        clock: Arc<dyn TimeProvider>,
    ) -> Result<Self, SessionError> {
        config.validate().map_err(SessionError::Config)?;
        let inner = SessionInner {
            name: config.name(),
            config,
            transport,
            handler,
            clock,
            decoder: Arc::new(PacketDecoder::new()),
            queue: Arc::new(PacketQueue::new()),
            turn: Arc::new(Mutex::new(())),
            lifetime: CancellationToken::new(),
            control: Mutex::new(Control {
                state: SessionState::Unsubscribed,
                period: 0,
                cancel: None,
                tasks: Vec::new(),
                disposed: false,
            }),
        };
        Ok(Self { inner: Arc::new(inner) })
    }

    /// `"{host}:{port}"`
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub async fn state(&self) -> SessionState {
        self.inner.control.lock().await.state
    }

    pub fn decoder(&self) -> &PacketDecoder {
        &self.inner.decoder
    }

    /// # Summary
    /// Starts a subscription period.
    ///
    /// # Logic
    /// 1. A subscribed session is left untouched.
    /// 2. Allocates a fresh cancellation token and announces `Subscribed`.
    /// 3. Spawns the listener and the drainer for the new period.
    ///
    /// # Returns
    /// `Runtime` outside a tokio runtime, `Disposed` after `dispose`.
    pub async fn subscribe(&self) -> Result<(), SessionError> {
        let runtime = Handle::try_current().map_err(|e| SessionError::Runtime(e.to_string()))?;
        let inner = &self.inner;
        let mut control = inner.control.lock().await;
        if control.disposed {
            return Err(SessionError::Disposed);
        }
        if control.state == SessionState::Subscribed {
            info!(session = %inner.name, "Already subscribed");
            return Ok(());
        }

        control.tasks.retain(|task| !task.is_finished());
        control.period += 1;
        let period = control.period;
        let cancel = CancellationToken::new();

        let listener = Listener {
            transport: inner.transport.clone(),
            decoder: inner.decoder.clone(),
            queue: inner.queue.clone(),
            cancel: cancel.clone(),
            poll_timeout: inner.config.poll_timeout(),
        };
        let drainer = Drainer {
            name: inner.name.clone(),
            queue: inner.queue.clone(),
            handler: inner.handler.clone(),
            clock: inner.clock.clone(),
            close_after_completed: inner.config.close_after_completed,
            cancel: cancel.clone(),
            turn: inner.turn.clone(),
            session: Arc::downgrade(inner),
            period,
        };

        control.cancel = Some(cancel);
        control.state = SessionState::Subscribed;
        info!(session = %inner.name, period, transport = %inner.transport.name(), "Session subscribed");
        inner.handler.handle_state_changed(SessionState::Subscribed).await;

        let session = Arc::downgrade(inner);
        control.tasks.push(runtime.spawn(async move {
            if let Err(cause) = listener.run().await
                && let Some(inner) = session.upgrade()
            {
                inner.fault(period, cause).await;
            }
        }));
        control.tasks.push(runtime.spawn(drainer.run()));
        Ok(())
    }

    /// # Summary
    /// Ends the current subscription period; a no-op when unsubscribed.
    ///
    /// # Logic
    /// Only cancels the period's loops. A handler call already in progress completes,
    /// and a following period dispatches nothing until it has returned.
    pub async fn unsubscribe(&self) {
        let period = self.inner.control.lock().await.period;
        self.inner.end_period(period).await;
    }

    /// # Summary
    /// Releases every resource of the session.
    ///
    /// # Logic
    /// 1. Cancels the current period and shuts the queue down.
    /// 2. Announces `Unsubscribed` if the session was subscribed.
    /// 3. Waits for every loop, each bounded by the teardown timeout; stragglers are aborted.
    pub async fn dispose(&self) {
        let inner = &self.inner;
        let tasks = {
            let mut control = inner.control.lock().await;
            if control.disposed {
                return;
            }
            control.disposed = true;
            inner.lifetime.cancel();
            if let Some(cancel) = control.cancel.take() {
                cancel.cancel();
            }
            inner.queue.shutdown();
            if control.state == SessionState::Subscribed {
                control.state = SessionState::Unsubscribed;
                inner.handler.handle_state_changed(SessionState::Unsubscribed).await;
            }
            std::mem::take(&mut control.tasks)
        };

        let timeout = inner.config.teardown_timeout();
        for task in tasks {
            let abort = task.abort_handle();
            match tokio::time::timeout(timeout, task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(session = %inner.name, error = %e, "Session task ended abnormally"),
                Err(_) => {
                    warn!(session = %inner.name, "Session task did not stop in time, aborting");
                    abort.abort();
                }
            }
        }
        info!(session = %inner.name, "Session disposed");
    }
}
