use super::{RateView, ViewState};
use crate::diagnostics::IpLookup;
use crate::errors::{RateError, ViewError};
use crate::exchanges::Exchange;
use crate::models::{FetchResult, RateSnapshot, now_ms};
use crate::store::RateStore;
use futures_util::future::BoxFuture;
use futures_util::stream::FuturesUnordered;
use futures_util::{FutureExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

pub const HIGHLIGHT_DURATION: Duration = Duration::from_millis(700);
/// How long a toast stays up before it is dismissed.
pub const NOTIFICATION_TTL: Duration = Duration::from_secs(5);

type Responder = oneshot::Sender<Result<ViewState, ViewError>>;

enum Command {
    Refresh(Responder),
    Save(Responder),
    FetchIp(Responder),
}

enum Outcome {
    Fetched(FetchResult, Option<Responder>),
    Saved(RateSnapshot, Result<(), RateError>, Responder),
    Loaded(Result<Option<RateSnapshot>, RateError>),
    Ip(Result<String, RateError>, Responder),
}

/// One page session: owns a `RateView` and runs its I/O on a single task.
///
/// Operations run concurrently with command handling, so the view can
/// refuse a second refresh while the first is still out. When the session
/// ends every in-flight operation is dropped, which aborts its request.
pub struct Session {
    view: RateView,
    exchange: Arc<dyn Exchange>,
    store: RateStore,
    ip_lookup: IpLookup,
    auto_fetch: bool,
    highlight_for: Duration,
    notification_ttl: Duration,
}

impl Session {
    pub fn new(
        pair: impl Into<String>,
        exchange: Arc<dyn Exchange>,
        store: RateStore,
        ip_lookup: IpLookup,
    ) -> Self {
        Self {
            view: RateView::new(pair),
            exchange,
            store,
            ip_lookup,
            auto_fetch: false,
            highlight_for: HIGHLIGHT_DURATION,
            notification_ttl: NOTIFICATION_TTL,
        }
    }

    /// Fetch the current rate as soon as the session mounts.
    pub fn with_auto_fetch(mut self, auto_fetch: bool) -> Self {
        self.auto_fetch = auto_fetch;
        self
    }

    pub fn with_highlight(mut self, duration: Duration) -> Self {
        self.highlight_for = duration;
        self
    }

    pub fn with_notification_ttl(mut self, ttl: Duration) -> Self {
        self.notification_ttl = ttl;
        self
    }

    /// Mounts the session on a new tokio task.
    pub fn spawn(self) -> SessionHandle {
        let (commands_tx, commands_rx) = mpsc::channel(16);
        let (state_tx, state_rx) = watch::channel(self.view.state());
        let cancel = CancellationToken::new();

        tokio::spawn(self.run(commands_rx, state_tx, cancel.clone()));

        SessionHandle {
            commands: commands_tx,
            state: state_rx,
            cancel,
        }
    }

    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        state: watch::Sender<ViewState>,
        cancel: CancellationToken,
    ) {
        let mut in_flight: FuturesUnordered<BoxFuture<'static, Outcome>> = FuturesUnordered::new();
        let mut highlight_until: Option<Instant> = None;

        tracing::info!(pair = self.view.pair(), exchange = self.exchange.name(), "session mounted");

        in_flight.push(self.load_op());
        if self.auto_fetch && self.view.begin_refresh().is_ok() {
            in_flight.push(self.fetch_op(None));
        }
        state.send_replace(self.view.state());

        let ttl_ms = self.notification_ttl.as_millis() as i64;

        loop {
            let dismiss_at = self.view.oldest_notification_at().map(|raised_at| {
                let remaining = (raised_at + ttl_ms - now_ms()).max(0) as u64;
                Instant::now() + Duration::from_millis(remaining)
            });

            tokio::select! {
                // unmounting wins over anything else that is ready
                biased;

                _ = cancel.cancelled() => break,

                command = commands.recv() => match command {
                    Some(command) => self.handle(command, &mut in_flight),
                    None => break,
                },

                Some(outcome) = in_flight.next(), if !in_flight.is_empty() => {
                    if self.complete(outcome) {
                        highlight_until = Some(Instant::now() + self.highlight_for);
                    }
                }

                _ = tokio::time::sleep_until(highlight_until.unwrap_or_else(Instant::now)),
                    if highlight_until.is_some() =>
                {
                    highlight_until = None;
                    self.view.clear_highlight();
                }

                _ = tokio::time::sleep_until(dismiss_at.unwrap_or_else(Instant::now)),
                    if dismiss_at.is_some() =>
                {
                    // the oldest one is due even if the wall clock lags the timer
                    if let Some(oldest) = self.view.oldest_notification_at() {
                        self.view.expire_notifications(oldest.max(now_ms() - ttl_ms));
                    }
                }
            }

            state.send_replace(self.view.state());
        }

        tracing::info!(abandoned = in_flight.len(), "session closed, cancelling in-flight work");
    }

    fn handle(&mut self, command: Command, in_flight: &mut FuturesUnordered<BoxFuture<'static, Outcome>>) {
        match command {
            Command::Refresh(reply) => match self.view.begin_refresh() {
                Ok(()) => in_flight.push(self.fetch_op(Some(reply))),
                Err(e) => {
                    let _ = reply.send(Err(e));
                }
            },
            Command::Save(reply) => match self.view.begin_save() {
                Ok(snapshot) => in_flight.push(self.save_op(snapshot, reply)),
                Err(e) => {
                    let _ = reply.send(Err(e));
                }
            },
            Command::FetchIp(reply) => match self.view.begin_ip_lookup() {
                Ok(()) => in_flight.push(self.ip_op(reply)),
                Err(e) => {
                    let _ = reply.send(Err(e));
                }
            },
        }
    }

    /// Applies a finished operation. Returns true when the rate panel
    /// should start its highlight.
    fn complete(&mut self, outcome: Outcome) -> bool {
        match outcome {
            Outcome::Fetched(result, reply) => {
                let fetched = result.is_ok();
                match &result {
                    Ok(snapshot) => {
                        metrics::counter!("bitrate_fetch_total", "outcome" => "ok").increment(1);
                        tracing::info!("[{}] {}: {:.2}", self.exchange.name(), self.view.pair(), snapshot.rate());
                    }
                    Err(e) => {
                        metrics::counter!("bitrate_fetch_total", "outcome" => "error").increment(1);
                        tracing::warn!("[{}] fetch failed: {e}", self.exchange.name());
                    }
                }
                self.view.finish_refresh(result);
                if let Some(reply) = reply {
                    let _ = reply.send(Ok(self.view.state()));
                }
                fetched
            }
            Outcome::Saved(snapshot, result, reply) => {
                let label = if result.is_ok() { "ok" } else { "error" };
                metrics::counter!("bitrate_save_total", "outcome" => label).increment(1);
                if let Err(e) = &result {
                    tracing::warn!("saving rate failed: {e}");
                }
                self.view.finish_save(snapshot, result);
                let _ = reply.send(Ok(self.view.state()));
                false
            }
            Outcome::Loaded(result) => {
                let label = if result.is_ok() { "ok" } else { "error" };
                metrics::counter!("bitrate_load_total", "outcome" => label).increment(1);
                match &result {
                    Ok(Some(saved)) => tracing::info!("loaded saved rate {:.2}", saved.rate()),
                    Ok(None) => tracing::debug!("no saved rate yet"),
                    Err(e) => tracing::warn!("loading saved rate failed: {e}"),
                }
                self.view.apply_saved(result);
                false
            }
            Outcome::Ip(result, reply) => {
                if let Err(e) = &result {
                    tracing::warn!("backend ip lookup failed: {e}");
                }
                self.view.finish_ip_lookup(result);
                let _ = reply.send(Ok(self.view.state()));
                false
            }
        }
    }

    fn fetch_op(&self, reply: Option<Responder>) -> BoxFuture<'static, Outcome> {
        let exchange = Arc::clone(&self.exchange);
        let pair = self.view.pair().to_string();
        async move { Outcome::Fetched(exchange.fetch_rate(&pair).await, reply) }.boxed()
    }

    fn save_op(&self, snapshot: RateSnapshot, reply: Responder) -> BoxFuture<'static, Outcome> {
        let store = self.store.clone();
        async move {
            let result = store.save_rate(&snapshot).await;
            Outcome::Saved(snapshot, result, reply)
        }
        .boxed()
    }

    fn load_op(&self) -> BoxFuture<'static, Outcome> {
        let store = self.store.clone();
        async move { Outcome::Loaded(store.load_rate().await) }.boxed()
    }

    fn ip_op(&self, reply: Responder) -> BoxFuture<'static, Outcome> {
        let lookup = self.ip_lookup.clone();
        async move { Outcome::Ip(lookup.backend_ip().await, reply) }.boxed()
    }
}

/// Mounts fresh sessions that share one exchange, store and IP lookup.
#[derive(Clone)]
pub struct SessionFactory {
    pair: String,
    exchange: Arc<dyn Exchange>,
    store: RateStore,
    ip_lookup: IpLookup,
    auto_fetch: bool,
}

impl SessionFactory {
    pub fn new(
        pair: impl Into<String>,
        exchange: Arc<dyn Exchange>,
        store: RateStore,
        ip_lookup: IpLookup,
    ) -> Self {
        Self {
            pair: pair.into(),
            exchange,
            store,
            ip_lookup,
            auto_fetch: false,
        }
    }

    pub fn with_auto_fetch(mut self, auto_fetch: bool) -> Self {
        self.auto_fetch = auto_fetch;
        self
    }

    pub fn mount(&self) -> SessionHandle {
        Session::new(
            self.pair.clone(),
            Arc::clone(&self.exchange),
            self.store.clone(),
            self.ip_lookup.clone(),
        )
        .with_auto_fetch(self.auto_fetch)
        .spawn()
    }
}

/// Drives a mounted session. Dropping the handle unmounts it.
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<ViewState>,
    cancel: CancellationToken,
}

impl SessionHandle {
    /// Fetches the current rate; resolves once the fetch has finished.
    pub async fn refresh(&self) -> Result<ViewState, ViewError> {
        self.request(Command::Refresh).await
    }

    /// Persists the current rate as the saved one.
    pub async fn save(&self) -> Result<ViewState, ViewError> {
        self.request(Command::Save).await
    }

    pub async fn fetch_backend_ip(&self) -> Result<ViewState, ViewError> {
        self.request(Command::FetchIp).await
    }

    /// Latest published state.
    pub fn state(&self) -> ViewState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.state.clone()
    }

    /// Unmounts the session, cancelling anything still in flight.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    async fn request(&self, command: impl FnOnce(Responder) -> Command) -> Result<ViewState, ViewError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| ViewError::Closed)?;
        response.await.map_err(|_| ViewError::Closed)?
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
