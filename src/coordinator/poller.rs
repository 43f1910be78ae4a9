use super::listener::SnapshotListener;
use super::stats::CoordinatorStats;
use crate::analytics::AnalyticFetcher;
use crate::client::PrinterClient;
use crate::config::PollingConfig;
use crate::error::{ApiError, AthenaError, Result};
use crate::events::{EventBus, MonitorEvent};
use crate::normalize::normalize;
use crate::snapshot::{Snapshot, STATUS_FIELD};
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use serde_json::{Number, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Periodically pulls `/status` plus every analytic metric, normalizes the
/// merged payload and publishes it as the current [`Snapshot`].
///
/// A failed cycle never clears the published snapshot: readers keep seeing
/// the last good data while [`PollingCoordinator::is_available`] reports
/// `false` until the next successful cycle.
pub struct PollingCoordinator {
    client: PrinterClient,
    analytics: AnalyticFetcher,
    status_timeout: Duration,
    scan_interval: Duration,
    snapshot: RwLock<Option<Arc<Snapshot>>>,
    last_update_success: AtomicBool,
    stats: Mutex<CoordinatorStats>,
    refresh_lock: tokio::sync::Mutex<()>,
    refresh_requested: Notify,
    listeners: RwLock<Vec<Arc<dyn SnapshotListener>>>,
    events: Arc<EventBus>,
}

impl PollingCoordinator {
    pub fn new(client: PrinterClient, polling: &PollingConfig, events: Arc<EventBus>) -> Self {
        let analytics = AnalyticFetcher::new(
            client.clone(),
            polling.analytic_timeout(),
            polling.analytic_concurrency,
        );

        Self {
            client,
            analytics,
            status_timeout: polling.status_timeout(),
            scan_interval: polling.scan_interval(),
            snapshot: RwLock::new(None),
            last_update_success: AtomicBool::new(false),
            stats: Mutex::new(CoordinatorStats::default()),
            refresh_lock: tokio::sync::Mutex::new(()),
            refresh_requested: Notify::new(),
            listeners: RwLock::new(Vec::new()),
            events,
        }
    }

    pub fn host(&self) -> &str {
        self.client.host()
    }

    pub fn client(&self) -> &PrinterClient {
        &self.client
    }

    pub fn scan_interval(&self) -> Duration {
        self.scan_interval
    }

    /// The last successfully published snapshot, stale or not
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.snapshot.read().clone()
    }

    /// Whether the most recent cycle succeeded
    pub fn last_update_success(&self) -> bool {
        self.last_update_success.load(Ordering::SeqCst)
    }

    /// Entity views are available only while the last cycle succeeded
    pub fn is_available(&self) -> bool {
        self.last_update_success()
    }

    pub fn stats(&self) -> CoordinatorStats {
        self.stats.lock().clone()
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<MonitorEvent> {
        self.events.subscribe()
    }

    pub fn add_listener(&self, listener: Arc<dyn SnapshotListener>) {
        debug!("Registering snapshot listener: {}", listener.listener_name());
        self.listeners.write().push(listener);
    }

    /// Ask the run loop for an out-of-band refresh without waiting for it
    pub fn request_refresh(&self) {
        debug!("Refresh requested for {}", self.host());
        self.refresh_requested.notify_one();
    }

    /// Run one poll cycle and publish the result.
    ///
    /// Overlapping calls are serialized; each one performs its own cycle.
    pub async fn refresh(&self) -> Result<Arc<Snapshot>> {
        let _guard = self.refresh_lock.lock().await;

        match self.poll_once().await {
            Ok(snapshot) => Ok(self.publish(snapshot).await),
            Err(source) => {
                let error = AthenaError::update_failed(self.client.host(), source);
                self.record_failure(&error).await;
                Err(error)
            }
        }
    }

    /// Poll until `cancel` fires. The first cycle runs immediately unless a
    /// refresh already happened; later cycles follow the scan interval or
    /// [`request_refresh`](Self::request_refresh).
    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            "Polling {} every {}s",
            self.host(),
            self.scan_interval.as_secs()
        );

        let start = if self.stats.lock().refresh_count == 0 {
            Instant::now()
        } else {
            Instant::now() + self.scan_interval
        };
        let mut ticker = tokio::time::interval_at(start, self.scan_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
                _ = self.refresh_requested.notified() => {
                    ticker.reset();
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                result = self.refresh() => {
                    if let Err(e) = result {
                        debug!("Poll cycle failed, keeping previous snapshot: {}", e);
                    }
                }
            }
        }

        info!("Polling loop for {} stopped", self.host());
    }

    async fn poll_once(&self) -> std::result::Result<Snapshot, ApiError> {
        let mut fields = self.client.fetch_status(self.status_timeout).await?;

        if !fields.contains_key(STATUS_FIELD) {
            return Err(ApiError::MissingField {
                field: STATUS_FIELD.to_string(),
            });
        }

        for (field, value) in self.analytics.fetch_all().await {
            match Number::from_f64(value) {
                Some(number) => {
                    fields.insert(field, Value::Number(number));
                }
                None => debug!("Dropping non-finite analytic value for {}", field),
            }
        }

        Snapshot::from_fields(normalize(fields)).ok_or_else(|| ApiError::MissingField {
            field: STATUS_FIELD.to_string(),
        })
    }

    async fn publish(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let snapshot = Arc::new(snapshot);
        *self.snapshot.write() = Some(Arc::clone(&snapshot));
        self.last_update_success.store(true, Ordering::SeqCst);
        self.stats.lock().record_success(snapshot.fetched_at());

        debug!(
            "Published snapshot for {} with {} fields",
            self.host(),
            snapshot.len()
        );

        self.events.publish(MonitorEvent::SnapshotUpdated {
            snapshot: Arc::clone(&snapshot),
        });

        let listeners = self.listeners.read().clone();
        for listener in listeners {
            listener.on_snapshot(Arc::clone(&snapshot)).await;
        }

        snapshot
    }

    async fn record_failure(&self, error: &AthenaError) {
        let now = Utc::now();
        self.last_update_success.store(false, Ordering::SeqCst);

        let consecutive = {
            let mut stats = self.stats.lock();
            stats.record_failure(now, error.to_string());
            stats.consecutive_failures
        };
        if consecutive > 1 {
            warn!("{} consecutive poll failures for {}", consecutive, self.host());
        }

        self.events.publish(MonitorEvent::UpdateFailed {
            host: self.host().to_string(),
            error: error.to_string(),
            timestamp: now,
        });

        let listeners = self.listeners.read().clone();
        for listener in listeners {
            listener.on_update_failed(error).await;
        }
    }
}
