//! Live-data acquisition loop.
//!
//! [`AcquisitionLoop`] polls a [`ReadingSource`] for one device on a fixed
//! interval and reports each outcome as an `(Option<SensorReading>,
//! ConnectionStatus)` pair through a caller-supplied callback.
//!
//! Each start or device switch begins a new *cycle*: a spawned task with
//! its own [`CancellationToken`] (a child of the loop's master token).
//! A cycle fetches once immediately, then on every tick. Ticks that come
//! due while a fetch is still running are dropped, so at most one fetch
//! per cycle is ever in flight and callbacks arrive in fetch order.
//!
//! Every cycle first reports `(None, Connecting)`, then one update per
//! fetch. Results from a cycle that has been stopped or replaced are
//! discarded, even when the underlying request completes afterwards.

use std::cell::Cell;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use compost_core::reading::{ConnectionStatus, SensorReading};
use compost_core::types::DeviceId;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::source::{FetchError, LatestReading, ReadingSource};

/// Shortest interval a cycle will poll at.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Cycle ids are unique across every loop in the process, so the delivery
/// gate can tell one loop's callback from another's.
static NEXT_CYCLE_ID: AtomicU64 = AtomicU64::new(1);

/// Callback receiving each cycle announcement and fetch outcome.
pub type UpdateFn = dyn Fn(Option<SensorReading>, ConnectionStatus) + Send + Sync;

/// Polls one device at a time and tracks its connection status.
///
/// Cheap to clone; clones share the same state. Polling ends when
/// [`stop`](Self::stop) is called or the last handle drops.
///
/// A callback that needs to control its own loop should capture a
/// [`WeakAcquisitionLoop`] from [`downgrade`](Self::downgrade). A strong
/// handle captured by the callback keeps the loop alive until `stop` is
/// called explicitly.
#[derive(Clone)]
pub struct AcquisitionLoop {
    inner: Arc<Inner>,
}

/// Non-owning handle to an [`AcquisitionLoop`].
#[derive(Clone)]
pub struct WeakAcquisitionLoop {
    inner: Weak<Inner>,
}

impl WeakAcquisitionLoop {
    /// The loop, if any strong handle to it is still alive.
    pub fn upgrade(&self) -> Option<AcquisitionLoop> {
        self.inner.upgrade().map(|inner| AcquisitionLoop { inner })
    }
}

struct Inner {
    source: Arc<dyn ReadingSource>,
    state: Mutex<LoopState>,
    /// Master cancellation token; cancelled when the last strong handle
    /// drops.
    cancel: CancellationToken,
}

#[derive(Default)]
struct LoopState {
    cycle: Option<Cycle>,
    status: ConnectionStatus,
    reading: Option<SensorReading>,
}

/// Bookkeeping for one polling cycle.
#[derive(Clone)]
struct Cycle {
    id: u64,
    device_id: DeviceId,
    interval: Duration,
    on_update: Arc<UpdateFn>,
    gate: Arc<DeliveryGate>,
    cancel: CancellationToken,
}

impl AcquisitionLoop {
    pub fn new(source: Arc<dyn ReadingSource>) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                state: Mutex::new(LoopState::default()),
                cancel: CancellationToken::new(),
            }),
        }
    }

    /// Start polling `device_id` every `interval`, replacing any running
    /// cycle. The first fetch happens immediately.
    ///
    /// Status resets to [`ConnectionStatus::Connecting`] and the held
    /// reading is cleared until the first fetch completes. The callback
    /// sees `(None, Connecting)` before the first fetch result.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start<F>(&self, device_id: impl Into<DeviceId>, interval: Duration, on_update: F)
    where
        F: Fn(Option<SensorReading>, ConnectionStatus) + Send + Sync + 'static,
    {
        self.launch(device_id.into(), interval, Arc::new(on_update));
    }

    /// Switch the running loop to another device, keeping its interval and
    /// callback. Results still in flight for the previous device are
    /// discarded.
    ///
    /// Returns `false` (and does nothing) when the loop is not running.
    /// Selecting the device already being polled is a no-op.
    pub fn select_device(&self, device_id: impl Into<DeviceId>) -> bool {
        let device_id = device_id.into();
        let current = self
            .inner
            .lock_state()
            .cycle
            .as_ref()
            .map(|c| (c.device_id == device_id, c.interval, Arc::clone(&c.on_update)));

        match current {
            None => false,
            Some((true, _, _)) => true,
            Some((false, interval, on_update)) => {
                tracing::info!(device_id = %device_id, "Switching monitored device");
                self.launch(device_id, interval, on_update);
                true
            }
        }
    }

    /// Stop polling. No callback fires once this returns, including for a
    /// fetch that was in flight. Idempotent, and safe to call from inside
    /// the update callback.
    pub fn stop(&self) {
        let cycle = self.inner.lock_state().cycle.take();
        if let Some(cycle) = cycle {
            cycle.cancel.cancel();
            cycle.gate.close();
            tracing::info!(device_id = %cycle.device_id, "Acquisition stopped");
        }
    }

    pub fn downgrade(&self) -> WeakAcquisitionLoop {
        WeakAcquisitionLoop {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Current connection status.
    pub fn status(&self) -> ConnectionStatus {
        self.inner.lock_state().status
    }

    /// The reading from the most recent successful fetch of the current
    /// cycle, if the latest outcome was a reading.
    pub fn latest_reading(&self) -> Option<SensorReading> {
        self.inner.lock_state().reading.clone()
    }

    /// Device currently being polled.
    pub fn device_id(&self) -> Option<DeviceId> {
        self.inner
            .lock_state()
            .cycle
            .as_ref()
            .map(|c| c.device_id.clone())
    }

    pub fn is_running(&self) -> bool {
        self.inner.lock_state().cycle.is_some()
    }

    // ---- private helpers ----

    fn launch(&self, device_id: DeviceId, interval: Duration, on_update: Arc<UpdateFn>) {
        let interval = if interval < MIN_POLL_INTERVAL {
            tracing::warn!(
                requested_ms = interval.as_millis() as u64,
                "Poll interval too short, clamping to {}ms",
                MIN_POLL_INTERVAL.as_millis(),
            );
            MIN_POLL_INTERVAL
        } else {
            interval
        };

        let id = NEXT_CYCLE_ID.fetch_add(1, Ordering::Relaxed);
        let cycle = Cycle {
            id,
            device_id,
            interval,
            on_update,
            gate: Arc::new(DeliveryGate::new(id)),
            cancel: self.inner.cancel.child_token(),
        };

        let previous = {
            let mut state = self.inner.lock_state();
            state.status = ConnectionStatus::Connecting;
            state.reading = None;
            state.cycle.replace(cycle.clone())
        };

        if let Some(previous) = previous {
            previous.cancel.cancel();
            previous.gate.close();
        }

        tracing::info!(
            device_id = %cycle.device_id,
            cycle = cycle.id,
            interval_ms = cycle.interval.as_millis() as u64,
            "Starting acquisition cycle",
        );

        tokio::spawn(run_cycle(
            Arc::downgrade(&self.inner),
            Arc::clone(&self.inner.source),
            cycle,
        ));
    }
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, LoopState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record an outcome and hand it to the callback, unless the cycle has
    /// been stopped or superseded. Returns `false` when the cycle is dead.
    fn deliver(
        &self,
        cycle: &Cycle,
        reading: Option<SensorReading>,
        status: ConnectionStatus,
    ) -> bool {
        let Some(_delivery) = cycle.gate.enter() else {
            return false;
        };

        {
            let mut state = self.lock_state();
            if state.cycle.as_ref().map(|c| c.id) != Some(cycle.id) {
                return false;
            }
            state.status = status;
            state.reading = reading.clone();
        }

        (cycle.on_update)(reading, status);
        true
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Body of a cycle task: announce, then tick, fetch, classify, deliver.
async fn run_cycle(inner: Weak<Inner>, source: Arc<dyn ReadingSource>, cycle: Cycle) {
    let announced = inner
        .upgrade()
        .is_some_and(|live| live.deliver(&cycle, None, ConnectionStatus::Connecting));
    if !announced {
        return;
    }

    let mut ticker = tokio::time::interval(cycle.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        let scheduled = tokio::select! {
            biased;
            _ = cycle.cancel.cancelled() => break,
            scheduled = ticker.tick() => scheduled,
        };

        let outcome = tokio::select! {
            biased;
            _ = cycle.cancel.cancelled() => break,
            outcome = source.fetch_latest(&cycle.device_id) => outcome,
        };

        // A tick that came due while the fetch was running is dropped,
        // not fired late.
        if Instant::now() >= scheduled + cycle.interval {
            tracing::debug!(
                device_id = %cycle.device_id,
                "Fetch overran the poll interval, skipping overlapped tick",
            );
            ticker.reset();
        }

        let (reading, status) = classify(&cycle.device_id, outcome);

        let Some(live) = inner.upgrade() else {
            break;
        };
        if !live.deliver(&cycle, reading, status) {
            break;
        }
    }

    tracing::debug!(device_id = %cycle.device_id, cycle = cycle.id, "Acquisition cycle exited");
}

/// Map a fetch outcome to what the caller sees. Failures are logged here
/// and never propagated.
pub fn classify(
    device_id: &str,
    outcome: Result<LatestReading, FetchError>,
) -> (Option<SensorReading>, ConnectionStatus) {
    match outcome {
        Ok(LatestReading::Reading(reading)) if reading.device_id == device_id => {
            tracing::debug!(device_id, "Reading received");
            (Some(reading), ConnectionStatus::Connected)
        }
        Ok(LatestReading::Reading(reading)) => {
            tracing::warn!(
                device_id,
                reading_device_id = %reading.device_id,
                "Discarding reading tagged for another device",
            );
            (None, ConnectionStatus::Error)
        }
        Ok(LatestReading::NoData(reason)) => {
            tracing::debug!(device_id, reason = %reason, "No data available");
            (None, ConnectionStatus::NoData)
        }
        Err(e) => {
            tracing::warn!(device_id, kind = e.kind(), error = %e, "Fetch failed");
            (None, ConnectionStatus::Error)
        }
    }
}

// ---------------------------------------------------------------------------
// Delivery gate
// ---------------------------------------------------------------------------

thread_local! {
    /// Id of the cycle whose callback is running on this thread (0 = none).
    static DELIVERING: Cell<u64> = const { Cell::new(0) };
}

/// Serializes callback delivery against [`DeliveryGate::close`], so that
/// once `close` returns no callback for the cycle is running or will run.
struct DeliveryGate {
    cycle_id: u64,
    open: AtomicBool,
    lock: Mutex<()>,
}

struct DeliveryGuard<'a> {
    _lock: MutexGuard<'a, ()>,
    previous: u64,
}

impl DeliveryGate {
    fn new(cycle_id: u64) -> Self {
        Self {
            cycle_id,
            open: AtomicBool::new(true),
            lock: Mutex::new(()),
        }
    }

    /// Hold the gate for one delivery, or `None` if it has been closed.
    fn enter(&self) -> Option<DeliveryGuard<'_>> {
        let lock = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        if !self.open.load(Ordering::Acquire) {
            return None;
        }
        let previous = DELIVERING.with(|d| d.replace(self.cycle_id));
        Some(DeliveryGuard {
            _lock: lock,
            previous,
        })
    }

    /// Close the gate and wait out a delivery running on another thread.
    /// From inside this cycle's own callback the lock is already ours, so
    /// waiting is skipped.
    fn close(&self) {
        self.open.store(false, Ordering::Release);
        if DELIVERING.with(Cell::get) != self.cycle_id {
            drop(self.lock.lock().unwrap_or_else(PoisonError::into_inner));
        }
    }
}

impl Drop for DeliveryGuard<'_> {
    fn drop(&mut self) {
        DELIVERING.with(|d| d.set(self.previous));
    }
}
