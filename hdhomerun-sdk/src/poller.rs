//! Periodic device refresh
//!
//! Each device gets one tokio task per [`Schedule`]. A task refreshes the
//! device, sleeps for the schedule's interval and repeats until it is shut
//! down. The blocking device I/O runs on tokio's blocking pool.
//!
//! A failed refresh marks the device unavailable and is retried on the next
//! tick; the next successful refresh marks it available again.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use hdhomerun_state::{DeviceId, Property, StateError, StateStore};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::config::PollerConfig;
use crate::device::HdHomeRunDevice;
use crate::{Result, SdkError};

/// What a polling task refreshes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Schedule {
    /// Names, firmware, lineup
    Details,
    TunerStatus,
    /// Only does work while a channel scan runs
    ScanProgress,
}

impl Schedule {
    pub const ALL: [Schedule; 3] = [Schedule::Details, Schedule::TunerStatus, Schedule::ScanProgress];

    pub fn interval(&self, config: &PollerConfig) -> Duration {
        match self {
            Schedule::Details => config.details_interval,
            Schedule::TunerStatus => config.tuner_interval,
            Schedule::ScanProgress => config.scan_progress_interval,
        }
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Schedule::Details => "details",
            Schedule::TunerStatus => "tuner status",
            Schedule::ScanProgress => "scan progress",
        })
    }
}

/// A device the poller can refresh
///
/// Implementations block; the poller calls them from the blocking pool.
pub trait DevicePoller: Send + Sync + 'static {
    fn device_id(&self) -> DeviceId;

    /// Refresh one schedule's worth of state, returning what changed
    ///
    /// `Ok(None)` means the device was not contacted, which says nothing
    /// about its availability.
    fn refresh(&self, schedule: Schedule) -> Result<Option<Vec<Property>>>;
}

impl DevicePoller for HdHomeRunDevice {
    fn device_id(&self) -> DeviceId {
        self.id
    }

    fn refresh(&self, schedule: Schedule) -> Result<Option<Vec<Property>>> {
        match schedule {
            Schedule::Details => self.gather_details().map(Some),
            Schedule::TunerStatus => self.refresh_tuner_status().map(Some),
            Schedule::ScanProgress if !self.scan_running()? => Ok(None),
            Schedule::ScanProgress => self.refresh_scan_progress().map(Some),
        }
    }
}

/// Refresh once and record the device's availability
///
/// A refresh that did not contact the device leaves availability alone.
pub fn poll_once(
    target: &dyn DevicePoller,
    store: &StateStore,
    schedule: Schedule,
) -> Result<Vec<Property>> {
    let id = target.device_id();
    match target.refresh(schedule) {
        Ok(None) => Ok(Vec::new()),
        Ok(Some(mut changed)) => {
            changed.extend(store.set_available(&id, true)?);
            Ok(changed)
        }
        Err(e) => {
            tracing::warn!("Refreshing {} of {} failed: {}", schedule, id, e);
            store.set_available(&id, false)?;
            Err(e)
        }
    }
}

fn is_device_gone(error: &SdkError) -> bool {
    matches!(error, SdkError::StateError(StateError::DeviceNotFound(_)))
}

/// A single polling task
#[derive(Debug)]
pub struct PollingTask {
    device_id: DeviceId,
    schedule: Schedule,
    interval: Duration,
    task_handle: JoinHandle<()>,
    shutdown_signal: Arc<AtomicBool>,
    started_at: SystemTime,
    /// Consecutive failures
    error_count: Arc<AtomicU32>,
    poll_count: Arc<AtomicU64>,
}

impl PollingTask {
    /// Spawn the polling loop on `runtime`
    pub fn start(
        runtime: &Handle,
        target: Arc<dyn DevicePoller>,
        store: StateStore,
        schedule: Schedule,
        interval: Duration,
    ) -> Self {
        let device_id = target.device_id();
        let shutdown_signal = Arc::new(AtomicBool::new(false));
        let error_count = Arc::new(AtomicU32::new(0));
        let poll_count = Arc::new(AtomicU64::new(0));

        let task_handle = runtime.spawn(Self::polling_loop(
            target,
            store,
            schedule,
            interval,
            Arc::clone(&shutdown_signal),
            Arc::clone(&error_count),
            Arc::clone(&poll_count),
        ));

        Self {
            device_id,
            schedule,
            interval,
            task_handle,
            shutdown_signal,
            started_at: SystemTime::now(),
            error_count,
            poll_count,
        }
    }

    async fn polling_loop(
        target: Arc<dyn DevicePoller>,
        store: StateStore,
        schedule: Schedule,
        interval: Duration,
        shutdown_signal: Arc<AtomicBool>,
        error_count: Arc<AtomicU32>,
        poll_count: Arc<AtomicU64>,
    ) {
        let id = target.device_id();
        tracing::debug!("Starting {} polling for {} (interval: {:?})", schedule, id, interval);

        loop {
            if shutdown_signal.load(Ordering::Relaxed) {
                break;
            }

            let poller = Arc::clone(&target);
            let task_store = store.clone();
            let result = tokio::task::spawn_blocking(move || {
                poll_once(poller.as_ref(), &task_store, schedule)
            })
            .await;
            poll_count.fetch_add(1, Ordering::Relaxed);

            match result {
                Ok(Ok(_)) => error_count.store(0, Ordering::Relaxed),
                Ok(Err(e)) if is_device_gone(&e) => {
                    tracing::debug!("{} is no longer tracked", id);
                    break;
                }
                Ok(Err(_)) => {
                    error_count.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    tracing::error!("{} polling task for {} panicked: {}", schedule, id, e);
                    error_count.fetch_add(1, Ordering::Relaxed);
                }
            }

            if shutdown_signal.load(Ordering::Relaxed) {
                break;
            }
            tokio::time::sleep(interval).await;
        }

        tracing::debug!("{} polling ended for {}", schedule, id);
    }

    pub fn device_id(&self) -> DeviceId {
        self.device_id
    }

    pub fn schedule(&self) -> Schedule {
        self.schedule
    }

    pub fn is_running(&self) -> bool {
        !self.task_handle.is_finished()
    }

    pub fn stats(&self) -> PollingTaskStats {
        PollingTaskStats {
            device_id: self.device_id,
            schedule: self.schedule,
            interval: self.interval,
            started_at: self.started_at,
            error_count: self.error_count.load(Ordering::Relaxed),
            poll_count: self.poll_count.load(Ordering::Relaxed),
            is_running: self.is_running(),
        }
    }

    /// Stop the loop; a refresh already on the blocking pool runs to completion
    pub fn shutdown(self) {
        self.shutdown_signal.store(true, Ordering::Relaxed);
        self.task_handle.abort();
    }
}

/// Statistics for a polling task
#[derive(Debug, Clone)]
pub struct PollingTaskStats {
    pub device_id: DeviceId,
    pub schedule: Schedule,
    pub interval: Duration,
    pub started_at: SystemTime,
    pub error_count: u32,
    pub poll_count: u64,
    pub is_running: bool,
}

/// Manages the polling tasks of every device
pub struct Poller {
    config: PollerConfig,
    store: StateStore,
    tasks: Mutex<HashMap<(DeviceId, Schedule), PollingTask>>,
}

impl Poller {
    pub fn new(store: StateStore, config: PollerConfig) -> Self {
        Self {
            config,
            store,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// Start every schedule for `target`, replacing tasks already running for it
    pub fn start_device(&self, runtime: &Handle, target: Arc<dyn DevicePoller>) {
        let id = target.device_id();
        let mut tasks = self.tasks.lock();
        for schedule in Schedule::ALL {
            let task = PollingTask::start(
                runtime,
                Arc::clone(&target),
                self.store.clone(),
                schedule,
                schedule.interval(&self.config),
            );
            if let Some(previous) = tasks.insert((id, schedule), task) {
                previous.shutdown();
            }
        }
    }

    pub fn stop_device(&self, id: &DeviceId) {
        let mut tasks = self.tasks.lock();
        let keys: Vec<_> = tasks.keys().filter(|(device, _)| device == id).copied().collect();
        for key in keys {
            if let Some(task) = tasks.remove(&key) {
                task.shutdown();
            }
        }
    }

    pub fn stop_all(&self) {
        let tasks: Vec<_> = self.tasks.lock().drain().map(|(_, task)| task).collect();
        if !tasks.is_empty() {
            tracing::debug!("Stopping {} polling task(s)", tasks.len());
        }
        for task in tasks {
            task.shutdown();
        }
    }

    pub fn is_running(&self) -> bool {
        self.tasks.lock().values().any(PollingTask::is_running)
    }

    pub fn task_count(&self) -> usize {
        self.tasks.lock().len()
    }

    pub fn stats(&self) -> Vec<PollingTaskStats> {
        self.tasks.lock().values().map(PollingTask::stats).collect()
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop_all();
    }
}
