use crate::application::countdown::{CountdownDriver, TimerSnapshot};
use crate::application::resume::Reconciliation;
use crate::domain::models::{BlockedSite, TimerPhase, TimerSettings};
use crate::infrastructure::error::InfraError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

const DEFAULT_TICK_PERIOD: Duration = Duration::from_secs(1);

/// Periodic tick task. Dropping the handle cancels the task.
#[derive(Debug)]
pub struct TickHandle {
    task: JoinHandle<()>,
}

impl TickHandle {
    pub fn spawn(driver: Arc<Mutex<CountdownDriver>>, period: Duration) -> Self {
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let mut driver = driver.lock().await;
                if !driver.is_running() {
                    break;
                }
                driver.tick().await;
            }
        });
        Self { task }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for TickHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Serializes commands and ticks through one driver lock and keeps a tick task armed
/// exactly while the timer is running.
pub struct TimerService {
    driver: Arc<Mutex<CountdownDriver>>,
    ticker: std::sync::Mutex<Option<TickHandle>>,
    tick_period: Duration,
}

impl TimerService {
    pub fn new(driver: CountdownDriver) -> Self {
        Self {
            driver: Arc::new(Mutex::new(driver)),
            ticker: std::sync::Mutex::new(None),
            tick_period: DEFAULT_TICK_PERIOD,
        }
    }

    #[cfg(test)]
    pub fn is_armed(&self) -> bool {
        self.ticker
            .lock()
            .map(|ticker| ticker.as_ref().is_some_and(|handle| !handle.is_finished()))
            .unwrap_or(false)
    }

    pub async fn resume(&self) -> Reconciliation {
        let reconciliation = self.driver.lock().await.resume().await;
        self.sync_ticker().await;
        reconciliation
    }

    pub async fn snapshot(&self) -> TimerSnapshot {
        self.driver.lock().await.snapshot()
    }

    pub async fn start(&self) -> TimerSnapshot {
        let snapshot = {
            let mut driver = self.driver.lock().await;
            driver.start().await;
            driver.snapshot()
        };
        self.sync_ticker().await;
        snapshot
    }

    pub async fn pause(&self) -> TimerSnapshot {
        let snapshot = {
            let mut driver = self.driver.lock().await;
            driver.pause().await;
            driver.snapshot()
        };
        self.sync_ticker().await;
        snapshot
    }

    pub async fn toggle(&self) -> TimerSnapshot {
        let snapshot = {
            let mut driver = self.driver.lock().await;
            driver.toggle().await;
            driver.snapshot()
        };
        self.sync_ticker().await;
        snapshot
    }

    pub async fn reset(&self) -> TimerSnapshot {
        let snapshot = {
            let mut driver = self.driver.lock().await;
            driver.reset().await;
            driver.snapshot()
        };
        self.sync_ticker().await;
        snapshot
    }

    pub async fn switch_phase(&self, phase: TimerPhase) -> TimerSnapshot {
        let snapshot = {
            let mut driver = self.driver.lock().await;
            driver.switch_phase(phase).await;
            driver.snapshot()
        };
        self.sync_ticker().await;
        snapshot
    }

    pub async fn update_settings(&self, settings: TimerSettings) -> Result<TimerSnapshot, InfraError> {
        let mut driver = self.driver.lock().await;
        driver.update_settings(settings).await?;
        Ok(driver.snapshot())
    }

    pub async fn add_site(&self, input: &str) -> Result<BlockedSite, InfraError> {
        self.driver.lock().await.add_site(input).await
    }

    pub async fn remove_site(&self, site_id: &str) -> Result<bool, InfraError> {
        self.driver.lock().await.remove_site(site_id).await
    }

    async fn sync_ticker(&self) {
        let running = self.driver.lock().await.is_running();
        let Ok(mut ticker) = self.ticker.lock() else {
            return;
        };
        if !running {
            *ticker = None;
            return;
        }
        if ticker.as_ref().is_none_or(TickHandle::is_finished) {
            *ticker = Some(TickHandle::spawn(
                Arc::clone(&self.driver),
                self.tick_period,
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::countdown::{Collaborators, NowProvider};
    use crate::infrastructure::blocking::RecordingRuleSynchronizer;
    use crate::infrastructure::event_log::EventLog;
    use crate::infrastructure::notifier::RecordingNotifier;
    use crate::infrastructure::state_store::InMemoryStateStore;
    use chrono::DateTime;

    const NOW: i64 = 1_771_200_000_000;

    fn tokio_clock() -> NowProvider {
        let origin = Instant::now();
        Arc::new(move || {
            let elapsed = i64::try_from(origin.elapsed().as_millis()).unwrap_or(i64::MAX);
            DateTime::from_timestamp_millis(NOW + elapsed).unwrap_or_default()
        })
    }

    fn service(settings: TimerSettings, notifier: Arc<RecordingNotifier>) -> TimerService {
        let collaborators = Collaborators {
            store: Arc::new(InMemoryStateStore::default()),
            blocker: Arc::new(RecordingRuleSynchronizer::default()),
            notifier,
        };
        let driver = CountdownDriver::new(settings, collaborators, Arc::new(EventLog::disabled()))
            .with_now_provider(tokio_clock());
        TimerService::new(driver)
    }

    #[tokio::test(start_paused = true)]
    async fn armed_ticker_carries_the_timer_across_a_phase_boundary() {
        let notifier = Arc::new(RecordingNotifier::default());
        let settings = TimerSettings {
            work_minutes: 1,
            ..TimerSettings::default()
        };
        let service = service(settings, Arc::clone(&notifier));
        service.resume().await;
        assert!(!service.is_armed());

        let started = service.start().await;
        assert!(started.state.is_running);
        assert!(service.is_armed());

        tokio::time::sleep(Duration::from_secs(61)).await;

        let snapshot = service.snapshot().await;
        assert_eq!(snapshot.state.phase, TimerPhase::ShortBreak);
        assert!(snapshot.state.is_running);
        assert_eq!(snapshot.state.completed_work_cycles, 1);
        assert_eq!(notifier.sent().len(), 1);
        assert!(service.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn pausing_disarms_and_freezes_remaining_time() {
        let service = service(TimerSettings::default(), Arc::new(RecordingNotifier::default()));
        service.resume().await;
        service.start().await;

        tokio::time::sleep(Duration::from_secs(10)).await;
        let paused = service.pause().await;
        assert!(!service.is_armed());
        assert_eq!(paused.state.remaining_seconds, 1_490);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(service.snapshot().await.state.remaining_seconds, 1_490);

        service.toggle().await;
        assert!(service.is_armed());
        service.reset().await;
        assert!(!service.is_armed());
    }
}
