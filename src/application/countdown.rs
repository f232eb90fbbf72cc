use crate::application::block_list::{with_site_added, with_site_removed};
use crate::application::resume::{Reconciliation, ResumeKind, reconcile};
use crate::domain::models::{BlockedSite, TimerPhase, TimerRunState, TimerSettings};
use crate::domain::timer::{PhaseTransition, compute_next_phase, resolve_duration};
use crate::infrastructure::blocking::RuleSynchronizer;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::event_log::EventLog;
use crate::infrastructure::notifier::Notifier;
use crate::infrastructure::state_store::StateStore;
use crate::infrastructure::timer_repository::{
    SaveOutcome, load_blocked_sites, load_timer_state, replace_timer_state, save_blocked_sites,
    save_timer_state,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;

pub type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Side-effect ports the driver talks to. Each is chosen once, at composition time.
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn StateStore>,
    pub blocker: Arc<dyn RuleSynchronizer>,
    pub notifier: Arc<dyn Notifier>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Idle,
    Counting { remaining_seconds: u32 },
    Transitioned(PhaseTransition),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerSnapshot {
    pub state: TimerRunState,
    pub settings: TimerSettings,
    pub blocked_sites: Vec<BlockedSite>,
    pub blocking_active: bool,
    pub total_seconds: u32,
}

/// Owns the live timer state and drives every transition of it.
///
/// Each mutation is followed, in order, by a persistence attempt, any user
/// notification, and a blocking-rule sync. Only persistence of the block list is
/// allowed to fail the caller; the rest is logged and the countdown goes on.
pub struct CountdownDriver {
    settings: TimerSettings,
    state: TimerRunState,
    blocked_sites: Vec<BlockedSite>,
    collaborators: Collaborators,
    log: Arc<EventLog>,
    now_provider: NowProvider,
    applied_blocking: Option<bool>,
}

impl CountdownDriver {
    pub fn new(settings: TimerSettings, collaborators: Collaborators, log: Arc<EventLog>) -> Self {
        let now = Utc::now().timestamp_millis();
        Self {
            settings,
            state: TimerRunState::initial(&settings, now),
            blocked_sites: Vec::new(),
            collaborators,
            log,
            now_provider: Arc::new(Utc::now),
            applied_blocking: None,
        }
    }

    #[cfg(test)]
    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    #[cfg(test)]
    pub fn state(&self) -> &TimerRunState {
        &self.state
    }

    #[cfg(test)]
    pub fn settings(&self) -> &TimerSettings {
        &self.settings
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        let mut state = self.state.clone();
        if let Some(remaining) = state.remaining_at(self.now_millis()) {
            state.remaining_seconds = remaining;
        }
        TimerSnapshot {
            blocking_active: state.is_blocking(),
            total_seconds: resolve_duration(state.phase, &self.settings),
            state,
            settings: self.settings,
            blocked_sites: self.blocked_sites.clone(),
        }
    }

    /// Loads persisted state, reconciles it with the current time and pushes the
    /// blocking rules once regardless of what was applied before.
    pub async fn resume(&mut self) -> Reconciliation {
        let now = self.now_millis();
        let store = Arc::clone(&self.collaborators.store);

        let snapshot = match load_timer_state(store.as_ref()).await {
            Ok(snapshot) => snapshot,
            Err(error) => {
                self.log.warn(
                    "resume",
                    &format!("discarding unreadable timer state: {error}"),
                );
                None
            }
        };
        self.blocked_sites = match load_blocked_sites(store.as_ref()).await {
            Ok(sites) => sites,
            Err(error) => {
                self.log.warn(
                    "resume",
                    &format!("discarding unreadable block list: {error}"),
                );
                Vec::new()
            }
        };

        let reconciliation = reconcile(snapshot.clone(), &self.settings, now);
        self.state = reconciliation.state.clone();
        self.log.info(
            "resume",
            &format!(
                "{:?}: phase={} remaining={}s running={}",
                reconciliation.kind,
                self.state.phase.as_str(),
                self.state.remaining_seconds,
                self.state.is_running
            ),
        );

        let changed = snapshot.as_ref() != Some(&self.state);
        if reconciliation.repaired {
            self.rewrite("resume").await;
        } else if reconciliation.kind != ResumeKind::Resumed && changed {
            self.persist("resume").await;
        }
        if let Some(transition) = reconciliation.catch_up {
            self.announce(&transition);
        }
        self.sync_blocking(true).await;
        reconciliation
    }

    /// Advances the countdown by one tick.
    pub async fn tick(&mut self) -> TickOutcome {
        if !self.state.is_running {
            return TickOutcome::Idle;
        }
        if self.adopt_newer_snapshot().await && !self.state.is_running {
            return TickOutcome::Idle;
        }
        let now = self.now_millis();
        let remaining = self
            .state
            .remaining_at(now)
            .unwrap_or_else(|| self.state.remaining_seconds.saturating_sub(1));
        self.state.remaining_seconds = remaining;
        if remaining > 0 {
            return TickOutcome::Counting {
                remaining_seconds: remaining,
            };
        }
        TickOutcome::Transitioned(self.expire(now).await)
    }

    pub async fn start(&mut self) {
        self.adopt_newer_snapshot().await;
        if self.state.is_running {
            return;
        }
        let now = self.now_millis();
        self.state.start(&self.settings, now);
        self.log.info(
            "start",
            &format!(
                "started {} with {}s left",
                self.state.phase.as_str(),
                self.state.remaining_seconds
            ),
        );
        self.persist("start").await;
        self.sync_blocking(false).await;
    }

    pub async fn pause(&mut self) {
        self.adopt_newer_snapshot().await;
        if !self.state.is_running {
            return;
        }
        let now = self.now_millis();
        if self.state.remaining_at(now) == Some(0) {
            self.expire(now).await;
        }
        self.state.pause(now);
        self.log.info(
            "pause",
            &format!(
                "paused {} with {}s left",
                self.state.phase.as_str(),
                self.state.remaining_seconds
            ),
        );
        self.persist("pause").await;
        self.sync_blocking(false).await;
    }

    pub async fn toggle(&mut self) {
        self.adopt_newer_snapshot().await;
        if self.state.is_running {
            self.pause().await;
        } else {
            self.start().await;
        }
    }

    pub async fn reset(&mut self) {
        self.adopt_newer_snapshot().await;
        let now = self.now_millis();
        self.state.reset(&self.settings, now);
        self.log.info("reset", &format!("reset {}", self.state.phase.as_str()));
        self.persist("reset").await;
        self.sync_blocking(false).await;
    }

    pub async fn switch_phase(&mut self, phase: TimerPhase) {
        self.adopt_newer_snapshot().await;
        let now = self.now_millis();
        self.state.switch_to(phase, &self.settings, now);
        self.log.info("switch", &format!("switched to {}", phase.as_str()));
        self.persist("switch").await;
        self.sync_blocking(false).await;
    }

    /// Replaces the durations. A paused timer picks up the new length right away; a
    /// running one keeps its target until the phase ends.
    pub async fn update_settings(&mut self, settings: TimerSettings) -> Result<(), InfraError> {
        settings.validate().map_err(InfraError::InvalidConfig)?;
        self.adopt_newer_snapshot().await;
        self.settings = settings;
        if !self.state.is_running {
            self.state.remaining_seconds = resolve_duration(self.state.phase, &settings);
            self.state.last_updated_epoch_millis = self.now_millis();
            self.persist("settings").await;
        }
        Ok(())
    }

    pub async fn add_site(&mut self, input: &str) -> Result<BlockedSite, InfraError> {
        self.adopt_newer_snapshot().await;
        self.ensure_block_list_unlocked()?;
        let (updated, site) = with_site_added(&self.blocked_sites, input)?;
        if updated.len() != self.blocked_sites.len() {
            save_blocked_sites(self.collaborators.store.as_ref(), &updated).await?;
            self.blocked_sites = updated;
            self.log.info("sites", &format!("added {}", site.url));
        }
        Ok(site)
    }

    /// Returns false when no site has `site_id`.
    pub async fn remove_site(&mut self, site_id: &str) -> Result<bool, InfraError> {
        self.adopt_newer_snapshot().await;
        self.ensure_block_list_unlocked()?;
        let Some(updated) = with_site_removed(&self.blocked_sites, site_id) else {
            return Ok(false);
        };
        save_blocked_sites(self.collaborators.store.as_ref(), &updated).await?;
        self.blocked_sites = updated;
        self.log.info("sites", &format!("removed {site_id}"));
        Ok(true)
    }

    fn ensure_block_list_unlocked(&self) -> Result<(), InfraError> {
        if self.state.is_blocking() {
            return Err(InfraError::InvalidConfig(
                "block list cannot change during a running focus session".to_string(),
            ));
        }
        Ok(())
    }

    /// Takes over a snapshot that another process stored after our last change, so
    /// this process never overwrites a newer pause, reset or switch. Returns true
    /// when the live state was replaced.
    async fn adopt_newer_snapshot(&mut self) -> bool {
        let store = Arc::clone(&self.collaborators.store);
        let Ok(Some(stored)) = load_timer_state(store.as_ref()).await else {
            return false;
        };
        if stored.last_updated_epoch_millis <= self.state.last_updated_epoch_millis {
            return false;
        }
        if let Ok(sites) = load_blocked_sites(store.as_ref()).await {
            self.blocked_sites = sites;
        }

        let reconciliation = reconcile(Some(stored), &self.settings, self.now_millis());
        self.state = reconciliation.state;
        self.log.info(
            "adopt",
            &format!(
                "picked up newer timer state: phase={} remaining={}s running={}",
                self.state.phase.as_str(),
                self.state.remaining_seconds,
                self.state.is_running
            ),
        );
        if reconciliation.repaired {
            self.rewrite("adopt").await;
        } else if reconciliation.kind == ResumeKind::CaughtUp {
            self.persist("adopt").await;
        }
        if let Some(transition) = reconciliation.catch_up {
            self.announce(&transition);
        }
        self.sync_blocking(false).await;
        true
    }

    async fn expire(&mut self, now: i64) -> PhaseTransition {
        let transition = compute_next_phase(
            self.state.phase,
            self.state.completed_work_cycles,
            &self.settings,
        );
        self.state.apply_transition(&transition, &self.settings, now);
        self.log.info(
            "tick",
            &format!(
                "{} complete, continuing with {} (cycles={})",
                transition.from.as_str(),
                transition.next_phase.as_str(),
                transition.next_completed_work_cycles
            ),
        );
        self.persist("tick").await;
        self.announce(&transition);
        self.sync_blocking(false).await;
        transition
    }

    async fn persist(&self, command: &str) {
        match save_timer_state(self.collaborators.store.as_ref(), &self.state).await {
            Ok(SaveOutcome::Written) => {}
            Ok(SaveOutcome::SkippedStale) => {
                self.log
                    .warn(command, "stored timer state is newer; write skipped");
            }
            Err(error) => {
                self.log
                    .error(command, &format!("failed to persist timer state: {error}"));
            }
        }
    }

    async fn rewrite(&self, command: &str) {
        if let Err(error) = replace_timer_state(self.collaborators.store.as_ref(), &self.state).await {
            self.log
                .error(command, &format!("failed to rewrite timer state: {error}"));
        }
    }

    fn announce(&self, transition: &PhaseTransition) {
        let title = transition.notice.title();
        let body = transition
            .notice
            .body(&self.settings, transition.next_completed_work_cycles);
        if let Err(error) = self.collaborators.notifier.notify(title, &body) {
            self.log
                .warn("notify", &format!("notification not shown: {error}"));
        }
    }

    async fn sync_blocking(&mut self, force: bool) {
        let desired = self.state.is_blocking();
        if !force && self.applied_blocking == Some(desired) {
            return;
        }
        match self
            .collaborators
            .blocker
            .set_blocking(&self.blocked_sites, desired)
            .await
        {
            Ok(()) => {
                self.applied_blocking = Some(desired);
                self.log.info(
                    "blocking",
                    &format!(
                        "blocking {} for {} site(s)",
                        if desired { "enabled" } else { "disabled" },
                        self.blocked_sites.len()
                    ),
                );
            }
            Err(error) => {
                self.applied_blocking = None;
                self.log
                    .error("blocking", &format!("failed to apply rules: {error}"));
            }
        }
    }

    fn now_millis(&self) -> i64 {
        (self.now_provider)().timestamp_millis()
    }
}
