use crate::application::bootstrap::bootstrap_workspace;
use crate::application::capabilities::Capabilities;
use crate::application::countdown::{CountdownDriver, TimerSnapshot};
use crate::application::scheduler::TimerService;
use crate::domain::models::{BlockedSite, FocusTip, TimerPhase, TimerSettings};
use crate::domain::timer::format_clock;
use crate::infrastructure::config::{load_host_config, read_timer_settings, save_timer_settings};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::event_log::EventLog;
use crate::infrastructure::tip_generator::TipGenerator;
use chrono::DateTime;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostMode {
    /// Workspace-backed state, configured blocking and desktop notifications.
    Persistent,
    /// Nothing is read from or written to disk.
    LocalOnly,
}

pub struct AppState {
    config_dir: Option<PathBuf>,
    timer: TimerService,
    tips: Arc<dyn TipGenerator>,
    command_log: EventLog,
}

impl AppState {
    /// Composes the capability set for `mode`, then resumes the timer from whatever
    /// state was last persisted.
    pub async fn open(workspace_root: PathBuf, mode: HostMode) -> Result<Self, InfraError> {
        let (config_dir, capabilities, settings, command_log, timer_log) = match mode {
            HostMode::Persistent => {
                let bootstrap = bootstrap_workspace(&workspace_root)?;
                let host = load_host_config(&bootstrap.config_dir)?;
                let settings = read_timer_settings(&bootstrap.config_dir)?;
                let timer_log = Arc::new(EventLog::new(bootstrap.logs_dir.join("timer.log")));
                let capabilities = Capabilities::persistent(
                    &bootstrap.database_path,
                    &bootstrap.state_dir,
                    &host,
                    Arc::clone(&timer_log),
                );
                (
                    Some(bootstrap.config_dir),
                    capabilities,
                    settings,
                    EventLog::new(bootstrap.logs_dir.join("commands.log")),
                    timer_log,
                )
            }
            HostMode::LocalOnly => {
                let timer_log = Arc::new(EventLog::disabled());
                (
                    None,
                    Capabilities::local_only(Arc::clone(&timer_log)),
                    TimerSettings::default(),
                    EventLog::disabled(),
                    timer_log,
                )
            }
        };

        let driver = CountdownDriver::new(settings, capabilities.collaborators(), timer_log);
        let timer = TimerService::new(driver);
        let resumed = timer.resume().await;
        command_log.info(
            "open",
            &format!("{:?} {}", resumed.kind, resumed.state.phase.as_str()),
        );

        Ok(Self {
            config_dir,
            timer,
            tips: capabilities.tips,
            command_log,
        })
    }

    pub fn config_dir(&self) -> Option<&Path> {
        self.config_dir.as_deref()
    }

    pub fn timer(&self) -> &TimerService {
        &self.timer
    }

    pub fn command_error(&self, command: &str, error: &InfraError) -> String {
        self.log_error(command, &error.to_string());
        error.to_string()
    }

    pub fn log_info(&self, command: &str, message: &str) {
        self.command_log.info(command, message);
    }

    pub fn log_error(&self, command: &str, message: &str) {
        self.command_log.error(command, message);
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TimerStateResponse {
    pub phase: TimerPhase,
    pub phase_label: String,
    pub display: String,
    pub remaining_seconds: u32,
    pub total_seconds: u32,
    /// Fraction of the current phase already elapsed, in `0.0..=1.0`.
    pub progress: f64,
    pub is_running: bool,
    pub target_end_time: Option<String>,
    pub completed_cycles: u32,
    pub blocking_active: bool,
    pub blocked_site_count: usize,
    pub settings: TimerSettings,
}

impl From<TimerSnapshot> for TimerStateResponse {
    fn from(snapshot: TimerSnapshot) -> Self {
        let state = snapshot.state;
        let progress = if snapshot.total_seconds == 0 {
            0.0
        } else {
            let elapsed = snapshot.total_seconds.saturating_sub(state.remaining_seconds);
            f64::from(elapsed) / f64::from(snapshot.total_seconds)
        };
        Self {
            phase: state.phase,
            phase_label: state.phase.label().to_string(),
            display: format_clock(state.remaining_seconds),
            remaining_seconds: state.remaining_seconds,
            total_seconds: snapshot.total_seconds,
            progress,
            is_running: state.is_running,
            target_end_time: state
                .target_end_epoch_millis
                .and_then(DateTime::from_timestamp_millis)
                .map(|target| target.to_rfc3339()),
            completed_cycles: state.completed_work_cycles,
            blocking_active: snapshot.blocking_active,
            blocked_site_count: snapshot.blocked_sites.len(),
            settings: snapshot.settings,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TipResponse {
    pub tip: Option<FocusTip>,
}

fn parse_phase(raw: &str) -> Result<TimerPhase, InfraError> {
    let normalized = raw.trim().to_ascii_lowercase().replace(['-', ' '], "_");
    match normalized.as_str() {
        "work" | "focus" => Ok(TimerPhase::Work),
        "short_break" => Ok(TimerPhase::ShortBreak),
        "long_break" => Ok(TimerPhase::LongBreak),
        _ => Err(InfraError::InvalidConfig(format!(
            "unknown phase '{}' (expected work, short-break or long-break)",
            raw.trim()
        ))),
    }
}

pub async fn get_timer_state_impl(state: &AppState) -> Result<TimerStateResponse, InfraError> {
    let snapshot = state.timer().snapshot().await;
    state.log_info(
        "get_timer_state",
        &format!(
            "phase={} running={}",
            snapshot.state.phase.as_str(),
            snapshot.state.is_running
        ),
    );
    Ok(snapshot.into())
}

pub async fn start_timer_impl(state: &AppState) -> Result<TimerStateResponse, InfraError> {
    let snapshot = state.timer().start().await;
    state.log_info(
        "start_timer",
        &format!(
            "phase={} target_end={:?}",
            snapshot.state.phase.as_str(),
            snapshot.state.target_end_epoch_millis
        ),
    );
    Ok(snapshot.into())
}

pub async fn pause_timer_impl(state: &AppState) -> Result<TimerStateResponse, InfraError> {
    let snapshot = state.timer().pause().await;
    state.log_info(
        "pause_timer",
        &format!(
            "phase={} remaining={}s",
            snapshot.state.phase.as_str(),
            snapshot.state.remaining_seconds
        ),
    );
    Ok(snapshot.into())
}

pub async fn toggle_timer_impl(state: &AppState) -> Result<TimerStateResponse, InfraError> {
    let snapshot = state.timer().toggle().await;
    state.log_info(
        "toggle_timer",
        &format!("running={}", snapshot.state.is_running),
    );
    Ok(snapshot.into())
}

pub async fn reset_timer_impl(state: &AppState) -> Result<TimerStateResponse, InfraError> {
    let snapshot = state.timer().reset().await;
    state.log_info("reset_timer", &format!("phase={}", snapshot.state.phase.as_str()));
    Ok(snapshot.into())
}

pub async fn switch_phase_impl(
    state: &AppState,
    phase: String,
) -> Result<TimerStateResponse, InfraError> {
    let phase = parse_phase(&phase)?;
    let snapshot = state.timer().switch_phase(phase).await;
    state.log_info("switch_phase", &format!("phase={}", phase.as_str()));
    Ok(snapshot.into())
}

/// Merges the given durations into the current settings. Persistent hosts write the
/// result to `timer.json` before the running timer sees it.
pub async fn update_settings_impl(
    state: &AppState,
    work_minutes: Option<u32>,
    short_break_minutes: Option<u32>,
    long_break_minutes: Option<u32>,
    long_break_interval: Option<u32>,
) -> Result<TimerStateResponse, InfraError> {
    let current = state.timer().snapshot().await.settings;
    let merged = TimerSettings {
        work_minutes: work_minutes.unwrap_or(current.work_minutes),
        short_break_minutes: short_break_minutes.unwrap_or(current.short_break_minutes),
        long_break_minutes: long_break_minutes.unwrap_or(current.long_break_minutes),
        long_break_interval: long_break_interval.unwrap_or(current.long_break_interval),
    };
    merged.validate().map_err(InfraError::InvalidConfig)?;

    if let Some(config_dir) = state.config_dir() {
        save_timer_settings(config_dir, &merged)?;
    }
    let snapshot = state.timer().update_settings(merged).await?;
    state.log_info(
        "update_settings",
        &format!(
            "work={} short_break={} long_break={} interval={}",
            merged.work_minutes,
            merged.short_break_minutes,
            merged.long_break_minutes,
            merged.long_break_interval
        ),
    );
    Ok(snapshot.into())
}

pub async fn list_sites_impl(state: &AppState) -> Result<Vec<BlockedSite>, InfraError> {
    let sites = state.timer().snapshot().await.blocked_sites;
    state.log_info("list_sites", &format!("count={}", sites.len()));
    Ok(sites)
}

pub async fn add_site_impl(state: &AppState, url: String) -> Result<BlockedSite, InfraError> {
    let site = state.timer().add_site(&url).await?;
    state.log_info("add_site", &format!("id={} url={}", site.id, site.url));
    Ok(site)
}

pub async fn remove_site_impl(state: &AppState, site_id: String) -> Result<bool, InfraError> {
    let removed = state.timer().remove_site(&site_id).await?;
    state.log_info(
        "remove_site",
        &format!("id={} removed={removed}", site_id.trim()),
    );
    Ok(removed)
}

/// A failing tip source yields no tip rather than an error.
pub async fn get_focus_tip_impl(state: &AppState) -> Result<TipResponse, InfraError> {
    let snapshot = state.timer().snapshot().await;
    match state
        .tips
        .get_tip(&snapshot.blocked_sites, snapshot.state.phase)
        .await
    {
        Ok(tip) => {
            state.log_info("get_focus_tip", &format!("kind={:?}", tip.kind));
            Ok(TipResponse { tip: Some(tip) })
        }
        Err(error) => {
            state.log_error("get_focus_tip", &error.to_string());
            Ok(TipResponse { tip: None })
        }
    }
}
