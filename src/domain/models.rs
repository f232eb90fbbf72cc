use serde::{Deserialize, Serialize};

pub const DEFAULT_WORK_MINUTES: u32 = 25;
pub const DEFAULT_SHORT_BREAK_MINUTES: u32 = 5;
pub const DEFAULT_LONG_BREAK_MINUTES: u32 = 15;
pub const DEFAULT_LONG_BREAK_INTERVAL: u32 = 4;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimerPhase {
    Work,
    ShortBreak,
    LongBreak,
}

impl TimerPhase {
    #[cfg(test)]
    pub const ALL: [TimerPhase; 3] = [Self::Work, Self::ShortBreak, Self::LongBreak];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Work => "WORK",
            Self::ShortBreak => "SHORT_BREAK",
            Self::LongBreak => "LONG_BREAK",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Work => "Work",
            Self::ShortBreak => "Short Break",
            Self::LongBreak => "Long Break",
        }
    }

    pub fn is_break(self) -> bool {
        !matches!(self, Self::Work)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimerSettings {
    pub work_minutes: u32,
    pub short_break_minutes: u32,
    pub long_break_minutes: u32,
    /// Number of completed work phases between long breaks.
    pub long_break_interval: u32,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            work_minutes: DEFAULT_WORK_MINUTES,
            short_break_minutes: DEFAULT_SHORT_BREAK_MINUTES,
            long_break_minutes: DEFAULT_LONG_BREAK_MINUTES,
            long_break_interval: DEFAULT_LONG_BREAK_INTERVAL,
        }
    }
}

impl TimerSettings {
    pub fn validate(&self) -> Result<(), String> {
        validate_positive(self.work_minutes, "settings.workMinutes")?;
        validate_positive(self.short_break_minutes, "settings.shortBreakMinutes")?;
        validate_positive(self.long_break_minutes, "settings.longBreakMinutes")?;
        validate_positive(self.long_break_interval, "settings.longBreakInterval")?;
        Ok(())
    }
}

/// Persisted and live countdown state.
///
/// While `is_running` is false, `remaining_seconds` is authoritative. While it is
/// true, `remaining_seconds` is a cached projection of `target_end_epoch_millis`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimerRunState {
    #[serde(rename = "mode")]
    pub phase: TimerPhase,
    #[serde(rename = "timeLeft")]
    pub remaining_seconds: u32,
    #[serde(rename = "isRunning")]
    pub is_running: bool,
    #[serde(rename = "targetEndTime")]
    pub target_end_epoch_millis: Option<i64>,
    #[serde(rename = "completedCycles")]
    pub completed_work_cycles: u32,
    #[serde(rename = "lastUpdated")]
    pub last_updated_epoch_millis: i64,
}

impl TimerRunState {
    pub fn validate(&self) -> Result<(), String> {
        if self.is_running != self.target_end_epoch_millis.is_some() {
            return Err(
                "timer.targetEndTime must be set exactly when timer.isRunning is true".to_string(),
            );
        }
        if self.last_updated_epoch_millis < 0 {
            return Err("timer.lastUpdated must be >= 0".to_string());
        }
        Ok(())
    }

    /// Whether distraction blocking should currently be enforced.
    pub fn is_blocking(&self) -> bool {
        self.is_running && self.phase == TimerPhase::Work
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlockedSite {
    pub id: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,
}

impl BlockedSite {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "site.id")?;
        validate_non_empty(&self.url, "site.url")?;
        if self.url != self.url.to_ascii_lowercase() {
            return Err("site.url must be lowercase".to_string());
        }
        if self.url.contains("://") || self.url.starts_with("www.") {
            return Err("site.url must be a bare hostname".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TipKind {
    Motivation,
    Strategy,
    Scolding,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FocusTip {
    pub text: String,
    #[serde(rename = "type")]
    pub kind: TipKind,
}

fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field_name} must not be empty"));
    }
    Ok(())
}

fn validate_positive(value: u32, field_name: &str) -> Result<(), String> {
    if value == 0 {
        return Err(format!("{field_name} must be > 0"));
    }
    Ok(())
}
