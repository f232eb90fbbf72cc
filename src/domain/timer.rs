use crate::domain::models::{TimerPhase, TimerRunState, TimerSettings};

const MILLIS_PER_SECOND: i64 = 1_000;

/// Full length of `phase` in seconds under `settings`.
pub fn resolve_duration(phase: TimerPhase, settings: &TimerSettings) -> u32 {
    let minutes = match phase {
        TimerPhase::Work => settings.work_minutes,
        TimerPhase::ShortBreak => settings.short_break_minutes,
        TimerPhase::LongBreak => settings.long_break_minutes,
    };
    minutes.saturating_mul(60)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionNotice {
    ShortBreak,
    LongBreakEarned,
    BreakOver,
}

impl TransitionNotice {
    pub fn title(self) -> &'static str {
        match self {
            Self::ShortBreak => "Focus session complete",
            Self::LongBreakEarned => "Long break earned",
            Self::BreakOver => "Break is over",
        }
    }

    pub fn body(self, settings: &TimerSettings, completed_work_cycles: u32) -> String {
        match self {
            Self::ShortBreak => format!(
                "Time for a {}-minute short break.",
                settings.short_break_minutes
            ),
            Self::LongBreakEarned => format!(
                "{} focus sessions done. Enjoy a {}-minute long break.",
                completed_work_cycles, settings.long_break_minutes
            ),
            Self::BreakOver => format!(
                "Back to a {}-minute focus session.",
                settings.work_minutes
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTransition {
    pub from: TimerPhase,
    pub next_phase: TimerPhase,
    pub next_completed_work_cycles: u32,
    pub notice: TransitionNotice,
}

/// Decides which phase follows `current` once it expires.
pub fn compute_next_phase(
    current: TimerPhase,
    completed_work_cycles: u32,
    settings: &TimerSettings,
) -> PhaseTransition {
    match current {
        TimerPhase::Work => {
            let next_cycles = completed_work_cycles.saturating_add(1);
            let interval = settings.long_break_interval.max(1);
            let (next_phase, notice) = if next_cycles % interval == 0 {
                (TimerPhase::LongBreak, TransitionNotice::LongBreakEarned)
            } else {
                (TimerPhase::ShortBreak, TransitionNotice::ShortBreak)
            };
            PhaseTransition {
                from: current,
                next_phase,
                next_completed_work_cycles: next_cycles,
                notice,
            }
        }
        TimerPhase::ShortBreak | TimerPhase::LongBreak => PhaseTransition {
            from: current,
            next_phase: TimerPhase::Work,
            next_completed_work_cycles: completed_work_cycles,
            notice: TransitionNotice::BreakOver,
        },
    }
}

/// Whole seconds left until `target_end_epoch_millis`, rounded up; zero once due.
pub fn remaining_seconds_until(target_end_epoch_millis: i64, now_epoch_millis: i64) -> u32 {
    let left_millis = target_end_epoch_millis.saturating_sub(now_epoch_millis);
    if left_millis <= 0 {
        return 0;
    }
    let seconds = (left_millis + MILLIS_PER_SECOND - 1) / MILLIS_PER_SECOND;
    u32::try_from(seconds).unwrap_or(u32::MAX)
}

pub fn format_clock(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

fn target_after(now_epoch_millis: i64, seconds: u32) -> i64 {
    now_epoch_millis.saturating_add(i64::from(seconds) * MILLIS_PER_SECOND)
}

impl TimerRunState {
    /// Fresh paused Work phase with its full duration.
    pub fn initial(settings: &TimerSettings, now_epoch_millis: i64) -> Self {
        Self {
            phase: TimerPhase::Work,
            remaining_seconds: resolve_duration(TimerPhase::Work, settings),
            is_running: false,
            target_end_epoch_millis: None,
            completed_work_cycles: 0,
            last_updated_epoch_millis: now_epoch_millis,
        }
    }

    /// Projected seconds left at `now`; `None` when no target is known.
    pub fn remaining_at(&self, now_epoch_millis: i64) -> Option<u32> {
        self.target_end_epoch_millis
            .map(|target| remaining_seconds_until(target, now_epoch_millis))
    }

    pub fn start(&mut self, settings: &TimerSettings, now_epoch_millis: i64) {
        if self.is_running {
            return;
        }
        if self.remaining_seconds == 0 {
            self.remaining_seconds = resolve_duration(self.phase, settings);
        }
        self.is_running = true;
        self.target_end_epoch_millis = Some(target_after(now_epoch_millis, self.remaining_seconds));
        self.last_updated_epoch_millis = now_epoch_millis;
    }

    pub fn pause(&mut self, now_epoch_millis: i64) {
        if let Some(remaining) = self.remaining_at(now_epoch_millis) {
            self.remaining_seconds = remaining;
        }
        self.is_running = false;
        self.target_end_epoch_millis = None;
        self.last_updated_epoch_millis = now_epoch_millis;
    }

    pub fn reset(&mut self, settings: &TimerSettings, now_epoch_millis: i64) {
        self.is_running = false;
        self.target_end_epoch_millis = None;
        self.remaining_seconds = resolve_duration(self.phase, settings);
        self.last_updated_epoch_millis = now_epoch_millis;
    }

    pub fn switch_to(&mut self, phase: TimerPhase, settings: &TimerSettings, now_epoch_millis: i64) {
        self.phase = phase;
        self.reset(settings, now_epoch_millis);
    }

    /// Starts the phase chosen by `transition` immediately; the timer never stops
    /// itself at a phase boundary.
    pub fn apply_transition(
        &mut self,
        transition: &PhaseTransition,
        settings: &TimerSettings,
        now_epoch_millis: i64,
    ) {
        self.phase = transition.next_phase;
        self.completed_work_cycles = transition.next_completed_work_cycles;
        self.remaining_seconds = resolve_duration(transition.next_phase, settings);
        self.is_running = true;
        self.target_end_epoch_millis = Some(target_after(now_epoch_millis, self.remaining_seconds));
        self.last_updated_epoch_millis = now_epoch_millis;
    }
}
