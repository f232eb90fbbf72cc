use crate::domain::models::{TimerRunState, TimerSettings};
use crate::domain::timer::{PhaseTransition, compute_next_phase, remaining_seconds_until};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeKind {
    /// No usable snapshot; a paused Work phase was created.
    Fresh,
    /// The running phase still had time left and continues in place.
    Resumed,
    /// The running phase ended while the process was away.
    CaughtUp,
    /// A paused snapshot was restored as-is.
    RestoredPaused,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub kind: ResumeKind,
    pub state: TimerRunState,
    pub catch_up: Option<PhaseTransition>,
    /// The snapshot was inconsistent or stamped in the future and must be rewritten.
    pub repaired: bool,
}

/// Turns the last persisted snapshot into the live state at `now_epoch_millis`.
///
/// A running phase that expired while inactive produces exactly one transition,
/// however many phases' worth of time went by; the next phase starts now with its
/// full duration. A `lastUpdated` later than now is pulled back to now.
pub fn reconcile(
    snapshot: Option<TimerRunState>,
    settings: &TimerSettings,
    now_epoch_millis: i64,
) -> Reconciliation {
    let Some(mut snapshot) = snapshot else {
        return Reconciliation {
            kind: ResumeKind::Fresh,
            state: TimerRunState::initial(settings, now_epoch_millis),
            catch_up: None,
            repaired: false,
        };
    };

    let mut repaired = false;
    if snapshot.last_updated_epoch_millis > now_epoch_millis {
        snapshot.last_updated_epoch_millis = now_epoch_millis;
        repaired = true;
    }

    match snapshot.target_end_epoch_millis {
        Some(target) if snapshot.is_running => {
            let remaining = remaining_seconds_until(target, now_epoch_millis);
            if remaining > 0 {
                return Reconciliation {
                    kind: ResumeKind::Resumed,
                    state: TimerRunState {
                        remaining_seconds: remaining,
                        ..snapshot
                    },
                    catch_up: None,
                    repaired,
                };
            }

            let transition = compute_next_phase(
                snapshot.phase,
                snapshot.completed_work_cycles,
                settings,
            );
            let mut state = snapshot;
            state.apply_transition(&transition, settings, now_epoch_millis);
            Reconciliation {
                kind: ResumeKind::CaughtUp,
                state,
                catch_up: Some(transition),
                repaired,
            }
        }
        _ => {
            let inconsistent = snapshot.is_running || snapshot.target_end_epoch_millis.is_some();
            Reconciliation {
                kind: ResumeKind::RestoredPaused,
                state: TimerRunState {
                    is_running: false,
                    target_end_epoch_millis: None,
                    ..snapshot
                },
                catch_up: None,
                repaired: repaired || inconsistent,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::TimerPhase;
    use crate::domain::timer::resolve_duration;
    use proptest::prelude::*;

    const NOW: i64 = 1_771_200_000_000;

    fn settings() -> TimerSettings {
        TimerSettings::default()
    }

    fn running_work(target: i64, cycles: u32) -> TimerRunState {
        TimerRunState {
            phase: TimerPhase::Work,
            remaining_seconds: 1_500,
            is_running: true,
            target_end_epoch_millis: Some(target),
            completed_work_cycles: cycles,
            last_updated_epoch_millis: target - 1_500_000,
        }
    }

    #[test]
    fn missing_snapshot_starts_paused_work() {
        let result = reconcile(None, &settings(), NOW);
        assert_eq!(result.kind, ResumeKind::Fresh);
        assert_eq!(result.state.phase, TimerPhase::Work);
        assert_eq!(result.state.remaining_seconds, 1_500);
        assert!(!result.state.is_running);
        assert_eq!(result.state.target_end_epoch_millis, None);
        assert_eq!(result.state.completed_work_cycles, 0);
    }

    #[test]
    fn running_snapshot_with_time_left_resumes_in_place() {
        let snapshot = running_work(NOW + 90_500, 2);
        let result = reconcile(Some(snapshot.clone()), &settings(), NOW);

        assert_eq!(result.kind, ResumeKind::Resumed);
        assert_eq!(result.state.remaining_seconds, 91);
        assert_eq!(result.state.target_end_epoch_millis, snapshot.target_end_epoch_millis);
        assert_eq!(result.state.completed_work_cycles, 2);
        assert!(result.catch_up.is_none());
    }

    #[test]
    fn long_absence_performs_a_single_catch_up_transition() {
        let snapshot = running_work(NOW - 10_000_000, 0);
        let result = reconcile(Some(snapshot), &settings(), NOW);

        assert_eq!(result.kind, ResumeKind::CaughtUp);
        let transition = result.catch_up.expect("catch-up transition");
        assert_eq!(transition.next_phase, TimerPhase::ShortBreak);
        assert_eq!(result.state.phase, TimerPhase::ShortBreak);
        assert_eq!(result.state.completed_work_cycles, 1);
        assert!(result.state.is_running);
        assert_eq!(result.state.remaining_seconds, 300);
        assert_eq!(result.state.target_end_epoch_millis, Some(NOW + 300_000));
        assert_eq!(result.state.last_updated_epoch_millis, NOW);
    }

    #[test]
    fn paused_snapshot_is_restored_verbatim() {
        let snapshot = TimerRunState {
            phase: TimerPhase::LongBreak,
            remaining_seconds: 412,
            is_running: false,
            target_end_epoch_millis: None,
            completed_work_cycles: 4,
            last_updated_epoch_millis: NOW - 86_400_000,
        };
        let result = reconcile(Some(snapshot.clone()), &settings(), NOW);
        assert_eq!(result.kind, ResumeKind::RestoredPaused);
        assert!(!result.repaired);
        assert_eq!(result.state, snapshot);
    }

    #[test]
    fn future_stamped_snapshot_is_pulled_back_to_now() {
        let snapshot = TimerRunState {
            phase: TimerPhase::Work,
            remaining_seconds: 600,
            is_running: false,
            target_end_epoch_millis: None,
            completed_work_cycles: 1,
            last_updated_epoch_millis: NOW + 3_600_000,
        };
        let result = reconcile(Some(snapshot), &settings(), NOW);
        assert_eq!(result.kind, ResumeKind::RestoredPaused);
        assert!(result.repaired);
        assert_eq!(result.state.last_updated_epoch_millis, NOW);
        assert_eq!(result.state.remaining_seconds, 600);

        let running = TimerRunState {
            last_updated_epoch_millis: NOW + 60_000,
            ..running_work(NOW + 90_000, 0)
        };
        let result = reconcile(Some(running), &settings(), NOW);
        assert_eq!(result.kind, ResumeKind::Resumed);
        assert!(result.repaired);
        assert_eq!(result.state.last_updated_epoch_millis, NOW);
    }

    #[test]
    fn running_snapshot_without_target_is_restored_paused() {
        let snapshot = TimerRunState {
            target_end_epoch_millis: None,
            remaining_seconds: 700,
            ..running_work(NOW, 1)
        };
        let result = reconcile(Some(snapshot), &settings(), NOW);
        assert_eq!(result.kind, ResumeKind::RestoredPaused);
        assert!(result.repaired);
        assert!(!result.state.is_running);
        assert_eq!(result.state.remaining_seconds, 700);
    }

    fn arb_snapshot() -> impl Strategy<Value = Option<TimerRunState>> {
        prop::option::of(
            (
                0usize..3,
                0u32..5_000,
                any::<bool>(),
                -20_000_000i64..20_000_000,
                0u32..50,
                -5_000_000i64..5_000_000,
            )
                .prop_map(|(phase_index, remaining, is_running, offset, cycles, stamp)| TimerRunState {
                    phase: TimerPhase::ALL[phase_index],
                    remaining_seconds: remaining,
                    is_running,
                    target_end_epoch_millis: is_running.then_some(NOW + offset),
                    completed_work_cycles: cycles,
                    last_updated_epoch_millis: NOW + stamp,
                }),
        )
    }

    proptest! {
        #[test]
        fn reconciling_twice_at_the_same_instant_is_stable(snapshot in arb_snapshot()) {
            let first = reconcile(snapshot, &settings(), NOW);
            let second = reconcile(Some(first.state.clone()), &settings(), NOW);
            prop_assert_eq!(&second.state, &first.state);
            prop_assert!(second.catch_up.is_none());
            prop_assert!(!second.repaired);
        }
    }

    proptest! {
        #[test]
        fn reconciled_state_satisfies_running_invariant(snapshot in arb_snapshot()) {
            let result = reconcile(snapshot, &settings(), NOW);
            prop_assert!(result.state.validate().is_ok());
            prop_assert!(result.state.last_updated_epoch_millis <= NOW);
            if result.kind == ResumeKind::CaughtUp {
                prop_assert_eq!(
                    result.state.remaining_seconds,
                    resolve_duration(result.state.phase, &settings())
                );
            }
        }
    }
}
