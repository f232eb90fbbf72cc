use crate::domain::models::{BlockedSite, TimerRunState};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::state_store::StateStore;

pub const TIMER_STATE_KEY: &str = "timerState";
pub const BLOCKED_SITES_KEY: &str = "blockedSites";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Written,
    /// The stored snapshot is newer; the write was dropped.
    SkippedStale,
}

/// Reads the persisted timer snapshot. Malformed JSON is reported as an error so
/// the caller can log it and fall back to defaults.
pub async fn load_timer_state(store: &dyn StateStore) -> Result<Option<TimerRunState>, InfraError> {
    let Some(raw) = store.get(TIMER_STATE_KEY).await? else {
        return Ok(None);
    };
    let state = serde_json::from_str::<TimerRunState>(&raw)?;
    Ok(Some(state))
}

/// Last-write-wins save: a stored snapshot with a later `lastUpdated` is kept.
pub async fn save_timer_state(
    store: &dyn StateStore,
    state: &TimerRunState,
) -> Result<SaveOutcome, InfraError> {
    state.validate().map_err(InfraError::InvalidConfig)?;
    if let Some(raw) = store.get(TIMER_STATE_KEY).await? {
        if let Ok(stored) = serde_json::from_str::<TimerRunState>(&raw) {
            if stored.last_updated_epoch_millis > state.last_updated_epoch_millis {
                return Ok(SaveOutcome::SkippedStale);
            }
        }
    }
    write_timer_state(store, state).await?;
    Ok(SaveOutcome::Written)
}

/// Overwrites the stored snapshot regardless of its `lastUpdated`. Used when
/// resume repaired the stored value itself.
pub async fn replace_timer_state(
    store: &dyn StateStore,
    state: &TimerRunState,
) -> Result<(), InfraError> {
    state.validate().map_err(InfraError::InvalidConfig)?;
    write_timer_state(store, state).await
}

async fn write_timer_state(store: &dyn StateStore, state: &TimerRunState) -> Result<(), InfraError> {
    let payload = serde_json::to_string(state)?;
    store.set(TIMER_STATE_KEY, &payload).await
}

/// Reads the block list, dropping entries that fail validation.
pub async fn load_blocked_sites(store: &dyn StateStore) -> Result<Vec<BlockedSite>, InfraError> {
    let Some(raw) = store.get(BLOCKED_SITES_KEY).await? else {
        return Ok(Vec::new());
    };
    let sites = serde_json::from_str::<Vec<BlockedSite>>(&raw)?;
    Ok(sites
        .into_iter()
        .filter(|site| site.validate().is_ok())
        .collect())
}

pub async fn save_blocked_sites(
    store: &dyn StateStore,
    sites: &[BlockedSite],
) -> Result<(), InfraError> {
    let payload = serde_json::to_string(sites)?;
    store.set(BLOCKED_SITES_KEY, &payload).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::TimerPhase;
    use crate::infrastructure::state_store::InMemoryStateStore;

    fn state_at(last_updated: i64) -> TimerRunState {
        TimerRunState {
            phase: TimerPhase::Work,
            remaining_seconds: 1_500,
            is_running: false,
            target_end_epoch_millis: None,
            completed_work_cycles: 2,
            last_updated_epoch_millis: last_updated,
        }
    }

    #[tokio::test]
    async fn missing_timer_state_loads_as_none() {
        let store = InMemoryStateStore::default();
        assert_eq!(load_timer_state(&store).await.expect("load"), None);
    }

    #[tokio::test]
    async fn malformed_timer_state_is_an_error() {
        let store = InMemoryStateStore::default();
        store
            .set(TIMER_STATE_KEY, "{\"mode\":\"WORK\"}")
            .await
            .expect("seed malformed state");
        assert!(matches!(
            load_timer_state(&store).await,
            Err(InfraError::Json(_))
        ));
    }

    #[tokio::test]
    async fn older_snapshot_does_not_overwrite_newer_one() {
        let store = InMemoryStateStore::default();
        let newer = state_at(2_000);
        let older = TimerRunState {
            completed_work_cycles: 9,
            ..state_at(1_000)
        };

        assert_eq!(
            save_timer_state(&store, &newer).await.expect("save newer"),
            SaveOutcome::Written
        );
        assert_eq!(
            save_timer_state(&store, &older).await.expect("save older"),
            SaveOutcome::SkippedStale
        );
        assert_eq!(load_timer_state(&store).await.expect("load"), Some(newer));
    }

    #[tokio::test]
    async fn replace_overwrites_a_future_stamped_snapshot() {
        let store = InMemoryStateStore::default();
        let future = state_at(9_000_000);
        save_timer_state(&store, &future).await.expect("seed future state");

        let repaired = state_at(5_000);
        assert_eq!(
            save_timer_state(&store, &repaired).await.expect("save"),
            SaveOutcome::SkippedStale
        );
        replace_timer_state(&store, &repaired).await.expect("replace");
        assert_eq!(load_timer_state(&store).await.expect("load"), Some(repaired));
    }

    #[tokio::test]
    async fn running_state_without_target_is_refused() {
        let store = InMemoryStateStore::default();
        let broken = TimerRunState {
            is_running: true,
            ..state_at(1_000)
        };
        assert!(matches!(
            save_timer_state(&store, &broken).await,
            Err(InfraError::InvalidConfig(_))
        ));
        assert_eq!(load_timer_state(&store).await.expect("load"), None);
    }

    #[tokio::test]
    async fn blocked_sites_keep_order_and_drop_invalid_entries() {
        let store = InMemoryStateStore::default();
        store
            .set(
                BLOCKED_SITES_KEY,
                r#"[{"id":"1","url":"reddit.com"},{"id":"2","url":""},{"id":"3","url":"youtube.com"}]"#,
            )
            .await
            .expect("seed sites");

        let sites = load_blocked_sites(&store).await.expect("load sites");
        let urls = sites.iter().map(|site| site.url.as_str()).collect::<Vec<_>>();
        assert_eq!(urls, vec!["reddit.com", "youtube.com"]);

        save_blocked_sites(&store, &sites[..1]).await.expect("save sites");
        let reloaded = load_blocked_sites(&store).await.expect("reload sites");
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded[0].id, "1");
    }
}
