use crate::application::countdown::Collaborators;
use crate::infrastructure::blocking::{
    HostsFileSynchronizer, NoopRuleSynchronizer, RuleFileSynchronizer, RuleSynchronizer,
};
use crate::infrastructure::config::{BlockingBackend, HostConfig, NotifierBackend};
use crate::infrastructure::event_log::EventLog;
use crate::infrastructure::notifier::{DesktopNotifier, LogNotifier, Notifier};
use crate::infrastructure::state_store::{InMemoryStateStore, SqliteStateStore, StateStore};
use crate::infrastructure::tip_generator::{CannedTipGenerator, TipGenerator};
use std::path::Path;
use std::sync::Arc;

const RULES_FILE_NAME: &str = "blocking_rules.json";

/// The set of side-effect implementations the host runs with. Chosen once at startup.
#[derive(Clone)]
pub struct Capabilities {
    pub store: Arc<dyn StateStore>,
    pub blocker: Arc<dyn RuleSynchronizer>,
    pub notifier: Arc<dyn Notifier>,
    pub tips: Arc<dyn TipGenerator>,
}

impl Capabilities {
    /// SQLite-backed state with the configured blocking and notification backends.
    /// The `log` notifier writes to `timer_log`.
    pub fn persistent(
        database_path: &Path,
        state_dir: &Path,
        host: &HostConfig,
        timer_log: Arc<EventLog>,
    ) -> Self {
        let blocker: Arc<dyn RuleSynchronizer> = match host.blocking_backend {
            BlockingBackend::RulesFile => {
                Arc::new(RuleFileSynchronizer::new(state_dir.join(RULES_FILE_NAME)))
            }
            BlockingBackend::Hosts => Arc::new(HostsFileSynchronizer::new(&host.hosts_path)),
            BlockingBackend::Disabled => Arc::new(NoopRuleSynchronizer),
        };
        let notifier: Arc<dyn Notifier> = match host.notifier {
            NotifierBackend::Desktop => Arc::new(DesktopNotifier::new(host.app_name.clone())),
            NotifierBackend::Log => Arc::new(LogNotifier::new(timer_log)),
        };
        Self {
            store: Arc::new(SqliteStateStore::new(database_path)),
            blocker,
            notifier,
            tips: Arc::new(CannedTipGenerator::default()),
        }
    }

    /// In-memory state and no system side effects; nothing outlives the process.
    pub fn local_only(timer_log: Arc<EventLog>) -> Self {
        Self {
            store: Arc::new(InMemoryStateStore::default()),
            blocker: Arc::new(NoopRuleSynchronizer),
            notifier: Arc::new(LogNotifier::new(timer_log)),
            tips: Arc::new(CannedTipGenerator::default()),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            store: Arc::clone(&self.store),
            blocker: Arc::clone(&self.blocker),
            notifier: Arc::clone(&self.notifier),
        }
    }
}
