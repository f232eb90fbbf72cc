use crate::domain::models::BlockedSite;
use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const HOSTS_SECTION_BEGIN: &str = "# >>> tomato-focus blocked sites >>>";
const HOSTS_SECTION_END: &str = "# <<< tomato-focus blocked sites <<<";
const SINKHOLE_ADDRESS: &str = "0.0.0.0";

/// Applies the distraction-blocking rule set. Every call replaces whatever the
/// previous call installed.
#[async_trait]
pub trait RuleSynchronizer: Send + Sync {
    async fn set_blocking(&self, sites: &[BlockedSite], enabled: bool) -> Result<(), InfraError>;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuleAction {
    #[serde(rename = "type")]
    pub action_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RuleCondition {
    pub url_filter: String,
    pub resource_types: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlockingRule {
    pub id: u32,
    pub priority: u32,
    pub action: RuleAction,
    pub condition: RuleCondition,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuleSetFile {
    pub schema: u8,
    pub enabled: bool,
    pub rules: Vec<BlockingRule>,
}

/// Rule ids start at 1 and follow block-list order.
pub fn build_blocking_rules(sites: &[BlockedSite]) -> Vec<BlockingRule> {
    sites
        .iter()
        .enumerate()
        .map(|(index, site)| BlockingRule {
            id: index as u32 + 1,
            priority: 1,
            action: RuleAction {
                action_type: "block".to_string(),
            },
            condition: RuleCondition {
                url_filter: site.url.clone(),
                resource_types: vec!["main_frame".to_string()],
            },
        })
        .collect()
}

fn write_atomically(path: &Path, contents: &str) -> Result<(), InfraError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, contents)?;
    fs::rename(&temp_path, path)?;
    Ok(())
}

/// Writes a declarative rule set that a browser extension can load verbatim.
#[derive(Debug, Clone)]
pub struct RuleFileSynchronizer {
    path: PathBuf,
}

impl RuleFileSynchronizer {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    #[cfg(test)]
    pub fn read_rule_set(&self) -> Result<Option<RuleSetFile>, InfraError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&raw)?))
    }
}

#[async_trait]
impl RuleSynchronizer for RuleFileSynchronizer {
    async fn set_blocking(&self, sites: &[BlockedSite], enabled: bool) -> Result<(), InfraError> {
        let active = enabled && !sites.is_empty();
        let rule_set = RuleSetFile {
            schema: 1,
            enabled: active,
            rules: if active {
                build_blocking_rules(sites)
            } else {
                Vec::new()
            },
        };
        let formatted = serde_json::to_string_pretty(&rule_set)?;
        write_atomically(&self.path, &format!("{formatted}\n"))
            .map_err(|error| InfraError::Blocking(format!("{}: {error}", self.path.display())))
    }
}

/// Maintains a marker-delimited section of a hosts file that sinkholes blocked hosts.
#[derive(Debug, Clone)]
pub struct HostsFileSynchronizer {
    path: PathBuf,
}

impl HostsFileSynchronizer {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

fn strip_managed_section(contents: &str) -> Vec<&str> {
    let mut kept = Vec::new();
    let mut inside = false;
    for line in contents.lines() {
        match line.trim() {
            HOSTS_SECTION_BEGIN => inside = true,
            HOSTS_SECTION_END => inside = false,
            _ if !inside => kept.push(line),
            _ => {}
        }
    }
    while kept.last().is_some_and(|line| line.trim().is_empty()) {
        kept.pop();
    }
    kept
}

pub fn render_hosts_file(existing: &str, sites: &[BlockedSite], enabled: bool) -> String {
    let mut lines = strip_managed_section(existing)
        .into_iter()
        .map(ToOwned::to_owned)
        .collect::<Vec<_>>();

    if enabled && !sites.is_empty() {
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.push(HOSTS_SECTION_BEGIN.to_string());
        for site in sites {
            lines.push(format!("{SINKHOLE_ADDRESS} {}", site.url));
            lines.push(format!("{SINKHOLE_ADDRESS} www.{}", site.url));
        }
        lines.push(HOSTS_SECTION_END.to_string());
    }

    let mut rendered = lines.join("\n");
    if !rendered.is_empty() {
        rendered.push('\n');
    }
    rendered
}

#[async_trait]
impl RuleSynchronizer for HostsFileSynchronizer {
    async fn set_blocking(&self, sites: &[BlockedSite], enabled: bool) -> Result<(), InfraError> {
        let existing = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(error) => {
                return Err(InfraError::Blocking(format!(
                    "{}: {error}",
                    self.path.display()
                )));
            }
        };
        let rendered = render_hosts_file(&existing, sites, enabled);
        if rendered == existing {
            return Ok(());
        }
        fs::write(&self.path, rendered)
            .map_err(|error| InfraError::Blocking(format!("{}: {error}", self.path.display())))
    }
}

/// Accepts every call and changes nothing; used when blocking is turned off.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRuleSynchronizer;

#[async_trait]
impl RuleSynchronizer for NoopRuleSynchronizer {
    async fn set_blocking(&self, _sites: &[BlockedSite], _enabled: bool) -> Result<(), InfraError> {
        Ok(())
    }
}

#[cfg(test)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockingCall {
    pub urls: Vec<String>,
    pub enabled: bool,
}

/// Keeps every call in memory instead of touching the system.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingRuleSynchronizer {
    calls: std::sync::Mutex<Vec<BlockingCall>>,
}

#[cfg(test)]
impl RecordingRuleSynchronizer {
    pub fn calls(&self) -> Vec<BlockingCall> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    pub fn last_call(&self) -> Option<BlockingCall> {
        self.calls().pop()
    }
}

#[cfg(test)]
#[async_trait]
impl RuleSynchronizer for RecordingRuleSynchronizer {
    async fn set_blocking(&self, sites: &[BlockedSite], enabled: bool) -> Result<(), InfraError> {
        let mut calls = self
            .calls
            .lock()
            .map_err(|error| InfraError::Blocking(format!("recording lock poisoned: {error}")))?;
        calls.push(BlockingCall {
            urls: sites.iter().map(|site| site.url.clone()).collect(),
            enabled,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site(id: &str, url: &str) -> BlockedSite {
        BlockedSite {
            id: id.to_string(),
            url: url.to_string(),
            favicon: None,
        }
    }

    fn temp_path(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "tomato-focus-blocking-{}-{}",
            name,
            std::process::id()
        ));
        let _ = fs::remove_file(&path);
        path
    }

    #[test]
    fn rules_follow_block_list_order() {
        let rules = build_blocking_rules(&[site("a", "reddit.com"), site("b", "youtube.com")]);
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].id, 1);
        assert_eq!(rules[0].condition.url_filter, "reddit.com");
        assert_eq!(rules[1].id, 2);
        assert_eq!(rules[1].action.action_type, "block");

        let value = serde_json::to_value(&rules[0]).expect("serialize rule");
        assert_eq!(value["condition"]["urlFilter"], "reddit.com");
        assert_eq!(value["condition"]["resourceTypes"][0], "main_frame");
    }

    #[tokio::test]
    async fn rule_file_is_cleared_when_disabled_or_empty() {
        let path = temp_path("rules.json");
        let synchronizer = RuleFileSynchronizer::new(&path);
        let sites = vec![site("a", "example.com")];

        synchronizer.set_blocking(&sites, true).await.expect("enable");
        let enabled = synchronizer.read_rule_set().expect("read").expect("file exists");
        assert!(enabled.enabled);
        assert_eq!(enabled.rules.len(), 1);

        synchronizer.set_blocking(&sites, false).await.expect("disable");
        let disabled = synchronizer.read_rule_set().expect("read").expect("file exists");
        assert!(!disabled.enabled);
        assert!(disabled.rules.is_empty());

        synchronizer.set_blocking(&[], true).await.expect("enable empty");
        let empty = synchronizer.read_rule_set().expect("read").expect("file exists");
        assert!(empty.rules.is_empty());
        let _ = fs::remove_file(path);
    }

    #[test]
    fn hosts_section_is_replaced_and_foreign_lines_survive() {
        let existing = "127.0.0.1 localhost\n";
        let sites = vec![site("a", "reddit.com")];

        let enabled = render_hosts_file(existing, &sites, true);
        assert!(enabled.starts_with("127.0.0.1 localhost\n"));
        assert!(enabled.contains("0.0.0.0 reddit.com\n"));
        assert!(enabled.contains("0.0.0.0 www.reddit.com\n"));

        let again = render_hosts_file(&enabled, &sites, true);
        assert_eq!(again, enabled);

        let cleared = render_hosts_file(&enabled, &sites, false);
        assert_eq!(cleared, existing);
    }

    #[tokio::test]
    async fn hosts_synchronizer_creates_missing_file() {
        let path = temp_path("hosts");
        let synchronizer = HostsFileSynchronizer::new(&path);
        synchronizer
            .set_blocking(&[site("a", "news.ycombinator.com")], true)
            .await
            .expect("enable");
        let contents = fs::read_to_string(&path).expect("read hosts");
        assert!(contents.contains("0.0.0.0 news.ycombinator.com"));

        synchronizer.set_blocking(&[], false).await.expect("clear");
        assert_eq!(fs::read_to_string(&path).expect("read hosts"), "");
        let _ = fs::remove_file(path);
    }

    #[tokio::test]
    async fn recording_synchronizer_keeps_call_history() {
        let synchronizer = RecordingRuleSynchronizer::default();
        synchronizer
            .set_blocking(&[site("a", "example.com")], true)
            .await
            .expect("record");
        synchronizer.set_blocking(&[], false).await.expect("record");

        let calls = synchronizer.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].urls, vec!["example.com".to_string()]);
        assert!(calls[0].enabled);
        assert_eq!(synchronizer.last_call().map(|call| call.enabled), Some(false));
    }

    #[tokio::test]
    async fn noop_synchronizer_accepts_any_rule_set() {
        let synchronizer = NoopRuleSynchronizer;
        let sites = vec![site("a", "reddit.com")];
        for _ in 0..3 {
            synchronizer.set_blocking(&sites, true).await.expect("enable");
            synchronizer.set_blocking(&sites, false).await.expect("disable");
        }
    }
}
