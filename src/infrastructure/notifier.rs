use crate::infrastructure::error::InfraError;
use crate::infrastructure::event_log::EventLog;
use notify_rust::Notification;
use std::sync::Arc;

/// Fire-and-forget user notification.
pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, body: &str) -> Result<(), InfraError>;
}

#[derive(Debug, Clone)]
pub struct DesktopNotifier {
    app_name: String,
}

impl DesktopNotifier {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
        }
    }
}

impl Notifier for DesktopNotifier {
    fn notify(&self, title: &str, body: &str) -> Result<(), InfraError> {
        Notification::new()
            .appname(&self.app_name)
            .summary(title)
            .body(body)
            .show()
            .map(|_| ())
            .map_err(|error| InfraError::Notification(error.to_string()))
    }
}

/// Writes each notification to an event log instead of the desktop.
#[derive(Debug, Clone)]
pub struct LogNotifier {
    log: Arc<EventLog>,
}

impl LogNotifier {
    pub fn new(log: Arc<EventLog>) -> Self {
        Self { log }
    }
}

impl Notifier for LogNotifier {
    fn notify(&self, title: &str, body: &str) -> Result<(), InfraError> {
        self.log.info("notify", &format!("{title}: {body}"));
        Ok(())
    }
}

#[cfg(test)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentNotification {
    pub title: String,
    pub body: String,
}

#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: std::sync::Mutex<Vec<SentNotification>>,
}

#[cfg(test)]
impl RecordingNotifier {
    pub fn sent(&self) -> Vec<SentNotification> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
impl Notifier for RecordingNotifier {
    fn notify(&self, title: &str, body: &str) -> Result<(), InfraError> {
        let mut sent = self
            .sent
            .lock()
            .map_err(|error| InfraError::Notification(format!("recording lock poisoned: {error}")))?;
        sent.push(SentNotification {
            title: title.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}
