//! User-visible notifications.
//!
//! Every [`PaperManager`](crate::manager::PaperManager) action ends in
//! exactly one [`Notification`]. The CLI prints it on stderr (human or JSON
//! lines) and exits non-zero when its level is [`Level::Error`].

use std::io::Write;
use std::sync::Mutex;

use serde::Serialize;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Success,
    Error,
    Info,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: Level,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: Level::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: Level::Error,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: Level::Info,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == Level::Error
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &Notification);
}

/// "ok: ...", "error: ...", "info: ..." on stderr.
pub struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn notify(&self, n: &Notification) {
        let tag = match n.level {
            Level::Success => "ok",
            Level::Error => "error",
            Level::Info => "info",
        };
        let _ = writeln!(std::io::stderr().lock(), "{}: {}", tag, n.message);
    }
}

/// One JSON object per notification on stderr.
pub struct JsonNotifier;

impl Notifier for JsonNotifier {
    fn notify(&self, n: &Notification) {
        let obj = serde_json::json!({
            "event": "notification",
            "level": n.level,
            "message": n.message,
        });
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
        }
    }
}

/// Collects notifications in memory; used by tests.
#[derive(Default)]
pub struct RecordingNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn notifications(&self) -> Vec<Notification> {
        self.seen.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<Notification> {
        self.seen.lock().unwrap().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, n: &Notification) {
        self.seen.lock().unwrap().push(n.clone());
    }
}

impl<T: Notifier + ?Sized> Notifier for std::sync::Arc<T> {
    fn notify(&self, n: &Notification) {
        (**self).notify(n)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum NotifyMode {
    Human,
    Json,
}

impl NotifyMode {
    pub fn notifier(&self) -> Box<dyn Notifier> {
        match self {
            NotifyMode::Human => Box::new(StderrNotifier),
            NotifyMode::Json => Box::new(JsonNotifier),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_serializes_lowercase() {
        let json = serde_json::to_string(&Notification::error("boom")).unwrap();
        assert_eq!(json, r#"{"level":"error","message":"boom"}"#);
        assert!(Notification::error("x").is_error());
        assert!(!Notification::info("x").is_error());
    }

    #[test]
    fn recording_notifier_through_arc() {
        let rec = std::sync::Arc::new(RecordingNotifier::default());
        let boxed: Box<dyn Notifier> = Box::new(rec.clone());
        boxed.notify(&Notification::success("done"));
        assert_eq!(rec.len(), 1);
        assert_eq!(rec.last().unwrap().message, "done");
    }
}
