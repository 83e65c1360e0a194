//! Bulk ingestion progress reporting.
//!
//! Reports observable progress during `papers ingest` so users see how many
//! archive members have been uploaded and how many are left. Progress is
//! emitted on **stderr** so stdout remains parseable for scripts.

use std::io::Write;
use std::sync::Mutex;

/// A single progress event for an ingestion run.
#[derive(Clone, Debug, PartialEq)]
pub enum IngestProgressEvent {
    /// Archive decoded and filtered; `total` members will be uploaded.
    Started { total: u64 },
    /// One member finished (successfully or not).
    Advanced {
        processed: u64,
        total: u64,
        percent: u8,
        name: String,
        ok: bool,
    },
}

/// `round(100 * processed / total)`, 0 for an empty run.
pub fn percent(processed: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    ((processed as f64 * 100.0) / total as f64).round().min(100.0) as u8
}

/// Reports ingestion progress. Implementations write to stderr (human or JSON).
pub trait IngestProgressReporter: Send + Sync {
    /// Emit a progress event. Called from the ingest pipeline.
    fn report(&self, event: IngestProgressEvent);
}

/// Human-friendly progress on stderr: "ingest  2 / 3 files  67%  ok2.pdf".
pub struct StderrProgress;

impl IngestProgressReporter for StderrProgress {
    fn report(&self, event: IngestProgressEvent) {
        let line = match &event {
            IngestProgressEvent::Started { total } => {
                format!("ingest  uploading {} files\n", format_number(*total))
            }
            IngestProgressEvent::Advanced {
                processed,
                total,
                percent,
                name,
                ok,
            } => format!(
                "ingest  {} / {} files  {:>3}%  {}{}\n",
                format_number(*processed),
                format_number(*total),
                percent,
                name,
                if *ok { "" } else { "  (failed)" }
            ),
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl IngestProgressReporter for JsonProgress {
    fn report(&self, event: IngestProgressEvent) {
        let obj = match &event {
            IngestProgressEvent::Started { total } => serde_json::json!({
                "event": "progress",
                "phase": "started",
                "total": total
            }),
            IngestProgressEvent::Advanced {
                processed,
                total,
                percent,
                name,
                ok,
            } => serde_json::json!({
                "event": "progress",
                "phase": "uploading",
                "n": processed,
                "total": total,
                "percent": percent,
                "file": name,
                "ok": ok
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl IngestProgressReporter for NoProgress {
    fn report(&self, _event: IngestProgressEvent) {}
}

/// Keeps every event; used by tests.
#[derive(Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<IngestProgressEvent>>,
}

impl RecordingProgress {
    pub fn events(&self) -> Vec<IngestProgressEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Percentages reported so far, in order.
    pub fn percents(&self) -> Vec<u8> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                IngestProgressEvent::Advanced { percent, .. } => Some(percent),
                IngestProgressEvent::Started { .. } => None,
            })
            .collect()
    }
}

impl IngestProgressReporter for RecordingProgress {
    fn report(&self, event: IngestProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    /// Build a reporter for this mode.
    pub fn reporter(&self) -> Box<dyn IngestProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_number_comma() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }

    #[test]
    fn percent_rounds() {
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(3, 3), 100);
        assert_eq!(percent(0, 0), 0);
    }

    #[test]
    fn recording_keeps_order() {
        let rec = RecordingProgress::default();
        rec.report(IngestProgressEvent::Started { total: 2 });
        for (i, name) in ["a.pdf", "b.pdf"].iter().enumerate() {
            let processed = i as u64 + 1;
            rec.report(IngestProgressEvent::Advanced {
                processed,
                total: 2,
                percent: percent(processed, 2),
                name: name.to_string(),
                ok: true,
            });
        }
        assert_eq!(rec.percents(), vec![50, 100]);
        assert_eq!(rec.events().len(), 3);
    }
}
