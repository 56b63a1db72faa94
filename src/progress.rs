//! Grouping progress reporting.
//!
//! Reports what a grouping run is doing (extracting, vectorizing, copying)
//! so users can follow long runs over large folders. Progress is emitted on
//! **stderr** so stdout stays parseable for scripts.
//!
//! In JSON mode every stderr line is a JSON object, including panics caught
//! while parsing untrusted documents; see [`ProgressMode::install_panic_hook`].

use std::io::Write;

/// A single progress event for a grouping run.
#[derive(Clone, Debug, PartialEq)]
pub enum GroupProgressEvent {
    /// Files found directly in the source folder.
    Listed { files: u64 },
    /// Extraction phase: n files processed out of total.
    Extracting { n: u64, total: u64 },
    /// A file produced no text and will only be copied to `ungrouped`.
    ExtractionSkipped { file: String, reason: String },
    /// TF-IDF fitted over the retained documents.
    Vectorized { documents: u64, terms: u64 },
    /// A group folder was created and filled.
    GroupCreated { group: String, files: u64 },
    /// Leftover files were copied to `ungrouped`.
    UngroupedCopied { files: u64 },
}

/// Reports grouping progress. Implementations write to stderr (human or JSON).
pub trait GroupProgressReporter: Send + Sync {
    /// Emit a progress event. Called from the grouping pipeline.
    fn report(&self, event: GroupProgressEvent);
}

/// Human-friendly progress on stderr: "group  extracting  12 / 1,500 files".
pub struct StderrProgress;

impl GroupProgressReporter for StderrProgress {
    fn report(&self, event: GroupProgressEvent) {
        let line = match &event {
            GroupProgressEvent::Listed { files } => {
                format!("group  listed  {} files\n", format_number(*files))
            }
            GroupProgressEvent::Extracting { n, total } => format!(
                "group  extracting  {} / {} files\n",
                format_number(*n),
                format_number(*total)
            ),
            GroupProgressEvent::ExtractionSkipped { file, reason } => {
                format!("group  skipped  {}: {}\n", file, reason)
            }
            GroupProgressEvent::Vectorized { documents, terms } => format!(
                "group  vectorized  {} documents, {} terms\n",
                format_number(*documents),
                format_number(*terms)
            ),
            GroupProgressEvent::GroupCreated { group, files } => {
                format!("group  created  {} ({} files)\n", group, files)
            }
            GroupProgressEvent::UngroupedCopied { files } => {
                format!("group  ungrouped  {} files\n", format_number(*files))
            }
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl JsonProgress {
    fn to_json(event: &GroupProgressEvent) -> serde_json::Value {
        match event {
            GroupProgressEvent::Listed { files } => serde_json::json!({
                "event": "progress",
                "phase": "listed",
                "files": files
            }),
            GroupProgressEvent::Extracting { n, total } => serde_json::json!({
                "event": "progress",
                "phase": "extracting",
                "n": n,
                "total": total
            }),
            GroupProgressEvent::ExtractionSkipped { file, reason } => serde_json::json!({
                "event": "skipped",
                "file": file,
                "reason": reason
            }),
            GroupProgressEvent::Vectorized { documents, terms } => serde_json::json!({
                "event": "progress",
                "phase": "vectorized",
                "documents": documents,
                "terms": terms
            }),
            GroupProgressEvent::GroupCreated { group, files } => serde_json::json!({
                "event": "group",
                "group": group,
                "files": files
            }),
            GroupProgressEvent::UngroupedCopied { files } => serde_json::json!({
                "event": "progress",
                "phase": "ungrouped",
                "files": files
            }),
        }
    }
}

impl GroupProgressReporter for JsonProgress {
    fn report(&self, event: GroupProgressEvent) {
        if let Ok(line) = serde_json::to_string(&Self::to_json(&event)) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

fn panic_json(message: &str, location: Option<String>) -> serde_json::Value {
    serde_json::json!({
        "event": "panic",
        "message": message,
        "location": location
    })
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl GroupProgressReporter for NoProgress {
    fn report(&self, _event: GroupProgressEvent) {}
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
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

    /// Parse a mode name; `auto` resolves against the terminal.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "auto" => Some(Self::default_for_tty()),
            "off" => Some(ProgressMode::Off),
            "human" => Some(ProgressMode::Human),
            "json" => Some(ProgressMode::Json),
            _ => None,
        }
    }

    /// Route panic messages through this mode's stderr format.
    ///
    /// Document parsers may panic on malformed input; extraction catches the
    /// unwind, but the default hook would still print a plain-text line.
    /// JSON mode replaces the hook so each panic becomes one JSON line.
    /// Other modes keep the default hook.
    pub fn install_panic_hook(&self) {
        if *self != ProgressMode::Json {
            return;
        }
        std::panic::set_hook(Box::new(|info| {
            let payload = info.payload();
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "panic".to_string());
            let location = info
                .location()
                .map(|l| format!("{}:{}", l.file(), l.line()));
            if let Ok(line) = serde_json::to_string(&panic_json(&message, location)) {
                let _ = writeln!(std::io::stderr().lock(), "{}", line);
            }
        }));
    }

    /// Build a reporter for this mode.
    pub fn reporter(&self) -> Box<dyn GroupProgressReporter> {
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
    fn parse_modes() {
        assert_eq!(ProgressMode::parse("off"), Some(ProgressMode::Off));
        assert_eq!(ProgressMode::parse("json"), Some(ProgressMode::Json));
        assert_eq!(ProgressMode::parse("human"), Some(ProgressMode::Human));
        assert!(ProgressMode::parse("auto").is_some());
        assert_eq!(ProgressMode::parse("loud"), None);
    }

    #[test]
    fn panic_lines_are_json_objects() {
        let v = panic_json("index out of range", Some("lexer.rs:12".to_string()));
        assert_eq!(v["event"], "panic");
        assert_eq!(v["message"], "index out of range");
        assert_eq!(v["location"], "lexer.rs:12");
        let line = serde_json::to_string(&panic_json("a\nb", None)).unwrap();
        assert!(!line.contains('\n'));
        let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert!(parsed["location"].is_null());
    }

    #[test]
    fn json_events_are_tagged() {
        let v = JsonProgress::to_json(&GroupProgressEvent::Extracting { n: 3, total: 9 });
        assert_eq!(v["phase"], "extracting");
        assert_eq!(v["total"], 9);
        let v = JsonProgress::to_json(&GroupProgressEvent::ExtractionSkipped {
            file: "a.png".to_string(),
            reason: "unsupported".to_string(),
        });
        assert_eq!(v["event"], "skipped");
        assert_eq!(v["file"], "a.png");
    }
}
