use chrono::Utc;
use std::error::Error;
use std::fmt;

/// Severity of a [`LogRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Level {
    Error,
    Warning,
    Info,
    Trace,
    Profile,
    ProfileBegin,
    ProfileEnd,
}

impl Level {
    /// Lowercase level name as shown in the `Level` field and fallback text.
    pub fn name(&self) -> &'static str {
        match self {
            Level::Error => "error",
            Level::Warning => "warning",
            Level::Info => "info",
            Level::Trace => "trace",
            Level::Profile => "profile",
            Level::ProfileBegin => "profile begin",
            Level::ProfileEnd => "profile end",
        }
    }

    /// Level name with every word capitalised, e.g. `"Profile Begin"`.
    pub fn title(&self) -> String {
        self.name()
            .split(' ')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            })
            .collect::<Vec<String>>()
            .join(" ")
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<&tracing::Level> for Level {
    fn from(level: &tracing::Level) -> Self {
        match *level {
            tracing::Level::ERROR => Level::Error,
            tracing::Level::WARN => Level::Warning,
            tracing::Level::INFO => Level::Info,
            _ => Level::Trace,
        }
    }
}

/// One call-site frame attached to a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceFrame {
    pub file: String,
    pub line: u32,
}

impl TraceFrame {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        TraceFrame { file: file.into(), line }
    }
}

/// Stringified form of an error value carried by a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    /// Optional line rendered before the error itself.
    pub context: Option<String>,
    pub kind: String,
    pub message: String,
    /// `source()` chain, outermost first.
    pub causes: Vec<String>,
    pub frames: Vec<String>,
}

impl ErrorInfo {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        ErrorInfo {
            context: None,
            kind: kind.into(),
            message: message.into(),
            causes: Vec::new(),
            frames: Vec::new(),
        }
    }

    /// Capture a concrete error, its type name and its whole source chain.
    pub fn from_error<E: Error>(err: &E) -> Self {
        let mut info = ErrorInfo::new(std::any::type_name::<E>(), err.to_string());
        info.causes = source_chain(err.source());
        info
    }

    /// Capture a type-erased error under an explicit kind.
    pub fn from_dyn(kind: impl Into<String>, err: &(dyn Error + 'static)) -> Self {
        let mut info = ErrorInfo::new(kind, err.to_string());
        info.causes = source_chain(err.source());
        info
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_frames<I, S>(mut self, frames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.frames = frames.into_iter().map(Into::into).collect();
        self
    }
}

fn source_chain(mut source: Option<&(dyn Error + 'static)>) -> Vec<String> {
    let mut causes = Vec::new();
    while let Some(err) = source {
        causes.push(err.to_string());
        source = err.source();
    }
    causes
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(context) = &self.context {
            writeln!(f, "{}", context)?;
        }
        write!(f, "{}: {}", self.kind, self.message)?;
        for cause in &self.causes {
            write!(f, "\nCaused by: {}", cause)?;
        }
        if !self.frames.is_empty() {
            write!(f, "\nStack trace:")?;
            for (i, frame) in self.frames.iter().enumerate() {
                write!(f, "\n#{} {}", i, frame)?;
            }
        }
        Ok(())
    }
}

/// Value logged by the application.
#[derive(Debug, Clone, PartialEq)]
pub enum LogValue {
    Text(String),
    Error(ErrorInfo),
    Structured(serde_json::Value),
}

impl From<&str> for LogValue {
    fn from(text: &str) -> Self {
        LogValue::Text(text.to_string())
    }
}

impl From<String> for LogValue {
    fn from(text: String) -> Self {
        LogValue::Text(text)
    }
}

impl From<ErrorInfo> for LogValue {
    fn from(info: ErrorInfo) -> Self {
        LogValue::Error(info)
    }
}

impl From<serde_json::Value> for LogValue {
    fn from(value: serde_json::Value) -> Self {
        LogValue::Structured(value)
    }
}

/// A single raw log record handed to a sink as part of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub value: LogValue,
    pub level: Level,
    pub category: String,
    /// Seconds since the Unix epoch, with sub-second precision.
    pub timestamp: f64,
    pub trace: Vec<TraceFrame>,
}

impl LogRecord {
    /// Build a record stamped with the current wall-clock time.
    pub fn new(level: Level, category: impl Into<String>, value: impl Into<LogValue>) -> Self {
        LogRecord {
            value: value.into(),
            level,
            category: category.into(),
            timestamp: now_seconds(),
            trace: Vec::new(),
        }
    }

    pub fn with_timestamp(mut self, timestamp: f64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_trace(mut self, trace: Vec<TraceFrame>) -> Self {
        self.trace = trace;
        self
    }
}

pub(crate) fn now_seconds() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("outer failure")]
    struct Outer {
        #[source]
        inner: Inner,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("inner failure")]
    struct Inner;

    #[test]
    fn level_titles_capitalise_each_word() {
        assert_eq!(Level::Error.title(), "Error");
        assert_eq!(Level::Warning.title(), "Warning");
        assert_eq!(Level::ProfileBegin.title(), "Profile Begin");
    }

    #[test]
    fn tracing_levels_map_onto_record_levels() {
        assert_eq!(Level::from(&tracing::Level::ERROR), Level::Error);
        assert_eq!(Level::from(&tracing::Level::WARN), Level::Warning);
        assert_eq!(Level::from(&tracing::Level::INFO), Level::Info);
        assert_eq!(Level::from(&tracing::Level::DEBUG), Level::Trace);
        assert_eq!(Level::from(&tracing::Level::TRACE), Level::Trace);
    }

    #[test]
    fn error_info_captures_type_and_source_chain() {
        let err = Outer { inner: Inner };
        let info = ErrorInfo::from_error(&err);

        assert!(info.kind.ends_with("Outer"));
        assert_eq!(info.message, "outer failure");
        assert_eq!(info.causes, vec!["inner failure".to_string()]);
    }

    #[test]
    fn error_info_display_includes_context_causes_and_frames() {
        let mut info = ErrorInfo::new("app::Error", "boom")
            .with_context("while saving")
            .with_frames(["src/main.rs:10"]);
        info.causes.push("disk full".to_string());

        assert_eq!(
            info.to_string(),
            "while saving\napp::Error: boom\nCaused by: disk full\nStack trace:\n#0 src/main.rs:10"
        );
    }

    #[test]
    fn new_record_is_stamped_with_current_time() {
        let before = now_seconds();
        let record = LogRecord::new(Level::Info, "app", "hello");
        assert!(record.timestamp >= before);
        assert!(record.trace.is_empty());
        assert_eq!(record.value, LogValue::Text("hello".to_string()));
    }
}
