use crate::record::{Level, LogRecord, LogValue};
use serde_json::Value;

/// Uniform view of a [`LogRecord`] used while formatting an attachment.
///
/// Built fresh for every record; nothing here is escaped yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedMessage {
    pub text: String,
    pub level: Level,
    pub category: String,
    pub timestamp: f64,
    /// One `"in <file>:<line>"` entry per trace frame.
    pub trace_lines: Vec<String>,
}

impl NormalizedMessage {
    pub fn from_record(record: &LogRecord) -> Self {
        let text = match &record.value {
            LogValue::Text(text) => text.clone(),
            LogValue::Error(info) => info.to_string(),
            LogValue::Structured(value) => dump(value),
        };
        let trace_lines = record
            .trace
            .iter()
            .map(|frame| format!("in {}:{}", frame.file, frame.line))
            .collect();

        NormalizedMessage {
            text,
            level: record.level,
            category: record.category.clone(),
            timestamp: record.timestamp,
            trace_lines,
        }
    }

    /// Trace lines joined by newlines, or an empty string without a trace.
    pub fn stack_trace(&self) -> String {
        self.trace_lines.join("\n")
    }
}

/// Render any JSON value as readable text.
///
/// Keyed structures keep their insertion order.
pub fn dump(value: &Value) -> String {
    let mut out = String::new();
    dump_into(&mut out, value, 0);
    out
}

fn dump_into(out: &mut String, value: &Value, depth: usize) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => push_quoted(out, s),
        Value::Array(items) => {
            if items.is_empty() {
                out.push_str("[]");
                return;
            }
            out.push_str("[\n");
            for item in items {
                push_indent(out, depth + 1);
                dump_into(out, item, depth + 1);
                out.push_str(",\n");
            }
            push_indent(out, depth);
            out.push(']');
        }
        Value::Object(map) => {
            if map.is_empty() {
                out.push_str("[]");
                return;
            }
            out.push_str("[\n");
            for (key, item) in map {
                push_indent(out, depth + 1);
                push_quoted(out, key);
                out.push_str(" => ");
                dump_into(out, item, depth + 1);
                out.push_str(",\n");
            }
            push_indent(out, depth);
            out.push(']');
        }
    }
}

fn push_indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("    ");
    }
}

fn push_quoted(out: &mut String, s: &str) {
    out.push('\'');
    for c in s.chars() {
        if c == '\\' || c == '\'' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('\'');
}
