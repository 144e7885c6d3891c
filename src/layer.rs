use crate::record::{now_seconds, ErrorInfo, Level as RecordLevel, LogRecord, LogValue, TraceFrame};
use crate::sink::LogSink;
use serde_json::{Map, Value};
use std::sync::{Arc, atomic::{AtomicU64, Ordering}};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// Events emitted by this crate are never captured, so a failing delivery
/// cannot feed itself.
const OWN_TARGET: &str = "tracing_slack_sink";

/// `tracing_subscriber` layer that observes events and forwards them in
/// batches to an asynchronous [`LogSink`] via a bounded channel and
/// background task.
///
/// Only events at `min_level` or more severe are turned into
/// [`LogRecord`]s. Network I/O is fully decoupled from application
/// threads to minimize impact on request latency.
pub struct SlackLogLayer {
    sender: mpsc::Sender<LogRecord>,
    min_level: Level,
    /// Total events seen by the layer (before filtering by level).
    pub total_events: Arc<AtomicU64>,
    /// Successfully enqueued into channel.
    pub enqueued_events: Arc<AtomicU64>,
    /// Dropped because the channel was full.
    pub dropped_events: Arc<AtomicU64>,
    /// Batches the sink refused.
    pub failed_exports: Arc<AtomicU64>,
}

impl SlackLogLayer {
    /// Create a new layer and spawn a background task that pulls
    /// [`LogRecord`]s from a bounded channel and exports them to the
    /// provided [`LogSink`].
    ///
    /// A batch is exported once it holds `batch_size` records, when
    /// `flush_interval` elapses, and one last time after the layer is
    /// dropped; the returned handle completes after that final export.
    ///
    /// Minimal thresholds are enforced for `buffer`, `batch_size` and
    /// `flush_interval` to avoid degenerate configurations.
    pub fn new(
        sink: Arc<dyn LogSink>,
        buffer: usize,
        batch_size: usize,
        flush_interval: Duration,
        min_level: Level,
    ) -> (Self, JoinHandle<()>) {
        let buffer = buffer.max(16);
        let batch_size = batch_size.max(1);
        let flush_interval = flush_interval.max(Duration::from_millis(10));

        let (tx, mut rx) = mpsc::channel::<LogRecord>(buffer);

        let failed_exports = Arc::new(AtomicU64::new(0));
        let failed_exports_bg = Arc::clone(&failed_exports);

        let handle = tokio::spawn(async move {
            let mut batch = Vec::with_capacity(batch_size);
            let mut ticker = interval(flush_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    received = rx.recv() => match received {
                        Some(record) => {
                            batch.push(record);
                            if batch.len() >= batch_size {
                                export_batch(&*sink, &mut batch, &failed_exports_bg).await;
                            }
                        }
                        None => {
                            if !batch.is_empty() {
                                export_batch(&*sink, &mut batch, &failed_exports_bg).await;
                            }
                            break;
                        }
                    },
                    _ = ticker.tick() => {
                        if !batch.is_empty() {
                            export_batch(&*sink, &mut batch, &failed_exports_bg).await;
                        }
                    }
                }
            }
        });

        (Self {
            sender: tx,
            min_level,
            total_events: Arc::new(AtomicU64::new(0)),
            enqueued_events: Arc::new(AtomicU64::new(0)),
            dropped_events: Arc::new(AtomicU64::new(0)),
            failed_exports,
        }, handle)
    }
}

/// Export once; a failed batch is reported and discarded.
async fn export_batch(sink: &dyn LogSink, batch: &mut Vec<LogRecord>, failed: &AtomicU64) {
    if let Err(e) = sink.export(batch.as_slice()).await {
        failed.fetch_add(1, Ordering::Relaxed);
        eprintln!("error exporting log batch of {} records: {}", batch.len(), e);
    }
    batch.clear();
}

impl<S> Layer<S> for SlackLogLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        self.total_events.fetch_add(1, Ordering::Relaxed);
        let meta = event.metadata();
        if *meta.level() > self.min_level || meta.target().starts_with(OWN_TARGET) {
            return;
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let trace = match (meta.file(), meta.line()) {
            (Some(file), Some(line)) => vec![TraceFrame::new(file, line)],
            _ => Vec::new(),
        };
        let record = LogRecord {
            value: visitor.into_value(),
            level: RecordLevel::from(meta.level()),
            category: meta.target().to_string(),
            timestamp: now_seconds(),
            trace,
        };

        match self.sender.try_send(record) {
            Ok(()) => {
                self.enqueued_events.fetch_add(1, Ordering::Relaxed);
            }
            Err(_e) => {
                self.dropped_events.fetch_add(1, Ordering::Relaxed);
                eprintln!("log channel full, dropping log record");
            }
        }
    }
}

use tracing::field::{Field, Visit};

/// Collects an event's message, extra fields and error value.
#[derive(Default)]
pub struct FieldVisitor {
    pub fields: Map<String, Value>,
    pub message: Option<String>,
    pub error: Option<ErrorInfo>,
}

impl FieldVisitor {
    /// Error events become [`LogValue::Error`] with the message as context;
    /// events with extra fields become a structured object, message first.
    pub fn into_value(self) -> LogValue {
        if let Some(info) = self.error {
            return LogValue::Error(match self.message {
                Some(message) => info.with_context(message),
                None => info,
            });
        }
        if self.fields.is_empty() {
            return LogValue::Text(self.message.unwrap_or_default());
        }
        let mut object = Map::new();
        if let Some(message) = self.message {
            object.insert("message".to_string(), Value::String(message));
        }
        object.extend(self.fields);
        LogValue::Structured(Value::Object(object))
    }
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.fields.insert(field.name().to_string(), Value::String(value.to_string()));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields.insert(field.name().to_string(), Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields.insert(field.name().to_string(), Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.fields.insert(field.name().to_string(), Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.insert(field.name().to_string(), Value::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.error = Some(ErrorInfo::from_dyn(field.name(), value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{:?}", value));
        } else {
            self.fields.insert(field.name().to_string(), Value::String(format!("{:?}", value)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::error::Error;
    use std::sync::Mutex;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::Registry;

    #[derive(Default)]
    struct CollectingSink {
        batches: Mutex<Vec<Vec<LogRecord>>>,
        fail: bool,
    }

    impl CollectingSink {
        fn batches(&self) -> Vec<Vec<LogRecord>> {
            self.batches.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LogSink for CollectingSink {
        async fn export(&self, batch: &[LogRecord]) -> Result<(), Box<dyn Error + Send + Sync>> {
            self.batches.lock().unwrap().push(batch.to_vec());
            if self.fail {
                return Err("webhook down".into());
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn exports_filtered_events_in_batches() {
        let sink = Arc::new(CollectingSink::default());
        let (layer, handle) =
            SlackLogLayer::new(sink.clone(), 16, 2, Duration::from_secs(60), Level::WARN);
        let total = Arc::clone(&layer.total_events);
        let enqueued = Arc::clone(&layer.enqueued_events);

        tracing::subscriber::with_default(Registry::default().with(layer), || {
            tracing::error!(target: "app", "first");
            tracing::info!(target: "app", "ignored");
            tracing::warn!(target: "app", "second");
            tracing::error!(target: "tracing_slack_sink::slack", "own diagnostics");
        });
        handle.await.unwrap();

        let batches = sink.batches();
        assert_eq!(batches.len(), 1);
        let batch = &batches[0];
        assert_eq!(batch[0].value, LogValue::Text("first".to_string()));
        assert_eq!(batch[0].level, RecordLevel::Error);
        assert_eq!(batch[0].category, "app");
        assert_eq!(batch[0].trace.len(), 1);
        assert_eq!(batch[1].value, LogValue::Text("second".to_string()));
        assert_eq!(batch[1].level, RecordLevel::Warning);
        assert_eq!(total.load(Ordering::Relaxed), 4);
        assert_eq!(enqueued.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn remaining_records_are_flushed_on_drop() {
        let sink = Arc::new(CollectingSink::default());
        let (layer, handle) =
            SlackLogLayer::new(sink.clone(), 16, 100, Duration::from_secs(60), Level::ERROR);

        tracing::subscriber::with_default(Registry::default().with(layer), || {
            tracing::error!(target: "app", "only one");
        });
        handle.await.unwrap();

        let batches = sink.batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 1);
    }

    #[tokio::test]
    async fn partial_batch_is_flushed_on_interval() {
        let sink = Arc::new(CollectingSink::default());
        let (layer, handle) =
            SlackLogLayer::new(sink.clone(), 16, 100, Duration::from_millis(50), Level::ERROR);

        // The guard keeps the layer, and so the channel, alive across the sleep.
        let guard = tracing::subscriber::set_default(Registry::default().with(layer));
        tracing::error!(target: "app", "pending");
        tokio::time::sleep(Duration::from_millis(300)).await;

        let batches = sink.batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 1);
        assert_eq!(batches[0][0].value, LogValue::Text("pending".to_string()));

        drop(guard);
        handle.await.unwrap();
        assert_eq!(sink.batches().len(), 1);
    }

    #[tokio::test]
    async fn full_channel_drops_records() {
        let sink = Arc::new(CollectingSink::default());
        let (layer, handle) =
            SlackLogLayer::new(sink.clone(), 1, 100, Duration::from_secs(60), Level::ERROR);
        let dropped = Arc::clone(&layer.dropped_events);

        tracing::subscriber::with_default(Registry::default().with(layer), || {
            for i in 0..20 {
                tracing::error!(target: "app", iteration = i, "burst");
            }
        });
        handle.await.unwrap();

        assert_eq!(dropped.load(Ordering::Relaxed), 4);
        let exported: usize = sink.batches().iter().map(Vec::len).sum();
        assert_eq!(exported, 16);
    }

    #[tokio::test]
    async fn failed_exports_are_counted_not_retried() {
        let sink = Arc::new(CollectingSink { fail: true, ..Default::default() });
        let (layer, handle) =
            SlackLogLayer::new(sink.clone(), 16, 1, Duration::from_secs(60), Level::ERROR);
        let failed = Arc::clone(&layer.failed_exports);

        tracing::subscriber::with_default(Registry::default().with(layer), || {
            tracing::error!(target: "app", "one");
            tracing::error!(target: "app", "two");
        });
        handle.await.unwrap();

        assert_eq!(failed.load(Ordering::Relaxed), 2);
        assert_eq!(sink.batches().len(), 2);
    }

    #[tokio::test]
    async fn fields_and_errors_shape_the_record_value() {
        let sink = Arc::new(CollectingSink::default());
        let (layer, handle) =
            SlackLogLayer::new(sink.clone(), 16, 100, Duration::from_secs(60), Level::ERROR);
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");

        tracing::subscriber::with_default(Registry::default().with(layer), || {
            tracing::error!(target: "app", user = "bob", attempts = 3u64, "login failed");
            tracing::error!(target: "app", error = &io as &(dyn Error + 'static), "save failed");
        });
        handle.await.unwrap();

        let batch = &sink.batches()[0];
        assert_eq!(
            batch[0].value,
            LogValue::Structured(serde_json::json!({
                "message": "login failed",
                "user": "bob",
                "attempts": 3
            }))
        );
        match &batch[1].value {
            LogValue::Error(info) => {
                assert_eq!(info.context.as_deref(), Some("save failed"));
                assert_eq!(info.kind, "error");
                assert_eq!(info.message, "disk full");
            }
            other => panic!("expected an error value, got {:?}", other),
        }
    }
}
