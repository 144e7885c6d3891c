use crate::layer::SlackLogLayer;
use crate::sink::LogSink;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::subscriber::SetGlobalDefaultError;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Configuration of the logging layer.
///
/// Controls the size of the internal buffer, the maximum number of
/// records exported in one webhook call, how often a partial batch is
/// flushed, the minimum captured level, and whether events are also
/// printed to the console through a `fmt` layer.
///
/// **Fields**
/// - `channel_buffer`: maximum number of [`LogRecord`](crate::record::LogRecord)s
///   queued before new records are dropped.
/// - `batch_size`: number of records exported per sink call.
/// - `flush_interval`: longest time a partial batch waits before export.
/// - `min_level`: least severe level that is forwarded to the sink.
/// - `enable_stdout`: if `true`, a `tracing_subscriber::fmt::Layer` is
///   stacked on top of [`SlackLogLayer`].
#[derive(Clone, Debug)]
pub struct LayerConfig {
    pub channel_buffer: usize,
    pub batch_size: usize,
    pub flush_interval: Duration,
    pub min_level: Level,
    pub enable_stdout: bool,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            channel_buffer: 1024,
            batch_size: 50,
            flush_interval: Duration::from_secs(1),
            min_level: Level::WARN,
            enable_stdout: true,
        }
    }
}

/// Initialize the global `tracing` subscriber using the provided sink and
/// [`LayerConfig`].
///
/// **Parameters**
/// - `sink`: implementation of [`LogSink`] that will receive batches of
///   normalized records.
/// - `config`: [`LayerConfig`] controlling buffering and batching
///   behavior of the layer.
///
/// **Returns**
/// - The handle of the background export task.
/// - `Err(..)` if a global subscriber was already installed.
///
/// Must be called from within a Tokio runtime.
pub fn init_tracing_with_config(
    sink: Arc<dyn LogSink>,
    config: LayerConfig,
) -> Result<JoinHandle<()>, SetGlobalDefaultError> {
    let (layer, handle) = SlackLogLayer::new(
        sink,
        config.channel_buffer,
        config.batch_size,
        config.flush_interval,
        config.min_level,
    );

    // The two subscriber shapes have different types, hence two branches.
    if config.enable_stdout {
        let fmt_layer = tracing_subscriber::fmt::layer();
        let subscriber = Registry::default().with(layer).with(fmt_layer);
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::set_global_default(subscriber)?;
    }
    Ok(handle)
}

/// Initialize tracing with sensible defaults.
///
/// Equivalent to calling [`init_tracing_with_config`] with
/// [`LayerConfig::default`]. This is the recommended entrypoint for
/// typical services.
pub fn init_tracing(sink: Arc<dyn LogSink>) -> Result<JoinHandle<()>, SetGlobalDefaultError> {
    init_tracing_with_config(sink, LayerConfig::default())
}
