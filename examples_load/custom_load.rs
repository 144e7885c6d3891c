use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use async_trait::async_trait;
use tokio::time::{sleep, Duration};
use tracing::{error, Level};

use tracing_slack_sink::init::{init_tracing_with_config, LayerConfig};
use tracing_slack_sink::slack::{SlackConfig, SlackSink};
use tracing_slack_sink::transport::{HttpResponse, HttpTransport, TransportError};

/// Counts posted payloads instead of sending them.
#[derive(Default)]
struct CountingTransport {
    posts: AtomicU64,
    bytes: AtomicU64,
}

#[async_trait]
impl HttpTransport for CountingTransport {
    async fn post(
        &self,
        _url: &str,
        body: String,
        _headers: &[(&str, &str)],
    ) -> Result<HttpResponse, TransportError> {
        self.posts.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(body.len() as u64, Ordering::Relaxed);
        Ok(HttpResponse::new(200, "ok"))
    }
}

#[tokio::main]
async fn main() {
    let transport = Arc::new(CountingTransport::default());
    let config = SlackConfig::new("http://localhost/discard").with_app_id("custom-load");
    let sink = SlackSink::with_transport(config, transport.clone()).expect("valid config");

    let layer_config = LayerConfig {
        channel_buffer: 50_000,
        batch_size: 1_000,
        flush_interval: Duration::from_millis(200),
        min_level: Level::ERROR,
        enable_stdout: false,
    };

    init_tracing_with_config(Arc::new(sink), layer_config).expect("set global subscriber");

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        error!(iteration = i, "custom load test error");
    }

    let elapsed = start.elapsed();
    println!("custom config: sent {} events in {:?} (~{:.0} ev/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    sleep(Duration::from_secs(2)).await;
    println!("posted {} payloads ({} bytes)",
        transport.posts.load(Ordering::Relaxed),
        transport.bytes.load(Ordering::Relaxed)
    );
}
