use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tokio::time::{sleep, Duration};
use tracing::error;

use tracing_slack_sink::init::init_tracing;
use tracing_slack_sink::slack::{SlackConfig, SlackSink};
use tracing_slack_sink::transport::{HttpResponse, HttpTransport, TransportError};

/// Accepts every payload without any network I/O, so only the layer and
/// payload formatting are measured.
struct DiscardTransport;

#[async_trait]
impl HttpTransport for DiscardTransport {
    async fn post(
        &self,
        _url: &str,
        _body: String,
        _headers: &[(&str, &str)],
    ) -> Result<HttpResponse, TransportError> {
        Ok(HttpResponse::new(200, "ok"))
    }
}

#[tokio::main]
async fn main() {
    let config = SlackConfig::new("http://localhost/discard");
    let sink = SlackSink::with_transport(config, Arc::new(DiscardTransport))
        .expect("valid config");
    init_tracing(Arc::new(sink)).expect("set global subscriber");

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        error!(iteration = i, "default load test error");
    }

    let elapsed = start.elapsed();
    println!("default config: sent {} events in {:?} (~{:.0} ev/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    // Give background task a little time to drain the channel
    sleep(Duration::from_secs(2)).await;
}
