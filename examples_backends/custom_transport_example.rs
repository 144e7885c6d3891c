use std::sync::Arc;

use async_trait::async_trait;
use tracing_slack_sink::{
    context::RequestContext,
    record::{ErrorInfo, Level, LogRecord},
    slack::{SlackConfig, SlackSink},
    transport::{HttpResponse, HttpTransport, TransportError},
};

/// Example of plugging in a completely custom HTTP client by implementing
/// the `HttpTransport` trait directly. Here the payload is only printed.
struct PrintTransport;

#[async_trait]
impl HttpTransport for PrintTransport {
    async fn post(
        &self,
        url: &str,
        body: String,
        headers: &[(&str, &str)],
    ) -> Result<HttpResponse, TransportError> {
        println!("POST {} {:?}\n{}", url, headers, body);
        Ok(HttpResponse::new(200, "ok"))
    }
}

#[tokio::main]
async fn main() {
    let config = SlackConfig::new("https://hooks.slack.com/services/T000/B000/XXXX")
        .with_channel("#alerts");

    // Records exported outside the layer, e.g. from a request handler.
    let request = RequestContext::new("https://shop.example.com/checkout?step=2")
        .with_user_ip("203.0.113.7")
        .with_user_id("42")
        .with_session_id("f3a9c1");
    let sink = SlackSink::with_transport(config, Arc::new(PrintTransport))
        .expect("valid config")
        .with_context(Arc::new(request));

    let batch = vec![
        LogRecord::new(Level::Error, "checkout", ErrorInfo::new("PaymentError", "card declined")),
        LogRecord::new(Level::Warning, "checkout", serde_json::json!({ "cart": 3, "retry": true })),
    ];

    if let Err(e) = sink.export(&batch).await {
        eprintln!("delivery failed: {}", e);
    }
}
