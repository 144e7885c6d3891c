use std::sync::Arc;

use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};
use tracing_slack_sink::{
    env::{env_or, SLACK_LOG_WEBHOOK_URL_ENV},
    init::init_tracing,
    slack::{SlackConfig, SlackSink},
};

#[tokio::main]
async fn main() {
    // Example URL: https://hooks.slack.com/services/T000/B000/XXXX
    let webhook_url = env_or(SLACK_LOG_WEBHOOK_URL_ENV, "http://127.0.0.1:8080/slack");

    let config = SlackConfig::new(webhook_url)
        .with_username("Fire Alarm Bot")
        .with_icon_emoji(":rotating_light:")
        .with_prefix(|msg| format!("[{}]", msg.category));
    let sink = SlackSink::new(config).expect("invalid Slack configuration");

    init_tracing(Arc::new(sink)).expect("set global subscriber");

    info!("slack example started");
    warn!(disk = "/var", usage = 0.93, "disk almost full");
    error!("simulated error sent to Slack");

    // Let the background task flush the batch.
    sleep(Duration::from_secs(2)).await;
}
