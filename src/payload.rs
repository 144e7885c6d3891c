use crate::attachment::{set_if_present, Attachment, AttachmentFormatter};
use crate::context::EnrichmentContext;
use crate::record::LogRecord;
use crate::slack::SlackConfig;
use serde::Serialize;

/// Body of one webhook call: every attachment of a batch plus display
/// options.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Payload {
    /// Always `"none"`, so Slack does not auto-link names and URLs.
    pub parse: &'static str,
    pub attachments: Vec<Attachment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_emoji: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
}

/// Build the payload for `batch`, keeping record order.
///
/// `context` is called once per record so each attachment sees the context
/// current at its formatting time.
pub fn build_payload<F>(config: &SlackConfig, batch: &[LogRecord], mut context: F) -> Payload
where
    F: FnMut() -> EnrichmentContext,
{
    let formatter = AttachmentFormatter::new(config);
    let attachments = batch
        .iter()
        .map(|record| formatter.format(record, &context()))
        .collect();

    let mut payload = Payload {
        parse: "none",
        attachments,
        username: None,
        icon_url: None,
        icon_emoji: None,
        channel: None,
    };
    set_if_present(&mut payload.username, config.username.as_deref());
    set_if_present(&mut payload.icon_url, config.icon_url.as_deref());
    set_if_present(&mut payload.icon_emoji, config.icon_emoji.as_deref());
    set_if_present(&mut payload.channel, config.channel.as_deref());
    payload
}
