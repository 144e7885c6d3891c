use crate::attachment::encode;
use crate::context::{ContextProvider, EnrichmentContext, ProcessContext};
use crate::error::{ConfigError, SlackError};
use crate::message::NormalizedMessage;
use crate::payload::{build_payload, Payload};
use crate::record::{Level, LogRecord};
use crate::sink::LogSink;
use crate::transport::HttpTransport;
use async_trait::async_trait;
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Content type sent with every webhook call.
pub const CONTENT_TYPE: &str = "application/json; charset=UTF-8";

/// Produces the `Prefix` field for a record.
pub type PrefixFn = Arc<dyn Fn(&NormalizedMessage) -> String + Send + Sync>;

/// Escapes user-controlled text before it is put into a payload.
pub type Escaper = fn(&str) -> String;

/// Configuration for [`SlackSink`].
///
/// Display options left as `None` (or set to an empty string) are not sent,
/// so the webhook's own defaults apply.
#[derive(Clone)]
pub struct SlackConfig {
    /// Incoming webhook URL, e.g. "https://hooks.slack.com/services/T000/B000/XXXX"
    pub webhook_url: String,
    pub username: Option<String>,
    pub icon_url: Option<String>,
    pub icon_emoji: Option<String>,
    /// Channel or direct message to post into.
    pub channel: Option<String>,
    /// Attachment color per level; unmapped levels get no color.
    pub colors: HashMap<Level, String>,
    pub prefix: Option<PrefixFn>,
    /// Shown as the attachment footer.
    pub app_id: String,
    pub escaper: Escaper,
}

impl SlackConfig {
    pub fn new(webhook_url: impl Into<String>) -> Self {
        SlackConfig {
            webhook_url: webhook_url.into(),
            username: None,
            icon_url: None,
            icon_emoji: None,
            channel: None,
            colors: default_colors(),
            prefix: None,
            app_id: default_app_id(),
            escaper: encode,
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_icon_url(mut self, icon_url: impl Into<String>) -> Self {
        self.icon_url = Some(icon_url.into());
        self
    }

    pub fn with_icon_emoji(mut self, icon_emoji: impl Into<String>) -> Self {
        self.icon_emoji = Some(icon_emoji.into());
        self
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    pub fn with_prefix<F>(mut self, prefix: F) -> Self
    where
        F: Fn(&NormalizedMessage) -> String + Send + Sync + 'static,
    {
        self.prefix = Some(Arc::new(prefix));
        self
    }

    pub fn with_app_id(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = app_id.into();
        self
    }

    /// Check that the configuration can be used to deliver anything.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.webhook_url.trim().is_empty() {
            return Err(ConfigError::MissingWebhookUrl);
        }
        Ok(())
    }
}

impl fmt::Debug for SlackConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlackConfig")
            .field("webhook_url", &self.webhook_url)
            .field("username", &self.username)
            .field("icon_url", &self.icon_url)
            .field("icon_emoji", &self.icon_emoji)
            .field("channel", &self.channel)
            .field("colors", &self.colors)
            .field("prefix", &self.prefix.as_ref().map(|_| "<fn>"))
            .field("app_id", &self.app_id)
            .finish()
    }
}

/// `error` renders as "danger", `warning` as "warning".
pub fn default_colors() -> HashMap<Level, String> {
    let mut colors = HashMap::new();
    colors.insert(Level::Error, "danger".to_string());
    colors.insert(Level::Warning, "warning".to_string());
    colors
}

fn default_app_id() -> String {
    std::env::current_exe()
        .ok()
        .and_then(|path| path.file_stem().map(|stem| stem.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "application".to_string())
}

/// Slack incoming-webhook implementation of [`LogSink`].
///
/// One export turns a whole batch into a single [`Payload`] and posts it
/// once. Failures are returned, never retried.
#[derive(Clone)]
pub struct SlackSink {
    config: Arc<SlackConfig>,
    transport: Arc<dyn HttpTransport>,
    context: Arc<dyn ContextProvider>,
}

impl SlackSink {
    /// Construct a sink posting through `reqwest`, describing records as
    /// logged by this process.
    ///
    /// **Returns**
    /// - `Err(ConfigError::MissingWebhookUrl)` if no webhook URL is set.
    #[cfg(feature = "reqwest")]
    pub fn new(config: SlackConfig) -> Result<Self, ConfigError> {
        Self::with_transport(config, Arc::new(crate::transport::ReqwestTransport::new()))
    }

    /// Construct a sink with an explicit transport.
    pub fn with_transport(
        config: SlackConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            transport,
            context: Arc::new(ProcessContext),
        })
    }

    /// Replace the context used to enrich attachments.
    pub fn with_context(mut self, context: Arc<dyn ContextProvider>) -> Self {
        self.context = context;
        self
    }

    pub fn config(&self) -> &SlackConfig {
        &self.config
    }

    /// Build the payload for `batch` without sending it.
    pub fn payload(&self, batch: &[LogRecord]) -> Payload {
        build_payload(&self.config, batch, || {
            EnrichmentContext::collect(self.context.as_ref())
        })
    }

    /// Post `batch` to the webhook in a single request.
    ///
    /// **Returns**
    /// - `Ok(())` if the webhook answered with a 2xx status, or the batch
    ///   was empty and nothing was sent.
    /// - `Err(SlackError::Delivery { status, body })` for any other status,
    ///   or when the transport failed (`status` is 0 unless the transport
    ///   reported a code).
    pub async fn export(&self, batch: &[LogRecord]) -> Result<(), SlackError> {
        if batch.is_empty() {
            return Ok(());
        }

        let payload = self.payload(batch);
        let body = serde_json::to_string(&payload)?;

        debug!(attachments = payload.attachments.len(), "posting log batch to Slack");
        let resp = self
            .transport
            .post(&self.config.webhook_url, body, &[("Content-Type", CONTENT_TYPE)])
            .await
            .map_err(|e| {
                warn!(error = %e, "Slack webhook request failed");
                SlackError::from(e)
            })?;

        if resp.is_success() {
            debug!(status = resp.status, "Slack accepted log batch");
            Ok(())
        } else {
            warn!(status = resp.status, body = %resp.body, "Slack rejected log batch");
            Err(SlackError::Delivery {
                status: resp.status,
                body: resp.body,
            })
        }
    }
}

#[async_trait]
impl LogSink for SlackSink {
    async fn export(&self, batch: &[LogRecord]) -> Result<(), Box<dyn Error + Send + Sync>> {
        SlackSink::export(self, batch).await.map_err(Into::into)
    }
}
