//! Environment variable names used by this crate for convenient
//! configuration of the Slack sink from services.
//!
//! These are purely helpers; [`SlackConfig`] itself stays decoupled from
//! environment access.

use crate::error::ConfigError;
use crate::slack::SlackConfig;

/// Incoming webhook URL (required).
pub const SLACK_LOG_WEBHOOK_URL_ENV: &str = "SLACK_LOG_WEBHOOK_URL";

/// Optional displayed username.
pub const SLACK_LOG_USERNAME_ENV: &str = "SLACK_LOG_USERNAME";

/// Optional icon URL.
pub const SLACK_LOG_ICON_URL_ENV: &str = "SLACK_LOG_ICON_URL";

/// Optional icon emoji, e.g. `:rotating_light:`.
pub const SLACK_LOG_ICON_EMOJI_ENV: &str = "SLACK_LOG_ICON_EMOJI";

/// Optional channel or direct message override.
pub const SLACK_LOG_CHANNEL_ENV: &str = "SLACK_LOG_CHANNEL";

/// Optional application id shown in attachment footers.
pub const SLACK_LOG_APP_ID_ENV: &str = "SLACK_LOG_APP_ID";

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

impl SlackConfig {
    /// Build a validated configuration from `SLACK_LOG_*` variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`SlackConfig::from_env`], reading values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.is_empty());

        let mut config = SlackConfig::new(non_empty(SLACK_LOG_WEBHOOK_URL_ENV).unwrap_or_default());
        config.validate()?;
        config.username = non_empty(SLACK_LOG_USERNAME_ENV);
        config.icon_url = non_empty(SLACK_LOG_ICON_URL_ENV);
        config.icon_emoji = non_empty(SLACK_LOG_ICON_EMOJI_ENV);
        config.channel = non_empty(SLACK_LOG_CHANNEL_ENV);
        if let Some(app_id) = non_empty(SLACK_LOG_APP_ID_ENV) {
            config.app_id = app_id;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn missing_webhook_url_is_a_config_error() {
        let err = SlackConfig::from_lookup(lookup(&[(SLACK_LOG_USERNAME_ENV, "bot")])).unwrap_err();
        assert_eq!(err, ConfigError::MissingWebhookUrl);
    }

    #[test]
    fn reads_optional_values_and_ignores_empty_ones() {
        let config = SlackConfig::from_lookup(lookup(&[
            (SLACK_LOG_WEBHOOK_URL_ENV, "https://hooks.slack.com/services/T/B/X"),
            (SLACK_LOG_USERNAME_ENV, "Fire Alarm Bot"),
            (SLACK_LOG_ICON_URL_ENV, ""),
            (SLACK_LOG_ICON_EMOJI_ENV, ":poop:"),
            (SLACK_LOG_APP_ID_ENV, "billing"),
        ]))
        .unwrap();

        assert_eq!(config.webhook_url, "https://hooks.slack.com/services/T/B/X");
        assert_eq!(config.username.as_deref(), Some("Fire Alarm Bot"));
        assert_eq!(config.icon_url, None);
        assert_eq!(config.icon_emoji.as_deref(), Some(":poop:"));
        assert_eq!(config.channel, None);
        assert_eq!(config.app_id, "billing");
    }

    #[test]
    fn env_or_falls_back_to_default() {
        assert_eq!(env_or("SLACK_LOG_SURELY_UNSET_VARIABLE", "fallback"), "fallback");
    }
}
