use crate::transport::TransportError;

/// Error returned when a sink configuration cannot be used.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Slack webhook URL is not configured")]
    MissingWebhookUrl,
}

/// Error returned by [`SlackSink::export`](crate::slack::SlackSink::export).
#[derive(thiserror::Error, Debug)]
pub enum SlackError {
    #[error("unable to encode Slack payload: {0}")]
    Encode(#[from] serde_json::Error),

    /// Non-2xx response, or no response at all (`status` is then the
    /// transport's code, or 0).
    #[error("unable to send logs to Slack (status {status}): {body}")]
    Delivery { status: u16, body: String },
}

impl SlackError {
    /// HTTP status carried by a delivery failure.
    pub fn status(&self) -> Option<u16> {
        match self {
            SlackError::Delivery { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<TransportError> for SlackError {
    fn from(err: TransportError) -> Self {
        SlackError::Delivery {
            status: err.status.unwrap_or(0),
            body: err.message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_become_delivery_failures() {
        let err: SlackError = TransportError::new("connection refused").into();
        match err {
            SlackError::Delivery { status, body } => {
                assert_eq!(status, 0);
                assert_eq!(body, "connection refused");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn delivery_failure_reports_status_and_body() {
        let err = SlackError::Delivery { status: 404, body: "error".to_string() };
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.to_string(), "unable to send logs to Slack (status 404): error");
    }
}
