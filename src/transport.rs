use async_trait::async_trait;
use std::fmt;

/// Status and body of an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        HttpResponse { status, body: body.into() }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A request that produced no usable HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    /// Transport-specific code, when there is one.
    pub status: Option<u16>,
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        TransportError { status: None, message: message.into() }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "transport error {}: {}", status, self.message),
            None => write!(f, "transport error: {}", self.message),
        }
    }
}

impl std::error::Error for TransportError {}

/// HTTP client capability used to deliver payloads.
///
/// Implementations perform exactly one request per call. Timeouts, if any,
/// are the implementation's business.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn post(
        &self,
        url: &str,
        body: String,
        headers: &[(&str, &str)],
    ) -> Result<HttpResponse, TransportError>;
}

#[cfg(feature = "reqwest")]
pub use self::reqwest_transport::ReqwestTransport;

#[cfg(feature = "reqwest")]
mod reqwest_transport {
    use super::{HttpResponse, HttpTransport, TransportError};
    use async_trait::async_trait;
    use reqwest::Client;
    use std::time::Duration;

    /// [`HttpTransport`] backed by an async `reqwest` client.
    #[derive(Clone, Debug, Default)]
    pub struct ReqwestTransport {
        client: Client,
    }

    impl ReqwestTransport {
        pub fn new() -> Self {
            Self { client: Client::new() }
        }

        /// Build a transport whose requests give up after `timeout`.
        pub fn with_timeout(timeout: Duration) -> Result<Self, TransportError> {
            let client = Client::builder()
                .timeout(timeout)
                .build()
                .map_err(to_transport_error)?;
            Ok(Self { client })
        }

        /// Reuse an already configured client.
        pub fn with_client(client: Client) -> Self {
            Self { client }
        }
    }

    fn to_transport_error(err: reqwest::Error) -> TransportError {
        let mut out = TransportError::new(err.to_string());
        out.status = err.status().map(|s| s.as_u16());
        out
    }

    #[async_trait]
    impl HttpTransport for ReqwestTransport {
        async fn post(
            &self,
            url: &str,
            body: String,
            headers: &[(&str, &str)],
        ) -> Result<HttpResponse, TransportError> {
            let mut request = self.client.post(url).body(body);
            for (name, value) in headers {
                request = request.header(*name, *value);
            }
            let resp = request.send().await.map_err(to_transport_error)?;
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_else(|_| "<no body>".to_string());
            Ok(HttpResponse { status, body })
        }
    }
}
