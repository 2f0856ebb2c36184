//! Transport capability consumed by the client: post an envelope to an
//! endpoint over a mutually-authenticated channel and hand back the raw
//! response text.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;

use crate::credentials::CertificationBag;
use crate::error::{Error, Result};

const TEXT_XML: &str = "text/xml; charset=utf-8";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[async_trait]
pub trait SoapTransport: Send + Sync {
    /// Apply the bag's client certificate and private key as the channel
    /// identity. Called once at client construction, and again when the
    /// bag is replaced on a live client.
    fn configure_credentials(&mut self, bag: &CertificationBag) -> Result<()>;

    /// Post an envelope and return the raw response text. Network errors
    /// and non-success statuses are transport errors; no retries happen
    /// at this layer.
    async fn dispatch(&self, endpoint: &str, action: &str, envelope: &str) -> Result<String>;
}

/// HTTPS transport with mutual TLS. Timeouts are transport configuration,
/// not part of the client contract.
pub struct HttpTransport {
    http: reqwest::Client,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            timeout,
        }
    }

    /// The timeout applied to the underlying client on credential
    /// configuration.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SoapTransport for HttpTransport {
    fn configure_credentials(&mut self, bag: &CertificationBag) -> Result<()> {
        // rustls wants key and certificate chain in a single PEM bundle
        let mut identity_pem =
            Vec::with_capacity(bag.client_private_key().len() + bag.client_certificate().len());
        identity_pem.extend_from_slice(bag.client_private_key());
        identity_pem.extend_from_slice(bag.client_certificate());

        let identity = reqwest::Identity::from_pem(&identity_pem)
            .map_err(|e| Error::Configuration(format!("invalid client identity: {e}")))?;

        self.http = reqwest::Client::builder()
            .use_rustls_tls()
            .identity(identity)
            .timeout(self.timeout)
            .build()
            .map_err(|e| Error::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(())
    }

    async fn dispatch(&self, endpoint: &str, action: &str, envelope: &str) -> Result<String> {
        debug!(endpoint, action, "posting SOAP request");

        let response = self
            .http
            .post(endpoint)
            .header(CONTENT_TYPE, TEXT_XML)
            .header("SOAPAction", format!("\"{action}\""))
            .body(envelope.to_string())
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(Error::Transport(format!(
                "HTTP {status} from {endpoint}: {}",
                snippet(&body)
            )));
        }

        Ok(body)
    }
}

fn snippet(body: &str) -> &str {
    let end = body
        .char_indices()
        .nth(200)
        .map(|(i, _)| i)
        .unwrap_or(body.len());
    &body[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::Environment;

    const CERT: &str = include_str!("../test_data/client_cert.pem");
    const KEY: &str = include_str!("../test_data/client_key.pem");

    #[test]
    fn test_configure_credentials_accepts_valid_bag() {
        let bag = CertificationBag::new(CERT, KEY, CERT, Environment::Integration).unwrap();
        let mut transport = HttpTransport::new();
        transport.configure_credentials(&bag).unwrap();
    }

    #[test]
    fn test_with_timeout_is_kept() {
        let transport = HttpTransport::with_timeout(Duration::from_secs(5));
        assert_eq!(transport.timeout(), Duration::from_secs(5));
        assert_eq!(HttpTransport::new().timeout(), DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_snippet_bounds() {
        assert_eq!(snippet("short"), "short");
        let long = "x".repeat(500);
        assert_eq!(snippet(&long).len(), 200);
    }
}
