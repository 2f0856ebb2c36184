//! The signed-RPC client: generic named calls over a mutually-authenticated
//! transport, with signature verification as a mandatory post-condition of
//! every call.
//!
//! Transport success and trust are two independent gates: a call that
//! completes at the HTTP layer is still discarded unless its response
//! document verifies against the bag's server certificate. This defends
//! against a spoofed network path returning a syntactically valid but
//! unsigned or forged response.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info};

use crate::credentials::{CertificationBag, Environment};
use crate::error::{Error, Result};
use crate::signature::{SignatureValidator, XmlSignatureValidator};
use crate::soap::{self, EnvelopeConfig, RpcParam};
use crate::transport::{HttpTransport, SoapTransport};

/// Fixed endpoint URL pair of a Webpay SOAP service. The environment tag of
/// the certification bag selects which one is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceEndpoints {
    pub production: &'static str,
    pub integration: &'static str,
}

impl ServiceEndpoints {
    pub fn resolve(&self, environment: Environment) -> &'static str {
        match environment {
            Environment::Production => self.production,
            Environment::Integration => self.integration,
        }
    }
}

/// Webpay transaction service (normal and deferred payments).
pub const WEBPAY_TRANSACTION: ServiceEndpoints = ServiceEndpoints {
    production: "https://webpay3g.transbank.cl/WSWebpayTransaction/cxf/WSWebpayService?wsdl",
    integration: "https://webpay3gint.transbank.cl/WSWebpayTransaction/cxf/WSWebpayService?wsdl",
};

/// OneClick payment service (stored-card charges).
pub const ONECLICK_PAYMENT: ServiceEndpoints = ServiceEndpoints {
    production: "https://webpay3g.transbank.cl/webpayserver/wswebpay/OneClickPaymentService?wsdl",
    integration:
        "https://webpay3gint.transbank.cl/webpayserver/wswebpay/OneClickPaymentService?wsdl",
};

/// Effective endpoint: an explicit override always wins, otherwise the
/// bag's environment picks one of the service's fixed URLs.
pub fn resolve_endpoint(
    service: &ServiceEndpoints,
    environment: Environment,
    url: Option<&str>,
) -> Result<String> {
    match url {
        Some(url) if !url.trim().is_empty() => Ok(url.to_string()),
        Some(_) => Err(Error::Configuration(
            "explicit endpoint URL must not be empty".into(),
        )),
        None => Ok(service.resolve(environment).to_string()),
    }
}

/// A verified response: the raw envelope text exactly as received, plus the
/// extracted Body payload. Only responses that passed signature
/// verification ever become a `SoapResponse`.
#[derive(Debug, Clone)]
pub struct SoapResponse {
    raw: String,
    body: String,
}

impl SoapResponse {
    /// The verified envelope, byte-for-byte as the transport returned it.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The first payload element of the SOAP Body.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Deserialize the Body payload into a typed result. Callers build
    /// small typed wrappers per RPC on top of this.
    pub fn deserialize<T>(&self) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        soap::de::from_str(&self.body)
    }
}

/// The remote gateway produced a document we cannot read, which is a
/// transport failure, not a local XML bug.
fn malformed_response(err: Error) -> Error {
    match err {
        Error::Xml(detail) => Error::Transport(format!("malformed response document: {detail}")),
        other => other,
    }
}

pub struct SignedSoapClient {
    certification_bag: Arc<CertificationBag>,
    endpoint: String,
    transport: Box<dyn SoapTransport>,
    validator: Box<dyn SignatureValidator>,
    envelope: EnvelopeConfig,
    last_response: Option<String>,
}

impl SignedSoapClient {
    /// Build a client against one of the fixed Webpay services, optionally
    /// overriding the endpoint URL. The transport is configured with the
    /// bag's client certificate and private key here, once.
    pub fn new(
        bag: Arc<CertificationBag>,
        service: &ServiceEndpoints,
        url: Option<&str>,
    ) -> Result<Self> {
        Self::with_transport(bag, service, url, Box::new(HttpTransport::new()))
    }

    /// Same as [`new`](Self::new) with a caller-supplied transport, e.g. an
    /// [`HttpTransport`] carrying a configured timeout.
    pub fn with_transport(
        bag: Arc<CertificationBag>,
        service: &ServiceEndpoints,
        url: Option<&str>,
        transport: Box<dyn SoapTransport>,
    ) -> Result<Self> {
        let endpoint = resolve_endpoint(service, bag.environment(), url)?;
        Self::with_parts(
            bag,
            endpoint,
            transport,
            Box::new(XmlSignatureValidator::new()),
        )
    }

    /// Wire a client from explicit collaborators. Used by tests and by
    /// callers bringing their own transport or validator.
    pub fn with_parts(
        bag: Arc<CertificationBag>,
        endpoint: impl Into<String>,
        mut transport: Box<dyn SoapTransport>,
        validator: Box<dyn SignatureValidator>,
    ) -> Result<Self> {
        transport.configure_credentials(&bag)?;
        Ok(Self {
            certification_bag: bag,
            endpoint: endpoint.into(),
            transport,
            validator,
            envelope: EnvelopeConfig::default(),
            last_response: None,
        })
    }

    /// Replace the envelope rendering configuration.
    pub fn with_envelope_config(mut self, envelope: EnvelopeConfig) -> Self {
        self.envelope = envelope;
        self
    }

    /// Call a named remote method with positional parameters. Any method
    /// name the remote service understands is forwarded as-is.
    ///
    /// The returned response has already passed signature verification
    /// against the bag's server certificate; a response that does not
    /// verify is discarded and surfaces as [`Error::InvalidCertificate`],
    /// even though the transport call itself succeeded.
    pub async fn invoke(&mut self, method: &str, params: &[RpcParam]) -> Result<SoapResponse> {
        let request = self.envelope.render(method, params)?;

        debug!(method, endpoint = %self.endpoint, "dispatching signed RPC");
        let raw = self
            .transport
            .dispatch(&self.endpoint, method, &request)
            .await?;

        // Faults and unparseable documents are transport-level failures:
        // nothing is captured and signature validation is never attempted.
        if let Some(fault) = soap::find_fault(&raw).map_err(malformed_response)? {
            return Err(Error::Transport(format!("SOAP fault {fault}")));
        }
        let body = soap::body_payload(&raw).map_err(malformed_response)?;

        // Most recent call only; no accumulation across calls. Captured
        // before verification so `validate_last_response` reproduces the
        // outcome of the gate below.
        self.last_response = Some(raw.clone());

        self.verify(&raw)?;
        info!(method, "verified response received");
        Ok(SoapResponse { raw, body })
    }

    /// Re-run signature verification over the most recently captured raw
    /// response without making a new call. Idempotent over the same
    /// capture.
    pub fn validate_last_response(&self) -> Result<()> {
        match self.last_response.as_deref() {
            Some(raw) => self.verify(raw),
            None => Err(Error::NoCapturedResponse),
        }
    }

    /// Swap the certification bag on a live client. Credentials are
    /// re-applied to the transport first; only if that succeeds is the bag
    /// replaced, so the channel identity and the verification certificate
    /// never diverge. The endpoint resolved at construction is kept.
    pub fn replace_certification_bag(&mut self, bag: Arc<CertificationBag>) -> Result<()> {
        self.transport.configure_credentials(&bag)?;
        self.certification_bag = bag;
        Ok(())
    }

    pub fn certification_bag(&self) -> &Arc<CertificationBag> {
        &self.certification_bag
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The raw response captured by the most recent successful dispatch,
    /// if any.
    pub fn last_raw_response(&self) -> Option<&str> {
        self.last_response.as_deref()
    }

    fn verify(&self, raw: &str) -> Result<()> {
        let valid = self
            .validator
            .validate(raw, self.certification_bag.server_certificate())?;

        if valid {
            Ok(())
        } else {
            Err(Error::InvalidCertificate(
                "the response fails on the certificate signature validation".into(),
            ))
        }
    }
}
