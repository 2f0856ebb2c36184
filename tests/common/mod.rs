// Each integration test binary uses a subset of these helpers.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use transbank_webpay::credentials::{CertificationBag, Environment};
use transbank_webpay::error::{Error, Result};
use transbank_webpay::transport::SoapTransport;

pub const CLIENT_CERT: &str = include_str!("../../test_data/client_cert.pem");
pub const CLIENT_KEY: &str = include_str!("../../test_data/client_key.pem");
pub const SERVER_CERT: &str = include_str!("../../test_data/server_cert.pem");
pub const SERVER_KEY: &str = include_str!("../../test_data/server_key.pem");

/// Bag pinning the real server certificate.
pub fn make_bag(environment: Environment) -> Arc<CertificationBag> {
    Arc::new(
        CertificationBag::new(CLIENT_CERT, CLIENT_KEY, SERVER_CERT, environment)
            .expect("test bag must be valid"),
    )
}

/// Bag pinning the wrong certificate: responses signed by the server key
/// must fail verification against it.
pub fn make_bag_with_wrong_pin(environment: Environment) -> Arc<CertificationBag> {
    Arc::new(
        CertificationBag::new(CLIENT_CERT, CLIENT_KEY, CLIENT_CERT, environment)
            .expect("test bag must be valid"),
    )
}

pub fn response_envelope(payload: &str) -> String {
    format!(
        "<soapenv:Envelope xmlns:soapenv=\"http://schemas.xmlsoap.org/soap/envelope/\">\
         <soapenv:Body>{payload}</soapenv:Body></soapenv:Envelope>"
    )
}

pub fn fault_envelope(code: &str, message: &str) -> String {
    response_envelope(&format!(
        "<soapenv:Fault><faultcode>{code}</faultcode>\
         <faultstring>{message}</faultstring></soapenv:Fault>"
    ))
}

/// A dispatched request as seen by the scripted transport.
#[derive(Debug, Clone)]
pub struct SentRequest {
    pub endpoint: String,
    pub action: String,
    pub envelope: String,
}

/// Transport double replaying scripted outcomes in order. Records every
/// dispatched request and counts credential configuration calls.
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<std::result::Result<String, String>>>,
    pub requests: Arc<Mutex<Vec<SentRequest>>>,
    pub configured: Arc<AtomicUsize>,
}

impl ScriptedTransport {
    pub fn new(
        responses: impl IntoIterator<Item = std::result::Result<String, String>>,
    ) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            requests: Arc::new(Mutex::new(Vec::new())),
            configured: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn replying(response: &str) -> Self {
        Self::new([Ok(response.to_string())])
    }

    pub fn failing(detail: &str) -> Self {
        Self::new([Err(detail.to_string())])
    }
}

#[async_trait]
impl SoapTransport for ScriptedTransport {
    fn configure_credentials(&mut self, _bag: &CertificationBag) -> Result<()> {
        self.configured.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn dispatch(&self, endpoint: &str, action: &str, envelope: &str) -> Result<String> {
        self.requests.lock().unwrap().push(SentRequest {
            endpoint: endpoint.to_string(),
            action: action.to_string(),
            envelope: envelope.to_string(),
        });

        let scripted = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("scripted transport ran out of responses");

        scripted.map_err(Error::Transport)
    }
}
