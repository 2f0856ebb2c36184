//! Certification bag: the bundle of credentials used to authenticate
//! outbound calls (client certificate + private key, mutual TLS) and to
//! verify inbound responses (pinned server certificate).

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use secrecy::{ExposeSecret, SecretSlice};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::signature::constants::{CERTIFICATE_PEM_TAGS, PRIVATE_KEY_PEM_TAGS};
use crate::signature::utils::parse_and_validate_pem;

/// Which Transbank environment the credentials belong to. Selects the
/// service endpoint when no explicit URL override is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Production,
    Integration,
}

impl FromStr for Environment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" => Ok(Environment::Production),
            "integration" => Ok(Environment::Integration),
            other => Err(Error::Configuration(format!(
                "unrecognized environment '{other}', expected 'production' or 'integration'"
            ))),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Production => write!(f, "production"),
            Environment::Integration => write!(f, "integration"),
        }
    }
}

/// Immutable credential bundle. All three PEM blobs are parsed and
/// tag-checked at construction, so an invalid bag fails fast instead of
/// surfacing as an opaque TLS or verification failure later.
///
/// The bag is shared read-only between clients; wrap it in an `Arc`.
#[derive(Debug)]
pub struct CertificationBag {
    client_certificate: Vec<u8>,
    client_private_key: SecretSlice<u8>,
    server_certificate: Vec<u8>,
    environment: Environment,
}

impl CertificationBag {
    pub fn new(
        client_certificate: impl Into<Vec<u8>>,
        client_private_key: impl Into<Vec<u8>>,
        server_certificate: impl Into<Vec<u8>>,
        environment: Environment,
    ) -> Result<Self> {
        let client_certificate = client_certificate.into();
        let client_private_key = client_private_key.into();
        let server_certificate = server_certificate.into();

        parse_and_validate_pem(&client_certificate, CERTIFICATE_PEM_TAGS)
            .map_err(|e| Error::Configuration(format!("invalid client certificate: {e}")))?;
        parse_and_validate_pem(&client_private_key, PRIVATE_KEY_PEM_TAGS)
            .map_err(|e| Error::Configuration(format!("invalid client private key: {e}")))?;
        parse_and_validate_pem(&server_certificate, CERTIFICATE_PEM_TAGS)
            .map_err(|e| Error::Configuration(format!("invalid server certificate: {e}")))?;

        Ok(Self {
            client_certificate,
            client_private_key: SecretSlice::new(client_private_key.into()),
            server_certificate,
            environment,
        })
    }

    /// Build a bag from PEM files on disk.
    pub fn from_files(
        client_certificate: impl AsRef<Path>,
        client_private_key: impl AsRef<Path>,
        server_certificate: impl AsRef<Path>,
        environment: Environment,
    ) -> Result<Self> {
        let read = |path: &Path| -> Result<Vec<u8>> {
            fs::read(path).map_err(|e| {
                Error::Configuration(format!("failed to read {}: {e}", path.display()))
            })
        };

        Self::new(
            read(client_certificate.as_ref())?,
            read(client_private_key.as_ref())?,
            read(server_certificate.as_ref())?,
            environment,
        )
    }

    pub fn client_certificate(&self) -> &[u8] {
        &self.client_certificate
    }

    pub fn client_private_key(&self) -> &[u8] {
        self.client_private_key.expose_secret()
    }

    pub fn server_certificate(&self) -> &[u8] {
        &self.server_certificate
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }
}
