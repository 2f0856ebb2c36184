//! Signature validation for inbound SOAP responses.
//!
//! The embedded certificate is pinned against the trusted server
//! certificate before any cryptographic check: a response signed by any
//! other certificate is rejected outright.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use openssl::hash::MessageDigest;
use openssl::sign::Verifier;
use openssl::x509::X509;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use super::SignatureValidator;
use super::c14n;
use super::constants::*;
use super::types::SignatureComponents;
use super::utils::{
    attribute_of, contains_signature, element_text, extract_signed_info,
    remove_signatures_from_xml,
};
use crate::error::Result;

/// XMLDSig validator for signed response documents.
#[derive(Debug, Default)]
pub struct XmlSignatureValidator;

impl XmlSignatureValidator {
    pub fn new() -> Self {
        Self
    }

    fn extract_components(&self, xml: &str) -> Result<SignatureComponents> {
        Ok(SignatureComponents {
            signature_value_b64: element_text(xml, SIGNATURE_VALUE_ELEMENT)?,
            certificate_b64: element_text(xml, X509_CERTIFICATE_ELEMENT)?,
            signature_algorithm: attribute_of(xml, SIGNATURE_METHOD_ELEMENT, ALGORITHM_ATTRIBUTE)?,
            canonicalization_algorithm: attribute_of(
                xml,
                CANONICALIZATION_METHOD_ELEMENT,
                ALGORITHM_ATTRIBUTE,
            )?,
            digest_algorithm: attribute_of(xml, DIGEST_METHOD_ELEMENT, ALGORITHM_ATTRIBUTE)?,
            digest_value_b64: element_text(xml, DIGEST_VALUE_ELEMENT)?,
        })
    }

    fn algorithms_supported(&self, components: &SignatureComponents) -> bool {
        components.signature_algorithm == RSA_SHA256_ALGORITHM
            && components.digest_algorithm == SHA256_DIGEST_ALGORITHM
            && components.canonicalization_algorithm == EXCLUSIVE_C14N_ALGORITHM
    }

    /// Parse the certificate embedded in the signature, check its validity
    /// window and pin it against the trusted server certificate.
    fn pinned_certificate(
        &self,
        components: &SignatureComponents,
        trusted_cert_pem: &[u8],
    ) -> Result<Option<X509>> {
        let cert_der = match BASE64.decode(&components.certificate_b64) {
            Ok(der) => der,
            Err(e) => {
                warn!("failed to decode embedded certificate: {e}");
                return Ok(None);
            }
        };
        let certificate = match X509::from_der(&cert_der) {
            Ok(cert) => cert,
            Err(e) => {
                warn!("failed to parse embedded certificate: {e}");
                return Ok(None);
            }
        };

        let now = openssl::asn1::Asn1Time::days_from_now(0)?;
        if certificate.not_before() > now {
            warn!("embedded certificate is not yet valid");
            return Ok(None);
        }
        if certificate.not_after() < now {
            warn!("embedded certificate has expired");
            return Ok(None);
        }

        // The trusted certificate comes from an already-validated bag, so a
        // parse failure here is an infrastructure error, not a bad response.
        let trusted = X509::from_pem(trusted_cert_pem)?;
        if trusted.to_der()? != cert_der {
            warn!("embedded certificate does not match the pinned server certificate");
            return Ok(None);
        }

        Ok(Some(certificate))
    }

    fn verify_digest(&self, document: &str, expected_digest_b64: &str) -> Result<bool> {
        // Enveloped-signature transform before hashing
        let content = remove_signatures_from_xml(document)?;

        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        let calculated_b64 = BASE64.encode(hasher.finalize());

        Ok(calculated_b64 == expected_digest_b64)
    }

    fn verify_signature_value(
        &self,
        document: &str,
        components: &SignatureComponents,
        certificate: &X509,
    ) -> Result<bool> {
        // The signature covers the SignedInfo exactly as the signer
        // canonicalized it, so verify the document's own SignedInfo subtree
        // rather than a reconstruction. Extraction copies inherited
        // namespace declarations onto the root; exclusive C14N drops the
        // ones the subtree does not use.
        let Some(signed_info_xml) = extract_signed_info(document)? else {
            warn!("no SignedInfo element found in signature");
            return Ok(false);
        };
        let signed_info_c14n = c14n::canonicalize(&signed_info_xml)?;

        let signature_bytes = match BASE64.decode(&components.signature_value_b64) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("failed to decode signature value: {e}");
                return Ok(false);
            }
        };

        let public_key = certificate.public_key()?;
        let mut verifier = Verifier::new(MessageDigest::sha256(), &public_key)?;
        verifier.update(signed_info_c14n.as_bytes())?;
        Ok(verifier.verify(&signature_bytes)?)
    }
}

impl SignatureValidator for XmlSignatureValidator {
    fn validate(&self, document: &str, trusted_cert_pem: &[u8]) -> Result<bool> {
        if !contains_signature(document) {
            warn!("no XML signature found in response document");
            return Ok(false);
        }

        let components = match self.extract_components(document) {
            Ok(components) => components,
            Err(e) => {
                warn!("failed to extract signature components: {e}");
                return Ok(false);
            }
        };

        if !self.algorithms_supported(&components) {
            warn!(
                signature = %components.signature_algorithm,
                digest = %components.digest_algorithm,
                c14n = %components.canonicalization_algorithm,
                "unsupported signature algorithms"
            );
            return Ok(false);
        }

        let Some(certificate) = self.pinned_certificate(&components, trusted_cert_pem)? else {
            return Ok(false);
        };

        if !self.verify_digest(document, &components.digest_value_b64)? {
            warn!("digest value verification failed");
            return Ok(false);
        }

        let valid = self.verify_signature_value(document, &components, &certificate)?;
        if valid {
            debug!("response signature verified against pinned certificate");
        } else {
            warn!("cryptographic signature verification failed");
        }
        Ok(valid)
    }
}
