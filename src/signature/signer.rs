//! XMLDSig signer producing documents [`XmlSignatureValidator`] accepts.
//!
//! Not used on the request path (requests are authenticated by mutual TLS);
//! it exists to build signed fixtures for the test suites and local
//! tooling that plays the gateway's role.
//!
//! [`XmlSignatureValidator`]: super::XmlSignatureValidator

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use quick_xml::se::to_string;
use ring::rand;
use ring::signature::{RSA_PKCS1_SHA256, RsaKeyPair};
use sha2::{Digest, Sha256};
use tracing::debug;

use super::c14n;
use super::constants::*;
use super::types::*;
use super::utils::{parse_and_validate_pem, remove_signatures_from_xml};
use crate::error::{Error, Result};

const BODY_CLOSE_TAGS: &[&str] = &["</soapenv:Body>", "</soap:Body>", "</SOAP-ENV:Body>", "</Body>"];

pub struct XmlSignatureSigner {
    key_pair: RsaKeyPair,
    certificate_b64: String,
    prefix: Option<String>,
}

impl XmlSignatureSigner {
    /// Create a signer from a PKCS#8 private key and a certificate, both PEM.
    pub fn new(private_key_pem: impl AsRef<[u8]>, cert_pem: impl AsRef<[u8]>) -> Result<Self> {
        let key = parse_and_validate_pem(private_key_pem.as_ref(), PRIVATE_KEY_PEM_TAGS)?;
        let cert = parse_and_validate_pem(cert_pem.as_ref(), CERTIFICATE_PEM_TAGS)?;

        let key_pair = RsaKeyPair::from_pkcs8(key.contents())
            .map_err(|e| Error::Crypto(format!("failed to load RSA key pair: {e:?}")))?;

        Ok(Self {
            key_pair,
            certificate_b64: BASE64.encode(cert.contents()),
            prefix: None,
        })
    }

    /// Emit the signature elements under a namespace prefix (`ds` is the
    /// common choice of JAX-WS gateways) instead of the default namespace.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Sign a document: an enveloped XMLDSig signature is inserted at the
    /// end of the SOAP Body (or appended when there is none).
    pub fn sign_document(&self, xml: &str) -> Result<String> {
        let signature_xml = self.build_signature(xml)?;
        Ok(insert_before_body_close(xml, &signature_xml))
    }

    fn build_signature(&self, xml: &str) -> Result<String> {
        // Digest of the document with the enveloped-signature transform applied
        let content = remove_signatures_from_xml(xml)?;
        let content_digest_b64 = BASE64.encode(Sha256::digest(content.as_bytes()));

        let reference = Reference {
            uri: String::new(),
            transforms: Transforms {
                transform: Transform {
                    algorithm: XMLDSIG_ENVELOPED_SIGNATURE.to_string(),
                },
            },
            digest_method: DigestMethod {
                algorithm: SHA256_DIGEST_ALGORITHM.to_string(),
            },
            digest_value: content_digest_b64,
        };

        // The standalone SignedInfo carries the xmldsig namespace; its
        // canonical form is what gets signed, and what the validator
        // recovers from the embedded copy below.
        let signed_info = SignedInfo {
            xmlns: Some(XMLDSIG_NAMESPACE.to_string()),
            canonicalization_method: CanonicalizationMethod {
                algorithm: EXCLUSIVE_C14N_ALGORITHM.to_string(),
            },
            signature_method: SignatureMethod {
                algorithm: RSA_SHA256_ALGORITHM.to_string(),
            },
            reference: reference.clone(),
        };

        let signed_info_xml = self.prefixed(to_string(&signed_info)?);
        let signed_info_c14n = c14n::canonicalize(&signed_info_xml)?;
        let signature_b64 = BASE64.encode(self.sign_bytes(signed_info_c14n.as_bytes())?);

        let signature = Signature {
            xmlns: XMLDSIG_NAMESPACE.to_string(),
            signed_info: SignedInfo {
                // parent Signature element already declares the namespace
                xmlns: None,
                canonicalization_method: CanonicalizationMethod {
                    algorithm: EXCLUSIVE_C14N_ALGORITHM.to_string(),
                },
                signature_method: SignatureMethod {
                    algorithm: RSA_SHA256_ALGORITHM.to_string(),
                },
                reference,
            },
            signature_value: SignatureValue {
                value: signature_b64,
            },
            key_info: KeyInfo {
                x509_data: X509Data {
                    x509_certificate: X509Certificate {
                        certificate: self.certificate_b64.clone(),
                    },
                },
            },
        };

        debug!("built enveloped XMLDSig signature");
        Ok(self.prefixed(to_string(&signature)?))
    }

    fn prefixed(&self, xml: String) -> String {
        match self.prefix.as_deref() {
            Some(prefix) => apply_prefix(&xml, prefix),
            None => xml,
        }
    }

    /// RSA-SHA256 over the canonicalized SignedInfo. ring hashes the message
    /// itself, so the raw canonicalized bytes are passed in.
    fn sign_bytes(&self, message: &[u8]) -> Result<Vec<u8>> {
        let rng = rand::SystemRandom::new();
        let mut signature = vec![0u8; self.key_pair.public().modulus_len()];
        self.key_pair
            .sign(&RSA_PKCS1_SHA256, &rng, message, &mut signature)
            .map_err(|e| Error::Crypto(format!("failed to sign SignedInfo: {e:?}")))?;
        Ok(signature)
    }
}

// Longer names first so `Signature` does not clobber `SignatureValue`,
// nor `Transform` clobber `Transforms`.
const DSIG_ELEMENT_NAMES: &[&str] = &[
    "CanonicalizationMethod",
    "SignatureMethod",
    "SignatureValue",
    "X509Certificate",
    "Signature",
    "SignedInfo",
    "Transforms",
    "Transform",
    "Reference",
    "DigestMethod",
    "DigestValue",
    "KeyInfo",
    "X509Data",
];

/// Rewrite a serialized signature fragment from the default namespace to a
/// prefixed one.
fn apply_prefix(xml: &str, prefix: &str) -> String {
    let mut out = xml.to_string();
    for name in DSIG_ELEMENT_NAMES {
        out = out.replace(&format!("<{name}"), &format!("<{prefix}:{name}"));
        out = out.replace(&format!("</{name}>"), &format!("</{prefix}:{name}>"));
    }
    out.replace(" xmlns=\"", &format!(" xmlns:{prefix}=\""))
}

fn insert_before_body_close(xml: &str, signature: &str) -> String {
    for tag in BODY_CLOSE_TAGS {
        if xml.contains(tag) {
            return xml.replace(tag, &format!("{signature}{tag}"));
        }
    }
    format!("{xml}{signature}")
}
