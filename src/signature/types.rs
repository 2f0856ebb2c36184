//! Serde structures for the XMLDSig elements the signer emits and the
//! validator reconstructs.

use serde::{Deserialize, Serialize};

/// Generic XML element carrying only an `Algorithm` attribute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlgorithmElement {
    #[serde(rename = "@Algorithm")]
    pub algorithm: String,
}

pub type CanonicalizationMethod = AlgorithmElement;
pub type SignatureMethod = AlgorithmElement;
pub type DigestMethod = AlgorithmElement;
pub type Transform = AlgorithmElement;

#[derive(Debug, Clone, Serialize)]
pub struct Transforms {
    #[serde(rename = "Transform")]
    pub transform: Transform,
}

#[derive(Debug, Clone, Serialize)]
pub struct Reference {
    #[serde(rename = "@URI")]
    pub uri: String,
    #[serde(rename = "Transforms")]
    pub transforms: Transforms,
    #[serde(rename = "DigestMethod")]
    pub digest_method: DigestMethod,
    #[serde(rename = "DigestValue")]
    pub digest_value: String,
}

/// The element the signature actually covers. Its canonical form must come
/// out identical whether serialized standalone or embedded in the document,
/// otherwise the round trip does not hold.
#[derive(Debug, Serialize)]
pub struct SignedInfo {
    #[serde(rename = "@xmlns", skip_serializing_if = "Option::is_none")]
    pub xmlns: Option<String>,
    #[serde(rename = "CanonicalizationMethod")]
    pub canonicalization_method: CanonicalizationMethod,
    #[serde(rename = "SignatureMethod")]
    pub signature_method: SignatureMethod,
    #[serde(rename = "Reference")]
    pub reference: Reference,
}

#[derive(Debug, Serialize)]
pub struct SignatureValue {
    #[serde(rename = "$text")]
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct X509Certificate {
    #[serde(rename = "$text")]
    pub certificate: String,
}

#[derive(Debug, Serialize)]
pub struct X509Data {
    #[serde(rename = "X509Certificate")]
    pub x509_certificate: X509Certificate,
}

#[derive(Debug, Serialize)]
pub struct KeyInfo {
    #[serde(rename = "X509Data")]
    pub x509_data: X509Data,
}

#[derive(Debug, Serialize)]
pub struct Signature {
    #[serde(rename = "@xmlns")]
    pub xmlns: String,
    #[serde(rename = "SignedInfo")]
    pub signed_info: SignedInfo,
    #[serde(rename = "SignatureValue")]
    pub signature_value: SignatureValue,
    #[serde(rename = "KeyInfo")]
    pub key_info: KeyInfo,
}

/// Raw signature components extracted from a response document.
#[derive(Debug)]
pub struct SignatureComponents {
    pub signature_value_b64: String,
    pub certificate_b64: String,
    pub signature_algorithm: String,
    pub canonicalization_algorithm: String,
    pub digest_algorithm: String,
    pub digest_value_b64: String,
}
