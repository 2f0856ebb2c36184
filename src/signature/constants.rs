//! Algorithm URIs, namespaces and PEM tags used by the signature module.

/// XML namespace URIs
pub const XMLDSIG_NAMESPACE: &str = "http://www.w3.org/2000/09/xmldsig#";
pub const XMLDSIG_ENVELOPED_SIGNATURE: &str =
    "http://www.w3.org/2000/09/xmldsig#enveloped-signature";

/// Algorithm URIs. Transbank signs with RSA-SHA256 over exclusive C14N.
pub const RSA_SHA256_ALGORITHM: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256";
pub const SHA256_DIGEST_ALGORITHM: &str = "http://www.w3.org/2001/04/xmlenc#sha256";
pub const EXCLUSIVE_C14N_ALGORITHM: &str = "http://www.w3.org/2001/10/xml-exc-c14n#";

/// XML element and attribute names
pub const SIGNATURE_VALUE_ELEMENT: &str = "SignatureValue";
pub const X509_CERTIFICATE_ELEMENT: &str = "X509Certificate";
pub const DIGEST_VALUE_ELEMENT: &str = "DigestValue";
pub const SIGNATURE_METHOD_ELEMENT: &str = "SignatureMethod";
pub const CANONICALIZATION_METHOD_ELEMENT: &str = "CanonicalizationMethod";
pub const DIGEST_METHOD_ELEMENT: &str = "DigestMethod";
pub const ALGORITHM_ATTRIBUTE: &str = "Algorithm";

/// PEM tags accepted for certificates
pub const CERTIFICATE_PEM_TAGS: &[&str] = &["CERTIFICATE", "X509 CERTIFICATE", "TRUSTED CERTIFICATE"];

/// PEM tags accepted for private keys
pub const PRIVATE_KEY_PEM_TAGS: &[&str] = &["PRIVATE KEY", "RSA PRIVATE KEY"];
