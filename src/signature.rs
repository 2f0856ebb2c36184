//! XMLDSig handling for Transbank's signed SOAP responses.
//!
//! The client treats signature validation as a capability behind the
//! [`SignatureValidator`] trait; [`XmlSignatureValidator`] is the shipped
//! implementation, pinning the embedded certificate against the bag's
//! server certificate before any cryptographic check. The matching
//! [`XmlSignatureSigner`] produces documents the validator accepts and is
//! used by the test suites and local tooling.

mod c14n;
pub mod constants;
mod signer;
mod types;
pub mod utils;
mod validator;

pub use signer::XmlSignatureSigner;
pub use types::SignatureComponents;
pub use validator::XmlSignatureValidator;

use crate::error::Result;

/// Capability consumed by the client: given a raw response document and a
/// trusted certificate (PEM), decide whether the document is validly signed
/// by that certificate.
///
/// A malformed or unsigned document is a negative answer, not an error;
/// `Err` is reserved for infrastructure failures (the client fails closed
/// either way).
pub trait SignatureValidator: Send + Sync {
    fn validate(&self, document: &str, trusted_cert_pem: &[u8]) -> Result<bool>;
}
