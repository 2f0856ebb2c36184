//! SOAP 1.1 plumbing: request envelope construction for generic named RPCs,
//! normalized deserialization of response payloads and fault detection.

pub mod de;
mod envelope;
mod fault;

pub use envelope::{EnvelopeConfig, RpcParam, body_payload};
pub use fault::{SoapFault, find_fault};

pub mod ns {
    /// SOAP 1.1 envelope namespace
    pub const SOAP_ENV: &str = "http://schemas.xmlsoap.org/soap/envelope/";
    /// Namespace of the Webpay transaction service operations
    pub const WEBPAY: &str = "http://service.wswebpay.webpay.transbank.com/";
}
