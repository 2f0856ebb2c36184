use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Unusable certification bag or unresolvable endpoint. Surfaced at
    /// construction time, never mid-call.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Network failure, HTTP error status or SOAP fault. Carries the
    /// underlying fault detail; no retry is attempted at this layer.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response did not pass signature verification against the server
    /// certificate. The response body is never exposed to the caller.
    #[error("invalid certificate: {0}")]
    InvalidCertificate(String),

    /// `validate_last_response` was called before any response was captured.
    #[error("no raw response has been captured yet")]
    NoCapturedResponse,

    #[error("XML processing error: {0}")]
    Xml(String),

    #[error("crypto error: {0}")]
    Crypto(String),

    #[error("PEM parse error: {0}")]
    Pem(#[from] pem::PemError),

    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::Xml(err.to_string())
    }
}

impl From<quick_xml::DeError> for Error {
    fn from(err: quick_xml::DeError) -> Self {
        Error::Xml(err.to_string())
    }
}

impl From<quick_xml::SeError> for Error {
    fn from(err: quick_xml::SeError) -> Self {
        Error::Xml(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::Xml(err.to_string())
    }
}

impl From<openssl::error::ErrorStack> for Error {
    fn from(err: openssl::error::ErrorStack) -> Self {
        Error::Crypto(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(err.to_string())
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(err: std::string::FromUtf8Error) -> Self {
        Error::Utf8(err.utf8_error())
    }
}
