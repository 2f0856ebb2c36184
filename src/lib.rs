pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod signature;
pub mod soap;
pub mod telemetry;
pub mod transport;

pub use client::{
    ONECLICK_PAYMENT, ServiceEndpoints, SignedSoapClient, SoapResponse, WEBPAY_TRANSACTION,
};
pub use credentials::{CertificationBag, Environment};
pub use error::{Error, Result};
pub use soap::RpcParam;
