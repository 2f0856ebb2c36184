use std::fmt;

use serde::Deserialize;

use crate::error::Result;
use crate::soap::envelope::extract_first_element;

/// A SOAP 1.1 fault returned in place of a method response. Faults are
/// transport-level failures: the client surfaces them before any signature
/// validation is attempted.
#[derive(Debug, Clone, Deserialize)]
pub struct SoapFault {
    #[serde(rename = "faultcode")]
    pub code: String,
    #[serde(rename = "faultstring")]
    pub message: String,
}

impl fmt::Display for SoapFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// Look for a `Fault` element in a response envelope.
pub fn find_fault(xml: &str) -> Result<Option<SoapFault>> {
    let Some(fault_xml) = extract_first_element(xml, "Fault")? else {
        return Ok(None);
    };
    let fault = crate::soap::de::from_str(&fault_xml)?;
    Ok(Some(fault))
}
