//! Deserialization of response payloads. Gateways pretty-print their
//! envelopes, so indentation whitespace is stripped before handing the
//! document to serde.

use quick_xml::de::from_str as quick_xml_from_str;
use quick_xml::events::Event;
use quick_xml::{Reader, Writer};
use serde::Deserialize;

use crate::error::{Error, Result};

/// Deserialize an instance of type T from a string of XML text.
pub fn from_str<T>(xml: &str) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
{
    if !xml.contains('\n') && !xml.contains('\r') {
        return quick_xml_from_str(xml).map_err(Error::from);
    }

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut buf = Vec::new();
    let mut output_buf = Vec::with_capacity(xml.len());
    let mut writer = Writer::new(&mut output_buf);

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Text(e) => {
                let mut text = e.into_owned();
                text.inplace_trim_start();
                let empty = text.inplace_trim_end();
                if !empty {
                    writer
                        .write_event(Event::Text(text))
                        .map_err(|e| Error::Xml(e.to_string()))?;
                }
            }
            Event::Eof => break,
            event => writer
                .write_event(event)
                .map_err(|e| Error::Xml(e.to_string()))?,
        }
        buf.clear();
    }

    let normalized_xml = std::str::from_utf8(&output_buf)?;

    quick_xml_from_str(normalized_xml).map_err(Error::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct StatusResponse {
        #[serde(rename = "return")]
        result: StatusReturn,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct StatusReturn {
        #[serde(rename = "buyOrder")]
        buy_order: String,
        amount: String,
    }

    #[test]
    fn test_deserialize_single_line() {
        let xml = "<statusResponse><return><buyOrder>100</buyOrder>\
                   <amount>2500.00</amount></return></statusResponse>";
        let parsed: StatusResponse = from_str(xml).unwrap();
        assert_eq!(parsed.result.buy_order, "100");
        assert_eq!(parsed.result.amount, "2500.00");
    }

    #[test]
    fn test_deserialize_pretty_printed() {
        let xml = "<statusResponse>\n  <return>\n    <buyOrder>100</buyOrder>\n    \
                   <amount>2500.00</amount>\n  </return>\n</statusResponse>";
        let parsed: StatusResponse = from_str(xml).unwrap();
        assert_eq!(parsed.result.buy_order, "100");
    }

    #[test]
    fn test_deserialize_malformed() {
        let result: Result<StatusResponse> = from_str("<statusResponse><return>");
        assert!(result.is_err());
    }
}
