use std::io::Cursor;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::{Error, Result};
use crate::soap::ns;

const XML_VERSION: &str = "1.0";
const UTF8: &str = "UTF-8";

/// A named positional parameter of a remote call. Values are rendered as
/// text content of the parameter element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcParam {
    name: String,
    value: String,
}

impl RpcParam {
    pub fn new(name: impl Into<String>, value: impl ToString) -> Self {
        Self {
            name: name.into(),
            value: value.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

/// Configuration for request envelope rendering: the explicit replacement
/// for process-wide classmap state. One instance per client, passed at
/// construction.
#[derive(Debug, Clone)]
pub struct EnvelopeConfig {
    pub xml_decl: bool,
    pub encoding: String,
    pub service_namespace: String,
    pub service_prefix: String,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            xml_decl: true,
            encoding: UTF8.to_string(),
            service_namespace: ns::WEBPAY.to_string(),
            service_prefix: "tns".to_string(),
        }
    }
}

impl EnvelopeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set this flag to false to omit the XML declaration. Default is true.
    pub fn xml_decl(mut self, decl: bool) -> Self {
        self.xml_decl = decl;
        self
    }

    /// Set the encoding of the XML document. Default is "UTF-8".
    pub fn encoding<S: ToString>(mut self, encoding: S) -> Self {
        self.encoding = encoding.to_string();
        self
    }

    /// Set the namespace the operation elements live in. Default is the
    /// Webpay transaction service namespace.
    pub fn service_namespace<S: ToString>(mut self, uri: S) -> Self {
        self.service_namespace = uri.to_string();
        self
    }

    /// Set the prefix bound to the service namespace. Default is "tns".
    pub fn service_prefix<S: ToString>(mut self, prefix: S) -> Self {
        self.service_prefix = prefix.to_string();
        self
    }

    /// Render a request envelope for a named remote call with positional
    /// parameters. The method name is forwarded as-is; there is no fixed
    /// operation list.
    pub fn render(&self, method: &str, params: &[RpcParam]) -> Result<String> {
        check_xml_name(method)?;
        for param in params {
            check_xml_name(param.name())?;
        }

        let mut writer = Writer::new(Cursor::new(Vec::new()));

        if self.xml_decl {
            writer.write_event(Event::Decl(BytesDecl::new(
                XML_VERSION,
                Some(&self.encoding),
                None,
            )))?;
        }

        let mut envelope = BytesStart::new("soapenv:Envelope");
        envelope.push_attribute(("xmlns:soapenv", ns::SOAP_ENV));
        envelope.push_attribute((
            format!("xmlns:{}", self.service_prefix).as_str(),
            self.service_namespace.as_str(),
        ));
        writer.write_event(Event::Start(envelope))?;
        writer.write_event(Event::Empty(BytesStart::new("soapenv:Header")))?;
        writer.write_event(Event::Start(BytesStart::new("soapenv:Body")))?;

        let operation = format!("{}:{method}", self.service_prefix);
        writer.write_event(Event::Start(BytesStart::new(operation.as_str())))?;
        for param in params {
            writer.write_event(Event::Start(BytesStart::new(param.name())))?;
            writer.write_event(Event::Text(BytesText::new(param.value())))?;
            writer.write_event(Event::End(BytesEnd::new(param.name())))?;
        }
        writer.write_event(Event::End(BytesEnd::new(operation.as_str())))?;

        writer.write_event(Event::End(BytesEnd::new("soapenv:Body")))?;
        writer.write_event(Event::End(BytesEnd::new("soapenv:Envelope")))?;

        Ok(String::from_utf8(writer.into_inner().into_inner())?)
    }
}

/// Method and parameter names end up as element names; reject anything that
/// could break out of the markup.
fn check_xml_name(name: &str) -> Result<()> {
    let valid_start = name
        .chars()
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);
    let valid_rest = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.');

    if valid_start && valid_rest {
        Ok(())
    } else {
        Err(Error::Xml(format!("invalid XML element name: '{name}'")))
    }
}

/// Extract the payload of a response envelope: the first child element of
/// the SOAP Body that is not a Signature.
pub fn body_payload(xml: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);
    reader.config_mut().expand_empty_elements = true;

    let mut writer = Writer::new(Cursor::new(Vec::new()));
    let mut buf = Vec::new();
    let mut in_body = false;
    let mut capturing = false;
    let mut skip_depth = 0usize;
    let mut depth = 0usize;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if skip_depth > 0 {
                    skip_depth += 1;
                } else if capturing {
                    depth += 1;
                    writer.write_event(Event::Start(e.to_owned()))?;
                } else if !in_body {
                    if e.name().local_name().as_ref() == b"Body" {
                        in_body = true;
                    }
                } else if e.name().local_name().as_ref() == b"Signature" {
                    skip_depth = 1;
                } else {
                    capturing = true;
                    depth = 1;
                    writer.write_event(Event::Start(e.to_owned()))?;
                }
            }
            Ok(Event::End(e)) => {
                if skip_depth > 0 {
                    skip_depth -= 1;
                } else if capturing {
                    writer.write_event(Event::End(e.to_owned()))?;
                    depth -= 1;
                    if depth == 0 {
                        return Ok(String::from_utf8(writer.into_inner().into_inner())?);
                    }
                } else if in_body && e.name().local_name().as_ref() == b"Body" {
                    break;
                }
            }
            Ok(Event::Eof) => break,
            Ok(e) => {
                if capturing && skip_depth == 0 {
                    writer.write_event(e)?;
                }
            }
            Err(e) => return Err(Error::Xml(e.to_string())),
        }
        buf.clear();
    }

    Err(Error::Xml("no payload element found in SOAP Body".into()))
}

/// Extract the first element with the given local name, subtree included.
pub(crate) fn extract_first_element(xml: &str, local_name: &str) -> Result<Option<String>> {
    let target = local_name.as_bytes();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);
    reader.config_mut().expand_empty_elements = true;

    let mut writer = Writer::new(Cursor::new(Vec::new()));
    let mut buf = Vec::new();
    let mut capturing = false;
    let mut depth = 0usize;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if capturing {
                    depth += 1;
                    writer.write_event(Event::Start(e.to_owned()))?;
                } else if e.name().local_name().as_ref() == target {
                    capturing = true;
                    depth = 1;
                    writer.write_event(Event::Start(e.to_owned()))?;
                }
            }
            Ok(Event::End(e)) if capturing => {
                writer.write_event(Event::End(e.to_owned()))?;
                depth -= 1;
                if depth == 0 {
                    return Ok(Some(String::from_utf8(writer.into_inner().into_inner())?));
                }
            }
            Ok(Event::Eof) => break,
            Ok(e) => {
                if capturing {
                    writer.write_event(e)?;
                }
            }
            Err(e) => return Err(Error::Xml(e.to_string())),
        }
        buf.clear();
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_basic_envelope() {
        let config = EnvelopeConfig::new();
        let xml = config
            .render(
                "getTransactionStatus",
                &[RpcParam::new("tokenInput", "token123")],
            )
            .unwrap();

        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(xml.contains(r#"xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/""#));
        assert!(xml.contains("<tns:getTransactionStatus>"));
        assert!(xml.contains("<tokenInput>token123</tokenInput>"));
        assert!(xml.contains("</tns:getTransactionStatus>"));
    }

    #[test]
    fn test_render_escapes_values() {
        let config = EnvelopeConfig::new();
        let xml = config
            .render("initTransaction", &[RpcParam::new("buyOrder", "a<b&c")])
            .unwrap();
        assert!(xml.contains("<buyOrder>a&lt;b&amp;c</buyOrder>"));
    }

    #[test]
    fn test_render_rejects_markup_in_names() {
        let config = EnvelopeConfig::new();
        assert!(config.render("evil><injected", &[]).is_err());
        assert!(
            config
                .render("ok", &[RpcParam::new("a b", "v")])
                .is_err()
        );
        assert!(config.render("", &[]).is_err());
    }

    #[test]
    fn test_render_without_decl_and_custom_prefix() {
        let config = EnvelopeConfig::new()
            .xml_decl(false)
            .service_prefix("ws")
            .service_namespace("urn:example");
        let xml = config.render("commit", &[]).unwrap();
        assert!(!xml.contains("<?xml"));
        assert!(xml.contains(r#"xmlns:ws="urn:example""#));
        assert!(xml.contains("<ws:commit></ws:commit>"));
    }

    #[test]
    fn test_body_payload_extracts_first_child() {
        let xml = "<soapenv:Envelope><soapenv:Body>\
                   <ns2:statusResponse><return>OK</return></ns2:statusResponse>\
                   </soapenv:Body></soapenv:Envelope>";
        let payload = body_payload(xml).unwrap();
        assert_eq!(
            payload,
            "<ns2:statusResponse><return>OK</return></ns2:statusResponse>"
        );
    }

    #[test]
    fn test_body_payload_skips_signature() {
        let xml = "<e><Body><Signature><SignedInfo></SignedInfo></Signature>\
                   <resp>v</resp></Body></e>";
        assert_eq!(body_payload(xml).unwrap(), "<resp>v</resp>");
    }

    #[test]
    fn test_body_payload_missing() {
        assert!(body_payload("<e><Body></Body></e>").is_err());
        assert!(body_payload("<e>no body</e>").is_err());
    }

    #[test]
    fn test_extract_first_element() {
        let xml = "<a><b attr=\"1\"><c>x</c></b></a>";
        let extracted = extract_first_element(xml, "b").unwrap().unwrap();
        assert_eq!(extracted, "<b attr=\"1\"><c>x</c></b>");
        assert!(extract_first_element(xml, "z").unwrap().is_none());
    }
}
