//! XML and PEM helpers shared by the signer, the validator and the
//! credentials module.

use std::io::Cursor;

use quick_xml::events::Event;
use quick_xml::{Reader, Writer};

use crate::error::{Error, Result};

/// Parse PEM content and check its tag against an expected set.
pub fn parse_and_validate_pem(pem_data: &[u8], expected_tags: &[&str]) -> Result<pem::Pem> {
    let parsed = pem::parse(pem_data)?;

    if !expected_tags.contains(&parsed.tag()) {
        return Err(Error::Configuration(format!(
            "expected one of {:?} in PEM, found: {}",
            expected_tags,
            parsed.tag()
        )));
    }

    Ok(parsed)
}

/// Text content of the first element with the given local name.
pub fn element_text(xml: &str, local_name: &str) -> Result<String> {
    let target = local_name.as_bytes();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut capturing = false;
    let mut text = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if !capturing && e.name().local_name().as_ref() == target => {
                capturing = true;
            }
            Ok(Event::Text(e)) if capturing => {
                let content = e.xml_content().map_err(|e| Error::Xml(e.to_string()))?;
                text.push_str(&content);
            }
            Ok(Event::End(e)) if capturing && e.name().local_name().as_ref() == target => {
                return Ok(text.trim().to_string());
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(Error::Xml(e.to_string())),
        }
        buf.clear();
    }

    Err(Error::Xml(format!("element '{local_name}' not found")))
}

/// Value of an attribute on the first element with the given local name.
/// Matches both `<Elem Attr="..">..</Elem>` and self-closing `<Elem Attr=".."/>`.
pub fn attribute_of(xml: &str, element: &str, attribute: &str) -> Result<String> {
    let target = element.as_bytes();
    let mut reader = Reader::from_str(xml);

    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e))
                if e.name().local_name().as_ref() == target =>
            {
                for attr in e.attributes() {
                    let attr = attr?;
                    if attr.key.local_name().as_ref() == attribute.as_bytes() {
                        return Ok(attr.unescape_value()?.into_owned());
                    }
                }
                return Err(Error::Xml(format!(
                    "attribute '{attribute}' not found on element '{element}'"
                )));
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(Error::Xml(e.to_string())),
        }
        buf.clear();
    }

    Err(Error::Xml(format!("element '{element}' not found")))
}

/// Byte offset and full tag name of the next Signature open tag, with or
/// without a namespace prefix.
fn find_signature_open(xml: &str) -> Option<(usize, &str)> {
    for (pos, _) in xml.match_indices('<') {
        let rest = &xml[pos + 1..];
        let name_end = rest.find(|c: char| c.is_whitespace() || c == '>' || c == '/')?;
        let name = &rest[..name_end];
        if name == "Signature" || name.ends_with(":Signature") {
            return Some((pos, name));
        }
    }
    None
}

/// Whether the document carries a Signature element under any prefix.
pub fn contains_signature(xml: &str) -> bool {
    find_signature_open(xml).is_some()
}

/// Enveloped-signature transform: remove every Signature element from the
/// document, prefixed or not. Inserting a signature and removing it again
/// must restore the original text exactly, otherwise digests will not
/// round-trip.
pub fn remove_signatures_from_xml(xml: &str) -> Result<String> {
    let mut result = xml.to_string();

    while let Some((start, name)) = find_signature_open(&result) {
        let close = format!("</{name}>");
        let Some(end) = result[start..].find(&close) else {
            return Err(Error::Xml(
                "unterminated Signature element in document".into(),
            ));
        };
        let end_pos = start + end + close.len();
        result.replace_range(start..end_pos, "");
    }

    Ok(result)
}

/// Extract the first SignedInfo element with the namespace declarations of
/// its ancestors copied onto its start tag, so the detached subtree
/// canonicalizes to the same bytes it did inside the document.
pub fn extract_signed_info(xml: &str) -> Result<Option<String>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);
    reader.config_mut().expand_empty_elements = true;

    let mut writer = Writer::new(Cursor::new(Vec::new()));
    let mut buf = Vec::new();
    let mut ns_stack: Vec<Vec<(String, String)>> = Vec::new();
    let mut capturing = false;
    let mut depth = 0usize;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let mut local_decls = Vec::new();
                for attr in e.attributes().with_checks(false) {
                    let attr = attr?;
                    let key = attr.key.as_ref();
                    let prefix = if key == b"xmlns" {
                        Some(String::new())
                    } else {
                        key.strip_prefix(b"xmlns:")
                            .map(|p| String::from_utf8_lossy(p).into_owned())
                    };
                    if let Some(prefix) = prefix {
                        let uri = String::from_utf8_lossy(&attr.value).into_owned();
                        local_decls.push((prefix, uri));
                    }
                }

                if capturing {
                    depth += 1;
                    writer.write_event(Event::Start(e.to_owned()))?;
                } else if e.name().local_name().as_ref() == b"SignedInfo" {
                    let mut start = e.to_owned();
                    let mut seen: Vec<&str> =
                        local_decls.iter().map(|(p, _)| p.as_str()).collect();
                    for scope in ns_stack.iter().rev() {
                        for (prefix, uri) in scope {
                            if !seen.contains(&prefix.as_str()) {
                                seen.push(prefix);
                                let key = if prefix.is_empty() {
                                    "xmlns".to_string()
                                } else {
                                    format!("xmlns:{prefix}")
                                };
                                start.push_attribute((key.as_str(), uri.as_str()));
                            }
                        }
                    }
                    capturing = true;
                    depth = 1;
                    writer.write_event(Event::Start(start))?;
                }
                ns_stack.push(local_decls);
            }
            Ok(Event::End(e)) => {
                ns_stack.pop();
                if capturing {
                    writer.write_event(Event::End(e.to_owned()))?;
                    depth -= 1;
                    if depth == 0 {
                        return Ok(Some(String::from_utf8(
                            writer.into_inner().into_inner(),
                        )?));
                    }
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
