//! Generic, bidirectional XML-fragment ⟷ JSON-value conversion for
//! opaque, order-preserving content the codec never interprets: ILMD,
//! `sensorElementList`, `persistentDisposition`, and caller extension
//! fields (`epcis_model::ExtensionValue`, spec.md §3).
//!
//! Convention: an element's attributes become `"@qname"` keys; its text
//! content becomes a `"$"` key if it also has children/attributes,
//! otherwise the element collapses to a bare JSON string; repeated
//! same-named children become a JSON array. This is the same `"$"`/`type`
//! convention `epcis_model::SourceDest`/`BizTransaction` already use, so
//! generic content and modeled fields read the same way once serialized.

use std::io::{BufRead, Write};

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event as XmlEvent};
use quick_xml::{Reader, Writer};
use serde_json::{Map, Value};

use crate::error::{CodecError, CodecResult};

fn qualified_name(start: &BytesStart) -> String {
    String::from_utf8_lossy(start.name().as_ref()).into_owned()
}

fn insert_child(object: &mut Map<String, Value>, name: String, value: Value) {
    match object.get_mut(&name) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let previous = existing.take();
            *existing = Value::Array(vec![previous, value]);
        }
        None => {
            object.insert(name, value);
        }
    }
}

fn read_attributes<R: BufRead>(start: &BytesStart, _reader: &Reader<R>) -> CodecResult<Map<String, Value>> {
    let mut object = Map::new();
    for attr in start.attributes() {
        let attr = attr?;
        if attr.key.as_ref().starts_with(b"xmlns") {
            continue;
        }
        let key = format!("@{}", String::from_utf8_lossy(attr.key.as_ref()));
        let value = attr.unescape_value().map_err(quick_xml::Error::from)?.into_owned();
        object.insert(key, Value::String(value));
    }
    Ok(object)
}

/// Reads the self-closing element `start` into an opaque JSON value.
pub fn read_empty_element_value<R: BufRead>(reader: &Reader<R>, start: &BytesStart) -> CodecResult<Value> {
    let object = read_attributes(start, reader)?;
    if object.is_empty() {
        Ok(Value::Null)
    } else {
        Ok(Value::Object(object))
    }
}

/// Reads the element whose start tag was already consumed as `start`,
/// recursively, into an opaque JSON value, stopping at its matching end
/// tag.
pub fn read_element_value<R: BufRead>(reader: &mut Reader<R>, start: &BytesStart) -> CodecResult<Value> {
    let mut object = read_attributes(start, reader)?;
    let mut text = String::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            XmlEvent::Start(child) => {
                let owned = child.to_owned();
                let name = qualified_name(&owned);
                let value = read_element_value(reader, &owned)?;
                insert_child(&mut object, name, value);
            }
            XmlEvent::Empty(child) => {
                let name = qualified_name(&child);
                let value = read_empty_element_value(reader, &child)?;
                insert_child(&mut object, name, value);
            }
            XmlEvent::Text(bytes) => {
                text.push_str(&bytes.unescape().map_err(quick_xml::Error::from)?);
            }
            XmlEvent::CData(bytes) => {
                text.push_str(&String::from_utf8_lossy(bytes.into_inner().as_ref()));
            }
            XmlEvent::End(_) => break,
            XmlEvent::Eof => return Err(CodecError::malformed("unexpected end of input inside an element")),
            _ => {}
        }
        buf.clear();
    }

    let trimmed = text.trim();
    if object.is_empty() {
        Ok(Value::String(trimmed.to_string()))
    } else {
        if !trimmed.is_empty() {
            object.insert("$".to_string(), Value::String(trimmed.to_string()));
        }
        Ok(Value::Object(object))
    }
}

/// Writes `value` as an element named `tag_name`, recursively, the
/// inverse of [`read_element_value`]/[`read_empty_element_value`].
pub fn write_element_value<W: Write>(writer: &mut Writer<W>, tag_name: &str, value: &Value) -> CodecResult<()> {
    match value {
        Value::Null => {
            writer.write_event(XmlEvent::Empty(BytesStart::new(tag_name)))?;
        }
        Value::String(s) if s.is_empty() => {
            writer.write_event(XmlEvent::Empty(BytesStart::new(tag_name)))?;
        }
        Value::String(s) => {
            writer.write_event(XmlEvent::Start(BytesStart::new(tag_name)))?;
            writer.write_event(XmlEvent::Text(BytesText::new(s)))?;
            writer.write_event(XmlEvent::End(BytesEnd::new(tag_name)))?;
        }
        Value::Object(map) => {
            let mut start = BytesStart::new(tag_name);
            let mut text: Option<&str> = None;
            let mut children: Vec<(&str, &Value)> = Vec::new();
            for (key, val) in map {
                if let Some(attr_name) = key.strip_prefix('@') {
                    if let Value::String(s) = val {
                        start.push_attribute((attr_name, s.as_str()));
                    }
                } else if key == "$" {
                    if let Value::String(s) = val {
                        text = Some(s.as_str());
                    }
                } else {
                    children.push((key.as_str(), val));
                }
            }
            if children.is_empty() && text.is_none() {
                writer.write_event(XmlEvent::Empty(start))?;
            } else {
                writer.write_event(XmlEvent::Start(start))?;
                if let Some(t) = text {
                    writer.write_event(XmlEvent::Text(BytesText::new(t)))?;
                }
                for (name, val) in children {
                    write_child_or_array(writer, name, val)?;
                }
                writer.write_event(XmlEvent::End(BytesEnd::new(tag_name)))?;
            }
        }
        Value::Array(items) => {
            for item in items {
                write_element_value(writer, tag_name, item)?;
            }
        }
        scalar => {
            writer.write_event(XmlEvent::Start(BytesStart::new(tag_name)))?;
            writer.write_event(XmlEvent::Text(BytesText::new(&scalar.to_string())))?;
            writer.write_event(XmlEvent::End(BytesEnd::new(tag_name)))?;
        }
    }
    Ok(())
}

fn write_child_or_array<W: Write>(writer: &mut Writer<W>, name: &str, value: &Value) -> CodecResult<()> {
    match value {
        Value::Array(items) => {
            for item in items {
                write_element_value(writer, name, item)?;
            }
            Ok(())
        }
        other => write_element_value(writer, name, other),
    }
}
