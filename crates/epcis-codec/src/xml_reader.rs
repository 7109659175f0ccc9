//! Streaming XML decode: pulls `DocumentFrame` then one `Event` at a time
//! out of an `<EPCISDocument>`/`<EPCISQueryDocument>`, never materializing
//! the whole `<EventList>` (spec.md §4.5, §9 "bounded memory").
//!
//! Grounded on the teacher's pull-style format readers
//! (`parser::format::json::parse`, which hands `serde_json::Value`s to the
//! caller one at a time off a `Deserializer::from_reader` iterator) and on
//! `tafia-quick-xml`'s prefix-stack `NamespaceResolver` for the xmlns
//! bookkeeping quick-xml itself doesn't do.

use std::io::BufRead;

use epcis_model::{
    AggregationEvent, AssociationEvent, BizTransaction, ContextBinding, DecodedInput, DocumentFrame, DocumentKind,
    ErrorDeclaration, Event, EventCore, LocationRef, ObjectEvent, QuantityElement, SourceDest, Timestamp,
    TransactionEvent, TransformationEvent, Version,
};
use epcis_namespace::NamespaceResolver;
use quick_xml::events::{BytesStart, Event as XmlEvent};
use quick_xml::Reader;
use serde_json::{Map, Value};

use crate::error::{CodecError, CodecResult};
use crate::xml_value::read_element_value;

const EVENT_TYPE_NAMES: &[&str] = &[
    "ObjectEvent",
    "AggregationEvent",
    "TransactionEvent",
    "TransformationEvent",
    "AssociationEvent",
];

fn local_name(start: &BytesStart) -> String {
    let raw = start.name();
    let bytes = raw.as_ref();
    match bytes.iter().position(|b| *b == b':') {
        Some(idx) => String::from_utf8_lossy(&bytes[idx + 1..]).into_owned(),
        None => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Decodes an `<EPCISDocument>`/`<EPCISQueryDocument>` from `R`, handing
/// back the frame up front (it's small and bounded) and a reader that
/// yields events one at a time.
pub struct XmlDocumentReader<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    resolver: NamespaceResolver,
    exhausted: bool,
}

impl<R: BufRead> XmlDocumentReader<R> {
    /// Decodes a document frame plus a reader yielding events, or — when the
    /// root element is itself an event rather than an `<EPCISDocument>` —
    /// the single decoded event with no frame at all (spec.md §4.5 "a
    /// single-event input ... is a supported shape").
    #[tracing::instrument(skip_all)]
    pub fn new(source: R) -> CodecResult<(Option<Self>, DecodedInput)> {
        let mut reader = Reader::from_reader(source);
        reader.config_mut().trim_text(true);
        let mut buf = Vec::new();
        let mut resolver = NamespaceResolver::new();

        let root = loop {
            match reader.read_event_into(&mut buf)? {
                XmlEvent::Start(start) if is_document_root(&start) => break start.to_owned(),
                XmlEvent::Start(start) if EVENT_TYPE_NAMES.contains(&local_name(&start).as_str()) => {
                    let name = local_name(&start);
                    let owned = start.to_owned();
                    let event_scope_namespaces = read_event_scope(&owned)?;
                    let value = read_element_value(&mut reader, &owned)?;
                    let mut event = lower_event(&name, value)?;
                    event.core_mut().event_scope_namespaces = event_scope_namespaces;
                    return Ok((None, DecodedInput::SingleEvent(event)));
                }
                XmlEvent::Eof => return Err(CodecError::malformed("no EPCISDocument root element found")),
                _ => {}
            }
            buf.clear();
        };
        buf.clear();

        let kind = if local_name(&root) == "EPCISQueryDocument" {
            DocumentKind::Query
        } else {
            DocumentKind::Capture
        };

        let mut schema_version = None;
        let mut context = ContextBinding::default();
        // GS1's EPCIS XSD declares both `schemaVersion` and `creationDate`
        // as attributes of the root element, unlike the JSON-LD binding
        // where `creationDate` is a sibling of `epcisBody`.
        let mut creation_date = None;
        for attr in root.attributes() {
            let attr = attr?;
            let key = attr.key.as_ref();
            if key == b"schemaVersion" {
                schema_version = Version::parse(&attr.unescape_value().map_err(quick_xml::Error::from)?);
            } else if key == b"creationDate" {
                let text = attr.unescape_value().map_err(quick_xml::Error::from)?;
                creation_date = Some(parse_timestamp(&text)?);
            } else if key.starts_with(b"xmlns:") {
                let prefix = String::from_utf8_lossy(&key[6..]).into_owned();
                let uri = attr.unescape_value().map_err(quick_xml::Error::from)?.into_owned();
                resolver.populate_document(&uri, &prefix);
                context.push_namespace(prefix, uri);
            }
        }
        let schema_version = schema_version.ok_or_else(|| CodecError::malformed("missing schemaVersion attribute"))?;

        let mut subscription_id = None;
        let mut query_name = None;

        // Walk header siblings (EPCISHeader / creationDate / queryName /
        // subscriptionID) until the EventList is reached; anything other
        // than these known elements is skipped, mirroring the codec's
        // passthrough stance on content it doesn't model.
        //
        // A standards-conformant document nests EventList inside EPCISBody
        // (capture) or EPCISBody/QueryResults/resultsBody (query), with
        // EPCISHeader a sibling of EPCISBody carrying subscriptionID/
        // queryName for query documents (see xml_writer.rs's own EPCISHeader/
        // EPCISBody/QueryResults/resultsBody nesting). Those four wrapper
        // elements are transparent here: falling through to the `_ => {}`
        // match arm does nothing, so the loop's next iteration reads straight
        // through to the wrapper's first child, the same way
        // `json_reader::descend_to_event_list` walks into `epcisBody`/
        // `queryResults`/`resultsBody`. Their End tags are likewise ignored
        // by the catch-all arm at the bottom of this match.
        loop {
            match reader.read_event_into(&mut buf)? {
                XmlEvent::Start(start) => {
                    let name = local_name(&start);
                    match name.as_str() {
                        "creationDate" => {
                            let owned = start.to_owned();
                            let value = read_element_value(&mut reader, &owned)?;
                            let text = value.as_str().ok_or_else(|| CodecError::malformed("creationDate is not text"))?;
                            creation_date = Some(parse_timestamp(text)?);
                        }
                        "subscriptionID" => {
                            let owned = start.to_owned();
                            let value = read_element_value(&mut reader, &owned)?;
                            subscription_id = value.as_str().map(|s| s.to_string());
                        }
                        "queryName" => {
                            let owned = start.to_owned();
                            let value = read_element_value(&mut reader, &owned)?;
                            query_name = value.as_str().map(|s| s.to_string());
                        }
                        "EventList" | "eventList" => break,
                        "EPCISHeader" | "EPCISBody" | "QueryResults" | "resultsBody" => {
                            // Transparent wrapper; its children are read by
                            // the loop's next iteration.
                        }
                        _ => {
                            let owned = start.to_owned();
                            read_element_value(&mut reader, &owned)?;
                        }
                    }
                }
                XmlEvent::Empty(start) => {
                    let name = local_name(&start);
                    if name == "EventList" || name == "eventList" {
                        // Empty event list: consumer will immediately see End-of-document.
                        buf.clear();
                        let frame = DocumentFrame {
                            kind,
                            schema_version,
                            creation_date: creation_date
                                .ok_or_else(|| CodecError::malformed("missing creationDate"))?,
                            context,
                            subscription_id,
                            query_name,
                        };
                        return Ok((
                            Some(XmlDocumentReader { reader, buf, resolver, exhausted: true }),
                            DecodedInput::Document(frame),
                        ));
                    }
                }
                XmlEvent::Eof => return Err(CodecError::malformed("document ended before an EventList")),
                _ => {}
            }
            buf.clear();
        }
        buf.clear();

        let frame = DocumentFrame {
            kind,
            schema_version,
            creation_date: creation_date.ok_or_else(|| CodecError::malformed("missing creationDate"))?,
            context,
            subscription_id,
            query_name,
        };

        Ok((
            Some(XmlDocumentReader { reader, buf, resolver, exhausted: false }),
            DecodedInput::Document(frame),
        ))
    }

    pub fn namespace_resolver(&mut self) -> &mut NamespaceResolver {
        &mut self.resolver
    }

    /// Reads `xmlns:*` declarations on an event's own start tag, both into
    /// the shared resolver's event scope (so `event_scope_for_emission`
    /// reflects them if this reader's resolver is reused for writing) and
    /// as the list stashed on the decoded event itself, so a caller driving
    /// a separate writer-side resolver can still reproduce them (spec.md
    /// §4.2 "declarations introduced within a single event").
    fn capture_event_scope(&mut self, start: &BytesStart) -> CodecResult<Vec<(String, String)>> {
        let mut bindings = Vec::new();
        for attr in start.attributes() {
            let attr = attr?;
            let key = attr.key.as_ref();
            if let Some(prefix) = key.strip_prefix(b"xmlns:") {
                let prefix = String::from_utf8_lossy(prefix).into_owned();
                let uri = attr.unescape_value().map_err(quick_xml::Error::from)?.into_owned();
                self.resolver.populate_event(&uri, &prefix);
                bindings.push((prefix, uri));
            }
        }
        Ok(bindings)
    }

    /// Pulls the next event out of the `<EventList>`, or `None` once it is
    /// exhausted. Recursively unwraps `<extension>` wrappers so a 1.2
    /// `AssociationEvent` (nested two or three `<extension>` layers deep,
    /// spec.md S6) is found regardless of how deep the source buried it.
    #[tracing::instrument(skip(self))]
    pub fn next_event(&mut self) -> CodecResult<Option<Event>> {
        if self.exhausted {
            return Ok(None);
        }
        loop {
            match self.reader.read_event_into(&mut self.buf)? {
                XmlEvent::Start(start) => {
                    let name = local_name(&start);
                    if name == "extension" {
                        // Recurse straight through; an AssociationEvent (or
                        // any other event type) may be nested arbitrarily
                        // deep inside <extension> wrappers.
                        self.buf.clear();
                        continue;
                    }
                    if EVENT_TYPE_NAMES.contains(&name.as_str()) {
                        let owned = start.to_owned();
                        let event_scope_namespaces = self.capture_event_scope(&owned)?;
                        let value = read_element_value(&mut self.reader, &owned)?;
                        self.buf.clear();
                        let mut event = lower_event(&name, value)?;
                        event.core_mut().event_scope_namespaces = event_scope_namespaces;
                        return Ok(Some(event));
                    }
                    // Unknown child of EventList; skip it whole.
                    let owned = start.to_owned();
                    read_element_value(&mut self.reader, &owned)?;
                }
                XmlEvent::Empty(_) => {}
                XmlEvent::End(end) => {
                    let name = String::from_utf8_lossy(end.name().as_ref()).into_owned();
                    if name.ends_with("EventList") {
                        self.exhausted = true;
                        self.buf.clear();
                        return Ok(None);
                    }
                    // End of an <extension> wrapper we recursed past; keep going.
                }
                XmlEvent::Eof => return Err(CodecError::malformed("document ended inside EventList")),
                _ => {}
            }
            self.buf.clear();
        }
    }
}

fn is_document_root(start: &BytesStart) -> bool {
    matches!(local_name(start).as_str(), "EPCISDocument" | "EPCISQueryDocument")
}

/// Reads `xmlns:*` declarations off a bare single-event root — there is no
/// document-scope resolver to populate here, so the bindings are only
/// stashed on the event itself for the caller to replay on the way out.
fn read_event_scope(start: &BytesStart) -> CodecResult<Vec<(String, String)>> {
    let mut bindings = Vec::new();
    for attr in start.attributes() {
        let attr = attr?;
        let key = attr.key.as_ref();
        if let Some(prefix) = key.strip_prefix(b"xmlns:") {
            let prefix = String::from_utf8_lossy(prefix).into_owned();
            let uri = attr.unescape_value().map_err(quick_xml::Error::from)?.into_owned();
            bindings.push((prefix, uri));
        }
    }
    Ok(bindings)
}

fn parse_timestamp(text: &str) -> CodecResult<Timestamp> {
    Timestamp::parse_from_rfc3339(text).map_err(|e| CodecError::malformed(format!("bad timestamp {text:?}: {e}")))
}

/// Unwraps the `{"<inner>": ...}` shape an EPCIS `*List` wrapper element
/// produces (e.g. `epcList` containing repeated `epc` children) into a
/// flat `Vec<Value>`. Absent/empty lists decode as `Value::String("")`
/// from [`read_element_value`]; both that and a genuinely missing key
/// are treated as an empty list.
fn unwrap_list(value: Option<&Value>, inner: &str) -> Vec<Value> {
    match value {
        Some(Value::Object(map)) => match map.get(inner) {
            Some(Value::Array(items)) => items.clone(),
            Some(other) => vec![other.clone()],
            None => Vec::new(),
        },
        _ => Vec::new(),
    }
}

fn as_strings(items: Vec<Value>) -> Vec<String> {
    items.into_iter().filter_map(|v| v.as_str().map(|s| s.to_string())).collect()
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn to_location_ref(value: Value) -> LocationRef {
    match value {
        Value::Object(mut map) => {
            let id = map.remove("id").and_then(|v| v.as_str().map(|s| s.to_string())).unwrap_or_default();
            LocationRef { id, extensions: map }
        }
        Value::String(id) => LocationRef { id, extensions: Map::new() },
        _ => LocationRef::default(),
    }
}

fn to_source_dest(value: Value) -> Option<SourceDest> {
    match value {
        Value::Object(map) => {
            let kind = map.get("@type").and_then(|v| v.as_str())?.to_string();
            let value = map.get("$").and_then(|v| v.as_str()).unwrap_or_default().to_string();
            Some(SourceDest { kind, value })
        }
        _ => None,
    }
}

fn to_biz_transaction(value: Value) -> Option<BizTransaction> {
    match value {
        Value::Object(map) => {
            let kind = map.get("@type").and_then(|v| v.as_str()).map(|s| s.to_string());
            let value = map.get("$").and_then(|v| v.as_str()).unwrap_or_default().to_string();
            Some(BizTransaction { kind, value })
        }
        Value::String(value) => Some(BizTransaction { kind: None, value }),
        _ => None,
    }
}

fn to_quantity_element(value: Value) -> Option<QuantityElement> {
    match value {
        Value::Object(map) => {
            let epc_class = map.get("epcClass").and_then(|v| v.as_str())?.to_string();
            let quantity = map.get("quantity").and_then(as_number);
            let uom = map.get("uom").and_then(|v| v.as_str()).map(|s| s.to_string());
            Some(QuantityElement { epc_class, quantity, uom })
        }
        _ => None,
    }
}

fn to_error_declaration(value: Value) -> CodecResult<ErrorDeclaration> {
    match value {
        Value::Object(map) => {
            let declaration_time = map
                .get("declarationTime")
                .and_then(|v| v.as_str())
                .ok_or_else(|| CodecError::malformed("errorDeclaration missing declarationTime"))?;
            let declaration_time = parse_timestamp(declaration_time)?;
            let reason = map.get("reason").and_then(|v| v.as_str()).map(|s| s.to_string());
            let corrective_event_ids = as_strings(unwrap_list(map.get("correctiveEventIDs"), "correctiveEventID"));
            Ok(ErrorDeclaration { declaration_time, reason, corrective_event_ids })
        }
        _ => Err(CodecError::malformed("malformed errorDeclaration")),
    }
}

/// Builds the shared `EventCore` fields out of an event's generic subtree,
/// removing every key it consumes so the caller can treat what's left as
/// caller-defined extension content.
fn lower_core(map: &mut Map<String, Value>) -> CodecResult<EventCore> {
    let event_time = map
        .remove("eventTime")
        .and_then(|v| v.as_str().map(|s| s.to_string()))
        .ok_or_else(|| CodecError::malformed("event missing eventTime"))?;
    let event_time = parse_timestamp(&event_time)?;

    let event_time_zone_offset = map
        .remove("eventTimeZoneOffset")
        .and_then(|v| v.as_str().map(|s| s.to_string()))
        .ok_or_else(|| CodecError::malformed("event missing eventTimeZoneOffset"))?;

    let record_time = map
        .remove("recordTime")
        .and_then(|v| v.as_str().map(|s| s.to_string()))
        .map(|s| parse_timestamp(&s))
        .transpose()?;

    let event_id = map.remove("eventID").and_then(|v| v.as_str().map(|s| s.to_string()));

    let error_declaration = map.remove("errorDeclaration").map(to_error_declaration).transpose()?;

    let action = map
        .remove("action")
        .and_then(|v| v.as_str().map(|s| s.to_string()))
        .map(|s| match s.as_str() {
            "ADD" => Ok(epcis_model::Action::Add),
            "OBSERVE" => Ok(epcis_model::Action::Observe),
            "DELETE" => Ok(epcis_model::Action::Delete),
            other => Err(CodecError::malformed(format!("unknown action {other:?}"))),
        })
        .transpose()?;

    let business_step = map.remove("bizStep").and_then(|v| v.as_str().map(|s| s.to_string()));
    let disposition = map.remove("disposition").and_then(|v| v.as_str().map(|s| s.to_string()));
    let read_point = map.remove("readPoint").map(to_location_ref);
    let biz_location = map.remove("bizLocation").map(to_location_ref);

    let source_list = unwrap_list(map.remove("sourceList").as_ref(), "source")
        .into_iter()
        .filter_map(to_source_dest)
        .collect();
    let destination_list = unwrap_list(map.remove("destinationList").as_ref(), "destination")
        .into_iter()
        .filter_map(to_source_dest)
        .collect();
    let biz_transaction_list = unwrap_list(map.remove("bizTransactionList").as_ref(), "bizTransaction")
        .into_iter()
        .filter_map(to_biz_transaction)
        .collect();

    let sensor_element_list = unwrap_list(map.remove("sensorElementList").as_ref(), "sensorElement");
    let persistent_disposition = map.remove("persistentDisposition");

    Ok(EventCore {
        event_time,
        event_time_zone_offset,
        record_time,
        event_id,
        error_declaration,
        action,
        business_step,
        disposition,
        read_point,
        biz_location,
        source_list,
        destination_list,
        biz_transaction_list,
        sensor_element_list,
        persistent_disposition,
        extensions: Map::new(),
        event_scope_namespaces: Vec::new(),
    })
}

fn lower_event(type_name: &str, value: Value) -> CodecResult<Event> {
    let mut map = match value {
        Value::Object(map) => map,
        _ => return Err(CodecError::malformed(format!("{type_name} has no structured content"))),
    };

    let mut core = lower_core(&mut map)?;

    let event = match type_name {
        "ObjectEvent" => {
            let epc_list = as_strings(unwrap_list(map.remove("epcList").as_ref(), "epc"));
            let quantity_list =
                unwrap_list(map.remove("quantityList").as_ref(), "quantityElement").into_iter().filter_map(to_quantity_element).collect();
            let ilmd = map.remove("ilmd");
            core.extensions = map;
            Event::ObjectEvent(ObjectEvent { core, epc_list, quantity_list, ilmd })
        }
        "AggregationEvent" => {
            let parent_id = map.remove("parentID").and_then(|v| v.as_str().map(|s| s.to_string()));
            let child_epcs = as_strings(unwrap_list(map.remove("childEPCs").as_ref(), "epc"));
            let child_quantity_list = unwrap_list(map.remove("childQuantityList").as_ref(), "quantityElement")
                .into_iter()
                .filter_map(to_quantity_element)
                .collect();
            core.extensions = map;
            Event::AggregationEvent(AggregationEvent { core, parent_id, child_epcs, child_quantity_list })
        }
        "TransactionEvent" => {
            let parent_id = map.remove("parentID").and_then(|v| v.as_str().map(|s| s.to_string()));
            let epc_list = as_strings(unwrap_list(map.remove("epcList").as_ref(), "epc"));
            let quantity_list =
                unwrap_list(map.remove("quantityList").as_ref(), "quantityElement").into_iter().filter_map(to_quantity_element).collect();
            core.extensions = map;
            Event::TransactionEvent(TransactionEvent { core, parent_id, epc_list, quantity_list })
        }
        "TransformationEvent" => {
            let transformation_id = map.remove("transformationID").and_then(|v| v.as_str().map(|s| s.to_string()));
            let input_epc_list = as_strings(unwrap_list(map.remove("inputEPCList").as_ref(), "epc"));
            let input_quantity_list = unwrap_list(map.remove("inputQuantityList").as_ref(), "quantityElement")
                .into_iter()
                .filter_map(to_quantity_element)
                .collect();
            let output_epc_list = as_strings(unwrap_list(map.remove("outputEPCList").as_ref(), "epc"));
            let output_quantity_list = unwrap_list(map.remove("outputQuantityList").as_ref(), "quantityElement")
                .into_iter()
                .filter_map(to_quantity_element)
                .collect();
            let ilmd = map.remove("ilmd");
            core.extensions = map;
            Event::TransformationEvent(TransformationEvent {
                core,
                transformation_id,
                input_epc_list,
                input_quantity_list,
                output_epc_list,
                output_quantity_list,
                ilmd,
            })
        }
        "AssociationEvent" => {
            let parent_id = map.remove("parentID").and_then(|v| v.as_str().map(|s| s.to_string()));
            let child_epcs = as_strings(unwrap_list(map.remove("childEPCs").as_ref(), "epc"));
            let child_quantity_list = unwrap_list(map.remove("childQuantityList").as_ref(), "quantityElement")
                .into_iter()
                .filter_map(to_quantity_element)
                .collect();
            core.extensions = map;
            Event::AssociationEvent(AssociationEvent { core, parent_id, child_epcs, child_quantity_list })
        }
        other => return Err(CodecError::malformed(format!("unrecognized event type {other:?}"))),
    };

    Ok(event)
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample_xml() -> &'static str {
        r#"<?xml version="1.0" encoding="UTF-8"?>
<epcis:EPCISDocument xmlns:epcis="urn:epcglobal:epcis:xsd:2" xmlns:cbvmda="urn:epcglobal:cbv:mda" schemaVersion="2.0" creationDate="2019-01-01T00:00:00.000Z">
  <EPCISBody>
    <EventList>
      <ObjectEvent>
        <eventTime>2019-01-01T00:00:00.000+00:00</eventTime>
        <eventTimeZoneOffset>+00:00</eventTimeZoneOffset>
        <epcList>
          <epc>urn:epc:id:sgtin:234567890.1123.9999</epc>
        </epcList>
        <action>OBSERVE</action>
        <bizStep>urn:epcglobal:cbv:bizstep:shipping</bizStep>
        <readPoint><id>urn:epc:id:sgln:234567890.0.1</id></readPoint>
      </ObjectEvent>
    </EventList>
  </EPCISBody>
</epcis:EPCISDocument>"#
    }

    #[test]
    fn reads_frame_and_a_single_object_event() {
        let xml = sample_xml();
        let (reader, decoded) = XmlDocumentReader::new(xml.as_bytes()).unwrap();
        let mut reader = reader.expect("a document root yields a streaming reader");
        let frame = match decoded {
            DecodedInput::Document(frame) => frame,
            DecodedInput::SingleEvent(_) => panic!("expected a document, not a single event"),
        };
        assert_eq!(frame.schema_version, Version::V2_0);
        assert_eq!(frame.kind, DocumentKind::Capture);

        let event = reader.next_event().unwrap().unwrap();
        match event {
            Event::ObjectEvent(e) => {
                assert_eq!(e.epc_list, vec!["urn:epc:id:sgtin:234567890.1123.9999".to_string()]);
                assert_eq!(e.core.business_step.as_deref(), Some("urn:epcglobal:cbv:bizstep:shipping"));
                assert_eq!(e.core.read_point.unwrap().id, "urn:epc:id:sgln:234567890.0.1");
            }
            other => panic!("expected an ObjectEvent, got {other:?}"),
        }

        assert!(reader.next_event().unwrap().is_none());
    }

    #[test]
    fn captures_xmlns_declared_directly_on_the_event_element() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<epcis:EPCISDocument xmlns:epcis="urn:epcglobal:epcis:xsd:2" schemaVersion="2.0" creationDate="2019-01-01T00:00:00.000Z">
  <EPCISBody>
    <EventList>
      <ObjectEvent xmlns:ext="https://example.com/ext/">
        <eventTime>2019-01-01T00:00:00.000+00:00</eventTime>
        <eventTimeZoneOffset>+00:00</eventTimeZoneOffset>
        <ext:customField>value</ext:customField>
      </ObjectEvent>
    </EventList>
  </EPCISBody>
</epcis:EPCISDocument>"#;
        let (reader, _decoded) = XmlDocumentReader::new(xml.as_bytes()).unwrap();
        let mut reader = reader.unwrap();
        let event = reader.next_event().unwrap().unwrap();
        assert_eq!(event.core().event_scope_namespaces, vec![("ext".to_string(), "https://example.com/ext/".to_string())]);
    }

    #[test]
    fn descends_through_query_results_and_results_body_to_reach_the_event_list() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<epcisq:EPCISQueryDocument xmlns:epcisq="urn:epcglobal:epcis-query:xsd:2" schemaVersion="2.0" creationDate="2019-01-01T00:00:00.000Z">
  <EPCISHeader>
    <subscriptionID>sub-1</subscriptionID>
    <queryName>SimpleEventQuery</queryName>
  </EPCISHeader>
  <EPCISBody>
    <QueryResults>
      <resultsBody>
        <EventList>
          <ObjectEvent>
            <eventTime>2019-01-01T00:00:00.000+00:00</eventTime>
            <eventTimeZoneOffset>+00:00</eventTimeZoneOffset>
            <epcList><epc>urn:epc:id:sgtin:234567890.1123.9999</epc></epcList>
            <action>OBSERVE</action>
          </ObjectEvent>
        </EventList>
      </resultsBody>
    </QueryResults>
  </EPCISBody>
</epcisq:EPCISQueryDocument>"#;
        let (reader, decoded) = XmlDocumentReader::new(xml.as_bytes()).unwrap();
        let mut reader = reader.expect("a document root yields a streaming reader");
        let frame = match decoded {
            DecodedInput::Document(frame) => frame,
            DecodedInput::SingleEvent(_) => panic!("expected a document, not a single event"),
        };
        assert_eq!(frame.kind, DocumentKind::Query);
        assert_eq!(frame.subscription_id.as_deref(), Some("sub-1"));
        assert_eq!(frame.query_name.as_deref(), Some("SimpleEventQuery"));

        let event = reader.next_event().unwrap().unwrap();
        match event {
            Event::ObjectEvent(e) => {
                assert_eq!(e.epc_list, vec!["urn:epc:id:sgtin:234567890.1123.9999".to_string()]);
            }
            other => panic!("expected an ObjectEvent, got {other:?}"),
        }
        assert!(reader.next_event().unwrap().is_none());
    }

    #[test]
    fn a_bare_event_root_decodes_as_a_single_event_with_no_frame() {
        let xml = r#"<ObjectEvent>
            <eventTime>2019-01-01T00:00:00.000+00:00</eventTime>
            <eventTimeZoneOffset>+00:00</eventTimeZoneOffset>
            <epcList><epc>urn:epc:id:sgtin:234567890.1123.9999</epc></epcList>
            <action>OBSERVE</action>
        </ObjectEvent>"#;
        let (reader, decoded) = XmlDocumentReader::new(xml.as_bytes()).unwrap();
        assert!(reader.is_none());
        match decoded {
            DecodedInput::SingleEvent(Event::ObjectEvent(e)) => {
                assert_eq!(e.epc_list, vec!["urn:epc:id:sgtin:234567890.1123.9999".to_string()]);
            }
            other => panic!("expected a single ObjectEvent, got {other:?}"),
        }
    }
}
