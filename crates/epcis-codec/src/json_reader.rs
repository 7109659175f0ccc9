//! Streaming JSON-LD decode, the JSON counterpart of `xml_reader`. The
//! canonical model's own `Serialize`/`Deserialize` derives already match
//! the EPCIS 2.0 JSON-LD wire shape field-for-field (see
//! `epcis_model::event` and `xml_value`'s module doc for the shared `"$"`
//! convention), so decoding one event is just `serde_json::from_str`; the
//! work here is walking the surrounding document object by hand so
//! `eventList` is never materialized as a whole (spec.md §4.5, §9).

use std::io::BufRead;

use epcis_context::ContextHandlerRegistry;
use epcis_model::{ContextBinding, ContextEntry, DecodedInput, DocumentFrame, DocumentKind, Event, Timestamp, Version};
use epcis_namespace::NamespaceResolver;
use serde_json::{Map, Value};

use crate::error::{CodecError, CodecResult};
use crate::json_cursor::JsonCursor;

const EVENT_TYPE_NAMES: &[&str] = &[
    "ObjectEvent",
    "AggregationEvent",
    "TransactionEvent",
    "TransformationEvent",
    "AssociationEvent",
];

pub struct JsonDocumentReader<R: BufRead> {
    cursor: JsonCursor<R>,
    resolver: NamespaceResolver,
    exhausted: bool,
}

impl<R: BufRead> JsonDocumentReader<R> {
    /// Decodes a document frame plus a reader yielding events, or — when
    /// the root object's `type` is itself one of the five event types
    /// rather than `EPCISDocument`/`EPCISQueryDocument` — the single
    /// decoded event with no frame at all (spec.md §4.5).
    #[tracing::instrument(skip_all)]
    pub fn new(source: R, context_registry: &ContextHandlerRegistry) -> CodecResult<(Option<Self>, DecodedInput)> {
        let mut cursor = JsonCursor::new(source);
        cursor.skip_ws()?;
        cursor.expect(b'{')?;

        let mut resolver = NamespaceResolver::new();
        let mut context = ContextBinding::default();
        let mut collected: Map<String, Value> = Map::new();
        let mut is_event_root: Option<bool> = None;

        loop {
            cursor.skip_ws()?;
            if cursor.peek()? == Some(b'}') {
                cursor.next_byte()?;
                return Self::finish_as_single_event(is_event_root, collected);
            }

            let key = cursor.read_string()?;
            cursor.skip_ws()?;
            cursor.expect(b':')?;
            cursor.skip_ws()?;

            if key == "@context" && is_event_root != Some(true) {
                let raw = cursor.read_raw_value()?;
                let entries: Vec<ContextEntry> = serde_json::from_str(&raw)?;
                context = ContextBinding { entries };
                let handler = context_registry.select_for_parsing(&context);
                handler.populate_namespaces(&mut resolver);
                for (prefix, uri) in context.namespaces() {
                    resolver.populate_document(uri, prefix);
                }
            } else if key == "epcisBody" && is_event_root != Some(true) {
                let mut subscription_id = None;
                let mut query_name = None;
                descend_to_event_list(&mut cursor, &mut subscription_id, &mut query_name)?;

                let type_str = collected
                    .get("type")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| CodecError::malformed("document missing \"type\""))?;
                let kind = if type_str == "EPCISQueryDocument" { DocumentKind::Query } else { DocumentKind::Capture };
                let schema_version = collected
                    .get("schemaVersion")
                    .and_then(|v| v.as_str())
                    .and_then(Version::parse)
                    .ok_or_else(|| CodecError::malformed("missing or unrecognized schemaVersion"))?;
                let creation_date = collected
                    .get("creationDate")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| CodecError::malformed("document missing creationDate"))?;
                let creation_date = parse_timestamp(creation_date)?;

                let frame = DocumentFrame { kind, schema_version, creation_date, context, subscription_id, query_name };
                return Ok((Some(JsonDocumentReader { cursor, resolver, exhausted: false }), DecodedInput::Document(frame)));
            } else {
                let raw = cursor.read_raw_value()?;
                let value: Value = serde_json::from_str(&raw)?;
                if key == "type" {
                    if let Some(s) = value.as_str() {
                        is_event_root = Some(EVENT_TYPE_NAMES.contains(&s));
                    }
                }
                collected.insert(key, value);
            }

            cursor.skip_ws()?;
            match cursor.next_byte()?.ok_or_else(|| CodecError::malformed("document ended unexpectedly"))? {
                b',' => continue,
                b'}' => return Self::finish_as_single_event(is_event_root, collected),
                other => return Err(CodecError::malformed(format!("expected ',' or '}}', found {:?}", other as char))),
            }
        }
    }

    fn finish_as_single_event(is_event_root: Option<bool>, collected: Map<String, Value>) -> CodecResult<(Option<Self>, DecodedInput)> {
        if is_event_root == Some(true) {
            let event: Event = serde_json::from_value(Value::Object(collected))?;
            Ok((None, DecodedInput::SingleEvent(event)))
        } else {
            Err(CodecError::malformed("document ended before an epcisBody/eventList was found"))
        }
    }

    pub fn namespace_resolver(&mut self) -> &mut NamespaceResolver {
        &mut self.resolver
    }

    /// Pulls the next event out of `eventList`, or `None` once the array
    /// is exhausted.
    #[tracing::instrument(skip(self))]
    pub fn next_event(&mut self) -> CodecResult<Option<Event>> {
        if self.exhausted {
            return Ok(None);
        }
        self.cursor.skip_ws()?;
        if self.cursor.peek()?.ok_or_else(|| CodecError::malformed("document ended inside eventList"))? == b']' {
            self.cursor.next_byte()?;
            self.exhausted = true;
            return Ok(None);
        }
        let raw = self.cursor.read_raw_value()?;
        let event: Event = serde_json::from_str(&raw)?;
        self.cursor.skip_ws()?;
        match self.cursor.next_byte()?.ok_or_else(|| CodecError::malformed("document ended inside eventList"))? {
            b',' => {}
            b']' => self.exhausted = true,
            other => return Err(CodecError::malformed(format!("expected ',' or ']' in eventList, found {:?}", other as char))),
        }
        Ok(Some(event))
    }
}

/// Walks `{"...": ..., "epcisBody"/"queryResults"/"resultsBody": {...}}`
/// shapes until an `"eventList"` key is found, leaving the cursor
/// positioned right after its opening `[`. `subscriptionID`/`queryName`
/// are captured along the way; every other sibling key is skipped whole.
/// Content after `eventList` within the same object (there should be
/// none, per the EPCIS JSON-LD schema) is not visited.
fn descend_to_event_list<R: BufRead>(
    cursor: &mut JsonCursor<R>,
    subscription_id: &mut Option<String>,
    query_name: &mut Option<String>,
) -> CodecResult<()> {
    cursor.skip_ws()?;
    cursor.expect(b'{')?;
    loop {
        cursor.skip_ws()?;
        if cursor.peek()? == Some(b'}') {
            return Err(CodecError::malformed("object ended before an eventList was found"));
        }
        let key = cursor.read_string()?;
        cursor.skip_ws()?;
        cursor.expect(b':')?;
        cursor.skip_ws()?;
        match key.as_str() {
            "eventList" => {
                cursor.expect(b'[')?;
                return Ok(());
            }
            "queryResults" | "resultsBody" => {
                return descend_to_event_list(cursor, subscription_id, query_name);
            }
            "subscriptionID" => {
                let raw = cursor.read_raw_value()?;
                *subscription_id = serde_json::from_str::<Value>(&raw)?.as_str().map(|s| s.to_string());
            }
            "queryName" => {
                let raw = cursor.read_raw_value()?;
                *query_name = serde_json::from_str::<Value>(&raw)?.as_str().map(|s| s.to_string());
            }
            _ => {
                cursor.read_raw_value()?;
            }
        }
        cursor.skip_ws()?;
        match cursor.next_byte()?.ok_or_else(|| CodecError::malformed("object ended unexpectedly"))? {
            b',' => continue,
            b'}' => return Err(CodecError::malformed("object ended before an eventList was found")),
            other => return Err(CodecError::malformed(format!("expected ',' or '}}', found {:?}", other as char))),
        }
    }
}

fn parse_timestamp(text: &str) -> CodecResult<Timestamp> {
    Timestamp::parse_from_rfc3339(text).map_err(|e| CodecError::malformed(format!("bad timestamp {text:?}: {e}")))
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample_json() -> &'static str {
        r#"{
            "@context": ["https://ref.gs1.org/standards/epcis/2.0.0/epcis-context.jsonld"],
            "type": "EPCISDocument",
            "schemaVersion": "2.0",
            "creationDate": "2019-01-01T00:00:00.000Z",
            "epcisBody": {
                "eventList": [
                    {
                        "type": "ObjectEvent",
                        "eventTime": "2019-01-01T00:00:00.000+00:00",
                        "eventTimeZoneOffset": "+00:00",
                        "epcList": ["urn:epc:id:sgtin:234567890.1123.9999"],
                        "action": "OBSERVE",
                        "bizStep": "urn:epcglobal:cbv:bizstep:shipping"
                    }
                ]
            }
        }"#
    }

    #[test]
    fn reads_frame_and_a_single_object_event() {
        let registry = ContextHandlerRegistry::with_builtin_handlers();
        let json = sample_json();
        let (reader, decoded) = JsonDocumentReader::new(json.as_bytes(), &registry).unwrap();
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
            }
            other => panic!("expected an ObjectEvent, got {other:?}"),
        }
        assert!(reader.next_event().unwrap().is_none());
    }

    #[test]
    fn empty_event_list_yields_no_events() {
        let registry = ContextHandlerRegistry::with_builtin_handlers();
        let json = r#"{
            "@context": ["https://ref.gs1.org/standards/epcis/2.0.0/epcis-context.jsonld"],
            "type": "EPCISDocument",
            "schemaVersion": "2.0",
            "creationDate": "2019-01-01T00:00:00.000Z",
            "epcisBody": {"eventList": []}
        }"#;
        let (reader, _decoded) = JsonDocumentReader::new(json.as_bytes(), &registry).unwrap();
        let mut reader = reader.unwrap();
        assert!(reader.next_event().unwrap().is_none());
    }

    #[test]
    fn a_bare_event_root_decodes_as_a_single_event_with_no_frame() {
        let registry = ContextHandlerRegistry::with_builtin_handlers();
        let json = r#"{
            "type": "ObjectEvent",
            "eventTime": "2019-01-01T00:00:00.000+00:00",
            "eventTimeZoneOffset": "+00:00",
            "epcList": ["urn:epc:id:sgtin:234567890.1123.9999"],
            "action": "OBSERVE"
        }"#;
        let (reader, decoded) = JsonDocumentReader::new(json.as_bytes(), &registry).unwrap();
        assert!(reader.is_none());
        match decoded {
            DecodedInput::SingleEvent(Event::ObjectEvent(e)) => {
                assert_eq!(e.epc_list, vec!["urn:epc:id:sgtin:234567890.1123.9999".to_string()]);
            }
            other => panic!("expected a single ObjectEvent, got {other:?}"),
        }
    }

    #[test]
    fn query_document_captures_subscription_id_and_query_name() {
        let registry = ContextHandlerRegistry::with_builtin_handlers();
        let json = r#"{
            "@context": ["https://ref.gs1.org/standards/epcis/2.0.0/epcis-context.jsonld"],
            "type": "EPCISQueryDocument",
            "schemaVersion": "2.0",
            "creationDate": "2019-01-01T00:00:00.000Z",
            "epcisBody": {
                "queryResults": {
                    "subscriptionID": "sub-1",
                    "queryName": "SimpleEventQuery",
                    "resultsBody": {"eventList": []}
                }
            }
        }"#;
        let (reader, decoded) = JsonDocumentReader::new(json.as_bytes(), &registry).unwrap();
        assert!(reader.is_some());
        let frame = match decoded {
            DecodedInput::Document(frame) => frame,
            DecodedInput::SingleEvent(_) => panic!("expected a document"),
        };
        assert_eq!(frame.kind, DocumentKind::Query);
        assert_eq!(frame.subscription_id.as_deref(), Some("sub-1"));
        assert_eq!(frame.query_name.as_deref(), Some("SimpleEventQuery"));
    }
}
