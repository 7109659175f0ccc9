//! Streaming JSON-LD encode, the JSON counterpart of `xml_writer`. Each
//! event is handed straight to `serde_json::to_writer` — the model's
//! derive already produces the canonical wire shape — so this module's
//! job is only the document envelope: `@context`, header fields, and the
//! `epcisBody`/`queryResults`/`resultsBody` nesting a query document adds
//! around `eventList` (spec.md §4.5, §9).

use std::io::Write;

use epcis_context::ContextHandler;
use epcis_model::{DocumentFrame, DocumentKind, Event, Version};
use epcis_namespace::NamespaceResolver;

use crate::error::CodecResult;

pub struct JsonDocumentWriter<W: Write> {
    writer: W,
    kind: DocumentKind,
    first_event: bool,
}

impl<W: Write> JsonDocumentWriter<W> {
    #[tracing::instrument(skip_all)]
    pub fn new(mut sink: W, frame: &DocumentFrame, resolver: &NamespaceResolver, context_handler: &dyn ContextHandler) -> CodecResult<Self> {
        let context = context_handler.build_context(resolver.all_document());

        write!(sink, "{{")?;
        write_raw_key(&mut sink, "@context", &context.entries)?;
        write!(sink, ",")?;
        write_string_key(&mut sink, "type", if frame.kind == DocumentKind::Query { "EPCISQueryDocument" } else { "EPCISDocument" })?;
        write!(sink, ",")?;
        write_string_key(&mut sink, "schemaVersion", schema_version_literal(frame.schema_version))?;
        write!(sink, ",")?;
        write_string_key(&mut sink, "creationDate", &frame.creation_date.to_rfc3339())?;
        write!(sink, ",\"epcisBody\":{{")?;

        if frame.kind == DocumentKind::Query {
            write!(sink, "\"queryResults\":{{")?;
            if let Some(subscription_id) = &frame.subscription_id {
                write_string_key(&mut sink, "subscriptionID", subscription_id)?;
                write!(sink, ",")?;
            }
            if let Some(query_name) = &frame.query_name {
                write_string_key(&mut sink, "queryName", query_name)?;
                write!(sink, ",")?;
            }
            write!(sink, "\"resultsBody\":{{\"eventList\":[")?;
        } else {
            write!(sink, "\"eventList\":[")?;
        }

        Ok(JsonDocumentWriter { writer: sink, kind: frame.kind, first_event: true })
    }

    #[tracing::instrument(skip(self, event))]
    pub fn write_event(&mut self, event: &Event) -> CodecResult<()> {
        if !self.first_event {
            write!(self.writer, ",")?;
        }
        self.first_event = false;
        serde_json::to_writer(&mut self.writer, event)?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub fn finish(mut self) -> CodecResult<W> {
        write!(self.writer, "]")?;
        if self.kind == DocumentKind::Query {
            write!(self.writer, "}}}}")?;
        }
        write!(self.writer, "}}}}")?;
        Ok(self.writer)
    }
}

/// Writes a single event with no surrounding document envelope — the JSON
/// counterpart of `xml_writer::write_single_event` (spec.md §4.5's
/// single-event shape). JSON-LD has nothing to say about event-scope
/// namespaces, so there is no resolver parameter here.
#[tracing::instrument(skip_all)]
pub fn write_single_event<W: Write>(mut sink: W, event: &Event) -> CodecResult<W> {
    serde_json::to_writer(&mut sink, event)?;
    Ok(sink)
}

fn schema_version_literal(version: Version) -> &'static str {
    match version {
        Version::V1_2 => "1.2",
        Version::V2_0 => "2.0",
    }
}

fn write_string_key<W: Write>(w: &mut W, key: &str, value: &str) -> CodecResult<()> {
    serde_json::to_writer(&mut *w, key)?;
    write!(w, ":")?;
    serde_json::to_writer(&mut *w, value)?;
    Ok(())
}

fn write_raw_key<W: Write, T: serde::Serialize>(w: &mut W, key: &str, value: &T) -> CodecResult<()> {
    serde_json::to_writer(&mut *w, key)?;
    write!(w, ":")?;
    serde_json::to_writer(&mut *w, value)?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use epcis_context::DefaultContextHandler;
    use epcis_model::{Action, ErrorDeclaration, EventCore, ObjectEvent};

    fn sample_event() -> Event {
        Event::ObjectEvent(ObjectEvent {
            core: EventCore {
                event_time: "2019-01-01T00:00:00+00:00".parse().unwrap(),
                event_time_zone_offset: "+00:00".to_string(),
                record_time: None,
                event_id: None,
                error_declaration: None,
                action: Some(Action::Observe),
                business_step: Some("urn:epcglobal:cbv:bizstep:shipping".to_string()),
                disposition: None,
                read_point: None,
                biz_location: None,
                source_list: vec![],
                destination_list: vec![],
                biz_transaction_list: vec![],
                sensor_element_list: vec![],
                persistent_disposition: None,
                extensions: Default::default(),
                event_scope_namespaces: vec![],
            },
            epc_list: vec!["urn:epc:id:sgtin:234567890.1123.9999".to_string()],
            quantity_list: vec![],
            ilmd: None,
        })
    }

    #[test]
    fn writes_a_well_formed_capture_document() {
        let frame = DocumentFrame::new_capture(Version::V2_0, "2019-01-01T00:00:00+00:00".parse().unwrap());
        let resolver = NamespaceResolver::new();
        let handler = DefaultContextHandler;
        let mut doc_writer = JsonDocumentWriter::new(Vec::new(), &frame, &resolver, &handler).unwrap();
        doc_writer.write_event(&sample_event()).unwrap();
        let bytes = doc_writer.finish().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["type"], "EPCISDocument");
        assert_eq!(value["epcisBody"]["eventList"][0]["type"], "ObjectEvent");
        assert_eq!(value["epcisBody"]["eventList"][0]["epcList"][0], "urn:epc:id:sgtin:234567890.1123.9999");
    }

    #[test]
    fn query_document_nests_eventlist_under_query_results() {
        let mut frame = DocumentFrame::new_capture(Version::V2_0, "2019-01-01T00:00:00+00:00".parse().unwrap());
        frame.kind = DocumentKind::Query;
        frame.subscription_id = Some("sub-1".to_string());
        frame.query_name = Some("SimpleEventQuery".to_string());
        let resolver = NamespaceResolver::new();
        let handler = DefaultContextHandler;
        let doc_writer = JsonDocumentWriter::new(Vec::new(), &frame, &resolver, &handler).unwrap();
        let bytes = doc_writer.finish().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["type"], "EPCISQueryDocument");
        assert_eq!(value["epcisBody"]["queryResults"]["subscriptionID"], "sub-1");
        assert!(value["epcisBody"]["queryResults"]["resultsBody"]["eventList"].is_array());
    }

    #[test]
    fn write_single_event_emits_the_event_with_no_envelope() {
        let bytes = write_single_event(Vec::new(), &sample_event()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["type"], "ObjectEvent");
        assert!(value.get("epcisBody").is_none());
    }

    #[test]
    fn error_declaration_round_trips_through_the_model_derive() {
        let mut event = sample_event();
        event.core_mut().error_declaration = Some(ErrorDeclaration {
            declaration_time: "2019-01-02T00:00:00+00:00".parse().unwrap(),
            reason: Some("urn:epcglobal:cbv:er:did_not_occur".to_string()),
            corrective_event_ids: vec!["urn:uuid:1".to_string()],
        });
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["errorDeclaration"]["reason"], "urn:epcglobal:cbv:er:did_not_occur");
    }
}
