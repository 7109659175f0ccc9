//! Streaming XML encode, the inverse of `xml_reader`: writes the document
//! root and header up front, then one event at a time, never holding more
//! than a single event's tree in memory (spec.md §4.5, §9).
//!
//! Handles the one genuinely version-conditional piece of wire shape this
//! codec owns: a 1.2 target wraps `AssociationEvent` in nested
//! `<extension>` elements, because 1.2's XSD has no such event type
//! (spec.md S6). Everything else version-dependent — which fields exist
//! at all — is `epcis-schema`'s job, not the codec's.

use std::io::Write;

use epcis_model::{
    AggregationEvent, AssociationEvent, BizTransaction, DocumentFrame, DocumentKind, ErrorDeclaration, Event, EventCore,
    LocationRef, ObjectEvent, QuantityElement, SourceDest, TransactionEvent, TransformationEvent, Version,
};
use epcis_namespace::NamespaceResolver;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event as XmlEvent};
use quick_xml::Writer;

use crate::error::CodecResult;
use crate::xml_value::write_element_value;

const EPCIS_NS_1_2: &str = "urn:epcglobal:epcis:xsd:1";
const EPCIS_NS_2_0: &str = "urn:epcglobal:epcis:xsd:2";
const EPCIS_QUERY_NS_1_2: &str = "urn:epcglobal:epcis-query:xsd:1";
const EPCIS_QUERY_NS_2_0: &str = "urn:epcglobal:epcis-query:xsd:2";

pub struct XmlDocumentWriter<W: Write> {
    writer: Writer<W>,
    kind: DocumentKind,
    in_query_results: bool,
}

impl<W: Write> XmlDocumentWriter<W> {
    #[tracing::instrument(skip_all)]
    pub fn new(sink: W, frame: &DocumentFrame, resolver: &NamespaceResolver) -> CodecResult<Self> {
        let mut writer = Writer::new_with_indent(sink, b' ', 2);
        writer.write_event(XmlEvent::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        let (root_name, ns) = match (frame.kind, frame.schema_version) {
            (DocumentKind::Capture, Version::V1_2) => ("epcis:EPCISDocument", EPCIS_NS_1_2),
            (DocumentKind::Capture, Version::V2_0) => ("epcis:EPCISDocument", EPCIS_NS_2_0),
            (DocumentKind::Query, Version::V1_2) => ("epcisq:EPCISQueryDocument", EPCIS_QUERY_NS_1_2),
            (DocumentKind::Query, Version::V2_0) => ("epcisq:EPCISQueryDocument", EPCIS_QUERY_NS_2_0),
        };
        let prefix = if frame.kind == DocumentKind::Query { "epcisq" } else { "epcis" };

        let mut root = BytesStart::new(root_name);
        root.push_attribute((format!("xmlns:{prefix}").as_str(), ns));
        for (doc_prefix, uri) in resolver.all_document() {
            if doc_prefix == prefix {
                continue;
            }
            root.push_attribute((format!("xmlns:{doc_prefix}").as_str(), uri.as_str()));
        }
        let schema_version_literal = match frame.schema_version {
            Version::V1_2 => "1.2",
            Version::V2_0 => "2.0",
        };
        root.push_attribute(("schemaVersion", schema_version_literal));
        root.push_attribute(("creationDate", frame.creation_date.to_rfc3339().as_str()));
        writer.write_event(XmlEvent::Start(root))?;

        let mut doc_writer = XmlDocumentWriter { writer, kind: frame.kind, in_query_results: false };

        if frame.kind == DocumentKind::Query {
            doc_writer.writer.write_event(XmlEvent::Start(BytesStart::new("EPCISHeader")))?;
            if let Some(subscription_id) = &frame.subscription_id {
                write_text_element(&mut doc_writer.writer, "subscriptionID", subscription_id)?;
            }
            if let Some(query_name) = &frame.query_name {
                write_text_element(&mut doc_writer.writer, "queryName", query_name)?;
            }
            doc_writer.writer.write_event(XmlEvent::End(BytesEnd::new("EPCISHeader")))?;
            doc_writer.writer.write_event(XmlEvent::Start(BytesStart::new("EPCISBody")))?;
            doc_writer.writer.write_event(XmlEvent::Start(BytesStart::new("QueryResults")))?;
            doc_writer.writer.write_event(XmlEvent::Start(BytesStart::new("resultsBody")))?;
            doc_writer.in_query_results = true;
        } else {
            doc_writer.writer.write_event(XmlEvent::Start(BytesStart::new("EPCISBody")))?;
        }
        doc_writer.writer.write_event(XmlEvent::Start(BytesStart::new("EventList")))?;

        Ok(doc_writer)
    }

    /// Writes one event. `wrap_in_extension` is set by the caller
    /// (`epcis-schema`, driven by `INCLUDE_ASSOCIATION_EVENT`) when this is
    /// an `AssociationEvent` being serialized into a 1.2 document.
    #[tracing::instrument(skip(self, event, resolver))]
    pub fn write_event(&mut self, event: &Event, resolver: &mut NamespaceResolver, wrap_in_extension: bool) -> CodecResult<()> {
        let depth = if wrap_in_extension { 2 } else { 0 };
        for _ in 0..depth {
            self.writer.write_event(XmlEvent::Start(BytesStart::new("extension")))?;
        }

        let tag = event.type_name();
        let mut start = BytesStart::new(tag);
        for (prefix, uri) in resolver.event_scope_for_emission() {
            start.push_attribute((format!("xmlns:{prefix}").as_str(), uri));
        }
        self.writer.write_event(XmlEvent::Start(start))?;
        write_core_and_body(&mut self.writer, event)?;
        self.writer.write_event(XmlEvent::End(BytesEnd::new(tag)))?;

        for _ in 0..depth {
            self.writer.write_event(XmlEvent::End(BytesEnd::new("extension")))?;
        }
        resolver.reset_event();
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub fn finish(mut self) -> CodecResult<W> {
        self.writer.write_event(XmlEvent::End(BytesEnd::new("EventList")))?;
        if self.in_query_results {
            self.writer.write_event(XmlEvent::End(BytesEnd::new("resultsBody")))?;
            self.writer.write_event(XmlEvent::End(BytesEnd::new("QueryResults")))?;
        }
        self.writer.write_event(XmlEvent::End(BytesEnd::new("EPCISBody")))?;
        let root_name = if self.kind == DocumentKind::Query { "epcisq:EPCISQueryDocument" } else { "epcis:EPCISDocument" };
        self.writer.write_event(XmlEvent::End(BytesEnd::new(root_name)))?;
        Ok(self.writer.into_inner())
    }
}

/// Writes a single event with no surrounding document frame — the XML
/// counterpart of a bare-event input on the way out (spec.md §4.5's
/// single-event shape, supported symmetrically for both directions).
#[tracing::instrument(skip_all)]
pub fn write_single_event<W: Write>(sink: W, event: &Event, resolver: &mut NamespaceResolver, wrap_in_extension: bool) -> CodecResult<W> {
    let mut writer = Writer::new_with_indent(sink, b' ', 2);
    writer.write_event(XmlEvent::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let depth = if wrap_in_extension { 2 } else { 0 };
    for _ in 0..depth {
        writer.write_event(XmlEvent::Start(BytesStart::new("extension")))?;
    }

    let tag = event.type_name();
    let mut start = BytesStart::new(tag);
    for (prefix, uri) in resolver.event_scope_for_emission() {
        start.push_attribute((format!("xmlns:{prefix}").as_str(), uri));
    }
    writer.write_event(XmlEvent::Start(start))?;
    write_core_and_body(&mut writer, event)?;
    writer.write_event(XmlEvent::End(BytesEnd::new(tag)))?;

    for _ in 0..depth {
        writer.write_event(XmlEvent::End(BytesEnd::new("extension")))?;
    }
    resolver.reset_event();
    Ok(writer.into_inner())
}

fn write_text_element<W: Write>(writer: &mut Writer<W>, tag: &str, text: &str) -> CodecResult<()> {
    writer.write_event(XmlEvent::Start(BytesStart::new(tag)))?;
    writer.write_event(XmlEvent::Text(BytesText::new(text)))?;
    writer.write_event(XmlEvent::End(BytesEnd::new(tag)))?;
    Ok(())
}

fn write_string_list<W: Write>(writer: &mut Writer<W>, list_tag: &str, item_tag: &str, items: &[String]) -> CodecResult<()> {
    if items.is_empty() {
        return Ok(());
    }
    writer.write_event(XmlEvent::Start(BytesStart::new(list_tag)))?;
    for item in items {
        write_text_element(writer, item_tag, item)?;
    }
    writer.write_event(XmlEvent::End(BytesEnd::new(list_tag)))?;
    Ok(())
}

fn write_location_ref<W: Write>(writer: &mut Writer<W>, tag: &str, location: &LocationRef) -> CodecResult<()> {
    writer.write_event(XmlEvent::Start(BytesStart::new(tag)))?;
    write_text_element(writer, "id", &location.id)?;
    for (key, value) in &location.extensions {
        write_element_value(writer, key, value)?;
    }
    writer.write_event(XmlEvent::End(BytesEnd::new(tag)))?;
    Ok(())
}

fn write_source_dest_list<W: Write>(writer: &mut Writer<W>, list_tag: &str, item_tag: &str, items: &[SourceDest]) -> CodecResult<()> {
    if items.is_empty() {
        return Ok(());
    }
    writer.write_event(XmlEvent::Start(BytesStart::new(list_tag)))?;
    for item in items {
        let mut start = BytesStart::new(item_tag);
        start.push_attribute(("type", item.kind.as_str()));
        writer.write_event(XmlEvent::Start(start))?;
        writer.write_event(XmlEvent::Text(BytesText::new(&item.value)))?;
        writer.write_event(XmlEvent::End(BytesEnd::new(item_tag)))?;
    }
    writer.write_event(XmlEvent::End(BytesEnd::new(list_tag)))?;
    Ok(())
}

fn write_biz_transaction_list<W: Write>(writer: &mut Writer<W>, items: &[BizTransaction]) -> CodecResult<()> {
    if items.is_empty() {
        return Ok(());
    }
    writer.write_event(XmlEvent::Start(BytesStart::new("bizTransactionList")))?;
    for item in items {
        let mut start = BytesStart::new("bizTransaction");
        if let Some(kind) = &item.kind {
            start.push_attribute(("type", kind.as_str()));
        }
        writer.write_event(XmlEvent::Start(start))?;
        writer.write_event(XmlEvent::Text(BytesText::new(&item.value)))?;
        writer.write_event(XmlEvent::End(BytesEnd::new("bizTransaction")))?;
    }
    writer.write_event(XmlEvent::End(BytesEnd::new("bizTransactionList")))?;
    Ok(())
}

fn write_quantity_list<W: Write>(writer: &mut Writer<W>, list_tag: &str, items: &[QuantityElement]) -> CodecResult<()> {
    if items.is_empty() {
        return Ok(());
    }
    writer.write_event(XmlEvent::Start(BytesStart::new(list_tag)))?;
    for item in items {
        writer.write_event(XmlEvent::Start(BytesStart::new("quantityElement")))?;
        write_text_element(writer, "epcClass", &item.epc_class)?;
        if let Some(quantity) = item.quantity {
            write_text_element(writer, "quantity", &quantity.to_string())?;
        }
        if let Some(uom) = &item.uom {
            write_text_element(writer, "uom", uom)?;
        }
        writer.write_event(XmlEvent::End(BytesEnd::new("quantityElement")))?;
    }
    writer.write_event(XmlEvent::End(BytesEnd::new(list_tag)))?;
    Ok(())
}

fn write_error_declaration<W: Write>(writer: &mut Writer<W>, error: &ErrorDeclaration) -> CodecResult<()> {
    writer.write_event(XmlEvent::Start(BytesStart::new("errorDeclaration")))?;
    write_text_element(writer, "declarationTime", &error.declaration_time.to_rfc3339())?;
    if let Some(reason) = &error.reason {
        write_text_element(writer, "reason", reason)?;
    }
    write_string_list(writer, "correctiveEventIDs", "correctiveEventID", &error.corrective_event_ids)?;
    writer.write_event(XmlEvent::End(BytesEnd::new("errorDeclaration")))?;
    Ok(())
}

fn write_core_prefix<W: Write>(writer: &mut Writer<W>, core: &EventCore) -> CodecResult<()> {
    write_text_element(writer, "eventTime", &core.event_time.to_rfc3339())?;
    write_text_element(writer, "eventTimeZoneOffset", &core.event_time_zone_offset)?;
    if let Some(record_time) = &core.record_time {
        write_text_element(writer, "recordTime", &record_time.to_rfc3339())?;
    }
    if let Some(event_id) = &core.event_id {
        write_text_element(writer, "eventID", event_id)?;
    }
    if let Some(error_declaration) = &core.error_declaration {
        write_error_declaration(writer, error_declaration)?;
    }
    Ok(())
}

fn write_core_suffix<W: Write>(writer: &mut Writer<W>, core: &EventCore) -> CodecResult<()> {
    if let Some(action) = core.action {
        write_text_element(writer, "action", action_literal(action))?;
    }
    if let Some(step) = &core.business_step {
        write_text_element(writer, "bizStep", step)?;
    }
    if let Some(disposition) = &core.disposition {
        write_text_element(writer, "disposition", disposition)?;
    }
    if let Some(read_point) = &core.read_point {
        write_location_ref(writer, "readPoint", read_point)?;
    }
    if let Some(biz_location) = &core.biz_location {
        write_location_ref(writer, "bizLocation", biz_location)?;
    }
    write_source_dest_list(writer, "sourceList", "source", &core.source_list)?;
    write_source_dest_list(writer, "destinationList", "destination", &core.destination_list)?;
    write_biz_transaction_list(writer, &core.biz_transaction_list)?;
    if let Some(persistent_disposition) = &core.persistent_disposition {
        write_element_value(writer, "persistentDisposition", persistent_disposition)?;
    }
    if !core.sensor_element_list.is_empty() {
        writer.write_event(XmlEvent::Start(BytesStart::new("sensorElementList")))?;
        for sensor_element in &core.sensor_element_list {
            write_element_value(writer, "sensorElement", sensor_element)?;
        }
        writer.write_event(XmlEvent::End(BytesEnd::new("sensorElementList")))?;
    }
    for (key, value) in &core.extensions {
        write_element_value(writer, key, value)?;
    }
    Ok(())
}

fn action_literal(action: epcis_model::Action) -> &'static str {
    match action {
        epcis_model::Action::Add => "ADD",
        epcis_model::Action::Observe => "OBSERVE",
        epcis_model::Action::Delete => "DELETE",
    }
}

fn write_core_and_body<W: Write>(writer: &mut Writer<W>, event: &Event) -> CodecResult<()> {
    write_core_prefix(writer, event.core())?;
    match event {
        Event::ObjectEvent(ObjectEvent { epc_list, quantity_list, ilmd, core }) => {
            write_string_list(writer, "epcList", "epc", epc_list)?;
            write_core_suffix(writer, core)?;
            write_quantity_list(writer, "quantityList", quantity_list)?;
            if let Some(ilmd) = ilmd {
                write_element_value(writer, "ilmd", ilmd)?;
            }
        }
        Event::AggregationEvent(AggregationEvent { parent_id, child_epcs, child_quantity_list, core }) => {
            if let Some(parent_id) = parent_id {
                write_text_element(writer, "parentID", parent_id)?;
            }
            write_string_list(writer, "childEPCs", "epc", child_epcs)?;
            write_core_suffix(writer, core)?;
            write_quantity_list(writer, "childQuantityList", child_quantity_list)?;
        }
        Event::TransactionEvent(TransactionEvent { parent_id, epc_list, quantity_list, core }) => {
            if let Some(parent_id) = parent_id {
                write_text_element(writer, "parentID", parent_id)?;
            }
            write_string_list(writer, "epcList", "epc", epc_list)?;
            write_core_suffix(writer, core)?;
            write_quantity_list(writer, "quantityList", quantity_list)?;
        }
        Event::TransformationEvent(TransformationEvent {
            transformation_id,
            input_epc_list,
            input_quantity_list,
            output_epc_list,
            output_quantity_list,
            ilmd,
            core,
        }) => {
            if let Some(transformation_id) = transformation_id {
                write_text_element(writer, "transformationID", transformation_id)?;
            }
            write_string_list(writer, "inputEPCList", "epc", input_epc_list)?;
            write_quantity_list(writer, "inputQuantityList", input_quantity_list)?;
            write_string_list(writer, "outputEPCList", "epc", output_epc_list)?;
            write_quantity_list(writer, "outputQuantityList", output_quantity_list)?;
            write_core_suffix(writer, core)?;
            if let Some(ilmd) = ilmd {
                write_element_value(writer, "ilmd", ilmd)?;
            }
        }
        Event::AssociationEvent(AssociationEvent { parent_id, child_epcs, child_quantity_list, core }) => {
            if let Some(parent_id) = parent_id {
                write_text_element(writer, "parentID", parent_id)?;
            }
            write_string_list(writer, "childEPCs", "epc", child_epcs)?;
            write_core_suffix(writer, core)?;
            write_quantity_list(writer, "childQuantityList", child_quantity_list)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use epcis_model::{ContextBinding, DocumentFrame};

    fn sample_event() -> Event {
        Event::ObjectEvent(ObjectEvent {
            core: EventCore {
                event_time: "2019-01-01T00:00:00+00:00".parse().unwrap(),
                event_time_zone_offset: "+00:00".to_string(),
                record_time: None,
                event_id: None,
                error_declaration: None,
                action: Some(epcis_model::Action::Observe),
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
    fn writes_a_well_formed_object_event() {
        let frame = DocumentFrame::new_capture(Version::V2_0, "2019-01-01T00:00:00+00:00".parse().unwrap());
        let resolver = NamespaceResolver::new();
        let mut doc_writer = XmlDocumentWriter::new(Vec::new(), &frame, &resolver).unwrap();
        let mut event_resolver = NamespaceResolver::new();
        doc_writer.write_event(&sample_event(), &mut event_resolver, false).unwrap();
        let bytes = doc_writer.finish().unwrap();
        let xml = String::from_utf8(bytes).unwrap();
        assert!(xml.contains("<ObjectEvent>"));
        assert!(xml.contains("urn:epc:id:sgtin:234567890.1123.9999"));
        assert!(xml.contains("</EPCISDocument>") || xml.contains("</epcis:EPCISDocument>"));
    }

    #[test]
    fn write_single_event_produces_a_bare_element_with_no_document_wrapper() {
        let mut resolver = NamespaceResolver::new();
        let bytes = write_single_event(Vec::new(), &sample_event(), &mut resolver, false).unwrap();
        let xml = String::from_utf8(bytes).unwrap();
        assert!(xml.contains("<ObjectEvent>"));
        assert!(!xml.contains("EPCISDocument"));
        assert!(!xml.contains("EventList"));
    }

    #[test]
    fn wraps_association_event_in_nested_extension_for_1_2_output() {
        let frame = DocumentFrame::new_capture(Version::V1_2, "2019-01-01T00:00:00+00:00".parse().unwrap());
        let resolver = NamespaceResolver::new();
        let mut doc_writer = XmlDocumentWriter::new(Vec::new(), &frame, &resolver).unwrap();
        let event = Event::AssociationEvent(AssociationEvent {
            core: match sample_event() {
                Event::ObjectEvent(e) => e.core,
                _ => unreachable!(),
            },
            parent_id: Some("urn:epc:id:grai:234567890.1123.9999".to_string()),
            child_epcs: vec![],
            child_quantity_list: vec![],
        });
        let mut event_resolver = NamespaceResolver::new();
        doc_writer.write_event(&event, &mut event_resolver, true).unwrap();
        let bytes = doc_writer.finish().unwrap();
        let xml = String::from_utf8(bytes).unwrap();
        assert_eq!(xml.matches("<extension>").count(), 2);
        assert!(xml.contains("<AssociationEvent>"));
    }
}
