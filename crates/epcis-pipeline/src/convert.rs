//! C7 Format Pipeline: the top-level `convert` entry point. Generalizes the
//! teacher's closed-set `parser_for` dispatch (a `match` choosing a parse
//! strategy from a small enum of known shapes) into the from/to format ×
//! version table spec.md §4.7 lays out — except here there is no literal
//! table to match against, because every row in it reduces to the same
//! three steps applied conditionally: decode, transform-if-versions-differ,
//! rewrite identifiers, encode. Rejecting the two combinations the table
//! omits (JSON-LD at 1.2, on either side) is the only place the dispatch
//! is genuinely table-shaped, so that's the only place this module keeps
//! an explicit check.

use std::io::{BufRead, Seek, Write};

use epcis_codec::{CodecError, CodecResult, JsonDocumentReader, XmlDocumentReader};
use epcis_context::ContextHandlerRegistry;
use epcis_detect::{scan_version, DetectError};
use epcis_identifier::rewrite_event_identifiers;
use epcis_model::{
    ConversionError, ConversionResult, ConversionSpec, DecodedInput, DocumentFrame, Event, Format, OnFailure, Version,
};
use epcis_namespace::NamespaceResolver;
use epcis_schema::{needs_extension_wrap, transform_event, transform_frame, SchemaFeatures, TransformedEvent};

use crate::collector::{collect_single_event, DocumentCollector};
use crate::validator::Validator;

/// `(event, document-scope namespaces, sequence number) -> event`, run
/// exactly once per event after decode/transform/identifier-rewrite and
/// before the collector sees it (spec.md §4.5 "Event mapper hook", §9
/// "the hook position is fixed: after decode, before encode").
pub type EventMapper<'a> = &'a dyn Fn(Event, &[(String, String)], u64) -> Event;

/// What one call to [`convert`] produced. Dropped events are 2.0-only
/// constructs a strict 1.2 target excludes (`epcis-schema`'s
/// `TransformedEvent::Drop`) or events a `SkipAndContinue` validator
/// rejected — either way they never reached the collector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConversionSummary {
    pub events_emitted: u64,
    pub events_dropped: u64,
}

/// Runs one conversion end to end: detect (if `spec.from_version` is
/// unset), decode, schema-transform, identifier/CBV-rewrite, optionally
/// map and validate, then collect into `output`. `input` must be
/// seekable because the prefix scanner (C1) needs to reset it; the codec
/// readers themselves only ever need `BufRead`.
#[tracing::instrument(skip_all, fields(from_format = ?spec.from_format, to_format = ?spec.to_format, to_version = ?spec.to_version))]
pub fn convert<R, W>(
    spec: &ConversionSpec,
    mut input: R,
    output: W,
    context_registry: &ContextHandlerRegistry,
    event_mapper: Option<EventMapper<'_>>,
    validator: Option<&dyn Validator>,
) -> ConversionResult<ConversionSummary>
where
    R: BufRead + Seek,
    W: Write,
{
    let from_version = match spec.resolved_from_version() {
        Some(version) => version,
        None => scan_version(&mut input).map_err(map_detect_err)?,
    };
    validate_conversion_plan(spec, from_version)?;

    let features = SchemaFeatures::resolve(spec);

    match spec.from_format {
        Format::Xml => {
            let (reader, decoded) = XmlDocumentReader::new(input).map_err(map_codec_err)?;
            match decoded {
                DecodedInput::SingleEvent(event) => convert_single_event(spec, features, event, &[], output, event_mapper, validator),
                DecodedInput::Document(frame) => {
                    let mut reader = reader.expect("a document decode always yields a streaming reader");
                    let doc_namespaces: Vec<(String, String)> = reader.namespace_resolver().all_document().to_vec();
                    run_document(spec, features, frame, &doc_namespaces, context_registry, output, move || reader.next_event(), event_mapper, validator)
                }
            }
        }
        Format::JsonLd => {
            let (reader, decoded) = JsonDocumentReader::new(input, context_registry).map_err(map_codec_err)?;
            match decoded {
                DecodedInput::SingleEvent(event) => convert_single_event(spec, features, event, &[], output, event_mapper, validator),
                DecodedInput::Document(frame) => {
                    let mut reader = reader.expect("a document decode always yields a streaming reader");
                    let doc_namespaces: Vec<(String, String)> = reader.namespace_resolver().all_document().to_vec();
                    run_document(spec, features, frame, &doc_namespaces, context_registry, output, move || reader.next_event(), event_mapper, validator)
                }
            }
        }
    }
}

/// The two combinations spec.md §4.7's dispatch table never lists: JSON-LD
/// has no 1.2 binding, on either side of the conversion.
fn validate_conversion_plan(spec: &ConversionSpec, from_version: Version) -> ConversionResult<()> {
    let is_jsonld_1_2 = |format: Format, version: Version| format == Format::JsonLd && version != Version::V2_0;
    if is_jsonld_1_2(spec.from_format, from_version) || is_jsonld_1_2(spec.to_format, spec.to_version) {
        return Err(ConversionError::UnsupportedConversion {
            from_format: spec.from_format,
            from_version,
            to_format: spec.to_format,
            to_version: spec.to_version,
        });
    }
    Ok(())
}

/// Opens the output document, drives every event pulled by `next_event`
/// through the shared per-event pipeline, and closes the document — unless
/// the per-event pipeline aborts, in which case `end()` is deliberately
/// never called: the sink is left holding a truncated, imbalanced
/// document, since whatever partial output precedes an aborted conversion
/// is discarded by the caller anyway (spec.md §7 "any partial output is
/// discarded").
#[allow(clippy::too_many_arguments)]
fn run_document<W: Write>(
    spec: &ConversionSpec,
    features: SchemaFeatures,
    frame: DocumentFrame,
    doc_namespaces: &[(String, String)],
    context_registry: &ContextHandlerRegistry,
    output: W,
    next_event: impl FnMut() -> CodecResult<Option<Event>>,
    event_mapper: Option<EventMapper<'_>>,
    validator: Option<&dyn Validator>,
) -> ConversionResult<ConversionSummary> {
    let to_frame = transform_frame(frame, spec.to_version);

    let mut write_resolver = NamespaceResolver::new();
    for (prefix, uri) in doc_namespaces {
        write_resolver.populate_document(uri, prefix);
    }

    let context_handler = context_registry.select_for_building(spec.gs1_extension.as_deref());

    let mut collector = DocumentCollector::new(output, spec.to_format);
    collector.start(&to_frame, &write_resolver, context_handler).map_err(map_codec_err)?;

    let summary = run_event_loop(spec, features, doc_namespaces, next_event, &mut collector, event_mapper, validator)?;

    collector.end().map_err(map_codec_err)?;
    Ok(summary)
}

#[allow(clippy::too_many_arguments)]
fn run_event_loop<W: Write>(
    spec: &ConversionSpec,
    features: SchemaFeatures,
    doc_namespaces: &[(String, String)],
    mut next_event: impl FnMut() -> CodecResult<Option<Event>>,
    collector: &mut DocumentCollector<W>,
    event_mapper: Option<EventMapper<'_>>,
    validator: Option<&dyn Validator>,
) -> ConversionResult<ConversionSummary> {
    let mut summary = ConversionSummary::default();
    let mut sequence: u64 = 0;

    while let Some(event) = next_event().map_err(map_codec_err)? {
        let event = match transform_event(event, spec.to_version, features) {
            TransformedEvent::Keep(event) => event,
            TransformedEvent::Drop => {
                summary.events_dropped += 1;
                sequence += 1;
                continue;
            }
        };

        match dispatch_one(spec, event, doc_namespaces, sequence, event_mapper, validator)? {
            Some(event) => {
                let wrap_in_extension = needs_extension_wrap(&event, spec.to_version);
                let mut event_resolver = NamespaceResolver::new();
                for (prefix, uri) in &event.core().event_scope_namespaces {
                    event_resolver.populate_event(uri, prefix);
                }
                collector.handle(&event, &mut event_resolver, wrap_in_extension).map_err(map_codec_err)?;
                summary.events_emitted += 1;
            }
            None => summary.events_dropped += 1,
        }
        sequence += 1;
    }

    Ok(summary)
}

/// Identifier/CBV rewrite (always runs, errors always abort regardless of
/// `on_failure`), then the optional caller mapper, then the optional
/// validator (whose failure does respect `on_failure`). Returns `None`
/// when a `SkipAndContinue` validator rejected the event.
fn dispatch_one(
    spec: &ConversionSpec,
    mut event: Event,
    doc_namespaces: &[(String, String)],
    sequence: u64,
    event_mapper: Option<EventMapper<'_>>,
    validator: Option<&dyn Validator>,
) -> ConversionResult<Option<Event>> {
    rewrite_event_identifiers(&mut event, spec.epc_format, spec.cbv_format, None)?;

    if let Some(mapper) = event_mapper {
        event = mapper(event, doc_namespaces, sequence);
    }

    if let Some(validator) = validator {
        if let Err(reason) = validator.validate(&event) {
            return match spec.on_failure {
                OnFailure::Abort => Err(ConversionError::ValidationFailed { sequence, reason }),
                OnFailure::SkipAndContinue => Ok(None),
            };
        }
    }

    Ok(Some(event))
}

fn convert_single_event<W: Write>(
    spec: &ConversionSpec,
    features: SchemaFeatures,
    event: Event,
    doc_namespaces: &[(String, String)],
    output: W,
    event_mapper: Option<EventMapper<'_>>,
    validator: Option<&dyn Validator>,
) -> ConversionResult<ConversionSummary> {
    let event = match transform_event(event, spec.to_version, features) {
        TransformedEvent::Keep(event) => event,
        TransformedEvent::Drop => return Ok(ConversionSummary { events_emitted: 0, events_dropped: 1 }),
    };

    let event = match dispatch_one(spec, event, doc_namespaces, 0, event_mapper, validator)? {
        Some(event) => event,
        None => return Ok(ConversionSummary { events_emitted: 0, events_dropped: 1 }),
    };

    let wrap_in_extension = needs_extension_wrap(&event, spec.to_version);
    let mut event_resolver = NamespaceResolver::new();
    for (prefix, uri) in &event.core().event_scope_namespaces {
        event_resolver.populate_event(uri, prefix);
    }
    collect_single_event(output, spec.to_format, &event, &mut event_resolver, wrap_in_extension).map_err(map_codec_err)?;

    Ok(ConversionSummary { events_emitted: 1, events_dropped: 0 })
}

fn map_codec_err(err: CodecError) -> ConversionError {
    match err {
        CodecError::Model(inner) => inner,
        other => ConversionError::MalformedInput(other.to_string()),
    }
}

fn map_detect_err(err: DetectError) -> ConversionError {
    match err {
        DetectError::UnknownVersion => ConversionError::UnknownVersion,
        DetectError::UnsupportedVersion(literal) => ConversionError::UnsupportedVersion(literal),
        DetectError::Io(e) => ConversionError::MalformedInput(e.to_string()),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Cursor;

    use epcis_model::EpcFormatPolicy;

    fn xml_2_0_document() -> &'static str {
        r#"<?xml version="1.0" encoding="UTF-8"?>
<epcis:EPCISDocument xmlns:epcis="urn:epcglobal:epcis:xsd:2" xmlns:ext="https://example.com/ext/" schemaVersion="2.0" creationDate="2019-01-01T00:00:00.000Z">
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
      </ObjectEvent>
    </EventList>
  </EPCISBody>
</epcis:EPCISDocument>"#
    }

    #[test]
    fn s1_xml_2_0_to_json_2_0_rewrites_identifiers_to_digital_link() {
        let spec = ConversionSpec::builder(Format::Xml, Format::JsonLd, Version::V2_0).build();
        let registry = ContextHandlerRegistry::with_builtin_handlers();
        let input = Cursor::new(xml_2_0_document().as_bytes().to_vec());
        let summary = convert(&spec, input, Vec::new(), &registry, None, None).unwrap();
        assert_eq!(summary, ConversionSummary { events_emitted: 1, events_dropped: 0 });
    }

    #[test]
    fn xml_2_0_to_json_2_0_output_round_trips_through_serde_json() {
        let spec = ConversionSpec::builder(Format::Xml, Format::JsonLd, Version::V2_0).build();
        let registry = ContextHandlerRegistry::with_builtin_handlers();
        let input = Cursor::new(xml_2_0_document().as_bytes().to_vec());
        let bytes = {
            let mut out = Vec::new();
            convert(&spec, input, &mut out, &registry, None, None).unwrap();
            out
        };
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["type"], "EPCISDocument");
        let event = &value["epcisBody"]["eventList"][0];
        assert_eq!(event["type"], "ObjectEvent");
        assert_eq!(event["epcList"][0], "https://id.gs1.org/01/12345678901231/21/9999");
    }

    #[test]
    fn never_translates_leaves_identifiers_as_urns() {
        let spec = ConversionSpec::builder(Format::Xml, Format::JsonLd, Version::V2_0)
            .epc_format_header(EpcFormatPolicy::NeverTranslates)
            .build();
        let registry = ContextHandlerRegistry::with_builtin_handlers();
        let input = Cursor::new(xml_2_0_document().as_bytes().to_vec());
        let mut out = Vec::new();
        convert(&spec, input, &mut out, &registry, None, None).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(
            value["epcisBody"]["eventList"][0]["epcList"][0],
            "urn:epc:id:sgtin:234567890.1123.9999"
        );
    }

    #[test]
    fn s6_1_2_association_event_upgrades_to_2_0_without_extension_wrappers() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<epcis:EPCISDocument xmlns:epcis="urn:epcglobal:epcis:xsd:1" schemaVersion="1.2" creationDate="2019-01-01T00:00:00.000Z">
  <EPCISBody>
    <EventList>
      <extension>
        <extension>
          <AssociationEvent>
            <eventTime>2019-01-01T00:00:00.000+00:00</eventTime>
            <eventTimeZoneOffset>+00:00</eventTimeZoneOffset>
            <action>ADD</action>
            <parentID>urn:epc:id:grai:234567890.1123.9999</parentID>
          </AssociationEvent>
        </extension>
      </extension>
    </EventList>
  </EPCISBody>
</epcis:EPCISDocument>"#;
        let spec = ConversionSpec::builder(Format::Xml, Format::Xml, Version::V2_0)
            .epc_format_header(EpcFormatPolicy::NeverTranslates)
            .build();
        let registry = ContextHandlerRegistry::with_builtin_handlers();
        let input = Cursor::new(xml.as_bytes().to_vec());
        let mut out = Vec::new();
        convert(&spec, input, &mut out, &registry, None, None).unwrap();
        let output = String::from_utf8(out).unwrap();
        assert!(output.contains("<AssociationEvent>"));
        assert!(!output.contains("<extension>"));
    }

    #[test]
    fn strict_1_2_output_drops_association_events_and_counts_them() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<epcis:EPCISDocument xmlns:epcis="urn:epcglobal:epcis:xsd:2" schemaVersion="2.0" creationDate="2019-01-01T00:00:00.000Z">
  <EPCISBody>
    <EventList>
      <AssociationEvent>
        <eventTime>2019-01-01T00:00:00.000+00:00</eventTime>
        <eventTimeZoneOffset>+00:00</eventTimeZoneOffset>
        <action>ADD</action>
        <parentID>urn:epc:id:grai:234567890.1123.9999</parentID>
      </AssociationEvent>
    </EventList>
  </EPCISBody>
</epcis:EPCISDocument>"#;
        let spec = ConversionSpec::builder(Format::Xml, Format::Xml, Version::V1_2)
            .gs1_compliant_1_2(true)
            .epc_format_header(EpcFormatPolicy::NeverTranslates)
            .build();
        let registry = ContextHandlerRegistry::with_builtin_handlers();
        let input = Cursor::new(xml.as_bytes().to_vec());
        let summary = convert(&spec, input, Vec::new(), &registry, None, None).unwrap();
        assert_eq!(summary, ConversionSummary { events_emitted: 0, events_dropped: 1 });
    }

    #[test]
    fn s5_always_epc_urn_without_gcp_hint_fails_before_any_event_is_written() {
        let json = r#"{
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
                        "epcList": ["https://id.gs1.org/01/07610032000010/21/987"],
                        "action": "OBSERVE"
                    }
                ]
            }
        }"#;
        let spec = ConversionSpec::builder(Format::JsonLd, Format::JsonLd, Version::V2_0)
            .epc_format_header(EpcFormatPolicy::AlwaysEpcUrn)
            .build();
        let registry = ContextHandlerRegistry::with_builtin_handlers();
        let input = Cursor::new(json.as_bytes().to_vec());
        let err = convert(&spec, input, Vec::new(), &registry, None, None).unwrap_err();
        assert!(matches!(err, ConversionError::UnknownGcpLength(_)));
    }

    #[test]
    fn json_ld_at_1_2_is_rejected_as_an_unsupported_conversion() {
        let spec = ConversionSpec::builder(Format::JsonLd, Format::JsonLd, Version::V1_2)
            .from_version(Version::V2_0)
            .build();
        let registry = ContextHandlerRegistry::with_builtin_handlers();
        let input = Cursor::new(b"{}".to_vec());
        let err = convert(&spec, input, Vec::new(), &registry, None, None).unwrap_err();
        assert!(matches!(err, ConversionError::UnsupportedConversion { .. }));
    }

    #[test]
    fn a_bare_single_event_input_produces_a_bare_single_event_output() {
        let xml = r#"<ObjectEvent>
            <eventTime>2019-01-01T00:00:00.000+00:00</eventTime>
            <eventTimeZoneOffset>+00:00</eventTimeZoneOffset>
            <epcList><epc>urn:epc:id:sgtin:234567890.1123.9999</epc></epcList>
            <action>OBSERVE</action>
        </ObjectEvent>"#;
        let spec = ConversionSpec::builder(Format::Xml, Format::JsonLd, Version::V2_0).build();
        let registry = ContextHandlerRegistry::with_builtin_handlers();
        let input = Cursor::new(xml.as_bytes().to_vec());
        let mut out = Vec::new();
        let summary = convert(&spec, input, &mut out, &registry, None, None).unwrap();
        assert_eq!(summary, ConversionSummary { events_emitted: 1, events_dropped: 0 });
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["type"], "ObjectEvent");
        assert!(value.get("epcisBody").is_none());
    }

    #[test]
    fn validation_failure_aborts_and_reports_the_sequence_number() {
        struct RejectAll;
        impl Validator for RejectAll {
            fn validate(&self, _event: &Event) -> Result<(), String> {
                Err("rejected by policy".to_string())
            }
        }
        let spec = ConversionSpec::builder(Format::Xml, Format::JsonLd, Version::V2_0).build();
        let registry = ContextHandlerRegistry::with_builtin_handlers();
        let input = Cursor::new(xml_2_0_document().as_bytes().to_vec());
        let err = convert(&spec, input, Vec::new(), &registry, None, Some(&RejectAll)).unwrap_err();
        assert!(matches!(err, ConversionError::ValidationFailed { sequence: 0, .. }));
    }

    #[test]
    fn skip_and_continue_drops_the_rejected_event_without_aborting() {
        struct RejectAll;
        impl Validator for RejectAll {
            fn validate(&self, _event: &Event) -> Result<(), String> {
                Err("rejected by policy".to_string())
            }
        }
        let spec = ConversionSpec::builder(Format::Xml, Format::JsonLd, Version::V2_0)
            .on_failure(OnFailure::SkipAndContinue)
            .build();
        let registry = ContextHandlerRegistry::with_builtin_handlers();
        let input = Cursor::new(xml_2_0_document().as_bytes().to_vec());
        let summary = convert(&spec, input, Vec::new(), &registry, None, Some(&RejectAll)).unwrap();
        assert_eq!(summary, ConversionSummary { events_emitted: 0, events_dropped: 1 });
    }

    #[test]
    fn event_mapper_runs_once_after_identifier_rewrite() {
        let spec = ConversionSpec::builder(Format::Xml, Format::JsonLd, Version::V2_0).build();
        let registry = ContextHandlerRegistry::with_builtin_handlers();
        let input = Cursor::new(xml_2_0_document().as_bytes().to_vec());
        let mapper: EventMapper = &|mut event, _namespaces, sequence| {
            event.core_mut().event_id = Some(format!("seq-{sequence}"));
            event
        };
        let mut out = Vec::new();
        convert(&spec, input, &mut out, &registry, Some(mapper), None).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["epcisBody"]["eventList"][0]["eventID"], "seq-0");
        assert_eq!(
            value["epcisBody"]["eventList"][0]["epcList"][0],
            "https://id.gs1.org/01/12345678901231/21/9999"
        );
    }
}
