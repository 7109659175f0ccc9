//! Property coverage for the round-trip laws spec.md §8 states informally
//! ("XML 2.0 -> JSON-LD 2.0 -> XML 2.0 reproduces the same events in the
//! same order"). Kept in its own file rather than `src/convert.rs`'s unit
//! test module, mirroring how multi-event fuzz coverage lives in its own
//! `tests/*_fuzz.rs` file one directory over in this workspace.

use std::io::Cursor;

use epcis_context::ContextHandlerRegistry;
use epcis_model::{EpcFormatPolicy, Format, Version};
use epcis_pipeline::convert;
use quickcheck::quickcheck;

fn xml_document_with_serials(serials: &[String]) -> String {
    let events: String = serials
        .iter()
        .map(|serial| {
            format!(
                r#"<ObjectEvent>
                    <eventTime>2019-01-01T00:00:00.000+00:00</eventTime>
                    <eventTimeZoneOffset>+00:00</eventTimeZoneOffset>
                    <epcList><epc>urn:epc:id:sgtin:234567890.1123.{serial}</epc></epcList>
                    <action>OBSERVE</action>
                </ObjectEvent>"#
            )
        })
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<epcis:EPCISDocument xmlns:epcis="urn:epcglobal:epcis:xsd:2" schemaVersion="2.0" creationDate="2019-01-01T00:00:00.000Z">
  <EPCISBody>
    <EventList>{events}</EventList>
  </EPCISBody>
</epcis:EPCISDocument>"#
    )
}

fn event_count_round_trips(serial_suffixes: Vec<u16>) -> bool {
    if serial_suffixes.is_empty() {
        return true;
    }
    let serials: Vec<String> = serial_suffixes.iter().map(|n| format!("{:04}", n % 10_000)).collect();
    let xml = xml_document_with_serials(&serials);
    let registry = ContextHandlerRegistry::with_builtin_handlers();

    // XML 2.0 -> JSON-LD 2.0, identifiers left untouched so the epcList
    // values carry the same serial numbers back out.
    let to_json = epcis_model::ConversionSpec::builder(Format::Xml, Format::JsonLd, Version::V2_0)
        .epc_format_header(EpcFormatPolicy::NeverTranslates)
        .build();
    let json_bytes = {
        let mut out = Vec::new();
        let input = Cursor::new(xml.clone().into_bytes());
        let Ok(summary) = convert(&to_json, input, &mut out, &registry, None, None) else {
            return false;
        };
        if summary.events_emitted as usize != serials.len() {
            return false;
        }
        out
    };

    // JSON-LD 2.0 -> XML 2.0, same policy.
    let to_xml = epcis_model::ConversionSpec::builder(Format::JsonLd, Format::Xml, Version::V2_0)
        .from_version(Version::V2_0)
        .epc_format_header(EpcFormatPolicy::NeverTranslates)
        .build();
    let xml_bytes = {
        let mut out = Vec::new();
        let input = Cursor::new(json_bytes);
        let Ok(summary) = convert(&to_xml, input, &mut out, &registry, None, None) else {
            return false;
        };
        if summary.events_emitted as usize != serials.len() {
            return false;
        }
        out
    };

    let round_tripped = String::from_utf8(xml_bytes).unwrap();
    serials.iter().all(|serial| round_tripped.contains(&format!("urn:epc:id:sgtin:234567890.1123.{serial}")))
}

quickcheck! {
    fn event_count_and_identifiers_round_trip_across_formats(serial_suffixes: Vec<u16>) -> bool {
        event_count_round_trips(serial_suffixes)
    }
}
