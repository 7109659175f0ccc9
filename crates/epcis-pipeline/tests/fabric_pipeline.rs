//! End-to-end integration test driving spec.md §2's full control flow —
//! C8 (reactive fabric) delivering chunked bytes under backpressure into
//! C7/C9 (`convert`'s decode/transform/collect pipeline, which itself
//! exercises C1-C6) — rather than just the two halves in isolation. See
//! `DESIGN.md`'s `epcis-pipeline` entry for why `convert` itself stays
//! synchronous over a plain `BufRead + Seek` source: this test is the
//! bridge a caller wiring the fabric in front of `convert` would write.

use std::io::Cursor;
use std::time::Duration;

use bytes::Bytes;
use epcis_context::ContextHandlerRegistry;
use epcis_fabric::{channel_with_timeout, drive};
use epcis_model::{ConversionSpec, Format, Version};
use epcis_pipeline::convert;

fn xml_document() -> &'static str {
    r#"<?xml version="1.0" encoding="UTF-8"?>
<epcis:EPCISDocument xmlns:epcis="urn:epcglobal:epcis:xsd:2" schemaVersion="2.0" creationDate="2019-01-01T00:00:00.000Z">
  <EPCISBody>
    <EventList>
      <ObjectEvent>
        <eventTime>2019-01-01T00:00:00.000+00:00</eventTime>
        <eventTimeZoneOffset>+00:00</eventTimeZoneOffset>
        <epcList><epc>urn:epc:id:sgtin:234567890.1123.9999</epc></epcList>
        <action>OBSERVE</action>
      </ObjectEvent>
    </EventList>
  </EPCISBody>
</epcis:EPCISDocument>"#
}

/// Splits the input into small chunks so the fabric's prefetch window and
/// demand replenishment actually get exercised rather than handing the
/// whole document across in one publish.
fn chunked(bytes: &[u8], size: usize) -> Vec<Bytes> {
    bytes.chunks(size).map(Bytes::copy_from_slice).collect()
}

#[tokio::test]
async fn reactive_fabric_delivers_chunks_that_convert_decodes_end_to_end() {
    let chunks = chunked(xml_document().as_bytes(), 7);

    let (publisher, mut reader) = channel_with_timeout::<Bytes, String>(Duration::from_millis(500));
    tokio::spawn(drive(publisher, move |mut yielder| async move {
        for chunk in chunks {
            yielder.yield_(chunk).await;
        }
        Ok::<(), String>(())
    }));

    // Pull every chunk off the fabric's pull-style reader, respecting its
    // backpressure/demand protocol, and assemble them back into one buffer
    // the way a caller bridging fabric into `convert`'s `R: BufRead + Seek`
    // would (spec.md §5: "a caller bridging fabric's pull-reader into
    // convert's R is expected to adapt it to Read/BufRead at the call site").
    let mut assembled = Vec::new();
    while let Some(chunk) = reader.next_chunk().await.unwrap() {
        assembled.extend_from_slice(&chunk);
    }
    assert_eq!(assembled, xml_document().as_bytes());

    let spec = ConversionSpec::builder(Format::Xml, Format::JsonLd, Version::V2_0).build();
    let registry = ContextHandlerRegistry::with_builtin_handlers();
    let mut out = Vec::new();
    let summary = convert(&spec, Cursor::new(assembled), &mut out, &registry, None, None).unwrap();
    assert_eq!(summary.events_emitted, 1);
    assert_eq!(summary.events_dropped, 0);

    let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(value["type"], "EPCISDocument");
    assert_eq!(
        value["epcisBody"]["eventList"][0]["epcList"][0],
        "https://id.gs1.org/01/12345678901231/21/9999"
    );
}
