//! C9 Event Handler / Collector: aggregates transcoded events into a
//! target document (header, event array, footer). Grounded on
//! `epcis-codec`'s own writer pair (`XmlDocumentWriter`/`JsonDocumentWriter`)
//! — this type is the thin state machine gluing whichever one `to_format`
//! selects to the pipeline's per-event calls, enforcing the start/handle/end
//! balance invariant spec.md §4.9 calls a "fatal implementation error" to
//! violate.

use std::io::Write;

use epcis_codec::{write_single_event_json, write_single_event_xml, CodecResult, JsonDocumentWriter, XmlDocumentWriter};
use epcis_context::ContextHandler;
use epcis_model::{DocumentFrame, Event, Format};
use epcis_namespace::NamespaceResolver;

enum CollectorState<W: Write> {
    NotStarted(W),
    Xml(XmlDocumentWriter<W>),
    Json(JsonDocumentWriter<W>),
    Ended,
}

/// Assembles one output document. `start` must be called exactly once
/// before any `handle`, and `end` exactly once after the last `handle`.
pub struct DocumentCollector<W: Write> {
    state: CollectorState<W>,
    to_format: Format,
}

impl<W: Write> DocumentCollector<W> {
    pub fn new(sink: W, to_format: Format) -> Self {
        DocumentCollector { state: CollectorState::NotStarted(sink), to_format }
    }

    /// Opens the document frame.
    ///
    /// # Panics
    /// Panics if called more than once on the same collector.
    pub fn start(&mut self, frame: &DocumentFrame, resolver: &NamespaceResolver, context_handler: &dyn ContextHandler) -> CodecResult<()> {
        let sink = match std::mem::replace(&mut self.state, CollectorState::Ended) {
            CollectorState::NotStarted(sink) => sink,
            _ => panic!("DocumentCollector::start called more than once"),
        };
        self.state = match self.to_format {
            Format::Xml => CollectorState::Xml(XmlDocumentWriter::new(sink, frame, resolver)?),
            Format::JsonLd => CollectorState::Json(JsonDocumentWriter::new(sink, frame, resolver, context_handler)?),
        };
        Ok(())
    }

    /// Emits one event. `resolver` carries only this event's own scope —
    /// document scope was already fixed by `start`.
    ///
    /// # Panics
    /// Panics if called before `start` or after `end`.
    pub fn handle(&mut self, event: &Event, resolver: &mut NamespaceResolver, wrap_in_extension: bool) -> CodecResult<()> {
        match &mut self.state {
            CollectorState::Xml(writer) => writer.write_event(event, resolver, wrap_in_extension),
            CollectorState::Json(writer) => writer.write_event(event),
            CollectorState::NotStarted(_) => panic!("DocumentCollector::handle called before start"),
            CollectorState::Ended => panic!("DocumentCollector::handle called after end"),
        }
    }

    /// Closes the document frame and returns the sink.
    ///
    /// # Panics
    /// Panics if called before `start`, or more than once.
    pub fn end(&mut self) -> CodecResult<W> {
        match std::mem::replace(&mut self.state, CollectorState::Ended) {
            CollectorState::Xml(writer) => writer.finish(),
            CollectorState::Json(writer) => writer.finish(),
            CollectorState::NotStarted(_) => panic!("DocumentCollector::end called before start"),
            CollectorState::Ended => panic!("DocumentCollector::end called twice"),
        }
    }
}

/// Writes a single event with no surrounding document frame — the
/// collector-side counterpart of a single-event input (spec.md §4.5's
/// "supported shape" mirrored on the way out). There is no frame to open
/// or close here, so this is a free function rather than a
/// `DocumentCollector` method.
pub fn collect_single_event<W: Write>(
    sink: W,
    to_format: Format,
    event: &Event,
    resolver: &mut NamespaceResolver,
    wrap_in_extension: bool,
) -> CodecResult<W> {
    match to_format {
        Format::Xml => write_single_event_xml(sink, event, resolver, wrap_in_extension),
        Format::JsonLd => write_single_event_json(sink, event),
    }
}
