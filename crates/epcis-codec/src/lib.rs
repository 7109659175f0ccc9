//! C5 Event Codec: streaming decode/encode between the wire formats (XML,
//! JSON-LD) and the canonical `epcis_model` types. See `SPEC_FULL.md` §4.5.
//!
//! Each direction is bounded-memory: the document frame (small, fixed
//! size) is decoded up front, then events are pulled or pushed one at a
//! time through the `EventList`/`eventList`, never materializing the
//! whole document. `epcis-pipeline` drives both readers/writers; this
//! crate only knows how to talk wire format, not which conversion is
//! happening or why.

mod error;
mod json_cursor;
mod json_reader;
mod json_writer;
mod xml_reader;
mod xml_value;
mod xml_writer;

pub use error::{CodecError, CodecResult};
pub use json_reader::JsonDocumentReader;
pub use json_writer::{write_single_event as write_single_event_json, JsonDocumentWriter};
pub use xml_reader::XmlDocumentReader;
pub use xml_writer::{write_single_event as write_single_event_xml, XmlDocumentWriter};
