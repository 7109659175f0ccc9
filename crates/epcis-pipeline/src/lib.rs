//! C7 Format Pipeline and C9 Event Handler / Collector: the crate that
//! composes every other `epcis-*` crate (detect, namespace, context,
//! identifier, codec, schema) into the single `convert` entry point a
//! caller drives, plus the collector that assembles converted events back
//! into an output document.

mod collector;
mod convert;
mod validator;

pub use collector::{collect_single_event, DocumentCollector};
pub use convert::{convert, ConversionSummary, EventMapper};
pub use validator::Validator;
