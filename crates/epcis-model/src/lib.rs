//! Canonical data model for the EPCIS document converter: the Conversion
//! Spec, Document Frame, the polymorphic Event, and the shared error
//! taxonomy. See `SPEC_FULL.md` §3 and §12.

mod error;
mod event;
mod frame;
mod spec;

pub use error::{ConversionError, ConversionResult};
pub use event::{
    Action, AggregationEvent, AssociationEvent, BizTransaction, ErrorDeclaration, Event,
    EventCore, ExtensionValue, LocationRef, ObjectEvent, QuantityElement, SourceDest, Timestamp,
    TransactionEvent, TransformationEvent,
};
pub use frame::{ContextBinding, ContextEntry, DecodedInput, DocumentFrame, DocumentKind};
pub use spec::{
    CbvFormatPolicy, ConversionSpec, ConversionSpecBuilder, EpcFormatPolicy, Format, OnFailure,
    Version,
};
