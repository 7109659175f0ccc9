use serde_json::{Map, Value};

/// An EPCIS event timestamp. EPCIS always carries an explicit UTC offset
/// alongside the instant, so `FixedOffset` (rather than `Utc`) is the right
/// `chrono` type: it round-trips the exact offset a producer wrote instead
/// of normalizing it away.
pub type Timestamp = chrono::DateTime<chrono::FixedOffset>;

/// Opaque, order-preserving JSON content used for anything this converter
/// passes through without interpreting: ILMD, sensor elements, and
/// caller-defined extension fields. Object keys are JSON-LD compact IRIs
/// (`"prefix:local"`) which, by construction of the EPCIS context, are the
/// same token used as an XML qualified name — see `epcis-codec` for the
/// element⟷value mapping this symmetry enables.
pub type ExtensionValue = Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Add,
    Observe,
    Delete,
}

/// A business location or read point: an EPCIS "ReadPoint"/"BizLocation"
/// element, which in practice carries just an `id` (rewritten by the
/// Identifier Transcoder) plus optional passthrough extension content.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LocationRef {
    pub id: String,
    #[serde(flatten, default, skip_serializing_if = "Map::is_empty")]
    pub extensions: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SourceDest {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "$")]
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BizTransaction {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(rename = "$")]
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuantityElement {
    pub epc_class: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uom: Option<String>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDeclaration {
    pub declaration_time: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(rename = "correctiveEventIDs", default, skip_serializing_if = "Vec::is_empty")]
    pub corrective_event_ids: Vec<String>,
}

/// Fields shared by all five event variants (spec.md §3).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventCore {
    pub event_time: Timestamp,
    /// Redundant display offset carried alongside `event_time`, e.g. `"+02:00"`.
    pub event_time_zone_offset: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_time: Option<Timestamp>,
    #[serde(rename = "eventID", default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_declaration: Option<ErrorDeclaration>,
    /// Required for Object/Aggregation/Transaction/Association events;
    /// absent for Transformation events (spec.md §3 invariant).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
    #[serde(rename = "bizStep", default, skip_serializing_if = "Option::is_none")]
    pub business_step: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disposition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_point: Option<LocationRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub biz_location: Option<LocationRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_list: Vec<SourceDest>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub destination_list: Vec<SourceDest>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub biz_transaction_list: Vec<BizTransaction>,
    /// 2.0-only; dropped on 1.2 output unless `INCLUDE_SENSOR_ELEMENT_LIST`
    /// is in effect (spec.md §4.6).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sensor_element_list: Vec<ExtensionValue>,
    /// 2.0-only; dropped on 1.2 output unless `INCLUDE_PERSISTENT_DISPOSITION`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistent_disposition: Option<ExtensionValue>,
    /// Caller-defined extension fields, keyed by JSON-LD compact IRI.
    #[serde(flatten, default, skip_serializing_if = "Map::is_empty")]
    pub extensions: Map<String, Value>,
    /// Namespace bindings introduced by this specific event (not already at
    /// document scope). Populated by the codec from C2; read back by the
    /// codec when serializing so event-scope declarations are reproduced
    /// only where they were first introduced (spec.md §4.2).
    #[serde(skip)]
    pub event_scope_namespaces: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectEvent {
    #[serde(flatten)]
    pub core: EventCore,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub epc_list: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub quantity_list: Vec<QuantityElement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ilmd: Option<ExtensionValue>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationEvent {
    #[serde(flatten)]
    pub core: EventCore,
    #[serde(rename = "parentID", default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(rename = "childEPCs", default, skip_serializing_if = "Vec::is_empty")]
    pub child_epcs: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub child_quantity_list: Vec<QuantityElement>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionEvent {
    #[serde(flatten)]
    pub core: EventCore,
    #[serde(rename = "parentID", default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub epc_list: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub quantity_list: Vec<QuantityElement>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformationEvent {
    #[serde(flatten)]
    pub core: EventCore,
    #[serde(rename = "transformationID", default, skip_serializing_if = "Option::is_none")]
    pub transformation_id: Option<String>,
    #[serde(rename = "inputEPCList", default, skip_serializing_if = "Vec::is_empty")]
    pub input_epc_list: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub input_quantity_list: Vec<QuantityElement>,
    #[serde(rename = "outputEPCList", default, skip_serializing_if = "Vec::is_empty")]
    pub output_epc_list: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub output_quantity_list: Vec<QuantityElement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ilmd: Option<ExtensionValue>,
}

/// 2.0-only event variant (spec.md §4.6's `INCLUDE_ASSOCIATION_EVENT`).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssociationEvent {
    #[serde(flatten)]
    pub core: EventCore,
    #[serde(rename = "parentID", default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(rename = "childEPCs", default, skip_serializing_if = "Vec::is_empty")]
    pub child_epcs: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub child_quantity_list: Vec<QuantityElement>,
}

/// Polymorphic event, dispatched on `type` (JSON) or local element name
/// (XML). Replaces the source's type-hierarchy with a tagged union per
/// spec.md §9 Design Notes.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    ObjectEvent(ObjectEvent),
    AggregationEvent(AggregationEvent),
    TransactionEvent(TransactionEvent),
    TransformationEvent(TransformationEvent),
    AssociationEvent(AssociationEvent),
}

impl Event {
    pub fn core(&self) -> &EventCore {
        match self {
            Event::ObjectEvent(e) => &e.core,
            Event::AggregationEvent(e) => &e.core,
            Event::TransactionEvent(e) => &e.core,
            Event::TransformationEvent(e) => &e.core,
            Event::AssociationEvent(e) => &e.core,
        }
    }

    pub fn core_mut(&mut self) -> &mut EventCore {
        match self {
            Event::ObjectEvent(e) => &mut e.core,
            Event::AggregationEvent(e) => &mut e.core,
            Event::TransactionEvent(e) => &mut e.core,
            Event::TransformationEvent(e) => &mut e.core,
            Event::AssociationEvent(e) => &mut e.core,
        }
    }

    /// XML local element name / JSON `type` discriminant for this variant.
    pub fn type_name(&self) -> &'static str {
        match self {
            Event::ObjectEvent(_) => "ObjectEvent",
            Event::AggregationEvent(_) => "AggregationEvent",
            Event::TransactionEvent(_) => "TransactionEvent",
            Event::TransformationEvent(_) => "TransformationEvent",
            Event::AssociationEvent(_) => "AssociationEvent",
        }
    }

    /// All identifier-bearing string fields on this event, as mutable
    /// references, for the Identifier Transcoder (C4) to rewrite in place:
    /// `epcList`/`childEPCs`/`parentID`/`readPoint.id`/`bizLocation.id`/
    /// source-destination values/`quantityList.epcClass` (spec.md §4.4).
    pub fn identifier_fields_mut(&mut self) -> Vec<&mut String> {
        let mut fields = Vec::new();
        fields_from_core_mut(self.core_mut(), &mut fields);
        match self {
            Event::ObjectEvent(e) => {
                fields.extend(e.epc_list.iter_mut());
                fields.extend(e.quantity_list.iter_mut().map(|q| &mut q.epc_class));
            }
            Event::AggregationEvent(e) => {
                fields.extend(e.parent_id.iter_mut());
                fields.extend(e.child_epcs.iter_mut());
                fields.extend(e.child_quantity_list.iter_mut().map(|q| &mut q.epc_class));
            }
            Event::TransactionEvent(e) => {
                fields.extend(e.parent_id.iter_mut());
                fields.extend(e.epc_list.iter_mut());
                fields.extend(e.quantity_list.iter_mut().map(|q| &mut q.epc_class));
            }
            Event::TransformationEvent(e) => {
                fields.extend(e.input_epc_list.iter_mut());
                fields.extend(e.input_quantity_list.iter_mut().map(|q| &mut q.epc_class));
                fields.extend(e.output_epc_list.iter_mut());
                fields.extend(e.output_quantity_list.iter_mut().map(|q| &mut q.epc_class));
            }
            Event::AssociationEvent(e) => {
                fields.extend(e.parent_id.iter_mut());
                fields.extend(e.child_epcs.iter_mut());
                fields.extend(e.child_quantity_list.iter_mut().map(|q| &mut q.epc_class));
            }
        }
        fields
    }
}

fn fields_from_core_mut<'a>(core: &'a mut EventCore, out: &mut Vec<&'a mut String>) {
    if let Some(read_point) = core.read_point.as_mut() {
        out.push(&mut read_point.id);
    }
    if let Some(biz_location) = core.biz_location.as_mut() {
        out.push(&mut biz_location.id);
    }
    out.extend(core.source_list.iter_mut().map(|s| &mut s.value));
    out.extend(core.destination_list.iter_mut().map(|d| &mut d.value));
}
