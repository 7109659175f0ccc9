use crate::event::Timestamp;
use crate::spec::Version;

/// One entry of the ordered `@context` array (spec.md §3 "Context
/// Binding"). The first entry of a well-formed document is always
/// `CanonicalUrl`; everything after is either a single-key namespace
/// binding or an opaque passthrough value whose relative order must be
/// preserved even though this converter does not interpret it.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum ContextEntry {
    CanonicalUrl(String),
    Namespace(std::collections::BTreeMap<String, String>),
    Passthrough(serde_json::Value),
}

/// The `@context` array (JSON-LD) or, equivalently, the set of root
/// namespace declarations (XML) — spec.md §3 "Context Binding". The codec
/// translates between this and actual `xmlns:*` attributes / a JSON
/// `@context` array; everything else in the pipeline works against this
/// uniform representation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextBinding {
    pub entries: Vec<ContextEntry>,
}

impl ContextBinding {
    pub fn canonical_url(&self) -> Option<&str> {
        match self.entries.first() {
            Some(ContextEntry::CanonicalUrl(url)) => Some(url.as_str()),
            _ => None,
        }
    }

    /// Document-scope namespace bindings found among the entries, in order.
    pub fn namespaces(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().filter_map(|entry| match entry {
            ContextEntry::Namespace(map) => map.iter().next().map(|(p, u)| (p.as_str(), u.as_str())),
            _ => None,
        })
    }

    pub fn push_namespace(&mut self, prefix: impl Into<String>, uri: impl Into<String>) {
        let mut map = std::collections::BTreeMap::new();
        map.insert(prefix.into(), uri.into());
        self.entries.push(ContextEntry::Namespace(map));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Capture,
    Query,
}

/// Everything about a document except its event list (spec.md §3
/// "Document Frame").
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentFrame {
    pub kind: DocumentKind,
    pub schema_version: Version,
    pub creation_date: Timestamp,
    pub context: ContextBinding,
    /// Query documents only.
    pub subscription_id: Option<String>,
    /// Query documents only.
    pub query_name: Option<String>,
}

impl DocumentFrame {
    pub fn new_capture(schema_version: Version, creation_date: Timestamp) -> Self {
        DocumentFrame {
            kind: DocumentKind::Capture,
            schema_version,
            creation_date,
            context: ContextBinding::default(),
            subscription_id: None,
            query_name: None,
        }
    }
}

/// What a codec decode produced: the common case of a full document frame
/// (consumed one event at a time via the codec's streaming reader), or the
/// "root element/object is itself an event" shape spec.md §4.5 calls out
/// for both directions — a single event with no frame at all.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedInput {
    Document(DocumentFrame),
    SingleEvent(crate::Event),
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn canonical_url_must_be_first_entry() {
        let mut ctx = ContextBinding::default();
        ctx.entries
            .push(ContextEntry::CanonicalUrl("https://ref.gs1.org/epcis/".to_string()));
        ctx.push_namespace("ext", "https://example.com/ext/");
        assert_eq!(ctx.canonical_url(), Some("https://ref.gs1.org/epcis/"));
        assert_eq!(ctx.namespaces().collect::<Vec<_>>(), vec![("ext", "https://example.com/ext/")]);
    }
}
