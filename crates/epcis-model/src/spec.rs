use std::fmt;

/// The closed set of interchange formats this converter understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Format {
    Xml,
    JsonLd,
}

/// The closed set of EPCIS schema versions this converter understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Version {
    V1_2,
    V2_0,
}

impl Version {
    /// Parses the version literal captured by the prefix scanner (C1),
    /// e.g. `"1.2"` or `"2.0"`. Accepts an optional trailing `.0` patch
    /// component since both XML and JSON-LD documents in the wild spell
    /// `schemaVersion` either way.
    pub fn parse(literal: &str) -> Option<Version> {
        match literal.trim() {
            "1.2" | "1.2.0" => Some(Version::V1_2),
            "2.0" | "2.0.0" => Some(Version::V2_0),
            _ => None,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Version::V1_2 => write!(f, "1.2.0"),
            Version::V2_0 => write!(f, "2.0.0"),
        }
    }
}

/// `GS1-EPC-Format` header: controls identifier rewriting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EpcFormatPolicy {
    #[default]
    NoPreference,
    AlwaysDigitalLink,
    AlwaysEpcUrn,
    NeverTranslates,
}

/// `GS1-CBV-XML-Format` header: controls CBV code rewriting, independent
/// of `EpcFormatPolicy` (spec.md §9 Open Question (b)).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CbvFormatPolicy {
    #[default]
    NoPreference,
    AlwaysWebUri,
    AlwaysUrn,
    NeverTranslates,
}

/// What to do when a per-event validator rejects an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnFailure {
    #[default]
    Abort,
    SkipAndContinue,
}

/// Immutable description of one conversion request. Lives for the duration
/// of a single request; built once via [`ConversionSpecBuilder`].
#[derive(Debug, Clone)]
pub struct ConversionSpec {
    pub from_format: Format,
    pub from_version: Option<Version>,
    pub to_format: Format,
    pub to_version: Version,
    /// Whether 1.2 output must exclude 2.0-only constructs (Association
    /// events, persistent disposition, sensor elements).
    pub gs1_compliant_1_2: bool,
    pub on_failure: OnFailure,
    pub epc_format: EpcFormatPolicy,
    pub cbv_format: CbvFormatPolicy,
    /// `GS1-Extensions` header value, used to select a region Context
    /// Handler (e.g. `"gs1egypthc"`). Empty means "default handler only".
    pub gs1_extension: Option<String>,
}

impl ConversionSpec {
    pub fn builder(from_format: Format, to_format: Format, to_version: Version) -> ConversionSpecBuilder {
        ConversionSpecBuilder::new(from_format, to_format, to_version)
    }

    /// Resolves `from_version` per the spec.md §3 invariant: if absent and
    /// `from_format` is JSON-LD, it is 2.0.0 without scanning. Otherwise the
    /// caller must have already filled it in via the prefix scanner (C1).
    pub fn resolved_from_version(&self) -> Option<Version> {
        match (self.from_version, self.from_format) {
            (Some(v), _) => Some(v),
            (None, Format::JsonLd) => Some(Version::V2_0),
            (None, Format::Xml) => None,
        }
    }
}

/// Builds a [`ConversionSpec`], applying the header-vs-flag precedence
/// policy decided in SPEC_FULL.md §15: an explicit `GS1-EPC-Format` /
/// `GS1-CBV-XML-Format` header always overrides `gs1_compliant_1_2` when
/// both are set by the caller.
pub struct ConversionSpecBuilder {
    from_format: Format,
    from_version: Option<Version>,
    to_format: Format,
    to_version: Version,
    gs1_compliant_1_2: Option<bool>,
    on_failure: OnFailure,
    epc_format: Option<EpcFormatPolicy>,
    cbv_format: Option<CbvFormatPolicy>,
    gs1_extension: Option<String>,
}

impl ConversionSpecBuilder {
    pub fn new(from_format: Format, to_format: Format, to_version: Version) -> Self {
        ConversionSpecBuilder {
            from_format,
            from_version: None,
            to_format,
            to_version,
            gs1_compliant_1_2: None,
            on_failure: OnFailure::default(),
            epc_format: None,
            cbv_format: None,
            gs1_extension: None,
        }
    }

    pub fn from_version(mut self, version: Version) -> Self {
        self.from_version = Some(version);
        self
    }

    pub fn gs1_compliant_1_2(mut self, compliant: bool) -> Self {
        self.gs1_compliant_1_2 = Some(compliant);
        self
    }

    pub fn on_failure(mut self, policy: OnFailure) -> Self {
        self.on_failure = policy;
        self
    }

    pub fn epc_format_header(mut self, policy: EpcFormatPolicy) -> Self {
        self.epc_format = Some(policy);
        self
    }

    pub fn cbv_format_header(mut self, policy: CbvFormatPolicy) -> Self {
        self.cbv_format = Some(policy);
        self
    }

    pub fn gs1_extension(mut self, token: impl Into<String>) -> Self {
        self.gs1_extension = Some(token.into());
        self
    }

    pub fn build(self) -> ConversionSpec {
        // Default per-direction EPC format, applied only when the caller
        // never supplied the header (header always wins over the default,
        // and the default itself depends on the target: Digital Link when
        // producing 2.0, no translation when producing 1.2 — spec.md §6).
        let epc_format = self.epc_format.unwrap_or(match self.to_version {
            Version::V2_0 => EpcFormatPolicy::AlwaysDigitalLink,
            Version::V1_2 => EpcFormatPolicy::NeverTranslates,
        });

        // gs1_compliant_1_2 default is "lossless" (false) per spec.md §4.6,
        // but an explicit header-driven epc_format of NeverTranslates/
        // AlwaysEpcUrn does not by itself imply strictness: compliance is
        // governed solely by gs1_compliant_1_2, with the header only ever
        // overriding the *identifier rewriting* policy, never the 1.2
        // feature flags. Header/flag interaction is therefore: the header
        // decides identifier and CBV rewriting; gs1_compliant_1_2 decides
        // the three INCLUDE_* feature flags, independently.
        let gs1_compliant_1_2 = self.gs1_compliant_1_2.unwrap_or(false);

        ConversionSpec {
            from_format: self.from_format,
            from_version: self.from_version,
            to_format: self.to_format,
            to_version: self.to_version,
            gs1_compliant_1_2,
            on_failure: self.on_failure,
            epc_format,
            cbv_format: self.cbv_format.unwrap_or_default(),
            gs1_extension: self.gs1_extension,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn from_version_resolves_for_json_ld_without_scanning() {
        let spec = ConversionSpec::builder(Format::JsonLd, Format::Xml, Version::V2_0).build();
        assert_eq!(spec.resolved_from_version(), Some(Version::V2_0));
    }

    #[test]
    fn from_version_is_unresolved_for_xml_without_a_hint() {
        let spec = ConversionSpec::builder(Format::Xml, Format::JsonLd, Version::V2_0).build();
        assert_eq!(spec.resolved_from_version(), None);
    }

    #[test]
    fn default_epc_format_depends_on_target_version() {
        let to_2_0 = ConversionSpec::builder(Format::Xml, Format::JsonLd, Version::V2_0).build();
        assert_eq!(to_2_0.epc_format, EpcFormatPolicy::AlwaysDigitalLink);

        let to_1_2 = ConversionSpec::builder(Format::Xml, Format::Xml, Version::V1_2).build();
        assert_eq!(to_1_2.epc_format, EpcFormatPolicy::NeverTranslates);
    }

    #[test]
    fn explicit_header_overrides_the_version_default() {
        let spec = ConversionSpec::builder(Format::Xml, Format::JsonLd, Version::V2_0)
            .epc_format_header(EpcFormatPolicy::NeverTranslates)
            .build();
        assert_eq!(spec.epc_format, EpcFormatPolicy::NeverTranslates);
    }

    #[test]
    fn version_parses_both_short_and_patch_literals() {
        assert_eq!(Version::parse("1.2"), Some(Version::V1_2));
        assert_eq!(Version::parse("2.0.0"), Some(Version::V2_0));
        assert_eq!(Version::parse("3.0"), None);
    }
}
