//! C4 Identifier Transcoder: bidirectional EPC URN ⟷ GS1 Digital Link
//! Web-URI translation, CBV code translation, and format-policy-driven
//! event field rewriting. See `spec.md` §4.4.

mod cbv;
mod checksum;
mod gcp_table;
mod schemes;
mod urn;

use epcis_model::{CbvFormatPolicy, ConversionError, Event, EpcFormatPolicy};

use schemes::{rule_for_ai, rule_for_scheme, SchemeRule, Tail, UrnForm};
use urn::{build_urn, build_web_uri, parse_urn, parse_web_uri, UrnNamespace};

pub use cbv::{cbv_to_urn, cbv_to_web_uri};
pub use gcp_table::infer_gcp_length;

fn invalid(value: &str, reason: &str) -> ConversionError {
    ConversionError::InvalidIdentifier { value: value.to_string(), reason: reason.to_string() }
}

/// Result of a Web-URI → URN conversion (spec.md §4.4's
/// `to_urn(uri) -> struct{gtin, serial, asURN, asCaptured, canonicalDL}`).
/// Field names follow the spec literally even though `gtin` holds the
/// scheme's primary numeric/alphanumeric key regardless of which scheme
/// it actually came from — GTIN is simply the common case callers expect
/// back first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrnConversion {
    pub gtin: Option<String>,
    pub serial: Option<String>,
    pub as_urn: String,
    pub as_captured: String,
    pub canonical_dl: String,
}

/// Translates an EPC URN into its GS1 Digital Link Web-URI form.
pub fn to_web_uri(urn_str: &str) -> Result<String, ConversionError> {
    let parsed = parse_urn(urn_str)?;
    let rule = rule_for_scheme(&parsed.scheme).ok_or_else(|| invalid(urn_str, "unrecognized EPC scheme"))?;
    let gcp = parsed.components.first().ok_or_else(|| invalid(urn_str, "missing GCP component"))?;
    let rest = &parsed.components[1..];
    let (key, tail) = schemes::build_key(rule, gcp, rest, urn_str)?;

    match rule.tail {
        Tail::SeparateSerial { ai } => {
            let serial = tail.first().ok_or_else(|| invalid(urn_str, "missing serial component"))?;
            Ok(build_web_uri(&[(rule.primary_ai, &key), (ai, serial)]))
        }
        Tail::OptionalExtension { ai } => match tail.first() {
            Some(ext) => Ok(build_web_uri(&[(rule.primary_ai, &key), (ai, ext)])),
            None => Ok(build_web_uri(&[(rule.primary_ai, &key)])),
        },
        Tail::AppendedSerial => {
            let serial = tail.first().ok_or_else(|| invalid(urn_str, "missing serial component"))?;
            Ok(build_web_uri(&[(rule.primary_ai, &format!("{key}{serial}"))]))
        }
        Tail::AppendedFixed { widths } => {
            if tail.len() != widths.len() {
                return Err(invalid(urn_str, "wrong number of trailing fixed-width components"));
            }
            for (component, width) in tail.iter().zip(widths) {
                if component.len() != *width {
                    return Err(invalid(urn_str, "trailing component has the wrong width"));
                }
            }
            let appended: String = tail.iter().map(String::as_str).collect();
            Ok(build_web_uri(&[(rule.primary_ai, &format!("{key}{appended}"))]))
        }
        Tail::None => Ok(build_web_uri(&[(rule.primary_ai, &key)])),
    }
}

/// Translates a GS1 Digital Link Web-URI into its EPC URN form. `gcp_hint`
/// supplies the GCP length when it cannot be inferred from the key itself
/// (spec.md §4.4 policy: absent both, fail with `UnknownGcpLength`).
pub fn to_urn(uri: &str, gcp_hint: Option<u8>) -> Result<UrnConversion, ConversionError> {
    let parsed = parse_web_uri(uri)?;
    let (primary_ai, raw_value) = parsed
        .segments
        .iter()
        .find(|(ai, _)| rule_for_ai(ai).is_some())
        .ok_or_else(|| invalid(uri, "no recognized application identifier in path"))?;
    let rule = rule_for_ai(primary_ai).unwrap();

    let gcp_len = schemes::infer_gcp_len_for_key(rule, raw_value)
        .or(gcp_hint)
        .ok_or_else(|| ConversionError::UnknownGcpLength(uri.to_string()))?;

    // Variable-shaped keys (giai, ginc, cpi, upui) have no fixed width
    // beyond their trailing check character, so the whole segment value is
    // the key; any serial either rides a separate AI (SeparateSerial) or —
    // for the one AppendedSerial case, upui — is not separably recoverable
    // without a delimiter convention GS1 doesn't define, so it is left
    // folded into the key on this path.
    let key_len = match rule.shape {
        schemes::KeyShape::GtinLike => 14,
        schemes::KeyShape::GlnLike => 13,
        schemes::KeyShape::GlnLikeWithFiller => 14,
        schemes::KeyShape::FixedNumeric { pre_check_len } => pre_check_len + 1,
        schemes::KeyShape::Variable => raw_value.len(),
    };
    if raw_value.len() < key_len {
        return Err(invalid(uri, "value shorter than this scheme's key length"));
    }
    let (key, tail_str) = raw_value.split_at(key_len);
    let (gcp, reference) = schemes::split_key(rule, key, gcp_len)?;

    let (components, serial) = match rule.tail {
        Tail::SeparateSerial { ai } => {
            let serial = parsed
                .segments
                .iter()
                .find(|(a, _)| a == ai)
                .map(|(_, v)| v.clone())
                .ok_or_else(|| invalid(uri, "missing serial application identifier"))?;
            (vec![gcp.clone(), reference.clone(), serial.clone()], Some(serial))
        }
        Tail::OptionalExtension { ai } => {
            let extension = parsed.segments.iter().find(|(a, _)| a == ai).map(|(_, v)| v.clone());
            let mut components = vec![gcp.clone(), reference.clone()];
            if let Some(ext) = extension.clone() {
                components.push(ext);
            }
            (components, extension)
        }
        Tail::AppendedSerial => {
            let serial = tail_str.to_string();
            if serial.is_empty() {
                (vec![gcp.clone(), reference.clone()], None)
            } else {
                (vec![gcp.clone(), reference.clone(), serial.clone()], Some(serial))
            }
        }
        Tail::AppendedFixed { widths } => {
            let mut components = vec![gcp.clone(), reference.clone()];
            let mut offset = 0;
            for width in widths {
                if tail_str.len() < offset + width {
                    return Err(invalid(uri, "trailing fixed-width field is truncated"));
                }
                components.push(tail_str[offset..offset + width].to_string());
                offset += width;
            }
            (components, None)
        }
        Tail::None => (vec![gcp.clone(), reference.clone()], None),
    };

    let namespace = match rule.urn_form {
        UrnForm::Id => UrnNamespace::Id,
        UrnForm::IdPat => UrnNamespace::IdPat,
        UrnForm::ClassLot => UrnNamespace::Class,
    };
    // build_urn appends the trailing `*` itself for idpat URNs, which
    // never carry an instance serial (Tail::AppendedFixed never sets one).
    let as_urn = build_urn(namespace, rule.urn_scheme, &components);

    Ok(UrnConversion { gtin: Some(key), serial, as_captured: uri.to_string(), canonical_dl: raw_value_to_canonical(rule, uri, raw_value), as_urn })
}

/// The canonical Digital Link form for a parsed Web-URI: re-emitted under
/// [`urn::DEFAULT_HOST`] with the same AI/value pairs, dropping any
/// resolver-specific host the caller's URI carried (spec.md §8 law 4,
/// "equals w modulo canonical `canonicalDL`").
fn raw_value_to_canonical(rule: &SchemeRule, original_uri: &str, raw_value: &str) -> String {
    match parse_web_uri(original_uri) {
        Ok(parsed) => {
            let pairs: Vec<(&str, &str)> = parsed.segments.iter().map(|(a, v)| (a.as_str(), v.as_str())).collect();
            build_web_uri(&pairs)
        }
        Err(_) => build_web_uri(&[(rule.primary_ai, raw_value)]),
    }
}

/// Applies `policy` to a single identifier field in place, leaving it
/// untouched when the policy is `No_Preference`/`Never_Translates` or the
/// field doesn't look like either form this converter understands.
pub fn rewrite_identifier(field: &mut String, policy: EpcFormatPolicy, gcp_hint: Option<u8>) -> Result<(), ConversionError> {
    match policy {
        EpcFormatPolicy::NoPreference | EpcFormatPolicy::NeverTranslates => Ok(()),
        EpcFormatPolicy::AlwaysDigitalLink => {
            if field.starts_with("urn:epc:") {
                *field = to_web_uri(field)?;
            }
            Ok(())
        }
        EpcFormatPolicy::AlwaysEpcUrn => {
            if field.starts_with("http://") || field.starts_with("https://") {
                *field = to_urn(field, gcp_hint)?.as_urn;
            }
            Ok(())
        }
    }
}

/// Rewrites every identifier-bearing field on `event` per `epc_policy`,
/// and every CBV code (business step, disposition, source/destination
/// type) per `cbv_policy` — the two policies are independent switches
/// (spec.md §9 Open Question (b)).
pub fn rewrite_event_identifiers(
    event: &mut Event,
    epc_policy: EpcFormatPolicy,
    cbv_policy: CbvFormatPolicy,
    gcp_hint: Option<u8>,
) -> Result<(), ConversionError> {
    for field in event.identifier_fields_mut() {
        rewrite_identifier(field, epc_policy, gcp_hint)?;
    }

    if cbv_policy != CbvFormatPolicy::NoPreference && cbv_policy != CbvFormatPolicy::NeverTranslates {
        let core = event.core_mut();
        if let Some(step) = core.business_step.as_mut() {
            rewrite_cbv_code(step, cbv_policy);
        }
        if let Some(disposition) = core.disposition.as_mut() {
            rewrite_cbv_code(disposition, cbv_policy);
        }
        for source in core.source_list.iter_mut() {
            rewrite_cbv_code(&mut source.kind, cbv_policy);
        }
        for destination in core.destination_list.iter_mut() {
            rewrite_cbv_code(&mut destination.kind, cbv_policy);
        }
    }
    Ok(())
}

fn rewrite_cbv_code(code: &mut String, policy: CbvFormatPolicy) {
    match policy {
        CbvFormatPolicy::AlwaysWebUri => *code = cbv_to_web_uri(code),
        CbvFormatPolicy::AlwaysUrn => *code = cbv_to_urn(code),
        CbvFormatPolicy::NoPreference | CbvFormatPolicy::NeverTranslates => {}
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn s3_sgtin_urn_to_web_uri() {
        let result = to_web_uri("urn:epc:id:sgtin:234567890.1123.9999").unwrap();
        assert_eq!(result, "https://id.gs1.org/01/12345678901231/21/9999");
    }

    #[test]
    fn s4_itip_class_urn_to_web_uri() {
        let result = to_web_uri("urn:epc:idpat:itip:483478.7347834.92.93.*").unwrap();
        assert_eq!(result, "https://id.gs1.org/8006/748347834783449293");
    }

    #[test]
    fn s5_web_uri_to_urn_without_gcp_hint_fails() {
        let err = to_urn("https://id.gs1.org/01/07610032000010/21/987", None).unwrap_err();
        assert!(matches!(err, ConversionError::UnknownGcpLength(_)));
    }

    #[test]
    fn sgtin_round_trips_urn_to_web_uri_to_urn() {
        let urn = "urn:epc:id:sgtin:234567890.1123.9999";
        let web_uri = to_web_uri(urn).unwrap();
        let back = to_urn(&web_uri, None).unwrap();
        assert_eq!(back.as_urn, urn);
        assert_eq!(back.serial.as_deref(), Some("9999"));
    }

    #[test]
    fn sgtin_round_trips_web_uri_to_urn_to_web_uri_with_hint() {
        let web_uri = "https://id.gs1.org/01/07610032000010/21/987";
        let converted = to_urn(web_uri, Some(7)).unwrap();
        let back = to_web_uri(&converted.as_urn).unwrap();
        assert_eq!(back, web_uri);
    }

    /// GS1's own published AI(8003) example: `.../8003/00614141999996x1`,
    /// whose leading `0` is the mandatory GRAI filler digit rather than
    /// part of the company prefix.
    #[test]
    fn grai_round_trips_urn_to_web_uri_with_its_leading_filler_digit() {
        let urn = "urn:epc:id:grai:0614141.99999.x1";
        let web_uri = to_web_uri(urn).unwrap();
        assert_eq!(web_uri, "https://id.gs1.org/8003/00614141999996x1");
        let back = to_urn(&web_uri, Some(7)).unwrap();
        assert_eq!(back.as_urn, urn);
        assert_eq!(back.serial.as_deref(), Some("x1"));
    }

    #[test]
    fn gcn_round_trips_urn_to_web_uri_to_urn() {
        let urn = "urn:epc:id:gcn:234567890.123.77";
        let web_uri = to_web_uri(urn).unwrap();
        assert_eq!(web_uri, "https://id.gs1.org/255/234567890123477");
        let back = to_urn(&web_uri, None).unwrap();
        assert_eq!(back.as_urn, urn);
    }

    /// Exercises `Variable`'s mod-37-36 check character end to end —
    /// `mod_37_36_check_char` (spec.md §4.4's mandated class-ID checksum)
    /// is otherwise only ever reached from the scheme table.
    #[test]
    fn giai_round_trips_urn_to_web_uri_to_urn_through_its_check_character() {
        let urn = "urn:epc:id:giai:234567890.ABC123";
        let web_uri = to_web_uri(urn).unwrap();
        assert!(web_uri.starts_with("https://id.gs1.org/8004/234567890ABC123"));
        let back = to_urn(&web_uri, None).unwrap();
        assert_eq!(back.as_urn, urn);
    }

    #[test]
    fn rewrite_identifier_leaves_field_untouched_under_never_translates() {
        let mut field = "urn:epc:id:sgtin:234567890.1123.9999".to_string();
        rewrite_identifier(&mut field, EpcFormatPolicy::NeverTranslates, None).unwrap();
        assert_eq!(field, "urn:epc:id:sgtin:234567890.1123.9999");
    }
}
