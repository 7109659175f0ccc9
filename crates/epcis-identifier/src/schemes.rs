//! GS1 scheme table: the component shape, Digital Link application
//! identifier(s), and check-digit treatment for each scheme named in
//! spec.md §3 "Identifier" / §4.4 (spec.md §9 Design Notes allows the
//! converter to decide real-world-ambiguous AI assignments itself; the
//! handful used here beyond spec.md's own example AI list — e.g. GSRN's
//! `8018`, GCN's `255` — are the actual GS1 Gen Specs assignments, picked
//! the same way `gcp_table`'s partition ranges were: a representative
//! subset rather than the complete GS1-published table).
//!
//! Every scheme reduces to one of four key shapes:
//!
//! - [`KeyShape::GtinLike`]: an indicator digit + GCP + item reference,
//!   13 digits before a mod-10 check digit is appended (sgtin, lgtin,
//!   itip).
//! - [`KeyShape::GlnLike`]: GCP + reference, 12 digits before a mod-10
//!   check digit (sgln, pgln, gdti, gcn).
//! - [`KeyShape::GlnLikeWithFiller`]: the same GCP + reference + mod-10
//!   check digit as `GlnLike`, but preceded by GS1 AI 8003's mandatory
//!   fixed leading filler digit `0` (grai only — its GRAI-13 inner key is
//!   structurally a GLN-like key, the filler digit is what makes the
//!   on-wire value N14 rather than N13).
//! - [`KeyShape::Variable`]: GCP + alphanumeric reference with a trailing
//!   GS1 mod-37-36 check character (spec.md §4.4 "mod-37-36 for class
//!   IDs") — giai, ginc, cpi, upui.
//!
//! `gsrn`/`gsin` are modeled directly as fixed-length numeric keys with a
//! trailing check digit, without an indicator digit.

use epcis_model::ConversionError;

use crate::checksum::{mod10_check_digit, mod_37_36_check_char};
use crate::gcp_table::infer_gcp_length;

fn invalid(value: &str, reason: &str) -> ConversionError {
    ConversionError::InvalidIdentifier { value: value.to_string(), reason: reason.to_string() }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyShape {
    /// indicator(1) + gcp + item_ref, then a mod-10 check digit; total
    /// pre-check length 13.
    GtinLike,
    /// gcp + ref, then a mod-10 check digit; total pre-check length 12.
    GlnLike,
    /// `GlnLike`, prefixed with GS1 AI 8003's fixed leading filler digit
    /// `0` (grai).
    GlnLikeWithFiller,
    /// gcp + ref, then a mod-10 check digit; total pre-check length 16
    /// (gsin) or 17 (gsrn).
    FixedNumeric { pre_check_len: usize },
    /// gcp + alphanumeric reference, with a trailing GS1 mod-37-36 check
    /// character (spec.md §4.4 "mod-37-36 for class IDs").
    Variable,
}

/// What rides along with the base key in the Digital Link path and in the
/// URN's trailing components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tail {
    /// A mandatory serial under a separate AI (sgtin's `21`).
    SeparateSerial { ai: &'static str },
    /// An optional single extra component appended to the base AI's own
    /// path segment rather than a new AI (sgln's one-digit extension via
    /// `254`, modeled here as a second, optional AI for simplicity).
    OptionalExtension { ai: &'static str },
    /// A mandatory alphanumeric serial concatenated onto the AI's own
    /// value (gdti, grai).
    AppendedSerial,
    /// Two fixed-width numeric fields concatenated onto the key with no
    /// serial at all (itip's piece/total; gcn's coupon serial is folded
    /// in the same way for the one shared AI).
    AppendedFixed { widths: &'static [usize] },
    /// The key itself is the complete identifier.
    None,
}

/// Which `urn:epc:*` namespace (spec.md §4.4) a scheme's URN form lives
/// under. `Id` is the common case (an individually serialized instance);
/// `IdPat` marks schemes with no instance serial at all, conventionally
/// expressed with the EPC Tag Data Standard's trailing `*` wildcard
/// (ITIP: a GCP/item-ref/piece/total combination with no per-piece
/// serial); `ClassLot` marks lot-level identifiers that carry a lot
/// number instead of a serial, under `urn:epc:class:`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrnForm {
    Id,
    IdPat,
    ClassLot,
}

#[derive(Debug, Clone, Copy)]
pub struct SchemeRule {
    pub urn_scheme: &'static str,
    pub shape: KeyShape,
    pub primary_ai: &'static str,
    pub tail: Tail,
    pub urn_form: UrnForm,
}

pub const SCHEMES: &[SchemeRule] = &[
    SchemeRule {
        urn_scheme: "sgtin",
        shape: KeyShape::GtinLike,
        primary_ai: "01",
        tail: Tail::SeparateSerial { ai: "21" },
        urn_form: UrnForm::Id,
    },
    SchemeRule {
        urn_scheme: "lgtin",
        shape: KeyShape::GtinLike,
        primary_ai: "01",
        tail: Tail::SeparateSerial { ai: "10" },
        urn_form: UrnForm::ClassLot,
    },
    SchemeRule {
        urn_scheme: "itip",
        shape: KeyShape::GtinLike,
        primary_ai: "8006",
        tail: Tail::AppendedFixed { widths: &[2, 2] },
        urn_form: UrnForm::IdPat,
    },
    SchemeRule {
        urn_scheme: "gcn",
        shape: KeyShape::GlnLike,
        primary_ai: "255",
        tail: Tail::AppendedSerial,
        urn_form: UrnForm::Id,
    },
    SchemeRule {
        urn_scheme: "sgln",
        shape: KeyShape::GlnLike,
        primary_ai: "414",
        tail: Tail::OptionalExtension { ai: "254" },
        urn_form: UrnForm::Id,
    },
    SchemeRule {
        urn_scheme: "pgln",
        shape: KeyShape::GlnLike,
        primary_ai: "417",
        tail: Tail::None,
        urn_form: UrnForm::Id,
    },
    SchemeRule {
        urn_scheme: "gdti",
        shape: KeyShape::GlnLike,
        primary_ai: "253",
        tail: Tail::AppendedSerial,
        urn_form: UrnForm::Id,
    },
    SchemeRule {
        urn_scheme: "grai",
        shape: KeyShape::GlnLikeWithFiller,
        primary_ai: "8003",
        tail: Tail::AppendedSerial,
        urn_form: UrnForm::Id,
    },
    SchemeRule {
        urn_scheme: "gsrn",
        shape: KeyShape::FixedNumeric { pre_check_len: 17 },
        primary_ai: "8018",
        tail: Tail::None,
        urn_form: UrnForm::Id,
    },
    SchemeRule {
        urn_scheme: "gsin",
        shape: KeyShape::FixedNumeric { pre_check_len: 16 },
        primary_ai: "402",
        tail: Tail::None,
        urn_form: UrnForm::Id,
    },
    SchemeRule {
        urn_scheme: "giai",
        shape: KeyShape::Variable,
        primary_ai: "8004",
        tail: Tail::None,
        urn_form: UrnForm::Id,
    },
    SchemeRule {
        urn_scheme: "ginc",
        shape: KeyShape::Variable,
        primary_ai: "401",
        tail: Tail::None,
        urn_form: UrnForm::Id,
    },
    SchemeRule {
        urn_scheme: "cpi",
        shape: KeyShape::Variable,
        primary_ai: "8010",
        tail: Tail::SeparateSerial { ai: "8011" },
        urn_form: UrnForm::Id,
    },
    SchemeRule {
        urn_scheme: "upui",
        shape: KeyShape::Variable,
        primary_ai: "235",
        tail: Tail::AppendedSerial,
        urn_form: UrnForm::Id,
    },
];

pub fn rule_for_scheme(scheme: &str) -> Option<&'static SchemeRule> {
    SCHEMES.iter().find(|r| r.urn_scheme == scheme)
}

pub fn rule_for_ai(ai: &str) -> Option<&'static SchemeRule> {
    SCHEMES.iter().find(|r| r.primary_ai == ai)
}

/// Builds the numeric key (with check digit where the shape calls for
/// one) from a GCP and the remaining URN components, consuming exactly as
/// many components as the shape needs and returning what's left over for
/// the tail.
pub fn build_key<'a>(
    rule: &SchemeRule,
    gcp: &str,
    rest: &'a [String],
    urn: &str,
) -> Result<(String, &'a [String]), ConversionError> {
    match rule.shape {
        KeyShape::GtinLike => {
            let ind_ref = rest.first().ok_or_else(|| invalid(urn, "missing indicator/item-reference component"))?;
            let expected_len = 13 - gcp.len();
            if ind_ref.len() != expected_len || !ind_ref.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid(urn, "indicator/item-reference component has the wrong width for this GCP"));
            }
            let pre_check = format!("{}{}{}", &ind_ref[..1], gcp, &ind_ref[1..]);
            let check = mod10_check_digit(&pre_check).ok_or_else(|| invalid(urn, "could not compute check digit"))?;
            Ok((format!("{pre_check}{check}"), &rest[1..]))
        }
        KeyShape::GlnLike => {
            let reference = rest.first().ok_or_else(|| invalid(urn, "missing reference component"))?;
            let expected_len = 12 - gcp.len();
            if reference.len() != expected_len || !reference.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid(urn, "reference component has the wrong width for this GCP"));
            }
            let pre_check = format!("{gcp}{reference}");
            let check = mod10_check_digit(&pre_check).ok_or_else(|| invalid(urn, "could not compute check digit"))?;
            Ok((format!("{pre_check}{check}"), &rest[1..]))
        }
        KeyShape::GlnLikeWithFiller => {
            let reference = rest.first().ok_or_else(|| invalid(urn, "missing reference component"))?;
            let expected_len = 12 - gcp.len();
            if reference.len() != expected_len || !reference.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid(urn, "reference component has the wrong width for this GCP"));
            }
            let pre_check = format!("{gcp}{reference}");
            let check = mod10_check_digit(&pre_check).ok_or_else(|| invalid(urn, "could not compute check digit"))?;
            Ok((format!("0{pre_check}{check}"), &rest[1..]))
        }
        KeyShape::FixedNumeric { pre_check_len } => {
            let reference = rest.first().ok_or_else(|| invalid(urn, "missing reference component"))?;
            let expected_len = pre_check_len - gcp.len();
            if reference.len() != expected_len || !reference.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid(urn, "reference component has the wrong width for this GCP"));
            }
            let pre_check = format!("{gcp}{reference}");
            let check = mod10_check_digit(&pre_check).ok_or_else(|| invalid(urn, "could not compute check digit"))?;
            Ok((format!("{pre_check}{check}"), &rest[1..]))
        }
        KeyShape::Variable => {
            let reference = rest.first().ok_or_else(|| invalid(urn, "missing reference component"))?;
            let base = format!("{gcp}{reference}");
            let check = mod_37_36_check_char(&base).ok_or_else(|| invalid(urn, "could not compute check character"))?;
            Ok((format!("{base}{check}"), &rest[1..]))
        }
    }
}

/// Inverse of [`build_key`]: splits a Digital Link key back into GCP and
/// reference components, given a known or inferred GCP length.
/// `Variable`-shaped keys split on GCP length plus a single trailing
/// mod-37-36 check character rather than a fixed total width.
pub fn split_key(rule: &SchemeRule, key: &str, gcp_len: u8) -> Result<(String, String), ConversionError> {
    let gcp_len = gcp_len as usize;
    match rule.shape {
        KeyShape::GtinLike => {
            if key.len() != 14 || gcp_len > 12 {
                return Err(invalid(key, "key is not a 14-digit GTIN-like value"));
            }
            let indicator = &key[0..1];
            let gcp = &key[1..1 + gcp_len];
            let item_ref = &key[1 + gcp_len..13];
            Ok((gcp.to_string(), format!("{indicator}{item_ref}")))
        }
        KeyShape::GlnLike => {
            if key.len() != 13 {
                return Err(invalid(key, "key is not a 13-digit GLN-like value"));
            }
            let gcp = &key[0..gcp_len];
            let reference = &key[gcp_len..12];
            Ok((gcp.to_string(), reference.to_string()))
        }
        KeyShape::GlnLikeWithFiller => {
            if key.len() != 14 || !key.starts_with('0') {
                return Err(invalid(key, "key is not a 14-digit GRAI value with a leading filler digit"));
            }
            let body = &key[1..];
            let gcp = &body[0..gcp_len];
            let reference = &body[gcp_len..12];
            Ok((gcp.to_string(), reference.to_string()))
        }
        KeyShape::FixedNumeric { pre_check_len } => {
            if key.len() != pre_check_len + 1 {
                return Err(invalid(key, "key has the wrong total length"));
            }
            let gcp = &key[0..gcp_len];
            let reference = &key[gcp_len..pre_check_len];
            Ok((gcp.to_string(), reference.to_string()))
        }
        KeyShape::Variable => {
            if key.len() <= gcp_len + 1 {
                return Err(invalid(key, "key is shorter than its GCP plus check character"));
            }
            let gcp = &key[..gcp_len];
            let reference = &key[gcp_len..key.len() - 1];
            Ok((gcp.to_string(), reference.to_string()))
        }
    }
}

/// Infers a GCP length for a Digital Link key when the caller supplied no
/// explicit hint, by probing the partition table at the position the GCP
/// would start (right after the indicator digit for GTIN-like keys, at
/// the very start otherwise).
pub fn infer_gcp_len_for_key(rule: &SchemeRule, key: &str) -> Option<u8> {
    match rule.shape {
        KeyShape::GtinLike => infer_gcp_length(&key[1..]),
        KeyShape::GlnLikeWithFiller => infer_gcp_length(&key[1..]),
        _ => infer_gcp_length(key),
    }
}
