//! Extraction output schema and normalization.
//!
//! Vision-model output is noisy free text. Normalization enforces a strict
//! downstream contract: pincode fields come out as exactly six ASCII digits
//! or empty, free-text fields come out stripped of null bytes and
//! surrounding whitespace, and no field is ever null. Normalization never
//! fails; unusable input degrades to the empty string.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static MULTI_VALUE_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[,/\s]+").unwrap_or_else(|_| unreachable!("static pattern")));
// [0-9] rather than \d: the contract is ASCII digits, and the regex crate's
// \d matches any Unicode decimal digit.
static SIX_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{6}$").unwrap_or_else(|_| unreachable!("static pattern")));
static SIX_DIGIT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]{6}").unwrap_or_else(|_| unreachable!("static pattern")));

/// The six fields the vision model is asked to fill, as they come off the
/// wire. Absent fields default to empty rather than failing the decode.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawExtraction {
    /// Full name of the mail recipient, from the "To:" section.
    #[serde(default)]
    pub receiver_name: String,
    /// Recipient street address, without the pincode.
    #[serde(default)]
    pub receiver_address: String,
    /// Recipient pincode as the model read it.
    #[serde(default)]
    pub receiver_pincode: String,
    /// Full name of the mail sender, from the "From:" section.
    #[serde(default)]
    pub sender_name: String,
    /// Sender street address, without the pincode.
    #[serde(default)]
    pub sender_address: String,
    /// Sender pincode as the model read it.
    #[serde(default)]
    pub sender_pincode: String,
}

/// Normalized extraction fields: the contract downstream code trusts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extraction {
    /// Recipient name; empty when unresolved.
    pub receiver_name: String,
    /// Recipient address; empty when unresolved.
    pub receiver_address: String,
    /// Recipient pincode: exactly six digits, or empty when unresolved.
    pub receiver_pincode: String,
    /// Sender name; empty when unresolved.
    pub sender_name: String,
    /// Sender address; empty when unresolved.
    pub sender_address: String,
    /// Sender pincode: exactly six digits, or empty when unresolved.
    pub sender_pincode: String,
}

impl Extraction {
    /// Normalize raw model output into the strict contract.
    #[must_use]
    pub fn from_raw(raw: &RawExtraction) -> Self {
        Self {
            receiver_name: clean_text(&raw.receiver_name),
            receiver_address: clean_text(&raw.receiver_address),
            receiver_pincode: normalize_pincode(&raw.receiver_pincode),
            sender_name: clean_text(&raw.sender_name),
            sender_address: clean_text(&raw.sender_address),
            sender_pincode: normalize_pincode(&raw.sender_pincode),
        }
    }
}

/// Reduce a raw pincode reading to exactly six ASCII digits, or empty.
///
/// Rules, in order:
/// - empty or whitespace-only input is unresolved;
/// - input containing a comma, slash, or embedded whitespace is split on
///   `[,/\s]+` and the first token of exactly six digits wins;
/// - otherwise, input that is not itself six digits yields its first
///   embedded six-digit run, if any;
/// - otherwise the value passes through unchanged.
#[must_use]
pub fn normalize_pincode(value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        return String::new();
    }

    if value.contains(',') || value.contains('/') || value.contains(char::is_whitespace) {
        return MULTI_VALUE_SPLIT
            .split(value)
            .map(str::trim)
            .find(|part| SIX_DIGITS.is_match(part))
            .map(str::to_string)
            .unwrap_or_default();
    }

    if !SIX_DIGITS.is_match(value) {
        return SIX_DIGIT_RUN
            .find(value)
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
    }

    value.to_string()
}

/// Strip null bytes (the persistence layer rejects them) and surrounding
/// whitespace from a free-text field. Unresolved input maps to empty,
/// never null.
#[must_use]
pub fn clean_text(value: &str) -> String {
    value
        .replace('\u{0}', "")
        .replace("\\u0000", "")
        .trim()
        .to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn first_valid_token_wins_on_multiple_values() {
        assert_eq!(normalize_pincode("560001, 560002"), "560001");
        assert_eq!(normalize_pincode("560001/560002"), "560001");
        assert_eq!(normalize_pincode("560001 560002"), "560001");
    }

    #[test]
    fn skips_invalid_tokens_in_multi_value_input() {
        assert_eq!(normalize_pincode("PIN, 560034"), "560034");
        assert_eq!(normalize_pincode("abc, def"), "");
    }

    #[test]
    fn extracts_embedded_six_digit_run() {
        assert_eq!(normalize_pincode("abc123456xyz"), "123456");
        assert_eq!(normalize_pincode("PIN-560001."), "560001");
    }

    #[test]
    fn empty_and_whitespace_are_unresolved() {
        assert_eq!(normalize_pincode(""), "");
        assert_eq!(normalize_pincode("   "), "");
    }

    #[test]
    fn too_short_input_is_unresolved() {
        assert_eq!(normalize_pincode("12345"), "");
    }

    #[test]
    fn valid_pincode_passes_through() {
        assert_eq!(normalize_pincode("560001"), "560001");
    }

    #[test]
    fn clean_text_strips_null_bytes_and_whitespace() {
        assert_eq!(clean_text("  Ravi\u{0} Kumar  "), "Ravi Kumar");
        assert_eq!(clean_text("MG Road\\u0000"), "MG Road");
        assert_eq!(clean_text(""), "");
    }

    #[test]
    fn from_raw_normalizes_every_field() {
        let raw = RawExtraction {
            receiver_name: " Ravi Kumar ".into(),
            receiver_address: "12 MG Road, Bengaluru\u{0}".into(),
            receiver_pincode: "560001, 560002".into(),
            sender_name: String::new(),
            sender_address: "Fort, Mumbai".into(),
            sender_pincode: "pin 400001".into(),
        };

        let fields = Extraction::from_raw(&raw);
        assert_eq!(fields.receiver_name, "Ravi Kumar");
        assert_eq!(fields.receiver_address, "12 MG Road, Bengaluru");
        assert_eq!(fields.receiver_pincode, "560001");
        assert_eq!(fields.sender_name, "");
        assert_eq!(fields.sender_pincode, "400001");
    }

    #[test]
    fn raw_extraction_tolerates_missing_fields() {
        let raw: RawExtraction =
            serde_json::from_str(r#"{"receiver_pincode": "560001"}"#).unwrap();
        assert_eq!(raw.receiver_pincode, "560001");
        assert_eq!(raw.sender_name, "");
    }

    proptest! {
        #[test]
        fn normalized_pincode_is_empty_or_six_digits(input in ".*") {
            let out = normalize_pincode(&input);
            prop_assert!(
                out.is_empty()
                    || (out.len() == 6 && out.bytes().all(|b| b.is_ascii_digit()))
            );
        }

        #[test]
        fn clean_text_never_contains_null_bytes(input in ".*") {
            prop_assert!(!clean_text(&input).contains('\0'));
        }
    }
}
