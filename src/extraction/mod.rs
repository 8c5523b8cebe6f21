//! Lab result extraction from OCR text
//!
//! Applies the pattern table to normalized OCR output and turns each match
//! into a [`LabTestRecord`]. The first pattern (and first match) that yields
//! a record for a test name claims it; later matches for the same name are
//! ignored even when a later pattern would read them differently.

pub mod patterns;
pub mod range;

pub use patterns::{builtin_patterns, FieldMap, LabPattern, PatternSpec};
pub use range::{format_decimal, RangeError, ReferenceRange};

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::LazyLock;
use thiserror::Error;

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern must compile"));

/// One structured test result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabTestRecord {
    pub test_name: String,
    pub test_value: String,
    pub bio_reference_range: String,
    pub test_unit: String,
    pub lab_test_out_of_range: bool,
}

#[derive(Error, Debug)]
enum MatchError {
    #[error("missing capture group '{0}'")]
    MissingGroup(&'static str),

    #[error("invalid test value '{0}'")]
    InvalidValue(String),

    #[error(transparent)]
    Range(#[from] RangeError),
}

/// Extractor over an ordered pattern table
pub struct LabDataExtractor {
    patterns: Vec<LabPattern>,
}

impl Default for LabDataExtractor {
    fn default() -> Self {
        Self::new(builtin_patterns().to_vec())
    }
}

impl LabDataExtractor {
    pub fn new(patterns: Vec<LabPattern>) -> Self {
        Self { patterns }
    }

    /// Extract records in discovery order. Never fails; unusable matches are
    /// logged and skipped.
    pub fn extract(&self, text: &str) -> Vec<LabTestRecord> {
        let text = normalize_text(text);
        let mut results = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for pattern in &self.patterns {
            for caps in pattern.regex.captures_iter(&text) {
                let matched = caps.get(0).map(|m| m.as_str()).unwrap_or_default();

                let Some(name) = caps.name(pattern.fields.name) else {
                    tracing::warn!(
                        "Error processing match {}: {}",
                        matched,
                        MatchError::MissingGroup(pattern.fields.name)
                    );
                    continue;
                };
                let test_name = name.as_str().trim().to_uppercase();

                if seen.contains(&test_name) {
                    continue;
                }

                match build_record(test_name, &caps, &pattern.fields) {
                    Ok(record) => {
                        tracing::debug!(
                            pattern = pattern.label,
                            "Matched {} = {}",
                            record.test_name,
                            record.test_value
                        );
                        seen.insert(record.test_name.clone());
                        results.push(record);
                    }
                    Err(e) => {
                        tracing::warn!("Error processing match {}: {}", matched, e);
                    }
                }
            }
        }

        results
    }
}

/// Extract with the built-in pattern table
pub fn extract_lab_data(text: &str) -> Vec<LabTestRecord> {
    LabDataExtractor::default().extract(text)
}

/// Collapse line breaks and whitespace runs to single spaces
pub fn normalize_text(text: &str) -> String {
    let flattened = text.replace(['\n', '\r'], " ");
    WHITESPACE_RUN.replace_all(&flattened, " ").into_owned()
}

fn build_record(
    test_name: String,
    caps: &Captures<'_>,
    fields: &FieldMap,
) -> Result<LabTestRecord, MatchError> {
    let raw_value = caps
        .name(fields.value)
        .ok_or(MatchError::MissingGroup(fields.value))?
        .as_str();
    let value: f64 = raw_value
        .parse()
        .map_err(|_| MatchError::InvalidValue(raw_value.to_string()))?;

    let test_unit = caps
        .name(fields.unit)
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default();

    let raw_range = caps
        .name(fields.range)
        .ok_or(MatchError::MissingGroup(fields.range))?
        .as_str();
    let range = ReferenceRange::parse(raw_range)?;

    Ok(LabTestRecord {
        test_name,
        test_value: format_decimal(value),
        bio_reference_range: range.to_string(),
        test_unit,
        lab_test_out_of_range: !range.contains(value),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_without_results_yields_empty_list() {
        assert!(extract_lab_data("").is_empty());
        assert!(extract_lab_data("Patient: John Doe\nReferred by: Dr. Smith").is_empty());
    }

    #[test]
    fn test_space_separated_hemoglobin() {
        let records = extract_lab_data("HEMOGLOBIN 13.5 g/dL 13.0-17.0");
        assert_eq!(
            records,
            vec![LabTestRecord {
                test_name: "HEMOGLOBIN".to_string(),
                test_value: "13.5".to_string(),
                bio_reference_range: "13.0-17.0".to_string(),
                test_unit: "g/dL".to_string(),
                lab_test_out_of_range: false,
            }]
        );
    }

    #[test]
    fn test_colon_separated_glucose_out_of_range() {
        let records = extract_lab_data("GLUCOSE: 250 mg/dL (70-110)");
        assert_eq!(records.len(), 1);
        let glucose = &records[0];
        assert_eq!(glucose.test_name, "GLUCOSE");
        assert_eq!(glucose.test_value, "250.0");
        assert_eq!(glucose.test_unit, "mg/dL");
        assert_eq!(glucose.bio_reference_range, "70.0-110.0");
        assert!(glucose.lab_test_out_of_range);
    }

    #[test]
    fn test_hyphen_separated_urea() {
        let records = extract_lab_data("UREA - 30 mg/dL (15-40)");
        assert_eq!(
            records,
            vec![LabTestRecord {
                test_name: "UREA".to_string(),
                test_value: "30.0".to_string(),
                bio_reference_range: "15.0-40.0".to_string(),
                test_unit: "mg/dL".to_string(),
                lab_test_out_of_range: false,
            }]
        );
    }

    #[test]
    fn test_equals_then_hyphen_in_same_text() {
        let records = extract_lab_data("SODIUM = 150 mmol/L [135-145]\nUREA - 30 mg/dL (15-40)");
        let names: Vec<&str> = records.iter().map(|r| r.test_name.as_str()).collect();
        assert_eq!(names, vec!["SODIUM", "UREA"]);
        assert!(records[0].lab_test_out_of_range);
        assert_eq!(records[0].test_unit, "mmol/L");
        assert_eq!(records[1].test_value, "30.0");
        assert!(!records[1].lab_test_out_of_range);
    }

    #[test]
    fn test_boundary_values_are_in_range() {
        let low = extract_lab_data("SODIUM 135 mmol/L 135-145");
        assert_eq!(low.len(), 1);
        assert!(!low[0].lab_test_out_of_range);

        let high = extract_lab_data("SODIUM 145 mmol/L 135-145");
        assert_eq!(high.len(), 1);
        assert!(!high[0].lab_test_out_of_range);

        let below = extract_lab_data("SODIUM 134.9 mmol/L 135-145");
        assert_eq!(below.len(), 1);
        assert!(below[0].lab_test_out_of_range);
    }

    #[test]
    fn test_first_match_claims_test_name() {
        let records = extract_lab_data("GLUCOSE 90 mg/dL 70-110 GLUCOSE: 200 mg/dL (70-110)");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].test_value, "90.0");
        assert!(!records[0].lab_test_out_of_range);
    }

    #[test]
    fn test_multiple_results_keep_discovery_order() {
        let records =
            extract_lab_data("HEMOGLOBIN 13.5 g/dL 13.0-17.0 WBC COUNT 11000 /cumm 4000-10000");
        let names: Vec<&str> = records.iter().map(|r| r.test_name.as_str()).collect();
        assert_eq!(names, vec!["HEMOGLOBIN", "WBC COUNT"]);
        assert_eq!(records[1].test_unit, "/cumm");
        assert!(records[1].lab_test_out_of_range);
    }

    #[test]
    fn test_line_breaks_and_spacing_are_normalized() {
        let records = extract_lab_data("HEMOGLOBIN\n13.5   g/dL\r\n13.0 - 17.0");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].bio_reference_range, "13.0-17.0");
    }

    #[test]
    fn test_missing_unit_is_empty_string() {
        let records = extract_lab_data("PLATELETS: 2.5 (1.5-4.5)");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].test_unit, "");
        assert_eq!(records[0].test_value, "2.5");
    }

    #[test]
    fn test_unparseable_value_is_skipped() {
        // Arabic-Indic digits satisfy \d but not f64 parsing
        let records = extract_lab_data("GLUCOSE \u{0662}\u{0665}\u{0660} mg/dL 70-110");
        assert!(records.is_empty());
    }

    #[test]
    fn test_custom_pattern_with_to_separator() {
        let spec = PatternSpec {
            label: "worded",
            regex: r"(?P<test_name>[A-Z][A-Z ]+?) (?P<test_value>\d+) (?P<ref_range>\d+ to \d+)",
            fields: FieldMap::STANDARD,
        };
        let extractor = LabDataExtractor::new(vec![LabPattern::compile(&spec).unwrap()]);

        let records = extractor.extract("CREATININE 2 1 to 3");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].bio_reference_range, "1.0-3.0");
        assert_eq!(records[0].test_unit, "");
        assert!(!records[0].lab_test_out_of_range);
    }

    #[test]
    fn test_range_without_separator_is_dropped() {
        let spec = PatternSpec {
            label: "tilde",
            regex: r"(?P<test_name>[A-Z]+) (?P<test_value>\d+) (?P<ref_range>\d+~\d+)",
            fields: FieldMap::STANDARD,
        };
        let extractor = LabDataExtractor::new(vec![LabPattern::compile(&spec).unwrap()]);

        assert!(extractor.extract("UREA 30 15~40").is_empty());
    }

    #[test]
    fn test_failed_match_does_not_claim_name() {
        let bad = PatternSpec {
            label: "tilde",
            regex: r"(?P<test_name>[A-Z]+) (?P<test_value>\d+) (?P<ref_range>\d+~\d+)",
            fields: FieldMap::STANDARD,
        };
        let mut patterns = vec![LabPattern::compile(&bad).unwrap()];
        patterns.extend(builtin_patterns().iter().cloned());
        let extractor = LabDataExtractor::new(patterns);

        let records = extractor.extract("UREA 30 15~40 UREA: 30 mg/dL (15-40)");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].test_name, "UREA");
        assert_eq!(records[0].bio_reference_range, "15.0-40.0");
    }

    #[test]
    fn test_record_serializes_expected_fields() {
        let records = extract_lab_data("HEMOGLOBIN 13.5 g/dL 13.0-17.0");
        let json = serde_json::to_value(&records[0]).unwrap();
        assert_eq!(json["test_name"], "HEMOGLOBIN");
        assert_eq!(json["test_value"], "13.5");
        assert_eq!(json["test_unit"], "g/dL");
        assert_eq!(json["bio_reference_range"], "13.0-17.0");
        assert_eq!(json["lab_test_out_of_range"], false);
    }
}
