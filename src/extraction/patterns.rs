//! Surface syntaxes that tie a test name to its value and reference range.
//!
//! Patterns are plain data: adding a syntax means adding a [`PatternSpec`]
//! to [`BUILTIN_PATTERNS`], the extractor loop does not change.

use regex::{Regex, RegexBuilder};
use std::sync::LazyLock;

/// Capture group names a pattern uses for each record field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMap {
    pub name: &'static str,
    pub value: &'static str,
    pub unit: &'static str,
    pub range: &'static str,
}

impl FieldMap {
    pub const STANDARD: FieldMap = FieldMap {
        name: "test_name",
        value: "test_value",
        unit: "unit",
        range: "ref_range",
    };
}

/// Uncompiled pattern table entry
#[derive(Debug, Clone, Copy)]
pub struct PatternSpec {
    pub label: &'static str,
    pub regex: &'static str,
    pub fields: FieldMap,
}

/// Compiled pattern ready for matching
#[derive(Debug, Clone)]
pub struct LabPattern {
    pub label: &'static str,
    pub regex: Regex,
    pub fields: FieldMap,
}

impl LabPattern {
    /// Compile a spec; matching is always case-insensitive
    pub fn compile(spec: &PatternSpec) -> Result<Self, regex::Error> {
        let regex = RegexBuilder::new(spec.regex)
            .case_insensitive(true)
            .multi_line(true)
            .build()?;

        Ok(Self {
            label: spec.label,
            regex,
            fields: spec.fields,
        })
    }
}

/// Built-in syntaxes, tried in this order
pub const BUILTIN_PATTERNS: [PatternSpec; 4] = [
    // HEMOGLOBIN 13.5 g/dL 13.0-17.0
    PatternSpec {
        label: "space",
        regex: r"(?P<test_name>[A-Z][A-Z\s\(\)/]+)\s+(?P<test_value>\d+\.?\d*)\s*(?P<unit>[a-zA-Z%/]+)?\s*(?P<ref_range>\d+\.?\d*\s*-\s*\d+\.?\d*)",
        fields: FieldMap::STANDARD,
    },
    // GLUCOSE: 250 mg/dL (70-110)
    PatternSpec {
        label: "colon",
        regex: r"(?P<test_name>[A-Z][A-Z\s\(\)/]+):\s*(?P<test_value>\d+\.?\d*)\s*(?P<unit>[a-zA-Z%/]+)?\s*[\(\[]?(?P<ref_range>\d+\.?\d*\s*-\s*\d+\.?\d*)[\)\]]?",
        fields: FieldMap::STANDARD,
    },
    // SODIUM = 140 mmol/L [135-145]
    PatternSpec {
        label: "equals",
        regex: r"(?P<test_name>[A-Z][A-Z\s\(\)/]+)\s*=\s*(?P<test_value>\d+\.?\d*)\s*(?P<unit>[a-zA-Z%/]+)?\s*[\(\[]?(?P<ref_range>\d+\.?\d*\s*-\s*\d+\.?\d*)[\)\]]?",
        fields: FieldMap::STANDARD,
    },
    // UREA - 30 mg/dL (15-40)
    PatternSpec {
        label: "hyphen",
        regex: r"(?P<test_name>[A-Z][A-Z\s\(\)/]+)\s*-\s*(?P<test_value>\d+\.?\d*)\s*(?P<unit>[a-zA-Z%/]+)?\s*[\(\[]?(?P<ref_range>\d+\.?\d*\s*-\s*\d+\.?\d*)[\)\]]?",
        fields: FieldMap::STANDARD,
    },
];

static COMPILED_BUILTINS: LazyLock<Vec<LabPattern>> = LazyLock::new(|| {
    BUILTIN_PATTERNS
        .iter()
        .map(|spec| LabPattern::compile(spec).expect("built-in lab pattern must compile"))
        .collect()
});

/// The compiled built-in table, compiled once per process
pub fn builtin_patterns() -> &'static [LabPattern] {
    &COMPILED_BUILTINS
}
