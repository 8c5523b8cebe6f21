use std::fmt;
use thiserror::Error;

/// Why a captured reference range was rejected
#[derive(Error, Debug, PartialEq)]
pub enum RangeError {
    #[error("no range separator in '{0}'")]
    NoSeparator(String),

    #[error("expected two bounds in '{0}'")]
    BoundCount(String),

    #[error("invalid bound '{0}'")]
    InvalidBound(String),
}

/// Clinically normal interval for a lab test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceRange {
    pub low: f64,
    pub high: f64,
}

impl ReferenceRange {
    /// Parse `"low-high"` or `"low to high"`, ignoring spaces
    pub fn parse(raw: &str) -> Result<Self, RangeError> {
        let compact: String = raw.chars().filter(|c| *c != ' ').collect();

        let parts: Vec<String> = if compact.contains('-') {
            compact.split('-').map(str::to_string).collect()
        } else {
            let lower = compact.to_lowercase();
            if !lower.contains("to") {
                return Err(RangeError::NoSeparator(raw.to_string()));
            }
            lower.split("to").map(str::to_string).collect()
        };

        let [low, high] = parts.as_slice() else {
            return Err(RangeError::BoundCount(raw.to_string()));
        };

        Ok(Self {
            low: parse_bound(low)?,
            high: parse_bound(high)?,
        })
    }

    /// Boundary values count as inside the range
    pub fn contains(&self, value: f64) -> bool {
        !(value < self.low || value > self.high)
    }
}

impl fmt::Display for ReferenceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}",
            format_decimal(self.low),
            format_decimal(self.high)
        )
    }
}

fn parse_bound(text: &str) -> Result<f64, RangeError> {
    text.parse::<f64>()
        .map_err(|_| RangeError::InvalidBound(text.to_string()))
}

/// Shortest round-trip rendering that always shows a fraction or exponent:
/// `250` -> `250.0`, `1e16` -> `1e+16`, `0.00001` -> `1e-05`
pub fn format_decimal(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let scientific = format!("{:e}", value);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return value.to_string();
    };
    let Ok(exponent) = exponent.parse::<i32>() else {
        return value.to_string();
    };

    if (-4..16).contains(&exponent) {
        let plain = value.to_string();
        if plain.contains('.') {
            plain
        } else {
            format!("{}.0", plain)
        }
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", mantissa, sign, exponent.abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_spaced_hyphen_range() {
        let range = ReferenceRange::parse("70 - 110").unwrap();
        assert_eq!(range.low, 70.0);
        assert_eq!(range.high, 110.0);
        assert_eq!(range.to_string(), "70.0-110.0");
    }

    #[test]
    fn test_parse_decimal_range_keeps_precision() {
        let range = ReferenceRange::parse("13.0-17.5").unwrap();
        assert_eq!(range.to_string(), "13.0-17.5");
    }

    #[test]
    fn test_parse_to_separator_case_insensitive() {
        let range = ReferenceRange::parse("3.5 TO 5.1").unwrap();
        assert_eq!(range.low, 3.5);
        assert_eq!(range.high, 5.1);
    }

    #[test]
    fn test_parse_without_separator_is_rejected() {
        assert_eq!(
            ReferenceRange::parse("70~110"),
            Err(RangeError::NoSeparator("70~110".to_string()))
        );
    }

    #[test]
    fn test_parse_extra_bounds_rejected() {
        assert!(matches!(
            ReferenceRange::parse("1-2-3"),
            Err(RangeError::BoundCount(_))
        ));
    }

    #[test]
    fn test_parse_non_numeric_bound_rejected() {
        assert!(matches!(
            ReferenceRange::parse("low-high"),
            Err(RangeError::InvalidBound(_))
        ));
    }

    #[test]
    fn test_contains_is_boundary_inclusive() {
        let range = ReferenceRange {
            low: 70.0,
            high: 110.0,
        };
        assert!(range.contains(70.0));
        assert!(range.contains(110.0));
        assert!(range.contains(90.0));
        assert!(!range.contains(69.9));
        assert!(!range.contains(110.1));
    }

    #[test]
    fn test_format_decimal() {
        assert_eq!(format_decimal(250.0), "250.0");
        assert_eq!(format_decimal(13.5), "13.5");
        assert_eq!(format_decimal(0.25), "0.25");
        assert_eq!(format_decimal(0.0), "0.0");
        assert_eq!(format_decimal(0.0001), "0.0001");
        assert_eq!(format_decimal(1e15), "1000000000000000.0");
    }

    #[test]
    fn test_format_decimal_switches_to_exponent() {
        assert_eq!(format_decimal(12345678901234567.0), "1.2345678901234568e+16");
        assert_eq!(format_decimal(1e16), "1e+16");
        assert_eq!(format_decimal(0.00001), "1e-05");
        assert_eq!(format_decimal(2.5e-7), "2.5e-07");
        assert_eq!(format_decimal(f64::INFINITY), "inf");
    }
}
