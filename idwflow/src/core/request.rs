//! The validated analysis request.

use crate::errors::ValidationError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Smallest accepted power exponent.
pub const K_MIN: u32 = 2;

/// Largest accepted power exponent.
pub const K_MAX: u32 = 30;

/// A validated request for one pipeline run.
///
/// Only constructible through [`AnalysisRequest::parse`], so `k` is always
/// within `[K_MIN, K_MAX]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    k: u32,
    run_id: Uuid,
}

impl AnalysisRequest {
    /// Validates the raw user input.
    ///
    /// Accepts only a non-empty run of ASCII digits whose value lies in the
    /// closed range `[K_MIN, K_MAX]`. Signs, whitespace and decimal points
    /// are rejected.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        if raw.is_empty() {
            return Err(ValidationError::Empty {
                min: K_MIN,
                max: K_MAX,
            });
        }

        if !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ValidationError::NotAnInteger {
                raw: raw.to_string(),
                min: K_MIN,
                max: K_MAX,
            });
        }

        let out_of_range = || ValidationError::OutOfRange {
            raw: raw.to_string(),
            min: K_MIN,
            max: K_MAX,
        };

        // All digits: the only possible parse failure is overflow.
        let k: u32 = raw.parse().map_err(|_| out_of_range())?;
        if !(K_MIN..=K_MAX).contains(&k) {
            return Err(out_of_range());
        }

        Ok(Self {
            k,
            run_id: crate::utils::generate_uuid(),
        })
    }

    /// Returns the power exponent.
    #[must_use]
    pub fn k(&self) -> u32 {
        self.k
    }

    /// Returns the power exponent as a float for the interpolation.
    #[must_use]
    pub fn power(&self) -> f64 {
        f64::from(self.k)
    }

    /// Returns the identifier of this run.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }
}

impl FromStr for AnalysisRequest {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_range_bounds() {
        assert_eq!(AnalysisRequest::parse("2").unwrap().k(), 2);
        assert_eq!(AnalysisRequest::parse("30").unwrap().k(), 30);
        assert_eq!(AnalysisRequest::parse("15").unwrap().k(), 15);
    }

    #[test]
    fn test_accepts_leading_zeros() {
        assert_eq!(AnalysisRequest::parse("05").unwrap().k(), 5);
    }

    #[test]
    fn test_every_value_in_range_is_accepted() {
        for k in K_MIN..=K_MAX {
            let request = AnalysisRequest::parse(&k.to_string()).unwrap();
            assert_eq!(request.k(), k);
            assert!((request.power() - f64::from(k)).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn test_rejects_empty() {
        assert_eq!(
            AnalysisRequest::parse(""),
            Err(ValidationError::Empty { min: 2, max: 30 })
        );
    }

    #[test]
    fn test_rejects_non_integers() {
        for raw in ["abc", "-5", "+5", " 5", "5 ", "2.5", "1e1", "٣"] {
            assert!(
                matches!(
                    AnalysisRequest::parse(raw),
                    Err(ValidationError::NotAnInteger { .. })
                ),
                "{raw:?} should be rejected as not an integer"
            );
        }
    }

    #[test]
    fn test_rejects_out_of_range() {
        for raw in ["0", "1", "31", "100", "99999999999999999999"] {
            let err = AnalysisRequest::parse(raw).unwrap_err();
            assert!(matches!(err, ValidationError::OutOfRange { .. }), "{raw}");
            assert_eq!(err.raw(), raw);
        }
    }

    #[test]
    fn test_each_request_gets_fresh_run_id() {
        let a = AnalysisRequest::parse("3").unwrap();
        let b: AnalysisRequest = "3".parse().unwrap();
        assert_ne!(a.run_id(), b.run_id());
    }
}
