//! # Unit Types
//!
//! Type-safe wrappers for room dimensions. Dimensions are informational
//! (they feed the displayed area only), so they stay plain `f64` rather than
//! exact decimals like money does.
//!
//! ## Example
//!
//! ```rust
//! use estimate_core::units::{Meters, SquareMeters};
//!
//! let area: SquareMeters = Meters(3.5) * Meters(4.0);
//! assert_eq!(area.round_dp(2), SquareMeters(14.0));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Mul};

/// Length in meters
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Meters(pub f64);

/// Area in square meters
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SquareMeters(pub f64);

impl Meters {
    /// Round to `dp` decimal places.
    pub fn round_dp(self, dp: u32) -> Self {
        Meters(round_f64(self.0, dp))
    }
}

impl SquareMeters {
    /// Round to `dp` decimal places.
    pub fn round_dp(self, dp: u32) -> Self {
        SquareMeters(round_f64(self.0, dp))
    }
}

impl Mul for Meters {
    type Output = SquareMeters;

    fn mul(self, rhs: Meters) -> SquareMeters {
        SquareMeters(self.0 * rhs.0)
    }
}

impl Add for SquareMeters {
    type Output = SquareMeters;

    fn add(self, rhs: SquareMeters) -> SquareMeters {
        SquareMeters(self.0 + rhs.0)
    }
}

impl fmt::Display for Meters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} m", self.0)
    }
}

impl fmt::Display for SquareMeters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} m²", self.0)
    }
}

fn round_f64(value: f64, dp: u32) -> f64 {
    let factor = 10f64.powi(dp as i32);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_area_from_dimensions() {
        let area = Meters(2.0) * Meters(3.0);
        assert_eq!(area, SquareMeters(6.0));
    }

    #[test]
    fn test_area_rounding() {
        let area = (Meters(1.234) * Meters(2.0)).round_dp(2);
        assert_eq!(area, SquareMeters(2.47));
    }

    #[test]
    fn test_display() {
        assert_eq!(Meters(3.5).to_string(), "3.50 m");
        assert_eq!(SquareMeters(14.0).to_string(), "14.00 m²");
    }

    #[test]
    fn test_transparent_serialization() {
        let json = serde_json::to_string(&Meters(2.5)).unwrap();
        assert_eq!(json, "2.5");
    }
}
