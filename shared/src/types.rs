//! Common types used across the platform

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Weight unit for report rendering.
///
/// Pounds are the canonical storage unit everywhere in the system;
/// kilograms exist only as a display-layer conversion.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum WeightUnit {
    #[default]
    Lb,
    Kg,
}

impl WeightUnit {
    pub fn code(&self) -> &'static str {
        match self {
            WeightUnit::Lb => "lb",
            WeightUnit::Kg => "kg",
        }
    }

    pub fn from_code(s: &str) -> Option<Self> {
        match s {
            "lb" => Some(WeightUnit::Lb),
            "kg" => Some(WeightUnit::Kg),
            _ => None,
        }
    }
}

/// Pounds per kilogram. The single conversion constant for the whole
/// system: 2.20462262185.
pub fn lb_per_kg() -> Decimal {
    Decimal::new(220_462_262_185, 11)
}

/// Convert a canonical pound weight into kilograms.
pub fn lb_to_kg(lb: Decimal) -> Decimal {
    lb / lb_per_kg()
}

/// Convert kilograms back into canonical pounds.
pub fn kg_to_lb(kg: Decimal) -> Decimal {
    kg * lb_per_kg()
}

/// Convert a canonical pound weight into the requested display unit.
pub fn convert_weight(lb: Decimal, unit: WeightUnit) -> Decimal {
    match unit {
        WeightUnit::Lb => lb,
        WeightUnit::Kg => lb_to_kg(lb),
    }
}

/// Round a weight for report cells (2 decimal places, banker's rounding off).
pub fn round_weight(value: Decimal) -> Decimal {
    value.round_dp(2)
}

/// Date range for report queries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateRange {
    pub start: chrono::NaiveDate,
    pub end: chrono::NaiveDate,
}
