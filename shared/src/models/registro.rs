//! Registro (open ledger / settlement batch) and línea models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Registro lifecycle state. At most one registro is ABIERTO at any
/// instant, globally; CERRADO is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistroState {
    Abierto,
    Cerrado,
}

impl RegistroState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistroState::Abierto => "abierto",
            RegistroState::Cerrado => "cerrado",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "abierto" => Some(RegistroState::Abierto),
            "cerrado" => Some(RegistroState::Cerrado),
            _ => None,
        }
    }

    /// ABIERTO → CERRADO, one-way.
    pub fn close(self) -> Result<RegistroState, &'static str> {
        match self {
            RegistroState::Abierto => Ok(RegistroState::Cerrado),
            RegistroState::Cerrado => Err("registro already closed"),
        }
    }
}

/// The settlement batch accumulating weighed scan events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registro {
    pub id: Uuid,
    pub state: RegistroState,
    /// Running total in canonical pounds, kept equal to the sum of the
    /// líneas after every mutation
    pub total_weight_lb: Decimal,
    pub pdf_ref: Option<String>,
    pub opened_by: Uuid,
    pub opened_by_name: String,
    pub opened_at: DateTime<Utc>,
    pub closed_by: Option<Uuid>,
    pub closed_at: Option<DateTime<Utc>>,
}

/// One ledger entry: a consumed label with its weighed-in value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Linea {
    pub id: Uuid,
    pub registro_id: Uuid,
    pub label_id: Uuid,
    pub area_id: i32,
    pub bag_id: i32,
    pub category_id: Option<i32>,
    pub weight_lb: Decimal,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_is_one_way() {
        assert_eq!(RegistroState::Abierto.close(), Ok(RegistroState::Cerrado));
        assert_eq!(
            RegistroState::Cerrado.close(),
            Err("registro already closed")
        );
    }

    #[test]
    fn state_string_round_trip() {
        for state in [RegistroState::Abierto, RegistroState::Cerrado] {
            assert_eq!(RegistroState::from_str(state.as_str()), Some(state));
        }
        assert_eq!(RegistroState::from_str("reopened"), None);
    }
}
