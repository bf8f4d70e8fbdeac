//! Label and lot models
//!
//! A lot is a batch of single-use QR labels issued together for one
//! area/bag combination. Labels carry a tri-state lifecycle: ACTIVE at
//! issuance, USED once weighed into the open ledger, and a reserved VOID
//! administrative state with no transition wired up yet.

use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Label lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelState {
    Active,
    Used,
    Void,
}

impl LabelState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LabelState::Active => "active",
            LabelState::Used => "used",
            LabelState::Void => "void",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(LabelState::Active),
            "used" => Some(LabelState::Used),
            "void" => Some(LabelState::Void),
            _ => None,
        }
    }

    /// ACTIVE → USED. Any other starting state is a conflict; the error
    /// string distinguishes an already-consumed label from a voided one.
    pub fn consume(self) -> Result<LabelState, &'static str> {
        match self {
            LabelState::Active => Ok(LabelState::Used),
            LabelState::Used => Err("label already used"),
            LabelState::Void => Err("label voided"),
        }
    }

    /// USED → ACTIVE, the compensating reversal when a ledger line is
    /// deleted.
    pub fn release(self) -> Result<LabelState, &'static str> {
        match self {
            LabelState::Used => Ok(LabelState::Active),
            LabelState::Active => Err("label not used"),
            LabelState::Void => Err("label voided"),
        }
    }
}

/// A single printed label
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Label {
    pub id: Uuid,
    /// Opaque globally-unique code printed inside the QR symbol
    pub code: String,
    pub lot_id: Uuid,
    pub area_id: i32,
    pub bag_id: i32,
    pub state: LabelState,
    pub used_at: Option<DateTime<Utc>>,
    pub used_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// A batch of labels issued together
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelLot {
    pub id: Uuid,
    pub area_id: i32,
    pub bag_id: i32,
    pub requested_quantity: i32,
    pub per_sheet_count: i32,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Grid geometry for printing labels onto a sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetGrid {
    pub columns: u32,
    pub rows: u32,
}

/// Labels-per-sheet → print grid. The preset table matches the stationery
/// the hospital actually stocks; anything else falls back to a near-square
/// grid.
pub fn sheet_grid(per_sheet: u32) -> SheetGrid {
    let (columns, rows) = match per_sheet {
        1 => (1, 1),
        2 => (1, 2),
        4 => (2, 2),
        6 => (3, 2),
        8 => (4, 2),
        10 => (5, 2),
        12 => (4, 3),
        n => {
            let columns = (n as f64).sqrt().ceil() as u32;
            let rows = n.div_ceil(columns);
            (columns, rows)
        }
    };
    SheetGrid { columns, rows }
}

/// Generate one opaque label code: millisecond timestamp in base36 plus
/// three random bytes in hex. Uniqueness is ultimately enforced by the
/// store; the entropy just makes collisions astronomically unlikely.
pub fn generate_label_code() -> String {
    let millis = Utc::now().timestamp_millis().max(0) as u64;
    let mut entropy = [0u8; 3];
    rand::thread_rng().fill_bytes(&mut entropy);
    format!(
        "{}{:02x}{:02x}{:02x}",
        to_base36(millis),
        entropy[0],
        entropy[1],
        entropy[2]
    )
}

/// Draw `quantity` distinct codes. Re-draws on the rare in-set collision
/// (same millisecond, same entropy), so the returned list is always
/// collision-free; practically this finishes in one pass.
pub fn generate_label_codes(quantity: usize) -> Vec<String> {
    let mut seen = std::collections::HashSet::with_capacity(quantity);
    let mut codes = Vec::with_capacity(quantity);
    while codes.len() < quantity {
        let code = generate_label_code();
        if seen.insert(code.clone()) {
            codes.push(code);
        }
    }
    codes
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn preset_grid_table() {
        let cases = [
            (1, 1, 1),
            (2, 1, 2),
            (4, 2, 2),
            (6, 3, 2),
            (8, 4, 2),
            (10, 5, 2),
            (12, 4, 3),
        ];
        for (per_sheet, columns, rows) in cases {
            assert_eq!(sheet_grid(per_sheet), SheetGrid { columns, rows });
        }
    }

    #[test]
    fn fallback_grid_is_near_square_and_fits() {
        for n in [3u32, 5, 7, 9, 11, 13, 20, 30, 50] {
            let grid = sheet_grid(n);
            assert_eq!(grid.columns, (n as f64).sqrt().ceil() as u32);
            assert!(grid.columns * grid.rows >= n, "grid too small for {}", n);
            assert!(grid.columns * (grid.rows - 1) < n, "grid too tall for {}", n);
        }
    }

    #[test]
    fn consume_transitions() {
        assert_eq!(LabelState::Active.consume(), Ok(LabelState::Used));
        assert_eq!(LabelState::Used.consume(), Err("label already used"));
        assert_eq!(LabelState::Void.consume(), Err("label voided"));
    }

    #[test]
    fn release_transitions() {
        assert_eq!(LabelState::Used.release(), Ok(LabelState::Active));
        assert!(LabelState::Active.release().is_err());
        assert!(LabelState::Void.release().is_err());
    }

    #[test]
    fn consume_then_release_round_trips() {
        let used = LabelState::Active.consume().unwrap();
        assert_eq!(used.release(), Ok(LabelState::Active));
    }

    #[test]
    fn code_shape_is_base36_then_hex() {
        let code = generate_label_code();
        assert!(code.len() >= 9 + 6, "unexpectedly short code: {}", code);
        assert!(code
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
        let hex_tail = &code[code.len() - 6..];
        assert!(hex_tail.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn code_sets_are_collision_free() {
        let codes = generate_label_codes(5000);
        assert_eq!(codes.len(), 5000);
        let distinct: HashSet<&String> = codes.iter().collect();
        assert_eq!(distinct.len(), 5000);
    }

    #[test]
    fn base36_encodes_known_values() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(to_base36(36 * 36 + 1), "101");
    }

    #[test]
    fn state_string_round_trip() {
        for state in [LabelState::Active, LabelState::Used, LabelState::Void] {
            assert_eq!(LabelState::from_str(state.as_str()), Some(state));
        }
        assert_eq!(LabelState::from_str("burned"), None);
    }
}
