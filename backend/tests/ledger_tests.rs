//! Open ledger (registro) tests
//!
//! Property-based and unit tests for the ledger semantics:
//! - The running total always equals the sum of the líneas
//! - A label is consumed exactly once; a second scan is rejected
//! - Removing a línea releases its label and the ledger state is
//!   indistinguishable from never having appended it
//! - CERRADO is terminal: a settled registro accepts no append or
//!   removal and its total never changes again

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::collections::HashMap;

use shared::models::{LabelState, RegistroState};
use shared::validation::{validate_close, validate_weight_lb};

// ============================================================================
// In-memory ledger model
// ============================================================================

/// Minimal model of the registro lifecycle: label states, appended lines,
/// and the one-way close. Mirrors the transactional semantics the service
/// enforces in SQL (the registro row lock makes every mutation see the
/// settled state).
struct Ledger {
    state: RegistroState,
    labels: HashMap<u32, LabelState>,
    lineas: Vec<(u64, u32, Decimal)>,
    next_linea_id: u64,
}

impl Ledger {
    fn with_labels(count: u32) -> Self {
        let mut labels = HashMap::new();
        for id in 0..count {
            labels.insert(id, LabelState::Active);
        }
        Ledger {
            state: RegistroState::Abierto,
            labels,
            lineas: Vec::new(),
            next_linea_id: 0,
        }
    }

    fn append(&mut self, label: u32, weight_lb: Decimal) -> Result<u64, &'static str> {
        if self.state == RegistroState::Cerrado {
            return Err("registro already closed");
        }
        validate_weight_lb(weight_lb)?;
        let state = self.labels.get(&label).copied().ok_or("label not found")?;
        let consumed = state.consume()?;
        self.labels.insert(label, consumed);

        let id = self.next_linea_id;
        self.next_linea_id += 1;
        self.lineas.push((id, label, weight_lb));
        Ok(id)
    }

    fn remove(&mut self, linea_id: u64) -> Result<(), &'static str> {
        if self.state == RegistroState::Cerrado {
            return Err("registro already closed");
        }
        let pos = self
            .lineas
            .iter()
            .position(|(id, _, _)| *id == linea_id)
            .ok_or("línea not found")?;
        let (_, label, _) = self.lineas.remove(pos);

        let state = self.labels.get(&label).copied().ok_or("label not found")?;
        let released = state.release()?;
        self.labels.insert(label, released);
        Ok(())
    }

    fn close(&mut self) -> Result<(), &'static str> {
        validate_close(self.lineas.len() as i64)?;
        self.state = self.state.close()?;
        Ok(())
    }

    fn total(&self) -> Decimal {
        self.lineas.iter().map(|(_, _, w)| *w).sum()
    }
}

fn lb(s: &str) -> Decimal {
    s.parse().unwrap()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[test]
fn test_total_tracks_appends_and_removals() {
    let mut ledger = Ledger::with_labels(3);

    let a = ledger.append(0, lb("2.5")).unwrap();
    ledger.append(1, lb("1.25")).unwrap();
    assert_eq!(ledger.total(), lb("3.75"));

    ledger.remove(a).unwrap();
    assert_eq!(ledger.total(), lb("1.25"));
}

#[test]
fn test_second_scan_of_same_label_is_rejected() {
    let mut ledger = Ledger::with_labels(1);

    ledger.append(0, lb("2.0")).unwrap();
    assert_eq!(ledger.append(0, lb("2.0")), Err("label already used"));
    assert_eq!(ledger.total(), lb("2.0"));
}

#[test]
fn test_voided_label_cannot_be_weighed_in() {
    let mut ledger = Ledger::with_labels(1);
    ledger.labels.insert(0, LabelState::Void);

    assert_eq!(ledger.append(0, lb("2.0")), Err("label voided"));
    assert!(ledger.lineas.is_empty());
}

#[test]
fn test_removal_releases_the_label_for_rescan() {
    let mut ledger = Ledger::with_labels(1);

    let linea = ledger.append(0, lb("4.0")).unwrap();
    ledger.remove(linea).unwrap();
    assert_eq!(ledger.labels[&0], LabelState::Active);

    // The corrected weigh-in goes through on the same label.
    ledger.append(0, lb("3.5")).unwrap();
    assert_eq!(ledger.total(), lb("3.5"));
}

#[test]
fn test_invalid_weights_never_enter_the_ledger() {
    let mut ledger = Ledger::with_labels(2);

    assert!(ledger.append(0, Decimal::ZERO).is_err());
    assert!(ledger.append(0, lb("-1")).is_err());
    assert!(ledger.append(0, lb("501")).is_err());

    // The failed appends consumed nothing.
    assert_eq!(ledger.labels[&0], LabelState::Active);
    assert_eq!(ledger.total(), Decimal::ZERO);
}

#[test]
fn test_no_line_enters_a_settled_registro() {
    let mut ledger = Ledger::with_labels(2);

    ledger.append(0, lb("2.0")).unwrap();
    ledger.close().unwrap();

    // A scan landing after the close is rejected, its label untouched.
    assert_eq!(ledger.append(1, lb("1.0")), Err("registro already closed"));
    assert_eq!(ledger.lineas.len(), 1);
    assert_eq!(ledger.labels[&1], LabelState::Active);
    assert_eq!(ledger.total(), lb("2.0"));
}

#[test]
fn test_settled_lineas_are_immutable() {
    let mut ledger = Ledger::with_labels(1);

    let linea = ledger.append(0, lb("4.5")).unwrap();
    ledger.close().unwrap();

    assert_eq!(ledger.remove(linea), Err("registro already closed"));
    assert_eq!(ledger.total(), lb("4.5"));
    assert_eq!(ledger.labels[&0], LabelState::Used);
}

#[test]
fn test_empty_registro_cannot_close() {
    let mut ledger = Ledger::with_labels(1);
    assert_eq!(ledger.close(), Err("Cannot close an empty registro"));
    assert_eq!(ledger.state, RegistroState::Abierto);
}

// ============================================================================
// Property Tests
// ============================================================================

/// A random ledger interaction: scan some label, remove some earlier línea
/// by position, or attempt to settle the registro.
#[derive(Debug, Clone)]
enum Action {
    Append { label: u32, milli_lb: i64 },
    Remove { slot: usize },
    Close,
}

fn action_strategy(label_count: u32) -> impl Strategy<Value = Action> {
    prop_oneof![
        4 => (0..label_count, 1i64..=500_000).prop_map(|(label, milli_lb)| Action::Append {
            label,
            milli_lb,
        }),
        2 => (0usize..32).prop_map(|slot| Action::Remove { slot }),
        1 => Just(Action::Close),
    ]
}

proptest! {
    /// After any interleaving of scans, removals and close attempts, the
    /// running total is the sum of the surviving líneas, every label's
    /// state agrees with whether a línea references it, and once the
    /// registro settles its líneas stop changing.
    #[test]
    fn prop_total_and_states_stay_consistent(
        actions in proptest::collection::vec(action_strategy(8), 0..40)
    ) {
        let mut ledger = Ledger::with_labels(8);
        let mut settled_total: Option<Decimal> = None;

        for action in actions {
            match action {
                Action::Append { label, milli_lb } => {
                    let _ = ledger.append(label, Decimal::new(milli_lb, 3));
                }
                Action::Remove { slot } => {
                    if let Some((id, _, _)) = ledger.lineas.get(slot).copied() {
                        let _ = ledger.remove(id);
                    }
                }
                Action::Close => {
                    if ledger.close().is_ok() {
                        settled_total = Some(ledger.total());
                    }
                }
            }

            let recomputed: Decimal = ledger.lineas.iter().map(|(_, _, w)| *w).sum();
            prop_assert_eq!(ledger.total(), recomputed);

            if let Some(frozen) = settled_total {
                prop_assert_eq!(ledger.state, RegistroState::Cerrado);
                prop_assert_eq!(ledger.total(), frozen);
            }

            for (label, state) in &ledger.labels {
                let referenced = ledger.lineas.iter().any(|(_, l, _)| l == label);
                match state {
                    LabelState::Used => prop_assert!(referenced),
                    LabelState::Active => prop_assert!(!referenced),
                    LabelState::Void => prop_assert!(!referenced),
                }
            }
        }
    }

    /// Append followed by remove leaves the ledger exactly where it was.
    #[test]
    fn prop_removal_is_a_full_reversal(
        setup in proptest::collection::vec(1i64..=500_000, 0..10),
        extra_milli_lb in 1i64..=500_000,
    ) {
        let labels = setup.len() as u32 + 1;
        let mut ledger = Ledger::with_labels(labels);
        for (label, milli_lb) in setup.iter().enumerate() {
            ledger.append(label as u32, Decimal::new(*milli_lb, 3)).unwrap();
        }
        let before_total = ledger.total();
        let before_count = ledger.lineas.len();

        let extra_label = labels - 1;
        let linea = ledger
            .append(extra_label, Decimal::new(extra_milli_lb, 3))
            .unwrap();
        ledger.remove(linea).unwrap();

        prop_assert_eq!(ledger.total(), before_total);
        prop_assert_eq!(ledger.lineas.len(), before_count);
        prop_assert_eq!(ledger.labels[&extra_label], LabelState::Active);
    }

    /// However many times the same label is scanned, at most one línea
    /// carries it.
    #[test]
    fn prop_label_is_consumed_at_most_once(scans in 1usize..=10) {
        let mut ledger = Ledger::with_labels(1);
        let mut accepted = 0;
        for _ in 0..scans {
            if ledger.append(0, lb("1.0")).is_ok() {
                accepted += 1;
            }
        }
        prop_assert_eq!(accepted, 1);
        prop_assert_eq!(ledger.lineas.len(), 1);
    }

    /// Once settled, no sequence of further appends or removals changes
    /// the registro's líneas or total.
    #[test]
    fn prop_settled_registro_is_frozen(
        attempts in proptest::collection::vec(action_strategy(4), 1..20)
    ) {
        let mut ledger = Ledger::with_labels(4);
        ledger.append(0, lb("1.5")).unwrap();
        ledger.close().unwrap();
        let frozen = ledger.total();

        for action in attempts {
            match action {
                Action::Append { label, milli_lb } => {
                    prop_assert!(ledger.append(label, Decimal::new(milli_lb, 3)).is_err());
                }
                Action::Remove { slot } => {
                    if let Some((id, _, _)) = ledger.lineas.get(slot).copied() {
                        prop_assert!(ledger.remove(id).is_err());
                    }
                }
                Action::Close => {
                    prop_assert_eq!(ledger.close(), Err("registro already closed"));
                }
            }
        }

        prop_assert_eq!(ledger.total(), frozen);
        prop_assert_eq!(ledger.lineas.len(), 1);
    }
}
