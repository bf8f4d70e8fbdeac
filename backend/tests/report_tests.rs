//! Report matrix tests
//!
//! Tests for the area×category report endpoints' shared aggregation:
//! - Fuzzy column resolution against untidy catalog names
//! - Fixed row/column ordering expected by the paper form
//! - Pound/kilogram presentation

use proptest::prelude::*;
use rust_decimal::Decimal;

use shared::models::{
    build_matrix, Area, CategoryResolver, ReportLine, WasteCategory, CANONICAL_AREAS,
    REPORT_COLUMNS,
};
use shared::types::{convert_weight, lb_per_kg, round_weight, WeightUnit};

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn canonical_areas() -> Vec<Area> {
    CANONICAL_AREAS
        .iter()
        .enumerate()
        .map(|(i, name)| Area {
            id: i as i32 + 1,
            name: name.to_string(),
            active: true,
        })
        .collect()
}

fn categories_named(names: &[&str]) -> Vec<WasteCategory> {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| WasteCategory {
            id: i as i32 + 100,
            name: name.to_string(),
            active: true,
        })
        .collect()
}

// ============================================================================
// Fuzzy category resolution
// ============================================================================

#[test]
fn test_resolver_ignores_case_and_diacritics() {
    let categories = categories_named(&["DESECHOS INFECCIOSOS", "desechos anatomopatológicos"]);
    let resolver = CategoryResolver::new(&categories);

    assert_eq!(resolver.resolve("Desechos Infecciosos"), Some(100));
    assert_eq!(resolver.resolve("Desechos Anatomopatológicos"), Some(101));
}

#[test]
fn test_resolver_accepts_synonym_spellings() {
    // Catalogs in the field carry local spellings; the synonym table maps
    // them back onto the canonical column titles.
    let categories = categories_named(&[
        "Residuos Biológicos",
        "Agujas y punzantes",
        "Residuos Químicos",
        "Basura común",
    ]);
    let resolver = CategoryResolver::new(&categories);

    assert_eq!(resolver.resolve("Desechos Infecciosos"), Some(100));
    assert_eq!(resolver.resolve("Desechos Cortopunzantes"), Some(101));
    assert_eq!(resolver.resolve("Desechos Especiales"), Some(102));
    assert_eq!(resolver.resolve("Desecho Común"), Some(103));
}

#[test]
fn test_resolver_prefers_exact_match_over_synonym() {
    let categories = categories_named(&["Material infeccioso", "Desechos Infecciosos"]);
    let resolver = CategoryResolver::new(&categories);

    assert_eq!(resolver.resolve("Desechos Infecciosos"), Some(101));
}

#[test]
fn test_unmatched_title_drops_its_column() {
    // No catalog entry resembles "Desechos Especiales".
    let categories = categories_named(&[
        "Desechos Infecciosos",
        "Desechos Cortopunzantes",
        "Desechos Anatomopatológicos",
        "Desecho Común",
    ]);
    let matrix = build_matrix(&[], &canonical_areas(), &categories, WeightUnit::Lb, false);

    assert_eq!(matrix.columnas.len(), 4);
    assert!(matrix
        .columnas
        .iter()
        .all(|c| c.titulo != "Desechos Especiales"));
}

// ============================================================================
// Form layout
// ============================================================================

#[test]
fn test_form_has_fixed_headers() {
    let titles: Vec<&str> = REPORT_COLUMNS.iter().map(|(t, _)| *t).collect();
    assert_eq!(
        titles,
        vec![
            "Desechos Infecciosos",
            "Desechos Cortopunzantes",
            "Desechos Anatomopatológicos",
            "Desechos Especiales",
            "Desecho Común",
        ]
    );
    assert_eq!(CANONICAL_AREAS.len(), 15);
    assert_eq!(CANONICAL_AREAS[0], "Emergencia");
    assert_eq!(CANONICAL_AREAS[14], "Bodega");
}

#[test]
fn test_rows_and_columns_keep_canonical_order() {
    let categories = categories_named(&[
        "Desechos Infecciosos",
        "Desechos Cortopunzantes",
        "Desechos Anatomopatológicos",
        "Desechos Especiales",
        "Desecho Común",
    ]);
    let matrix = build_matrix(&[], &canonical_areas(), &categories, WeightUnit::Lb, false);

    let rows: Vec<&str> = matrix.filas.iter().map(|f| f.area.as_str()).collect();
    assert_eq!(rows, CANONICAL_AREAS.to_vec());

    let cols: Vec<&str> = matrix.columnas.iter().map(|c| c.titulo.as_str()).collect();
    let expected: Vec<&str> = REPORT_COLUMNS.iter().map(|(t, _)| *t).collect();
    assert_eq!(cols, expected);
}

#[test]
fn test_single_registro_form_names_the_opener_on_every_row() {
    let categories = categories_named(&["Desechos Infecciosos"]);
    // One weighed line in Cocina; the other fourteen rows stay empty.
    let lines = vec![ReportLine {
        area_id: 12,
        category_id: Some(100),
        weight_lb: dec("3.0"),
        responsable: None,
    }];

    let matrix = build_matrix(&lines, &canonical_areas(), &categories, WeightUnit::Lb, false)
        .with_responsable("Lcda. Ruiz");

    assert_eq!(matrix.filas.len(), 15);
    assert!(matrix
        .filas
        .iter()
        .all(|f| f.responsable.as_deref() == Some("Lcda. Ruiz")));
}

// ============================================================================
// Unit presentation
// ============================================================================

#[test]
fn test_kilogram_report_divides_by_the_conversion_factor() {
    let categories = categories_named(&["Desechos Infecciosos"]);
    let lines = vec![ReportLine {
        area_id: 1,
        category_id: Some(100),
        weight_lb: lb_per_kg() * Decimal::from(3), // exactly 3 kg
        responsable: None,
    }];

    let matrix = build_matrix(&lines, &canonical_areas(), &categories, WeightUnit::Kg, true);
    assert_eq!(matrix.filas[0].valores[0].valor, dec("3.00"));
}

proptest! {
    /// Pound and kilogram reports describe the same physical weight: the
    /// kg cell times the conversion factor matches the lb cell within
    /// rounding.
    #[test]
    fn prop_units_agree_within_rounding(centi_lb in 1i64..=50_000) {
        let weight = Decimal::new(centi_lb, 2);
        let as_kg = round_weight(convert_weight(weight, WeightUnit::Kg));
        let back = as_kg * lb_per_kg();
        let diff = (back - weight).abs();
        // One cent of a kg rounds to at most ~0.011 lb.
        prop_assert!(diff <= dec("0.012"), "diff {} for {}", diff, weight);
    }

    /// Totals in kg equal the sum of the rounded kg cells, same as in lb.
    #[test]
    fn prop_kg_totals_are_kg_cell_sums(
        entries in proptest::collection::vec((0usize..15, 1i64..50_000), 1..25)
    ) {
        let categories = categories_named(&["Desechos Infecciosos"]);
        let lines: Vec<ReportLine> = entries
            .iter()
            .map(|(area, centi_lb)| ReportLine {
                area_id: *area as i32 + 1,
                category_id: Some(100),
                weight_lb: Decimal::new(*centi_lb, 2),
                responsable: None,
            })
            .collect();

        let matrix = build_matrix(&lines, &canonical_areas(), &categories, WeightUnit::Kg, false);
        let cell_sum: Decimal = matrix.filas.iter().map(|f| f.valores[0].valor).sum();
        prop_assert_eq!(matrix.totales[0].valor, cell_sum);
    }
}
