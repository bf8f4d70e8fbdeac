//! Settlement / report matrix
//!
//! Both the settlement engine and the historical report endpoints emit the
//! same DTO so the downstream renderer can align either one to the physical
//! paper form: 15 canonical area rows × 5 canonical category columns in
//! fixed order. The builder is pure so the aggregation can be tested
//! without a database.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::models::catalog::{
    Area, CategoryResolver, WasteCategory, normalize_name, CANONICAL_AREAS, COMMON_COLUMN_TITLE,
    REPORT_COLUMNS,
};
use crate::types::{convert_weight, round_weight, WeightUnit};

/// One report column header
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportColumn {
    pub id: i32,
    pub titulo: String,
    pub subtitulo: String,
}

/// One cell value, tagged with its category id
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellValue {
    pub tipo_id: i32,
    pub valor: Decimal,
}

/// One area row of the form
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    pub area_id: i32,
    pub area: String,
    pub valores: Vec<CellValue>,
    pub responsable: Option<String>,
}

/// The report DTO consumed by the external renderer. Field names are
/// camelCase on the wire for compatibility with the printing collaborator.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WasteReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registro_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fecha: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estado: Option<String>,
    pub unidad: WeightUnit,
    pub columnas: Vec<ReportColumn>,
    pub filas: Vec<ReportRow>,
    pub totales: Vec<CellValue>,
}

/// Aggregation input: one ledger line reduced to what the matrix needs
#[derive(Debug, Clone)]
pub struct ReportLine {
    pub area_id: i32,
    pub category_id: Option<i32>,
    pub weight_lb: Decimal,
    pub responsable: Option<String>,
}

/// Built matrix plus the audit counters the caller is expected to surface
#[derive(Debug, Clone)]
pub struct ReportMatrix {
    pub columnas: Vec<ReportColumn>,
    pub filas: Vec<ReportRow>,
    pub totales: Vec<CellValue>,
    /// Lines whose category resolved to no column and were folded into
    /// the common-waste column (or dropped if that column is missing)
    pub unclassified_lines: usize,
    /// Lines referencing an area outside the canonical list
    pub unknown_area_lines: usize,
}

impl ReportMatrix {
    /// Stamp one responsable onto every emitted row, including rows with
    /// no líneas. Single-registro reports name the registro opener on the
    /// whole form; the per-line first-wins fill only applies to range
    /// reports.
    pub fn with_responsable(mut self, name: &str) -> Self {
        for fila in &mut self.filas {
            fila.responsable = Some(name.to_string());
        }
        self
    }
}

/// Sum lines into the fixed area×category grid.
///
/// Cells are converted to the requested unit and rounded to 2 decimal
/// places; column totals are sums of the rounded cells so the printed form
/// always adds up. Responsable per row is first-wins. With
/// `solo_con_datos`, rows whose every cell is zero are dropped (totals are
/// unaffected).
pub fn build_matrix(
    lines: &[ReportLine],
    areas: &[Area],
    categories: &[WasteCategory],
    unidad: WeightUnit,
    solo_con_datos: bool,
) -> ReportMatrix {
    let resolver = CategoryResolver::new(categories);

    // Resolve column titles against the live catalog; unresolved titles
    // drop their column.
    let mut columnas = Vec::new();
    let mut common_col = None;
    for (titulo, subtitulo) in REPORT_COLUMNS {
        if let Some(id) = resolver.resolve(titulo) {
            if titulo == COMMON_COLUMN_TITLE {
                common_col = Some(columnas.len());
            }
            columnas.push(ReportColumn {
                id,
                titulo: titulo.to_string(),
                subtitulo: subtitulo.to_string(),
            });
        }
    }

    // Fixed-order rows; areas missing from the catalog drop their row.
    let mut row_areas = Vec::new();
    for canonical in CANONICAL_AREAS {
        let wanted = normalize_name(canonical);
        if let Some(area) = areas.iter().find(|a| normalize_name(&a.name) == wanted) {
            row_areas.push((area.id, canonical.to_string()));
        }
    }

    let mut sums = vec![vec![Decimal::ZERO; columnas.len()]; row_areas.len()];
    let mut responsables: Vec<Option<String>> = vec![None; row_areas.len()];
    let mut unclassified_lines = 0;
    let mut unknown_area_lines = 0;

    for line in lines {
        let Some(row) = row_areas.iter().position(|(id, _)| *id == line.area_id) else {
            unknown_area_lines += 1;
            continue;
        };

        let col = match line
            .category_id
            .and_then(|id| columnas.iter().position(|c| c.id == id))
        {
            Some(col) => col,
            None => {
                unclassified_lines += 1;
                match common_col {
                    Some(col) => col,
                    None => continue,
                }
            }
        };

        sums[row][col] += line.weight_lb;
        if responsables[row].is_none() {
            responsables[row] = line.responsable.clone();
        }
    }

    let mut filas = Vec::new();
    let mut column_totals = vec![Decimal::ZERO; columnas.len()];
    for (row, (area_id, area)) in row_areas.into_iter().enumerate() {
        let valores: Vec<CellValue> = columnas
            .iter()
            .enumerate()
            .map(|(col, column)| CellValue {
                tipo_id: column.id,
                valor: round_weight(convert_weight(sums[row][col], unidad)),
            })
            .collect();

        for (col, cell) in valores.iter().enumerate() {
            column_totals[col] += cell.valor;
        }

        if solo_con_datos && valores.iter().all(|v| v.valor.is_zero()) {
            continue;
        }

        filas.push(ReportRow {
            area_id,
            area,
            valores,
            responsable: responsables[row].take(),
        });
    }

    let totales = columnas
        .iter()
        .enumerate()
        .map(|(col, column)| CellValue {
            tipo_id: column.id,
            valor: round_weight(column_totals[col]),
        })
        .collect();

    ReportMatrix {
        columnas,
        filas,
        totales,
        unclassified_lines,
        unknown_area_lines,
    }
}
