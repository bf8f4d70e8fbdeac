//! Report generator
//!
//! Independent read path reproducing the settlement matrix for a closed
//! registro or a calendar day/range. Shares the pure matrix builder with
//! the settlement engine so the two can never disagree on a cell.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use shared::models::{build_matrix, ReportLine, ReportMatrix, WasteReport};
use shared::types::{DateRange, WeightUnit};

use crate::error::{AppError, AppResult};
use crate::services::catalog::CatalogService;

/// Reporting service
#[derive(Clone)]
pub struct ReportService {
    db: PgPool,
}

impl ReportService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Matrix for one registro; the registro opener is the responsable of
    /// every row.
    pub async fn by_registro(
        &self,
        registro_id: Uuid,
        unidad: WeightUnit,
        solo_con_datos: bool,
    ) -> AppResult<WasteReport> {
        let registro = sqlx::query_as::<_, (String, String)>(
            "SELECT state, opened_by_name FROM registros WHERE id = $1",
        )
        .bind(registro_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Registro".to_string()))?;

        let rows = sqlx::query_as::<_, (i32, Option<i32>, Decimal)>(
            "SELECT area_id, category_id, weight_lb FROM lineas WHERE registro_id = $1 \
             ORDER BY created_at",
        )
        .bind(registro_id)
        .fetch_all(&self.db)
        .await?;

        let lines: Vec<ReportLine> = rows
            .into_iter()
            .map(|(area_id, category_id, weight_lb)| ReportLine {
                area_id,
                category_id,
                weight_lb,
                responsable: None,
            })
            .collect();

        // The opener signs the whole form, empty rows included.
        let matrix = self
            .build(&lines, unidad, solo_con_datos)
            .await?
            .with_responsable(&registro.1);
        Ok(WasteReport {
            registro_id: Some(registro_id),
            fecha: None,
            estado: Some(registro.0),
            unidad,
            columnas: matrix.columnas,
            filas: matrix.filas,
            totales: matrix.totales,
        })
    }

    /// Matrix over all CERRADO registros opened inside the date range.
    /// Responsable per area is first-wins across the matching líneas.
    pub async fn by_range(
        &self,
        range: DateRange,
        unidad: WeightUnit,
        solo_con_datos: bool,
    ) -> AppResult<WasteReport> {
        if range.end < range.start {
            return Err(AppError::ValidationError(
                "Date range end precedes start".to_string(),
            ));
        }

        let rows = sqlx::query_as::<_, (i32, Option<i32>, Decimal, String)>(
            r#"
            SELECT l.area_id, l.category_id, l.weight_lb, r.opened_by_name
            FROM lineas l
            JOIN registros r ON r.id = l.registro_id
            WHERE r.state = 'cerrado'
              AND r.opened_at::date BETWEEN $1 AND $2
            ORDER BY l.created_at
            "#,
        )
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.db)
        .await?;

        let lines: Vec<ReportLine> = rows
            .into_iter()
            .map(|(area_id, category_id, weight_lb, responsable)| ReportLine {
                area_id,
                category_id,
                weight_lb,
                responsable: Some(responsable),
            })
            .collect();

        let matrix = self.build(&lines, unidad, solo_con_datos).await?;
        Ok(WasteReport {
            registro_id: None,
            fecha: Some(range.start),
            estado: None,
            unidad,
            columnas: matrix.columnas,
            filas: matrix.filas,
            totales: matrix.totales,
        })
    }

    /// Matrix for a single calendar day
    pub async fn by_day(
        &self,
        day: NaiveDate,
        unidad: WeightUnit,
        solo_con_datos: bool,
    ) -> AppResult<WasteReport> {
        self.by_range(
            DateRange {
                start: day,
                end: day,
            },
            unidad,
            solo_con_datos,
        )
        .await
    }

    async fn build(
        &self,
        lines: &[ReportLine],
        unidad: WeightUnit,
        solo_con_datos: bool,
    ) -> AppResult<ReportMatrix> {
        let catalogs = CatalogService::new(self.db.clone());
        let areas = catalogs.list_areas().await?;
        let categories = catalogs.list_categories().await?;

        let matrix = build_matrix(lines, &areas, &categories, unidad, solo_con_datos);
        if matrix.unclassified_lines > 0 {
            tracing::warn!(
                count = matrix.unclassified_lines,
                "líneas with unresolved category folded into común"
            );
        }
        if matrix.unknown_area_lines > 0 {
            tracing::warn!(
                count = matrix.unknown_area_lines,
                "líneas referencing areas outside the canonical list were omitted"
            );
        }
        Ok(matrix)
    }

    /// Export a report matrix as CSV for spreadsheet use
    pub fn export_to_csv(report: &WasteReport) -> AppResult<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);

        let mut header = vec!["Área".to_string()];
        header.extend(report.columnas.iter().map(|c| c.titulo.clone()));
        header.push("Responsable".to_string());
        wtr.write_record(&header)
            .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;

        for fila in &report.filas {
            let mut record = vec![fila.area.clone()];
            record.extend(fila.valores.iter().map(|v| v.valor.to_string()));
            record.push(fila.responsable.clone().unwrap_or_default());
            wtr.write_record(&record)
                .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
        }

        let mut totals = vec!["TOTAL".to_string()];
        totals.extend(report.totales.iter().map(|t| t.valor.to_string()));
        totals.push(String::new());
        wtr.write_record(&totals)
            .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;

        let csv_data = String::from_utf8(
            wtr.into_inner()
                .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?,
        )
        .map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))?;
        Ok(csv_data)
    }
}
