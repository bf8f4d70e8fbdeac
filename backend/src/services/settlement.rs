//! Settlement engine
//!
//! Closes the open registro: re-derives the total from the líneas,
//! persists the submitted PDF artifact, stamps the close, and returns the
//! area×category summary matrix. Closing is one-way and single-winner:
//! the conditional state flip decides concurrent closers before any
//! artifact byte is written twice.

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use shared::models::{build_matrix, Registro, ReportLine, WasteReport};
use shared::types::WeightUnit;
use shared::validation::validate_close;

use crate::error::{AppError, AppResult};
use crate::external::ArtifactStore;
use crate::middleware::AuthUser;
use crate::services::catalog::CatalogService;
use crate::services::ledger::{registro_from_row, RegistroRow, REGISTRO_COLUMNS};

/// Settlement service
#[derive(Clone)]
pub struct SettlementService {
    db: PgPool,
    store: ArtifactStore,
}

/// Result of a successful close
#[derive(Debug, Clone, Serialize)]
pub struct CloseResult {
    pub registro: Registro,
    pub resumen: WasteReport,
}

impl SettlementService {
    pub fn new(db: PgPool, store: ArtifactStore) -> Self {
        Self { db, store }
    }

    /// Close a registro. Fails with NotFound if absent, Conflict if
    /// already CERRADO, ValidationError if it has no líneas or no
    /// submitted document.
    pub async fn close(
        &self,
        user: &AuthUser,
        registro_id: Uuid,
        pdf_bytes: Vec<u8>,
        unidad: WeightUnit,
        solo_con_datos: bool,
    ) -> AppResult<CloseResult> {
        if pdf_bytes.is_empty() {
            return Err(AppError::Validation {
                field: "documento".to_string(),
                message: "A settlement document is required".to_string(),
                message_es: "Se requiere el documento de liquidación".to_string(),
            });
        }

        let mut tx = self.db.begin().await?;

        // Lock the registro for the whole close; appends and removals
        // block behind this, so the línea count and the derived total
        // cannot drift between the checks and the claim.
        let state: String =
            sqlx::query_scalar("SELECT state FROM registros WHERE id = $1 FOR UPDATE")
                .bind(registro_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| AppError::NotFound("Registro".to_string()))?;
        if state == "cerrado" {
            return Err(AppError::registro_closed());
        }

        let linea_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM lineas WHERE registro_id = $1")
                .bind(registro_id)
                .fetch_one(&mut *tx)
                .await?;
        validate_close(linea_count).map_err(|msg| AppError::Validation {
            field: "lineas".to_string(),
            message: msg.to_string(),
            message_es: "No se puede cerrar un registro vacío".to_string(),
        })?;

        // Claim the close. The total is re-derived here rather than
        // trusted from the running cache; zero rows means a concurrent
        // closer won.
        let claimed = sqlx::query_as::<_, RegistroRow>(&format!(
            r#"
            UPDATE registros
            SET state = 'cerrado',
                closed_at = NOW(),
                closed_by = $2,
                total_weight_lb = COALESCE(
                    (SELECT SUM(weight_lb) FROM lineas WHERE registro_id = $1), 0)
            WHERE id = $1 AND state = 'abierto'
            RETURNING {REGISTRO_COLUMNS}
            "#
        ))
        .bind(registro_id)
        .bind(user.user_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(claimed) = claimed else {
            return Err(AppError::registro_closed());
        };
        let claimed = registro_from_row(claimed);

        // The artifact is written only after the claim; a failed write
        // rolls the whole close back.
        let closed_at = claimed.closed_at.unwrap_or_else(chrono::Utc::now);
        let pdf_ref = self
            .store
            .store_settlement(registro_id, closed_at, &pdf_bytes)
            .await?;

        let row = sqlx::query_as::<_, RegistroRow>(&format!(
            "UPDATE registros SET pdf_ref = $2 WHERE id = $1 RETURNING {REGISTRO_COLUMNS}"
        ))
        .bind(registro_id)
        .bind(&pdf_ref)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        let registro = registro_from_row(row);
        tracing::info!(
            registro_id = %registro.id,
            total_weight_lb = %registro.total_weight_lb,
            pdf_ref = %pdf_ref,
            "registro closed"
        );

        let resumen = self.summary(&registro, unidad, solo_con_datos).await?;
        Ok(CloseResult { registro, resumen })
    }

    /// Fetch the stored settlement document for a closed registro
    pub async fn fetch_document(&self, registro_id: Uuid) -> AppResult<Vec<u8>> {
        let pdf_ref: Option<String> =
            sqlx::query_scalar("SELECT pdf_ref FROM registros WHERE id = $1")
                .bind(registro_id)
                .fetch_optional(&self.db)
                .await?
                .ok_or_else(|| AppError::NotFound("Registro".to_string()))?;

        let pdf_ref = pdf_ref.ok_or_else(|| AppError::NotFound("Artifact".to_string()))?;
        self.store.fetch(&pdf_ref).await
    }

    /// Build the settlement summary matrix for an already-fetched registro
    async fn summary(
        &self,
        registro: &Registro,
        unidad: WeightUnit,
        solo_con_datos: bool,
    ) -> AppResult<WasteReport> {
        let catalogs = CatalogService::new(self.db.clone());
        let areas = catalogs.list_areas().await?;
        let categories = catalogs.list_categories().await?;

        let rows = sqlx::query_as::<_, (i32, Option<i32>, Decimal)>(
            "SELECT area_id, category_id, weight_lb FROM lineas WHERE registro_id = $1 \
             ORDER BY created_at",
        )
        .bind(registro.id)
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
        let matrix = build_matrix(&lines, &areas, &categories, unidad, solo_con_datos)
            .with_responsable(&registro.opened_by_name);
        if matrix.unclassified_lines > 0 {
            tracing::warn!(
                registro_id = %registro.id,
                count = matrix.unclassified_lines,
                "líneas with unresolved category folded into común"
            );
        }
        if matrix.unknown_area_lines > 0 {
            tracing::warn!(
                registro_id = %registro.id,
                count = matrix.unknown_area_lines,
                "líneas referencing areas outside the canonical list were omitted"
            );
        }

        Ok(WasteReport {
            registro_id: Some(registro.id),
            fecha: None,
            estado: Some(registro.state.as_str().to_string()),
            unidad,
            columnas: matrix.columnas,
            filas: matrix.filas,
            totales: matrix.totales,
        })
    }
}
