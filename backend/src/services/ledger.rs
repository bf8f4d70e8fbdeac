//! Open ledger (registro) service
//!
//! Single source of truth for "the current open registro" and its running
//! total. The open registro is a durable row guarded by a partial unique
//! index, never an in-process singleton: any instance may serve a scan and
//! crash-restart loses nothing.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use shared::models::{LabelState, Linea, Registro, RegistroState, ScanPayload};
use shared::validation::validate_weight_lb;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;

/// Ledger service managing the open registro and its líneas
#[derive(Clone)]
pub struct LedgerService {
    db: PgPool,
}

/// Passes over the lock-or-create loop before the scan is answered with a
/// conflict. Two racing creators settle on the second pass.
const OPEN_REGISTRO_ATTEMPTS: u32 = 3;

/// Input for appending a weighed scan to the ledger
#[derive(Debug, Deserialize)]
pub struct AppendLineInput {
    /// Raw scanner output: either the printed JSON payload or a bare code
    pub payload: String,
    /// Weight from the scale, canonical pounds
    pub weight_lb: Decimal,
}

/// A línea together with the registro it landed in
#[derive(Debug, Clone, Serialize)]
pub struct AppendLineResult {
    pub linea: Linea,
    pub registro: Registro,
}

/// Registro with its líneas
#[derive(Debug, Clone, Serialize)]
pub struct RegistroDetail {
    #[serde(flatten)]
    pub registro: Registro,
    pub lineas: Vec<Linea>,
}

pub(crate) type RegistroRow = (
    Uuid,
    String,
    Decimal,
    Option<String>,
    Uuid,
    String,
    DateTime<Utc>,
    Option<Uuid>,
    Option<DateTime<Utc>>,
);

pub(crate) const REGISTRO_COLUMNS: &str =
    "id, state, total_weight_lb, pdf_ref, opened_by, opened_by_name, \
     opened_at, closed_by, closed_at";

pub(crate) fn registro_from_row(row: RegistroRow) -> Registro {
    Registro {
        id: row.0,
        state: RegistroState::from_str(&row.1).unwrap_or(RegistroState::Cerrado),
        total_weight_lb: row.2,
        pdf_ref: row.3,
        opened_by: row.4,
        opened_by_name: row.5,
        opened_at: row.6,
        closed_by: row.7,
        closed_at: row.8,
    }
}

impl LedgerService {
    /// Create a new LedgerService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Append a weighed scan: consume the label exactly once, create the
    /// línea inside the open registro (creating the registro lazily), and
    /// recompute the running total. One transaction end to end, so a
    /// cancelled request leaves no partial state behind.
    pub async fn append_line(
        &self,
        user: &AuthUser,
        input: AppendLineInput,
    ) -> AppResult<AppendLineResult> {
        validate_weight_lb(input.weight_lb).map_err(|msg| AppError::Validation {
            field: "weight_lb".to_string(),
            message: msg.to_string(),
            message_es: "Peso inválido".to_string(),
        })?;

        let (code, hints) = match ScanPayload::parse(&input.payload) {
            ScanPayload::Parsed {
                code,
                area_id,
                bag_id,
            } => (code, Some((area_id, bag_id))),
            // Plain-text scanners emit the bare code with no hints
            ScanPayload::Unparsable { raw } => (raw.trim().to_string(), None),
        };
        if code.is_empty() {
            return Err(AppError::ValidationError("Empty scan payload".to_string()));
        }

        let mut tx = self.db.begin().await?;

        let label = sqlx::query_as::<_, (Uuid, i32, i32, String)>(
            "SELECT id, area_id, bag_id, state FROM labels WHERE code = $1",
        )
        .bind(&code)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Label".to_string()))?;

        // A hint mismatch means the scanner read some other label's
        // embedded fields; reject rather than trust either side.
        if let Some((area_hint, bag_hint)) = hints {
            if area_hint != label.1 || bag_hint != label.2 {
                return Err(AppError::Validation {
                    field: "payload".to_string(),
                    message: "Scanned area/bag hints do not match the stored label".to_string(),
                    message_es: "La etiqueta escaneada no coincide con el área o funda registrada"
                        .to_string(),
                });
            }
        }

        // Conditional consumption: exactly one concurrent scan of the same
        // code can flip ACTIVE to USED.
        let consumed = sqlx::query(
            r#"
            UPDATE labels
            SET state = 'used', used_at = NOW(), used_by = $2
            WHERE code = $1 AND state = 'active'
            "#,
        )
        .bind(&code)
        .bind(user.user_id)
        .execute(&mut *tx)
        .await?;

        if consumed.rows_affected() == 0 {
            let message = match LabelState::from_str(&label.3) {
                Some(state) => state.consume().err().unwrap_or("label already used"),
                None => "label already used",
            };
            let message_es = if message == "label voided" {
                "La etiqueta fue anulada"
            } else {
                "La etiqueta ya fue utilizada"
            };
            return Err(AppError::label_conflict(message, message_es));
        }

        let registro_id = Self::get_or_create_open(&mut tx, user).await?;

        // Category is denormalized from the bag at consumption time
        let category_id: Option<i32> =
            sqlx::query_scalar("SELECT category_id FROM bags WHERE id = $1")
                .bind(label.2)
                .fetch_optional(&mut *tx)
                .await?
                .flatten();

        let linea_row = sqlx::query_as::<_, (Uuid, DateTime<Utc>)>(
            r#"
            INSERT INTO lineas (registro_id, label_id, area_id, bag_id, category_id, weight_lb)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, created_at
            "#,
        )
        .bind(registro_id)
        .bind(label.0)
        .bind(label.1)
        .bind(label.2)
        .bind(category_id)
        .bind(input.weight_lb)
        .fetch_one(&mut *tx)
        .await?;

        let registro = Self::recompute_total(&mut tx, registro_id).await?;

        tx.commit().await?;

        tracing::info!(
            registro_id = %registro.id,
            code = %code,
            weight_lb = %input.weight_lb,
            "línea appended"
        );

        Ok(AppendLineResult {
            linea: Linea {
                id: linea_row.0,
                registro_id,
                label_id: label.0,
                area_id: label.1,
                bag_id: label.2,
                category_id,
                weight_lb: input.weight_lb,
                created_at: linea_row.1,
            },
            registro,
        })
    }

    /// Delete a línea, reverting its label to ACTIVE and recomputing the
    /// registro total. One transaction. Líneas of a settled registro are
    /// immutable: the registro row is locked before the state check, so a
    /// concurrent close either finishes first (and the check fails) or
    /// waits for this removal to commit.
    pub async fn remove_line(&self, linea_id: Uuid) -> AppResult<Registro> {
        let mut tx = self.db.begin().await?;

        let linea = sqlx::query_as::<_, (Uuid, Uuid, String)>(
            r#"
            SELECT l.registro_id, l.label_id, r.state
            FROM lineas l
            JOIN registros r ON r.id = l.registro_id
            WHERE l.id = $1
            FOR UPDATE OF r
            "#,
        )
        .bind(linea_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Línea".to_string()))?;

        if linea.2 == RegistroState::Cerrado.as_str() {
            return Err(AppError::registro_closed());
        }

        sqlx::query(
            r#"
            UPDATE labels
            SET state = 'active', used_at = NULL, used_by = NULL
            WHERE id = $1 AND state = 'used'
            "#,
        )
        .bind(linea.1)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM lineas WHERE id = $1")
            .bind(linea_id)
            .execute(&mut *tx)
            .await?;

        let registro = Self::recompute_total(&mut tx, linea.0).await?;

        tx.commit().await?;

        tracing::info!(registro_id = %registro.id, linea_id = %linea_id, "línea removed");
        Ok(registro)
    }

    /// Lock-or-create the single open registro inside the caller's
    /// transaction. The returned row is held FOR UPDATE until commit, so a
    /// concurrent close blocks behind this transaction and no línea can
    /// land in a registro that has become CERRADO; holding the lock also
    /// serializes the total recomputation of concurrent appends. The
    /// partial unique index makes the create race safe: the losing insert
    /// hits the constraint, does nothing, and the next pass locks the
    /// winner's row.
    async fn get_or_create_open(
        tx: &mut Transaction<'_, Postgres>,
        user: &AuthUser,
    ) -> AppResult<Uuid> {
        for _ in 0..OPEN_REGISTRO_ATTEMPTS {
            // A close committing while we wait on the lock drops the row
            // out of the predicate; the loop then opens a fresh registro.
            let existing: Option<Uuid> = sqlx::query_scalar(
                "SELECT id FROM registros WHERE state = 'abierto' \
                 ORDER BY opened_at DESC LIMIT 1 FOR UPDATE",
            )
            .fetch_optional(&mut **tx)
            .await?;
            if let Some(id) = existing {
                return Ok(id);
            }

            let inserted: Option<Uuid> = sqlx::query_scalar(
                r#"
                INSERT INTO registros (state, opened_by, opened_by_name)
                VALUES ('abierto', $1, $2)
                ON CONFLICT (state) WHERE state = 'abierto' DO NOTHING
                RETURNING id
                "#,
            )
            .bind(user.user_id)
            .bind(&user.name)
            .fetch_optional(&mut **tx)
            .await?;
            if let Some(id) = inserted {
                tracing::info!(registro_id = %id, "opened new registro");
                return Ok(id);
            }

            // Lost the create race; the winner's row is visible (and
            // lockable) on the next pass.
        }

        Err(AppError::Conflict {
            resource: "registro".to_string(),
            message: "Could not obtain the open registro, retry the scan".to_string(),
            message_es: "No se pudo obtener el registro abierto, repita el escaneo".to_string(),
        })
    }

    /// Re-derive the registro total from its líneas. Callers hold the
    /// registro row FOR UPDATE, so the SUM runs after any concurrent
    /// writer has committed and sees every línea.
    async fn recompute_total(
        tx: &mut Transaction<'_, Postgres>,
        registro_id: Uuid,
    ) -> AppResult<Registro> {
        let row = sqlx::query_as::<_, RegistroRow>(&format!(
            r#"
            UPDATE registros
            SET total_weight_lb = COALESCE(
                (SELECT SUM(weight_lb) FROM lineas WHERE registro_id = $1), 0)
            WHERE id = $1
            RETURNING {REGISTRO_COLUMNS}
            "#
        ))
        .bind(registro_id)
        .fetch_one(&mut **tx)
        .await?;

        Ok(registro_from_row(row))
    }

    /// The currently open registro with its líneas, if any
    pub async fn current_open(&self) -> AppResult<RegistroDetail> {
        let row = sqlx::query_as::<_, RegistroRow>(&format!(
            "SELECT {REGISTRO_COLUMNS} FROM registros WHERE state = 'abierto' \
             ORDER BY opened_at DESC LIMIT 1"
        ))
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Open registro".to_string()))?;

        let registro = registro_from_row(row);
        let lineas = self.fetch_lineas(registro.id).await?;
        Ok(RegistroDetail { registro, lineas })
    }

    /// A registro by id with its líneas
    pub async fn get_registro(&self, registro_id: Uuid) -> AppResult<RegistroDetail> {
        let row = sqlx::query_as::<_, RegistroRow>(&format!(
            "SELECT {REGISTRO_COLUMNS} FROM registros WHERE id = $1"
        ))
        .bind(registro_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Registro".to_string()))?;

        let registro = registro_from_row(row);
        let lineas = self.fetch_lineas(registro.id).await?;
        Ok(RegistroDetail { registro, lineas })
    }

    /// All registros, newest first
    pub async fn list_registros(&self) -> AppResult<Vec<Registro>> {
        let rows = sqlx::query_as::<_, RegistroRow>(&format!(
            "SELECT {REGISTRO_COLUMNS} FROM registros ORDER BY opened_at DESC"
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(registro_from_row).collect())
    }

    async fn fetch_lineas(&self, registro_id: Uuid) -> AppResult<Vec<Linea>> {
        let rows = sqlx::query_as::<_, (Uuid, Uuid, Uuid, i32, i32, Option<i32>, Decimal, DateTime<Utc>)>(
            r#"
            SELECT id, registro_id, label_id, area_id, bag_id, category_id, weight_lb, created_at
            FROM lineas
            WHERE registro_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(registro_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| Linea {
                id: r.0,
                registro_id: r.1,
                label_id: r.2,
                area_id: r.3,
                bag_id: r.4,
                category_id: r.5,
                weight_lb: r.6,
                created_at: r.7,
            })
            .collect())
    }
}
