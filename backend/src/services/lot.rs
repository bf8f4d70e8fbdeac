//! Label lot issuance service
//!
//! Issues batches of single-use QR labels for one area/bag combination.
//! The lot and all of its labels are created atomically; code uniqueness
//! is global and enforced by the store, with a bounded retry on the
//! astronomically rare collision.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use shared::models::{
    generate_label_codes, sheet_grid, LabelLot, LabelQrPayload, LabelState, SheetGrid,
};
use shared::validation::{validate_lot_deletion, validate_lot_quantity};

use crate::error::{AppError, AppResult};
use crate::services::catalog::CatalogService;

/// How many whole-transaction attempts a code collision gets before the
/// request fails with a conflict.
const CODE_COLLISION_ATTEMPTS: u32 = 3;

/// Lot service for issuing and managing label lots
#[derive(Clone)]
pub struct LotService {
    db: PgPool,
}

/// Input for issuing a lot
#[derive(Debug, Deserialize, Validate)]
pub struct IssueLotInput {
    pub area_id: i32,
    pub bag_id: i32,
    /// Optional cross-check; must equal the bag's assigned category
    pub category_id: Option<i32>,
    #[validate(range(min = 1, max = 100))]
    pub per_sheet_count: i32,
    /// Defaults to `per_sheet_count`
    pub quantity: Option<i32>,
}

/// One issued label with its printable QR payload
#[derive(Debug, Clone, Serialize)]
pub struct IssuedLabel {
    pub id: Uuid,
    pub code: String,
    pub state: LabelState,
    pub used_at: Option<DateTime<Utc>>,
    pub qr_payload: String,
}

/// A lot together with its labels and print geometry
#[derive(Debug, Clone, Serialize)]
pub struct LotWithLabels {
    #[serde(flatten)]
    pub lot: LabelLot,
    pub sheet_grid: SheetGrid,
    pub labels: Vec<IssuedLabel>,
}

/// Lot list entry with consumption counters
#[derive(Debug, Clone, Serialize)]
pub struct LotSummary {
    #[serde(flatten)]
    pub lot: LabelLot,
    pub label_count: i64,
    pub used_count: i64,
}

impl LotService {
    /// Create a new LotService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Issue a lot of labels. Either the lot and every label exist as
    /// ACTIVE afterwards, or nothing does.
    pub async fn issue_lot(&self, user_id: Uuid, input: IssueLotInput) -> AppResult<LotWithLabels> {
        input
            .validate()
            .map_err(|e| AppError::ValidationError(e.to_string()))?;

        let quantity = input.quantity.unwrap_or(input.per_sheet_count);
        validate_lot_quantity(quantity, input.per_sheet_count).map_err(|msg| {
            AppError::Validation {
                field: "quantity".to_string(),
                message: msg.to_string(),
                message_es: "Cantidad de etiquetas inválida".to_string(),
            }
        })?;

        // Area and bag must exist and be active
        let catalogs = CatalogService::new(self.db.clone());
        let area = catalogs.get_area(input.area_id).await?;
        if !area.active {
            return Err(AppError::ValidationError("Area is inactive".to_string()));
        }

        let bag = catalogs.get_bag(input.bag_id).await?;
        if !bag.active {
            return Err(AppError::ValidationError("Bag is inactive".to_string()));
        }
        let bag_category = bag.category_id.ok_or_else(|| {
            AppError::ValidationError("Bag has no assigned waste category".to_string())
        })?;

        // An explicit category must match the bag's; never coerce silently.
        if let Some(category_id) = input.category_id {
            if category_id != bag_category {
                return Err(AppError::Validation {
                    field: "category_id".to_string(),
                    message: format!(
                        "Category {} does not match the bag's category {}",
                        category_id, bag_category
                    ),
                    message_es: "La categoría no corresponde a la funda seleccionada".to_string(),
                });
            }
        }

        // Insert lot + labels atomically; a stored-code collision aborts
        // the transaction and retries with freshly drawn codes.
        let mut attempt = 0;
        loop {
            attempt += 1;
            let codes = generate_label_codes(quantity as usize);
            match self
                .insert_lot_tx(user_id, &input, quantity, &codes)
                .await
            {
                Ok(result) => return Ok(result),
                Err(err) if is_unique_violation(&err) && attempt < CODE_COLLISION_ATTEMPTS => {
                    tracing::warn!(attempt, "label code collision, regenerating lot codes");
                    continue;
                }
                Err(err) if is_unique_violation(&err) => {
                    return Err(AppError::DuplicateEntry("label code".to_string()));
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    async fn insert_lot_tx(
        &self,
        user_id: Uuid,
        input: &IssueLotInput,
        quantity: i32,
        codes: &[String],
    ) -> Result<LotWithLabels, sqlx::Error> {
        let mut tx = self.db.begin().await?;

        let lot_row = sqlx::query_as::<_, (Uuid, DateTime<Utc>)>(
            r#"
            INSERT INTO label_lots (area_id, bag_id, requested_quantity, per_sheet_count, created_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, created_at
            "#,
        )
        .bind(input.area_id)
        .bind(input.bag_id)
        .bind(quantity)
        .bind(input.per_sheet_count)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        let mut labels = Vec::with_capacity(codes.len());
        for code in codes {
            let label_id = sqlx::query_scalar::<_, Uuid>(
                r#"
                INSERT INTO labels (code, lot_id, area_id, bag_id, state)
                VALUES ($1, $2, $3, $4, 'active')
                RETURNING id
                "#,
            )
            .bind(code)
            .bind(lot_row.0)
            .bind(input.area_id)
            .bind(input.bag_id)
            .fetch_one(&mut *tx)
            .await?;

            labels.push(IssuedLabel {
                id: label_id,
                code: code.clone(),
                state: LabelState::Active,
                used_at: None,
                qr_payload: LabelQrPayload::new(code.clone(), input.area_id, input.bag_id)
                    .encode(),
            });
        }

        tx.commit().await?;

        Ok(LotWithLabels {
            lot: LabelLot {
                id: lot_row.0,
                area_id: input.area_id,
                bag_id: input.bag_id,
                requested_quantity: quantity,
                per_sheet_count: input.per_sheet_count,
                created_by: user_id,
                created_at: lot_row.1,
            },
            sheet_grid: sheet_grid(input.per_sheet_count as u32),
            labels,
        })
    }

    /// List all lots, newest first
    pub async fn list_lots(&self) -> AppResult<Vec<LotSummary>> {
        let rows = sqlx::query_as::<_, (Uuid, i32, i32, i32, i32, Uuid, DateTime<Utc>, i64, i64)>(
            r#"
            SELECT l.id, l.area_id, l.bag_id, l.requested_quantity, l.per_sheet_count,
                   l.created_by, l.created_at,
                   COUNT(e.id) AS label_count,
                   COUNT(e.id) FILTER (WHERE e.state = 'used') AS used_count
            FROM label_lots l
            LEFT JOIN labels e ON e.lot_id = l.id
            GROUP BY l.id
            ORDER BY l.created_at DESC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| LotSummary {
                lot: LabelLot {
                    id: r.0,
                    area_id: r.1,
                    bag_id: r.2,
                    requested_quantity: r.3,
                    per_sheet_count: r.4,
                    created_by: r.5,
                    created_at: r.6,
                },
                label_count: r.7,
                used_count: r.8,
            })
            .collect())
    }

    /// Get a lot with its labels in issuance order
    pub async fn get_lot(&self, lot_id: Uuid) -> AppResult<LotWithLabels> {
        let lot_row = sqlx::query_as::<_, (Uuid, i32, i32, i32, i32, Uuid, DateTime<Utc>)>(
            r#"
            SELECT id, area_id, bag_id, requested_quantity, per_sheet_count, created_by, created_at
            FROM label_lots
            WHERE id = $1
            "#,
        )
        .bind(lot_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Lot".to_string()))?;

        let labels = sqlx::query_as::<_, (Uuid, String, String, Option<DateTime<Utc>>)>(
            r#"
            SELECT id, code, state, used_at
            FROM labels
            WHERE lot_id = $1
            ORDER BY created_at, code
            "#,
        )
        .bind(lot_id)
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(|(id, code, state, used_at)| IssuedLabel {
            qr_payload: LabelQrPayload::new(code.clone(), lot_row.1, lot_row.2).encode(),
            id,
            state: LabelState::from_str(&state).unwrap_or(LabelState::Void),
            code,
            used_at,
        })
        .collect();

        Ok(LotWithLabels {
            lot: LabelLot {
                id: lot_row.0,
                area_id: lot_row.1,
                bag_id: lot_row.2,
                requested_quantity: lot_row.3,
                per_sheet_count: lot_row.4,
                created_by: lot_row.5,
                created_at: lot_row.6,
            },
            sheet_grid: sheet_grid(lot_row.4 as u32),
            labels,
        })
    }

    /// Delete a lot. Blocked while any owned label is USED, so a settled
    /// or in-flight weighing never loses its audit trail. The labels are
    /// locked together with the check; a scan racing the deletion either
    /// consumes first and blocks it, or finds the label already gone.
    pub async fn delete_lot(&self, lot_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM label_lots WHERE id = $1)")
                .bind(lot_id)
                .fetch_one(&mut *tx)
                .await?;
        if !exists {
            return Err(AppError::NotFound("Lot".to_string()));
        }

        let used_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM \
             (SELECT state FROM labels WHERE lot_id = $1 FOR UPDATE) l \
             WHERE l.state = 'used'",
        )
        .bind(lot_id)
        .fetch_one(&mut *tx)
        .await?;
        validate_lot_deletion(used_count).map_err(|msg| AppError::Validation {
            field: "lot_id".to_string(),
            message: msg.to_string(),
            message_es: "El lote tiene etiquetas usadas y no puede eliminarse".to_string(),
        })?;

        // Labels cascade with the lot
        sqlx::query("DELETE FROM label_lots WHERE id = $1")
            .bind(lot_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Look up a label by its scanned code
    pub async fn get_label_by_code(&self, code: &str) -> AppResult<LabelStatus> {
        let row = sqlx::query_as::<_, (Uuid, String, Uuid, i32, i32, String, Option<DateTime<Utc>>, Option<Uuid>)>(
            r#"
            SELECT id, code, lot_id, area_id, bag_id, state, used_at, used_by
            FROM labels
            WHERE code = $1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Label".to_string()))?;

        Ok(LabelStatus {
            id: row.0,
            code: row.1,
            lot_id: row.2,
            area_id: row.3,
            bag_id: row.4,
            state: LabelState::from_str(&row.5).unwrap_or(LabelState::Void),
            used_at: row.6,
            used_by: row.7,
        })
    }
}

/// Label lookup response
#[derive(Debug, Clone, Serialize)]
pub struct LabelStatus {
    pub id: Uuid,
    pub code: String,
    pub lot_id: Uuid,
    pub area_id: i32,
    pub bag_id: i32,
    pub state: LabelState,
    pub used_at: Option<DateTime<Utc>>,
    pub used_by: Option<Uuid>,
}

/// True when the database rejected an insert on a unique constraint
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505")
    )
}
