//! Read-only access to the externally-owned catalogs
//!
//! Areas, bags and waste categories are administered elsewhere; this
//! service only reads them, for validation during lot issuance and for the
//! canonical orderings used by the report matrix.

use sqlx::PgPool;

use shared::models::{Area, Bag, WasteCategory};

use crate::error::{AppError, AppResult};

/// Catalog read service
#[derive(Clone)]
pub struct CatalogService {
    db: PgPool,
}

impl CatalogService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// All areas in catalog order
    pub async fn list_areas(&self) -> AppResult<Vec<Area>> {
        let rows = sqlx::query_as::<_, (i32, String, bool)>(
            "SELECT id, name, active FROM areas ORDER BY id",
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, name, active)| Area { id, name, active })
            .collect())
    }

    /// All bags in catalog order
    pub async fn list_bags(&self) -> AppResult<Vec<Bag>> {
        let rows = sqlx::query_as::<_, (i32, String, Option<i32>, bool)>(
            "SELECT id, name, category_id, active FROM bags ORDER BY id",
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, name, category_id, active)| Bag {
                id,
                name,
                category_id,
                active,
            })
            .collect())
    }

    /// All waste categories in catalog order. Catalog order matters: it is
    /// the tie-break of the category resolver.
    pub async fn list_categories(&self) -> AppResult<Vec<WasteCategory>> {
        let rows = sqlx::query_as::<_, (i32, String, bool)>(
            "SELECT id, name, active FROM waste_categories ORDER BY id",
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, name, active)| WasteCategory { id, name, active })
            .collect())
    }

    /// Fetch one area, failing on absence
    pub async fn get_area(&self, area_id: i32) -> AppResult<Area> {
        let row = sqlx::query_as::<_, (i32, String, bool)>(
            "SELECT id, name, active FROM areas WHERE id = $1",
        )
        .bind(area_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Area".to_string()))?;

        Ok(Area {
            id: row.0,
            name: row.1,
            active: row.2,
        })
    }

    /// Fetch one bag, failing on absence
    pub async fn get_bag(&self, bag_id: i32) -> AppResult<Bag> {
        let row = sqlx::query_as::<_, (i32, String, Option<i32>, bool)>(
            "SELECT id, name, category_id, active FROM bags WHERE id = $1",
        )
        .bind(bag_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Bag".to_string()))?;

        Ok(Bag {
            id: row.0,
            name: row.1,
            category_id: row.2,
            active: row.3,
        })
    }
}
