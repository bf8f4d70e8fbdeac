//! Settlement artifact storage collaborator
//!
//! The core never renders PDFs; it receives the submitted bytes at close
//! time and asks this collaborator to persist them and hand back a
//! reference. The filesystem layout is deterministic so operations staff
//! can find a settlement document from its registro alone.

use chrono::{DateTime, Datelike, Utc};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Filesystem-backed artifact store
#[derive(Clone)]
pub struct ArtifactStore {
    root: String,
}

impl ArtifactStore {
    pub fn new(root: impl Into<String>) -> Self {
        Self { root: root.into() }
    }

    /// Relative reference for a settlement artifact:
    /// `{year}/{month:02}/registro-{id}-{unix_ts}.pdf`
    pub fn settlement_ref(registro_id: Uuid, at: DateTime<Utc>) -> String {
        format!(
            "{}/{:02}/registro-{}-{}.pdf",
            at.year(),
            at.month(),
            registro_id,
            at.timestamp()
        )
    }

    /// Persist the submitted bytes and return the stored reference
    pub async fn store_settlement(
        &self,
        registro_id: Uuid,
        at: DateTime<Utc>,
        bytes: &[u8],
    ) -> AppResult<String> {
        let reference = Self::settlement_ref(registro_id, at);
        let path = std::path::Path::new(&self.root).join(&reference);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::StorageError(e.to_string()))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| AppError::StorageError(e.to_string()))?;

        tracing::debug!(reference = %reference, size = bytes.len(), "stored settlement artifact");
        Ok(reference)
    }

    /// Fetch previously stored bytes by reference
    pub async fn fetch(&self, reference: &str) -> AppResult<Vec<u8>> {
        let path = std::path::Path::new(&self.root).join(reference);
        tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => AppError::NotFound("Artifact".to_string()),
            _ => AppError::StorageError(e.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn settlement_ref_is_deterministic() {
        let id = Uuid::nil();
        let at = Utc.with_ymd_and_hms(2026, 3, 7, 10, 30, 0).unwrap();
        let reference = ArtifactStore::settlement_ref(id, at);
        assert_eq!(
            reference,
            format!("2026/03/registro-{}-{}.pdf", id, at.timestamp())
        );
    }

    #[tokio::test]
    async fn store_and_fetch_round_trip() {
        let dir = std::env::temp_dir().join(format!("hwt-store-{}", Uuid::new_v4()));
        let store = ArtifactStore::new(dir.to_string_lossy().to_string());
        let id = Uuid::new_v4();
        let at = Utc::now();

        let reference = store.store_settlement(id, at, b"%PDF-1.4 test").await.unwrap();
        let bytes = store.fetch(&reference).await.unwrap();
        assert_eq!(bytes, b"%PDF-1.4 test");

        tokio::fs::remove_dir_all(&dir).await.ok();
    }

    #[tokio::test]
    async fn fetch_missing_reference_is_not_found() {
        let store = ArtifactStore::new(std::env::temp_dir().to_string_lossy().to_string());
        let err = store.fetch("2026/01/registro-missing.pdf").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
