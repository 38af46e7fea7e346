//! Draft repository implementation

use std::sync::Arc;

use tokio::sync::Mutex;

use super::keys::DRAFT_REPORTS;
use super::record_store::{load_json, save_json, RecordStore};
use crate::models::{Draft, DraftId, ReportFields};
use crate::{Error, Result};

/// Device-wide draft storage under `DraftReports`
#[derive(Clone)]
pub struct DraftRepository {
    store: Arc<dyn RecordStore>,
    write_lock: Arc<Mutex<()>>,
}

impl DraftRepository {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// List drafts, most recently created first
    pub async fn list_drafts(&self) -> Result<Vec<Draft>> {
        let mut drafts = self.load().await?;
        drafts.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(drafts)
    }

    pub async fn get_draft(&self, id: &DraftId) -> Result<Option<Draft>> {
        Ok(self.load().await?.into_iter().find(|draft| &draft.id == id))
    }

    /// Save a new draft. Empty drafts are rejected without touching storage.
    pub async fn save_draft(&self, fields: ReportFields) -> Result<Draft> {
        if fields.is_empty_draft() {
            return Err(Error::EmptyDraft);
        }
        let draft = Draft::new(fields);

        let _guard = self.write_lock.lock().await;
        let mut drafts = self.load().await?;
        drafts.push(draft.clone());
        self.save(&drafts).await?;

        tracing::debug!("Saved draft {}", draft.id);
        Ok(draft)
    }

    /// Replace the content of an existing draft
    pub async fn update_draft(&self, id: &DraftId, fields: ReportFields) -> Result<Draft> {
        if fields.is_empty_draft() {
            return Err(Error::EmptyDraft);
        }

        let _guard = self.write_lock.lock().await;
        let mut drafts = self.load().await?;
        let draft = drafts
            .iter_mut()
            .find(|draft| &draft.id == id)
            .ok_or_else(|| Error::NotFound(format!("draft {id}")))?;
        draft.replace_fields(fields);
        let updated = draft.clone();
        self.save(&drafts).await?;

        Ok(updated)
    }

    /// Remove a draft, returning it
    pub async fn delete_draft(&self, id: &DraftId) -> Result<Draft> {
        let _guard = self.write_lock.lock().await;
        let mut drafts = self.load().await?;
        let position = drafts
            .iter()
            .position(|draft| &draft.id == id)
            .ok_or_else(|| Error::NotFound(format!("draft {id}")))?;
        let removed = drafts.remove(position);
        self.save(&drafts).await?;

        tracing::debug!("Deleted draft {}", id);
        Ok(removed)
    }

    async fn load(&self) -> Result<Vec<Draft>> {
        Ok(load_json(self.store.as_ref(), DRAFT_REPORTS)
            .await?
            .unwrap_or_default())
    }

    async fn save(&self, drafts: &[Draft]) -> Result<()> {
        save_json(self.store.as_ref(), DRAFT_REPORTS, &drafts).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryRecordStore;
    use crate::models::Media;
    use pretty_assertions::assert_eq;

    fn setup() -> (DraftRepository, MemoryRecordStore) {
        let store = MemoryRecordStore::new();
        (DraftRepository::new(Arc::new(store.clone())), store)
    }

    fn titled(title: &str) -> ReportFields {
        ReportFields {
            title: title.into(),
            ..ReportFields::default()
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_empty_draft_is_rejected() {
        let (repo, store) = setup();

        let error = repo
            .save_draft(ReportFields {
                title: "  ".into(),
                category: "Health".into(),
                location: "Clinic".into(),
                ..ReportFields::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(error, Error::EmptyDraft));
        assert_eq!(store.get(DRAFT_REPORTS).await.unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_media_only_draft_is_saved() {
        let (repo, _) = setup();
        let draft = repo
            .save_draft(ReportFields {
                media: vec![Media::photo("file:///flood.jpg")],
                ..ReportFields::default()
            })
            .await
            .unwrap();
        assert_eq!(draft.display_title(), "Untitled Draft");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_list_newest_first() {
        let (repo, _) = setup();
        let older = repo.save_draft(titled("Older")).await.unwrap();
        let newer = repo.save_draft(titled("Newer")).await.unwrap();

        let drafts = repo.list_drafts().await.unwrap();
        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].id, newer.id);
        assert_eq!(drafts[1].id, older.id);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_update_and_delete() {
        let (repo, _) = setup();
        let draft = repo.save_draft(titled("Flood")).await.unwrap();

        let updated = repo
            .update_draft(
                &draft.id,
                ReportFields {
                    title: "Flood near river".into(),
                    details: "Water rising".into(),
                    ..ReportFields::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.created_at, draft.created_at);
        assert!(updated.updated_at.is_some());
        assert_eq!(
            repo.get_draft(&draft.id).await.unwrap().unwrap().details,
            "Water rising"
        );

        repo.delete_draft(&draft.id).await.unwrap();
        assert!(repo.list_drafts().await.unwrap().is_empty());
        assert!(matches!(
            repo.delete_draft(&draft.id).await.unwrap_err(),
            Error::NotFound(_)
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_update_to_empty_is_rejected() {
        let (repo, _) = setup();
        let draft = repo.save_draft(titled("Keep me")).await.unwrap();

        let error = repo
            .update_draft(&draft.id, ReportFields::default())
            .await
            .unwrap_err();
        assert!(matches!(error, Error::EmptyDraft));
        assert_eq!(
            repo.get_draft(&draft.id).await.unwrap().unwrap().title,
            "Keep me"
        );
    }
}
