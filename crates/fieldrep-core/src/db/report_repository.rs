//! Report repository: one user's published reports

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::keys::{reports_key, REPORTS_PREFIX};
use super::record_store::{load_json, save_json, RecordStore};
use crate::models::{Report, ReportFields, ReportId, ReportPatch, Uid};
use crate::{Error, Result};

/// Ordering of listed reports by `createdAt`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

/// CRUD over the `Reports_<uid>` list.
///
/// Reports are always addressed by id, never by list position.
#[derive(Clone)]
pub struct ReportRepository {
    store: Arc<dyn RecordStore>,
    // Serializes read-modify-write cycles on report lists
    write_lock: Arc<Mutex<()>>,
}

impl ReportRepository {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// List reports newest first
    pub async fn list_reports(&self, uid: &Uid) -> Result<Vec<Report>> {
        self.list_reports_sorted(uid, SortOrder::NewestFirst).await
    }

    /// List reports in the requested `createdAt` order
    pub async fn list_reports_sorted(&self, uid: &Uid, order: SortOrder) -> Result<Vec<Report>> {
        let mut reports = self.load(uid).await?;
        reports.sort_by(|a, b| {
            let newest_first = compare_newest_first(a, b);
            match order {
                SortOrder::NewestFirst => newest_first,
                SortOrder::OldestFirst => newest_first.reverse(),
            }
        });
        Ok(reports)
    }

    /// Reports whose title contains `query`, ignoring case, newest first
    pub async fn search_reports(&self, uid: &Uid, query: &str) -> Result<Vec<Report>> {
        let reports = self.list_reports(uid).await?;
        Ok(reports
            .into_iter()
            .filter(|report| report.title_matches(query))
            .collect())
    }

    /// Fetch a report by id
    pub async fn get_report(&self, uid: &Uid, id: &ReportId) -> Result<Option<Report>> {
        let reports = self.load(uid).await?;
        Ok(reports.into_iter().find(|report| &report.id == id))
    }

    /// Reports not yet confirmed by the remote store
    pub async fn list_unsynced(&self, uid: &Uid) -> Result<Vec<Report>> {
        let reports = self.list_reports_sorted(uid, SortOrder::OldestFirst).await?;
        Ok(reports.into_iter().filter(|report| !report.synced).collect())
    }

    /// Validate and append a new report for `uid`
    pub async fn create_report(&self, uid: &Uid, fields: ReportFields) -> Result<Report> {
        fields.validate_for_publish()?;
        let report = Report::new(uid.clone(), fields);

        let _guard = self.write_lock.lock().await;
        let mut reports = self.load(uid).await?;
        reports.push(report.clone());
        self.save(uid, &reports).await?;

        tracing::debug!("Report {} saved locally for {}", report.id, uid);
        Ok(report)
    }

    /// Merge `patch` into the report with `id` and stamp `updatedAt`
    pub async fn update_report(
        &self,
        uid: &Uid,
        id: &ReportId,
        patch: &ReportPatch,
    ) -> Result<Report> {
        let _guard = self.write_lock.lock().await;
        let mut reports = self.load(uid).await?;
        let report = reports
            .iter_mut()
            .find(|report| &report.id == id)
            .ok_or_else(|| Error::NotFound(format!("report {id}")))?;

        report.apply_patch(patch)?;
        let updated = report.clone();
        self.save(uid, &reports).await?;

        tracing::debug!("Report {} updated locally for {}", id, uid);
        Ok(updated)
    }

    /// Remove the report with `id`, returning it
    pub async fn delete_report(&self, uid: &Uid, id: &ReportId) -> Result<Report> {
        let _guard = self.write_lock.lock().await;
        let mut reports = self.load(uid).await?;
        let position = reports
            .iter()
            .position(|report| &report.id == id)
            .ok_or_else(|| Error::NotFound(format!("report {id}")))?;

        let removed = reports.remove(position);
        self.save(uid, &reports).await?;

        tracing::debug!("Report {} removed locally for {}", id, uid);
        Ok(removed)
    }

    /// Record a confirmed remote write of the version stamped `written_at`.
    ///
    /// The report is only marked synced when `written_at` still equals its
    /// local `updatedAt`; a later local edit keeps it unsynced. Returns
    /// whether the report is now synced.
    pub async fn mark_synced(
        &self,
        uid: &Uid,
        id: &ReportId,
        written_at: Option<DateTime<Utc>>,
    ) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let mut reports = self.load(uid).await?;
        let report = reports
            .iter_mut()
            .find(|report| &report.id == id)
            .ok_or_else(|| Error::NotFound(format!("report {id}")))?;

        if report.updated_at != written_at {
            tracing::debug!(
                "Report {} changed locally after the synced write; leaving it unsynced",
                id
            );
            return Ok(false);
        }
        if report.synced {
            return Ok(true);
        }
        report.synced = true;
        self.save(uid, &reports).await?;
        Ok(true)
    }

    /// Users with a local report list, from the `Reports_<uid>` keys
    pub async fn list_owners(&self) -> Result<Vec<Uid>> {
        let mut owners = self
            .store
            .keys_with_prefix(REPORTS_PREFIX)
            .await?
            .into_iter()
            .filter_map(|key| key.strip_prefix(REPORTS_PREFIX).map(Uid::user))
            .collect::<Vec<_>>();
        owners.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(owners)
    }

    async fn load(&self, uid: &Uid) -> Result<Vec<Report>> {
        Ok(load_json(self.store.as_ref(), &reports_key(uid))
            .await?
            .unwrap_or_default())
    }

    async fn save(&self, uid: &Uid, reports: &[Report]) -> Result<()> {
        save_json(self.store.as_ref(), &reports_key(uid), &reports).await
    }
}

fn compare_newest_first(a: &Report, b: &Report) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| b.id.cmp(&a.id))
}
