//! Sending-tool export: CSV rendering, upload, and lead-list bookkeeping.

pub mod lead_lists;
pub mod sending_tool;
pub mod storage;

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::domain::{CampaignCoachData, CampaignId, LeadListId};
use lead_lists::{LeadListError, LeadListRecord, LeadListRepository};
use storage::{ExportStorage, StorageError};

pub use sending_tool::{escape_csv, generate_csv, SENDING_TOOL_COLUMNS};

/// Knobs for the export pipeline, normally taken from `ExportConfig`.
#[derive(Debug, Clone)]
pub struct ExportSettings {
    pub signed_url_ttl: Duration,
    pub page_size: u32,
    pub lead_list_attempts: u32,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            signed_url_ttl: Duration::from_secs(7 * 24 * 60 * 60),
            page_size: 500,
            lead_list_attempts: 2,
        }
    }
}

impl From<&crate::config::ExportConfig> for ExportSettings {
    fn from(config: &crate::config::ExportConfig) -> Self {
        Self {
            signed_url_ttl: Duration::from_secs(config.signed_url_ttl_secs),
            page_size: config.page_size.max(1),
            lead_list_attempts: config.lead_list_attempts.max(1),
        }
    }
}

/// Result of a completed export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoachExport {
    pub file_name: String,
    pub csv_content: String,
    pub row_count: u64,
    pub file_url: String,
    pub lead_list_id: LeadListId,
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to render CSV: {0}")]
    Render(#[from] csv::Error),
    #[error("failed to upload export: {0}")]
    Upload(#[source] StorageError),
    #[error("failed to sign export url: {0}")]
    Sign(#[source] StorageError),
    #[error("failed to record lead list: {0}")]
    LeadList(#[source] LeadListError),
}

pub fn export_file_name(now: DateTime<Utc>) -> String {
    format!("coach-list-{}.csv", now.format("%Y%m%d-%H%M%S"))
}

pub fn export_path(campaign_id: CampaignId, file_name: &str) -> String {
    format!("{campaign_id}/{file_name}")
}

/// Uploads the rendered rows and records the lead list. A failure after the upload removes the
/// uploaded object again so no file is left without its lead-list record.
pub async fn publish_export<S, L>(
    storage: &S,
    lead_lists: &L,
    settings: &ExportSettings,
    campaign_id: CampaignId,
    created_by: &str,
    rows: &[CampaignCoachData],
) -> Result<CoachExport, ExportError>
where
    S: ExportStorage + ?Sized,
    L: LeadListRepository + ?Sized,
{
    let csv_content = generate_csv(rows)?;
    let now = Utc::now();
    let file_name = export_file_name(now);
    let path = export_path(campaign_id, &file_name);

    storage
        .upload(&path, csv_content.clone().into_bytes(), mime::TEXT_CSV.as_ref())
        .await
        .map_err(ExportError::Upload)?;

    let file_url = match storage.signed_url(&path, settings.signed_url_ttl).await {
        Ok(url) => url,
        Err(err) => {
            compensate(storage, &path).await;
            return Err(ExportError::Sign(err));
        }
    };

    let row_count = rows.len() as u64;
    let record = LeadListRecord {
        id: LeadListId(Uuid::new_v4()),
        campaign_id,
        name: format!("Coach export {} ({row_count} coaches)", now.format("%Y-%m-%d %H:%M")),
        file_path: path.clone(),
        file_url: file_url.clone(),
        row_count,
        created_by: created_by.to_string(),
        created_at: now,
    };

    let attempts = settings.lead_list_attempts.max(1);
    let mut attempt = 1;
    let stored = loop {
        match lead_lists.insert(record.clone()).await {
            Ok(stored) => break stored,
            Err(err) if attempt < attempts => {
                warn!(%campaign_id, attempt, error = %err, "lead list insert failed, retrying");
                attempt += 1;
            }
            Err(err) => {
                error!(%campaign_id, %path, error = %err, "lead list insert failed, removing upload");
                compensate(storage, &path).await;
                return Err(ExportError::LeadList(err));
            }
        }
    };

    info!(%campaign_id, %path, row_count, "coach export published");

    Ok(CoachExport {
        file_name,
        csv_content,
        row_count,
        file_url,
        lead_list_id: stored.id,
    })
}

async fn compensate<S>(storage: &S, path: &str)
where
    S: ExportStorage + ?Sized,
{
    if let Err(err) = storage.remove(path).await {
        warn!(%path, error = %err, "could not remove orphaned export");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn file_name_embeds_timestamp() {
        let now = Utc
            .with_ymd_and_hms(2025, 3, 14, 9, 26, 53)
            .single()
            .expect("valid timestamp");
        assert_eq!(export_file_name(now), "coach-list-20250314-092653.csv");
    }

    #[test]
    fn settings_never_drop_below_one_attempt() {
        let settings = ExportSettings::from(&crate::config::ExportConfig {
            signed_url_ttl_secs: 60,
            page_size: 0,
            lead_list_attempts: 0,
        });
        assert_eq!(settings.page_size, 1);
        assert_eq!(settings.lead_list_attempts, 1);
        assert_eq!(settings.signed_url_ttl, Duration::from_secs(60));
    }
}
