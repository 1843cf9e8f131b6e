use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflows::campaigns::domain::{CampaignId, LeadListId};

/// Row of `sending_tool_lead_lists`: one uploaded export handed to the sending tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadListRecord {
    pub id: LeadListId,
    pub campaign_id: CampaignId,
    pub name: String,
    pub file_path: String,
    pub file_url: String,
    pub row_count: u64,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait LeadListRepository: Send + Sync {
    async fn insert(&self, record: LeadListRecord) -> Result<LeadListRecord, LeadListError>;

    /// Newest first.
    async fn for_campaign(
        &self,
        campaign_id: CampaignId,
    ) -> Result<Vec<LeadListRecord>, LeadListError>;
}

#[derive(Debug, thiserror::Error)]
pub enum LeadListError {
    #[error("lead list already exists")]
    Conflict,
    #[error("lead list query failed: {0}")]
    Query(#[from] sqlx::Error),
    #[error("lead list repository unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryLeadListRepository {
    records: Arc<Mutex<Vec<LeadListRecord>>>,
}

impl InMemoryLeadListRepository {
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<LeadListRecord>>, LeadListError> {
        self.records
            .lock()
            .map_err(|_| LeadListError::Unavailable("lead list mutex poisoned".to_string()))
    }
}

#[async_trait]
impl LeadListRepository for InMemoryLeadListRepository {
    async fn insert(&self, record: LeadListRecord) -> Result<LeadListRecord, LeadListError> {
        let mut guard = self.lock()?;
        if guard.iter().any(|existing| existing.id == record.id) {
            return Err(LeadListError::Conflict);
        }
        guard.push(record.clone());
        Ok(record)
    }

    async fn for_campaign(
        &self,
        campaign_id: CampaignId,
    ) -> Result<Vec<LeadListRecord>, LeadListError> {
        let guard = self.lock()?;
        let mut records: Vec<LeadListRecord> = guard
            .iter()
            .filter(|record| record.campaign_id == campaign_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }
}
