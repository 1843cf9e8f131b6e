use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::composer::{all_campaign_coaches, campaign_coach_page, CoachPageRequest, ComposeError};
use super::directory::{CoachDirectory, DirectoryError};
use super::domain::{CampaignCoachesPage, CampaignId, CoachId};
use super::export::lead_lists::{LeadListError, LeadListRecord, LeadListRepository};
use super::export::storage::ExportStorage;
use super::export::{publish_export, CoachExport, ExportError, ExportSettings};
use super::facets::{coach_filter_options, CoachFilterOptions};
use super::filters::{CoachFilters, FacetSelection, FilterError};
use super::resolver::ResolveError;
use super::session::Session;

pub const NO_MATCHING_COACHES: &str = "No coaches match the selected filters";

/// Body of an export request. Both fields are optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    #[serde(default)]
    pub coach_ids: Option<Vec<CoachId>>,
    #[serde(default)]
    pub filters: Option<CoachFilters>,
}

/// Campaign actions behind a session check: coach pages, dropdown options, exports and lead lists.
pub struct CampaignCoachService<D, L, S> {
    directory: Arc<D>,
    lead_lists: Arc<L>,
    storage: Arc<S>,
    settings: ExportSettings,
}

impl<D, L, S> CampaignCoachService<D, L, S>
where
    D: CoachDirectory + 'static,
    L: LeadListRepository + 'static,
    S: ExportStorage + 'static,
{
    pub fn new(
        directory: Arc<D>,
        lead_lists: Arc<L>,
        storage: Arc<S>,
        settings: ExportSettings,
    ) -> Self {
        Self {
            directory,
            lead_lists,
            storage,
            settings,
        }
    }

    pub async fn campaign_coaches(
        &self,
        session: Option<&Session>,
        campaign_id: CampaignId,
        request: &CoachPageRequest,
    ) -> Result<CampaignCoachesPage, ActionError> {
        let session = require_session(session)?;
        let page = campaign_coach_page(self.directory.as_ref(), request)
            .await
            .map_err(|err| log_failure("campaign_coaches", campaign_id, err.into()))?;

        info!(
            %campaign_id,
            user = %session.user_id,
            page = request.page,
            rows = page.data.len(),
            total = page.pagination.total_count,
            "campaign coach page served"
        );
        Ok(page)
    }

    pub async fn filter_options(
        &self,
        session: Option<&Session>,
        selection: &FacetSelection,
    ) -> Result<CoachFilterOptions, ActionError> {
        require_session(session)?;
        Ok(coach_filter_options(self.directory.as_ref(), selection).await)
    }

    /// Exports every coach matching the filters, narrowed to `coach_ids` when given.
    pub async fn export_coach_list(
        &self,
        session: Option<&Session>,
        campaign_id: CampaignId,
        request: &ExportRequest,
    ) -> Result<CoachExport, ActionError> {
        let session = require_session(session)?;
        let filters = request.filters.clone().unwrap_or_default();

        let mut rows =
            all_campaign_coaches(self.directory.as_ref(), &filters, self.settings.page_size)
                .await
                .map_err(|err| log_failure("export_coach_list", campaign_id, err.into()))?;

        if let Some(coach_ids) = &request.coach_ids {
            let allowed: HashSet<CoachId> = coach_ids.iter().copied().collect();
            rows.retain(|row| allowed.contains(&row.coach_id));
        }

        if rows.is_empty() {
            return Err(ActionError::Validation(NO_MATCHING_COACHES.to_string()));
        }

        publish_export(
            self.storage.as_ref(),
            self.lead_lists.as_ref(),
            &self.settings,
            campaign_id,
            &session.user_id,
            &rows,
        )
        .await
        .map_err(|err| log_failure("export_coach_list", campaign_id, ActionError::Export(err)))
    }

    pub async fn lead_lists(
        &self,
        session: Option<&Session>,
        campaign_id: CampaignId,
    ) -> Result<Vec<LeadListRecord>, ActionError> {
        require_session(session)?;
        self.lead_lists
            .for_campaign(campaign_id)
            .await
            .map_err(|err| log_failure("lead_lists", campaign_id, ActionError::LeadList(err)))
    }
}

fn require_session(session: Option<&Session>) -> Result<&Session, ActionError> {
    session.ok_or(ActionError::Unauthenticated)
}

fn log_failure(action: &'static str, campaign_id: CampaignId, err: ActionError) -> ActionError {
    match &err {
        ActionError::Unauthenticated | ActionError::Validation(_) | ActionError::Filter(_) => {}
        other => error!(action, %campaign_id, error = %other, "campaign action failed"),
    }
    err
}

/// Error returned by a campaign action. The display text is what callers see.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("You must be logged in")]
    Unauthenticated,
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Filter(#[from] FilterError),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    LeadList(#[from] LeadListError),
}

impl From<ComposeError> for ActionError {
    fn from(value: ComposeError) -> Self {
        match value {
            ComposeError::Resolve(ResolveError::Filter(err)) => Self::Filter(err),
            ComposeError::Resolve(ResolveError::Directory(err)) => Self::Directory(err),
            other => Self::Validation(other.to_string()),
        }
    }
}
