use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::directory::{CoachDirectory, DirectoryError, JobQuery, RowRange};
use super::domain::{CampaignCoachData, CampaignCoachesPage, CoachId, Pagination};
use super::filters::CoachFilters;
use super::flatten::flatten_rows;
use super::resolver::{job_query, resolve_university_scope, ResolveError, ScopeResolution};

/// Page request for the campaign coach table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoachPageRequest {
    pub page: u32,
    pub page_size: u32,
    #[serde(default)]
    pub filters: CoachFilters,
    #[serde(default)]
    pub coach_ids: Option<Vec<CoachId>>,
}

#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    #[error("page must be 1 or greater")]
    InvalidPage,
    #[error("pageSize must be 1 or greater")]
    InvalidPageSize,
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

impl From<DirectoryError> for ComposeError {
    fn from(value: DirectoryError) -> Self {
        Self::Resolve(ResolveError::Directory(value))
    }
}

/// Resolves filters into the shared job predicate. `None` means no coach can match.
pub async fn resolve_job_query<D>(
    directory: &D,
    filters: &CoachFilters,
) -> Result<Option<JobQuery>, ResolveError>
where
    D: CoachDirectory + ?Sized,
{
    Ok(match resolve_university_scope(directory, filters).await? {
        ScopeResolution::NoMatches => None,
        ScopeResolution::Scoped(scope) => Some(job_query(scope, filters)),
    })
}

/// One page of flattened coach rows plus pagination from a separate count query over the same
/// predicate. `coach_ids` filters the fetched page only; allow-listed coaches on other pages
/// are not pulled in.
pub async fn campaign_coach_page<D>(
    directory: &D,
    request: &CoachPageRequest,
) -> Result<CampaignCoachesPage, ComposeError>
where
    D: CoachDirectory + ?Sized,
{
    if request.page == 0 {
        return Err(ComposeError::InvalidPage);
    }
    if request.page_size == 0 {
        return Err(ComposeError::InvalidPageSize);
    }

    let Some(query) = resolve_job_query(directory, &request.filters).await? else {
        debug!(page = request.page, "filters resolved to no universities");
        return Ok(CampaignCoachesPage::empty(request.page, request.page_size));
    };

    let total_count = directory.count_jobs(&query).await?;
    let rows = directory
        .fetch_jobs(&query, RowRange::for_page(request.page, request.page_size))
        .await?;
    let mut data = flatten_rows(rows);

    if let Some(coach_ids) = &request.coach_ids {
        let allowed: HashSet<CoachId> = coach_ids.iter().copied().collect();
        data.retain(|row| allowed.contains(&row.coach_id));
    }

    Ok(CampaignCoachesPage {
        data,
        pagination: Pagination::new(request.page, request.page_size, total_count),
    })
}

/// Every flattened row matching `filters`, fetched page by page in job id order.
pub async fn all_campaign_coaches<D>(
    directory: &D,
    filters: &CoachFilters,
    page_size: u32,
) -> Result<Vec<CampaignCoachData>, ComposeError>
where
    D: CoachDirectory + ?Sized,
{
    if page_size == 0 {
        return Err(ComposeError::InvalidPageSize);
    }
    let Some(query) = resolve_job_query(directory, filters).await? else {
        return Ok(Vec::new());
    };

    let total_count = directory.count_jobs(&query).await?;
    let total_pages = Pagination::new(1, page_size, total_count).total_pages;
    let mut coaches = Vec::new();

    for page in 1..=total_pages {
        let page = u32::try_from(page).unwrap_or(u32::MAX);
        let rows = directory
            .fetch_jobs(&query, RowRange::for_page(page, page_size))
            .await?;
        if rows.is_empty() {
            break;
        }
        coaches.extend(flatten_rows(rows));
    }

    Ok(coaches)
}
