//! Coach filtering, paging and sending-tool export for recruiting campaigns.
//!
//! Filters resolve to university id sets first, then one shared job predicate drives both the
//! count and the page query. Exports page through the full result, upload a CSV and record a
//! lead list for the campaign.

pub mod composer;
pub mod directory;
pub mod domain;
pub mod export;
pub mod facets;
pub mod filters;
pub(crate) mod flatten;
pub mod memory;
pub mod postgres;
pub mod resolver;
pub mod router;
pub mod service;
pub mod session;

#[cfg(test)]
mod tests;

pub use composer::{all_campaign_coaches, campaign_coach_page, CoachPageRequest, ComposeError};
pub use directory::{CoachDirectory, DirectoryError, JobQuery, RowRange};
pub use domain::{
    CampaignCoachData, CampaignCoachesPage, CampaignId, CoachId, LeadListId, Pagination,
    ProgramId, UniversityId,
};
pub use export::lead_lists::{
    InMemoryLeadListRepository, LeadListError, LeadListRecord, LeadListRepository,
};
pub use export::storage::{ExportStorage, LocalExportStorage, StorageError, SupabaseStorage};
pub use export::{CoachExport, ExportError, ExportSettings};
pub use facets::{coach_filter_options, CoachFilterOptions};
pub use filters::{CoachFilters, FacetFilter, FacetOperator, FacetSelection, TuitionFilter};
pub use memory::{DirectorySnapshot, InMemoryCoachDirectory, SnapshotError};
pub use postgres::{PgCoachDirectory, PgLeadListRepository};
pub use router::{campaign_router, ActionResponse};
pub use service::{ActionError, CampaignCoachService, ExportRequest};
pub use session::{Session, SessionRegistry};
