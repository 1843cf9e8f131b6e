use async_trait::async_trait;
use campaign_desk::config::AppConfig;
use campaign_desk::error::AppError;
use campaign_desk::workflows::campaigns::directory::{
    CoachDirectory, DirectoryError, DivisionCount, JobJoinRow, JobQuery, ProgramCount, RowRange,
    UniversityCount,
};
use campaign_desk::workflows::campaigns::domain::{CampaignId, UniversityId};
use campaign_desk::workflows::campaigns::filters::{FacetSelection, TuitionCondition};
use campaign_desk::workflows::campaigns::{
    CampaignCoachService, DirectorySnapshot, ExportSettings, ExportStorage, InMemoryCoachDirectory,
    InMemoryLeadListRepository, LeadListError, LeadListRecord, LeadListRepository,
    LocalExportStorage, PgCoachDirectory, PgLeadListRepository, SessionRegistry, StorageError,
    SupabaseStorage,
};
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::postgres::PgPoolOptions;
use std::collections::BTreeSet;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type AppService =
    CampaignCoachService<DirectoryBackend, LeadListBackend, StorageBackend>;

/// Coach data source picked at startup: Postgres when `DATABASE_URL` is set, otherwise a JSON
/// snapshot, otherwise an empty directory.
pub(crate) enum DirectoryBackend {
    Postgres(PgCoachDirectory),
    Memory(InMemoryCoachDirectory),
}

pub(crate) enum LeadListBackend {
    Postgres(PgLeadListRepository),
    Memory(InMemoryLeadListRepository),
}

pub(crate) enum StorageBackend {
    Supabase(SupabaseStorage),
    Local(LocalExportStorage),
}

/// Wires the service and the bearer-token registry from configuration.
pub(crate) async fn build_service(
    config: &AppConfig,
) -> Result<(Arc<AppService>, Arc<SessionRegistry>), AppError> {
    let (directory, lead_lists) = match &config.database.url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(config.database.max_connections)
                .acquire_timeout(Duration::from_secs(5))
                .connect(url)
                .await?;
            info!(
                max_connections = config.database.max_connections,
                "connected to coach directory database"
            );
            (
                DirectoryBackend::Postgres(PgCoachDirectory::new(pool.clone())),
                LeadListBackend::Postgres(PgLeadListRepository::new(pool)),
            )
        }
        None => {
            let snapshot = match &config.database.snapshot_path {
                Some(path) => {
                    info!(path = %path.display(), "loading coach directory snapshot");
                    DirectorySnapshot::from_path(path)?
                }
                None => {
                    warn!("no DATABASE_URL or APP_DIRECTORY_SNAPSHOT set; directory is empty");
                    DirectorySnapshot::default()
                }
            };
            (
                DirectoryBackend::Memory(InMemoryCoachDirectory::new(snapshot)),
                LeadListBackend::Memory(InMemoryLeadListRepository::default()),
            )
        }
    };

    let storage = match &config.storage.supabase {
        Some(supabase) => {
            StorageBackend::Supabase(SupabaseStorage::new(supabase, config.storage.bucket.clone()))
        }
        None => StorageBackend::Local(LocalExportStorage::new(
            config.storage.local_dir.clone(),
            &config.storage.bucket,
        )),
    };

    let sessions = SessionRegistry::from_config(&config.auth);
    if sessions.is_empty() {
        warn!("APP_API_TOKENS is empty; every HTTP action will be rejected");
    }

    let service = CampaignCoachService::new(
        Arc::new(directory),
        Arc::new(lead_lists),
        Arc::new(storage),
        ExportSettings::from(&config.export),
    );
    Ok((Arc::new(service), Arc::new(sessions)))
}

#[async_trait]
impl CoachDirectory for DirectoryBackend {
    async fn universities_in_divisions(
        &self,
        division_names: &[String],
    ) -> Result<BTreeSet<UniversityId>, DirectoryError> {
        match self {
            Self::Postgres(inner) => inner.universities_in_divisions(division_names).await,
            Self::Memory(inner) => inner.universities_in_divisions(division_names).await,
        }
    }

    async fn universities_by_tuition(
        &self,
        condition: TuitionCondition,
        scope: Option<&BTreeSet<UniversityId>>,
    ) -> Result<BTreeSet<UniversityId>, DirectoryError> {
        match self {
            Self::Postgres(inner) => inner.universities_by_tuition(condition, scope).await,
            Self::Memory(inner) => inner.universities_by_tuition(condition, scope).await,
        }
    }

    async fn count_jobs(&self, query: &JobQuery) -> Result<u64, DirectoryError> {
        match self {
            Self::Postgres(inner) => inner.count_jobs(query).await,
            Self::Memory(inner) => inner.count_jobs(query).await,
        }
    }

    async fn fetch_jobs(
        &self,
        query: &JobQuery,
        range: RowRange,
    ) -> Result<Vec<JobJoinRow>, DirectoryError> {
        match self {
            Self::Postgres(inner) => inner.fetch_jobs(query, range).await,
            Self::Memory(inner) => inner.fetch_jobs(query, range).await,
        }
    }

    async fn division_counts(
        &self,
        selection: &FacetSelection,
    ) -> Result<Vec<DivisionCount>, DirectoryError> {
        match self {
            Self::Postgres(inner) => inner.division_counts(selection).await,
            Self::Memory(inner) => inner.division_counts(selection).await,
        }
    }

    async fn university_counts(
        &self,
        selection: &FacetSelection,
    ) -> Result<Vec<UniversityCount>, DirectoryError> {
        match self {
            Self::Postgres(inner) => inner.university_counts(selection).await,
            Self::Memory(inner) => inner.university_counts(selection).await,
        }
    }

    async fn program_counts(
        &self,
        selection: &FacetSelection,
    ) -> Result<Vec<ProgramCount>, DirectoryError> {
        match self {
            Self::Postgres(inner) => inner.program_counts(selection).await,
            Self::Memory(inner) => inner.program_counts(selection).await,
        }
    }
}

#[async_trait]
impl LeadListRepository for LeadListBackend {
    async fn insert(&self, record: LeadListRecord) -> Result<LeadListRecord, LeadListError> {
        match self {
            Self::Postgres(inner) => inner.insert(record).await,
            Self::Memory(inner) => inner.insert(record).await,
        }
    }

    async fn for_campaign(
        &self,
        campaign_id: CampaignId,
    ) -> Result<Vec<LeadListRecord>, LeadListError> {
        match self {
            Self::Postgres(inner) => inner.for_campaign(campaign_id).await,
            Self::Memory(inner) => inner.for_campaign(campaign_id).await,
        }
    }
}

#[async_trait]
impl ExportStorage for StorageBackend {
    async fn upload(
        &self,
        path: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        match self {
            Self::Supabase(inner) => inner.upload(path, body, content_type).await,
            Self::Local(inner) => inner.upload(path, body, content_type).await,
        }
    }

    async fn signed_url(&self, path: &str, ttl: Duration) -> Result<String, StorageError> {
        match self {
            Self::Supabase(inner) => inner.signed_url(path, ttl).await,
            Self::Local(inner) => inner.signed_url(path, ttl).await,
        }
    }

    async fn remove(&self, path: &str) -> Result<(), StorageError> {
        match self {
            Self::Supabase(inner) => inner.remove(path).await,
            Self::Local(inner) => inner.remove(path).await,
        }
    }
}
