use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::Response;
use serde_json::Value;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::workflows::campaigns::directory::{
    CoachDirectory, DirectoryError, DivisionCount, JobJoinRow, JobQuery, ProgramCount, RowRange,
    UniversityCount,
};
use crate::workflows::campaigns::domain::{
    CampaignId, Coach, CoachId, Conference, ConferenceId, Division, DivisionId, JobId, Program,
    ProgramId, University, UniversityConference, UniversityDivision, UniversityId, UniversityJob,
};
use crate::workflows::campaigns::export::lead_lists::{
    InMemoryLeadListRepository, LeadListError, LeadListRecord, LeadListRepository,
};
use crate::workflows::campaigns::export::storage::{ExportStorage, StorageError};
use crate::workflows::campaigns::export::ExportSettings;
use crate::workflows::campaigns::filters::{FacetSelection, TuitionCondition};
use crate::workflows::campaigns::memory::{DirectorySnapshot, InMemoryCoachDirectory};
use crate::workflows::campaigns::{campaign_router, CampaignCoachService, Session, SessionRegistry};

pub(super) const TOKEN: &str = "token-recruiter";

pub(super) fn university_id(n: u128) -> UniversityId {
    UniversityId(Uuid::from_u128(0x100 + n))
}

pub(super) fn program_id(n: u128) -> ProgramId {
    ProgramId(Uuid::from_u128(0x200 + n))
}

pub(super) fn coach_id(n: u128) -> CoachId {
    CoachId(Uuid::from_u128(0x300 + n))
}

pub(super) fn job_id(n: u128) -> JobId {
    JobId(Uuid::from_u128(0x400 + n))
}

pub(super) fn campaign_id() -> CampaignId {
    CampaignId(Uuid::from_u128(0xCA))
}

fn university(n: u128, name: &str, cost: Option<f64>) -> University {
    University {
        id: university_id(n),
        name: name.to_string(),
        city: Some("Columbus".to_string()),
        state: Some("OH".to_string()),
        region: Some("Midwest".to_string()),
        website: Some(format!("https://u{n}.example.edu")),
        total_yearly_cost: cost,
        acceptance_rate: Some(0.52),
        gpa_25: Some(3.4),
        gpa_75: Some(3.9),
        sat_reading_25: Some(560),
        sat_reading_75: Some(660),
        sat_math_25: Some(570),
        sat_math_75: Some(690),
        act_composite_25: Some(24),
        act_composite_75: Some(30),
    }
}

fn coach(n: u128, name: &str) -> Coach {
    Coach {
        id: coach_id(n),
        full_name: name.to_string(),
        email: Some(format!("coach{n}@personal.example.com")),
        phone: Some(format!("555-010{n}")),
        twitter_url: None,
        instagram_url: None,
        linkedin_url: None,
    }
}

fn job(n: u128, coach: Option<u128>, university: u128, program: Option<u128>) -> UniversityJob {
    UniversityJob {
        id: job_id(n),
        coach_id: coach.map(coach_id),
        university_id: Some(university_id(university)),
        program_id: program.map(program_id),
        job_title: Some("Head Coach".to_string()),
        work_email: None,
        work_phone: None,
        start_date: None,
        end_date: None,
        is_deleted: false,
    }
}

/// Five universities, six programs, nine jobs.
///
/// | univ | name                    | cost   | division     |
/// |------|-------------------------|--------|--------------|
/// | 1    | Alpha State University  | 30000  | Division I   |
/// | 2    | Beta College            | 18000  | Division III |
/// | 3    | Gamma Tech              | 45000  | Division I   |
/// | 4    | Delta University        | (null) | Division II  |
/// | 5    | Epsilon College         | 22000  | NAIA         |
///
/// Live jobs (coach present, not deleted): 1, 2, 3, 4, 5, 8, 9. Job 6 has no coach, job 7 is
/// soft-deleted, job 8 has no program.
pub(super) fn snapshot() -> DirectorySnapshot {
    let divisions = [
        (1, "Division I"),
        (2, "Division II"),
        (3, "Division III"),
        (4, "NAIA"),
    ];
    let memberships = [(1, 1), (2, 3), (3, 1), (4, 2), (5, 4)];

    let mut first = job(1, Some(1), 1, Some(1));
    first.work_email = Some("jordan.avery@alpha.example.edu".to_string());
    let mut deleted = job(7, Some(6), 5, Some(6));
    deleted.is_deleted = true;

    DirectorySnapshot {
        universities: vec![
            university(1, "Alpha State University", Some(30_000.0)),
            university(2, "Beta College", Some(18_000.0)),
            university(3, "Gamma Tech", Some(45_000.0)),
            university(4, "Delta University", None),
            university(5, "Epsilon College", Some(22_000.0)),
        ],
        divisions: divisions
            .iter()
            .map(|(n, name)| Division {
                id: DivisionId(Uuid::from_u128(0x500 + n)),
                name: name.to_string(),
            })
            .collect(),
        university_divisions: memberships
            .iter()
            .map(|(university, division)| UniversityDivision {
                university_id: university_id(*university),
                division_id: DivisionId(Uuid::from_u128(0x500 + division)),
            })
            .collect(),
        conferences: vec![Conference {
            id: ConferenceId(Uuid::from_u128(0x600)),
            name: "Big Ten".to_string(),
        }],
        university_conferences: vec![UniversityConference {
            university_id: university_id(1),
            conference_id: ConferenceId(Uuid::from_u128(0x600)),
        }],
        programs: vec![
            program(1, 1, "women"),
            program(2, 1, "men"),
            program(3, 2, "women"),
            program(4, 3, "women"),
            program(5, 4, "men"),
            program(6, 5, "women"),
        ],
        coaches: vec![
            coach(1, "Jordan Avery"),
            coach(2, "Sam Lee"),
            coach(3, "Riley O'Neil"),
            coach(4, "Casey Morgan"),
            coach(5, "Taylor Brooks"),
            coach(6, "Drew Parker"),
            coach(7, "Morgan"),
            coach(8, "Alex Kim"),
        ],
        jobs: vec![
            deleted,
            job(9, Some(8), 2, Some(3)),
            first,
            job(2, Some(2), 1, Some(2)),
            job(3, Some(3), 2, Some(3)),
            job(4, Some(4), 3, Some(4)),
            job(5, Some(5), 4, Some(5)),
            job(6, None, 1, Some(1)),
            job(8, Some(7), 3, None),
        ],
    }
}

fn program(n: u128, university: u128, gender: &str) -> Program {
    Program {
        id: program_id(n),
        university_id: university_id(university),
        gender: Some(gender.to_string()),
    }
}

pub(super) const LIVE_JOBS: u64 = 7;

pub(super) fn directory() -> InMemoryCoachDirectory {
    InMemoryCoachDirectory::new(snapshot())
}

/// Counts the calls that reach the wrapped directory.
#[derive(Default)]
pub(super) struct RecordingDirectory {
    inner: InMemoryCoachDirectory,
    pub(super) count_calls: AtomicUsize,
    pub(super) fetch_calls: AtomicUsize,
    pub(super) tuition_scopes: Mutex<Vec<Option<BTreeSet<UniversityId>>>>,
    pub(super) queries: Mutex<Vec<JobQuery>>,
}

impl RecordingDirectory {
    pub(super) fn new() -> Self {
        Self {
            inner: directory(),
            ..Self::default()
        }
    }

    pub(super) fn counts(&self) -> (usize, usize) {
        (
            self.count_calls.load(Ordering::SeqCst),
            self.fetch_calls.load(Ordering::SeqCst),
        )
    }
}

#[async_trait]
impl CoachDirectory for RecordingDirectory {
    async fn universities_in_divisions(
        &self,
        division_names: &[String],
    ) -> Result<BTreeSet<UniversityId>, DirectoryError> {
        self.inner.universities_in_divisions(division_names).await
    }

    async fn universities_by_tuition(
        &self,
        condition: TuitionCondition,
        scope: Option<&BTreeSet<UniversityId>>,
    ) -> Result<BTreeSet<UniversityId>, DirectoryError> {
        self.tuition_scopes
            .lock()
            .expect("scope mutex poisoned")
            .push(scope.cloned());
        self.inner.universities_by_tuition(condition, scope).await
    }

    async fn count_jobs(&self, query: &JobQuery) -> Result<u64, DirectoryError> {
        self.count_calls.fetch_add(1, Ordering::SeqCst);
        self.queries
            .lock()
            .expect("query mutex poisoned")
            .push(query.clone());
        self.inner.count_jobs(query).await
    }

    async fn fetch_jobs(
        &self,
        query: &JobQuery,
        range: RowRange,
    ) -> Result<Vec<JobJoinRow>, DirectoryError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.queries
            .lock()
            .expect("query mutex poisoned")
            .push(query.clone());
        self.inner.fetch_jobs(query, range).await
    }

    async fn division_counts(
        &self,
        selection: &FacetSelection,
    ) -> Result<Vec<DivisionCount>, DirectoryError> {
        self.inner.division_counts(selection).await
    }

    async fn university_counts(
        &self,
        selection: &FacetSelection,
    ) -> Result<Vec<UniversityCount>, DirectoryError> {
        self.inner.university_counts(selection).await
    }

    async fn program_counts(
        &self,
        selection: &FacetSelection,
    ) -> Result<Vec<ProgramCount>, DirectoryError> {
        self.inner.program_counts(selection).await
    }
}

/// Real data, but the university facet query always fails.
pub(super) struct FlakyFacetDirectory(pub(super) InMemoryCoachDirectory);

#[async_trait]
impl CoachDirectory for FlakyFacetDirectory {
    async fn universities_in_divisions(
        &self,
        division_names: &[String],
    ) -> Result<BTreeSet<UniversityId>, DirectoryError> {
        self.0.universities_in_divisions(division_names).await
    }

    async fn universities_by_tuition(
        &self,
        condition: TuitionCondition,
        scope: Option<&BTreeSet<UniversityId>>,
    ) -> Result<BTreeSet<UniversityId>, DirectoryError> {
        self.0.universities_by_tuition(condition, scope).await
    }

    async fn count_jobs(&self, query: &JobQuery) -> Result<u64, DirectoryError> {
        self.0.count_jobs(query).await
    }

    async fn fetch_jobs(
        &self,
        query: &JobQuery,
        range: RowRange,
    ) -> Result<Vec<JobJoinRow>, DirectoryError> {
        self.0.fetch_jobs(query, range).await
    }

    async fn division_counts(
        &self,
        selection: &FacetSelection,
    ) -> Result<Vec<DivisionCount>, DirectoryError> {
        self.0.division_counts(selection).await
    }

    async fn university_counts(
        &self,
        _selection: &FacetSelection,
    ) -> Result<Vec<UniversityCount>, DirectoryError> {
        Err(DirectoryError::Unavailable("rpc timed out".to_string()))
    }

    async fn program_counts(
        &self,
        selection: &FacetSelection,
    ) -> Result<Vec<ProgramCount>, DirectoryError> {
        self.0.program_counts(selection).await
    }
}

pub(super) struct UnavailableDirectory;

#[async_trait]
impl CoachDirectory for UnavailableDirectory {
    async fn universities_in_divisions(
        &self,
        _division_names: &[String],
    ) -> Result<BTreeSet<UniversityId>, DirectoryError> {
        Err(DirectoryError::Unavailable("database offline".to_string()))
    }

    async fn universities_by_tuition(
        &self,
        _condition: TuitionCondition,
        _scope: Option<&BTreeSet<UniversityId>>,
    ) -> Result<BTreeSet<UniversityId>, DirectoryError> {
        Err(DirectoryError::Unavailable("database offline".to_string()))
    }

    async fn count_jobs(&self, _query: &JobQuery) -> Result<u64, DirectoryError> {
        Err(DirectoryError::Unavailable("database offline".to_string()))
    }

    async fn fetch_jobs(
        &self,
        _query: &JobQuery,
        _range: RowRange,
    ) -> Result<Vec<JobJoinRow>, DirectoryError> {
        Err(DirectoryError::Unavailable("database offline".to_string()))
    }

    async fn division_counts(
        &self,
        _selection: &FacetSelection,
    ) -> Result<Vec<DivisionCount>, DirectoryError> {
        Err(DirectoryError::Unavailable("database offline".to_string()))
    }

    async fn university_counts(
        &self,
        _selection: &FacetSelection,
    ) -> Result<Vec<UniversityCount>, DirectoryError> {
        Err(DirectoryError::Unavailable("database offline".to_string()))
    }

    async fn program_counts(
        &self,
        _selection: &FacetSelection,
    ) -> Result<Vec<ProgramCount>, DirectoryError> {
        Err(DirectoryError::Unavailable("database offline".to_string()))
    }
}

/// Object store kept in a map. Removed paths are remembered for assertions.
#[derive(Default)]
pub(super) struct MemoryStorage {
    pub(super) objects: Mutex<HashMap<String, Vec<u8>>>,
    pub(super) removed: Mutex<Vec<String>>,
    pub(super) fail_upload: bool,
    pub(super) fail_sign: bool,
}

impl MemoryStorage {
    pub(super) fn object(&self, path: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .expect("storage mutex poisoned")
            .get(path)
            .cloned()
    }

    pub(super) fn object_count(&self) -> usize {
        self.objects.lock().expect("storage mutex poisoned").len()
    }

    pub(super) fn removed(&self) -> Vec<String> {
        self.removed.lock().expect("storage mutex poisoned").clone()
    }
}

fn rejected(operation: &'static str, path: &str) -> StorageError {
    StorageError::Rejected {
        operation,
        path: path.to_string(),
        status: 503,
        message: "storage offline".to_string(),
    }
}

#[async_trait]
impl ExportStorage for MemoryStorage {
    async fn upload(
        &self,
        path: &str,
        body: Vec<u8>,
        _content_type: &str,
    ) -> Result<(), StorageError> {
        if self.fail_upload {
            return Err(rejected("upload", path));
        }
        self.objects
            .lock()
            .expect("storage mutex poisoned")
            .insert(path.to_string(), body);
        Ok(())
    }

    async fn signed_url(&self, path: &str, ttl: Duration) -> Result<String, StorageError> {
        if self.fail_sign {
            return Err(rejected("sign", path));
        }
        Ok(format!(
            "https://storage.example.com/coach-exports/{path}?expires={}",
            ttl.as_secs()
        ))
    }

    async fn remove(&self, path: &str) -> Result<(), StorageError> {
        self.objects
            .lock()
            .expect("storage mutex poisoned")
            .remove(path);
        self.removed
            .lock()
            .expect("storage mutex poisoned")
            .push(path.to_string());
        Ok(())
    }
}

/// Fails the first `failures` inserts, then delegates.
#[derive(Default)]
pub(super) struct FlakyLeadLists {
    pub(super) failures: usize,
    pub(super) attempts: AtomicUsize,
    pub(super) inner: InMemoryLeadListRepository,
}

impl FlakyLeadLists {
    pub(super) fn failing(failures: usize) -> Self {
        Self {
            failures,
            ..Self::default()
        }
    }
}

#[async_trait]
impl LeadListRepository for FlakyLeadLists {
    async fn insert(&self, record: LeadListRecord) -> Result<LeadListRecord, LeadListError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.failures {
            return Err(LeadListError::Unavailable("connection reset".to_string()));
        }
        self.inner.insert(record).await
    }

    async fn for_campaign(
        &self,
        campaign_id: CampaignId,
    ) -> Result<Vec<LeadListRecord>, LeadListError> {
        self.inner.for_campaign(campaign_id).await
    }
}

pub(super) type TestService =
    CampaignCoachService<RecordingDirectory, FlakyLeadLists, MemoryStorage>;

pub(super) struct Harness {
    pub(super) service: Arc<TestService>,
    pub(super) directory: Arc<RecordingDirectory>,
    pub(super) lead_lists: Arc<FlakyLeadLists>,
    pub(super) storage: Arc<MemoryStorage>,
}

pub(super) fn harness_with(lead_lists: FlakyLeadLists, storage: MemoryStorage) -> Harness {
    let directory = Arc::new(RecordingDirectory::new());
    let lead_lists = Arc::new(lead_lists);
    let storage = Arc::new(storage);
    let settings = ExportSettings {
        page_size: 2,
        ..ExportSettings::default()
    };
    let service = Arc::new(CampaignCoachService::new(
        directory.clone(),
        lead_lists.clone(),
        storage.clone(),
        settings,
    ));
    Harness {
        service,
        directory,
        lead_lists,
        storage,
    }
}

pub(super) fn harness() -> Harness {
    harness_with(FlakyLeadLists::default(), MemoryStorage::default())
}

pub(super) fn session() -> Session {
    Session::new("recruiter")
}

pub(super) fn sessions() -> Arc<SessionRegistry> {
    let auth = AuthConfig::parse_tokens(&format!("recruiter:{TOKEN}")).expect("valid tokens");
    Arc::new(SessionRegistry::from_config(&auth))
}

pub(super) fn authorized_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {TOKEN}")).expect("header value"),
    );
    headers
}

pub(super) fn router_for(harness: &Harness) -> axum::Router {
    campaign_router(harness.service.clone(), sessions())
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
