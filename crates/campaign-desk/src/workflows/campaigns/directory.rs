use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::domain::{Coach, Program, ProgramId, University, UniversityId, UniversityJob};
use super::filters::{FacetSelection, TuitionCondition};

/// Predicate shared by the count query and the ranged data query. Both are always built from
/// the same value, so a filter can never be applied to one and forgotten on the other.
///
/// Implicit on every query: `coach_id IS NOT NULL AND is_deleted = false`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobQuery {
    /// `None` means unrestricted; `Some` is never empty (the resolver short-circuits first).
    pub university_ids: Option<BTreeSet<UniversityId>>,
    pub excluded_university_ids: BTreeSet<UniversityId>,
    pub programs: Option<ProgramConstraint>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgramConstraint {
    Include(BTreeSet<ProgramId>),
    /// Jobs without a program are kept.
    Exclude(BTreeSet<ProgramId>),
}

impl JobQuery {
    /// Whether a job row satisfies the predicate. The in-memory directory evaluates with this;
    /// the Postgres directory renders the same clauses as SQL.
    pub fn matches(&self, job: &UniversityJob) -> bool {
        if job.coach_id.is_none() || job.is_deleted {
            return false;
        }

        if let Some(allowed) = &self.university_ids {
            match job.university_id {
                Some(id) if allowed.contains(&id) => {}
                _ => return false,
            }
        }

        if let Some(id) = job.university_id {
            if self.excluded_university_ids.contains(&id) {
                return false;
            }
        }

        match (&self.programs, job.program_id) {
            (Some(ProgramConstraint::Include(ids)), Some(id)) => ids.contains(&id),
            (Some(ProgramConstraint::Include(_)), None) => false,
            (Some(ProgramConstraint::Exclude(ids)), Some(id)) => !ids.contains(&id),
            _ => true,
        }
    }
}

/// Offset window over rows ordered by job id ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowRange {
    pub offset: u64,
    pub limit: u64,
}

impl RowRange {
    /// 1-indexed page to offset window.
    pub fn for_page(page: u32, page_size: u32) -> Self {
        let page_size = u64::from(page_size);
        Self {
            offset: u64::from(page.saturating_sub(1)) * page_size,
            limit: page_size,
        }
    }
}

/// University row joined with its division and conference names, in membership order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinedUniversity {
    #[serde(flatten)]
    pub university: University,
    #[serde(default)]
    pub divisions: Vec<String>,
    #[serde(default)]
    pub conferences: Vec<String>,
}

/// Nested result of the jobs ⋈ coaches ⋈ universities ⋈ programs query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobJoinRow {
    pub job: UniversityJob,
    pub coach: Option<Coach>,
    pub university: Option<JoinedUniversity>,
    pub program: Option<Program>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DivisionCount {
    pub name: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UniversityCount {
    pub id: UniversityId,
    pub name: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramCount {
    pub id: ProgramId,
    pub name: String,
    pub university_id: UniversityId,
    pub count: u64,
}

/// Typed read access to the recruiting schema.
#[async_trait]
pub trait CoachDirectory: Send + Sync {
    /// Universities holding at least one of the named divisions.
    async fn universities_in_divisions(
        &self,
        division_names: &[String],
    ) -> Result<BTreeSet<UniversityId>, DirectoryError>;

    /// Universities whose non-null `total_yearly_cost` satisfies `condition`, optionally
    /// restricted to `scope`.
    async fn universities_by_tuition(
        &self,
        condition: TuitionCondition,
        scope: Option<&BTreeSet<UniversityId>>,
    ) -> Result<BTreeSet<UniversityId>, DirectoryError>;

    async fn count_jobs(&self, query: &JobQuery) -> Result<u64, DirectoryError>;

    async fn fetch_jobs(
        &self,
        query: &JobQuery,
        range: RowRange,
    ) -> Result<Vec<JobJoinRow>, DirectoryError>;

    async fn division_counts(
        &self,
        selection: &FacetSelection,
    ) -> Result<Vec<DivisionCount>, DirectoryError>;

    async fn university_counts(
        &self,
        selection: &FacetSelection,
    ) -> Result<Vec<UniversityCount>, DirectoryError>;

    async fn program_counts(
        &self,
        selection: &FacetSelection,
    ) -> Result<Vec<ProgramCount>, DirectoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("database query failed: {0}")]
    Query(#[from] sqlx::Error),
    #[error("directory unavailable: {0}")]
    Unavailable(String),
    #[error("unexpected row shape: {0}")]
    Decode(String),
}
