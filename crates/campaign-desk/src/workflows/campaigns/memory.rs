use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::Read;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::directory::{
    CoachDirectory, DirectoryError, DivisionCount, JobJoinRow, JobQuery, JoinedUniversity,
    ProgramCount, RowRange, UniversityCount,
};
use super::domain::{
    Coach, CoachId, Conference, Division, Program, ProgramId, University, UniversityConference,
    UniversityDivision, UniversityId, UniversityJob,
};
use super::filters::{FacetSelection, TuitionCondition};

/// Table dump of the recruiting schema, as loaded from a JSON snapshot file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectorySnapshot {
    #[serde(default)]
    pub universities: Vec<University>,
    #[serde(default)]
    pub divisions: Vec<Division>,
    #[serde(default)]
    pub university_divisions: Vec<UniversityDivision>,
    #[serde(default)]
    pub conferences: Vec<Conference>,
    #[serde(default)]
    pub university_conferences: Vec<UniversityConference>,
    #[serde(default)]
    pub programs: Vec<Program>,
    #[serde(default)]
    pub coaches: Vec<Coach>,
    #[serde(default)]
    pub jobs: Vec<UniversityJob>,
}

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("failed to read directory snapshot: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid directory snapshot: {0}")]
    Json(#[from] serde_json::Error),
}

impl DirectorySnapshot {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, SnapshotError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_reader(reader)?)
    }
}

/// Evaluates the directory contract over an in-memory snapshot, joining tables the way the
/// Postgres queries do.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCoachDirectory {
    universities: BTreeMap<UniversityId, University>,
    division_names: HashMap<UniversityId, Vec<String>>,
    conference_names: HashMap<UniversityId, Vec<String>>,
    programs: HashMap<ProgramId, Program>,
    coaches: HashMap<CoachId, Coach>,
    jobs: Vec<UniversityJob>,
}

impl InMemoryCoachDirectory {
    pub fn new(snapshot: DirectorySnapshot) -> Self {
        let DirectorySnapshot {
            universities,
            divisions,
            university_divisions,
            conferences,
            university_conferences,
            programs,
            coaches,
            mut jobs,
        } = snapshot;

        let division_lookup: HashMap<_, _> = divisions
            .into_iter()
            .map(|division| (division.id, division.name))
            .collect();
        let mut division_names: HashMap<UniversityId, Vec<String>> = HashMap::new();
        for membership in university_divisions {
            if let Some(name) = division_lookup.get(&membership.division_id) {
                division_names
                    .entry(membership.university_id)
                    .or_default()
                    .push(name.clone());
            }
        }

        let conference_lookup: HashMap<_, _> = conferences
            .into_iter()
            .map(|conference| (conference.id, conference.name))
            .collect();
        let mut conference_names: HashMap<UniversityId, Vec<String>> = HashMap::new();
        for membership in university_conferences {
            if let Some(name) = conference_lookup.get(&membership.conference_id) {
                conference_names
                    .entry(membership.university_id)
                    .or_default()
                    .push(name.clone());
            }
        }

        jobs.sort_by_key(|job| job.id);

        Self {
            universities: universities
                .into_iter()
                .map(|university| (university.id, university))
                .collect(),
            division_names,
            conference_names,
            programs: programs
                .into_iter()
                .map(|program| (program.id, program))
                .collect(),
            coaches: coaches.into_iter().map(|coach| (coach.id, coach)).collect(),
            jobs,
        }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, SnapshotError> {
        DirectorySnapshot::from_path(path).map(Self::new)
    }

    fn divisions_of(&self, university: Option<UniversityId>) -> &[String] {
        university
            .and_then(|id| self.division_names.get(&id))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Live coach/job rows narrowed by a dropdown selection.
    fn selected_jobs<'a>(
        &'a self,
        selection: &'a FacetSelection,
    ) -> impl Iterator<Item = &'a UniversityJob> + 'a {
        let base = JobQuery::default();
        self.jobs.iter().filter(move |job| {
            if !base.matches(job) {
                return false;
            }
            if !selection.divisions.is_empty()
                && !self
                    .divisions_of(job.university_id)
                    .iter()
                    .any(|name| selection.divisions.contains(name))
            {
                return false;
            }
            if !selection.university_ids.is_empty()
                && !job
                    .university_id
                    .is_some_and(|id| selection.university_ids.contains(&id))
            {
                return false;
            }
            if !selection.program_ids.is_empty()
                && !job
                    .program_id
                    .is_some_and(|id| selection.program_ids.contains(&id))
            {
                return false;
            }
            true
        })
    }

    fn join(&self, job: &UniversityJob) -> JobJoinRow {
        let university = job
            .university_id
            .and_then(|id| self.universities.get(&id))
            .map(|university| JoinedUniversity {
                university: university.clone(),
                divisions: self.divisions_of(Some(university.id)).to_vec(),
                conferences: self
                    .conference_names
                    .get(&university.id)
                    .cloned()
                    .unwrap_or_default(),
            });

        JobJoinRow {
            job: job.clone(),
            coach: job.coach_id.and_then(|id| self.coaches.get(&id)).cloned(),
            university,
            program: job.program_id.and_then(|id| self.programs.get(&id)).cloned(),
        }
    }
}

#[async_trait]
impl CoachDirectory for InMemoryCoachDirectory {
    async fn universities_in_divisions(
        &self,
        division_names: &[String],
    ) -> Result<BTreeSet<UniversityId>, DirectoryError> {
        Ok(self
            .division_names
            .iter()
            .filter(|(_, names)| names.iter().any(|name| division_names.contains(name)))
            .map(|(id, _)| *id)
            .collect())
    }

    async fn universities_by_tuition(
        &self,
        condition: TuitionCondition,
        scope: Option<&BTreeSet<UniversityId>>,
    ) -> Result<BTreeSet<UniversityId>, DirectoryError> {
        Ok(self
            .universities
            .values()
            .filter(|university| scope.map_or(true, |scope| scope.contains(&university.id)))
            .filter(|university| {
                university
                    .total_yearly_cost
                    .is_some_and(|cost| condition.matches(cost))
            })
            .map(|university| university.id)
            .collect())
    }

    async fn count_jobs(&self, query: &JobQuery) -> Result<u64, DirectoryError> {
        Ok(self.jobs.iter().filter(|job| query.matches(job)).count() as u64)
    }

    async fn fetch_jobs(
        &self,
        query: &JobQuery,
        range: RowRange,
    ) -> Result<Vec<JobJoinRow>, DirectoryError> {
        let offset = usize::try_from(range.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(range.limit).unwrap_or(usize::MAX);
        Ok(self
            .jobs
            .iter()
            .filter(|job| query.matches(job))
            .skip(offset)
            .take(limit)
            .map(|job| self.join(job))
            .collect())
    }

    async fn division_counts(
        &self,
        selection: &FacetSelection,
    ) -> Result<Vec<DivisionCount>, DirectoryError> {
        let mut counts: BTreeMap<String, u64> = BTreeMap::new();
        for job in self.selected_jobs(selection) {
            for name in self.divisions_of(job.university_id) {
                *counts.entry(name.clone()).or_default() += 1;
            }
        }
        Ok(counts
            .into_iter()
            .map(|(name, count)| DivisionCount { name, count })
            .collect())
    }

    async fn university_counts(
        &self,
        selection: &FacetSelection,
    ) -> Result<Vec<UniversityCount>, DirectoryError> {
        let mut counts: BTreeMap<UniversityId, u64> = BTreeMap::new();
        for job in self.selected_jobs(selection) {
            if let Some(id) = job.university_id {
                *counts.entry(id).or_default() += 1;
            }
        }
        Ok(counts
            .into_iter()
            .filter_map(|(id, count)| {
                self.universities.get(&id).map(|university| UniversityCount {
                    id,
                    name: university.name.clone(),
                    count,
                })
            })
            .collect())
    }

    async fn program_counts(
        &self,
        selection: &FacetSelection,
    ) -> Result<Vec<ProgramCount>, DirectoryError> {
        let mut counts: BTreeMap<ProgramId, u64> = BTreeMap::new();
        for job in self.selected_jobs(selection) {
            if let Some(id) = job.program_id {
                *counts.entry(id).or_default() += 1;
            }
        }
        Ok(counts
            .into_iter()
            .filter_map(|(id, count)| {
                let program = self.programs.get(&id)?;
                let university_name = self
                    .universities
                    .get(&program.university_id)
                    .map(|university| university.name.as_str())
                    .unwrap_or("Unknown university");
                Some(ProgramCount {
                    id,
                    name: program.label(university_name),
                    university_id: program.university_id,
                    count,
                })
            })
            .collect())
    }
}
