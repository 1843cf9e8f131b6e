use std::collections::BTreeSet;

use tracing::debug;

use super::directory::{CoachDirectory, DirectoryError, JobQuery, ProgramConstraint};
use super::domain::UniversityId;
use super::filters::{CoachFilters, FilterError};

/// University ids accumulated across facets. Inclusion sets intersect; exclusion sets union.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UniversityScope {
    include: Option<BTreeSet<UniversityId>>,
    exclude: BTreeSet<UniversityId>,
}

impl UniversityScope {
    /// Intersects the inclusion set with `ids`. The first call seeds it.
    pub fn restrict(&mut self, ids: BTreeSet<UniversityId>) {
        self.include = Some(match self.include.take() {
            Some(current) => current.intersection(&ids).copied().collect(),
            None => ids,
        });
    }

    pub fn exclude(&mut self, ids: impl IntoIterator<Item = UniversityId>) {
        self.exclude.extend(ids);
    }

    pub fn included(&self) -> Option<&BTreeSet<UniversityId>> {
        self.include.as_ref()
    }

    pub fn excluded(&self) -> &BTreeSet<UniversityId> {
        &self.exclude
    }

    /// True once an inclusion facet has narrowed the candidates to nothing.
    pub fn is_exhausted(&self) -> bool {
        self.include.as_ref().is_some_and(BTreeSet::is_empty)
    }
}

/// Outcome of resolving filters into university ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeResolution {
    /// An inclusion facet matched no university; no coach can match.
    NoMatches,
    Scoped(UniversityScope),
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error(transparent)]
    Filter(#[from] FilterError),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

/// Resolves the university, division and tuition facets, stopping at the first inclusion facet
/// that leaves no candidate university.
pub async fn resolve_university_scope<D>(
    directory: &D,
    filters: &CoachFilters,
) -> Result<ScopeResolution, ResolveError>
where
    D: CoachDirectory + ?Sized,
{
    let mut scope = UniversityScope::default();

    if let Some(universities) = filters.active_universities() {
        let ids: BTreeSet<UniversityId> = universities.values.iter().copied().collect();
        if universities.operator.is_negated() {
            scope.exclude(ids);
        } else {
            scope.restrict(ids);
        }
    }

    if let Some(divisions) = filters.active_divisions() {
        let matched = directory
            .universities_in_divisions(&divisions.values)
            .await?;
        if divisions.operator.is_negated() {
            scope.exclude(matched);
        } else {
            scope.restrict(matched);
        }
        if scope.is_exhausted() {
            debug!(divisions = ?divisions.values, "division filter matched no universities");
            return Ok(ScopeResolution::NoMatches);
        }
    }

    if let Some(tuition) = filters.tuition_filter() {
        let conditions = tuition.conditions()?;
        let mut matched = BTreeSet::new();
        for condition in conditions {
            let ids = directory
                .universities_by_tuition(condition, scope.included())
                .await?;
            matched.extend(ids);
        }
        scope.restrict(matched);
        if scope.is_exhausted() {
            debug!(operator = ?tuition.operator, "tuition filter matched no universities");
            return Ok(ScopeResolution::NoMatches);
        }
    }

    Ok(ScopeResolution::Scoped(scope))
}

/// Builds the shared job predicate from a resolved scope and the program facet.
pub fn job_query(scope: UniversityScope, filters: &CoachFilters) -> JobQuery {
    let programs = filters.active_programs().map(|programs| {
        let ids = programs.values.iter().copied().collect();
        if programs.operator.is_negated() {
            ProgramConstraint::Exclude(ids)
        } else {
            ProgramConstraint::Include(ids)
        }
    });

    JobQuery {
        university_ids: scope.include,
        excluded_university_ids: scope.exclude,
        programs,
    }
}
