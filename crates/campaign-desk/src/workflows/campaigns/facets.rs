use serde::{Deserialize, Serialize};
use tracing::warn;

use super::directory::{
    CoachDirectory, DirectoryError, DivisionCount, ProgramCount, UniversityCount,
};
use super::filters::FacetSelection;

/// Dropdown values with the number of coach/job rows each would match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoachFilterOptions {
    pub divisions: Vec<DivisionCount>,
    pub universities: Vec<UniversityCount>,
    pub programs: Vec<ProgramCount>,
}

/// Runs the three facet counts concurrently. Each facet is conditioned on the other facets'
/// selections but never on its own. A failing facet is logged and comes back empty while the
/// remaining facets are still returned.
pub async fn coach_filter_options<D>(directory: &D, selection: &FacetSelection) -> CoachFilterOptions
where
    D: CoachDirectory + ?Sized,
{
    let division_selection = selection.without_divisions();
    let university_selection = selection.without_universities();
    let program_selection = selection.without_programs();

    let (divisions, universities, programs) = tokio::join!(
        directory.division_counts(&division_selection),
        directory.university_counts(&university_selection),
        directory.program_counts(&program_selection),
    );

    let mut divisions = degrade("divisions", divisions);
    let mut universities = degrade("universities", universities);
    let mut programs = degrade("programs", programs);

    divisions.sort_by_cached_key(|entry| entry.name.to_lowercase());
    universities.sort_by_cached_key(|entry| entry.name.to_lowercase());
    programs.sort_by_cached_key(|entry| entry.name.to_lowercase());

    CoachFilterOptions {
        divisions,
        universities,
        programs,
    }
}

fn degrade<T>(facet: &'static str, result: Result<Vec<T>, DirectoryError>) -> Vec<T> {
    result.unwrap_or_else(|err| {
        warn!(facet, error = %err, "facet count query failed; returning no options");
        Vec::new()
    })
}
