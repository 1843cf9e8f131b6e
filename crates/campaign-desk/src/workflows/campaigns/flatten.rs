use super::directory::JobJoinRow;
use super::domain::CampaignCoachData;

/// Flattens joined job rows, one record per coach per job. Rows whose coach relation is null
/// are dropped. Only the first division and conference of a university are surfaced.
pub fn flatten_rows(rows: Vec<JobJoinRow>) -> Vec<CampaignCoachData> {
    rows.into_iter().filter_map(flatten_row).collect()
}

pub fn flatten_row(row: JobJoinRow) -> Option<CampaignCoachData> {
    let JobJoinRow {
        job,
        coach,
        university,
        program,
    } = row;
    let coach = coach?;

    let (university, division, conference) = match university {
        Some(joined) => {
            let division = joined.divisions.into_iter().next();
            let conference = joined.conferences.into_iter().next();
            (Some(joined.university), division, conference)
        }
        None => (None, None, None),
    };
    let university = university.as_ref();

    Some(CampaignCoachData {
        coach_id: coach.id,
        job_id: job.id,
        coach_name: coach.full_name,
        email: coach.email,
        phone: coach.phone,
        twitter: coach.twitter_url,
        instagram: coach.instagram_url,
        linkedin: coach.linkedin_url,
        job_title: job.job_title,
        work_email: job.work_email,
        work_phone: job.work_phone,
        start_date: job.start_date,
        end_date: job.end_date,
        university_id: university.map(|u| u.id).or(job.university_id),
        university_name: university.map(|u| u.name.clone()),
        city: university.and_then(|u| u.city.clone()),
        state: university.and_then(|u| u.state.clone()),
        region: university.and_then(|u| u.region.clone()),
        website: university.and_then(|u| u.website.clone()),
        division,
        conference,
        program_id: program.as_ref().map(|p| p.id).or(job.program_id),
        program_gender: program.and_then(|p| p.gender),
        total_yearly_cost: university.and_then(|u| u.total_yearly_cost),
        acceptance_rate: university.and_then(|u| u.acceptance_rate),
        gpa_25: university.and_then(|u| u.gpa_25),
        gpa_75: university.and_then(|u| u.gpa_75),
        sat_reading_25: university.and_then(|u| u.sat_reading_25),
        sat_reading_75: university.and_then(|u| u.sat_reading_75),
        sat_math_25: university.and_then(|u| u.sat_math_25),
        sat_math_75: university.and_then(|u| u.sat_math_75),
        act_composite_25: university.and_then(|u| u.act_composite_25),
        act_composite_75: university.and_then(|u| u.act_composite_75),
    })
}
