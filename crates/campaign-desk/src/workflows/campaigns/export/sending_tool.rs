//! CSV layout expected by the outreach sending tool's lead import.

use std::fmt::Display;

use crate::workflows::campaigns::domain::{gender_label, CampaignCoachData};

pub const SENDING_TOOL_COLUMNS: [&str; 23] = [
    "First Name",
    "Last Name",
    "Email",
    "Phone",
    "Job Title",
    "University",
    "Division",
    "Conference",
    "Program",
    "City",
    "State",
    "Region",
    "Website",
    "Twitter",
    "Instagram",
    "LinkedIn",
    "Yearly Cost",
    "Acceptance Rate",
    "GPA Range",
    "SAT Reading",
    "SAT Math",
    "ACT Composite",
    "Coach ID",
];

/// Renders the header plus one row per record. Fields containing a comma, quote, CR or LF are
/// quoted with internal quotes doubled.
pub fn generate_csv(coaches: &[CampaignCoachData]) -> Result<String, csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Necessary)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(SENDING_TOOL_COLUMNS)?;
    for coach in coaches {
        writer.write_record(sending_tool_row(coach))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|err| csv::Error::from(err.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Quotes a single value the way [`generate_csv`] does.
pub fn escape_csv(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

pub fn sending_tool_row(coach: &CampaignCoachData) -> [String; 23] {
    let (first_name, last_name) = split_name(&coach.coach_name);
    let program = coach.program_gender.as_deref().and_then(gender_label);

    [
        first_name.to_string(),
        last_name.to_string(),
        text(coach.work_email.as_ref().or(coach.email.as_ref())),
        text(coach.work_phone.as_ref().or(coach.phone.as_ref())),
        text(coach.job_title.as_ref()),
        text(coach.university_name.as_ref()),
        coach
            .division
            .as_deref()
            .map(division_code)
            .unwrap_or_default(),
        text(coach.conference.as_ref()),
        text(program.as_ref()),
        text(coach.city.as_ref()),
        text(coach.state.as_ref()),
        text(coach.region.as_ref()),
        text(coach.website.as_ref()),
        text(coach.twitter.as_ref()),
        text(coach.instagram.as_ref()),
        text(coach.linkedin.as_ref()),
        text(coach.total_yearly_cost.as_ref()),
        text(coach.acceptance_rate.as_ref()),
        percentile_range(coach.gpa_25, coach.gpa_75),
        percentile_range(coach.sat_reading_25, coach.sat_reading_75),
        percentile_range(coach.sat_math_25, coach.sat_math_75),
        percentile_range(coach.act_composite_25, coach.act_composite_75),
        coach.coach_id.to_string(),
    ]
}

/// Splits at the first space; a single-word name becomes the first name.
pub fn split_name(full_name: &str) -> (&str, &str) {
    match full_name.trim().split_once(' ') {
        Some((first, last)) => (first, last.trim()),
        None => (full_name.trim(), ""),
    }
}

/// Short division code. `division iii` is tested before `division ii` and `division i` since
/// each is a substring of the next.
pub fn division_code(division: &str) -> String {
    let lower = division.to_lowercase();
    let code = if lower.contains("division iii") {
        "DIII"
    } else if lower.contains("division ii") {
        "DII"
    } else if lower.contains("division i") {
        "DI"
    } else if lower.contains("naia") {
        "NAIA"
    } else if lower.contains("juco") {
        "JUCO"
    } else {
        return division.to_string();
    };
    code.to_string()
}

/// `min-max`, a single bound when only one side is known, or empty.
pub fn percentile_range<T: Display>(min: Option<T>, max: Option<T>) -> String {
    match (min, max) {
        (Some(min), Some(max)) => format!("{min}-{max}"),
        (Some(bound), None) | (None, Some(bound)) => bound.to_string(),
        (None, None) => String::new(),
    }
}

fn text<T: Display>(value: Option<&T>) -> String {
    value.map(ToString::to_string).unwrap_or_default()
}
