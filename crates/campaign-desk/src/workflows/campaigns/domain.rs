use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$name> for Uuid {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

id_type!(UniversityId);
id_type!(ProgramId);
id_type!(CoachId);
id_type!(
    /// Row id in `university_jobs`; also the stable page ordering key.
    JobId
);
id_type!(DivisionId);
id_type!(ConferenceId);
id_type!(CampaignId);
id_type!(LeadListId);

/// A row of `universities`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct University {
    pub id: UniversityId,
    pub name: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub total_yearly_cost: Option<f64>,
    #[serde(default)]
    pub acceptance_rate: Option<f64>,
    #[serde(default)]
    pub gpa_25: Option<f64>,
    #[serde(default)]
    pub gpa_75: Option<f64>,
    #[serde(default)]
    pub sat_reading_25: Option<i32>,
    #[serde(default)]
    pub sat_reading_75: Option<i32>,
    #[serde(default)]
    pub sat_math_25: Option<i32>,
    #[serde(default)]
    pub sat_math_75: Option<i32>,
    #[serde(default)]
    pub act_composite_25: Option<i32>,
    #[serde(default)]
    pub act_composite_75: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Division {
    pub id: DivisionId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conference {
    pub id: ConferenceId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniversityDivision {
    pub university_id: UniversityId,
    pub division_id: DivisionId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniversityConference {
    pub university_id: UniversityId,
    pub conference_id: ConferenceId,
}

/// A sport program hosted by a university, scoped to a gender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub id: ProgramId,
    pub university_id: UniversityId,
    #[serde(default)]
    pub gender: Option<String>,
}

impl Program {
    /// Dropdown label, e.g. `Ohio State University (Women)`.
    pub fn label(&self, university_name: &str) -> String {
        program_label(university_name, self.gender.as_deref())
    }
}

pub fn program_label(university_name: &str, gender: Option<&str>) -> String {
    match gender.and_then(gender_label) {
        Some(gender) => format!("{university_name} ({gender})"),
        None => university_name.to_string(),
    }
}

/// `women` -> `Women`. Blank scopes have no label.
pub fn gender_label(gender: &str) -> Option<String> {
    let mut chars = gender.trim().chars();
    let first = chars.next()?;
    Some(first.to_uppercase().chain(chars).collect())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coach {
    pub id: CoachId,
    pub full_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub twitter_url: Option<String>,
    #[serde(default)]
    pub instagram_url: Option<String>,
    #[serde(default)]
    pub linkedin_url: Option<String>,
}

/// Employment record linking a coach to a university program. Soft-deleted via `is_deleted`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniversityJob {
    pub id: JobId,
    #[serde(default)]
    pub coach_id: Option<CoachId>,
    #[serde(default)]
    pub university_id: Option<UniversityId>,
    #[serde(default)]
    pub program_id: Option<ProgramId>,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub work_email: Option<String>,
    #[serde(default)]
    pub work_phone: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub is_deleted: bool,
}

/// One coach/job pairing flattened for table display and CSV rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignCoachData {
    pub coach_id: CoachId,
    pub job_id: JobId,
    pub coach_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub twitter: Option<String>,
    pub instagram: Option<String>,
    pub linkedin: Option<String>,
    pub job_title: Option<String>,
    pub work_email: Option<String>,
    pub work_phone: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub university_id: Option<UniversityId>,
    pub university_name: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub region: Option<String>,
    pub website: Option<String>,
    pub division: Option<String>,
    pub conference: Option<String>,
    pub program_id: Option<ProgramId>,
    pub program_gender: Option<String>,
    pub total_yearly_cost: Option<f64>,
    pub acceptance_rate: Option<f64>,
    pub gpa_25: Option<f64>,
    pub gpa_75: Option<f64>,
    pub sat_reading_25: Option<i32>,
    pub sat_reading_75: Option<i32>,
    pub sat_math_25: Option<i32>,
    pub sat_math_75: Option<i32>,
    pub act_composite_25: Option<i32>,
    pub act_composite_75: Option<i32>,
}

/// Offset pagination metadata returned next to every coach page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
    pub total_count: u64,
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(page: u32, page_size: u32, total_count: u64) -> Self {
        let total_pages = if page_size == 0 {
            0
        } else {
            total_count.div_ceil(u64::from(page_size))
        };
        Self {
            page,
            page_size,
            total_count,
            total_pages,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignCoachesPage {
    pub data: Vec<CampaignCoachData>,
    pub pagination: Pagination,
}

impl CampaignCoachesPage {
    pub fn empty(page: u32, page_size: u32) -> Self {
        Self {
            data: Vec::new(),
            pagination: Pagination::new(page, page_size, 0),
        }
    }
}
