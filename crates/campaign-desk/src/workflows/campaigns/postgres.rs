//! sqlx-backed directory and lead-list storage over the recruiting schema.

use std::collections::BTreeSet;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow, Postgres};
use sqlx::{QueryBuilder, Row};
use uuid::Uuid;

use super::directory::{
    CoachDirectory, DirectoryError, DivisionCount, JobJoinRow, JobQuery, JoinedUniversity,
    ProgramConstraint, ProgramCount, RowRange, UniversityCount,
};
use super::domain::{
    program_label, CampaignId, Coach, CoachId, JobId, LeadListId, Program, ProgramId, University,
    UniversityId, UniversityJob,
};
use super::export::lead_lists::{LeadListError, LeadListRecord, LeadListRepository};
use super::filters::{FacetSelection, TuitionCondition};

const JOB_COLUMNS: &str = "SELECT \
    j.id AS job_id, j.coach_id, j.university_id, j.program_id, j.job_title, j.work_email, \
    j.work_phone, j.start_date, j.end_date, j.is_deleted, \
    c.id AS coach_row_id, c.full_name, c.email, c.phone, c.twitter_url, c.instagram_url, \
    c.linkedin_url, \
    u.id AS university_row_id, u.name AS university_name, u.city, u.state, u.region, u.website, \
    u.total_yearly_cost::float8 AS total_yearly_cost, \
    u.acceptance_rate::float8 AS acceptance_rate, \
    u.gpa_25::float8 AS gpa_25, u.gpa_75::float8 AS gpa_75, \
    u.sat_reading_25::int4 AS sat_reading_25, u.sat_reading_75::int4 AS sat_reading_75, \
    u.sat_math_25::int4 AS sat_math_25, u.sat_math_75::int4 AS sat_math_75, \
    u.act_composite_25::int4 AS act_composite_25, u.act_composite_75::int4 AS act_composite_75, \
    ARRAY(SELECT d.name FROM university_divisions ud \
          JOIN divisions d ON d.id = ud.division_id \
          WHERE ud.university_id = u.id) AS division_names, \
    ARRAY(SELECT cf.name FROM university_conferences uc \
          JOIN conferences cf ON cf.id = uc.conference_id \
          WHERE uc.university_id = u.id) AS conference_names, \
    p.id AS program_row_id, p.university_id AS program_university_id, p.gender \
    FROM university_jobs j \
    LEFT JOIN coaches c ON c.id = j.coach_id \
    LEFT JOIN universities u ON u.id = j.university_id \
    LEFT JOIN programs p ON p.id = j.program_id";

#[derive(Debug, Clone)]
pub struct PgCoachDirectory {
    pool: PgPool,
}

impl PgCoachDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn uuids<I, T>(ids: I) -> Vec<Uuid>
where
    I: IntoIterator<Item = T>,
    T: Into<Uuid>,
{
    ids.into_iter().map(Into::into).collect()
}

/// Appends the `WHERE` clause for `query`. Count and page queries both go through here.
fn push_job_predicate(builder: &mut QueryBuilder<'_, Postgres>, query: &JobQuery) {
    builder.push(" WHERE j.coach_id IS NOT NULL AND j.is_deleted = false");

    if let Some(ids) = &query.university_ids {
        builder
            .push(" AND j.university_id = ANY(")
            .push_bind(uuids(ids.iter().copied()))
            .push(")");
    }

    if !query.excluded_university_ids.is_empty() {
        builder
            .push(" AND (j.university_id IS NULL OR j.university_id <> ALL(")
            .push_bind(uuids(query.excluded_university_ids.iter().copied()))
            .push("))");
    }

    match &query.programs {
        Some(ProgramConstraint::Include(ids)) => {
            builder
                .push(" AND j.program_id = ANY(")
                .push_bind(uuids(ids.iter().copied()))
                .push(")");
        }
        Some(ProgramConstraint::Exclude(ids)) => {
            builder
                .push(" AND (j.program_id IS NULL OR j.program_id <> ALL(")
                .push_bind(uuids(ids.iter().copied()))
                .push("))");
        }
        None => {}
    }
}

pub(crate) fn count_query(query: &JobQuery) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new("SELECT COUNT(*) AS total FROM university_jobs j");
    push_job_predicate(&mut builder, query);
    builder
}

pub(crate) fn page_query(query: &JobQuery, range: RowRange) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(JOB_COLUMNS);
    push_job_predicate(&mut builder, query);
    builder
        .push(" ORDER BY j.id ASC LIMIT ")
        .push_bind(i64::try_from(range.limit).unwrap_or(i64::MAX))
        .push(" OFFSET ")
        .push_bind(i64::try_from(range.offset).unwrap_or(i64::MAX));
    builder
}

fn tuition_query(
    condition: TuitionCondition,
    scope: Option<&BTreeSet<UniversityId>>,
) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(
        "SELECT id FROM universities WHERE total_yearly_cost IS NOT NULL AND total_yearly_cost",
    );
    match condition {
        TuitionCondition::Equal(value) => {
            builder.push(" = ").push_bind(value);
        }
        TuitionCondition::NotEqual(value) => {
            builder.push(" <> ").push_bind(value);
        }
        TuitionCondition::Between { min, max } => {
            builder
                .push(" BETWEEN ")
                .push_bind(min)
                .push(" AND ")
                .push_bind(max);
        }
        TuitionCondition::LessThan(value) => {
            builder.push(" < ").push_bind(value);
        }
        TuitionCondition::LessThanOrEqual(value) => {
            builder.push(" <= ").push_bind(value);
        }
        TuitionCondition::GreaterThan(value) => {
            builder.push(" > ").push_bind(value);
        }
        TuitionCondition::GreaterThanOrEqual(value) => {
            builder.push(" >= ").push_bind(value);
        }
    }
    if let Some(scope) = scope {
        builder
            .push(" AND id = ANY(")
            .push_bind(uuids(scope.iter().copied()))
            .push(")");
    }
    builder
}

/// Facet RPCs take `NULL` for a facet that is not selected.
fn facet_args(
    selection: &FacetSelection,
) -> (Option<Vec<String>>, Option<Vec<Uuid>>, Option<Vec<Uuid>>) {
    let divisions = (!selection.divisions.is_empty()).then(|| selection.divisions.clone());
    let universities = (!selection.university_ids.is_empty())
        .then(|| uuids(selection.university_ids.iter().copied()));
    let programs = (!selection.program_ids.is_empty())
        .then(|| uuids(selection.program_ids.iter().copied()));
    (divisions, universities, programs)
}

fn count_column(row: &PgRow) -> Result<u64, DirectoryError> {
    let count: i64 = row.try_get("coach_count")?;
    u64::try_from(count).map_err(|_| DirectoryError::Decode(format!("negative count {count}")))
}

fn decode_job_row(row: &PgRow) -> Result<JobJoinRow, DirectoryError> {
    let job = UniversityJob {
        id: JobId(row.try_get("job_id")?),
        coach_id: row.try_get::<Option<Uuid>, _>("coach_id")?.map(CoachId),
        university_id: row.try_get::<Option<Uuid>, _>("university_id")?.map(UniversityId),
        program_id: row.try_get::<Option<Uuid>, _>("program_id")?.map(ProgramId),
        job_title: row.try_get("job_title")?,
        work_email: row.try_get("work_email")?,
        work_phone: row.try_get("work_phone")?,
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        is_deleted: row.try_get::<Option<bool>, _>("is_deleted")?.unwrap_or(false),
    };

    let coach = match row.try_get::<Option<Uuid>, _>("coach_row_id")? {
        Some(id) => Some(Coach {
            id: CoachId(id),
            full_name: row
                .try_get::<Option<String>, _>("full_name")?
                .unwrap_or_default(),
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            twitter_url: row.try_get("twitter_url")?,
            instagram_url: row.try_get("instagram_url")?,
            linkedin_url: row.try_get("linkedin_url")?,
        }),
        None => None,
    };

    let university = match row.try_get::<Option<Uuid>, _>("university_row_id")? {
        Some(id) => Some(JoinedUniversity {
            university: University {
                id: UniversityId(id),
                name: row
                    .try_get::<Option<String>, _>("university_name")?
                    .unwrap_or_default(),
                city: row.try_get("city")?,
                state: row.try_get("state")?,
                region: row.try_get("region")?,
                website: row.try_get("website")?,
                total_yearly_cost: row.try_get("total_yearly_cost")?,
                acceptance_rate: row.try_get("acceptance_rate")?,
                gpa_25: row.try_get("gpa_25")?,
                gpa_75: row.try_get("gpa_75")?,
                sat_reading_25: row.try_get("sat_reading_25")?,
                sat_reading_75: row.try_get("sat_reading_75")?,
                sat_math_25: row.try_get("sat_math_25")?,
                sat_math_75: row.try_get("sat_math_75")?,
                act_composite_25: row.try_get("act_composite_25")?,
                act_composite_75: row.try_get("act_composite_75")?,
            },
            divisions: row.try_get("division_names")?,
            conferences: row.try_get("conference_names")?,
        }),
        None => None,
    };

    let program = match row.try_get::<Option<Uuid>, _>("program_row_id")? {
        Some(id) => Some(Program {
            id: ProgramId(id),
            university_id: UniversityId(row.try_get("program_university_id")?),
            gender: row.try_get("gender")?,
        }),
        None => None,
    };

    Ok(JobJoinRow {
        job,
        coach,
        university,
        program,
    })
}

#[async_trait]
impl CoachDirectory for PgCoachDirectory {
    async fn universities_in_divisions(
        &self,
        division_names: &[String],
    ) -> Result<BTreeSet<UniversityId>, DirectoryError> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT ud.university_id
            FROM university_divisions ud
            JOIN divisions d ON d.id = ud.division_id
            WHERE d.name = ANY($1)
            "#,
        )
        .bind(division_names)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| row.try_get("university_id").map(UniversityId))
            .collect::<Result<_, _>>()
            .map_err(DirectoryError::from)
    }

    async fn universities_by_tuition(
        &self,
        condition: TuitionCondition,
        scope: Option<&BTreeSet<UniversityId>>,
    ) -> Result<BTreeSet<UniversityId>, DirectoryError> {
        let mut builder = tuition_query(condition, scope);
        let rows = builder.build().fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| row.try_get("id").map(UniversityId))
            .collect::<Result<_, _>>()
            .map_err(DirectoryError::from)
    }

    async fn count_jobs(&self, query: &JobQuery) -> Result<u64, DirectoryError> {
        let mut builder = count_query(query);
        let row = builder.build().fetch_one(&self.pool).await?;
        let total: i64 = row.try_get("total")?;
        u64::try_from(total).map_err(|_| DirectoryError::Decode(format!("negative count {total}")))
    }

    async fn fetch_jobs(
        &self,
        query: &JobQuery,
        range: RowRange,
    ) -> Result<Vec<JobJoinRow>, DirectoryError> {
        let mut builder = page_query(query, range);
        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(decode_job_row).collect()
    }

    async fn division_counts(
        &self,
        selection: &FacetSelection,
    ) -> Result<Vec<DivisionCount>, DirectoryError> {
        let (divisions, universities, programs) = facet_args(selection);
        let rows = sqlx::query(
            "SELECT division_name, coach_count FROM get_filtered_coach_division_counts($1, $2, $3)",
        )
        .bind(divisions)
        .bind(universities)
        .bind(programs)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<DivisionCount, DirectoryError> {
                Ok(DivisionCount {
                    name: row.try_get("division_name")?,
                    count: count_column(row)?,
                })
            })
            .collect()
    }

    async fn university_counts(
        &self,
        selection: &FacetSelection,
    ) -> Result<Vec<UniversityCount>, DirectoryError> {
        let (divisions, universities, programs) = facet_args(selection);
        let rows = sqlx::query(
            "SELECT university_id, university_name, coach_count \
             FROM get_filtered_coach_university_counts($1, $2, $3)",
        )
        .bind(divisions)
        .bind(universities)
        .bind(programs)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<UniversityCount, DirectoryError> {
                Ok(UniversityCount {
                    id: UniversityId(row.try_get("university_id")?),
                    name: row.try_get("university_name")?,
                    count: count_column(row)?,
                })
            })
            .collect()
    }

    async fn program_counts(
        &self,
        selection: &FacetSelection,
    ) -> Result<Vec<ProgramCount>, DirectoryError> {
        let (divisions, universities, programs) = facet_args(selection);
        let rows = sqlx::query(
            "SELECT program_id, university_id, university_name, gender, coach_count \
             FROM get_filtered_coach_program_counts($1, $2, $3)",
        )
        .bind(divisions)
        .bind(universities)
        .bind(programs)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<ProgramCount, DirectoryError> {
                let university_name: String = row.try_get("university_name")?;
                let gender: Option<String> = row.try_get("gender")?;
                Ok(ProgramCount {
                    id: ProgramId(row.try_get("program_id")?),
                    name: program_label(&university_name, gender.as_deref()),
                    university_id: UniversityId(row.try_get("university_id")?),
                    count: count_column(row)?,
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct PgLeadListRepository {
    pool: PgPool,
}

impl PgLeadListRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn decode_lead_list(row: &PgRow) -> Result<LeadListRecord, sqlx::Error> {
    let row_count: i64 = row.try_get("row_count")?;
    Ok(LeadListRecord {
        id: LeadListId(row.try_get("id")?),
        campaign_id: CampaignId(row.try_get("campaign_id")?),
        name: row.try_get("name")?,
        file_path: row.try_get("file_path")?,
        file_url: row.try_get("file_url")?,
        row_count: u64::try_from(row_count).unwrap_or_default(),
        created_by: row.try_get("created_by")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl LeadListRepository for PgLeadListRepository {
    async fn insert(&self, record: LeadListRecord) -> Result<LeadListRecord, LeadListError> {
        let row = sqlx::query(
            r#"
            INSERT INTO sending_tool_lead_lists
            (id, campaign_id, name, file_path, file_url, row_count, created_by, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, campaign_id, name, file_path, file_url, row_count, created_by, created_at
            "#,
        )
        .bind(record.id.0)
        .bind(record.campaign_id.0)
        .bind(&record.name)
        .bind(&record.file_path)
        .bind(&record.file_url)
        .bind(i64::try_from(record.row_count).unwrap_or(i64::MAX))
        .bind(&record.created_by)
        .bind(record.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| {
            let duplicate = err
                .as_database_error()
                .and_then(|db| db.code())
                .is_some_and(|code| code == "23505");
            if duplicate {
                LeadListError::Conflict
            } else {
                LeadListError::Query(err)
            }
        })?;

        Ok(decode_lead_list(&row)?)
    }

    async fn for_campaign(
        &self,
        campaign_id: CampaignId,
    ) -> Result<Vec<LeadListRecord>, LeadListError> {
        let rows = sqlx::query(
            r#"
            SELECT id, campaign_id, name, file_path, file_url, row_count, created_by, created_at
            FROM sending_tool_lead_lists
            WHERE campaign_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(campaign_id.0)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(decode_lead_list)
            .collect::<Result<Vec<_>, _>>()?)
    }
}
