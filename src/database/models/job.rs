use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use tracing::info;

use super::{into_result, nullable, present, search_term, FieldErrors, Validate};
use crate::database::bind::bind_fragment_as;
use crate::database::manager::DatabaseError;
use crate::sql::{
    build_set_fragment, build_where_prefix, contains_pattern, ColumnMap, FilterKey, FilterRequest,
    SqlError, UpdateRequest,
};

static FILTER_COLUMNS: Lazy<ColumnMap> = Lazy::new(|| {
    ColumnMap::from_pairs([
        (FilterKey::TitleLike.as_str(), "title"),
        (FilterKey::MinSalary.as_str(), "salary"),
    ])
});

// equity is NUMERIC; it is read back as text so no precision is lost.
const JOB_COLUMNS: &str = "id, title, salary, equity::TEXT AS equity, company_handle";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: i32,
    pub title: String,
    pub salary: Option<i32>,
    pub equity: Option<String>,
    pub company_handle: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewJob {
    pub title: String,
    pub salary: Option<i32>,
    pub equity: Option<f64>,
    pub company_handle: String,
}

impl Validate for NewJob {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.title.is_empty() {
            errors.insert("title".into(), "must not be empty".into());
        }
        if self.company_handle.is_empty() {
            errors.insert("companyHandle".into(), "must not be empty".into());
        }
        validate_common(self.salary, self.equity, &mut errors);
        into_result(errors)
    }
}

/// PATCH body. Id and company are fixed once a job exists. `Some(None)` clears
/// salary or equity.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct JobUpdate {
    #[serde(default, deserialize_with = "present")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub salary: Option<Option<i32>>,
    #[serde(default, deserialize_with = "nullable")]
    pub equity: Option<Option<f64>>,
}

impl Validate for JobUpdate {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if matches!(self.title.as_deref(), Some("")) {
            errors.insert("title".into(), "must not be empty".into());
        }
        validate_common(self.salary.flatten(), self.equity.flatten(), &mut errors);
        into_result(errors)
    }
}

fn validate_common(salary: Option<i32>, equity: Option<f64>, errors: &mut FieldErrors) {
    if matches!(salary, Some(s) if s < 0) {
        errors.insert("salary".into(), "must be at least 0".into());
    }
    if matches!(equity, Some(e) if !(0.0..=1.0).contains(&e)) {
        errors.insert("equity".into(), "must be between 0 and 1".into());
    }
}

impl From<JobUpdate> for UpdateRequest {
    fn from(update: JobUpdate) -> Self {
        let mut request = UpdateRequest::new();
        if let Some(title) = update.title {
            request.push("title", title);
        }
        if let Some(salary) = update.salary {
            request.push("salary", salary);
        }
        if let Some(equity) = update.equity {
            request.push("equity", equity);
        }
        request
    }
}

/// `GET /jobs` search terms.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobSearch {
    pub title_like: Option<String>,
    pub min_salary: Option<i64>,
}

impl JobSearch {
    const KEYS: [FilterKey; 2] = [FilterKey::TitleLike, FilterKey::MinSalary];

    pub fn from_filter(filter: &FilterRequest) -> Result<Self, SqlError> {
        filter.restrict(&Self::KEYS)?;
        Ok(Self {
            title_like: filter.text(FilterKey::TitleLike).map(str::to_string),
            min_salary: filter.integer(FilterKey::MinSalary)?,
        })
    }

    pub fn to_filter(&self) -> FilterRequest {
        let mut filter = FilterRequest::new();
        if let Some(term) = search_term(&self.title_like) {
            filter.push(FilterKey::TitleLike, contains_pattern(term));
        }
        if let Some(min) = self.min_salary {
            filter.push(FilterKey::MinSalary, min);
        }
        filter
    }
}

impl Job {
    /// Inserts a job. Titles are unique; an unknown company is `NotFound`.
    pub async fn create(pool: &PgPool, data: &NewJob) -> Result<Job, DatabaseError> {
        let existing = sqlx::query_scalar::<_, String>("SELECT title FROM jobs WHERE title = $1")
            .bind(&data.title)
            .fetch_optional(pool)
            .await?;
        if existing.is_some() {
            return Err(DatabaseError::Duplicate(format!("Duplicate job: {}", data.title)));
        }

        let sql = format!(
            "INSERT INTO jobs (title, salary, equity, company_handle) VALUES ($1, $2, $3, $4) RETURNING {}",
            JOB_COLUMNS
        );
        let job = sqlx::query_as::<_, Job>(&sql)
            .bind(&data.title)
            .bind(data.salary)
            .bind(data.equity)
            .bind(&data.company_handle)
            .fetch_one(pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
                    DatabaseError::NotFound(format!("No company: {}", data.company_handle))
                }
                other => DatabaseError::Sqlx(other),
            })?;

        info!("Created job {} for {}", job.id, job.company_handle);
        Ok(job)
    }

    pub async fn find_all(pool: &PgPool, search: &JobSearch) -> Result<Vec<Job>, DatabaseError> {
        let filter = build_where_prefix(&search.to_filter(), &FILTER_COLUMNS);
        let sql = format!("SELECT {} FROM jobs {} ORDER BY title, id", JOB_COLUMNS, filter.sql);
        let jobs = bind_fragment_as(sqlx::query_as::<_, Job>(&sql), &filter)
            .fetch_all(pool)
            .await?;
        Ok(jobs)
    }

    pub async fn find_by_company(pool: &PgPool, handle: &str) -> Result<Vec<Job>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM jobs WHERE company_handle = $1 ORDER BY id",
            JOB_COLUMNS
        );
        let jobs = sqlx::query_as::<_, Job>(&sql).bind(handle).fetch_all(pool).await?;
        Ok(jobs)
    }

    pub async fn get(pool: &PgPool, id: i32) -> Result<Job, DatabaseError> {
        let sql = format!("SELECT {} FROM jobs WHERE id = $1", JOB_COLUMNS);
        sqlx::query_as::<_, Job>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("No job: {}", id)))
    }

    pub async fn update(
        pool: &PgPool,
        id: i32,
        data: &UpdateRequest,
    ) -> Result<Job, DatabaseError> {
        let set = build_set_fragment(data, &ColumnMap::new())?;
        let sql = format!(
            "UPDATE jobs SET {} WHERE id = {} RETURNING {}",
            set.sql,
            set.next_placeholder(),
            JOB_COLUMNS
        );

        let job = bind_fragment_as(sqlx::query_as::<_, Job>(&sql), &set)
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("No job: {}", id)))?;

        info!("Updated job {} ({} fields)", id, set.values.len());
        Ok(job)
    }

    pub async fn remove(pool: &PgPool, id: i32) -> Result<(), DatabaseError> {
        let deleted = sqlx::query_scalar::<_, i32>("DELETE FROM jobs WHERE id = $1 RETURNING id")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        if deleted.is_none() {
            return Err(DatabaseError::NotFound(format!("No job: {}", id)));
        }

        info!("Removed job {}", id);
        Ok(())
    }
}
