use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use tracing::info;

use super::job::Job;
use super::{into_result, is_valid_url, nullable, present, search_term, FieldErrors, Validate};
use crate::database::bind::bind_fragment_as;
use crate::database::manager::DatabaseError;
use crate::sql::{
    build_set_fragment, build_where_prefix, contains_pattern, ColumnMap, FilterKey, FilterRequest,
    SqlError, UpdateRequest,
};

static UPDATE_COLUMNS: Lazy<ColumnMap> = Lazy::new(|| {
    ColumnMap::from_pairs([("numEmployees", "num_employees"), ("logoUrl", "logo_url")])
});

static FILTER_COLUMNS: Lazy<ColumnMap> = Lazy::new(|| {
    ColumnMap::from_pairs([
        (FilterKey::NameLike.as_str(), "name"),
        (FilterKey::MinEmployees.as_str(), "num_employees"),
        (FilterKey::MaxEmployees.as_str(), "num_employees"),
    ])
});

const COMPANY_COLUMNS: &str = "handle, name, description, num_employees, logo_url";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub handle: String,
    pub name: String,
    pub description: Option<String>,
    pub num_employees: Option<i32>,
    pub logo_url: Option<String>,
}

/// A company together with its jobs.
#[derive(Debug, Clone, Serialize)]
pub struct CompanyDetail {
    #[serde(flatten)]
    pub company: Company,
    pub jobs: Vec<Job>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewCompany {
    pub handle: String,
    pub name: String,
    pub description: Option<String>,
    pub num_employees: Option<i32>,
    pub logo_url: Option<String>,
}

impl Validate for NewCompany {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.handle.is_empty() || self.handle.chars().count() > 25 {
            errors.insert("handle".into(), "must be 1 to 25 characters".into());
        }
        if self.name.is_empty() {
            errors.insert("name".into(), "must not be empty".into());
        }
        validate_common(self.num_employees, self.logo_url.as_deref(), &mut errors);
        into_result(errors)
    }
}

/// PATCH body. Handle is immutable. `Some(None)` clears a nullable column.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CompanyUpdate {
    #[serde(default, deserialize_with = "present")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub num_employees: Option<Option<i32>>,
    #[serde(default, deserialize_with = "nullable")]
    pub logo_url: Option<Option<String>>,
}

impl Validate for CompanyUpdate {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if matches!(self.name.as_deref(), Some("")) {
            errors.insert("name".into(), "must not be empty".into());
        }
        validate_common(
            self.num_employees.flatten(),
            self.logo_url.as_ref().and_then(|url| url.as_deref()),
            &mut errors,
        );
        into_result(errors)
    }
}

fn validate_common(num_employees: Option<i32>, logo_url: Option<&str>, errors: &mut FieldErrors) {
    if matches!(num_employees, Some(n) if n < 0) {
        errors.insert("numEmployees".into(), "must be at least 0".into());
    }
    if let Some(url) = logo_url {
        if !is_valid_url(url) {
            errors.insert("logoUrl".into(), "must be an http(s) URL".into());
        }
    }
}

impl From<CompanyUpdate> for UpdateRequest {
    fn from(update: CompanyUpdate) -> Self {
        let mut request = UpdateRequest::new();
        if let Some(name) = update.name {
            request.push("name", name);
        }
        if let Some(description) = update.description {
            request.push("description", description);
        }
        if let Some(num_employees) = update.num_employees {
            request.push("numEmployees", num_employees);
        }
        if let Some(logo_url) = update.logo_url {
            request.push("logoUrl", logo_url);
        }
        request
    }
}

/// `GET /companies` search terms.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompanySearch {
    pub name_like: Option<String>,
    pub min_employees: Option<i64>,
    pub max_employees: Option<i64>,
}

impl CompanySearch {
    const KEYS: [FilterKey; 3] = [
        FilterKey::NameLike,
        FilterKey::MinEmployees,
        FilterKey::MaxEmployees,
    ];

    /// Reads the company keys out of a parsed query, rejecting keys that belong
    /// to other resources.
    pub fn from_filter(filter: &FilterRequest) -> Result<Self, SqlError> {
        filter.restrict(&Self::KEYS)?;
        Ok(Self {
            name_like: filter.text(FilterKey::NameLike).map(str::to_string),
            min_employees: filter.integer(FilterKey::MinEmployees)?,
            max_employees: filter.integer(FilterKey::MaxEmployees)?,
        })
    }

    /// Search terms become `%term%` here and nowhere else.
    pub fn to_filter(&self) -> FilterRequest {
        let mut filter = FilterRequest::new();
        if let Some(term) = search_term(&self.name_like) {
            filter.push(FilterKey::NameLike, contains_pattern(term));
        }
        if let Some(min) = self.min_employees {
            filter.push(FilterKey::MinEmployees, min);
        }
        if let Some(max) = self.max_employees {
            filter.push(FilterKey::MaxEmployees, max);
        }
        filter
    }

    pub fn check_range(&self) -> Result<(), DatabaseError> {
        match (self.min_employees, self.max_employees) {
            (Some(min), Some(max)) if min > max => Err(DatabaseError::InvalidInput(
                "Min employees must be less than max employees".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

impl Company {
    /// Inserts a company. Fails with `Duplicate` when the handle is taken.
    pub async fn create(pool: &PgPool, data: &NewCompany) -> Result<Company, DatabaseError> {
        let existing =
            sqlx::query_scalar::<_, String>("SELECT handle FROM companies WHERE handle = $1")
                .bind(&data.handle)
                .fetch_optional(pool)
                .await?;
        if existing.is_some() {
            return Err(DatabaseError::Duplicate(format!("Duplicate company: {}", data.handle)));
        }

        let sql = format!(
            "INSERT INTO companies ({cols}) VALUES ($1, $2, $3, $4, $5) RETURNING {cols}",
            cols = COMPANY_COLUMNS
        );
        let company = sqlx::query_as::<_, Company>(&sql)
            .bind(&data.handle)
            .bind(&data.name)
            .bind(&data.description)
            .bind(data.num_employees)
            .bind(&data.logo_url)
            .fetch_one(pool)
            .await?;

        info!("Created company {}", company.handle);
        Ok(company)
    }

    /// All companies matching `search`, ordered by name.
    pub async fn find_all(
        pool: &PgPool,
        search: &CompanySearch,
    ) -> Result<Vec<Company>, DatabaseError> {
        search.check_range()?;

        let filter = build_where_prefix(&search.to_filter(), &FILTER_COLUMNS);
        let sql = Self::find_all_sql(&filter.sql);
        let companies = bind_fragment_as(sqlx::query_as::<_, Company>(&sql), &filter)
            .fetch_all(pool)
            .await?;
        Ok(companies)
    }

    fn find_all_sql(where_clause: &str) -> String {
        [
            format!("SELECT {} FROM companies", COMPANY_COLUMNS),
            where_clause.to_string(),
            "ORDER BY name".to_string(),
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
    }

    pub async fn get(pool: &PgPool, handle: &str) -> Result<CompanyDetail, DatabaseError> {
        let sql = format!("SELECT {} FROM companies WHERE handle = $1", COMPANY_COLUMNS);
        let company = sqlx::query_as::<_, Company>(&sql)
            .bind(handle)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("No company: {}", handle)))?;

        let jobs = Job::find_by_company(pool, handle).await?;
        Ok(CompanyDetail { company, jobs })
    }

    /// Partial update: only the fields present in `data` change.
    pub async fn update(
        pool: &PgPool,
        handle: &str,
        data: &UpdateRequest,
    ) -> Result<Company, DatabaseError> {
        let set = build_set_fragment(data, &UPDATE_COLUMNS)?;
        let sql = format!(
            "UPDATE companies SET {} WHERE handle = {} RETURNING {}",
            set.sql,
            set.next_placeholder(),
            COMPANY_COLUMNS
        );

        let company = bind_fragment_as(sqlx::query_as::<_, Company>(&sql), &set)
            .bind(handle)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("No company: {}", handle)))?;

        info!("Updated company {} ({} fields)", handle, set.values.len());
        Ok(company)
    }

    pub async fn remove(pool: &PgPool, handle: &str) -> Result<(), DatabaseError> {
        let deleted = sqlx::query_scalar::<_, String>(
            "DELETE FROM companies WHERE handle = $1 RETURNING handle",
        )
        .bind(handle)
        .fetch_optional(pool)
        .await?;
        if deleted.is_none() {
            return Err(DatabaseError::NotFound(format!("No company: {}", handle)));
        }

        info!("Removed company {}", handle);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn search_wraps_name_and_keeps_order() {
        let search = CompanySearch {
            name_like: Some("net".into()),
            min_employees: Some(0),
            max_employees: Some(3),
        };
        let frag = build_where_prefix(&search.to_filter(), &FILTER_COLUMNS);
        assert_eq!(frag.sql, "WHERE name ILIKE $1 AND num_employees >= $2 AND num_employees <= $3");
        assert_eq!(frag.values, vec![json!("%net%"), json!(0), json!(3)]);
    }

    #[test]
    fn blank_search_has_no_where_clause() {
        let search = CompanySearch {
            name_like: Some("  ".into()),
            ..Default::default()
        };
        let frag = build_where_prefix(&search.to_filter(), &FILTER_COLUMNS);
        assert!(frag.is_empty());
        assert_eq!(
            Company::find_all_sql(&frag.sql),
            "SELECT handle, name, description, num_employees, logo_url FROM companies ORDER BY name"
        );
    }

    #[test]
    fn range_check_rejects_min_above_max() {
        let bad = CompanySearch {
            min_employees: Some(5),
            max_employees: Some(1),
            ..Default::default()
        };
        assert!(matches!(bad.check_range(), Err(DatabaseError::InvalidInput(_))));

        let equal = CompanySearch {
            min_employees: Some(2),
            max_employees: Some(2),
            ..Default::default()
        };
        assert!(equal.check_range().is_ok());
        assert!(CompanySearch::default().check_range().is_ok());
    }

    #[test]
    fn update_maps_camel_case_fields() {
        let update = CompanyUpdate {
            name: Some("New".into()),
            num_employees: Some(Some(10)),
            logo_url: Some(Some("http://new.img".into())),
            ..Default::default()
        };
        let request = UpdateRequest::from(update);
        let set = build_set_fragment(&request, &UPDATE_COLUMNS).unwrap();
        assert_eq!(set.sql, "\"name\"=$1, \"num_employees\"=$2, \"logo_url\"=$3");
        assert_eq!(set.next_placeholder(), "$4");
    }

    #[test]
    fn empty_update_has_no_data() {
        let request = UpdateRequest::from(CompanyUpdate::default());
        assert!(request.is_empty());
        assert!(build_set_fragment(&request, &UPDATE_COLUMNS).is_err());
    }

    #[test]
    fn null_fields_clear_columns() {
        let update: CompanyUpdate =
            serde_json::from_value(json!({ "numEmployees": null, "logoUrl": null })).unwrap();
        assert_eq!(update.num_employees, Some(None));
        assert_eq!(update.description, None);

        let request = UpdateRequest::from(update);
        let set = build_set_fragment(&request, &UPDATE_COLUMNS).unwrap();
        assert_eq!(set.sql, "\"num_employees\"=$1, \"logo_url\"=$2");
        assert_eq!(set.values, vec![json!(null), json!(null)]);
    }

    #[test]
    fn null_and_values_mix_in_one_update() {
        let update: CompanyUpdate = serde_json::from_value(
            json!({ "name": "New", "description": null, "numEmployees": 3 }),
        )
        .unwrap();
        assert!(update.validate().is_ok());

        let set = build_set_fragment(&update.into(), &UPDATE_COLUMNS).unwrap();
        assert_eq!(set.sql, "\"name\"=$1, \"description\"=$2, \"num_employees\"=$3");
        assert_eq!(set.values, vec![json!("New"), json!(null), json!(3)]);
    }

    #[test]
    fn name_cannot_be_nulled() {
        assert!(serde_json::from_value::<CompanyUpdate>(json!({ "name": null })).is_err());
    }

    #[test]
    fn search_reads_company_keys_from_query() {
        let query = json!({ "nameLike": "net", "minEmployees": "2", "maxEmployees": "30" });
        let filter = FilterRequest::from_map(query.as_object().unwrap()).unwrap();
        let search = CompanySearch::from_filter(&filter).unwrap();
        assert_eq!(
            search,
            CompanySearch {
                name_like: Some("net".into()),
                min_employees: Some(2),
                max_employees: Some(30),
            }
        );
    }

    #[test]
    fn search_rejects_job_keys_and_bad_numbers() {
        let filter = FilterRequest::new().with(FilterKey::TitleLike, "eng");
        assert_eq!(
            CompanySearch::from_filter(&filter),
            Err(SqlError::UnknownFilter("titleLike".into()))
        );

        let filter = FilterRequest::new().with(FilterKey::MinEmployees, "many");
        assert_eq!(
            CompanySearch::from_filter(&filter),
            Err(SqlError::InvalidValue("minEmployees".into()))
        );
    }

    #[test]
    fn new_company_validation() {
        let ok = NewCompany {
            handle: "c1".into(),
            name: "C1".into(),
            description: None,
            num_employees: Some(1),
            logo_url: Some("https://c1.example.com/logo.png".into()),
        };
        assert!(ok.validate().is_ok());

        let bad = NewCompany {
            handle: "x".repeat(26),
            name: String::new(),
            num_employees: Some(-1),
            logo_url: Some("not-a-url".into()),
            ..ok
        };
        let errors = bad.validate().unwrap_err();
        for field in ["handle", "name", "numEmployees", "logoUrl"] {
            assert!(errors.contains_key(field), "missing {}", field);
        }
    }

    #[test]
    fn detail_serializes_flat_with_jobs() {
        let detail = CompanyDetail {
            company: Company {
                handle: "c1".into(),
                name: "C1".into(),
                description: Some("Desc1".into()),
                num_employees: Some(1),
                logo_url: None,
            },
            jobs: vec![],
        };
        let value = serde_json::to_value(detail).unwrap();
        assert_eq!(value["numEmployees"], json!(1));
        assert_eq!(value["logoUrl"], json!(null));
        assert_eq!(value["jobs"], json!([]));
    }
}
