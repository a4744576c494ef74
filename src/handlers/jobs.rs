use axum::{extract::Path, http::StatusCode, response::Json};
use serde_json::{json, Map, Value};

use super::{validated, JsonBody, QueryParams};
use crate::database::models::{Job, JobSearch, JobUpdate, NewJob};
use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::sql::FilterRequest;

/// POST /jobs { title, salary, equity, companyHandle } => 201 { job }
pub async fn create(
    JsonBody(payload): JsonBody<NewJob>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let payload = validated(payload)?;
    let pool = DatabaseManager::pool()?;
    let job = Job::create(&pool, &payload).await?;
    Ok((StatusCode::CREATED, Json(json!({ "job": job }))))
}

/// GET /jobs?titleLike=&minSalary= => { jobs }
pub async fn list(
    QueryParams(params): QueryParams<Map<String, Value>>,
) -> Result<Json<Value>, ApiError> {
    let search = JobSearch::from_filter(&FilterRequest::from_map(&params)?)?;
    let pool = DatabaseManager::pool()?;
    let jobs = Job::find_all(&pool, &search).await?;
    Ok(Json(json!({ "jobs": jobs })))
}

pub async fn get(Path(id): Path<i32>) -> Result<Json<Value>, ApiError> {
    let pool = DatabaseManager::pool()?;
    let job = Job::get(&pool, id).await?;
    Ok(Json(json!({ "job": job })))
}

/// GET /jobs/company/:handle => { jobs }
pub async fn list_for_company(Path(handle): Path<String>) -> Result<Json<Value>, ApiError> {
    let pool = DatabaseManager::pool()?;
    let jobs = Job::find_by_company(&pool, &handle).await?;
    Ok(Json(json!({ "jobs": jobs })))
}

/// PATCH /jobs/:id { title?, salary?, equity? } => { job }
pub async fn update(
    Path(id): Path<i32>,
    JsonBody(payload): JsonBody<JobUpdate>,
) -> Result<Json<Value>, ApiError> {
    let payload = validated(payload)?;
    let pool = DatabaseManager::pool()?;
    let job = Job::update(&pool, id, &payload.into()).await?;
    Ok(Json(json!({ "job": job })))
}

/// DELETE /jobs/:id => { deleted: id }
pub async fn remove(user: CurrentUser, Path(id): Path<i32>) -> Result<Json<Value>, ApiError> {
    let pool = DatabaseManager::pool()?;
    Job::remove(&pool, id).await?;
    tracing::info!("Job {} deleted by {}", id, user.name());
    Ok(Json(json!({ "deleted": id })))
}
