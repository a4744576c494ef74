use axum::{extract::Path, http::StatusCode, response::Json};
use serde_json::{json, Map, Value};

use super::{validated, JsonBody, QueryParams};
use crate::database::models::{Company, CompanySearch, CompanyUpdate, NewCompany};
use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::sql::FilterRequest;

/// POST /companies { handle, name, description, numEmployees, logoUrl } => 201 { company }
///
/// Authorization: admin
pub async fn create(
    JsonBody(payload): JsonBody<NewCompany>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let payload = validated(payload)?;
    let pool = DatabaseManager::pool()?;
    let company = Company::create(&pool, &payload).await?;
    Ok((StatusCode::CREATED, Json(json!({ "company": company }))))
}

/// GET /companies?nameLike=&minEmployees=&maxEmployees= => { companies }
///
/// nameLike is a case-insensitive partial match. Authorization: none
pub async fn list(
    QueryParams(params): QueryParams<Map<String, Value>>,
) -> Result<Json<Value>, ApiError> {
    let search = CompanySearch::from_filter(&FilterRequest::from_map(&params)?)?;
    let pool = DatabaseManager::pool()?;
    let companies = Company::find_all(&pool, &search).await?;
    Ok(Json(json!({ "companies": companies })))
}

/// GET /companies/:handle => { company } (with its jobs)
pub async fn get(Path(handle): Path<String>) -> Result<Json<Value>, ApiError> {
    let pool = DatabaseManager::pool()?;
    let company = Company::get(&pool, &handle).await?;
    Ok(Json(json!({ "company": company })))
}

/// PATCH /companies/:handle { name?, description?, numEmployees?, logoUrl? } => { company }
///
/// A `null` clears description, numEmployees or logoUrl. Authorization: admin
pub async fn update(
    Path(handle): Path<String>,
    JsonBody(payload): JsonBody<CompanyUpdate>,
) -> Result<Json<Value>, ApiError> {
    let payload = validated(payload)?;
    let pool = DatabaseManager::pool()?;
    let company = Company::update(&pool, &handle, &payload.into()).await?;
    Ok(Json(json!({ "company": company })))
}

/// DELETE /companies/:handle => { deleted: handle }
///
/// Authorization: admin
pub async fn remove(
    user: CurrentUser,
    Path(handle): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let pool = DatabaseManager::pool()?;
    Company::remove(&pool, &handle).await?;
    tracing::info!("Company {} deleted by {}", handle, user.name());
    Ok(Json(json!({ "deleted": handle })))
}
