use axum::{extract::Path, response::Json};
use serde_json::{json, Value};

use super::{validated, JsonBody};
use crate::database::models::{User, UserUpdate};
use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::middleware::CurrentUser;

/// GET /users => { users }. Authorization: admin
pub async fn list() -> Result<Json<Value>, ApiError> {
    let pool = DatabaseManager::pool()?;
    let users = User::find_all(&pool).await?;
    Ok(Json(json!({ "users": users })))
}

/// GET /users/:username => { user }. Authorization: admin or same user
pub async fn get(Path(username): Path<String>) -> Result<Json<Value>, ApiError> {
    let pool = DatabaseManager::pool()?;
    let user = User::get(&pool, &username).await?;
    Ok(Json(json!({ "user": user })))
}

/// PATCH /users/:username { firstName?, lastName?, email? } => { user }
pub async fn update(
    Path(username): Path<String>,
    JsonBody(payload): JsonBody<UserUpdate>,
) -> Result<Json<Value>, ApiError> {
    let payload = validated(payload)?;
    let pool = DatabaseManager::pool()?;
    let user = User::update(&pool, &username, &payload.into()).await?;
    Ok(Json(json!({ "user": user })))
}

/// DELETE /users/:username => { deleted: username }
pub async fn remove(
    user: CurrentUser,
    Path(username): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let pool = DatabaseManager::pool()?;
    User::remove(&pool, &username).await?;
    tracing::info!("User {} deleted by {}", username, user.name());
    Ok(Json(json!({ "deleted": username })))
}
